use anyhow::Context;
use std::env;
use std::time::Duration;

use crate::dentition::PositionScheme;
use crate::session::DEFAULT_SESSION_TTL;

/// Service configuration, read from the environment (and `.env` if present).
///
/// | Env Var           | Default       |
/// |-------------------|---------------|
/// | `HOST`            | `0.0.0.0`     |
/// | `PORT`            | `3000`        |
/// | `POSITION_SCHEME` | `upper-right` |
/// | `SESSION_TTL_SECS`| `1800`        |
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Scheme for sessions that do not ask for one.
    pub default_scheme: PositionScheme,
    /// Idle time after which a session is evicted.
    pub session_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a number")?;

        let default_scheme: PositionScheme = env::var("POSITION_SCHEME")
            .unwrap_or_else(|_| PositionScheme::default().to_string())
            .parse()
            .context("POSITION_SCHEME must be one of upper-right, upper-arch, full")?;

        let session_ttl_secs: u64 = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => raw
                .parse()
                .context("SESSION_TTL_SECS must be a whole number of seconds")?,
            Err(_) => DEFAULT_SESSION_TTL.as_secs(),
        };

        Ok(Self {
            host,
            port,
            default_scheme,
            session_ttl_secs,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            default_scheme: PositionScheme::default(),
            session_ttl_secs: DEFAULT_SESSION_TTL.as_secs(),
        }
    }
}
