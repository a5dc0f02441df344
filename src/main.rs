use dental_forensics::{api, config::Config};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dental_forensics=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ----------------------------------------------------------------
    // 0. Config
    // ----------------------------------------------------------------
    let config = Config::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        scheme = %config.default_scheme,
        session_ttl_secs = config.session_ttl_secs,
        "⚙️  configuration loaded"
    );

    // ----------------------------------------------------------------
    // 1. State + router
    // ----------------------------------------------------------------
    let addr = config.bind_addr();
    let state = Arc::new(api::AppState::new(config));
    api::spawn_session_reaper(state.clone());
    let app = api::app(state);

    // ----------------------------------------------------------------
    // 2. Serve
    // ----------------------------------------------------------------
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🦷 forensic dental service listening on http://{addr}");
    tracing::info!("   - POST /sessions                 : new session (synthetic X-ray)");
    tracing::info!("   - POST /sessions/{{id}}/degrade    : apply damage");
    tracing::info!("   - POST /sessions/{{id}}/enhance    : enhance + findings");
    tracing::info!("   - GET  /sessions/{{id}}/report     : forensic report");

    axum::serve(listener, app).await?;

    Ok(())
}
