//! Per-session workflow state.
//!
//! A session walks `image -> degraded -> enhanced + analysis`. Replacing any
//! stage drops everything derived from it, and bumps `revision` so work that
//! started from the old stage cannot be committed on top of the new one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::dentition::PositionScheme;
use crate::filters::{Degradation, Severity};
use crate::sample::{synthetic_xray, ImageSample, ImageStats};

pub const DEFAULT_IMAGE_NAME: &str = "Default X-ray";

/// A commit was attempted against a stage that has since been replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("session changed while processing (expected revision {expected}, now {actual})")]
pub struct StaleRevision {
    pub expected: u64,
    pub actual: u64,
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    id: Uuid,
    scheme: PositionScheme,
    revision: u64,
    created_at: DateTime<Utc>,
    last_touched: Instant,

    image: ImageSample,
    image_name: String,

    degraded: Option<ImageSample>,
    degradation: Option<Degradation>,
    severity: Severity,

    enhanced: Option<ImageSample>,
    analysis: Option<AnalysisResult>,
}

impl SessionContext {
    pub fn new(id: Uuid, scheme: PositionScheme) -> Self {
        Self {
            id,
            scheme,
            revision: 0,
            created_at: Utc::now(),
            last_touched: Instant::now(),
            image: synthetic_xray(),
            image_name: DEFAULT_IMAGE_NAME.to_string(),
            degraded: None,
            degradation: None,
            severity: Severity::default(),
            enhanced: None,
            analysis: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn scheme(&self) -> PositionScheme {
        self.scheme
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn image(&self) -> &ImageSample {
        &self.image
    }

    pub fn degraded(&self) -> Option<&ImageSample> {
        self.degraded.as_ref()
    }

    pub fn degradation(&self) -> Option<Degradation> {
        self.degradation
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn enhanced(&self) -> Option<&ImageSample> {
        self.enhanced.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    /// Time since the session was last looked up through the store.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_touched)
    }

    fn check(&self, expected: u64) -> Result<(), StaleRevision> {
        if expected == self.revision {
            Ok(())
        } else {
            Err(StaleRevision {
                expected,
                actual: self.revision,
            })
        }
    }

    /// New source image. Clears degraded, enhanced and analysis.
    pub fn replace_image(&mut self, image: ImageSample, name: impl Into<String>) {
        self.image = image;
        self.image_name = name.into();
        self.degraded = None;
        self.degradation = None;
        self.enhanced = None;
        self.analysis = None;
        self.revision += 1;
    }

    /// New degraded derivative of the current image. Clears enhanced and analysis.
    pub fn set_degraded(
        &mut self,
        expected_revision: u64,
        degraded: ImageSample,
        kind: Degradation,
        severity: Severity,
    ) -> Result<(), StaleRevision> {
        self.check(expected_revision)?;
        self.degraded = Some(degraded);
        self.degradation = Some(kind);
        self.severity = severity;
        self.enhanced = None;
        self.analysis = None;
        self.revision += 1;
        Ok(())
    }

    /// Result of an enhance run over the current degraded image.
    pub fn set_enhanced(
        &mut self,
        expected_revision: u64,
        enhanced: ImageSample,
        analysis: AnalysisResult,
    ) -> Result<(), StaleRevision> {
        self.check(expected_revision)?;
        self.enhanced = Some(enhanced);
        self.analysis = Some(analysis);
        Ok(())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            scheme: self.scheme,
            revision: self.revision,
            created_at: self.created_at,
            image_name: self.image_name.clone(),
            image: *self.image.stats(),
            degradation: self.degradation,
            severity: self.degraded.as_ref().map(|_| self.severity.level()),
            degraded: self.degraded.as_ref().map(|s| *s.stats()),
            enhanced: self.enhanced.as_ref().map(|s| *s.stats()),
            fingerprint: self
                .analysis
                .as_ref()
                .map(|a| a.evidence.fingerprint.to_string()),
            analysis_ready: self.analysis.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub scheme: PositionScheme,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub image_name: String,
    pub image: ImageStats,
    pub degradation: Option<Degradation>,
    pub severity: Option<u8>,
    pub degraded: Option<ImageStats>,
    pub enhanced: Option<ImageStats>,
    pub fingerprint: Option<String>,
    pub analysis_ready: bool,
}

/// Sessions are dropped once they sit untouched this long.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// All live sessions, keyed by id. Held behind a mutex in the app state.
///
/// A session idle for `ttl` or longer is treated as gone: lookups evict it on
/// sight and [`SessionStore::evict_idle`] sweeps the rest.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<Uuid, SessionContext>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a session built outside the lock.
    pub fn insert(&mut self, mut session: SessionContext) -> &SessionContext {
        session.last_touched = Instant::now();
        self.sessions.entry(session.id).or_insert(session)
    }

    pub fn create(&mut self, scheme: PositionScheme) -> &SessionContext {
        self.insert(SessionContext::new(Uuid::new_v4(), scheme))
    }

    /// Look a session up and mark it as used.
    pub fn get(&mut self, id: &Uuid) -> Option<&SessionContext> {
        self.get_mut(id).map(|session| &*session)
    }

    /// Look a session up and mark it as used.
    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut SessionContext> {
        let now = Instant::now();
        if self
            .sessions
            .get(id)
            .is_some_and(|session| session.idle_for(now) >= self.ttl)
        {
            self.sessions.remove(id);
            debug!(session = %id, "idle session evicted on lookup");
            return None;
        }
        let session = self.sessions.get_mut(id)?;
        session.last_touched = now;
        Some(session)
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<SessionContext> {
        self.sessions.remove(id)
    }

    /// Drop every session idle for at least the TTL. Returns how many went.
    pub fn evict_idle(&mut self, now: Instant) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, session| session.idle_for(now) < ttl);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
