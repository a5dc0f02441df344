use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Path, Request, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::{enhance_and_analyze, AnalysisResult};
use crate::config::Config;
use crate::dentition::PositionScheme;
use crate::error::{AppError, AppResult};
use crate::filters::{self, Degradation, Severity};
use crate::report::{CaseInfo, ForensicReport};
use crate::sample::ImageSample;
use crate::session::{SessionContext, SessionStore, SessionSummary};

// ==========================================
// 1. Shared state
// ==========================================
// Sessions are independent; the mutex only serialises map access. Image work
// always runs with the lock released.
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<Mutex<SessionStore>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(SessionStore::with_ttl(config.session_ttl()))),
            config: Arc::new(config),
        }
    }
}

// ==========================================
// 2. DTOs
// ==========================================

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub scheme: Option<PositionScheme>,
}

#[derive(Debug, Deserialize)]
pub struct LoadImageRequest {
    pub image_path: String,
    /// Display name; defaults to the file name.
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DegradeRequest {
    pub kind: Degradation,
    /// 1..=10, defaults to 5.
    pub level: Option<u8>,
    /// Fixes the damage pattern; omitted means a fresh random pattern.
    pub seed: Option<u64>,
}

/// `Json` with the rejection folded into the `{error, code}` envelope.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

// ==========================================
// 3. Router
// ==========================================
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/image", post(load_image))
        .route("/sessions/{id}/degrade", post(degrade_image))
        .route("/sessions/{id}/enhance", post(enhance_image))
        .route("/sessions/{id}/analysis", get(get_analysis))
        .route("/sessions/{id}/report", get(get_report))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ==========================================
// 4. Handlers
// ==========================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The body is optional: no body (or a blank one) means all defaults.
async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<SessionSummary>)> {
    let req: CreateSessionRequest = if body.trim_ascii().is_empty() {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("invalid session request: {e}")))?
    };
    let scheme = req.scheme.unwrap_or(state.config.default_scheme);

    // the synthetic X-ray is rendered before the store is locked
    let session = run_blocking(move || SessionContext::new(Uuid::new_v4(), scheme)).await?;

    let mut sessions = state.sessions.lock().await;
    let summary = sessions.insert(session).summary();
    info!(session = %summary.id, %scheme, live = sessions.len(), "session created");
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionSummary>> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get(&id).ok_or(AppError::SessionNotFound(id))?;
    Ok(Json(session.summary()))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut sessions = state.sessions.lock().await;
    sessions.remove(&id).ok_or(AppError::SessionNotFound(id))?;
    info!(session = %id, "session dropped");
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the session image with one decoded from disk.
async fn load_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<LoadImageRequest>,
) -> AppResult<Json<SessionSummary>> {
    ensure_session(&state, id).await?;

    let path = PathBuf::from(&req.image_path);
    let name = req.name.unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| req.image_path.clone())
    });

    // decoding is CPU bound
    let sample = run_blocking(move || ImageSample::open(&path)).await??;

    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(AppError::SessionNotFound(id))?;
    session.replace_image(sample, name);
    info!(session = %id, image = %req.image_path, "image loaded");
    Ok(Json(session.summary()))
}

async fn degrade_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<DegradeRequest>,
) -> AppResult<Json<SessionSummary>> {
    // an unknown session is reported before the request is validated
    let (source, revision) = {
        let mut sessions = state.sessions.lock().await;
        let session = sessions.get(&id).ok_or(AppError::SessionNotFound(id))?;
        (session.image().clone(), session.revision())
    };

    let severity = match req.level {
        Some(level) => Severity::from_level(level)?,
        None => Severity::default(),
    };

    let kind = req.kind;
    let seed = req.seed;
    let degraded = run_blocking(move || {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        filters::degrade(&source, kind, severity, &mut rng)
    })
    .await??;

    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(AppError::SessionNotFound(id))?;
    session.set_degraded(revision, degraded, kind, severity)?;
    info!(session = %id, %kind, level = severity.level(), seeded = seed.is_some(), "degradation applied");
    Ok(Json(session.summary()))
}

/// Enhance the degraded image and run the findings generator on the result.
async fn enhance_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AnalysisResult>> {
    let (degraded, scheme, revision) = {
        let mut sessions = state.sessions.lock().await;
        let session = sessions.get(&id).ok_or(AppError::SessionNotFound(id))?;
        let degraded = session.degraded().cloned().ok_or_else(|| {
            AppError::Conflict("apply a degradation before enhancing".to_string())
        })?;
        (degraded, session.scheme(), session.revision())
    };

    let (enhanced, result) = run_blocking(move || enhance_and_analyze(&degraded, scheme)).await??;

    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(&id).ok_or(AppError::SessionNotFound(id))?;
    session.set_enhanced(revision, enhanced, result.clone())?;
    Ok(Json(result))
}

async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AnalysisResult>> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get(&id).ok_or(AppError::SessionNotFound(id))?;
    let analysis = session
        .analysis()
        .cloned()
        .ok_or_else(|| AppError::Conflict("no analysis yet, run enhancement first".to_string()))?;
    Ok(Json(analysis))
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ForensicReport>> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get(&id).ok_or(AppError::SessionNotFound(id))?;
    let analysis = session
        .analysis()
        .ok_or_else(|| AppError::Conflict("no analysis yet, run enhancement first".to_string()))?;

    let case = CaseInfo::new(Utc::now(), session.degradation(), session.severity());
    let report = ForensicReport::build(case, analysis);
    debug!(session = %id, case = %report.case.case_id, conclusion = ?report.conclusion, "report built");
    Ok(Json(report))
}

// ==========================================
// 5. Helpers
// ==========================================

async fn ensure_session(state: &AppState, id: Uuid) -> AppResult<()> {
    let mut sessions = state.sessions.lock().await;
    sessions
        .get(&id)
        .map(|_| ())
        .ok_or(AppError::SessionNotFound(id))
}

/// Run image work on the blocking pool. The outer error is a join failure.
async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {e}")))
}

// ==========================================
// 6. Background
// ==========================================

/// How often idle sessions are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically drop sessions that outlived the configured TTL.
pub fn spawn_session_reaper(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            ttl_secs = state.config.session_ttl_secs,
            interval_secs = SWEEP_INTERVAL.as_secs(),
            "session reaper started"
        );
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let mut sessions = state.sessions.lock().await;
            let evicted = sessions.evict_idle(Instant::now());
            if evicted > 0 {
                info!(evicted, live = sessions.len(), "idle sessions evicted");
            } else {
                debug!(live = sessions.len(), "no idle sessions");
            }
        }
    })
}
