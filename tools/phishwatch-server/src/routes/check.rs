use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use phishwatch_core::engine::{self, CheckRequest};
use phishwatch_core::resolver::{ResolveError, ResolveResult};
use phishwatch_core::verdict::ScanResult;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::state::AppState;

pub async fn check(
    State(state): State<AppState>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<ScanResult>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let resolved = resolve_bounded(&state, &req.input_url).await;
    let result = engine::assess(&req, &resolved);

    debug!(
        url = %req.input_url,
        band = %result.risk_band,
        score = result.risk_score,
        "check served"
    );
    Ok(Json(result))
}

/// Resolve under the shared permit pool; a request that cannot get a slot in
/// time proceeds on a degraded result.
async fn resolve_bounded(state: &AppState, url: &str) -> ResolveResult {
    let wait = state.config.resolve_queue;
    match tokio::time::timeout(wait, state.permits.acquire()).await {
        Ok(Ok(permit)) => {
            let resolved = state.resolver.resolve(url).await;
            drop(permit);
            resolved
        }
        _ => {
            warn!(
                url = %url,
                queue_ms = wait.as_millis() as u64,
                "resolver pool exhausted, skipping resolution"
            );
            ResolveResult::failed(url, state.resolver.allowlist(), ResolveError::Busy)
        }
    }
}
