use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::models::{SiteReport, SyncRequest, SyncSitesRequest};
use crate::AppState;

use super::ApiError;

/// Optional JSON body: a request without one runs with defaults, a
/// malformed one is refused rather than run with defaults.
fn body_or_default<T: DeserializeOwned + Default>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(e) => Err(ApiError::bad_request(e.body_text())),
    }
}

fn require_site(state: &AppState, site: &str) -> Result<String, ApiError> {
    let site = site.trim().to_ascii_lowercase();
    if !state.config.sites.contains(&site) {
        return Err(ApiError::not_found(&format!("Site '{}'", site)));
    }
    Ok(site)
}

/// Reconcile the requested sites now, all configured sites by default
pub async fn sync_sites(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    body: Result<Json<SyncSitesRequest>, JsonRejection>,
) -> Result<Json<Vec<SiteReport>>, ApiError> {
    let body = body_or_default(body)?;

    let sites = match body.sites {
        Some(sites) => sites
            .iter()
            .map(|s| require_site(&state, s))
            .collect::<Result<Vec<_>, _>>()?,
        None => state.config.sites.clone(),
    };
    if sites.is_empty() {
        return Err(ApiError::bad_request("No sites configured"));
    }

    let reports = state.syncer.run_all(&sites, &body.request, "api").await;
    Ok(Json(reports))
}

/// Reconcile one site now
pub async fn sync_site(
    _auth: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(site): Path<String>,
    body: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SiteReport>, ApiError> {
    let site = require_site(&state, &site)?;
    let request = body_or_default(body)?;

    let report = state.syncer.run_site(&site, &request, "api").await;
    Ok(Json(report))
}

/// Retained run reports, newest first
pub async fn list_runs(_auth: AuthUser, State(state): State<Arc<AppState>>) -> Json<Vec<SiteReport>> {
    Json(state.syncer.history().await)
}
