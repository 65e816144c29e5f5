use axum::{extract::State, Json};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::models::ServiceStatus;
use crate::AppState;

/// NetBox reachability, configured sites and the latest report per site
pub async fn get_status(_auth: AuthUser, State(state): State<Arc<AppState>>) -> Json<ServiceStatus> {
    let netbox_connected = state.syncer.netbox().ping().await;

    Json(ServiceStatus {
        netbox_url: state.config.netbox_url.clone(),
        netbox_connected,
        sites: state.config.sites.clone(),
        schedule: state.config.sync_schedule.clone(),
        legacy_updates: state.config.legacy_updates,
        latest: state.syncer.latest().await,
    })
}
