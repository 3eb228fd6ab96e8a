use axum::extract::{Json, Path, State};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::assets::remove_design_assets;
use crate::error::{AppError, AppResult};
use crate::models::{Catalog, Design, ReorderScope};
use crate::slug::normalize_id;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReorderRequest {
    /// Theme whose designs are being rearranged; absent, empty or `all`
    /// targets the whole catalogue.
    pub theme: Option<String>,
    #[serde(default)]
    pub order: Vec<String>,
}

#[derive(Serialize)]
pub struct ReorderResponse {
    pub designs: Vec<Design>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub designs: Vec<Design>,
    pub removed: bool,
}

/// Returns the full catalogue document in display order. Branding defaults
/// are filled in for the response but only persisted by write endpoints.
pub async fn list_designs(State(state): State<AppState>) -> Json<Catalog> {
    let mut catalog = state.catalog.load().await;
    catalog.seed_branding();
    catalog.sort_designs();
    Json(catalog)
}

pub async fn reorder_designs(
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> AppResult<Json<ReorderResponse>> {
    let scope = ReorderScope::from_request(request.theme);
    let mut catalog = state.catalog.load().await;
    catalog.seed_branding();
    catalog.reorder(&scope, &request.order)?;

    if let Err(err) = state.catalog.save(&catalog).await {
        error!(error = ?err, "failed to persist reordered catalog");
        return Err(AppError::internal(err));
    }

    info!(scope = ?scope, ids = request.order.len(), "design order updated");
    catalog.sort_designs();
    Ok(Json(ReorderResponse {
        designs: catalog.designs,
    }))
}

pub async fn delete_design(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let id = normalize_id(&raw_id);
    let mut catalog = state.catalog.load().await;
    catalog.seed_branding();

    if id.is_empty() {
        catalog.sort_designs();
        return Ok(Json(DeleteResponse {
            designs: catalog.designs,
            removed: false,
        }));
    }

    let removed = catalog.remove(&id);
    if removed {
        if let Err(err) = state.catalog.save(&catalog).await {
            error!(error = ?err, design_id = %id, "failed to persist catalog after delete");
            return Err(AppError::internal(err));
        }
        info!(design_id = %id, "design removed from catalog");
    }

    // Asset cleanup also runs when no record existed so stray files from
    // interrupted uploads still get collected.
    remove_design_assets(&state.assets, &id).await;

    catalog.sort_designs();
    Ok(Json(DeleteResponse {
        designs: catalog.designs,
        removed,
    }))
}
