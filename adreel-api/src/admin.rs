use adreel_core::{filter_eligible, Advertisement, NewAdvertisement, Platform};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::{
    advertisements::parse_ad_id,
    error::AppError,
    middleware::{admin_auth_middleware, AdminClaims},
    state::AppState,
};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListAdvertisementsQuery {
    pub platform: Option<String>,
    /// Only ads eligible right now
    pub eligible: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/advertisements", post(create_advertisement).get(list_advertisements))
        .route("/admin/advertisements/{id}", get(get_advertisement))
        .route("/admin/advertisements/{id}/status", patch(update_status))
        .route_layer(axum::middleware::from_fn_with_state(state, admin_auth_middleware))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /admin/advertisements
pub async fn create_advertisement(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    payload: Result<Json<NewAdvertisement>, JsonRejection>,
) -> Result<(StatusCode, Json<Advertisement>), AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;

    let ad = payload.into_advertisement(Utc::now())?;
    state.repo.create_advertisement(&ad).await?;

    info!("Advertisement {} '{}' created by {}", ad.id, ad.title, claims.sub);
    Ok((StatusCode::CREATED, Json(ad)))
}

/// GET /admin/advertisements?platform=instagram&eligible=true
pub async fn list_advertisements(
    State(state): State<AppState>,
    Query(query): Query<ListAdvertisementsQuery>,
) -> Result<Json<Vec<Advertisement>>, AppError> {
    let platform = query
        .platform
        .as_deref()
        .map(str::parse::<Platform>)
        .transpose()?;

    let ads = state.repo.list_advertisements(platform).await?;

    if !query.eligible.unwrap_or(false) {
        return Ok(Json(ads));
    }

    let now = Utc::now();
    let eligible = match platform {
        Some(platform) => filter_eligible(ads, platform, now),
        // Without a platform, "eligible" means live on at least one of its own platforms.
        None => ads
            .into_iter()
            .filter(|ad| ad.placement.platforms.iter().any(|p| ad.is_eligible(*p, now)))
            .collect(),
    };

    Ok(Json(eligible))
}

/// GET /admin/advertisements/{id}
pub async fn get_advertisement(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Advertisement>, AppError> {
    let id = parse_ad_id(&raw_id)?;
    let ad = state
        .repo
        .get_advertisement(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Advertisement {} not found", id)))?;

    Ok(Json(ad))
}

/// PATCH /admin/advertisements/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Advertisement>, AppError> {
    let id = parse_ad_id(&raw_id)?;
    let Json(req) = payload.map_err(|rejection| AppError::ValidationError(rejection.body_text()))?;

    let ad = state
        .repo
        .set_active(id, req.is_active)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Advertisement {} not found", id)))?;

    info!("Advertisement {} set active={} by {}", id, req.is_active, claims.sub);
    Ok(Json(ad))
}
