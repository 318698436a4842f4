use adreel_core::{Advertisement, CoreError, CoreResult, OrderingViolation, Performance, Platform, TrackingEvent};
use adreel_shared::models::events::{AdServedEvent, AdTrackedEvent};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RandomAdQuery {
    pub platform: Option<String>,
    /// RFC 3339 timestamp to evaluate scheduling windows at; defaults to now
    pub at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RandomAdResponse {
    pub available: bool,
    pub advertisement: Option<Advertisement>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Ok,
    Rejected,
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub status: TrackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<OrderingViolation>,
    pub performance: Performance,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/advertisements/random", get(random_advertisement))
        .route("/advertisements/{id}/track-impression", post(track_impression))
        .route("/advertisements/{id}/track-view", post(track_view))
        .route("/advertisements/{id}/track-click", post(track_click))
}

pub(crate) fn parse_ad_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::ValidationError(format!("'{}' is not a valid advertisement id", raw)))
}

pub(crate) fn parse_platform(raw: Option<&str>) -> Result<Platform, AppError> {
    let raw = raw.ok_or_else(|| AppError::ValidationError("platform query parameter is required".to_string()))?;
    Ok(raw.parse()?)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::ValidationError(format!("'at' must be an RFC 3339 timestamp: {}", e)))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /advertisements/random?platform=youtube
/// Pick one currently schedulable ad. "None available" is a normal 200 answer.
pub async fn random_advertisement(
    State(state): State<AppState>,
    Query(query): Query<RandomAdQuery>,
) -> Result<Json<RandomAdResponse>, AppError> {
    let platform = parse_platform(query.platform.as_deref())?;
    let now = match query.at.as_deref() {
        Some(raw) => parse_timestamp(raw)?,
        None => Utc::now(),
    };

    let picked = state.delivery.pick(platform, now).await?;

    match &picked {
        Some(ad) => {
            info!("Serving ad {} on {}", ad.id, platform);
            state.metrics.ad_requests.with_label_values(&[platform.as_str(), "served"]).inc();
            publish_served(&state, ad.id, platform);
        }
        None => {
            info!("No eligible ad on {} at {}", platform, now);
            state.metrics.ad_requests.with_label_values(&[platform.as_str(), "empty"]).inc();
        }
    }

    Ok(Json(RandomAdResponse {
        available: picked.is_some(),
        advertisement: picked,
    }))
}

/// POST /advertisements/{id}/track-impression
pub async fn track_impression(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<(StatusCode, Json<TrackResponse>), AppError> {
    let id = parse_ad_id(&raw_id)?;
    let result = state.tracker.record_impression(id).await;
    respond(&state, id, TrackingEvent::Impression, result)
}

/// POST /advertisements/{id}/track-view
pub async fn track_view(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<(StatusCode, Json<TrackResponse>), AppError> {
    let id = parse_ad_id(&raw_id)?;
    let result = state.tracker.record_view(id).await;
    respond(&state, id, TrackingEvent::View, result)
}

/// POST /advertisements/{id}/track-click
pub async fn track_click(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<(StatusCode, Json<TrackResponse>), AppError> {
    let id = parse_ad_id(&raw_id)?;
    let result = state.tracker.record_click(id).await;
    respond(&state, id, TrackingEvent::Click, result)
}

fn respond(
    state: &AppState,
    id: Uuid,
    event: TrackingEvent,
    result: CoreResult<Performance>,
) -> Result<(StatusCode, Json<TrackResponse>), AppError> {
    let counter = |outcome: &str| {
        state.metrics.tracking_events.with_label_values(&[event.as_str(), outcome]).inc();
    };

    match result {
        Ok(performance) => {
            counter("accepted");
            publish_tracked(state, id, event, performance);
            Ok((
                StatusCode::OK,
                Json(TrackResponse {
                    status: TrackStatus::Ok,
                    violation: None,
                    performance,
                }),
            ))
        }
        // Out-of-order client events are reported, not failed; earlier increments stand.
        Err(CoreError::OrderingViolation { violation, performance }) => {
            counter("rejected");
            Ok((
                StatusCode::CONFLICT,
                Json(TrackResponse {
                    status: TrackStatus::Rejected,
                    violation: Some(violation),
                    performance,
                }),
            ))
        }
        Err(err @ CoreError::NotFound(_)) => {
            counter("not_found");
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

// ============================================================================
// Event publishing (fire and forget)
// ============================================================================

fn publish_served(state: &AppState, ad_id: Uuid, platform: Platform) {
    let Some(events) = state.events.clone() else {
        return;
    };
    let event = AdServedEvent {
        ad_id,
        platform: platform.to_string(),
        selection_policy: state.delivery.policy().as_str().to_string(),
        timestamp: Utc::now().timestamp(),
    };

    tokio::spawn(async move {
        if let Err(e) = events.publish_served(&event).await {
            warn!("Dropped served event for ad {}: {}", event.ad_id, e);
        }
    });
}

fn publish_tracked(state: &AppState, ad_id: Uuid, event: TrackingEvent, performance: Performance) {
    let Some(events) = state.events.clone() else {
        return;
    };
    let event = AdTrackedEvent {
        ad_id,
        event: event.to_string(),
        impressions: performance.impressions,
        views: performance.views,
        clicks: performance.clicks,
        timestamp: Utc::now().timestamp(),
    };

    tokio::spawn(async move {
        if let Err(e) = events.publish_tracked(&event).await {
            warn!("Dropped tracked event for ad {}: {}", event.ad_id, e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platform() {
        assert_eq!(parse_platform(Some("instagram")).unwrap(), Platform::Instagram);
        assert!(matches!(parse_platform(None), Err(AppError::ValidationError(_))));
        assert!(matches!(parse_platform(Some("myspace")), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_parse_timestamp() {
        let parsed = parse_timestamp("2024-01-15T10:00:00+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-15T08:00:00+00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_rejected_body_names_violation() {
        let body = TrackResponse {
            status: TrackStatus::Rejected,
            violation: Some(OrderingViolation::ExceedsViews),
            performance: Performance::default(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["violation"], "ExceedsViews");
    }
}
