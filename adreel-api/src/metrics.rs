use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::{error::AppError, state::AppState};

pub struct Metrics {
    registry: Registry,
    /// Labels: platform, outcome (`served` | `empty`)
    pub ad_requests: IntCounterVec,
    /// Labels: event, outcome (`accepted` | `rejected` | `not_found`)
    pub tracking_events: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let ad_requests = IntCounterVec::new(
            Opts::new("adreel_ad_requests_total", "Placement requests by platform and outcome"),
            &["platform", "outcome"],
        )?;
        let tracking_events = IntCounterVec::new(
            Opts::new("adreel_tracking_events_total", "Tracking events by type and outcome"),
            &["event", "outcome"],
        )?;

        registry.register(Box::new(ad_requests.clone()))?;
        registry.register(Box::new(tracking_events.clone()))?;

        Ok(Self {
            registry,
            ad_requests,
            tracking_events,
        })
    }

    pub fn render(&self) -> Result<String, anyhow::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_labelled_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.ad_requests.with_label_values(&["youtube", "served"]).inc();
        metrics.tracking_events.with_label_values(&["click", "rejected"]).inc_by(2);

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"adreel_ad_requests_total{outcome="served",platform="youtube"} 1"#));
        assert!(text.contains(r#"adreel_tracking_events_total{event="click",outcome="rejected"} 2"#));
    }
}
