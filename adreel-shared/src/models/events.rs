use uuid::Uuid;

/// Published when the delivery API hands an advertisement to a client.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct AdServedEvent {
    pub ad_id: Uuid,
    pub platform: String,
    pub selection_policy: String,
    pub timestamp: i64,
}

/// Published for every accepted impression, view or click.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct AdTrackedEvent {
    pub ad_id: Uuid,
    pub event: String,
    pub impressions: u64,
    pub views: u64,
    pub clicks: u64,
    pub timestamp: i64,
}

impl AdServedEvent {
    pub fn event_type(&self) -> &'static str {
        "ad_served"
    }
}

impl AdTrackedEvent {
    pub fn event_type(&self) -> &'static str {
        "ad_tracked"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_event_payload() {
        let event = AdTrackedEvent {
            ad_id: Uuid::nil(),
            event: "click".to_string(),
            impressions: 3,
            views: 2,
            clicks: 1,
            timestamp: 1_700_000_000,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "click");
        assert_eq!(json["clicks"], 1);
        assert_eq!(json["ad_id"], "00000000-0000-0000-0000-000000000000");
    }
}
