use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::performance::Performance;
use crate::{CoreError, CoreResult};

/// Delivery surfaces an advertisement can be placed on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Youtube, Platform::Instagram];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Ok(Platform::Youtube),
            "instagram" => Ok(Platform::Instagram),
            other => Err(CoreError::ValidationError(format!(
                "unknown platform '{}', expected one of: youtube, instagram",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Advertiser {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgeRange {
    pub min: i32,
    pub max: i32,
}

impl Default for AgeRange {
    fn default() -> Self {
        Self { min: 18, max: 65 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetAudience {
    #[serde(default)]
    pub age_range: AgeRange,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub target_audience: TargetAudience,
}

impl Placement {
    pub fn targets(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }
}

/// Delivery window of an advertisement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scheduling {
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Scheduling {
    /// Active and `start_date <= now <= end_date` (open-ended when no end date)
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.start_date <= now
            && self.end_date.map_or(true, |end| end >= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    pub id: Uuid,
    pub title: String,
    pub advertiser: Advertiser,
    pub placement: Placement,
    pub video_url: String,
    /// Length of the creative in seconds
    pub duration: u32,
    #[serde(default)]
    pub shop_now_text: Option<String>,
    #[serde(default)]
    pub shop_now_url: Option<String>,
    pub scheduling: Scheduling,
    pub performance: Performance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Advertisement {
    pub fn is_eligible(&self, platform: Platform, now: DateTime<Utc>) -> bool {
        self.placement.targets(platform) && self.scheduling.is_live_at(now)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduling {
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Payload of the admin create action
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdvertisement {
    pub title: String,
    pub advertiser: Advertiser,
    pub placement: Placement,
    pub video_url: String,
    pub duration: u32,
    #[serde(default)]
    pub shop_now_text: Option<String>,
    #[serde(default)]
    pub shop_now_url: Option<String>,
    #[serde(default)]
    pub scheduling: NewScheduling,
}

const DEFAULT_SHOP_NOW_TEXT: &str = "Shop Now";

impl NewAdvertisement {
    /// Validates the payload and builds a fresh advertisement with zeroed counters.
    pub fn into_advertisement(self, now: DateTime<Utc>) -> CoreResult<Advertisement> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(CoreError::ValidationError("title must not be empty".into()));
        }

        let advertiser_name = self.advertiser.name.trim().to_string();
        if advertiser_name.is_empty() {
            return Err(CoreError::ValidationError("advertiser.name must not be empty".into()));
        }
        if let Some(email) = &self.advertiser.contact_email {
            if !email.contains('@') {
                return Err(CoreError::ValidationError(format!(
                    "advertiser.contactEmail '{}' is not an email address",
                    email
                )));
            }
        }

        let mut platforms = Vec::with_capacity(self.placement.platforms.len());
        for platform in self.placement.platforms {
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        if platforms.is_empty() {
            return Err(CoreError::ValidationError(
                "placement.platforms must name at least one platform".into(),
            ));
        }

        let age_range = self.placement.target_audience.age_range;
        if age_range.min < 0 || age_range.min > age_range.max {
            return Err(CoreError::ValidationError(format!(
                "invalid age range {}-{}",
                age_range.min, age_range.max
            )));
        }

        validate_http_url("videoUrl", &self.video_url)?;
        if let Some(url) = &self.shop_now_url {
            validate_http_url("shopNowUrl", url)?;
        }

        if self.duration == 0 {
            return Err(CoreError::ValidationError("duration must be greater than zero".into()));
        }

        let start_date = self.scheduling.start_date.unwrap_or(now);
        if let Some(end_date) = self.scheduling.end_date {
            if end_date < start_date {
                return Err(CoreError::ValidationError(
                    "scheduling.endDate must not precede scheduling.startDate".into(),
                ));
            }
        }

        let shop_now_text = match (self.shop_now_text, &self.shop_now_url) {
            (Some(text), _) => Some(text),
            (None, Some(_)) => Some(DEFAULT_SHOP_NOW_TEXT.to_string()),
            (None, None) => None,
        };

        Ok(Advertisement {
            id: Uuid::new_v4(),
            title,
            advertiser: Advertiser {
                name: advertiser_name,
                ..self.advertiser
            },
            placement: Placement {
                platforms,
                target_audience: self.placement.target_audience,
            },
            video_url: self.video_url,
            duration: self.duration,
            shop_now_text,
            shop_now_url: self.shop_now_url,
            scheduling: Scheduling {
                start_date,
                end_date: self.scheduling.end_date,
                is_active: self.scheduling.is_active.unwrap_or(true),
            },
            performance: Performance::default(),
            created_at: now,
            updated_at: now,
        })
    }
}

fn validate_http_url(field: &str, raw: &str) -> CoreResult<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| CoreError::ValidationError(format!("{} is not a valid URL: {}", field, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(CoreError::ValidationError(format!(
            "{} must use http or https, got '{}'",
            field, scheme
        ))),
    }
}
