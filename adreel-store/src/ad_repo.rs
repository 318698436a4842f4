use adreel_core::{
    AdRepository, Advertisement, Advertiser, AgeRange, CoreError, CoreResult, Counters, EngagementWeights,
    Performance, Placement, Platform, Scheduling, TargetAudience, TrackingEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

const AD_COLUMNS: &str = r#"
    id, title, advertiser_name, advertiser_website, advertiser_contact_email,
    platforms, age_min, age_max, interests, categories,
    video_url, duration_seconds, shop_now_text, shop_now_url,
    start_date, end_date, is_active,
    impressions, views, clicks, created_at, updated_at
"#;

pub struct PostgresAdRepository {
    pool: PgPool,
    weights: EngagementWeights,
}

impl PostgresAdRepository {
    pub fn new(pool: PgPool, weights: EngagementWeights) -> Self {
        Self { pool, weights }
    }

    async fn fetch_counters(&self, id: Uuid) -> CoreResult<Option<Counters>> {
        let row = sqlx::query_as::<_, CounterRow>(
            "SELECT impressions, views, clicks FROM advertisements WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(CounterRow::into_counters))
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct AdvertisementRow {
    id: Uuid,
    title: String,
    advertiser_name: String,
    advertiser_website: Option<String>,
    advertiser_contact_email: Option<String>,
    platforms: Vec<String>,
    age_min: i32,
    age_max: i32,
    interests: Vec<String>,
    categories: Vec<String>,
    video_url: String,
    duration_seconds: i32,
    shop_now_text: Option<String>,
    shop_now_url: Option<String>,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    is_active: bool,
    impressions: i64,
    views: i64,
    clicks: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AdvertisementRow {
    fn into_advertisement(self, weights: &EngagementWeights) -> CoreResult<Advertisement> {
        let platforms = self
            .platforms
            .iter()
            .map(|p| p.parse::<Platform>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::StorageError(format!("corrupt platforms on ad {}: {}", self.id, e)))?;

        let duration = u32::try_from(self.duration_seconds)
            .map_err(|_| CoreError::StorageError(format!("corrupt duration on ad {}", self.id)))?;

        let counters = Counters::new(
            non_negative(self.impressions),
            non_negative(self.views),
            non_negative(self.clicks),
        );

        Ok(Advertisement {
            id: self.id,
            title: self.title,
            advertiser: Advertiser {
                name: self.advertiser_name,
                website: self.advertiser_website,
                contact_email: self.advertiser_contact_email,
            },
            placement: Placement {
                platforms,
                target_audience: TargetAudience {
                    age_range: AgeRange {
                        min: self.age_min,
                        max: self.age_max,
                    },
                    interests: self.interests,
                    categories: self.categories,
                },
            },
            video_url: self.video_url,
            duration,
            shop_now_text: self.shop_now_text,
            shop_now_url: self.shop_now_url,
            scheduling: Scheduling {
                start_date: self.start_date,
                end_date: self.end_date,
                is_active: self.is_active,
            },
            performance: counters.performance(weights),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CounterRow {
    impressions: i64,
    views: i64,
    clicks: i64,
}

impl CounterRow {
    fn into_counters(self) -> Counters {
        Counters::new(
            non_negative(self.impressions),
            non_negative(self.views),
            non_negative(self.clicks),
        )
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn storage_error(e: sqlx::Error) -> CoreError {
    error!("Database error: {}", e);
    CoreError::StorageError(e.to_string())
}

/// Single-statement conditional increment for each event.
///
/// The predicate is re-evaluated under the row lock, so concurrent events on
/// one ad never lose updates and never break the funnel order.
fn increment_sql(event: TrackingEvent) -> &'static str {
    match event {
        TrackingEvent::Impression => {
            r#"
            UPDATE advertisements
            SET impressions = impressions + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING impressions, views, clicks
            "#
        }
        TrackingEvent::View => {
            r#"
            UPDATE advertisements
            SET views = views + 1, updated_at = NOW()
            WHERE id = $1 AND views < impressions
            RETURNING impressions, views, clicks
            "#
        }
        TrackingEvent::Click => {
            r#"
            UPDATE advertisements
            SET clicks = clicks + 1, updated_at = NOW()
            WHERE id = $1 AND clicks < views
            RETURNING impressions, views, clicks
            "#
        }
    }
}

#[async_trait]
impl AdRepository for PostgresAdRepository {
    async fn create_advertisement(&self, ad: &Advertisement) -> CoreResult<()> {
        let platforms: Vec<String> = ad.placement.platforms.iter().map(|p| p.to_string()).collect();
        let duration = i32::try_from(ad.duration)
            .map_err(|_| CoreError::ValidationError(format!("duration {} is too large", ad.duration)))?;
        let counters = ad.performance.counters();

        sqlx::query(
            r#"
            INSERT INTO advertisements (
                id, title, advertiser_name, advertiser_website, advertiser_contact_email,
                platforms, age_min, age_max, interests, categories,
                video_url, duration_seconds, shop_now_text, shop_now_url,
                start_date, end_date, is_active,
                impressions, views, clicks, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(ad.id)
        .bind(&ad.title)
        .bind(&ad.advertiser.name)
        .bind(ad.advertiser.website.as_deref())
        .bind(ad.advertiser.contact_email.as_deref())
        .bind(&platforms)
        .bind(ad.placement.target_audience.age_range.min)
        .bind(ad.placement.target_audience.age_range.max)
        .bind(&ad.placement.target_audience.interests)
        .bind(&ad.placement.target_audience.categories)
        .bind(&ad.video_url)
        .bind(duration)
        .bind(ad.shop_now_text.as_deref())
        .bind(ad.shop_now_url.as_deref())
        .bind(ad.scheduling.start_date)
        .bind(ad.scheduling.end_date)
        .bind(ad.scheduling.is_active)
        .bind(i64::try_from(counters.impressions).unwrap_or(i64::MAX))
        .bind(i64::try_from(counters.views).unwrap_or(i64::MAX))
        .bind(i64::try_from(counters.clicks).unwrap_or(i64::MAX))
        .bind(ad.created_at)
        .bind(ad.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn get_advertisement(&self, id: Uuid) -> CoreResult<Option<Advertisement>> {
        let sql = format!("SELECT {} FROM advertisements WHERE id = $1", AD_COLUMNS);
        let row = sqlx::query_as::<_, AdvertisementRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(|r| r.into_advertisement(&self.weights)).transpose()
    }

    async fn list_advertisements(&self, platform: Option<Platform>) -> CoreResult<Vec<Advertisement>> {
        let sql = format!(
            "SELECT {} FROM advertisements WHERE ($1::TEXT IS NULL OR $1 = ANY(platforms)) ORDER BY created_at, id",
            AD_COLUMNS
        );
        let rows = sqlx::query_as::<_, AdvertisementRow>(&sql)
            .bind(platform.map(|p| p.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.into_iter()
            .map(|r| r.into_advertisement(&self.weights))
            .collect()
    }

    async fn list_delivery_candidates(&self, platform: Platform) -> CoreResult<Vec<Advertisement>> {
        let sql = format!(
            "SELECT {} FROM advertisements WHERE is_active AND $1 = ANY(platforms) ORDER BY created_at, id",
            AD_COLUMNS
        );
        let rows = sqlx::query_as::<_, AdvertisementRow>(&sql)
            .bind(platform.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.into_iter()
            .map(|r| r.into_advertisement(&self.weights))
            .collect()
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> CoreResult<Option<Advertisement>> {
        let sql = format!(
            "UPDATE advertisements SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            AD_COLUMNS
        );
        let row = sqlx::query_as::<_, AdvertisementRow>(&sql)
            .bind(id)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(|r| r.into_advertisement(&self.weights)).transpose()
    }

    async fn record_event(&self, id: Uuid, event: TrackingEvent) -> CoreResult<Performance> {
        let updated = sqlx::query_as::<_, CounterRow>(increment_sql(event))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        if let Some(row) = updated {
            return Ok(row.into_counters().performance(&self.weights));
        }

        // No row updated: either the ad does not exist or the guard rejected the event.
        let current = self.fetch_counters(id).await?.ok_or(CoreError::NotFound(id))?;
        match event.violation() {
            Some(violation) => Err(CoreError::OrderingViolation {
                violation,
                performance: current.performance(&self.weights),
            }),
            // Impressions are unconditional, so a miss can only be a concurrent delete.
            None => Err(CoreError::NotFound(id)),
        }
    }
}
