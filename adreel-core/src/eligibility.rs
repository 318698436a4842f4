use chrono::{DateTime, Utc};

use crate::advertisement::{Advertisement, Platform};

/// An ad is eligible at `now` on `platform` when it is active, targets the
/// platform and `now` falls inside its scheduling window.
pub fn is_eligible(ad: &Advertisement, platform: Platform, now: DateTime<Utc>) -> bool {
    ad.is_eligible(platform, now)
}

/// Keeps every eligible ad, in input order. No ranking is implied.
pub fn filter_eligible<I>(ads: I, platform: Platform, now: DateTime<Utc>) -> Vec<Advertisement>
where
    I: IntoIterator<Item = Advertisement>,
{
    ads.into_iter()
        .filter(|ad| is_eligible(ad, platform, now))
        .collect()
}

pub fn filter_eligible_now<I>(ads: I, platform: Platform) -> Vec<Advertisement>
where
    I: IntoIterator<Item = Advertisement>,
{
    filter_eligible(ads, platform, Utc::now())
}
