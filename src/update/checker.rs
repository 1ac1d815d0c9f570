//! Interval-gated update checking.
//!
//! [`UpdateChecker`] answers one question: which published versions are
//! newer than the one currently running? It keeps network use down by only
//! refreshing its cached copy of the manifest when the configured
//! [`CheckInterval`] says the cache has gone stale, and it delegates the
//! staleness decision to the pure [`cutoff_millis`] function so the calendar
//! arithmetic is testable with a fixed clock.
//!
//! The flow inside one [`check_for_update`](UpdateChecker::check_for_update)
//! call is strictly sequential: cache load -> fetch (if stale) -> cache save ->
//! filter. The store is read once; concurrent external mutation of the
//! persisted record is not observed (last writer wins on save).

use chrono::{DateTime, Days, Local, Months, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::core::UpdateError;
use crate::host::{HttpFetch, HttpResponse, KeyValueStore};
use crate::update::cache::{UpdateCache, VersionData};
use crate::version::ScriptVersion;

/// How often a check is allowed to hit the network.
///
/// Supplied by the caller on every check; the engine never persists it.
/// Serde round-trips the wire spellings (`"every time"`, `"daily"`,
/// `"weekly"`, `"monthly"`) so host configuration files can carry the value
/// as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInterval {
    /// Every check refreshes the manifest; the cache is only a fallback.
    #[serde(rename = "every time")]
    EveryTime,
    /// At most one refresh per local calendar day.
    Daily,
    /// At most one refresh per rolling seven days.
    Weekly,
    /// At most one refresh per rolling calendar month.
    Monthly,
}

impl CheckInterval {
    /// The wire spelling of this interval.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EveryTime => "every time",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for CheckInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the staleness cutoff for `interval` at the moment `now`.
///
/// A cached record is stale when its `lastChecked` is at or before the
/// returned epoch-millisecond timestamp:
///
/// - `EveryTime` -> `now` itself, so any record is stale.
/// - `Daily` -> start of `now`'s day (local 00:00:00.000).
/// - `Weekly` -> start of the day seven days before `now`.
/// - `Monthly` -> start of the day one calendar month before `now` (chrono's
///   month arithmetic clamps, so March 31 minus one month is the last day of
///   February).
///
/// The shift is applied to `now` *before* truncating to start-of-day. `now`
/// is an explicit parameter rather than ambient time so the gate is
/// deterministic under test; pass [`chrono::Local::now()`] in production.
/// In the unlikely cases where the shifted date is unrepresentable or the
/// local midnight does not exist (a DST skip), the untruncated shifted
/// instant is used, which at worst refreshes the cache slightly early.
pub fn cutoff_millis<Tz: TimeZone>(interval: CheckInterval, now: DateTime<Tz>) -> i64 {
    let shifted = match interval {
        CheckInterval::EveryTime => return now.timestamp_millis(),
        CheckInterval::Daily => now,
        CheckInterval::Weekly => now
            .clone()
            .checked_sub_days(Days::new(7))
            .unwrap_or(now),
        CheckInterval::Monthly => now
            .clone()
            .checked_sub_months(Months::new(1))
            .unwrap_or(now),
    };

    let midnight = shifted.date_naive().and_time(NaiveTime::MIN);
    match shifted.timezone().from_local_datetime(&midnight).earliest() {
        Some(start_of_day) => start_of_day.timestamp_millis(),
        None => shifted.timestamp_millis(),
    }
}

/// Decides when to refresh the cached manifest and which versions are newer
/// than the running one.
///
/// Generic over the host's [`KeyValueStore`] (via [`UpdateCache`]) and
/// [`HttpFetch`] capabilities.
///
/// # Examples
///
/// ```rust,no_run
/// use evergreen::host::native::{JsonFileStore, ReqwestFetch};
/// use evergreen::host::ScriptIdentity;
/// use evergreen::update::{CheckInterval, UpdateCache, UpdateChecker};
///
/// # async fn example() -> Result<(), evergreen::core::UpdateError> {
/// let identity = ScriptIdentity::new("night-watch", "/opt/scripts/night-watch");
/// let cache = UpdateCache::new(JsonFileStore::new("/var/lib/night-watch"), &identity);
/// let checker = UpdateChecker::new(cache, ReqwestFetch::new());
///
/// let newer = checker
///     .check_for_update(
///         "https://example.com/night-watch/versions.json",
///         CheckInterval::Daily,
///         "1.4.2",
///     )
///     .await?;
/// for release in newer {
///     println!("{} ({}): {}", release.version, release.date, release.url);
/// }
/// # Ok(())
/// # }
/// ```
pub struct UpdateChecker<S, F> {
    cache: UpdateCache<S>,
    fetch: F,
}

impl<S: KeyValueStore, F: HttpFetch> UpdateChecker<S, F> {
    /// Create a checker from a cache and a fetch capability.
    pub fn new(cache: UpdateCache<S>, fetch: F) -> Self {
        Self { cache, fetch }
    }

    /// Check for versions newer than `current_version`.
    ///
    /// Loads the cached record, refreshes it from `manifest_url` when
    /// `interval` says it is stale, and returns the cached versions that
    /// compare greater than `current_version`, preserving manifest order.
    /// A failed cache write after a successful refresh is logged and
    /// ignored; the freshly fetched list is used regardless.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Validation`] when `current_version` (checked before
    ///   any network I/O) or a cached version string violates the grammar.
    /// - [`UpdateError::Fetch`] when the manifest request fails or returns a
    ///   non-success status; the persisted cache is left as loaded.
    /// - [`UpdateError::ManifestParse`] when the response body is not a JSON
    ///   array of version descriptors; likewise leaves the cache untouched.
    pub async fn check_for_update(
        &self,
        manifest_url: &str,
        interval: CheckInterval,
        current_version: &str,
    ) -> Result<Vec<VersionData>, UpdateError> {
        let current = ScriptVersion::parse("current_version", current_version)?;

        let mut record = self.cache.load().await;
        let cutoff = cutoff_millis(interval, Local::now());

        if record.last_checked <= cutoff {
            debug!(
                "update cache stale (lastChecked {} <= cutoff {cutoff}), refreshing from {manifest_url}",
                record.last_checked
            );
            let response = self.fetch.get(manifest_url).await?;
            if !response.is_success() {
                return Err(UpdateError::Fetch {
                    url: manifest_url.to_string(),
                    reason: format!("HTTP {} {}", response.status(), response.status_text()),
                });
            }
            let versions: Vec<VersionData> =
                response
                    .json()
                    .await
                    .map_err(|err| UpdateError::ManifestParse {
                        url: manifest_url.to_string(),
                        reason: err.to_string(),
                    })?;

            info!("manifest lists {} published version(s)", versions.len());
            record.versions = versions;
            record.last_checked = Utc::now().timestamp_millis();
            if !self.cache.save(&record).await {
                warn!("could not persist refreshed update cache; continuing with in-memory copy");
            }
        } else {
            debug!(
                "update cache fresh (lastChecked {} > cutoff {cutoff}), skipping fetch",
                record.last_checked
            );
        }

        let mut newer = Vec::new();
        for entry in &record.versions {
            let candidate = ScriptVersion::parse("version", &entry.version)?;
            if candidate > current {
                newer.push(entry.clone());
            }
        }
        Ok(newer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        utc().with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn every_time_cutoff_is_now() {
        let now = at(2024, 3, 15, 10, 30);
        assert_eq!(cutoff_millis(CheckInterval::EveryTime, now), now.timestamp_millis());
    }

    #[test]
    fn daily_cutoff_is_start_of_today() {
        let now = at(2024, 3, 15, 10, 30);
        let expected = at(2024, 3, 15, 0, 0);
        assert_eq!(cutoff_millis(CheckInterval::Daily, now), expected.timestamp_millis());
    }

    #[test]
    fn weekly_cutoff_is_start_of_day_seven_days_back() {
        let now = at(2024, 3, 15, 10, 30);
        let expected = at(2024, 3, 8, 0, 0);
        assert_eq!(cutoff_millis(CheckInterval::Weekly, now), expected.timestamp_millis());
    }

    #[test]
    fn monthly_cutoff_is_start_of_day_a_month_back() {
        let now = at(2024, 3, 15, 10, 30);
        let expected = at(2024, 2, 15, 0, 0);
        assert_eq!(cutoff_millis(CheckInterval::Monthly, now), expected.timestamp_millis());
    }

    #[test]
    fn monthly_cutoff_clamps_at_month_end() {
        let now = at(2024, 3, 31, 8, 0);
        let expected = at(2024, 2, 29, 0, 0);
        assert_eq!(cutoff_millis(CheckInterval::Monthly, now), expected.timestamp_millis());
    }

    #[test]
    fn shift_happens_before_truncation() {
        // 00:30 local: a week back lands on the same date seven days earlier,
        // not eight, because truncation comes after the shift.
        let now = at(2024, 3, 15, 0, 30);
        let expected = at(2024, 3, 8, 0, 0);
        assert_eq!(cutoff_millis(CheckInterval::Weekly, now), expected.timestamp_millis());
    }

    #[test]
    fn interval_wire_spellings_round_trip() {
        for (interval, wire) in [
            (CheckInterval::EveryTime, "\"every time\""),
            (CheckInterval::Daily, "\"daily\""),
            (CheckInterval::Weekly, "\"weekly\""),
            (CheckInterval::Monthly, "\"monthly\""),
        ] {
            assert_eq!(serde_json::to_string(&interval).unwrap(), wire);
            let back: CheckInterval = serde_json::from_str(wire).unwrap();
            assert_eq!(back, interval);
            assert_eq!(format!("\"{interval}\""), wire);
        }
    }
}
