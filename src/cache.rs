use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::exchange_rate::RateRecord;

/// Default validity window for a resolved rate.
pub const DEFAULT_TTL: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    record: RateRecord,
    cached_at: DateTime<Utc>,
}

/// Holds the most recently resolved rate. An expired entry is kept around
/// so it can still be served when every source is down.
#[derive(Debug)]
pub struct FreshnessCache {
    entry: Option<CacheEntry>,
    ttl: Duration,
}

impl FreshnessCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entry: None, ttl }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match &self.entry {
            Some(entry) => match (now - entry.cached_at).to_std() {
                Ok(age) => age < self.ttl,
                // cached_at in the future means the clock moved backwards
                Err(_) => true,
            },
            None => false,
        }
    }

    pub fn read(&self) -> Option<&RateRecord> {
        self.entry.as_ref().map(|entry| &entry.record)
    }

    pub fn write(&mut self, record: RateRecord) {
        self.write_at(record, Utc::now());
    }

    pub fn write_at(&mut self, record: RateRecord, now: DateTime<Utc>) {
        self.entry = Some(CacheEntry {
            record,
            cached_at: now,
        });
    }
}

impl Default for FreshnessCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};
    use rust_decimal_macros::dec;

    fn record() -> RateRecord {
        RateRecord::new(
            dec!(3.70),
            dec!(3.75),
            "test",
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
        )
    }

    #[test]
    fn empty_cache_is_not_valid() {
        let cache = FreshnessCache::default();
        assert!(!cache.is_valid());
        assert!(cache.read().is_none());
    }

    #[test]
    fn entry_is_valid_inside_window() {
        let mut cache = FreshnessCache::default();
        let now = Utc::now();
        cache.write_at(record(), now);

        assert!(cache.is_valid_at(now));
        assert!(cache.is_valid_at(now + TimeDelta::hours(3) + TimeDelta::minutes(59)));
    }

    #[test]
    fn entry_expires_at_window_but_stays_readable() {
        let mut cache = FreshnessCache::default();
        let now = Utc::now();
        cache.write_at(record(), now);

        assert!(!cache.is_valid_at(now + TimeDelta::hours(4)));
        let stale = cache.read().unwrap();
        assert_eq!(stale.buy, dec!(3.70));
        assert_eq!(stale.sell, dec!(3.75));
    }

    #[test]
    fn write_replaces_previous_entry() {
        let mut cache = FreshnessCache::new(Duration::from_secs(60));
        cache.write(record());

        let mut newer = record();
        newer.sell = dec!(3.80);
        cache.write(newer.clone());

        assert_eq!(cache.read(), Some(&newer));
        assert!(cache.is_valid());
    }

    #[test]
    fn zero_ttl_is_always_stale() {
        let mut cache = FreshnessCache::new(Duration::ZERO);
        cache.write(record());
        assert!(!cache.is_valid());
        assert!(cache.read().is_some());
    }
}
