//! Rate resolution: fresh cache, then the source ladder, then whatever was
//! last known.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::cache::FreshnessCache;
use crate::exchange_rate::{lima_today, RateRecord};
use crate::source::RateSource;

pub const FALLBACK_LABEL: &str = "Ultimo dato conocido";

/// Seed for the last-known value before any source has answered.
pub fn seed_fallback(as_of: NaiveDate) -> RateRecord {
    RateRecord::new(Decimal::new(372, 2), Decimal::new(375, 2), FALLBACK_LABEL, as_of)
}

struct ResolverState {
    cache: FreshnessCache,
    fallback: RateRecord,
}

impl ResolverState {
    /// Best record available without asking any source: the stale cache
    /// entry, else the last known value stamped now.
    fn degraded(&self) -> RateRecord {
        if let Some(stale) = self.cache.read() {
            warn!("Serving stale rate from {}", stale.source);
            return stale.clone();
        }

        warn!("Serving last known rate");
        RateRecord {
            retrieved_at: Utc::now(),
            ..self.fallback.clone()
        }
    }
}

/// Resolves the current USD/PEN quote. Never fails: when every source is
/// down it serves the stale cache entry, or failing that the last known
/// value.
///
/// The state lock is held for a whole resolution. A caller that waited on
/// the lock while another resolution ran takes that outcome (fresh cache,
/// or the degraded record) instead of walking the ladder again.
pub struct RateResolver {
    sources: Vec<Box<dyn RateSource>>,
    state: Mutex<ResolverState>,
    /// Ladder runs completed so far, bumped under the state lock.
    attempts: AtomicU64,
}

impl RateResolver {
    pub fn new(sources: Vec<Box<dyn RateSource>>, cache_ttl: Duration) -> Self {
        Self::with_fallback(sources, cache_ttl, seed_fallback(lima_today()))
    }

    pub fn with_fallback(
        sources: Vec<Box<dyn RateSource>>,
        cache_ttl: Duration,
        fallback: RateRecord,
    ) -> Self {
        Self {
            sources,
            state: Mutex::new(ResolverState {
                cache: FreshnessCache::new(cache_ttl),
                fallback,
            }),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn source_ids(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.id()).collect()
    }

    pub async fn resolve(&self) -> RateRecord {
        let seen = self.attempts.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        if state.cache.is_valid() {
            if let Some(record) = state.cache.read() {
                debug!("Serving cached rate from {}", record.source);
                return record.clone();
            }
        }

        if self.attempts.load(Ordering::Acquire) != seen {
            debug!("Sources already failed while waiting, not retrying");
            return state.degraded();
        }

        let resolved = self.walk_sources().await;
        if let Some(record) = &resolved {
            state.fallback.buy = record.buy;
            state.fallback.sell = record.sell;
            state.fallback.as_of = record.as_of;
            state.cache.write(record.clone());
        }
        self.attempts.fetch_add(1, Ordering::Release);

        match resolved {
            Some(record) => record,
            None => {
                warn!("All rate sources failed");
                state.degraded()
            }
        }
    }

    async fn walk_sources(&self) -> Option<RateRecord> {
        for source in &self.sources {
            match source.fetch().await {
                Ok(record) => {
                    info!(
                        "Rate from {}: compra {} venta {} ({})",
                        source.label(),
                        record.buy,
                        record.sell,
                        record.as_of
                    );
                    if record.is_inverted() {
                        warn!(
                            "{} quoted venta {} below compra {}",
                            source.label(),
                            record.sell,
                            record.buy
                        );
                    }
                    return Some(record);
                }
                Err(err) => warn!("Rate source unavailable: {}", err),
            }
        }

        None
    }
}
