use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use log::debug;

use super::{build_record, RateSource};
use crate::bcrp::{BcrpClient, Period};
use crate::error::{SeriesError, SourceError};
use crate::exchange_rate::{lima_today, RateRecord};

const PROVIDER_ID: &str = "bcrp";
const LABEL: &str = "BCRP (Oficial)";

/// How far back to look when the requested day has no observation yet.
const TRAILING_WINDOW_DAYS: u64 = 5;

/// Central bank interbank rate from the statistical series API.
pub struct BcrpSource {
    client: BcrpClient,
}

impl BcrpSource {
    pub fn new(client: BcrpClient) -> Self {
        Self { client }
    }

    /// Latest observation on `today`, or within the trailing window if
    /// `today` has none (weekends, holidays, before publication).
    pub async fn fetch_on(&self, today: NaiveDate) -> Result<RateRecord, SourceError> {
        match self.client.fetch_series(today, today).await {
            Ok(periods) => {
                if let Some(period) = latest_with_rates(&periods) {
                    return record_from_period(period, today);
                }
            }
            Err(SeriesError::MissingPeriods | SeriesError::InvalidFormat | SeriesError::Json(_)) => {}
            Err(err) => return Err(into_source_error(err)),
        }

        debug!("BCRP has no observation for {}, widening window", today);
        let start = today
            .checked_sub_days(Days::new(TRAILING_WINDOW_DAYS))
            .unwrap_or(today);
        let periods = self
            .client
            .fetch_series(start, today)
            .await
            .map_err(into_source_error)?;

        // n.d. everywhere: report the newest period's values as invalid
        let period = latest_with_rates(&periods)
            .or(periods.last())
            .ok_or(SourceError::NoData { provider: PROVIDER_ID })?;
        record_from_period(period, today)
    }
}

fn latest_with_rates(periods: &[Period]) -> Option<&Period> {
    periods.iter().rev().find(|period| period.rates().is_some())
}

fn record_from_period(period: &Period, today: NaiveDate) -> Result<RateRecord, SourceError> {
    let (Some(buy), Some(sell)) = (period.values.first(), period.values.get(1)) else {
        return Err(SourceError::Malformed {
            provider: PROVIDER_ID,
            message: format!("period {} has {} values", period.name, period.values.len()),
        });
    };

    build_record(PROVIDER_ID, LABEL, buy, sell, period.date().unwrap_or(today))
}

fn into_source_error(err: SeriesError) -> SourceError {
    match err {
        SeriesError::Request(e) => SourceError::from_reqwest(PROVIDER_ID, e),
        SeriesError::HttpStatus(status) => SourceError::HttpStatus {
            provider: PROVIDER_ID,
            status,
        },
        SeriesError::InvalidFormat | SeriesError::Json(_) => SourceError::Malformed {
            provider: PROVIDER_ID,
            message: err.to_string(),
        },
        SeriesError::MissingPeriods => SourceError::NoData {
            provider: PROVIDER_ID,
        },
    }
}

#[async_trait]
impl RateSource for BcrpSource {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn label(&self) -> &str {
        LABEL
    }

    async fn fetch(&self) -> Result<RateRecord, SourceError> {
        self.fetch_on(lima_today()).await
    }
}
