//! Client for the BCRP statistical series API.
//!
//! The daily interbank USD/PEN buy and sell series are requested together
//! and come back as one list of periods with two values each.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;
use crate::exchange_rate::parse_positive_decimal;

pub const BCRP_API_URL: &str = "https://estadisticas.bcrp.gob.pe/estadisticas/series/api";

/// PD04639PD is the buy series, PD04640PD the sell series.
const USD_PEN_SERIES: &str = "PD04639PD-PD04640PD";

/// Marker BCRP uses for a missing observation.
pub const NOT_AVAILABLE: &str = "n.d.";

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Period {
    pub name: String,
    pub values: Vec<String>,
}

impl Period {
    /// Buy and sell for this period, if both are present and positive.
    pub fn rates(&self) -> Option<(Decimal, Decimal)> {
        let buy = self.values.first()?;
        let sell = self.values.get(1)?;
        if buy == NOT_AVAILABLE || sell == NOT_AVAILABLE {
            return None;
        }
        Some((parse_positive_decimal(buy)?, parse_positive_decimal(sell)?))
    }

    /// Period names look like `01Mar25` or `01.Mar.25`.
    pub fn date(&self) -> Option<NaiveDate> {
        ["%d%b%y", "%d.%b.%y"]
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(&self.name, format).ok())
    }
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    periods: Option<Vec<Period>>,
}

/// One point of the history chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub fecha: String,
    pub compra: Decimal,
    pub venta: Decimal,
}

#[derive(Clone)]
pub struct BcrpClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BcrpClient {
    pub fn new(client: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn series_url(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/{}/json/{}/{}/ing",
            self.base_url,
            USD_PEN_SERIES,
            start.format("%Y-%-m-%-d"),
            end.format("%Y-%-m-%-d")
        )
    }

    /// Downloads the raw series body for `[start, end]`.
    pub async fn fetch_raw(&self, start: NaiveDate, end: NaiveDate) -> Result<String, SeriesError> {
        let url = self.series_url(start, end);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("User-Agent", "Mozilla/5.0")
            .timeout(self.timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SeriesError::HttpStatus(resp.status().as_u16()));
        }

        Ok(resp.text().await?)
    }

    pub async fn fetch_series(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Period>, SeriesError> {
        let raw = self.fetch_raw(start, end).await?;
        parse_series(&raw)
    }

    /// Trailing `days` of buy/sell points ending at `today`, oldest first.
    pub async fn history(&self, today: NaiveDate, days: u64) -> Result<Vec<HistoryPoint>, SeriesError> {
        let start = today
            .checked_sub_days(chrono::Days::new(days))
            .unwrap_or(today);
        let periods = self.fetch_series(start, today).await?;
        Ok(history_points(periods))
    }
}

/// Parses a series body. BCRP serves JSON as text/html, sometimes with a
/// BOM or stray bytes around the object, so only the outermost braces are
/// kept.
pub fn parse_series(raw: &str) -> Result<Vec<Period>, SeriesError> {
    let cleaned = raw.trim_start_matches('\u{feff}').trim();
    let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) else {
        return Err(SeriesError::InvalidFormat);
    };
    if end < start {
        return Err(SeriesError::InvalidFormat);
    }

    let response: SeriesResponse = serde_json::from_str(&cleaned[start..=end])?;
    response.periods.ok_or(SeriesError::MissingPeriods)
}

/// Drops periods where either value is missing or not a usable rate.
pub fn history_points(periods: Vec<Period>) -> Vec<HistoryPoint> {
    periods
        .into_iter()
        .filter_map(|period| {
            let (compra, venta) = period.rates()?;
            Some(HistoryPoint {
                fecha: period.name,
                compra,
                venta,
            })
        })
        .collect()
}
