use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Lima runs on UTC-05:00 all year.
const LIMA_OFFSET_SECS: i32 = -5 * 3600;

/// A USD/PEN quote as handed to callers.
///
/// Serialises with the field names the site's widgets read
/// (`compra`, `venta`, `fuente`, `fecha`, `actualizadoEn`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateRecord {
    #[serde(rename = "compra")]
    pub buy: Decimal,
    #[serde(rename = "venta")]
    pub sell: Decimal,
    #[serde(rename = "fuente")]
    pub source: String,
    #[serde(rename = "fecha")]
    pub as_of: NaiveDate,
    #[serde(rename = "actualizadoEn")]
    pub retrieved_at: DateTime<Utc>,
}

impl RateRecord {
    pub fn new(buy: Decimal, sell: Decimal, source: impl Into<String>, as_of: NaiveDate) -> Self {
        Self {
            buy,
            sell,
            source: source.into(),
            as_of,
            retrieved_at: Utc::now(),
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.sell < self.buy
    }
}

/// Current calendar date in Lima.
pub fn lima_today() -> NaiveDate {
    lima_date(Utc::now())
}

pub fn lima_date(at: DateTime<Utc>) -> NaiveDate {
    match FixedOffset::east_opt(LIMA_OFFSET_SECS) {
        Some(offset) => at.with_timezone(&offset).date_naive(),
        None => at.date_naive(),
    }
}

/// Parses an upstream rate, accepting a decimal comma and surrounding
/// whitespace. Zero and negative values are rejected.
pub fn parse_positive_decimal(raw: &str) -> Option<Decimal> {
    let normalized_string = normalize_decimal_string(raw.trim());
    let value = Decimal::from_str(&normalized_string).ok()?;
    (value > Decimal::ZERO).then_some(value)
}

fn normalize_decimal_string(s: &str) -> String {
    s.replace(',', ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_plain_and_comma_decimals() {
        assert_eq!(parse_positive_decimal("3.700"), Some(dec!(3.700)));
        assert_eq!(parse_positive_decimal(" 3,75 "), Some(dec!(3.75)));
    }

    #[test]
    fn rejects_non_numeric_and_non_positive() {
        assert_eq!(parse_positive_decimal("abc"), None);
        assert_eq!(parse_positive_decimal("n.d."), None);
        assert_eq!(parse_positive_decimal(""), None);
        assert_eq!(parse_positive_decimal("0"), None);
        assert_eq!(parse_positive_decimal("-3.7"), None);
    }

    #[test]
    fn lima_date_lags_utc_late_at_night() {
        let utc = Utc.with_ymd_and_hms(2025, 3, 16, 3, 0, 0).unwrap();
        assert_eq!(lima_date(utc), NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());

        let utc = Utc.with_ymd_and_hms(2025, 3, 16, 6, 0, 0).unwrap();
        assert_eq!(lima_date(utc), NaiveDate::from_ymd_opt(2025, 3, 16).unwrap());
    }

    #[test]
    fn serialises_with_widget_field_names() {
        let record = RateRecord {
            buy: dec!(3.700),
            sell: dec!(3.750),
            source: "SUNAT (Oficial)".to_string(),
            as_of: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            retrieved_at: Utc.with_ymd_and_hms(2025, 3, 15, 14, 0, 0).unwrap(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["compra"], serde_json::json!(3.7));
        assert_eq!(json["venta"], serde_json::json!(3.75));
        assert_eq!(json["fuente"], "SUNAT (Oficial)");
        assert_eq!(json["fecha"], "2025-03-15");
        assert!(json["actualizadoEn"].as_str().unwrap().starts_with("2025-03-15T14:00:00"));
    }

    #[test]
    fn detects_inverted_spread() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert!(!RateRecord::new(dec!(3.70), dec!(3.75), "x", today).is_inverted());
        assert!(RateRecord::new(dec!(3.80), dec!(3.75), "x", today).is_inverted());
    }
}
