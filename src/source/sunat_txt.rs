use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;

use super::{build_record, fetch_text, RateSource};
use crate::error::SourceError;
use crate::exchange_rate::{lima_today, RateRecord};

pub const SUNAT_TXT_URL: &str = "https://www.sunat.gob.pe/a/txt/tipoCambio.txt";

const PROVIDER_ID: &str = "sunat";
const LABEL: &str = "SUNAT (Oficial)";

/// SUNAT rejects requests without a browser user agent.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// SUNAT's plain-text daily file, `DD/MM/YYYY|buy|sell|`.
pub struct SunatTxtSource {
    client: Client,
    url: String,
}

impl SunatTxtSource {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

/// Parses one `DD/MM/YYYY|buy|sell|` line. An unreadable date falls back
/// to today; unreadable rates make the whole line unusable.
pub fn parse_sunat_line(text: &str) -> Result<RateRecord, SourceError> {
    let parts: Vec<&str> = text.trim().split('|').collect();
    if parts.len() < 3 {
        return Err(SourceError::Malformed {
            provider: PROVIDER_ID,
            message: format!("expected 3 fields, got {}", parts.len()),
        });
    }

    let as_of = NaiveDate::parse_from_str(parts[0].trim(), "%d/%m/%Y").unwrap_or_else(|_| lima_today());
    build_record(PROVIDER_ID, LABEL, parts[1], parts[2], as_of)
}

#[async_trait]
impl RateSource for SunatTxtSource {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn label(&self) -> &str {
        LABEL
    }

    async fn fetch(&self) -> Result<RateRecord, SourceError> {
        let request = self
            .client
            .get(&self.url)
            .header("User-Agent", BROWSER_USER_AGENT);
        let text = fetch_text(PROVIDER_ID, request).await?;
        parse_sunat_line(&text)
    }
}
