use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;

use super::{build_record, fetch_text, RateSource};
use crate::error::SourceError;
use crate::exchange_rate::{lima_today, RateRecord};

const PROVIDER_ID: &str = "html";

/// Scrapes a quote out of an HTML page with a regular expression.
///
/// The pattern must define `compra` and `venta` named groups and may define
/// `fecha` (`YYYY-MM-DD` or `DD/MM/YYYY`).
pub struct HtmlPageSource {
    client: Client,
    url: String,
    pattern: Regex,
    label: String,
}

impl HtmlPageSource {
    pub fn new(client: Client, url: &str, pattern: &str, label: &str) -> anyhow::Result<Self> {
        let pattern = Regex::new(pattern).with_context(|| format!("invalid HTML pattern {pattern:?}"))?;
        let groups: Vec<_> = pattern.capture_names().flatten().collect();
        if !groups.contains(&"compra") || !groups.contains(&"venta") {
            bail!("HTML pattern must define named groups `compra` and `venta`");
        }

        Ok(Self {
            client,
            url: url.to_string(),
            pattern,
            label: label.to_string(),
        })
    }

    fn extract(&self, html: &str) -> Result<RateRecord, SourceError> {
        let caps = self.pattern.captures(html).ok_or_else(|| SourceError::Malformed {
            provider: PROVIDER_ID,
            message: "pattern did not match".to_string(),
        })?;

        let as_of = caps
            .name("fecha")
            .and_then(|m| parse_page_date(m.as_str()))
            .unwrap_or_else(lima_today);

        // both groups are guaranteed by the constructor, but may not participate
        let buy = caps.name("compra").map_or("", |m| m.as_str());
        let sell = caps.name("venta").map_or("", |m| m.as_str());
        build_record(PROVIDER_ID, &self.label, buy, sell, as_of)
    }
}

fn parse_page_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

#[async_trait]
impl RateSource for HtmlPageSource {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch(&self) -> Result<RateRecord, SourceError> {
        let request = self.client.get(&self.url).header("Accept", "text/html");
        let html = fetch_text(PROVIDER_ID, request).await?;
        self.extract(&html)
    }
}
