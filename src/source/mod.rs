//! Upstream rate sources.
//!
//! Each source wraps one retrieval mechanism and either yields a
//! [`RateRecord`] or a [`SourceError`] explaining why it is unavailable.
//! The resolver walks them in the configured order.

mod bcrp;
mod html_page;
mod json_api;
mod sunat_txt;

pub use bcrp::BcrpSource;
pub use html_page::HtmlPageSource;
pub use json_api::{JsonApiSource, JsonFields, APIS_NET_PE_URL, DECOLECTA_URL, EAPI_URL};
pub use sunat_txt::{parse_sunat_line, SunatTxtSource, SUNAT_TXT_URL};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;

use crate::bcrp::BcrpClient;
use crate::config::{Config, SourceKind};
use crate::error::SourceError;
use crate::exchange_rate::{parse_positive_decimal, RateRecord};

#[async_trait]
pub trait RateSource: Send + Sync {
    /// Stable identifier, as used in `CAMBIO_SOURCES`.
    fn id(&self) -> &'static str;

    /// Provenance shown to users in the `fuente` field.
    fn label(&self) -> &str;

    async fn fetch(&self) -> Result<RateRecord, SourceError>;
}

/// Sends `request` and returns the body of a 2xx response.
pub(crate) async fn fetch_text(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<String, SourceError> {
    let resp = request
        .send()
        .await
        .map_err(|e| SourceError::from_reqwest(provider, e))?;
    if !resp.status().is_success() {
        return Err(SourceError::HttpStatus {
            provider,
            status: resp.status().as_u16(),
        });
    }

    resp.text()
        .await
        .map_err(|e| SourceError::from_reqwest(provider, e))
}

pub(crate) fn parse_rate(provider: &'static str, raw: &str) -> Result<Decimal, SourceError> {
    parse_positive_decimal(raw).ok_or_else(|| SourceError::InvalidRate {
        provider,
        value: raw.to_string(),
    })
}

/// Builds a record from raw buy/sell strings, validating both.
pub(crate) fn build_record(
    provider: &'static str,
    label: &str,
    buy: &str,
    sell: &str,
    as_of: NaiveDate,
) -> Result<RateRecord, SourceError> {
    let buy = parse_rate(provider, buy)?;
    let sell = parse_rate(provider, sell)?;
    Ok(RateRecord::new(buy, sell, label, as_of))
}

/// Instantiates the configured source ladder, in priority order.
pub fn build_sources(config: &Config, client: &Client) -> anyhow::Result<Vec<Box<dyn RateSource>>> {
    let endpoints = &config.endpoints;
    let mut sources: Vec<Box<dyn RateSource>> = Vec::with_capacity(config.sources.len());

    for kind in &config.sources {
        let source: Box<dyn RateSource> = match kind {
            SourceKind::ApisNetPe => {
                Box::new(JsonApiSource::apis_net_pe(client.clone(), &endpoints.apis_net_pe))
            }
            SourceKind::SunatTxt => {
                Box::new(SunatTxtSource::new(client.clone(), &endpoints.sunat_txt))
            }
            SourceKind::Bcrp => Box::new(BcrpSource::new(BcrpClient::new(
                client.clone(),
                &endpoints.bcrp,
                config.request_timeout,
            ))),
            SourceKind::EApi => Box::new(JsonApiSource::eapi(client.clone(), &endpoints.eapi)),
            SourceKind::Decolecta => {
                let Some(api_key) = &config.decolecta_api_key else {
                    anyhow::bail!("source decolecta requires DECOLECTA_API_KEY");
                };
                Box::new(JsonApiSource::decolecta(
                    client.clone(),
                    &endpoints.decolecta,
                    api_key,
                ))
            }
            SourceKind::HtmlPage => {
                let Some(html) = &config.html_source else {
                    anyhow::bail!("source html requires CAMBIO_HTML_URL and CAMBIO_HTML_PATTERN");
                };
                Box::new(HtmlPageSource::new(
                    client.clone(),
                    &html.url,
                    &html.pattern,
                    &html.label,
                )?)
            }
        };
        sources.push(source);
    }

    Ok(sources)
}
