use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::bcrp::BCRP_API_URL;
use crate::cache::DEFAULT_TTL;
use crate::source::{APIS_NET_PE_URL, DECOLECTA_URL, EAPI_URL, SUNAT_TXT_URL};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 8_000;
const DEFAULT_HISTORY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_HISTORY_DAYS: u64 = 35;
const DEFAULT_HTML_LABEL: &str = "Cotizacion web";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    ApisNetPe,
    SunatTxt,
    Bcrp,
    EApi,
    Decolecta,
    HtmlPage,
}

impl SourceKind {
    pub const DEFAULT_LADDER: [SourceKind; 4] = [
        SourceKind::ApisNetPe,
        SourceKind::SunatTxt,
        SourceKind::Bcrp,
        SourceKind::EApi,
    ];
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apisnetpe" => Ok(Self::ApisNetPe),
            "sunat" => Ok(Self::SunatTxt),
            "bcrp" => Ok(Self::Bcrp),
            "eapi" => Ok(Self::EApi),
            "decolecta" => Ok(Self::Decolecta),
            "html" => Ok(Self::HtmlPage),
            other => Err(anyhow!("unknown rate source {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub apis_net_pe: String,
    pub sunat_txt: String,
    pub bcrp: String,
    pub eapi: String,
    pub decolecta: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            apis_net_pe: APIS_NET_PE_URL.to_string(),
            sunat_txt: SUNAT_TXT_URL.to_string(),
            bcrp: BCRP_API_URL.to_string(),
            eapi: EAPI_URL.to_string(),
            decolecta: DECOLECTA_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HtmlSourceConfig {
    pub url: String,
    pub pattern: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
    pub history_timeout: Duration,
    pub history_days: u64,
    pub sources: Vec<SourceKind>,
    pub endpoints: Endpoints,
    pub decolecta_api_key: Option<String>,
    pub html_source: Option<HtmlSourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cache_ttl: DEFAULT_TTL,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            history_timeout: Duration::from_millis(DEFAULT_HISTORY_TIMEOUT_MS),
            history_days: DEFAULT_HISTORY_DAYS,
            sources: SourceKind::DEFAULT_LADDER.to_vec(),
            endpoints: Endpoints::default(),
            decolecta_api_key: None,
            html_source: None,
        }
    }
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let millis = |key: &str, default: u64| -> Result<Duration> {
            match var(key) {
                Some(raw) => raw
                    .parse()
                    .map(Duration::from_millis)
                    .with_context(|| format!("invalid {key}: {raw:?}")),
                None => Ok(Duration::from_millis(default)),
            }
        };

        let listen_addr = var("CAMBIO_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .with_context(|| format!("invalid CAMBIO_LISTEN_ADDR: {listen_addr:?}"))?;

        let cache_ttl = match var("CAMBIO_CACHE_TTL_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse()
                    .with_context(|| format!("invalid CAMBIO_CACHE_TTL_SECS: {raw:?}"))?,
            ),
            None => DEFAULT_TTL,
        };

        let history_days = match var("CAMBIO_HISTORY_DAYS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid CAMBIO_HISTORY_DAYS: {raw:?}"))?,
            None => DEFAULT_HISTORY_DAYS,
        };

        let sources = match var("CAMBIO_SOURCES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(SourceKind::from_str)
                .collect::<Result<Vec<_>>>()?,
            None => SourceKind::DEFAULT_LADDER.to_vec(),
        };
        if sources.is_empty() {
            anyhow::bail!("CAMBIO_SOURCES lists no sources");
        }

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            apis_net_pe: var("CAMBIO_APISNETPE_URL").unwrap_or(defaults.apis_net_pe),
            sunat_txt: var("CAMBIO_SUNAT_URL").unwrap_or(defaults.sunat_txt),
            bcrp: var("CAMBIO_BCRP_URL").unwrap_or(defaults.bcrp),
            eapi: var("CAMBIO_EAPI_URL").unwrap_or(defaults.eapi),
            decolecta: var("CAMBIO_DECOLECTA_URL").unwrap_or(defaults.decolecta),
        };

        let html_source = match (var("CAMBIO_HTML_URL"), var("CAMBIO_HTML_PATTERN")) {
            (Some(url), Some(pattern)) => Some(HtmlSourceConfig {
                url,
                pattern,
                label: var("CAMBIO_HTML_LABEL").unwrap_or_else(|| DEFAULT_HTML_LABEL.to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            listen_addr,
            cache_ttl,
            request_timeout: millis("CAMBIO_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?,
            history_timeout: millis("CAMBIO_HISTORY_TIMEOUT_MS", DEFAULT_HISTORY_TIMEOUT_MS)?,
            history_days,
            sources,
            endpoints,
            decolecta_api_key: var("DECOLECTA_API_KEY"),
            html_source,
        })
    }
}
