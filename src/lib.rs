//! USD/PEN exchange rate service for the calculators site.
//!
//! [`resolver::RateResolver`] answers with the freshest rate it can find,
//! walking a ladder of upstream [`source::RateSource`]s behind an in-memory
//! cache. [`api`] exposes it, plus the BCRP history series, over HTTP.

pub mod api;
pub mod bcrp;
pub mod cache;
pub mod config;
pub mod error;
pub mod exchange_rate;
pub mod resolver;
pub mod source;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::api::AppState;
use crate::bcrp::BcrpClient;
use crate::config::Config;
use crate::resolver::RateResolver;

/// Wires the resolver and history client from configuration.
pub fn build_state(config: &Config) -> Result<AppState> {
    let client = Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let sources = source::build_sources(config, &client)?;
    let resolver = RateResolver::new(sources, config.cache_ttl);
    let history = BcrpClient::new(client, &config.endpoints.bcrp, config.history_timeout);

    Ok(AppState {
        resolver,
        history,
        history_days: config.history_days,
    })
}
