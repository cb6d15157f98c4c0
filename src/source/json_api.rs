use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;

use super::{build_record, fetch_text, RateSource};
use crate::error::SourceError;
use crate::exchange_rate::{lima_today, RateRecord};

pub const APIS_NET_PE_URL: &str = "https://api.apis.net.pe/v1/tipo-cambio-sunat";
pub const EAPI_URL: &str = "https://free.e-api.net.pe/tipo-cambio/today.json";
pub const DECOLECTA_URL: &str = "https://api.decolecta.com/v1";

/// Names of the buy, sell and date fields in a flat JSON quote.
#[derive(Debug, Clone, Copy)]
pub struct JsonFields {
    pub buy: &'static str,
    pub sell: &'static str,
    pub date: &'static str,
}

impl JsonFields {
    pub const SPANISH: JsonFields = JsonFields {
        buy: "compra",
        sell: "venta",
        date: "fecha",
    };

    pub const DECOLECTA: JsonFields = JsonFields {
        buy: "buy_price",
        sell: "sell_price",
        date: "date",
    };
}

/// A REST endpoint returning one flat JSON object with the day's quote.
/// Rates may be strings or numbers.
pub struct JsonApiSource {
    id: &'static str,
    label: String,
    url: String,
    fields: JsonFields,
    bearer_token: Option<String>,
    client: Client,
}

impl JsonApiSource {
    pub fn new(
        id: &'static str,
        label: impl Into<String>,
        client: Client,
        url: impl Into<String>,
        fields: JsonFields,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            url: url.into(),
            fields,
            bearer_token: None,
            client,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn apis_net_pe(client: Client, url: &str) -> Self {
        Self::new("apisnetpe", "SUNAT (apis.net.pe)", client, url, JsonFields::SPANISH)
    }

    pub fn eapi(client: Client, url: &str) -> Self {
        Self::new("eapi", "SUNAT (eApi)", client, url, JsonFields::SPANISH)
    }

    pub fn decolecta(client: Client, base_url: &str, api_key: &str) -> Self {
        let url = format!("{}/tipo-cambio/sunat", base_url.trim_end_matches('/'));
        Self::new("decolecta", "SUNAT (Decolecta)", client, url, JsonFields::DECOLECTA)
            .with_bearer_token(api_key)
    }

    fn parse_body(&self, body: &str) -> Result<RateRecord, SourceError> {
        let data: Value = serde_json::from_str(body).map_err(|e| SourceError::Malformed {
            provider: self.id,
            message: e.to_string(),
        })?;

        let buy = field_text(&data, self.fields.buy).ok_or_else(|| SourceError::Malformed {
            provider: self.id,
            message: format!("missing {}", self.fields.buy),
        })?;
        let sell = field_text(&data, self.fields.sell).ok_or_else(|| SourceError::Malformed {
            provider: self.id,
            message: format!("missing {}", self.fields.sell),
        })?;
        let as_of = field_text(&data, self.fields.date)
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
            .unwrap_or_else(lima_today);

        build_record(self.id, &self.label, &buy, &sell, as_of)
    }
}

fn field_text(data: &Value, field: &str) -> Option<String> {
    match data.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl RateSource for JsonApiSource {
    fn id(&self) -> &'static str {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch(&self) -> Result<RateRecord, SourceError> {
        let mut request = self.client.get(&self.url).header("Accept", "application/json");
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let body = fetch_text(self.id, request).await?;
        self.parse_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> JsonApiSource {
        JsonApiSource::apis_net_pe(Client::new(), &format!("{}/v1/tipo-cambio-sunat", server.uri()))
    }

    #[tokio::test]
    async fn parses_string_rates_and_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tipo-cambio-sunat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"compra":"3.712","venta":"3.721","origen":"SUNAT","moneda":"USD","fecha":"2025-03-14"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let source = source(&server);
        let record = source.fetch().await.unwrap();
        assert_eq!(record.source, source.label());
        assert_eq!(record.buy, dec!(3.712));
        assert_eq!(record.sell, dec!(3.721));
        assert_eq!(record.source, "SUNAT (apis.net.pe)");
        assert_eq!(record.as_of, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    }

    #[tokio::test]
    async fn accepts_numeric_rates_and_defaults_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"compra":3.7,"venta":3.75}"#))
            .mount(&server)
            .await;

        let record = source(&server).fetch().await.unwrap();
        assert_eq!(record.buy, dec!(3.7));
        assert_eq!(record.sell, dec!(3.75));
        assert_eq!(record.as_of, lima_today());
    }

    #[tokio::test]
    async fn non_numeric_rate_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"compra":"abc","venta":"3.75"}"#))
            .mount(&server)
            .await;

        let err = source(&server).fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidRate { provider: "apisnetpe", .. }));
    }

    #[tokio::test]
    async fn missing_field_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"venta":"3.75"}"#))
            .mount(&server)
            .await;

        let err = source(&server).fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[tokio::test]
    async fn non_success_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = source(&server).fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::HttpStatus { status: 429, .. }));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"compra":"3.70","venta":"3.75"}"#)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let source = JsonApiSource::eapi(client, &server.uri());

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::Timeout { provider: "eapi" }));
    }

    #[tokio::test]
    async fn decolecta_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/tipo-cambio/sunat"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"buy_price":"3.705","sell_price":"3.713","base_currency":"USD","quote_currency":"PEN","date":"2025-03-14"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let source = JsonApiSource::decolecta(Client::new(), &format!("{}/v1/", server.uri()), "secret");
        let record = source.fetch().await.unwrap();
        assert_eq!(record.buy, dec!(3.705));
        assert_eq!(record.source, "SUNAT (Decolecta)");
    }
}
