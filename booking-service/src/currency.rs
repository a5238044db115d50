//! Currency normalization against an external exchange-rate service.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_traits::Zero;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use shared::SETTLEMENT_CURRENCY;
use tracing::debug;

pub const DEFAULT_CURRENCY_API_URL: &str = "https://api.currencyapi.com";

#[derive(Debug, thiserror::Error)]
pub enum RateLookupError {
    #[error("CURRENCY_EXCHANGE_API_KEY missing")]
    MissingApiKey,

    #[error("rate lookup request failed: {0}")]
    RequestFailed(String),

    #[error("rate service answered with status {0}")]
    UnexpectedStatus(u16),

    #[error("rate service returned malformed data: {0}")]
    Malformed(String),

    #[error("no rate for {from} -> {to}")]
    RateNotAvailable { from: String, to: String },
}

/// Source of `from -> to` multipliers.
#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    async fn rate(&self, from: &str, to: &str) -> Result<BigDecimal, RateLookupError>;
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    #[serde(default)]
    meta: Option<RatesMeta>,
    data: HashMap<String, RateEntry>,
}

#[derive(Debug, Deserialize)]
struct RatesMeta {
    last_updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RateEntry {
    value: serde_json::Number,
}

/// Client for the currencyapi.com `v3/latest` endpoint.
#[derive(Clone)]
pub struct CurrencyApiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl CurrencyApiClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self, RateLookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RateLookupError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ExchangeRateProvider for CurrencyApiClient {
    async fn rate(&self, from: &str, to: &str) -> Result<BigDecimal, RateLookupError> {
        let api_key = self.api_key.as_deref().ok_or(RateLookupError::MissingApiKey)?;

        let url = Url::parse_with_params(
            &format!("{}/v3/latest", self.base_url),
            &[("apikey", api_key), ("base_currency", from), ("currencies", to)],
        )
        .map_err(|e| RateLookupError::RequestFailed(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RateLookupError::RequestFailed(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(RateLookupError::UnexpectedStatus(response.status().as_u16()));
        }

        let latest: LatestRates = response
            .json()
            .await
            .map_err(|e| RateLookupError::Malformed(e.to_string()))?;

        if let Some(updated) = latest.meta.as_ref().and_then(|m| m.last_updated_at.as_deref()) {
            debug!("Rates for {} last updated at {}", from, updated);
        }

        let entry = latest.data.get(to).ok_or_else(|| RateLookupError::RateNotAvailable {
            from: from.to_string(),
            to: to.to_string(),
        })?;

        BigDecimal::from_str(&entry.value.to_string())
            .map_err(|e| RateLookupError::Malformed(e.to_string()))
    }
}

/// Expresses amounts in the settlement currency.
#[derive(Clone)]
pub struct CurrencyNormalizer {
    provider: Arc<dyn ExchangeRateProvider>,
}

impl CurrencyNormalizer {
    pub fn new(provider: Arc<dyn ExchangeRateProvider>) -> Self {
        Self { provider }
    }

    pub async fn normalize(
        &self,
        amount: &BigDecimal,
        from: &str,
        to: &str,
    ) -> Result<BigDecimal, RateLookupError> {
        if amount.is_zero() {
            return Ok(BigDecimal::zero());
        }
        if from.eq_ignore_ascii_case(SETTLEMENT_CURRENCY) {
            return Ok(amount.clone());
        }

        let rate = self.provider.rate(from, to).await?;
        Ok(amount * &rate)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-process rate table that counts lookups.
    #[derive(Default)]
    pub struct FixedRates {
        rates: HashMap<(String, String), BigDecimal>,
        pub calls: AtomicUsize,
    }

    impl FixedRates {
        pub fn with(mut self, from: &str, to: &str, rate: &str) -> Self {
            self.rates.insert(
                (from.to_string(), to.to_string()),
                BigDecimal::from_str(rate).unwrap(),
            );
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExchangeRateProvider for FixedRates {
        async fn rate(&self, from: &str, to: &str) -> Result<BigDecimal, RateLookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rates
                .get(&(from.to_string(), to.to_string()))
                .cloned()
                .ok_or_else(|| RateLookupError::RateNotAvailable {
                    from: from.to_string(),
                    to: to.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FixedRates;
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn zero_amount_skips_lookup() {
        let rates = Arc::new(FixedRates::default());
        let normalizer = CurrencyNormalizer::new(rates.clone());

        let out = normalizer.normalize(&dec("0"), "EUR", "USD").await.unwrap();

        assert_eq!(out, dec("0"));
        assert_eq!(rates.calls(), 0);
    }

    #[tokio::test]
    async fn settlement_currency_passes_through() {
        let rates = Arc::new(FixedRates::default());
        let normalizer = CurrencyNormalizer::new(rates.clone());

        let out = normalizer.normalize(&dec("42.5"), "usd", "USD").await.unwrap();

        assert_eq!(out, dec("42.5"));
        assert_eq!(rates.calls(), 0);
    }

    #[tokio::test]
    async fn foreign_amount_is_multiplied_by_rate() {
        let rates = Arc::new(FixedRates::default().with("EUR", "USD", "1.1"));
        let normalizer = CurrencyNormalizer::new(rates.clone());

        let out = normalizer.normalize(&dec("100"), "EUR", "USD").await.unwrap();

        assert_eq!(out, dec("110"));
        assert_eq!(rates.calls(), 1);
    }

    #[tokio::test]
    async fn lookup_failure_is_surfaced() {
        let normalizer = CurrencyNormalizer::new(Arc::new(FixedRates::default()));

        let err = normalizer.normalize(&dec("10"), "GBP", "USD").await.unwrap_err();

        assert!(matches!(err, RateLookupError::RateNotAvailable { .. }));
    }

    #[tokio::test]
    async fn client_reads_rate_for_target_currency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/latest"))
            .and(query_param("apikey", "test-key"))
            .and(query_param("base_currency", "EUR"))
            .and(query_param("currencies", "USD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": { "last_updated_at": "2024-01-01T00:00:00Z" },
                "data": { "USD": { "code": "USD", "value": 1.2 } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CurrencyApiClient::new(Some("test-key".into()), server.uri()).unwrap();
        let rate = client.rate("EUR", "USD").await.unwrap();

        assert_eq!(rate, dec("1.2"));
    }

    #[tokio::test]
    async fn client_without_key_never_calls_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = CurrencyApiClient::new(None, server.uri()).unwrap();
        let err = client.rate("EUR", "USD").await.unwrap_err();

        assert!(matches!(err, RateLookupError::MissingApiKey));
    }

    #[tokio::test]
    async fn client_rejects_error_status_and_bad_payloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("base_currency", "JPY"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("base_currency", "GBP"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("base_currency", "CHF"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": { "last_updated_at": "2024-01-01T00:00:00Z" },
                "data": { "EUR": { "code": "EUR", "value": 0.95 } }
            })))
            .mount(&server)
            .await;

        let client = CurrencyApiClient::new(Some("k".into()), server.uri()).unwrap();

        assert!(matches!(
            client.rate("JPY", "USD").await,
            Err(RateLookupError::UnexpectedStatus(429))
        ));
        assert!(matches!(
            client.rate("GBP", "USD").await,
            Err(RateLookupError::Malformed(_))
        ));
        assert!(matches!(
            client.rate("CHF", "USD").await,
            Err(RateLookupError::RateNotAvailable { .. })
        ));
    }
}
