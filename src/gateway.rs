// Vendor API client.
//
// The five NDC calls behind one async trait, so the request-handling layer
// and tests can swap the HTTP implementation out. The gateway ships bodies
// produced by the request builders and hands parsed documents back; it owns
// retry and backoff for transient failures, nothing else. Token acquisition
// happens elsewhere: a pre-acquired bearer token arrives via config.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::documents::{
    OrderViewDocument, PricedDocument, SeatAvailabilityDocument, ServiceListDocument,
    ShoppingDocument,
};
use crate::requests::{
    OfferPriceRequest, OrderCreateRequest, SeatAvailabilityRequest, ServiceListRequest,
};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("vendor returned {status}: {message}")]
    VendorStatus {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("vendor response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network(err) => err.is_timeout() || err.is_connect(),
            GatewayError::VendorStatus { retryable, .. } => *retryable,
            GatewayError::Decode(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub bearer_token: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct GatewayStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_retried: usize,
}

#[async_trait]
pub trait VendorGateway: Send + Sync + 'static {
    // The initial search request has no cross-document references to
    // resolve, so it arrives as a plain body built by the caller
    async fn air_shopping(&self, request: &Value) -> Result<ShoppingDocument, GatewayError>;

    async fn offer_price(
        &self,
        request: &OfferPriceRequest,
    ) -> Result<PricedDocument, GatewayError>;

    async fn seat_availability(
        &self,
        request: &SeatAvailabilityRequest,
    ) -> Result<SeatAvailabilityDocument, GatewayError>;

    async fn service_list(
        &self,
        request: &ServiceListRequest,
    ) -> Result<ServiceListDocument, GatewayError>;

    async fn order_create(
        &self,
        request: &OrderCreateRequest,
    ) -> Result<OrderViewDocument, GatewayError>;
}

pub struct HttpVendorGateway {
    http: reqwest::Client,
    config: GatewayConfig,
    stats: Mutex<GatewayStats>,
}

impl HttpVendorGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            stats: Mutex::new(GatewayStats::default()),
        })
    }

    pub fn stats(&self) -> GatewayStats {
        self.stats.lock().clone()
    }

    /// Exponential backoff with jitter, capped at the configured maximum.
    pub fn calculate_backoff(retry_attempt: u32, retry: &RetryConfig) -> Duration {
        let base_ms = (retry.initial_backoff.as_millis() as f64
            * retry.backoff_multiplier.powf(retry_attempt as f64))
        .min(retry.max_backoff.as_millis() as f64);

        let jitter = rand::random::<f64>() * retry.jitter_factor * base_ms;
        let backoff_ms = base_ms * (1.0 - retry.jitter_factor / 2.0) + jitter;

        Duration::from_millis(backoff_ms as u64)
    }

    async fn post_json<B, T>(&self, operation: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), operation);

        let mut attempt = 0;
        loop {
            self.stats.lock().requests_sent += 1;
            match self.send_once(&url, body).await {
                Ok(document) => {
                    self.stats.lock().requests_succeeded += 1;
                    return Ok(document);
                }
                Err(err) if err.is_retryable() && attempt < self.config.retry.max_retries => {
                    let backoff = Self::calculate_backoff(attempt, &self.config.retry);
                    warn!(
                        operation,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "vendor call failed, retrying"
                    );
                    self.stats.lock().requests_retried += 1;
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    self.stats.lock().requests_failed += 1;
                    return Err(err);
                }
            }
        }
    }

    async fn send_once<B, T>(&self, url: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.bearer_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::VendorStatus {
                status: status.as_u16(),
                message,
                retryable: status.is_server_error() || status.as_u16() == 429,
            });
        }

        let raw = response.text().await?;
        debug!(url, bytes = raw.len(), "vendor response received");
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl VendorGateway for HttpVendorGateway {
    async fn air_shopping(&self, request: &Value) -> Result<ShoppingDocument, GatewayError> {
        self.post_json("AirShopping", request).await
    }

    async fn offer_price(
        &self,
        request: &OfferPriceRequest,
    ) -> Result<PricedDocument, GatewayError> {
        self.post_json("OfferPrice", request).await
    }

    async fn seat_availability(
        &self,
        request: &SeatAvailabilityRequest,
    ) -> Result<SeatAvailabilityDocument, GatewayError> {
        self.post_json("SeatAvailability", request).await
    }

    async fn service_list(
        &self,
        request: &ServiceListRequest,
    ) -> Result<ServiceListDocument, GatewayError> {
        self.post_json("ServiceList", request).await
    }

    async fn order_create(
        &self,
        request: &OrderCreateRequest,
    ) -> Result<OrderViewDocument, GatewayError> {
        self.post_json("OrderCreate", request).await
    }
}
