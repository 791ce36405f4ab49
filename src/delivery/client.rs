use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::error::DeliveryError;
use super::types::{DeliveryClient, Outcome};
use crate::config::RotorConfig;
use crate::error::Result;

/// Placeholder in the endpoint template replaced by the target id.
pub const TARGET_PLACEHOLDER: &str = "{target}";

/// Default "credential expired/invalid" markers matched against error bodies.
pub const DEFAULT_FATAL_MARKERS: &[&str] = &[
    "expired",
    "invalid oauth",
    "invalid access token",
    "session has been invalidated",
    "error validating access token",
];

/// Sends each message as a form POST to a templated endpoint.
pub struct HttpDeliveryClient {
    client: Client,
    endpoint: String,
    identity_endpoint: Option<String>,
    fatal_markers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    name: Option<String>,
    category: Option<serde_json::Value>,
}

impl HttpDeliveryClient {
    pub fn new(endpoint: String) -> Result<Self> {
        Self::builder(endpoint, Duration::from_secs(10), Duration::from_secs(5))
    }

    pub fn builder(endpoint: String, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            identity_endpoint: None,
            fatal_markers: DEFAULT_FATAL_MARKERS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_config(config: &RotorConfig) -> Result<Self> {
        let mut client = Self::builder(
            config.endpoint.clone(),
            config.request_timeout(),
            Duration::from_secs(config.connect_timeout_secs),
        )?;
        client.identity_endpoint = config.identity_endpoint.clone();
        client.fatal_markers = config.fatal_markers.clone();
        Ok(client)
    }

    pub fn with_identity_endpoint(mut self, url: String) -> Self {
        self.identity_endpoint = Some(url);
        self
    }

    pub fn with_fatal_markers(mut self, markers: Vec<String>) -> Self {
        self.fatal_markers = markers;
        self
    }

    fn url_for(&self, target: &str) -> Result<Url, DeliveryError> {
        // The target fills exactly one path segment or query value.
        let raw = self
            .endpoint
            .replace(TARGET_PLACEHOLDER, &urlencoding::encode(target));
        Url::parse(&raw).map_err(|e| DeliveryError::InvalidEndpoint(format!("{raw}: {e}")))
    }

    async fn post(&self, credential: &str, target: &str, message: &str) -> Result<(), DeliveryError> {
        let url = self.url_for(target)?;
        let response = self
            .client
            .post(url)
            .form(&[("access_token", credential), ("message", message)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(DeliveryError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    async fn fetch_identity(&self, url: &str, credential: &str) -> Result<String, DeliveryError> {
        let body = self
            .client
            .get(url)
            .query(&[("access_token", credential)])
            .send()
            .await?
            .error_for_status()?
            .json::<IdentityResponse>()
            .await?;

        let name = body.name.unwrap_or_else(|| "Unknown".to_string());
        Ok(if body.category.is_some() {
            format!("[Page] {name}")
        } else {
            format!("[Profile] {name}")
        })
    }
}

impl DeliveryClient for HttpDeliveryClient {
    async fn send(&self, credential: &str, target: &str, message: &str) -> Outcome {
        match self.post(credential, target, message).await {
            Ok(()) => Outcome::Success,
            Err(e) => {
                debug!(to = target, error = %e, "delivery rejected");
                e.classify(&self.fatal_markers)
            }
        }
    }

    async fn identify(&self, credential: &str) -> Option<String> {
        let url = self.identity_endpoint.as_deref()?;
        match self.fetch_identity(url, credential).await {
            Ok(label) => Some(label),
            Err(e) => {
                debug!(error = %e, "identity lookup failed");
                None
            }
        }
    }
}
