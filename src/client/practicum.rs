//! Homework review API client.
//!
//! One GET per cycle. Transport errors and non-200 answers both surface
//! as [`BotError::ApiRequest`]; the status code rides along when known.

use crate::models::{BotError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use std::time::Duration;
use tracing::debug;

/// Source of homework status answers.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch submissions updated since `from_date` (Unix seconds).
    async fn get_api_answer(&self, from_date: i64) -> Result<serde_json::Value>;
}

/// Client for the homework status endpoint.
pub struct PracticumClient {
    client: reqwest::Client,
    endpoint: String,
    authorization: HeaderValue,
}

impl PracticumClient {
    /// Create a new client authenticated with an OAuth `token`.
    pub fn new(token: &str, endpoint: impl Into<String>, timeout_secs: Option<u64>) -> Result<Self> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(30)))
            .build()
            .map_err(BotError::Client)?;

        let mut authorization = HeaderValue::from_str(&format!("OAuth {token}")).map_err(|_| {
            BotError::api_request(&endpoint, None, "token is not a valid header value")
        })?;
        authorization.set_sensitive(true);

        Ok(Self {
            client,
            endpoint,
            authorization,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the status request for `from_date` without sending it.
    pub fn request(&self, from_date: i64) -> Result<reqwest::Request> {
        self.client
            .get(&self.endpoint)
            .header(AUTHORIZATION, self.authorization.clone())
            .query(&[("from_date", from_date)])
            .build()
            .map_err(|e| BotError::api_request(&self.endpoint, None, e.to_string()))
    }
}

#[async_trait]
impl StatusSource for PracticumClient {
    async fn get_api_answer(&self, from_date: i64) -> Result<serde_json::Value> {
        let request = self.request(from_date)?;
        debug!(from_date, endpoint = %self.endpoint, "Requesting homework statuses");

        let response = self.client.execute(request).await.map_err(|e| {
            let reason = if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            };
            BotError::api_request(&self.endpoint, None, reason)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BotError::api_request(
                &self.endpoint,
                Some(status.as_u16()),
                format!("unexpected HTTP status {status}"),
            ));
        }

        response.json().await.map_err(|e| {
            BotError::api_request(
                &self.endpoint,
                Some(status.as_u16()),
                format!("invalid JSON body: {e}"),
            )
        })
    }
}
