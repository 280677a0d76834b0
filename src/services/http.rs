//! Shared outbound HTTP client with retry

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    config::HttpConfig,
    error::{AppError, AppResult},
};

const RETRY_STATUS: &[StatusCode] = &[
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Sleep before retry number `attempt` (1-based)
pub fn retry_delay(backoff_factor: f64, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16) as i32;
    Duration::from_secs_f64((backoff_factor * 2f64.powi(exp)).max(0.0))
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retries: u32,
    backoff_factor: f64,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            retries: config.retries,
            backoff_factor: config.backoff_factor,
        })
    }

    /// Underlying client, for callers with their own retry loop
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send the request built by `build`, rebuilding it for each retry
    ///
    /// Retries on 429/5xx gateway statuses and on connect or timeout
    /// errors. Any other non-success status is returned as an error.
    pub async fn send<F>(&self, build: F) -> AppResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let retry_left = attempt <= self.retries;
            match build(&self.client).send().await {
                Ok(resp) if retry_left && RETRY_STATUS.contains(&resp.status()) => {
                    tracing::debug!(status = %resp.status(), url = %resp.url(), attempt, "Retrying request");
                }
                Ok(resp) => return Ok(resp.error_for_status()?),
                Err(e) if retry_left && (e.is_connect() || e.is_timeout()) => {
                    tracing::debug!(error = %e, attempt, "Retrying request");
                }
                Err(e) => return Err(e.into()),
            }
            tokio::time::sleep(retry_delay(self.backoff_factor, attempt)).await;
        }
    }

    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> AppResult<String> {
        tracing::debug!(url, "GET");
        let resp = self.send(|c| c.get(url).query(query)).await?;
        Ok(resp.text().await?)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> AppResult<T> {
        tracing::debug!(url, "GET json");
        let resp = self.send(|c| c.get(url).query(query)).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
