mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::parser::{api_error_message, is_response_valid};

pub async fn fetch_json<C: HttpClient>(client: &C, url: &str) -> Result<Value> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid URL '{url}'"))?,
    );

    let resp = client.execute(req).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Anything that can turn a URL into a JSON document.
///
/// Errors returned from here are transport failures and are not retried.
#[async_trait]
pub trait JsonSource: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value>;
}

#[async_trait]
impl<C: HttpClient> JsonSource for C {
    async fn get_json(&self, url: &str) -> Result<Value> {
        fetch_json(self, url).await
    }
}

/// A well-formed API response and the number of requests it took to get it.
#[derive(Debug)]
pub struct ValidResponse {
    pub body: Value,
    pub attempts: u64,
}

/// Requests `url` until the response carries a `result` list.
///
/// Sleeps `delay` after every request. Malformed responses are logged and
/// retried; past `max_retries` of them (when set) the fetch fails. Errors from
/// `source` itself propagate immediately.
pub async fn fetch_valid_json<S: JsonSource + ?Sized>(
    source: &S,
    url: &str,
    delay: Duration,
    max_retries: Option<u32>,
) -> Result<ValidResponse> {
    let mut attempts = 0u64;
    loop {
        let body = source.get_json(url).await?;
        attempts += 1;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if is_response_valid(&body) {
            debug!(attempts, "Valid response received");
            return Ok(ValidResponse { body, attempts });
        }

        warn!(
            attempts,
            message = %api_error_message(&body),
            "API returned an error message"
        );
        if let Some(max) = max_retries {
            if attempts > u64::from(max) {
                bail!("giving up after {attempts} malformed responses from the API");
            }
        }
    }
}
