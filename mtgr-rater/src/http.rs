//! Shared HTTP plumbing for the card API and ratings backend clients

use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{Error, Result};

pub(crate) const USER_AGENT: &str = concat!("mtgr/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client with the crate's user agent and request timeout
pub(crate) fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| Error::Network(e.to_string()))
}

/// Map non-success statuses to errors
pub(crate) async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(Error::NotFound(what.to_string()));
    }

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(Error::Api(status.as_u16(), error_text));
    }

    Ok(response)
}

/// Check status, then decode the JSON body
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
    let response = check_status(response, what).await?;
    let body = response
        .text()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| Error::Parse(format!("{}: {}", what, e)))
}
