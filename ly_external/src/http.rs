//! ABOUTME: Shared HTTP helpers for provider clients
//! ABOUTME: Builds the reqwest client and turns responses into typed JSON

use ly_core::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("lyrica/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by every provider
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::External(format!("Failed to create HTTP client: {}", e)))
}

/// Strip a trailing slash so paths can be appended with `format!`
pub(crate) fn normalize_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Send a request and decode a JSON body, mapping failures to `Error::External`
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: &str,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::External(format!("{} request failed: {}", provider, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::External(format!(
            "{} returned status: {} - {}",
            provider,
            status,
            truncate(&body, 200)
        )));
    }

    debug!("{} responded with {}", provider, status);
    response
        .json()
        .await
        .map_err(|e| Error::External(format!("Failed to parse {} response: {}", provider, e)))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base("http://x/api/"), "http://x/api");
        assert_eq!(normalize_base("http://x/api"), "http://x/api");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
