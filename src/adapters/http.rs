//! Shared HTTP plumbing for provider adapters

use std::time::Duration;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::ports::payment::ProviderError;

/// Upper bound for a single provider call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest body excerpt kept in parse errors
const BODY_EXCERPT_LEN: usize = 200;

/// Build a client whose every request is bounded by `timeout`
pub fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Http(format!("Failed to create HTTP client: {}", e)))
}

/// Read the body and decode it as JSON regardless of the HTTP status.
/// Providers put their error descriptions in non-2xx bodies too.
pub async fn decode_json<T: DeserializeOwned>(
    response: Response,
) -> Result<(StatusCode, T), ProviderError> {
    let status = response.status();
    let body = response.text().await?;

    let parsed = serde_json::from_str(&body).map_err(|e| {
        ProviderError::Parse(format!("{} (HTTP {}): {}", e, status, excerpt(&body)))
    })?;

    Ok((status, parsed))
}

fn excerpt(body: &str) -> &str {
    if body.len() <= BODY_EXCERPT_LEN {
        return body;
    }
    let mut end = BODY_EXCERPT_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client() {
        assert!(build_client(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let body = "ж".repeat(150);
        let cut = excerpt(&body);
        assert!(cut.len() <= BODY_EXCERPT_LEN);
        assert!(cut.chars().all(|c| c == 'ж'));
    }

    #[test]
    fn test_excerpt_short_body_untouched() {
        assert_eq!(excerpt("{}"), "{}");
    }
}
