//! Blocking HTTP acquisition.
//!
//! Every remote read goes through [`HttpClient`] so tests can substitute
//! [`fake::StaticClient`]. A non-2xx status is fatal.

mod basic;
mod client;
pub mod auth;
pub mod fake;

pub use basic::BasicClient;
pub use client::{HttpClient, HttpResponse};

use std::io::Read;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Issues a GET and returns the body as a stream.
///
/// # Errors
///
/// [`PipelineError::Network`] for a non-2xx status, or the client's
/// transport error.
#[tracing::instrument(skip(client))]
pub fn fetch_reader<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Box<dyn Read>> {
    let resp = client.get(url)?;
    debug!(status = resp.status, "Response received");

    if !resp.is_success() {
        return Err(PipelineError::Network {
            url: url.to_string(),
            status: resp.status,
        });
    }

    Ok(resp.body)
}

/// Issues a GET and reads the whole body.
pub fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let mut body = fetch_reader(client, url)?;
    let mut bytes = Vec::new();
    body.read_to_end(&mut bytes)?;
    debug!(bytes = bytes.len(), "Body read");
    Ok(bytes)
}

/// Issues a GET and deserializes the JSON body.
pub fn fetch_json<C: HttpClient + ?Sized, T: DeserializeOwned>(client: &C, url: &str) -> Result<T> {
    let bytes = fetch_bytes(client, url)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| PipelineError::Parse(format!("malformed JSON from {url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::StaticClient;

    #[test]
    fn test_fetch_bytes_returns_body() {
        let client = StaticClient::ok(b"hello".to_vec());
        let bytes = fetch_bytes(&client, "https://example.org/a").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_non_success_status_is_network_error() {
        let client = StaticClient::new(503, b"busy".to_vec());
        let err = fetch_bytes(&client, "https://example.org/a").unwrap_err();
        match err {
            PipelineError::Network { url, status } => {
                assert_eq!(url, "https://example.org/a");
                assert_eq!(status, 503);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fetch_json_malformed_is_parse_error() {
        let client = StaticClient::ok(b"{not json".to_vec());
        let err = fetch_json::<_, Vec<Vec<String>>>(&client, "https://example.org/a").unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }
}
