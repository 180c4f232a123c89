use std::time::Duration;

use super::client::{HttpClient, HttpResponse};
use crate::error::Result;

/// [`HttpClient`] backed by `reqwest`'s blocking client.
///
/// The overall timeout is generous because a statewide LODES file is
/// several hundred megabytes.
pub struct BasicClient(reqwest::blocking::Client);

impl BasicClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Self(client))
    }
}

impl HttpClient for BasicClient {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let resp = self.0.get(url).send()?;
        Ok(HttpResponse {
            status: resp.status().as_u16(),
            body: Box::new(resp),
        })
    }
}
