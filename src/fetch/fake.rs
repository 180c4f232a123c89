//! In-memory [`HttpClient`] for tests and offline runs.

use std::cell::RefCell;
use std::io::Cursor;

use super::client::{HttpClient, HttpResponse};
use crate::error::Result;

/// Answers every request with the same status and body, recording the URLs.
#[derive(Debug)]
pub struct StaticClient {
    status: u16,
    body: Vec<u8>,
    requested: RefCell<Vec<String>>,
}

impl StaticClient {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            requested: RefCell::new(Vec::new()),
        }
    }

    /// A client that always returns `200 OK` with `body`.
    pub fn ok(body: Vec<u8>) -> Self {
        Self::new(200, body)
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl HttpClient for StaticClient {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requested.borrow_mut().push(url.to_string());
        Ok(HttpResponse {
            status: self.status,
            body: Box::new(Cursor::new(self.body.clone())),
        })
    }
}
