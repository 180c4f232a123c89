use std::fmt;
use std::io::Read;

use crate::error::Result;

/// Status line and streaming body of an HTTP response.
pub struct HttpResponse {
    pub status: u16,
    pub body: Box<dyn Read>,
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A blocking HTTP GET. Implementations must not buffer the body.
pub trait HttpClient {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        (**self).get(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_debug_shows_status_only() {
        let resp = HttpResponse {
            status: 404,
            body: Box::new(Cursor::new(b"secret body".to_vec())),
        };
        let text = format!("{resp:?}");
        assert!(text.contains("404"));
        assert!(!text.contains("secret"));
        assert!(!resp.is_success());
    }
}
