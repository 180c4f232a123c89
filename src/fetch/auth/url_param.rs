use crate::error::{PipelineError, Result};
use crate::fetch::client::{HttpClient, HttpResponse};

/// An [`HttpClient`] wrapper that appends an API key as a URL query parameter.
///
/// The Census API accepts anonymous requests at a low daily quota; setting
/// `param_name = "key"` lifts it.
pub struct UrlParam<C> {
    pub inner: C,
    pub param_name: String,
    pub key: String,
}

impl<C> UrlParam<C> {
    /// Wraps `inner` with the Census `key=` parameter.
    pub fn census_key(inner: C, key: String) -> Self {
        Self {
            inner,
            param_name: "key".to_string(),
            key,
        }
    }
}

impl<C: HttpClient> HttpClient for UrlParam<C> {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let mut parsed = reqwest::Url::parse(url).map_err(|e| PipelineError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        parsed
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.key);

        // the keyed URL must not reach logs
        self.inner.get(parsed.as_str()).map_err(|e| match e {
            PipelineError::Transport(err) => PipelineError::Transport(err.without_url()),
            other => other,
        })
    }
}
