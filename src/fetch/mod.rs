//! HTTP fetch layer for snapshot captures.
//!
//! One [`Fetcher`] is built per capture operation, so the root document and
//! every discovered resource share a single connection pool and nothing is
//! shared across concurrent captures.
//!
//! Redirects follow reqwest's default policy. No retries, and no
//! total-request timeout beyond the transport defaults: a hung host stalls
//! only that resource's download, never its concurrent siblings.

mod error;

pub use error::FetchError;

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::user_agent;

/// HTTP client for fetching documents and resources as raw bytes.
///
/// Cheap to clone; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    /// Creates a fetcher with its own connection pool.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = Client::builder()
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Performs a single GET and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] on transport failure and
    /// [`FetchError::HttpStatus`] when the server responds with a
    /// non-success status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url.as_str(), status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))?;
        debug!(bytes = body.len(), "fetch complete");
        Ok(body.to_vec())
    }
}

/// Normalizes a source URL, defaulting the scheme to `https` when absent.
///
/// Returns the scheme-qualified source string (kept verbatim for archive
/// naming) together with its parsed form.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] when the input cannot be parsed as an
/// absolute URL even after scheme defaulting.
pub fn normalize_source_url(raw: &str) -> Result<(String, Url), FetchError> {
    let source = match Url::parse(raw) {
        Ok(_) => raw.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => format!("https://{raw}"),
        Err(_) => return Err(FetchError::invalid_url(raw)),
    };
    let url = Url::parse(&source).map_err(|_| FetchError::invalid_url(raw))?;
    Ok((source, url))
}
