//! Source fetching for country feeds and pre-built blocklists.
//!
//! The builder only needs "give me the bytes behind this URL", so fetching
//! is abstracted behind [`SourceFetcher`]. [`HttpFetcher`] is the real
//! implementation; [`StaticFetcher`] serves canned bodies.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use crate::{Error, Result};

/// Default per-request timeout for source downloads.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Provider of raw source bytes.
///
/// Implementations must fail on any non-success response; the builder
/// never sees partial or error bodies.
pub trait SourceFetcher: Send + Sync {
    /// Fetch the full body behind `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher backed by a `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// Create a fetcher with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("pgblock/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => Error::fetch(url, format!("HTTP error: {}", code)),
            ureq::Error::Transport(t) => Error::fetch(url, format!("transport error: {}", t)),
        })?;

        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|e| Error::fetch(url, format!("failed to read response: {}", e)))?;

        log::debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}

/// Fetcher serving fixed bodies from memory.
///
/// Unknown URLs fail like an HTTP 404 would.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the body returned for `url`.
    pub fn with_body(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }
}

impl SourceFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| Error::fetch(url, "HTTP error: 404"))
    }
}
