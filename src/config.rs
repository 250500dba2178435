//! Startup configuration.
//!
//! The command line is resolved once into a [`Config`], which is then handed
//! by value to whichever driver the [`OutputMode`] selects.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::country::Country;
use crate::fetcher::DEFAULT_FETCH_TIMEOUT;
use crate::{Error, Result};

/// Base URL of the per-country range feeds (`{base}/{cc}.zone`).
pub const DEFAULT_FEED_URL: &str = "http://www.ipdeny.com/ipblocks/data/countries";

/// Interval between rebuilds in serve mode.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Where the blocklist data comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sources {
    /// Countries whose ranges are included, in request order.
    pub countries: Vec<Country>,
    /// Pre-built blocklists (gzip or plain) appended after the country ranges.
    pub prebuilt_urls: Vec<String>,
}

impl Sources {
    pub fn new(countries: Vec<Country>, prebuilt_urls: Vec<String>) -> Self {
        Self {
            countries,
            prebuilt_urls,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty() && self.prebuilt_urls.is_empty()
    }

    /// At least one source is required.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Config(
                "please provide at least one source (--gzip-url and/or --country)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Destination of a one-shot build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    Stdout,
    File(PathBuf),
}

impl OutputSink {
    /// `-` means standard output.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            OutputSink::Stdout
        } else {
            OutputSink::File(PathBuf::from(arg))
        }
    }
}

/// What to do with the built blocklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Build once and write it out.
    OneShot(OutputSink),
    /// Serve over HTTP, rebuilding periodically.
    Serve(SocketAddr),
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub sources: Sources,
    pub compress: bool,
    pub mode: OutputMode,
    pub feed_url: String,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Config {
    /// Create a configuration with default tunables.
    ///
    /// Fails if no source is given; this is checked before anything touches
    /// the network.
    pub fn new(sources: Sources, compress: bool, mode: OutputMode) -> Result<Self> {
        sources.validate()?;
        Ok(Self {
            sources,
            compress,
            mode,
            feed_url: DEFAULT_FEED_URL.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        })
    }

    /// Override the country feed base URL.
    pub fn with_feed_url(mut self, url: &str) -> Self {
        self.feed_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Override the serve-mode refresh interval.
    ///
    /// The next refresh time must be representable, so intervals that
    /// overflow the system clock are rejected along with zero.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::Config("refresh interval must be positive".to_string()));
        }
        if SystemTime::now().checked_add(interval).is_none() {
            return Err(Error::Config(format!(
                "refresh interval of {}s is too large",
                interval.as_secs()
            )));
        }
        self.refresh_interval = interval;
        Ok(self)
    }

    /// Override the per-request fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Resolve a `host:port` listen address.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| Error::Config(format!("expected host:port, got {}", addr)))?;
    let port: u16 = port
        .parse()
        .map_err(|_| Error::Config(format!("invalid port in {}", addr)))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::Config(format!("cannot resolve {}: {}", addr, e)))?
        .next()
        .ok_or_else(|| Error::Config(format!("cannot resolve {}", addr)))
}
