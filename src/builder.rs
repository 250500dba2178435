//! Blocklist builder.
//!
//! Turns the configured [`Sources`] into one [`Blocklist`]:
//!
//! 1. Country feeds are fetched in request order and every network becomes
//!    one `Label:Start-End` line, in feed order.
//! 2. With compression on, those lines are gzipped as one member.
//! 3. Pre-built lists are fetched and transcoded to the target encoding
//!    (gunzipped for plain output, gzipped when plain and the target is
//!    compressed), then appended. A compressed result is a multi-member gzip
//!    stream, which every gzip reader decodes as a single body.

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::time::SystemTime;

use crate::config::{Sources, DEFAULT_FEED_URL};
use crate::country::Country;
use crate::entry::{serialize_entries, BlocklistEntry};
use crate::fetcher::SourceFetcher;
use crate::snapshot::Blocklist;
use crate::{Error, Result};

/// Gzip member magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Builds blocklists from remote sources.
pub struct BlocklistBuilder<F> {
    fetcher: F,
    feed_url: String,
}

impl<F: SourceFetcher> BlocklistBuilder<F> {
    /// Create a builder using the default country feed.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            feed_url: DEFAULT_FEED_URL.to_string(),
        }
    }

    /// Use a different country feed base URL.
    pub fn with_feed_url(mut self, url: &str) -> Self {
        self.feed_url = url.trim_end_matches('/').to_string();
        self
    }

    /// URL of the range feed for a country.
    pub fn country_feed_url(&self, country: &Country) -> String {
        format!("{}/{}.zone", self.feed_url, country.alpha2().to_lowercase())
    }

    /// Fetch and parse one country's ranges, in feed order.
    pub fn country_entries(&self, country: &Country) -> Result<Vec<BlocklistEntry>> {
        let url = self.country_feed_url(country);
        let body = self.fetcher.fetch(&url)?;
        let text = std::str::from_utf8(&body)
            .map_err(|e| Error::format(&url, format!("feed is not UTF-8: {}", e)))?;

        let mut entries = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry = BlocklistEntry::from_cidr(country.name(), line)
                .map_err(|e| Error::format(&url, format!("line {}: {}", idx + 1, e)))?;
            entries.push(entry);
        }

        log::info!("Fetched {} ranges for {}", entries.len(), country);
        Ok(entries)
    }

    /// Build a complete blocklist.
    ///
    /// Any failing source aborts the whole build; no partial list is returned.
    pub fn build(&self, sources: &Sources, compress: bool) -> Result<Blocklist> {
        log::info!("Started generating blocklist");

        let mut entries = Vec::new();
        for country in &sources.countries {
            entries.extend(self.country_entries(country)?);
        }

        let mut output = serialize_entries(&entries);
        if compress {
            output = gzip(&output)?;
        }

        for url in &sources.prebuilt_urls {
            let blob = self.fetcher.fetch(url)?;
            let raw_len = blob.len();
            let blob = transcode(blob, compress).map_err(|e| Error::format(url, e))?;
            log::info!(
                "Fetched pre-built blocklist {} ({} bytes, {} after transcoding)",
                url,
                raw_len,
                blob.len()
            );
            output.extend_from_slice(&blob);
        }

        let blocklist = Blocklist::new(output, compress, SystemTime::now());
        log::info!(
            "Finished generating blocklist: {} country ranges, {} bytes{}",
            entries.len(),
            blocklist.len(),
            if compress { " (gzip)" } else { "" }
        );
        Ok(blocklist)
    }
}

/// Check if data starts with a gzip header.
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == GZIP_MAGIC
}

/// Compress data as a single gzip member.
pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress a (possibly multi-member) gzip stream.
pub fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Bring a pre-built blob to the target encoding.
fn transcode(blob: Vec<u8>, compress: bool) -> std::io::Result<Vec<u8>> {
    match (is_gzip(&blob), compress) {
        (true, false) => gunzip(&blob),
        (false, true) => gzip(&blob),
        _ => Ok(blob),
    }
}
