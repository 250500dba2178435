//! Immutable blocklist snapshots and the HTTP metadata derived from them.
//!
//! A [`Blocklist`] is what the builder produces. A [`Snapshot`] pairs it with
//! the time of the next scheduled rebuild. Neither is ever mutated: updating
//! the served list means installing a whole new `Snapshot`.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Added to the advertised `max-age` so caches never consider the list
/// fresher than it will actually stay.
pub const CACHE_SAFETY_MARGIN: Duration = Duration::from_secs(10);

/// Download filename advertised for compressed lists.
pub const COMPRESSED_FILENAME: &str = "blocklist.gz";

/// Number of digest bytes kept in the validator.
const VALIDATOR_LEN: usize = 16;

/// A fully built blocklist payload.
#[derive(Debug)]
pub struct Blocklist {
    content: Bytes,
    compressed: bool,
    built_at: SystemTime,
    validator: String,
}

impl Blocklist {
    /// Wrap a finished payload, deriving its validator.
    pub fn new(content: Vec<u8>, compressed: bool, built_at: SystemTime) -> Self {
        let validator = derive_validator(built_at, &content);
        Self {
            content: Bytes::from(content),
            compressed,
            built_at,
            validator,
        }
    }

    /// The payload. Cloning the returned `Bytes` does not copy the data.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    /// Quoted entity tag for this payload.
    pub fn validator(&self) -> &str {
        &self.validator
    }
}

/// Derive the entity tag of a build.
///
/// The tag is the first 16 bytes of
/// `SHA-256(unix_nanos(built_at) as u128 big-endian || content)`, hex encoded
/// and quoted. It only depends on its inputs, so it is stable across restarts,
/// and two builds share a tag only if both time and content collide.
pub fn derive_validator(built_at: SystemTime, content: &[u8]) -> String {
    let nanos = built_at
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_be_bytes());
    hasher.update(content);
    let digest = hasher.finalize();

    format!("\"{}\"", hex::encode(&digest[..VALIDATOR_LEN]))
}

/// The unit of shared state: a blocklist plus its refresh schedule.
#[derive(Debug, Clone)]
pub struct Snapshot {
    blocklist: Arc<Blocklist>,
    next_refresh_at: SystemTime,
}

impl Snapshot {
    pub fn new(blocklist: Blocklist, next_refresh_at: SystemTime) -> Self {
        Self {
            blocklist: Arc::new(blocklist),
            next_refresh_at,
        }
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    pub fn next_refresh_at(&self) -> SystemTime {
        self.next_refresh_at
    }

    pub fn content_type(&self) -> &'static str {
        if self.blocklist.compressed {
            "application/gzip"
        } else {
            "text/plain"
        }
    }

    pub fn content_disposition(&self) -> String {
        if self.blocklist.compressed {
            format!("attachment; filename=\"{}\"", COMPRESSED_FILENAME)
        } else {
            "inline".to_string()
        }
    }

    /// `Last-Modified` value (IMF-fixdate).
    pub fn last_modified(&self) -> String {
        http_date(self.blocklist.built_at)
    }

    /// Seconds a client may cache the list when asked at `now`.
    ///
    /// Whole seconds left until the next rebuild (truncated, never negative)
    /// plus [`CACHE_SAFETY_MARGIN`].
    pub fn max_age_at(&self, now: SystemTime) -> u64 {
        let remaining = self
            .next_refresh_at
            .duration_since(now)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        remaining + CACHE_SAFETY_MARGIN.as_secs()
    }

    /// `Cache-Control` value when asked at `now`.
    pub fn cache_control_at(&self, now: SystemTime) -> String {
        format!("max-age={}", self.max_age_at(now))
    }
}

/// Format a time as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(time: SystemTime) -> String {
    let time: DateTime<Utc> = time.into();
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_http_date() {
        assert_eq!(http_date(at(784111777)), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_validator_format() {
        let tag = derive_validator(at(1_000), b"A:1.2.3.4-1.2.3.4\n");
        assert_eq!(tag.len(), VALIDATOR_LEN * 2 + 2);
        assert!(tag.starts_with('"') && tag.ends_with('"'));
        assert!(tag[1..tag.len() - 1]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_validator_deterministic() {
        let a = derive_validator(at(1_000), b"payload");
        let b = derive_validator(at(1_000), b"payload");
        assert_eq!(a, b);
    }

    #[test]
    fn test_validator_changes_with_time_and_content() {
        let base = derive_validator(at(1_000), b"payload");
        assert_ne!(base, derive_validator(at(1_001), b"payload"));
        assert_ne!(
            base,
            derive_validator(at(1_000) + Duration::from_nanos(1), b"payload")
        );
        assert_ne!(base, derive_validator(at(1_000), b"payloaD"));
    }

    #[test]
    fn test_uncompressed_headers() {
        let snapshot = Snapshot::new(Blocklist::new(b"abc".to_vec(), false, at(0)), at(100));
        assert_eq!(snapshot.content_type(), "text/plain");
        assert_eq!(snapshot.content_disposition(), "inline");
        assert_eq!(snapshot.last_modified(), "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(snapshot.blocklist().len(), 3);
    }

    #[test]
    fn test_compressed_headers() {
        let snapshot = Snapshot::new(Blocklist::new(vec![0x1f, 0x8b], true, at(0)), at(100));
        assert_eq!(snapshot.content_type(), "application/gzip");
        assert_eq!(
            snapshot.content_disposition(),
            "attachment; filename=\"blocklist.gz\""
        );
    }

    #[test]
    fn test_max_age_includes_margin() {
        let snapshot = Snapshot::new(Blocklist::new(Vec::new(), false, at(0)), at(86_400));
        assert_eq!(snapshot.max_age_at(at(0)), 86_410);
        assert_eq!(snapshot.cache_control_at(at(0)), "max-age=86410");
        // Partial seconds are truncated
        assert_eq!(
            snapshot.max_age_at(at(86_399) + Duration::from_millis(500)),
            10
        );
    }

    #[test]
    fn test_max_age_after_deadline() {
        let snapshot = Snapshot::new(Blocklist::new(Vec::new(), false, at(0)), at(100));
        assert_eq!(snapshot.max_age_at(at(100)), 10);
        assert_eq!(snapshot.max_age_at(at(5_000)), 10);
    }

    #[test]
    fn test_max_age_strictly_decreasing() {
        let snapshot = Snapshot::new(Blocklist::new(Vec::new(), false, at(0)), at(60));
        let ages: Vec<u64> = (0..=60).map(|s| snapshot.max_age_at(at(s))).collect();
        assert!(ages.windows(2).all(|w| w[0] > w[1]));
        assert!(ages.iter().all(|&age| age >= CACHE_SAFETY_MARGIN.as_secs()));
    }
}
