//! Blocklist entries and the PeerGuardian v2 line format.
//!
//! Each entry is rendered as one line:
//!
//! ```text
//! {label}:{start}-{end}\n
//! ```
//!
//! Addresses use their standard textual form (dotted-quad for IPv4,
//! colon-hex for IPv6).

use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;

use crate::error::EntryError;

/// A single labelled, inclusive IP address range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlocklistEntry {
    label: String,
    start: IpAddr,
    end: IpAddr,
}

impl BlocklistEntry {
    /// Create an entry from an explicit range.
    ///
    /// Both addresses must be of the same family and `start <= end`.
    pub fn new(label: &str, start: IpAddr, end: IpAddr) -> Result<Self, EntryError> {
        let same_family = start.is_ipv4() == end.is_ipv4();
        if !same_family || start > end {
            return Err(EntryError::InvalidRange(format!("{}-{}", start, end)));
        }
        Ok(Self {
            label: label.to_string(),
            start,
            end,
        })
    }

    /// Create an entry spanning a whole network, from its network address
    /// to its broadcast (last) address.
    pub fn from_network(label: &str, network: IpNet) -> Self {
        Self {
            label: label.to_string(),
            start: network.network(),
            end: network.broadcast(),
        }
    }

    /// Parse a CIDR string such as `203.0.113.0/24` into an entry.
    ///
    /// A bare address is treated as a single-host network. Networks with
    /// host bits set (`10.1.2.3/8`) are rejected.
    pub fn from_cidr(label: &str, cidr: &str) -> Result<Self, EntryError> {
        let cidr = cidr.trim();
        let network: IpNet = match cidr.parse() {
            Ok(net) => net,
            Err(_) => cidr
                .parse::<IpAddr>()
                .map(IpNet::from)
                .map_err(|_| EntryError::InvalidCidr(cidr.to_string()))?,
        };
        if network.addr() != network.network() {
            return Err(EntryError::InvalidCidr(cidr.to_string()));
        }
        Ok(Self::from_network(label, network))
    }

    /// Parse one line of the blocklist format.
    ///
    /// The label ends at the first `:`; the range is split on `-`.
    /// A trailing newline is ignored.
    pub fn parse_line(line: &str) -> Result<Self, EntryError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (label, range) = line
            .split_once(':')
            .ok_or_else(|| EntryError::MissingLabel(line.to_string()))?;
        let (start, end) = range
            .split_once('-')
            .ok_or_else(|| EntryError::MissingRange(line.to_string()))?;

        let start: IpAddr = start
            .parse()
            .map_err(|_| EntryError::InvalidIp(start.to_string()))?;
        let end: IpAddr = end
            .parse()
            .map_err(|_| EntryError::InvalidIp(end.to_string()))?;

        Self::new(label, start, end)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start(&self) -> IpAddr {
        self.start
    }

    pub fn end(&self) -> IpAddr {
        self.end
    }

    /// Append this entry's line (including the newline) to a buffer.
    pub fn write_line(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.to_string().as_bytes());
        out.push(b'\n');
    }
}

impl fmt::Display for BlocklistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.label, self.start, self.end)
    }
}

/// Serialize entries into the blocklist text format, preserving order.
pub fn serialize_entries(entries: &[BlocklistEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(entries.len() * 48);
    for entry in entries {
        entry.write_line(&mut out);
    }
    out
}

/// Parse a full blocklist text body back into entries.
///
/// Blank lines are skipped.
pub fn parse_entries(text: &str) -> Result<Vec<BlocklistEntry>, EntryError> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(BlocklistEntry::parse_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cidr_v4() {
        let entry = BlocklistEntry::from_cidr("Testland", "198.51.100.0/25").unwrap();
        assert_eq!(entry.start(), "198.51.100.0".parse::<IpAddr>().unwrap());
        assert_eq!(entry.end(), "198.51.100.127".parse::<IpAddr>().unwrap());
        assert_eq!(entry.to_string(), "Testland:198.51.100.0-198.51.100.127");
    }

    #[test]
    fn test_from_cidr_v6() {
        let entry = BlocklistEntry::from_cidr("Testland", "2001:db8::/126").unwrap();
        assert_eq!(entry.to_string(), "Testland:2001:db8::-2001:db8::3");
    }

    #[test]
    fn test_from_cidr_host_bits_set() {
        assert!(BlocklistEntry::from_cidr("X", "10.1.2.3/8").is_err());
        let entry = BlocklistEntry::from_cidr("X", "10.0.0.0/8").unwrap();
        assert_eq!(entry.to_string(), "X:10.0.0.0-10.255.255.255");
    }

    #[test]
    fn test_single_host_network() {
        let entry = BlocklistEntry::from_cidr("X", "192.0.2.7/32").unwrap();
        assert_eq!(entry.start(), entry.end());

        let bare = BlocklistEntry::from_cidr("X", "192.0.2.7").unwrap();
        assert_eq!(bare, entry);
    }

    #[test]
    fn test_invalid_cidr() {
        assert!(BlocklistEntry::from_cidr("X", "invalid").is_err());
        assert!(BlocklistEntry::from_cidr("X", "192.168.1.1/33").is_err());
    }

    #[test]
    fn test_new_rejects_reversed_range() {
        let a: IpAddr = "10.0.0.2".parse().unwrap();
        let b: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(BlocklistEntry::new("X", a, b).is_err());
        assert!(BlocklistEntry::new("X", b, a).is_ok());
    }

    #[test]
    fn test_new_rejects_mixed_families() {
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "::ffff".parse().unwrap();
        assert!(matches!(
            BlocklistEntry::new("X", a, b),
            Err(EntryError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_parse_line_with_dash_in_label() {
        let entry = BlocklistEntry::parse_line("Guinea-Bissau:192.0.2.0-192.0.2.255\n").unwrap();
        assert_eq!(entry.label(), "Guinea-Bissau");
        assert_eq!(entry.end(), "192.0.2.255".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_parse_line_errors() {
        assert!(matches!(
            BlocklistEntry::parse_line("no separator"),
            Err(EntryError::MissingLabel(_))
        ));
        assert!(matches!(
            BlocklistEntry::parse_line("Label:10.0.0.1"),
            Err(EntryError::MissingRange(_))
        ));
        assert!(matches!(
            BlocklistEntry::parse_line("Label:10.0.0.1-nope"),
            Err(EntryError::InvalidIp(_))
        ));
    }

    #[test]
    fn test_serialize_then_parse_preserves_entries() {
        let entries = vec![
            BlocklistEntry::from_cidr("United States of America", "203.0.113.0/24").unwrap(),
            BlocklistEntry::from_cidr("Timor-Leste", "2001:db8:1::/48").unwrap(),
            BlocklistEntry::from_cidr("Korea, Republic of", "192.0.2.0/31").unwrap(),
            // Duplicates are kept
            BlocklistEntry::from_cidr("Korea, Republic of", "192.0.2.0/31").unwrap(),
        ];

        let text = serialize_entries(&entries);
        let parsed = parse_entries(std::str::from_utf8(&text).unwrap()).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_serialize_format() {
        let entries = vec![
            BlocklistEntry::from_cidr("A", "203.0.113.0/24").unwrap(),
            BlocklistEntry::from_cidr("B", "198.51.100.0/25").unwrap(),
        ];
        assert_eq!(
            serialize_entries(&entries),
            b"A:203.0.113.0-203.0.113.255\nB:198.51.100.0-198.51.100.127\n".to_vec()
        );
    }
}
