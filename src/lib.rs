//! pgblock - IP blocklist generator and server in PeerGuardian v2 format.
//!
//! This crate builds a blocklist from country IP range feeds and/or
//! pre-built blocklists, and either writes it once or serves it over HTTP,
//! rebuilding it every 24 hours. Clients that can auto-update from a URL
//! (Transmission, for instance) can point straight at the server.
//!
//! # Features
//!
//! - **Country ranges**: one `Country Name:start-end` line per network
//! - **Pre-built lists**: gzip or plain lists appended as-is, transcoded
//!   to the output encoding
//! - **Gzip output**: optional, as one multi-member gzip stream
//! - **Hot reload**: snapshots are swapped atomically; in-flight requests
//!   finish against the snapshot they started with
//! - **Cache friendly**: `Last-Modified`, `ETag` and a `max-age` that runs
//!   out when the next rebuild is due
//!
//! # Quick Start
//!
//! ```ignore
//! use pgblock::{BlocklistBuilder, Country, HttpFetcher, Sources};
//!
//! let builder = BlocklistBuilder::new(HttpFetcher::new());
//! let sources = Sources::new(vec![Country::parse("US")?], vec![]);
//!
//! let blocklist = builder.build(&sources, false)?;
//! println!("{}", String::from_utf8_lossy(blocklist.content()));
//! ```
//!
//! # Serving
//!
//! ```ignore
//! use pgblock::{server, BlocklistBuilder, HttpFetcher, Refresher, Sources};
//! use std::time::Duration;
//!
//! let refresher = Refresher::new(
//!     BlocklistBuilder::new(HttpFetcher::new()),
//!     sources,
//!     true,
//!     Duration::from_secs(86400),
//! );
//!
//! // Builds once, binds, then serves and refreshes until a rebuild fails
//! server::serve("0.0.0.0:8080".parse()?, refresher).await?;
//! ```

mod error;

pub mod builder;
pub mod config;
pub mod country;
pub mod entry;
pub mod fetcher;
pub mod output;
pub mod refresh;
pub mod server;
pub mod snapshot;
pub mod state;

// Re-export core types
pub use error::{EntryError, Error, Result};

pub use builder::BlocklistBuilder;
pub use config::{Config, OutputMode, OutputSink, Sources};
pub use country::Country;
pub use entry::BlocklistEntry;
pub use fetcher::{HttpFetcher, SourceFetcher, StaticFetcher};
pub use refresh::Refresher;
pub use server::ServerStats;
pub use snapshot::{Blocklist, Snapshot};
pub use state::SharedBlocklist;
