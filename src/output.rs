//! One-shot output: build once and write the result out.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::builder::BlocklistBuilder;
use crate::config::{OutputSink, Sources};
use crate::fetcher::SourceFetcher;
use crate::snapshot::Blocklist;
use crate::{Error, Result};

/// Build the blocklist and write it to `sink`.
///
/// The build completes before the sink is touched, so a failed build
/// never leaves a partial file behind.
pub fn generate<F: SourceFetcher>(
    builder: &BlocklistBuilder<F>,
    sources: &Sources,
    compress: bool,
    sink: &OutputSink,
) -> Result<Blocklist> {
    let blocklist = builder.build(sources, compress)?;
    write_output(&blocklist, sink)?;
    Ok(blocklist)
}

/// Write a finished blocklist to a sink.
pub fn write_output(blocklist: &Blocklist, sink: &OutputSink) -> Result<()> {
    match sink {
        OutputSink::Stdout => {
            let mut out = io::stdout().lock();
            out.write_all(blocklist.content())?;
            out.flush()?;
        }
        OutputSink::File(path) => {
            write_file_atomic(path, blocklist.content())?;
            log::info!("Wrote {} bytes to {:?}", blocklist.len(), path);
        }
    }
    Ok(())
}

/// Write via a temporary file in the target directory, then rename.
///
/// Readers of `path` see either the old file or the complete new one.
fn write_file_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    temp_file.write_all(data)?;
    temp_file.as_file().sync_all()?;
    let _file = temp_file.persist(path).map_err(|e| Error::Io(e.error))?;

    // NamedTempFile creates files 0600
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        _file.set_permissions(fs::Permissions::from_mode(0o644))?;
    }

    Ok(())
}
