//! Hash snapshot persistence: one `<hex-hash>  <path>` record per line.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::{ContentHash, FileHash};

/// Prefix of the temporary file written next to the state file.
const TEMP_PREFIX: &str = ".linkmend-";

/// Outcome of loading a state file.
#[derive(Debug)]
pub enum Loaded {
    /// The state file does not exist yet.
    Missing,
    /// The records, in file order.
    Snapshot(Vec<FileHash>),
}

/// Parse snapshot text. Each line splits at its first run of whitespace
/// into a hash and a path; both must be non-empty.
///
/// # Errors
///
/// Returns `Error::StateCorrupt` naming the first malformed line.
pub fn parse(path: &Path, content: &str) -> Result<Vec<FileHash>, Error> {
    let mut records = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let Some((hash, name)) = line.trim_start().split_once(char::is_whitespace) else {
            return Err(corrupt(path, index, line));
        };
        let (hash, name) = (hash.trim(), name.trim());
        if hash.is_empty() || name.is_empty() {
            return Err(corrupt(path, index, line));
        }
        records.push(FileHash {
            hash: ContentHash(hash.to_string()),
            name: PathBuf::from(name),
        });
    }
    return Ok(records);
}

/// Build the corruption error for a zero-based line index.
fn corrupt(path: &Path, index: usize, line: &str) -> Error {
    return Error::StateCorrupt {
        line: index.saturating_add(1),
        path: path.to_path_buf(),
        reason: format!("invalid line: {line:?}"),
    };
}

/// Read a state file from disk.
///
/// # Errors
///
/// Returns `Error::Io` for read failures other than not-found,
/// or `Error::StateCorrupt` for malformed content.
pub fn read(path: &Path) -> Result<Loaded, Error> {
    let content = match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };
    return Ok(Loaded::Snapshot(parse(path, &content)?));
}

/// Render records in the persisted format.
pub fn serialize(records: &[FileHash]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.hash.0);
        out.push_str("  ");
        out.push_str(&record.name.to_string_lossy());
        out.push('\n');
    }
    return out;
}

/// Write the snapshot through a temporary file in the same directory,
/// renamed over the target once fully written.
///
/// # Errors
///
/// Returns `Error::Io` if the temporary file cannot be created, written, or
/// persisted.
pub fn write(path: &Path, records: &[FileHash]) -> Result<(), Error> {
    let dir = path
        .parent()
        .filter(|p| return !p.as_os_str().is_empty())
        .unwrap_or_else(|| return Path::new("."));
    let mut temp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)?;
    temp.write_all(serialize(records).as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| return Error::Io(e.error))?;
    return Ok(());
}
