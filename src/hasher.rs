/// Whole-file content hashing and hash snapshot construction.
use std::fs::File;
use std::path::Path;

use sha2::{Digest as _, Sha256};

use crate::error::Error;
use crate::scanner;
use crate::types::{ContentHash, FileHash};

/// Hash a byte buffer already in memory.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    let hash = Sha256::digest(bytes);
    return ContentHash(format!("{hash:x}"));
}

/// Hash a file by streaming its content.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<ContentHash, Error> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    let hash = hasher.finalize();
    return Ok(ContentHash(format!("{hash:x}")));
}

/// Build a fresh snapshot of every non-hidden regular file under `root`,
/// in traversal order.
///
/// # Errors
///
/// Returns `Error::EmptyRoot` for an empty root, `Error::Walk` if traversal
/// fails, or `Error::Io` if a file cannot be hashed.
pub fn build_snapshot(root: &Path) -> Result<Vec<FileHash>, Error> {
    if root.as_os_str().is_empty() {
        return Err(Error::EmptyRoot);
    }

    let mut records = Vec::new();
    for name in scanner::regular_files(root)? {
        let hash = hash_file(&name)?;
        records.push(FileHash { hash, name });
    }
    return Ok(records);
}
