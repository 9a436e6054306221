//! Directory traversal for documents and for hash snapshots.
//!
//! Hidden directories (name starting with `.`, other than `.` and `..`) are
//! pruned, never descended into. Entries are visited in file-name order so
//! repeated runs see the same sequence.

use std::path::{Component, Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::error::Error;
use crate::grammar;

/// Collect every document under `root`, subject to the config's
/// include/exclude prefixes (matched against the path relative to `root`).
///
/// # Errors
///
/// Returns `Error::Walk` if the traversal fails.
pub fn documents(root: &Path, config: &Config) -> Result<Vec<PathBuf>, Error> {
    let mut found = Vec::new();

    for entry in walk(root) {
        let entry = entry?;
        if entry.file_type().is_dir() || !grammar::is_document_path(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or_else(|_| return entry.path());
        if !config.should_scan(&relative.to_string_lossy()) {
            continue;
        }
        found.push(entry.into_path());
    }

    return Ok(found);
}

/// Collect every non-hidden regular file under `root`, with lexically
/// normalized names.
///
/// # Errors
///
/// Returns `Error::Walk` if the traversal fails.
#[allow(clippy::filetype_is_file, reason = "symlinks, sockets and fifos are left out of snapshots")]
pub fn regular_files(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut found = Vec::new();

    for entry in walk(root) {
        let entry = entry?;
        if !entry.file_type().is_file() || is_hidden(&entry) {
            continue;
        }
        found.push(normalize_path(entry.path()));
    }

    return Ok(found);
}

/// Depth-first walk with hidden directories pruned.
fn walk(root: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    return WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| return !(e.file_type().is_dir() && is_hidden(e)));
}

/// Whether an entry's own name marks it hidden.
fn is_hidden(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    return name != "." && name != ".." && name.starts_with('.');
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => {
            let can_pop = matches!(
                components.last(),
                Some(c) if !matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
            );
            if can_pop {
                components.pop();
            } else if !matches!(components.last(), Some(Component::RootDir)) {
                components.push(component);
            }
        },
        other => components.push(other),
    }
    return;
}
