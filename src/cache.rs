//! Cross-document anchor cache.
//!
//! Maps a target document path to its anchor set. Documents are assumed not
//! to change during one run, so an entry is never recomputed once stored.
//! A lookup reports two things separately: whether the file is known at all,
//! and whether the fragment is known for it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::anchors;
use crate::document::Document;
use crate::types::AnchorSet;

/// Result of a two-level lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// The fragment is an anchor of the file. Always `false` when the file is unknown.
    pub anchor_known: bool,
    /// The file's anchors have been stored.
    pub file_known: bool,
}

/// Anchor sets of documents referenced with a fragment, keyed by the
/// normalized path the fragment was resolved against.
#[derive(Debug, Default)]
pub struct AnchorCache {
    /// Stored anchor sets.
    entries: HashMap<PathBuf, AnchorSet>,
}

impl AnchorCache {
    /// Anchor set of a known file.
    pub fn get(&self, file: &Path) -> Option<&AnchorSet> {
        return self.entries.get(file);
    }

    /// Whether the file's anchors have been stored.
    pub fn has_entry(&self, file: &Path) -> bool {
        return self.entries.contains_key(file);
    }

    /// Two-level lookup without touching the filesystem.
    pub fn has_anchor(&self, file: &Path, anchor: &str) -> Lookup {
        return match self.entries.get(file) {
            None => Lookup { anchor_known: false, file_known: false },
            Some(set) => Lookup { anchor_known: set.contains(anchor), file_known: true },
        };
    }

    /// Store a file's anchors. An existing entry is kept as is.
    pub fn store(&mut self, file: PathBuf, anchors: AnchorSet) {
        if self.has_entry(&file) {
            return;
        }
        self.entries.insert(file, anchors);
        return;
    }

    /// Read-through lookup: on a miss, read and parse `file`, store its
    /// anchors, then answer. A file that cannot be read or parsed is not
    /// stored and its anchors count as unknown.
    pub fn contains_anchor(&mut self, file: &Path, anchor: &str) -> bool {
        let lookup = self.has_anchor(file, anchor);
        if lookup.file_known {
            return lookup.anchor_known;
        }
        let Ok(document) = Document::read(file) else {
            return false;
        };
        self.store(file.to_path_buf(), anchors::extract(&document));
        return self.has_anchor(file, anchor).anchor_known;
    }
}
