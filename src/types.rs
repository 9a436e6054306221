/// Core domain types shared by the checker and the reconciler.
use std::collections::HashSet;
use std::path::PathBuf;

/// Identifiers a fragment may target within one document.
/// Built once per document by the anchor extractor; read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorSet(
    /// The unique anchor identifiers.
    HashSet<String>,
);

impl AnchorSet {
    /// Whether `anchor` is a valid fragment target.
    pub fn contains(&self, anchor: &str) -> bool {
        return self.0.contains(anchor);
    }

    /// Insert an identifier. Returns `false` if it was already present.
    pub fn insert(&mut self, anchor: String) -> bool {
        return self.0.insert(anchor);
    }

    /// Whether the document exposes no anchors at all.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        return self.0.is_empty();
    }

    /// Number of distinct anchors.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        return self.0.len();
    }
}

impl<S: Into<String>> FromIterator<S> for AnchorSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        return Self(iter.into_iter().map(Into::into).collect());
    }
}

/// A whole-file content hash: 64 hex chars, always lowercase.
/// Newtype prevents mixing with arbitrary strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(
    /// The hex-encoded SHA-256 digest string.
    pub String,
);

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(&self.0);
    }
}

/// One record of a hash snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHash {
    /// Digest of the file's bytes.
    pub hash: ContentHash,
    /// Walk path of the file, lexically normalized.
    pub name: PathBuf,
}
