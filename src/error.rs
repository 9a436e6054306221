/// Crate-level error types for linkmend.
///
/// Only run-fatal conditions live here. Broken links, broken fragments and
/// advisories are findings collected in `diagnostics::Diagnostics` and never
/// abort a run.
use std::path::PathBuf;

/// Every variant names the file or reason for failure so it can be rendered
/// as a standalone diagnostic.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The directory to scan was given as an empty string.
    #[error("directory to scan must not be empty")]
    EmptyRoot,

    /// A path given on the command line does not exist or cannot be inspected.
    #[error("cannot read input {}: {source}", path.display())]
    InputNotFound {
        /// Path as given by the user.
        path: PathBuf,
        /// Underlying stat failure.
        source: std::io::Error,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// Serializing the findings report failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// Tree-sitter failed to produce a syntax tree for a document.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// Document that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The persisted hash snapshot exists but a line cannot be parsed.
    #[error("state file corrupt: {}:{line}: {reason}", path.display())]
    StateCorrupt {
        /// One-based line number of the offending record.
        line: usize,
        /// State file path.
        path: PathBuf,
        /// Description of the corruption.
        reason: String,
    },

    /// TOML deserialization of `.linkmend.toml` failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// Directory traversal failed part way through.
    #[error("walk: {0}")]
    Walk(
        /// The wrapped walkdir error.
        #[from]
        walkdir::Error,
    ),
}
