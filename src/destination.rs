//! Destination parsing, classification, and filesystem resolution.
//!
//! A destination is the raw target string of a link or image. It is split
//! like a generic URI reference; only scheme, host, path, and fragment
//! matter here.

use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::scanner::normalize_path;

/// Bytes left unescaped when writing a destination path. Everything else,
/// parentheses included, is percent-encoded.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b'/')
    .remove(b':')
    .remove(b';')
    .remove(b'=')
    .remove(b'@');

/// Why a destination string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DestinationError {
    /// A relative reference's first segment contains `:`, which would read as a scheme.
    #[error("first path segment in URL cannot contain colon")]
    ColonInFirstSegment,
    /// ASCII control characters are never valid.
    #[error("invalid control character in URL")]
    ControlCharacter,
    /// A `%` not followed by two hex digits.
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(
        /// The offending escape sequence.
        String,
    ),
    /// The string starts with `:`.
    #[error("missing protocol scheme")]
    MissingScheme,
}

/// How a parsed destination must be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    /// `#fragment` only: resolved against the referencing document's anchors.
    AnchorOnly,
    /// Scheme or host present: never resolved.
    External,
    /// A path relative to the referencing document, optionally with a fragment.
    RelativePath,
    /// Nothing to resolve (for example a bare `?query`).
    SelfReference,
}

/// Parsed form of a raw destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    /// Percent-decoded fragment.
    pub fragment: String,
    /// Host part of the authority, if any.
    pub host: String,
    /// Percent-decoded path.
    pub path: String,
    /// Fragment exactly as written, kept for rewriting.
    pub raw_fragment: String,
    /// Lowercased scheme, if any.
    pub scheme: String,
}

impl Destination {
    /// Parse a raw destination string.
    ///
    /// # Errors
    ///
    /// Returns a `DestinationError` for control characters, a missing
    /// scheme before `:`, invalid percent escapes, or a colon in the first
    /// segment of a scheme-less reference.
    pub fn parse(raw: &str) -> Result<Self, DestinationError> {
        if raw.bytes().any(|b| return b < 0x20 || b == 0x7f) {
            return Err(DestinationError::ControlCharacter);
        }

        let (reference, raw_fragment) = raw.split_once('#').unwrap_or((raw, ""));
        let fragment = unescape(raw_fragment)?;

        let (scheme, rest) = split_scheme(reference)?;
        let rest = rest.split_once('?').map_or(rest, |(before, _)| return before);

        let authority = rest
            .strip_prefix("//")
            .filter(|_| return !scheme.is_empty() || !rest.starts_with("///"));
        let (host, raw_path) = match authority {
            Some(after) => {
                let (authority, path) = after.find('/').map_or((after, ""), |i| return after.split_at(i));
                let host = authority.rsplit_once('@').map_or(authority, |(_, host)| return host);
                (host.to_string(), path)
            },
            None if !scheme.is_empty() && !rest.starts_with('/') => (String::new(), ""),
            None => (String::new(), rest),
        };

        if scheme.is_empty()
            && raw_path
                .split('/')
                .next()
                .is_some_and(|segment| return segment.contains(':'))
        {
            return Err(DestinationError::ColonInFirstSegment);
        }

        return Ok(Self {
            fragment,
            host,
            path: unescape(raw_path)?,
            raw_fragment: raw_fragment.to_string(),
            scheme: scheme.to_ascii_lowercase(),
        });
    }

    /// Classify the destination.
    pub fn kind(&self) -> DestinationKind {
        if !self.scheme.is_empty() || !self.host.is_empty() {
            return DestinationKind::External;
        }
        if !self.path.is_empty() {
            return DestinationKind::RelativePath;
        }
        if !self.fragment.is_empty() {
            return DestinationKind::AnchorOnly;
        }
        return DestinationKind::SelfReference;
    }
}

/// Split off a URI scheme. A string with no valid scheme is returned whole.
///
/// # Errors
///
/// Returns `DestinationError::MissingScheme` if the string starts with `:`.
fn split_scheme(reference: &str) -> Result<(&str, &str), DestinationError> {
    for (i, c) in reference.char_indices() {
        if c.is_ascii_alphabetic() {
            continue;
        }
        if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' {
            if i == 0 {
                return Ok(("", reference));
            }
            continue;
        }
        if c == ':' {
            if i == 0 {
                return Err(DestinationError::MissingScheme);
            }
            let (scheme, rest) = reference.split_at(i);
            return Ok((scheme, rest.strip_prefix(':').unwrap_or(rest)));
        }
        return Ok(("", reference));
    }
    return Ok(("", reference));
}

/// Percent-decode after checking every `%` starts a two-hex-digit escape.
///
/// # Errors
///
/// Returns `DestinationError::InvalidEscape` for a malformed escape.
fn unescape(text: &str) -> Result<String, DestinationError> {
    for piece in text.split('%').skip(1) {
        let digits: String = piece.chars().take(2).collect();
        if digits.len() != 2 || !digits.chars().all(|c| return c.is_ascii_hexdigit()) {
            return Err(DestinationError::InvalidEscape(format!("%{digits}")));
        }
    }
    return Ok(percent_decode_str(text).decode_utf8_lossy().into_owned());
}

/// Which existence predicate a reference needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Accepts only a regular file.
    Image,
    /// Accepts a regular file or a directory.
    Link,
}

impl ReferenceKind {
    /// Whether `path` exists in a form this reference accepts.
    pub fn target_exists(self, path: &Path) -> bool {
        let Ok(metadata) = std::fs::metadata(path) else {
            return false;
        };
        return match self {
            ReferenceKind::Image => metadata.is_file(),
            ReferenceKind::Link => metadata.is_file() || metadata.is_dir(),
        };
    }
}

/// Resolve a destination path against the directory of the document that
/// contains it. A leading `/` is treated like any other relative path.
/// The result is lexically normalized.
pub fn resolve(document: &Path, path: &str) -> PathBuf {
    let dir = document.parent().unwrap_or_else(|| return Path::new(""));
    let relative = path
        .trim_start_matches('/')
        .replace('/', std::path::MAIN_SEPARATOR_STR);
    let joined = normalize_path(&dir.join(relative));
    if joined.as_os_str().is_empty() {
        return PathBuf::from(".");
    }
    return joined;
}

/// Render a filesystem-relative path as a destination string, appending the
/// original fragment text verbatim when there was one.
pub fn format_destination(relative: &Path, raw_fragment: &str) -> String {
    let slashed = relative
        .components()
        .map(|c| return c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    let mut out = utf8_percent_encode(&slashed, PATH_SAFE).to_string();

    let first_segment_has_colon = out.split('/').next().is_some_and(|s| return s.contains(':'));
    if first_segment_has_colon {
        out.insert_str(0, "./");
    }
    if !raw_fragment.is_empty() {
        out.push('#');
        out.push_str(raw_fragment);
    }
    return out;
}
