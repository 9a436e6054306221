//! Rename repair: infer moves by content hash and patch inline links.
//!
//! Two snapshots of the same tree are compared by content. A document whose
//! bytes appear in the old snapshot has a known former path; a broken link in
//! it is re-resolved against that former location, and the file found there
//! is followed, by hash, to wherever it lives now. Only files whose content
//! did not change between the snapshots can be matched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::destination::{self, Destination, DestinationKind, ReferenceKind};
use crate::diagnostics::{Diagnostics, FindingKind};
use crate::document::{Document, LinkStyle, Node};
use crate::error::Error;
use crate::grammar;
use crate::hasher;
use crate::patcher::{self, Replacement};
use crate::scanner::normalize_path;
use crate::types::{ContentHash, FileHash};

/// A planned rewrite of one destination.
#[derive(Debug)]
struct Repair {
    /// Destination as the parser reported it.
    destination: String,
    /// Destination pointing at the target's current location.
    new_destination: String,
    /// Literal substitution that performs the rewrite.
    replacement: Replacement,
}

/// Lookup tables built from an old and a new snapshot. Duplicate hashes
/// resolve to the last record in snapshot order.
#[derive(Debug, Default)]
pub struct Reconciler {
    /// Current location of each content hash.
    new_hash_to_name: HashMap<ContentHash, PathBuf>,
    /// Former location of each content hash.
    old_hash_to_name: HashMap<ContentHash, PathBuf>,
    /// Content hash of each former location.
    old_name_to_hash: HashMap<PathBuf, ContentHash>,
}

impl Reconciler {
    /// Index both snapshots.
    pub fn new(old: &[FileHash], new: &[FileHash]) -> Self {
        let mut reconciler = Self::default();
        for record in old {
            let name = normalize_path(&record.name);
            reconciler.old_name_to_hash.insert(name.clone(), record.hash.clone());
            reconciler.old_hash_to_name.insert(record.hash.clone(), name);
        }
        for record in new {
            reconciler
                .new_hash_to_name
                .insert(record.hash.clone(), normalize_path(&record.name));
        }
        return reconciler;
    }

    /// Repair one document in place. Returns whether it was rewritten.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the document cannot be read (other than
    /// vanishing) or written, or `Error::ParseFailed`.
    pub fn reconcile_document(&self, file: &Path, diagnostics: &mut Diagnostics) -> Result<bool, Error> {
        let bytes = match std::fs::read(file) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                diagnostics.report(file, "", FindingKind::UnreadableDocument { reason: e.to_string() });
                return Ok(false);
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(b) => b,
        };

        let hash = hasher::hash_bytes(&bytes);
        let Some(former) = self.old_hash_to_name.get(&hash) else {
            diagnostics.report(file, "", FindingKind::UnknownFormerPath { hash: hash.0 });
            return Ok(false);
        };

        let document = Document::parse(file, &bytes)?;
        let mut replacements = Vec::new();
        for repair in self.plan(file, former, &document, diagnostics) {
            if !patcher::occurs(&bytes, &repair.replacement) {
                diagnostics.report(file, &repair.destination, FindingKind::UnpatchableDestination);
                continue;
            }
            let replaced = FindingKind::Replaced { replacement: repair.new_destination };
            diagnostics.report(file, &repair.destination, replaced);
            replacements.push(repair.replacement);
        }
        if replacements.is_empty() {
            return Ok(false);
        }

        std::fs::write(file, patcher::apply(&bytes, &replacements))?;
        return Ok(true);
    }

    /// Collect substitutions for every broken inline link whose target can
    /// be followed from the document's former location.
    fn plan(&self, file: &Path, former: &Path, document: &Document, diagnostics: &mut Diagnostics) -> Vec<Repair> {
        let mut repairs: Vec<Repair> = Vec::new();

        for node in &document.nodes {
            let (raw, reference) = match node {
                Node::Link { destination, style: LinkStyle::Inline } => (destination, ReferenceKind::Link),
                Node::Image { destination, style: LinkStyle::Inline } => (destination, ReferenceKind::Image),
                Node::Heading { .. }
                | Node::Image { .. }
                | Node::Link { .. }
                | Node::Other
                | Node::RawMarkupBlock { .. }
                | Node::RawMarkupSpan { .. } => continue,
            };
            let Some(new_destination) = self.repair(file, former, raw, reference, diagnostics) else {
                continue;
            };
            let replacement = Replacement::inline_destination(raw, &new_destination);
            if repairs.iter().any(|r| return r.replacement == replacement) {
                continue;
            }
            repairs.push(Repair {
                destination: raw.clone(),
                new_destination,
                replacement,
            });
        }

        return repairs;
    }

    /// New destination text for a broken relative destination, if its
    /// target moved to a known place.
    fn repair(
        &self,
        file: &Path,
        former: &Path,
        raw: &str,
        reference: ReferenceKind,
        diagnostics: &mut Diagnostics,
    ) -> Option<String> {
        if raw.is_empty() {
            return None;
        }
        let parsed = Destination::parse(raw).ok()?;
        if parsed.kind() != DestinationKind::RelativePath {
            return None;
        }
        if reference.target_exists(&destination::resolve(file, &parsed.path)) {
            return None;
        }

        let former_target = destination::resolve(former, &parsed.path);
        let hash = self.old_name_to_hash.get(&former_target)?;
        let current_target = self.new_hash_to_name.get(hash)?;

        let current_dir = file.parent().unwrap_or_else(|| return Path::new(""));
        let Some(relative) = pathdiff::diff_paths(current_target, current_dir) else {
            diagnostics.report(file, raw, FindingKind::NoRelativePath { target: current_target.clone() });
            return None;
        };
        return Some(destination::format_destination(&relative, &parsed.raw_fragment));
    }
}

/// Repair every document of the new snapshot that passes the config filter.
/// Returns whether any document was rewritten.
///
/// # Errors
///
/// Returns the first error from `Reconciler::reconcile_document`.
pub fn reconcile(
    root: &Path,
    config: &Config,
    old: &[FileHash],
    new: &[FileHash],
    diagnostics: &mut Diagnostics,
) -> Result<bool, Error> {
    let reconciler = Reconciler::new(old, new);
    let root = normalize_path(root);
    let mut updated = false;

    for record in new {
        let name = record.name.to_string_lossy();
        if !grammar::has_document_suffix(&name) {
            continue;
        }
        let relative = record.name.strip_prefix(&root).unwrap_or(&record.name);
        if !config.should_scan(&relative.to_string_lossy()) {
            continue;
        }
        updated |= reconciler.reconcile_document(&record.name, diagnostics)?;
    }

    return Ok(updated);
}
