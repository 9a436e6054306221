//! Link validation: one pass per document, accumulating findings.

use std::path::Path;

use crate::anchors;
use crate::cache::AnchorCache;
use crate::config::Config;
use crate::destination::{self, Destination, DestinationKind, ReferenceKind};
use crate::diagnostics::{Diagnostics, FindingKind};
use crate::document::{Document, Node};
use crate::error::Error;
use crate::grammar;
use crate::scanner;
use crate::types::AnchorSet;

/// Validation state shared across every document of one run.
pub struct Validator<'a> {
    /// Anchor sets of link targets, filled on demand.
    cache: AnchorCache,
    /// Project configuration.
    config: &'a Config,
}

impl<'a> Validator<'a> {
    /// Start a run with an empty anchor cache.
    pub fn new(config: &'a Config) -> Self {
        return Self { cache: AnchorCache::default(), config };
    }

    /// Validate one input path: a document file, or a directory scanned
    /// for documents. Returns whether any document was dirty.
    ///
    /// # Errors
    ///
    /// Returns `Error::InputNotFound` if the input cannot be stat'ed,
    /// `Error::Walk` if traversal fails, or any error from reading a document.
    pub fn check_input(&mut self, input: &Path, diagnostics: &mut Diagnostics) -> Result<bool, Error> {
        let metadata = std::fs::metadata(input).map_err(|source| {
            return Error::InputNotFound { path: input.to_path_buf(), source };
        })?;

        if !metadata.is_dir() {
            return self.check_file(input, diagnostics);
        }

        let mut dirty = false;
        for file in scanner::documents(input, self.config)? {
            dirty |= self.check_file(&file, diagnostics)?;
        }
        return Ok(dirty);
    }

    /// Read, parse and validate a single document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the document cannot be read, or
    /// `Error::ParseFailed`.
    pub fn check_file(&mut self, file: &Path, diagnostics: &mut Diagnostics) -> Result<bool, Error> {
        let document = Document::read(file)?;
        return Ok(self.check_document(file, &document, diagnostics));
    }

    /// Validate every link and image of a parsed document located at `file`.
    pub fn check_document(&mut self, file: &Path, document: &Document, diagnostics: &mut Diagnostics) -> bool {
        let own = anchors::extract(document);
        let mut dirty = false;

        for node in &document.nodes {
            let (raw, reference) = match node {
                Node::Link { destination, .. } => (destination, ReferenceKind::Link),
                Node::Image { destination, .. } => (destination, ReferenceKind::Image),
                Node::Heading { .. } | Node::Other | Node::RawMarkupBlock { .. } | Node::RawMarkupSpan { .. } => {
                    continue;
                },
            };
            dirty |= self.check_destination(file, &own, raw, reference, diagnostics);
        }

        return dirty;
    }

    /// Check one destination. Returns whether it makes the document dirty.
    fn check_destination(
        &mut self,
        file: &Path,
        own: &AnchorSet,
        raw: &str,
        reference: ReferenceKind,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        if raw.is_empty() {
            diagnostics.report(file, raw, FindingKind::EmptyDestination);
            return false;
        }

        let parsed = match Destination::parse(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                diagnostics.report(file, raw, FindingKind::MalformedDestination { reason: e.to_string() });
                return true;
            },
        };

        match parsed.kind() {
            DestinationKind::External | DestinationKind::SelfReference => return false,
            DestinationKind::AnchorOnly => {
                if !own.contains(&parsed.fragment) {
                    diagnostics.report(file, raw, FindingKind::BrokenLocalFragment);
                    return true;
                }
                self.warn_if_unstable(file, raw, &parsed.fragment, own, diagnostics);
                return false;
            },
            DestinationKind::RelativePath => {},
        }

        let target = destination::resolve(file, &parsed.path);
        if !reference.target_exists(&target) {
            diagnostics.report(file, raw, FindingKind::BrokenLink);
            return true;
        }

        if parsed.fragment.is_empty() || !grammar::has_document_suffix(&target.to_string_lossy()) {
            return false;
        }

        if !self.cache.contains_anchor(&target, &parsed.fragment) {
            diagnostics.report(file, raw, FindingKind::BrokenRemoteFragment);
            return true;
        }
        if let Some(remote) = self.cache.get(&target) {
            self.warn_if_unstable(file, raw, &parsed.fragment, remote, diagnostics);
        }
        return false;
    }

    /// Emit the unstable-anchor advisory when enabled and the fragment looks
    /// like an auto-suffixed duplicate.
    fn warn_if_unstable(
        &self,
        file: &Path,
        raw: &str,
        fragment: &str,
        anchors: &AnchorSet,
        diagnostics: &mut Diagnostics,
    ) {
        if self.config.unstable_anchors && anchors::is_unstable(fragment, anchors) {
            diagnostics.report(file, raw, FindingKind::UnstableAnchor);
        }
        return;
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::diagnostics::Finding;

    fn tree(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::Builder::new().prefix("linkmend").tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        return dir;
    }

    fn run(input: &Path) -> (bool, Vec<Finding>) {
        let config = Config::default();
        let mut validator = Validator::new(&config);
        let mut diagnostics = Diagnostics::default();
        let dirty = validator.check_input(input, &mut diagnostics).unwrap();
        return (dirty, diagnostics.findings().to_vec());
    }

    fn kinds(findings: &[Finding]) -> Vec<(String, FindingKind)> {
        return findings.iter().map(|f| return (f.destination.clone(), f.kind.clone())).collect();
    }

    #[test]
    fn unstable_anchor_is_advisory_and_missing_suffix_is_broken() {
        let dir = tree(&[(
            "a.md",
            "# Intro\n\n# Intro\n\n[ok](#intro) [drift](#intro-1) [gone](#intro-2)\n",
        )]);
        let (dirty, findings) = run(dir.path());
        assert!(dirty);
        assert_eq!(
            kinds(&findings),
            vec![
                ("#intro-1".to_string(), FindingKind::UnstableAnchor),
                ("#intro-2".to_string(), FindingKind::BrokenLocalFragment),
            ]
        );
    }

    #[test]
    fn advisory_can_be_disabled() {
        let dir = tree(&[("a.md", "# Intro\n\n# Intro\n\n[drift](#intro-1)\n")]);
        let config = Config::from_toml("unstable_anchors = false").unwrap();
        let mut validator = Validator::new(&config);
        let mut diagnostics = Diagnostics::default();
        assert!(!validator.check_input(dir.path(), &mut diagnostics).unwrap());
        assert!(diagnostics.findings().is_empty());
    }

    #[test]
    fn paths_resolve_against_the_referencing_document() {
        let dir = tree(&[("docs/a.md", "![diagram](img.png)\n"), ("docs/img.png", "png")]);
        let (dirty, findings) = run(dir.path());
        assert!(!dirty);
        assert!(findings.is_empty());

        let file = dir.path().join("docs/a.md");
        let (dirty, _) = run(&file);
        assert!(!dirty);
    }

    #[test]
    fn directories_satisfy_links_but_not_images() {
        let dir = tree(&[("a.md", "[guide](guide) ![pic](guide)\n"), ("guide/index.md", "# Guide\n")]);
        let (dirty, findings) = run(&dir.path().join("a.md"));
        assert!(dirty);
        assert_eq!(kinds(&findings), vec![("guide".to_string(), FindingKind::BrokenLink)]);
    }

    #[test]
    fn cross_document_fragments_use_the_target_anchors() {
        let dir = tree(&[
            ("a.md", "[ok](b.md#usage) [bad](b.md#missing) [dup](b.md#usage-1)\n"),
            ("b.md", "# Usage\n\n## Usage\n"),
        ]);
        let (dirty, findings) = run(&dir.path().join("a.md"));
        assert!(dirty);
        assert_eq!(
            kinds(&findings),
            vec![
                ("b.md#missing".to_string(), FindingKind::BrokenRemoteFragment),
                ("b.md#usage-1".to_string(), FindingKind::UnstableAnchor),
            ]
        );
    }

    #[test]
    fn table_cell_ids_are_link_targets() {
        let dir = tree(&[(
            "a.md",
            "<table><tr id=\"row\"><td id=\"cell\">x</td></tr></table>\n\n[row](#row) [cell](#cell)\n",
        )]);
        let (dirty, findings) = run(dir.path());
        assert!(!dirty, "{findings:?}");
        assert!(findings.is_empty());
    }

    #[test]
    fn fragments_into_non_documents_are_not_checked() {
        let dir = tree(&[("a.md", "[src](main.rs#L10)\n"), ("main.rs", "fn main() {}\n")]);
        let (dirty, findings) = run(dir.path());
        assert!(!dirty);
        assert!(findings.is_empty());
    }

    #[test]
    fn empty_and_external_destinations() {
        let dir = tree(&[("a.md", "[empty]() [web](https://example.com/x.md) [mail](mailto:a@b.c)\n")]);
        let (dirty, findings) = run(dir.path());
        assert!(!dirty);
        assert_eq!(kinds(&findings), vec![(String::new(), FindingKind::EmptyDestination)]);
    }

    #[test]
    fn malformed_destination_is_dirty() {
        let dir = tree(&[("a.md", "[bad](a%zz.md)\n")]);
        let (dirty, findings) = run(dir.path());
        assert!(dirty);
        assert!(matches!(findings[0].kind, FindingKind::MalformedDestination { .. }));
    }

    #[test]
    fn reference_links_are_checked_through_definitions() {
        let dir = tree(&[("a.md", "[gone][ref]\n\n[ref]: gone.md\n")]);
        let (dirty, findings) = run(dir.path());
        assert!(dirty);
        assert_eq!(kinds(&findings), vec![("gone.md".to_string(), FindingKind::BrokenLink)]);
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let dir = tree(&[(".git/notes.md", "[gone](gone.md)\n"), ("a.md", "# A\n")]);
        let (dirty, findings) = run(dir.path());
        assert!(!dirty);
        assert!(findings.is_empty());
    }

    #[test]
    fn findings_are_identical_across_runs() {
        let dir = tree(&[("a.md", "[x](x.md) [y](#y)\n"), ("sub/b.md", "[up](../a.md#nope)\n")]);
        assert_eq!(run(dir.path()), run(dir.path()));
    }

    #[test]
    fn missing_input_is_fatal() {
        let config = Config::default();
        let mut validator = Validator::new(&config);
        let mut diagnostics = Diagnostics::default();
        let err = validator
            .check_input(&PathBuf::from("/nonexistent/linkmend"), &mut diagnostics)
            .unwrap_err();
        assert!(matches!(err, Error::InputNotFound { .. }));
    }
}
