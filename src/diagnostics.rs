use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// How a finding affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Makes the run dirty.
    Error,
    /// Informational; something was changed or skipped.
    Notice,
    /// Advisory; never makes the run dirty.
    Warning,
}

/// What was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    /// The target path does not exist in an acceptable form.
    BrokenLink,
    /// The fragment names no anchor of the referencing document.
    BrokenLocalFragment,
    /// The fragment names no anchor of the target document.
    BrokenRemoteFragment,
    /// `[text]()` or `![alt]()`.
    EmptyDestination,
    /// The destination could not be parsed.
    MalformedDestination {
        /// Parser message.
        reason: String,
    },
    /// The reconciler could not express the new target relative to the document.
    NoRelativePath {
        /// New location of the link target.
        target: PathBuf,
    },
    /// The reconciler rewrote a destination.
    Replaced {
        /// The destination written in its place.
        replacement: String,
    },
    /// The document's content hash is not in the old snapshot.
    UnknownFormerPath {
        /// Content hash of the document.
        hash: String,
    },
    /// A repair was found but the destination is not written as plain
    /// `(dest)` text, because of a title or angle brackets.
    UnpatchableDestination,
    /// The document disappeared between snapshot and processing.
    UnreadableDocument {
        /// Underlying error text.
        reason: String,
    },
    /// The fragment targets an auto-suffixed duplicate anchor.
    UnstableAnchor,
}

/// One finding, tied to the document it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Raw destination text, empty when not tied to one.
    pub destination: String,
    /// Document the finding belongs to.
    pub file: PathBuf,
    /// What was found.
    pub kind: FindingKind,
}

impl Finding {
    /// Severity implied by the kind.
    pub const fn severity(&self) -> Severity {
        return match self.kind {
            FindingKind::BrokenLink
            | FindingKind::BrokenLocalFragment
            | FindingKind::BrokenRemoteFragment
            | FindingKind::MalformedDestination { .. } => Severity::Error,
            FindingKind::EmptyDestination | FindingKind::UnstableAnchor => Severity::Warning,
            FindingKind::NoRelativePath { .. }
            | FindingKind::Replaced { .. }
            | FindingKind::UnknownFormerPath { .. }
            | FindingKind::UnpatchableDestination
            | FindingKind::UnreadableDocument { .. } => Severity::Notice,
        };
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.display();
        let dst = &self.destination;
        return match &self.kind {
            FindingKind::BrokenLink => write!(f, "{file}: {dst:?}: broken link"),
            FindingKind::BrokenLocalFragment => {
                write!(f, "{file}: {dst:?}: broken link (fragment points to non-existent local id)")
            },
            FindingKind::BrokenRemoteFragment => {
                write!(f, "{file}: {dst:?}: broken link (fragment points to non-existent id)")
            },
            FindingKind::EmptyDestination => write!(f, "{file}: empty url"),
            FindingKind::MalformedDestination { reason } => write!(f, "{file}: {dst:?}: {reason}"),
            FindingKind::NoRelativePath { target } => {
                write!(f, "{file}: {dst:?}: cannot express {} relative to the document", target.display())
            },
            FindingKind::Replaced { replacement } => {
                write!(f, "{file}: broken link replacement: {dst:?} -> {replacement:?}")
            },
            FindingKind::UnknownFormerPath { hash } => {
                write!(f, "cannot figure out old name for {file} ({hash}), skipping")
            },
            FindingKind::UnpatchableDestination => {
                write!(f, "{file}: {dst:?}: cannot patch non-plain inline destination, skipping")
            },
            FindingKind::UnreadableDocument { reason } => {
                write!(f, "{file}: cannot read document, skipping: {reason}")
            },
            FindingKind::UnstableAnchor => write!(
                f,
                "{file}: {dst:?}: unstable slug reference, may become incorrect on unrelated header changes"
            ),
        };
    }
}

/// Append-only collector handed to every check and reconcile call.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// Findings in the order they were reported.
    findings: Vec<Finding>,
}

impl Diagnostics {
    /// All findings so far.
    pub fn findings(&self) -> &[Finding] {
        return &self.findings;
    }

    /// Whether any finding makes the run dirty.
    pub fn is_dirty(&self) -> bool {
        return self.findings.iter().any(|f| return f.severity() == Severity::Error);
    }

    /// Record a finding.
    pub fn report(&mut self, file: &Path, destination: &str, kind: FindingKind) {
        self.findings.push(Finding {
            destination: destination.to_string(),
            file: file.to_path_buf(),
            kind,
        });
        return;
    }
}

/// One line of the JSON report.
#[derive(Serialize)]
struct ReportEntry<'a> {
    /// Raw destination text.
    destination: &'a str,
    /// Document path.
    file: &'a Path,
    /// Human-readable message, same as the text output.
    message: String,
    /// Severity class.
    severity: Severity,
}

/// Print findings to stderr, one line each.
pub fn print_findings(diagnostics: &Diagnostics) {
    for finding in diagnostics.findings() {
        eprintln!("{finding}");
    }
    return;
}

/// Render findings as a pretty JSON array.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
pub fn render_json(diagnostics: &Diagnostics) -> Result<String, Error> {
    let entries: Vec<ReportEntry<'_>> = diagnostics
        .findings()
        .iter()
        .map(|f| {
            return ReportEntry {
                destination: &f.destination,
                file: &f.file,
                message: f.to_string(),
                severity: f.severity(),
            };
        })
        .collect();
    return Ok(serde_json::to_string_pretty(&entries)?);
}

/// Render an error as markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
    return;
}

/// Render a run-fatal error as a markdown diagnostic: what happened and,
/// where there is one, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::EmptyRoot => "\
# Error: No Directory

The directory to scan is empty.

## Fix

Pass a directory with `--dir`, or omit it to use the current directory.
"
        .to_string(),

        Error::InputNotFound { path, source } => format!("\
# Error: Input Not Found

`{}` cannot be read: {source}
", path.display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),

        Error::Json(e) => format!("\
# Error: JSON Serialization

{e}
"),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::StateCorrupt { path, line, reason } => format!("\
# Error: State File Corrupt

`{}` line {line}: {reason}

## Fix

Delete the state file and run `linkmend mend` again to record a fresh
snapshot before moving files.
", path.display()),

        Error::TomlDe(e) => format!("\
# Error: Invalid .linkmend.toml

{e}
"),

        Error::Walk(e) => format!("\
# Error: Directory Walk

{e}
"),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(kind: FindingKind) -> Finding {
        return Finding {
            destination: "b.md#x".to_string(),
            file: PathBuf::from("docs/a.md"),
            kind,
        };
    }

    #[test]
    fn messages_follow_the_taxonomy() {
        assert_eq!(finding(FindingKind::BrokenLink).to_string(), "docs/a.md: \"b.md#x\": broken link");
        assert_eq!(
            finding(FindingKind::BrokenRemoteFragment).to_string(),
            "docs/a.md: \"b.md#x\": broken link (fragment points to non-existent id)"
        );
        assert_eq!(finding(FindingKind::EmptyDestination).to_string(), "docs/a.md: empty url");
    }

    #[test]
    fn only_errors_make_a_run_dirty() {
        let mut diagnostics = Diagnostics::default();
        let file = Path::new("a.md");
        diagnostics.report(file, "", FindingKind::EmptyDestination);
        diagnostics.report(file, "#a-1", FindingKind::UnstableAnchor);
        diagnostics.report(file, "x", FindingKind::Replaced { replacement: "y".to_string() });
        assert!(!diagnostics.is_dirty());

        diagnostics.report(file, "gone.md", FindingKind::BrokenLink);
        assert!(diagnostics.is_dirty());
        assert_eq!(diagnostics.findings().len(), 4);
    }

    #[test]
    fn json_report_carries_severity_and_message() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.report(Path::new("a.md"), "gone.md", FindingKind::BrokenLink);
        let json: serde_json::Value = serde_json::from_str(&render_json(&diagnostics).unwrap()).unwrap();
        assert_eq!(json[0]["severity"], "error");
        assert_eq!(json[0]["file"], "a.md");
        assert_eq!(json[0]["message"], "a.md: \"gone.md\": broken link");
    }

    #[test]
    fn state_corruption_suggests_a_fix() {
        let e = Error::StateCorrupt {
            line: 3,
            path: PathBuf::from(".links.state"),
            reason: "invalid line".to_string(),
        };
        let md = render_error(&e);
        assert!(md.starts_with("# Error: State File Corrupt"));
        assert!(md.contains("## Fix"));
    }
}
