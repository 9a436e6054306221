//! CLI command drivers: check and mend.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::Config;
use crate::diagnostics::{self, Diagnostics};
use crate::error::Error;
use crate::hasher;
use crate::reconciler;
use crate::snapshot::{self, Loaded};
use crate::validator::Validator;

/// How `check` reports findings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// A JSON array on stdout.
    Json,
    /// One line per finding on stderr.
    #[default]
    Text,
}

/// Validate links in every input, then report all findings.
/// Exit code 1 if any finding is an error, 0 otherwise.
///
/// # Errors
///
/// Returns run-fatal errors: an unreadable input, config, or document, or a
/// failed directory walk.
pub fn check(paths: &[PathBuf], format: Format) -> Result<ExitCode, Error> {
    let config = Config::load(Path::new("."))?;
    let mut validator = Validator::new(&config);
    let mut diagnostics = Diagnostics::default();

    let mut dirty = false;
    for path in paths {
        dirty |= validator.check_input(path, &mut diagnostics)?;
    }

    match format {
        Format::Json => println!("{}", diagnostics::render_json(&diagnostics)?),
        Format::Text => diagnostics::print_findings(&diagnostics),
    }

    if dirty || diagnostics.is_dirty() {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Record a snapshot on the first run; on later runs repair links broken by
/// moves since the recorded snapshot, then record the new state.
///
/// # Errors
///
/// Returns `Error::StateCorrupt` for a malformed state file, and I/O, walk,
/// or parse errors from snapshotting and patching.
pub fn mend(state: &Path, dir: &Path) -> Result<(), Error> {
    let old = match snapshot::read(state)? {
        Loaded::Missing => {
            eprintln!("state file {} not found, building one", state.display());
            let records = hasher::build_snapshot(dir)?;
            snapshot::write(state, &records)?;
            eprintln!("state saved, move some files around and then run again with the same arguments");
            return Ok(());
        },
        Loaded::Snapshot(records) => records,
    };

    let config = Config::load(Path::new("."))?;
    let new = hasher::build_snapshot(dir)?;
    let mut diagnostics = Diagnostics::default();
    let updated = reconciler::reconcile(dir, &config, &old, &new, &mut diagnostics)?;
    diagnostics::print_findings(&diagnostics);

    if !updated {
        return Ok(());
    }

    // Patched documents have new hashes.
    let rebuilt = hasher::build_snapshot(dir)?;
    snapshot::write(state, &rebuilt)?;
    eprintln!("state updated; run again with the same arguments after moving files without modifying them");
    return Ok(());
}
