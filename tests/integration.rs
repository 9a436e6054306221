use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn linkmend_in(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_linkmend"));
    cmd.current_dir(dir);
    return cmd;
}

fn fixture(name: &str) -> Command {
    return linkmend_in(&Path::new("tests/fixtures").join(name));
}

fn stderr(output: &Output) -> String {
    return String::from_utf8_lossy(&output.stderr).into_owned();
}

fn workspace(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::Builder::new().prefix("linkmend").tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    return dir;
}

#[test]
fn clean_tree_passes() {
    let output = fixture("clean").args(["check", "."]).output().unwrap();
    assert!(output.status.success(), "check failed: {}", stderr(&output));
    assert!(stderr(&output).is_empty());
}

#[test]
fn broken_tree_reports_every_finding() {
    let output = fixture("broken").args(["check", "index.md"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let err = stderr(&output);
    assert!(err.contains("index.md: \"nowhere.md\": broken link"), "{err}");
    assert!(err.contains("\"#no-such-heading\": broken link"), "{err}");
    assert!(err.contains("\"other.md#gone\": broken link (fragment points to non-existent id)"), "{err}");
    assert!(err.contains("\"#index-1\": unstable slug reference"), "{err}");
}

#[test]
fn json_report_goes_to_stdout() {
    let output = fixture("broken").args(["check", "--format", "json", "."]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = report.as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["destination"], "nowhere.md");
    assert_eq!(entries[0]["severity"], "error");
    assert_eq!(entries[3]["severity"], "warning");
}

#[test]
fn config_filters_traversal_and_advisories() {
    let output = fixture("configured").args(["check", "."]).output().unwrap();
    assert!(output.status.success(), "check failed: {}", stderr(&output));
    assert!(stderr(&output).is_empty());

    // Explicit inputs are always checked.
    let output = fixture("configured").args(["check", "archive/old.md"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_input_is_fatal() {
    let output = fixture("clean").args(["check", "no-such-file.md"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Input Not Found"));
}

#[test]
fn mend_repairs_links_after_a_move() {
    let dir = workspace(&[
        ("index.md", "Read [the guide](docs/guide.md#setup) first.\n"),
        ("docs/guide.md", "# Guide\n\n## Setup\n\nSee [the index](../index.md).\n"),
    ]);

    let first = linkmend_in(dir.path()).args(["mend", "--state", ".links"]).output().unwrap();
    assert!(first.status.success(), "first mend failed: {}", stderr(&first));
    assert!(dir.path().join(".links").exists());
    assert!(stderr(&first).contains("state saved"));

    fs::create_dir_all(dir.path().join("manual")).unwrap();
    fs::rename(dir.path().join("docs/guide.md"), dir.path().join("manual/start.md")).unwrap();

    let broken = linkmend_in(dir.path()).args(["check", "."]).output().unwrap();
    assert_eq!(broken.status.code(), Some(1));

    let second = linkmend_in(dir.path()).args(["mend", "--state", ".links"]).output().unwrap();
    assert!(second.status.success(), "second mend failed: {}", stderr(&second));
    assert!(stderr(&second).contains("state updated"));
    assert_eq!(
        fs::read_to_string(dir.path().join("index.md")).unwrap(),
        "Read [the guide](manual/start.md#setup) first.\n"
    );

    let check = linkmend_in(dir.path()).args(["check", "."]).output().unwrap();
    assert!(check.status.success(), "check after mend failed: {}", stderr(&check));

    let state = fs::read_to_string(dir.path().join(".links")).unwrap();
    assert!(state.contains("  manual/start.md\n"));
    assert!(!state.contains("docs/guide.md"));
}

#[test]
fn mend_without_moves_leaves_state_untouched() {
    let dir = workspace(&[("a.md", "[b](b.md)\n"), ("b.md", "B\n")]);
    let state = dir.path().join(".links");

    linkmend_in(dir.path()).args(["mend", "--state", ".links"]).output().unwrap();
    let before = fs::read_to_string(&state).unwrap();

    let again = linkmend_in(dir.path()).args(["mend", "--state", ".links"]).output().unwrap();
    assert!(again.status.success());
    assert!(!stderr(&again).contains("replacement"));
    assert_eq!(fs::read_to_string(&state).unwrap(), before);
}

#[test]
fn corrupt_state_is_fatal() {
    let dir = workspace(&[("a.md", "A\n"), (".links", "not-a-record\n")]);
    let output = linkmend_in(dir.path()).args(["mend", "--state", ".links"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("State File Corrupt"));
}
