//! Shared test fixtures and proptest strategies.

use std::fs;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use crate::repos::VCS_MARKER;
use crate::types::RepoName;

/// Creates `<base>/<name>/.git` and returns the repository path.
pub fn make_repo(base: &Path, name: &str) -> PathBuf {
    let repo = base.join(name);
    fs::create_dir_all(repo.join(VCS_MARKER)).unwrap();
    repo
}

/// Writes an executable `sh` script standing in for an external tool.
#[cfg(unix)]
pub fn write_tool_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// A fake converter that writes `content` to the path following
/// `--output-custom-log`.
#[cfg(unix)]
pub fn fake_converter(dir: &Path, content: &str) -> PathBuf {
    let fixture = dir.join("converter-output.txt");
    fs::write(&fixture, content).unwrap();
    write_tool_script(
        dir,
        "fake-gource",
        &format!(
            "[ \"$1\" = \"--output-custom-log\" ] || exit 64\ncp '{}' \"$2\"",
            fixture.display()
        ),
    )
}

pub fn arb_repo_name() -> impl Strategy<Value = RepoName> {
    "[a-z][a-z0-9_-]{0,11}".prop_map(|s| RepoName::parse(s).unwrap())
}

/// Record lines with timestamps of varying digit counts.
pub fn arb_record_line() -> impl Strategy<Value = String> {
    (
        0u64..20_000_000_000,
        "(/[a-z]{1,6}){1,3}\\.[a-z]{1,3}",
        prop_oneof![Just("A"), Just("M"), Just("D")],
        "[a-z]{0,6}",
    )
        .prop_map(|(ts, path, kind, user)| format!("{}|{}|{}|{}", ts, path, kind, user))
}

/// Log file contents: newline-terminated records, duplicates likely.
pub fn arb_log_content() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![3 => arb_record_line(), 1 => Just("100|/dup.rs|M|x".to_string())],
        0..20,
    )
    .prop_map(|lines| lines.iter().map(|l| format!("{}\n", l)).collect())
}
