//! Git invocations for repository management.

use std::path::Path;

use crate::process::ToolCommand;

/// Creates a git command with a clean environment.
///
/// System and global config are ignored and terminal prompts are disabled,
/// so a clone of a private URL fails fast instead of hanging on a password
/// prompt.
pub fn git_command(workdir: &Path) -> ToolCommand {
    ToolCommand::new("git")
        .current_dir(workdir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_TERMINAL_PROMPT", "0")
}

/// `git clone -- <url> <dest>`, run from `workdir`.
pub fn clone_command(workdir: &Path, url: &str, dest: &Path) -> ToolCommand {
    git_command(workdir)
        .args(["clone", "--"])
        .arg(url)
        .arg(dest)
}
