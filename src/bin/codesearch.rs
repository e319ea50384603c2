//! Search a codebase for a word.
//!
//! Run with: `codesearch <word> <directory>`

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gource_logs::search::search_codebase;

/// Report every code file containing a word
#[derive(Parser)]
#[command(name = "codesearch")]
#[command(about = "Search a codebase for a word", long_about = None)]
#[command(version)]
struct Cli {
    /// Word to search for (plain substring, case-sensitive)
    word: String,

    /// Root directory of the codebase
    #[arg(default_value = ".")]
    directory: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if !cli.directory.is_dir() {
        eprintln!("Not a directory: {}", cli.directory.display());
        return ExitCode::FAILURE;
    }

    let stats = search_codebase(&cli.directory, &cli.word, |hit| {
        println!("{}", hit.report(&cli.word));
    });

    eprintln!(
        "{} file(s) scanned, {} match(es), {} unreadable",
        stats.files_scanned, stats.matches, stats.unreadable
    );
    ExitCode::SUCCESS
}
