//! Plain substring search over a source tree.
//!
//! Walks a directory recursively, skipping `node_modules`, and reports every
//! file with a code extension whose UTF-8 content contains the search word.
//! Unreadable files are reported and the walk continues.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// File name suffixes that count as code.
pub const CODE_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".html", ".css", ".cpp", ".java", ".ts", ".rb", ".go", ".php", ".sh", ".swift",
    ".m", ".kt", ".dart", ".r", ".h", ".c", ".lua", ".scala", ".vb", ".pl", ".sql", ".json",
    ".yaml", ".xml", ".ini", ".md", ".yml", ".xaml",
];

/// Directory names never descended into.
pub const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// One result of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchHit {
    /// The file contains the word.
    Found(PathBuf),

    /// The file could not be read as UTF-8 text.
    Unreadable { path: PathBuf, error: String },
}

impl SearchHit {
    /// Formats the hit as a report line for `word`.
    pub fn report<'a>(&'a self, word: &'a str) -> impl fmt::Display + 'a {
        HitReport { hit: self, word }
    }
}

struct HitReport<'a> {
    hit: &'a SearchHit,
    word: &'a str,
}

impl fmt::Display for HitReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hit {
            SearchHit::Found(path) => write!(f, "Found '{}' in {}", self.word, path.display()),
            SearchHit::Unreadable { path, error } => {
                write!(f, "Error reading {}: {}", path.display(), error)
            }
        }
    }
}

/// Totals of a finished search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub files_scanned: usize,
    pub matches: usize,
    pub unreadable: usize,
}

pub fn is_code_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| CODE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
}

/// Searches `root` for `word`, calling `on_hit` as results are found.
///
/// Entries the walk cannot list (permission errors, vanished files) are
/// skipped silently.
pub fn search_codebase(root: &Path, word: &str, mut on_hit: impl FnMut(SearchHit)) -> SearchStats {
    let mut stats = SearchStats::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && SKIPPED_DIRS.iter().any(|d| e.file_name() == std::ffi::OsStr::new(d)))
        });

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() || !is_code_file(entry.path()) {
            continue;
        }
        stats.files_scanned += 1;

        match fs::read_to_string(entry.path()) {
            Ok(content) if content.contains(word) => {
                stats.matches += 1;
                on_hit(SearchHit::Found(entry.into_path()));
            }
            Ok(_) => {}
            Err(e) => {
                stats.unreadable += 1;
                on_hit(SearchHit::Unreadable {
                    path: entry.into_path(),
                    error: e.to_string(),
                });
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn collect(root: &Path, word: &str) -> (Vec<SearchHit>, SearchStats) {
        let mut hits = Vec::new();
        let stats = search_codebase(root, word, |hit| hits.push(hit));
        hits.sort_by_key(|h| match h {
            SearchHit::Found(p) => p.clone(),
            SearchHit::Unreadable { path, .. } => path.clone(),
        });
        (hits, stats)
    }

    #[test]
    fn finds_word_in_code_files_only() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/app.py"), "def combine_logs(): pass").unwrap();
        fs::write(dir.path().join("src/other.js"), "nothing here").unwrap();
        fs::write(dir.path().join("notes.txt"), "combine_logs").unwrap();

        let (hits, stats) = collect(dir.path(), "combine_logs");

        assert_eq!(hits, vec![SearchHit::Found(dir.path().join("src/app.py"))]);
        assert_eq!(stats.files_scanned, 2);
        assert_eq!(stats.matches, 1);
    }

    #[test]
    fn skips_node_modules() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "needle").unwrap();
        fs::write(dir.path().join("main.js"), "needle").unwrap();

        let (hits, _) = collect(dir.path(), "needle");
        assert_eq!(hits, vec![SearchHit::Found(dir.path().join("main.js"))]);
    }

    #[test]
    fn invalid_utf8_is_reported_and_walk_continues() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.c"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join("b.c"), "needle").unwrap();

        let (hits, stats) = collect(dir.path(), "needle");

        assert_eq!(stats.unreadable, 1);
        assert_eq!(stats.matches, 1);
        assert!(matches!(&hits[0], SearchHit::Unreadable { path, .. } if path.ends_with("a.c")));
        assert_eq!(hits[1], SearchHit::Found(dir.path().join("b.c")));
    }

    #[test]
    fn code_file_matching_is_suffix_based() {
        assert!(is_code_file(Path::new("x/main.py")));
        assert!(is_code_file(Path::new("config.yml")));
        assert!(is_code_file(Path::new("types.d.ts")));
        assert!(!is_code_file(Path::new("README")));
        assert!(!is_code_file(Path::new("image.png")));
        assert!(!is_code_file(Path::new("Main.PY")));
    }

    #[test]
    fn report_lines() {
        let found = SearchHit::Found(PathBuf::from("/src/a.py"));
        assert_eq!(found.report("foo").to_string(), "Found 'foo' in /src/a.py");

        let err = SearchHit::Unreadable {
            path: PathBuf::from("/src/b.py"),
            error: "bad data".to_string(),
        };
        assert_eq!(err.report("foo").to_string(), "Error reading /src/b.py: bad data");
    }
}
