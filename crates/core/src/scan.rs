//! Scanner — deterministic enumeration of candidate files.
//!
//! Breadth-first walk with per-level alphabetical ordering, honoring a
//! root-level `.slopignore` file plus a built-in skip set. Oversize and
//! unreadable paths become informational findings; binary files are skipped
//! silently.

use crate::error::{Result, ScanError};
use crate::types::*;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::collections::VecDeque;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Directory names never descended into, regardless of ignore files.
const BUILTIN_SKIP: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "target",
    "vendor",
    ".venv",
    "__pycache__",
];

/// Name of the root-level ignore file.
pub const IGNORE_FILE: &str = ".slopignore";

pub struct ScanOutcome {
    pub files: Vec<SourceFile>,
    /// Informational findings produced during enumeration (category `other`).
    pub notices: Vec<Finding>,
}

// ---------------------------------------------------------------------------
// Binary detection
// ---------------------------------------------------------------------------

/// A file is binary if its first 8 KiB contain a NUL byte.
fn sniff_binary(path: &Path) -> std::io::Result<bool> {
    let mut file = fs::File::open(path)?;
    let mut buf = [0u8; BINARY_SNIFF_BYTES];
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(buf[..filled].contains(&0))
}

// ---------------------------------------------------------------------------
// Test-fixture paths
// ---------------------------------------------------------------------------

/// Paths under test directories or with test-file naming. Used to mute the
/// oversize notice in fixture trees and to exempt stub-function findings.
pub fn is_test_fixture_path(rel_path: &str) -> bool {
    let lowered = rel_path.to_ascii_lowercase();
    for dir in ["test", "tests", "__tests__"] {
        if lowered.starts_with(&format!("{dir}/")) || lowered.contains(&format!("/{dir}/")) {
            return true;
        }
    }
    let file_name = lowered.rsplit('/').next().unwrap_or(&lowered);
    if file_name.contains(".test.") || file_name.contains(".spec.") {
        return true;
    }
    // `*_test.*`: stem ends with _test
    if let Some((stem, _ext)) = file_name.rsplit_once('.') {
        if stem.ends_with("_test") {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

fn notice(rel_path: &str, pattern_id: &str, message: String) -> Finding {
    Finding {
        file: rel_path.to_string(),
        line_start: 1,
        line_end: 1,
        pattern_id: pattern_id.to_string(),
        category: Category::Other,
        certainty: Certainty::Low,
        auto_fix: AutoFix::None,
        message,
        evidence: String::new(),
        related_files: Vec::new(),
        phase: Phase::Regex,
    }
}

// ---------------------------------------------------------------------------
// Ignore matchers
// ---------------------------------------------------------------------------

fn build_ignore_matcher(root: &Path) -> Option<Gitignore> {
    let ignore_path = root.join(IGNORE_FILE);
    if !ignore_path.is_file() {
        return None;
    }
    let mut builder = GitignoreBuilder::new(root);
    if let Some(err) = builder.add(&ignore_path) {
        warn!(error = %err, "Malformed {IGNORE_FILE}; ignoring it");
        return None;
    }
    match builder.build() {
        Ok(gi) => Some(gi),
        Err(err) => {
            warn!(error = %err, "Could not build ignore matcher");
            None
        }
    }
}

/// Include-glob matcher built from run filters. Matching is inverted
/// gitignore semantics: a file is kept when a glob "ignores" it.
fn build_include_matcher(root: &Path, globs: &[String]) -> Option<Gitignore> {
    if globs.is_empty() {
        return None;
    }
    let mut builder = GitignoreBuilder::new(root);
    for glob in globs {
        if let Err(err) = builder.add_line(None, glob) {
            warn!(glob = glob.as_str(), error = %err, "Skipping invalid include glob");
        }
    }
    builder.build().ok()
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// Enumerate candidate files under `root`. Deterministic: breadth-first,
/// alphabetical within each directory.
pub fn scan_root(root: &Path, filters: &Filters) -> Result<ScanOutcome> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    let root = root
        .canonicalize()
        .map_err(|_| ScanError::RootNotFound(root.to_path_buf()))?;

    let ignore_matcher = build_ignore_matcher(&root);
    let include_matcher = build_include_matcher(&root, &filters.paths);

    let mut files = Vec::new();
    let mut notices = Vec::new();
    let mut queue: VecDeque<std::path::PathBuf> = VecDeque::new();
    queue.push_back(root.clone());

    while let Some(dir) = queue.pop_front() {
        let rel_dir = rel_path_of(&root, &dir);
        let entries = match fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(err) => {
                if dir == root {
                    return Err(ScanError::RootNotFound(root.clone()));
                }
                debug!(path = rel_dir.as_str(), error = %err, "Unreadable directory");
                notices.push(notice(
                    &rel_dir,
                    "scanner.unreadable",
                    format!("directory could not be read: {err}"),
                ));
                continue;
            }
        };

        let mut children: Vec<_> = entries.filter_map(|e| e.ok()).collect();
        children.sort_by_key(|e| e.file_name());

        for entry in children {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(_) => continue,
            };
            let is_dir = file_type.is_dir();
            let rel = rel_path_of(&root, &path);

            if is_dir {
                if BUILTIN_SKIP.contains(&name.as_ref()) {
                    continue;
                }
                if let Some(gi) = &ignore_matcher {
                    if gi.matched(&path, true).is_ignore() {
                        continue;
                    }
                }
                queue.push_back(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            if let Some(gi) = &ignore_matcher {
                if gi.matched(&path, false).is_ignore() {
                    continue;
                }
            }
            if let Some(inc) = &include_matcher {
                if !inc.matched(&path, false).is_ignore() {
                    continue;
                }
            }

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(err) => {
                    notices.push(notice(
                        &rel,
                        "scanner.unreadable",
                        format!("file metadata unavailable: {err}"),
                    ));
                    continue;
                }
            };
            if size > MAX_FILE_SIZE {
                if !is_test_fixture_path(&rel) {
                    notices.push(notice(
                        &rel,
                        "scanner.oversize",
                        format!("file skipped: {size} bytes exceeds the 2 MiB limit"),
                    ));
                }
                continue;
            }
            match sniff_binary(&path) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => {
                    notices.push(notice(
                        &rel,
                        "scanner.unreadable",
                        format!("file could not be read: {err}"),
                    ));
                    continue;
                }
            }

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_string();
            files.push(SourceFile {
                rel_path: rel,
                abs_path: path,
                language: Language::from_ext(&ext),
                size,
            });
        }
    }

    debug!(files = files.len(), notices = notices.len(), "Scan enumeration complete");
    Ok(ScanOutcome { files, notices })
}

fn rel_path_of(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
