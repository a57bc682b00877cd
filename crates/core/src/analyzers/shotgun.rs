//! Shotgun-surgery analyzer — file pairs that change together across
//! distant directories.
//!
//! Runs only when the root is a git repository. Co-change counts are
//! computed over the most recent commits; pairs that cross top-level
//! directory boundaries and co-change past the threshold indicate a
//! feature smeared across the tree.

use super::FileFacts;
use crate::patterns::{MultiPassId, PatternRegistry};
use crate::types::*;
use git2::{Repository, Sort};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// History window. Matches the co-change literature's short horizon.
const COMMIT_WINDOW: usize = 100;

/// Co-change count at which a pair is reported. Tunable; derived from a
/// single empirical source.
const CO_CHANGE_THRESHOLD: usize = 10;

/// Commits touching more files than this are refactors, not features;
/// counting their pairs would flag the whole tree.
const MAX_FILES_PER_COMMIT: usize = 30;

fn top_dir(path: &str) -> &str {
    path.split('/').next().unwrap_or(path)
}

/// Per-commit changed-file lists for the last `COMMIT_WINDOW` commits.
fn recent_changesets(root: &Path) -> Option<Vec<Vec<String>>> {
    let repo = Repository::open(root).ok()?;
    let mut revwalk = repo.revwalk().ok()?;
    revwalk.push_head().ok()?;
    revwalk.set_sorting(Sort::TIME).ok()?;

    let mut changesets = Vec::new();
    for oid in revwalk {
        if changesets.len() >= COMMIT_WINDOW {
            break;
        }
        let oid = match oid {
            Ok(o) => o,
            Err(_) => continue,
        };
        let commit = match repo.find_commit(oid) {
            Ok(c) => c,
            Err(_) => continue,
        };
        let tree = match commit.tree() {
            Ok(t) => t,
            Err(_) => continue,
        };
        let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());
        let diff = match repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None) {
            Ok(d) => d,
            Err(_) => continue,
        };

        let mut files = Vec::new();
        diff.foreach(
            &mut |delta, _| {
                if let Some(path) = delta.new_file().path().and_then(|p| p.to_str()) {
                    files.push(path.to_string());
                }
                true
            },
            None,
            None,
            None,
        )
        .ok();
        files.sort();
        files.dedup();
        changesets.push(files);
    }
    Some(changesets)
}

pub fn analyze(
    root: &Path,
    facts: &BTreeMap<String, FileFacts>,
    registry: &PatternRegistry,
) -> Vec<Finding> {
    let changesets = match recent_changesets(root) {
        Some(c) if !c.is_empty() => c,
        _ => {
            debug!("No git history available; skipping shotgun-surgery analysis");
            return Vec::new();
        }
    };
    let pattern = registry.multi_pass(MultiPassId::ShotgunSurgery);

    let mut pair_counts: HashMap<(String, String), usize> = HashMap::new();
    for files in &changesets {
        if files.len() > MAX_FILES_PER_COMMIT {
            continue;
        }
        for (i, a) in files.iter().enumerate() {
            for b in &files[i + 1..] {
                *pair_counts.entry((a.clone(), b.clone())).or_insert(0) += 1;
            }
        }
    }

    // Materialize into sorted order before emitting (deterministic output).
    let mut pairs: Vec<((String, String), usize)> = pair_counts
        .into_iter()
        .filter(|((a, b), n)| *n >= CO_CHANGE_THRESHOLD && top_dir(a) != top_dir(b))
        .collect();
    pairs.sort();

    let mut findings = Vec::new();
    for ((a, b), count) in pairs {
        // Both files must still exist in the scanned tree; evidence anchors
        // to the first line of the first file.
        let a_facts = match facts.get(&a) {
            Some(f) => f,
            None => continue,
        };
        if !facts.contains_key(&b) {
            continue;
        }
        findings.push(Finding {
            file: a.clone(),
            line_start: 1,
            line_end: 1,
            pattern_id: "shotgun_surgery.pair".to_string(),
            category: pattern.category,
            certainty: pattern.certainty,
            auto_fix: pattern.auto_fix,
            message: format!(
                "{a} and {b} changed together in {count} of the last {COMMIT_WINDOW} commits"
            ),
            evidence: truncate_evidence(&a_facts.first_line),
            related_files: vec![b],
            phase: Phase::MultiPass,
        });
    }
    findings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_dir() {
        assert_eq!(top_dir("src/a.rs"), "src");
        assert_eq!(top_dir("web/ui/form.ts"), "web");
        assert_eq!(top_dir("README.md"), "README.md");
    }

    #[test]
    fn test_no_git_history_is_silent() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = PatternRegistry::builtin().unwrap();
        let facts = BTreeMap::new();
        let findings = analyze(tmp.path(), &facts, &registry);
        assert!(findings.is_empty());
    }
}
