//! Finding Merger — deduplication, cross-phase subsumption, ranking, and
//! auto-fix qualification.
//!
//! Pure over its input: same findings in, same ordered list out, no side
//! effects. Workers hand findings over a channel; this module only ever
//! sees the collected buffer.

use crate::types::*;
use std::collections::{HashMap, HashSet};

/// Lines within this distance of a Phase-1 finding of the same category
/// are subsumed by it.
const SUBSUME_WINDOW: usize = 2;

/// Produce the final ordered finding list.
pub fn merge(mut findings: Vec<Finding>) -> Vec<Finding> {
    // Earlier phases win dedup ties; make phase order explicit first,
    // keeping intra-phase arrival order (stable sort).
    findings.sort_by_key(|f| f.phase);

    // 1. Deduplicate on (pattern_id, file, line_start); first wins.
    let mut seen: HashSet<(String, String, usize)> = HashSet::new();
    let mut deduped: Vec<Finding> = Vec::with_capacity(findings.len());
    for f in findings {
        if seen.insert((f.pattern_id.clone(), f.file.clone(), f.line_start)) {
            deduped.push(f);
        }
    }

    // 2. Cross-phase subsumption: a Phase-1 finding absorbs Phase-2/3
    //    findings of the same category within ±2 lines in the same file.
    let mut phase1_lines: HashMap<(String, Category), Vec<usize>> = HashMap::new();
    for f in deduped.iter().filter(|f| f.phase == Phase::Regex) {
        phase1_lines.entry((f.file.clone(), f.category)).or_default().push(f.line_start);
    }
    deduped.retain(|f| {
        if f.phase == Phase::Regex {
            return true;
        }
        match phase1_lines.get(&(f.file.clone(), f.category)) {
            Some(lines) => !lines
                .iter()
                .any(|&l| l.abs_diff(f.line_start) <= SUBSUME_WINDOW),
            None => true,
        }
    });

    // 3. Rank: certainty desc, category asc (run notices last within their
    //    grade), file asc, line asc. Stable, so equal keys keep arrival
    //    order.
    deduped.sort_by(|a, b| {
        b.certainty
            .cmp(&a.certainty)
            .then_with(|| a.category.sort_key().cmp(&b.category.sort_key()))
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line_start.cmp(&b.line_start))
    });

    // 4. Auto-fix qualification: `remove` needs HIGH or better.
    deduped
        .into_iter()
        .map(|f| {
            if f.auto_fix == AutoFix::Remove && f.certainty < Certainty::High {
                Finding { auto_fix: AutoFix::Flag, ..f }
            } else {
                f
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(
        file: &str,
        line: usize,
        pattern: &str,
        category: Category,
        certainty: Certainty,
        auto_fix: AutoFix,
        phase: Phase,
    ) -> Finding {
        Finding {
            file: file.to_string(),
            line_start: line,
            line_end: line,
            pattern_id: pattern.to_string(),
            category,
            certainty,
            auto_fix,
            message: String::new(),
            evidence: String::new(),
            related_files: Vec::new(),
            phase,
        }
    }

    #[test]
    fn test_dedup_same_pattern_file_line() {
        let merged = merge(vec![
            finding("a.rs", 5, "p", Category::Placeholder, Certainty::High, AutoFix::Flag, Phase::Regex),
            finding("a.rs", 5, "p", Category::Placeholder, Certainty::Medium, AutoFix::Flag, Phase::MultiPass),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].certainty, Certainty::High);
    }

    #[test]
    fn test_different_pattern_ids_both_kept() {
        // Open-question resolution: dedup keys on pattern_id, so two
        // patterns coinciding on one line both survive.
        let merged = merge(vec![
            finding("a.rs", 5, "p1", Category::Secret, Certainty::Critical, AutoFix::Flag, Phase::Regex),
            finding("a.rs", 5, "p2", Category::Verbosity, Certainty::Medium, AutoFix::Flag, Phase::MultiPass),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_phase1_subsumes_nearby_same_category() {
        let merged = merge(vec![
            finding("a.py", 10, "placeholder.not_implemented_py", Category::Placeholder, Certainty::High, AutoFix::Flag, Phase::Regex),
            finding("a.py", 11, "stub_function", Category::Placeholder, Certainty::High, AutoFix::Flag, Phase::MultiPass),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].pattern_id, "placeholder.not_implemented_py");
    }

    #[test]
    fn test_subsumption_respects_window() {
        let merged = merge(vec![
            finding("a.py", 10, "placeholder.not_implemented_py", Category::Placeholder, Certainty::High, AutoFix::Flag, Phase::Regex),
            finding("a.py", 13, "stub_function", Category::Placeholder, Certainty::High, AutoFix::Flag, Phase::MultiPass),
        ]);
        assert_eq!(merged.len(), 2, "three lines apart is outside the window");
    }

    #[test]
    fn test_subsumption_requires_same_category() {
        let merged = merge(vec![
            finding("a.py", 10, "p1", Category::Secret, Certainty::Critical, AutoFix::Flag, Phase::Regex),
            finding("a.py", 11, "p2", Category::Placeholder, Certainty::High, AutoFix::Flag, Phase::MultiPass),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_ranking_order() {
        let merged = merge(vec![
            finding("z.rs", 1, "low", Category::Style, Certainty::Low, AutoFix::None, Phase::MultiPass),
            finding("a.rs", 9, "med", Category::Verbosity, Certainty::Medium, AutoFix::Flag, Phase::MultiPass),
            finding("a.rs", 2, "crit", Category::Secret, Certainty::Critical, AutoFix::Flag, Phase::Regex),
            finding("b.rs", 1, "high", Category::Placeholder, Certainty::High, AutoFix::Flag, Phase::Regex),
        ]);
        let order: Vec<&str> = merged.iter().map(|f| f.pattern_id.as_str()).collect();
        assert_eq!(order, vec!["crit", "high", "med", "low"]);
    }

    #[test]
    fn test_ranking_within_certainty() {
        let merged = merge(vec![
            finding("b.rs", 1, "p", Category::Verbosity, Certainty::Medium, AutoFix::Flag, Phase::MultiPass),
            finding("a.rs", 5, "p", Category::Verbosity, Certainty::Medium, AutoFix::Flag, Phase::MultiPass),
            finding("a.rs", 2, "p", Category::Verbosity, Certainty::Medium, AutoFix::Flag, Phase::MultiPass),
            finding("a.rs", 1, "q", Category::CodeSmell, Certainty::Medium, AutoFix::Flag, Phase::MultiPass),
        ]);
        let keys: Vec<(&str, usize)> =
            merged.iter().map(|f| (f.file.as_str(), f.line_start)).collect();
        // code-smell < verbosity lexicographically.
        assert_eq!(keys, vec![("a.rs", 1), ("a.rs", 2), ("a.rs", 5), ("b.rs", 1)]);
    }

    #[test]
    fn test_notices_sort_last_within_grade() {
        let merged = merge(vec![
            finding("a.rs", 1, "scanner.unreadable", Category::Other, Certainty::Low, AutoFix::None, Phase::Regex),
            finding("z.rs", 1, "style.commented_code", Category::Style, Certainty::Low, AutoFix::Flag, Phase::MultiPass),
        ]);
        assert_eq!(merged[0].pattern_id, "style.commented_code");
        assert_eq!(merged[1].pattern_id, "scanner.unreadable");
    }

    #[test]
    fn test_remove_downgraded_below_high() {
        let merged = merge(vec![finding(
            "a.go", 10, "phantom_reference.issue",
            Category::PhantomReference, Certainty::Medium, AutoFix::Remove, Phase::MultiPass,
        )]);
        assert_eq!(merged[0].auto_fix, AutoFix::Flag);
    }

    #[test]
    fn test_remove_kept_at_high() {
        let merged = merge(vec![finding(
            "a.go", 10, "custom.remove_rule",
            Category::PhantomReference, Certainty::High, AutoFix::Remove, Phase::Regex,
        )]);
        assert_eq!(merged[0].auto_fix, AutoFix::Remove);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let input = vec![
            finding("b.rs", 3, "p1", Category::Secret, Certainty::Critical, AutoFix::Flag, Phase::Regex),
            finding("a.rs", 7, "p2", Category::Style, Certainty::Low, AutoFix::Flag, Phase::MultiPass),
            finding("a.rs", 1, "p3", Category::Verbosity, Certainty::Medium, AutoFix::Flag, Phase::MultiPass),
        ];
        let once = merge(input);
        let twice = merge(once.clone());
        let keys_once: Vec<_> =
            once.iter().map(|f| (f.pattern_id.clone(), f.file.clone(), f.line_start)).collect();
        let keys_twice: Vec<_> =
            twice.iter().map(|f| (f.pattern_id.clone(), f.file.clone(), f.line_start)).collect();
        assert_eq!(keys_once, keys_twice);
    }
}
