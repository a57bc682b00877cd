//! Report Renderer — the human-readable rendering.
//!
//! Markdown-like plain text grouped by category, with evidence snippets
//! and the pattern's rationale per finding. Deterministic byte-for-byte
//! for a given report and environment; `NO_COLOR` (the only environment
//! variable the core reads) disables the ANSI section headers.

use crate::types::*;
use std::collections::BTreeMap;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn color_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn heading(text: &str, color: bool) -> String {
    if color {
        format!("{BOLD}{text}{RESET}\n")
    } else {
        format!("{text}\n")
    }
}

/// Render the full human report.
pub fn render_report(report: &Report) -> String {
    let color = color_enabled();
    let mut out = String::new();

    out.push_str(&heading("# Slop Report", color));
    out.push('\n');
    out.push_str(&format!("thoroughness: {}\n", report.thoroughness.as_str()));
    out.push_str(&format!("duration: {} ms\n", report.duration_ms));
    out.push_str(&format!("files scanned: {}\n", report.files_scanned));
    out.push_str(&format!(
        "findings: {} (CRITICAL {}, HIGH {}, MEDIUM {}, LOW {})\n",
        report.total,
        report.count_at(Certainty::Critical),
        report.count_at(Certainty::High),
        report.count_at(Certainty::Medium),
        report.count_at(Certainty::Low),
    ));

    if report.findings.is_empty() {
        out.push_str("\nNo findings.\n");
        return out;
    }

    // Group by category, categories in report order (lexicographic with
    // run notices last) — the merger's sort key guarantees that findings
    // within one category are already certainty-ranked.
    let mut by_category: BTreeMap<(bool, &str), Vec<&Finding>> = BTreeMap::new();
    for f in &report.findings {
        by_category.entry(f.category.sort_key()).or_default().push(f);
    }

    for ((_, category), findings) in by_category {
        out.push('\n');
        out.push_str(&heading(&format!("## {category} ({})", findings.len()), color));
        out.push('\n');
        for f in findings {
            out.push_str(&format!(
                "- {}:{} [{}] {} ({}, auto-fix: {})\n",
                f.file,
                f.line_start,
                f.certainty.as_str(),
                f.message,
                f.pattern_id,
                f.auto_fix.as_str(),
            ));
            if !f.evidence.is_empty() {
                out.push_str(&format!("      {}\n", f.evidence));
            }
            for related in &f.related_files {
                out.push_str(&format!("      with: {related}\n"));
            }
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> Report {
        let findings = vec![
            Finding {
                file: "src/a.js".into(),
                line_start: 5,
                line_end: 5,
                pattern_id: "secret.github_pat".into(),
                category: Category::Secret,
                certainty: Certainty::Critical,
                auto_fix: AutoFix::Flag,
                message: "GitHub personal access token in source".into(),
                evidence: "ghp_aBcDeFg…".into(),
                related_files: Vec::new(),
                phase: Phase::Regex,
            },
            Finding {
                file: "src/web/form.ts".into(),
                line_start: 1,
                line_end: 1,
                pattern_id: "shotgun_surgery.pair".into(),
                category: Category::CodeSmell,
                certainty: Certainty::Medium,
                auto_fix: AutoFix::Flag,
                message: "changed together across directories".into(),
                evidence: "import { api } from '../api';".into(),
                related_files: vec!["server/api.ts".into()],
                phase: Phase::MultiPass,
            },
        ];
        Report::new(findings, Thoroughness::Deep, 30, 14)
    }

    #[test]
    fn test_render_contains_summary_and_sections() {
        let text = render_report(&sample_report());
        assert!(text.contains("# Slop Report"));
        assert!(text.contains("thoroughness: deep"));
        assert!(text.contains("## code-smell (1)"));
        assert!(text.contains("## secret (1)"));
        assert!(text.contains("src/a.js:5 [CRITICAL]"));
    }

    #[test]
    fn test_render_includes_evidence_and_related() {
        let text = render_report(&sample_report());
        assert!(text.contains("ghp_aBcDeFg…"));
        assert!(text.contains("with: server/api.ts"));
    }

    #[test]
    fn test_render_deterministic_for_same_report() {
        let report = sample_report();
        assert_eq!(render_report(&report), render_report(&report));
    }

    #[test]
    fn test_render_empty_report() {
        let report = Report::new(Vec::new(), Thoroughness::Quick, 2, 0);
        let text = render_report(&report);
        assert!(text.contains("No findings."));
    }
}
