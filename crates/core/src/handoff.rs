//! Handoff Formatter — compact, machine-consumable report.
//!
//! One header line with the summary counts, then certainty blocks
//! (CRITICAL first) with one tab-delimited record per finding. Field order
//! is stable; downstream fix automation splits on tabs and trusts it.

use crate::types::*;

/// Messages are hard-capped so records stay single-line and cheap.
const MESSAGE_CAP: usize = 80;

fn cap_message(message: &str) -> String {
    let message = message.replace(['\t', '\n'], " ");
    if message.chars().count() <= MESSAGE_CAP {
        return message;
    }
    let mut out: String = message.chars().take(MESSAGE_CAP - 1).collect();
    out.push('…');
    out
}

/// Render the handoff block. `include_evidence` appends an indented
/// evidence line under each record.
pub fn format_handoff(report: &Report, include_evidence: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# slopscope-handoff v1 total={} critical={} high={} medium={} low={} thoroughness={} duration_ms={}\n",
        report.total,
        report.count_at(Certainty::Critical),
        report.count_at(Certainty::High),
        report.count_at(Certainty::Medium),
        report.count_at(Certainty::Low),
        report.thoroughness.as_str(),
        report.duration_ms,
    ));
    out.push_str("# categories");
    for (category, count) in &report.by_category {
        out.push_str(&format!(" {category}={count}"));
    }
    out.push('\n');

    for certainty in Certainty::ranked() {
        let block: Vec<&Finding> =
            report.findings.iter().filter(|f| f.certainty == certainty).collect();
        if block.is_empty() {
            continue;
        }
        out.push_str(&format!("== {} ({})\n", certainty.as_str(), block.len()));
        for f in block {
            out.push_str(&format!(
                "{}:{}\t{}\t{}\t{}\t{}\n",
                f.file,
                f.line_start,
                f.pattern_id,
                f.certainty.as_str(),
                f.auto_fix.as_str(),
                cap_message(&f.message),
            ));
            if include_evidence && !f.evidence.is_empty() {
                out.push_str(&format!("\t> {}\n", f.evidence));
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
                evidence: "ghp_xxxx".into(),
                related_files: Vec::new(),
                phase: Phase::Regex,
            },
            Finding {
                file: "src/b.py".into(),
                line_start: 3,
                line_end: 3,
                pattern_id: "dead_code.py".into(),
                category: Category::CodeSmell,
                certainty: Certainty::High,
                auto_fix: AutoFix::Flag,
                message: "unreachable statement in f".into(),
                evidence: "print(\"unreachable\")".into(),
                related_files: Vec::new(),
                phase: Phase::MultiPass,
            },
        ];
        Report::new(findings, Thoroughness::Normal, 12, 2)
    }

    #[test]
    fn test_header_carries_counts() {
        let text = format_handoff(&sample_report(), false);
        let header = text.lines().next().unwrap();
        assert!(header.contains("total=2"));
        assert!(header.contains("critical=1"));
        assert!(header.contains("high=1"));
        assert!(header.contains("thoroughness=normal"));
    }

    #[test]
    fn test_blocks_critical_first() {
        let text = format_handoff(&sample_report(), false);
        let crit = text.find("== CRITICAL (1)").unwrap();
        let high = text.find("== HIGH (1)").unwrap();
        assert!(crit < high);
    }

    #[test]
    fn test_record_field_order() {
        let text = format_handoff(&sample_report(), false);
        let record = text.lines().find(|l| l.starts_with("src/a.js:5")).unwrap();
        let fields: Vec<&str> = record.split('\t').collect();
        assert_eq!(fields, vec![
            "src/a.js:5",
            "secret.github_pat",
            "CRITICAL",
            "flag",
            "GitHub personal access token in source",
        ]);
    }

    #[test]
    fn test_evidence_only_when_requested() {
        let without = format_handoff(&sample_report(), false);
        assert!(!without.contains("ghp_xxxx"));
        let with = format_handoff(&sample_report(), true);
        assert!(with.contains("\t> ghp_xxxx"));
    }

    #[test]
    fn test_message_capped_at_80() {
        let mut report = sample_report();
        report.findings[0].message = "m".repeat(300);
        let text = format_handoff(&report, false);
        let record = text.lines().find(|l| l.starts_with("src/a.js:5")).unwrap();
        let message = record.split('\t').last().unwrap();
        assert!(message.chars().count() <= 80);
    }

    #[test]
    fn test_empty_report() {
        let report = Report::new(Vec::new(), Thoroughness::Quick, 1, 0);
        let text = format_handoff(&report, false);
        assert!(text.starts_with("# slopscope-handoff v1 total=0"));
        assert!(!text.contains("=="));
    }
}
