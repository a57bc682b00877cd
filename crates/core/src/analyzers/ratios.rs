//! Doc/code and comment/code ratio analyzers.
//!
//! Both work from the shallow function parse. Functions whose body could
//! not be extracted never reach this module.

use super::FileContext;
use crate::patterns::{MultiPassId, PatternRegistry};
use crate::types::*;

/// Flag functions whose preceding documentation block dwarfs the body:
/// `code_lines >= 3` and `doc_lines > 3 * code_lines`.
pub fn doc_code_ratio(ctx: &FileContext, registry: &PatternRegistry) -> Vec<Finding> {
    let pattern = registry.multi_pass(MultiPassId::DocCodeRatio);
    let mut findings = Vec::new();

    for f in ctx.functions {
        if f.code_lines >= 3 && f.doc_lines > 3 * f.code_lines {
            let header = ctx.content.lines().nth(f.header_line - 1).unwrap_or("");
            findings.push(Finding {
                file: ctx.file.rel_path.clone(),
                line_start: f.header_line,
                line_end: f.header_line,
                pattern_id: pattern.id.clone(),
                category: pattern.category,
                certainty: pattern.certainty,
                auto_fix: pattern.auto_fix,
                message: format!(
                    "{} has {} doc lines for {} code lines",
                    f.name, f.doc_lines, f.code_lines
                ),
                evidence: truncate_evidence(header.trim_start()),
                related_files: Vec::new(),
                phase: Phase::MultiPass,
            });
        }
    }
    findings
}

/// Flag function bodies where comment lines outnumber code lines more than
/// two to one, with at least 5 code lines.
pub fn verbosity_ratio(ctx: &FileContext, registry: &PatternRegistry) -> Vec<Finding> {
    let pattern = registry.multi_pass(MultiPassId::VerbosityRatio);
    let mut findings = Vec::new();

    for f in ctx.functions {
        if f.code_lines >= 5 && f.comment_lines > 2 * f.code_lines {
            let header = ctx.content.lines().nth(f.header_line - 1).unwrap_or("");
            findings.push(Finding {
                file: ctx.file.rel_path.clone(),
                line_start: f.header_line,
                line_end: f.body_end_line,
                pattern_id: pattern.id.clone(),
                category: pattern.category,
                certainty: pattern.certainty,
                auto_fix: pattern.auto_fix,
                message: format!(
                    "{} has {} comment lines for {} code lines",
                    f.name, f.comment_lines, f.code_lines
                ),
                evidence: truncate_evidence(header.trim_start()),
                related_files: Vec::new(),
                phase: Phase::MultiPass,
            });
        }
    }
    findings
}
