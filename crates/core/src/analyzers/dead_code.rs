//! Dead-code analyzer — statements following a terminator in the same
//! basic block.
//!
//! Brace languages are walked with mask-aware brace depth; Python with
//! indentation. A new `case`/`catch`/`else`/match arm opens a sibling
//! block, so statements there are reachable and never flagged.

use super::FileContext;
use crate::mask::{line_index, ByteKind, LineClass};
use crate::patterns::{MultiPassId, PatternRegistry};
use crate::types::*;

fn lang_suffix(lang: Language) -> Option<&'static str> {
    Some(match lang {
        Language::Js => "js",
        Language::Ts => "ts",
        Language::Rust => "rs",
        Language::Python => "py",
        Language::Go => "go",
        Language::Java => "java",
        Language::Markdown | Language::Other => return None,
    })
}

fn terminators(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Rust => &["return", "break", "continue", "panic!", "todo!", "unreachable!"],
        Language::Python => &["return", "raise", "break", "continue"],
        Language::Go => &["return", "panic(", "break", "continue"],
        _ => &["return", "throw", "break", "continue"],
    }
}

/// Does this trimmed line begin a terminator statement?
fn is_terminator(trimmed: &str, lang: Language) -> bool {
    terminators(lang).iter().any(|t| {
        trimmed.starts_with(t)
            && trimmed[t.len()..]
                .chars()
                .next()
                .map(|c| !c.is_alphanumeric() && c != '_')
                .unwrap_or(true)
    })
}

/// Lines that open a sibling arm rather than continuing the current block.
fn opens_sibling_arm(trimmed: &str, lang: Language) -> bool {
    if trimmed.starts_with("case ")
        || trimmed.starts_with("default:")
        || trimmed.starts_with("catch")
        || trimmed.starts_with("} catch")
        || trimmed.starts_with("else")
        || trimmed.starts_with("} else")
        || trimmed.starts_with("finally")
        || trimmed.starts_with("} finally")
        || trimmed.starts_with("except")
        || trimmed.starts_with("elif ")
    {
        return true;
    }
    // Rust match arms.
    lang == Language::Rust && trimmed.contains("=>")
}

/// A line consisting only of delimiters carries no statement.
fn is_delimiter_only(trimmed: &str) -> bool {
    !trimmed.is_empty() && trimmed.chars().all(|c| "{}()[];,".contains(c))
}

pub fn analyze(ctx: &FileContext, registry: &PatternRegistry) -> Vec<Finding> {
    let suffix = match lang_suffix(ctx.file.language) {
        Some(s) => s,
        None => return Vec::new(),
    };
    let pattern = registry.multi_pass(MultiPassId::DeadCode);
    let pattern_id = format!("dead_code.{suffix}");
    let lines: Vec<&str> = ctx.content.lines().collect();
    let mut findings = Vec::new();

    for f in ctx.functions {
        let dead = if ctx.file.language == Language::Python {
            python_dead_line(ctx, &lines, f.body_start_line, f.body_end_line)
        } else {
            brace_dead_line(ctx, &lines, f)
        };
        if let Some(line) = dead {
            // One finding per function; the first unreachable line anchors it.
            findings.push(Finding {
                file: ctx.file.rel_path.clone(),
                line_start: line,
                line_end: line,
                pattern_id: pattern_id.clone(),
                category: pattern.category,
                certainty: pattern.certainty,
                auto_fix: pattern.auto_fix,
                message: format!("unreachable statement in {}", f.name),
                evidence: truncate_evidence(lines.get(line - 1).unwrap_or(&"").trim_start()),
                related_files: Vec::new(),
                phase: Phase::MultiPass,
            });
        }
    }
    findings
}

// ---------------------------------------------------------------------------
// Python: indentation blocks
// ---------------------------------------------------------------------------

fn python_dead_line(
    ctx: &FileContext,
    lines: &[&str],
    body_start: usize,
    body_end: usize,
) -> Option<usize> {
    let lang = ctx.file.language;
    let mut n = body_start;
    while n <= body_end {
        let line = lines.get(n - 1)?;
        let trimmed = line.trim();
        if ctx.classes.get(n - 1) == Some(&LineClass::Code) && is_terminator(trimmed, lang) {
            let term_indent = line.len() - line.trim_start().len();
            let mut m = n + 1;
            while m <= body_end {
                let next = lines.get(m - 1)?;
                let next_trimmed = next.trim();
                if next_trimmed.is_empty()
                    || ctx.classes.get(m - 1) == Some(&LineClass::Comment)
                {
                    m += 1;
                    continue;
                }
                let indent = next.len() - next.trim_start().len();
                if indent < term_indent || opens_sibling_arm(next_trimmed, lang) {
                    break;
                }
                return Some(m);
            }
        }
        n += 1;
    }
    None
}

// ---------------------------------------------------------------------------
// Brace languages: mask-aware depth tracking
// ---------------------------------------------------------------------------

fn brace_dead_line(ctx: &FileContext, lines: &[&str], f: &crate::functions::FunctionSpan) -> Option<usize> {
    let (open, close) = f.brace_span?;
    let lang = ctx.file.language;
    let index = line_index(ctx.content);
    let bytes = ctx.content.as_bytes();

    // Depth at the start of each body line, counting code-kind braces only.
    let mut depth_at: Vec<(usize, i32)> = Vec::new();
    let mut depth = 0i32;
    let mut line_no = crate::mask::line_of(&index, open);
    for (i, &b) in bytes.iter().enumerate().take(close + 1).skip(open) {
        if b == b'\n' {
            line_no += 1;
            depth_at.push((line_no, depth));
            continue;
        }
        if ctx.mask.kind(i) != ByteKind::Code {
            continue;
        }
        match b {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            _ => {}
        }
    }

    let depth_of = |line: usize| -> Option<i32> {
        depth_at.iter().find(|(l, _)| *l == line).map(|(_, d)| *d)
    };

    for n in f.body_start_line..=f.body_end_line {
        let line = lines.get(n - 1)?;
        let trimmed = line.trim();
        if ctx.classes.get(n - 1) != Some(&LineClass::Code) || !is_terminator(trimmed, lang) {
            continue;
        }
        let term_depth = depth_of(n)?;
        let mut m = n + 1;
        while m <= f.body_end_line {
            let next = lines.get(m - 1)?;
            let next_trimmed = next.trim();
            if next_trimmed.is_empty() || ctx.classes.get(m - 1) == Some(&LineClass::Comment) {
                m += 1;
                continue;
            }
            let d = depth_of(m)?;
            if d < term_depth || opens_sibling_arm(next_trimmed, lang) {
                break;
            }
            if is_delimiter_only(next_trimmed) {
                m += 1;
                continue;
            }
            return Some(m);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
