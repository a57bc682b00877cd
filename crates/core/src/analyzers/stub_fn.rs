//! Stub-function analyzer — bodies whose sole effect is an identity-like
//! return or an explicit not-implemented raise.
//!
//! Test-fixture paths are exempt: stubs are the point of a fixture.

use super::FileContext;
use crate::patterns::{MultiPassId, PatternRegistry};
use crate::scan::is_test_fixture_path;
use crate::types::*;
use regex::Regex;
use std::sync::OnceLock;

fn identity_return() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?:return\b\s*)?(?:0|1|true|false|True|False|None|null|nil|""|''|\[\]|\{\}|0\.0|Vec::new\(\)|vec!\[\]|Default::default\(\))?\s*;?,?$"#,
        )
        .unwrap()
    })
}

fn not_implemented() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)^(?:raise NotImplementedError|throw new Error\(\s*['"`](?:not implemented|todo|unimplemented)|todo!\(|unimplemented!\(|panic\(\s*"(?:not implemented|todo))"#,
        )
        .unwrap()
    })
}

/// `pass` and `...` are Python's canonical do-nothing bodies.
fn is_python_noop(stmt: &str) -> bool {
    stmt == "pass" || stmt == "..."
}

/// Extract the sole parameter name from a header line, if there is exactly
/// one parameter. Handles `x`, `x: T`, `x T`, and `mut x: T` forms.
fn single_param(header: &str) -> Option<String> {
    let open = header.find('(')?;
    let close = header[open..].find(')')? + open;
    let params = header[open + 1..close].trim();
    if params.is_empty() || params.contains(',') {
        return None;
    }
    let first = params
        .trim_start_matches("mut ")
        .split([':', ' '])
        .next()?
        .trim();
    if first.is_empty() || first.starts_with('&') || first == "self" {
        None
    } else {
        Some(first.to_string())
    }
}

/// Collect the effective statements of a body: trimmed code lines, with
/// delimiter-only lines dropped. Single-line bodies contribute the text
/// between the braces.
fn body_statements(ctx: &FileContext, f: &crate::functions::FunctionSpan) -> Vec<String> {
    use crate::mask::LineClass;

    if let Some((open, close)) = f.brace_span {
        if f.body_start_line == f.body_end_line {
            let interior = ctx.content[open + 1..close].trim();
            return if interior.is_empty() { Vec::new() } else { vec![interior.to_string()] };
        }
    }

    let lines: Vec<&str> = ctx.content.lines().collect();
    let mut stmts = Vec::new();
    let mut doc_remaining = f.body_doc_lines;
    for n in f.body_start_line..=f.body_end_line {
        let trimmed = lines.get(n - 1).map(|l| l.trim()).unwrap_or("");
        if doc_remaining > 0 {
            doc_remaining -= 1;
            continue;
        }
        if trimmed.is_empty() || ctx.classes.get(n - 1) != Some(&LineClass::Code) {
            continue;
        }
        if trimmed.chars().all(|c| "{}()[];,".contains(c)) {
            continue;
        }
        stmts.push(trimmed.to_string());
    }
    stmts
}

pub fn analyze(ctx: &FileContext, registry: &PatternRegistry) -> Vec<Finding> {
    if is_test_fixture_path(&ctx.file.rel_path) {
        return Vec::new();
    }
    let pattern = registry.multi_pass(MultiPassId::StubFunction);
    let lines: Vec<&str> = ctx.content.lines().collect();
    let mut findings = Vec::new();

    for f in ctx.functions {
        let stmts = body_statements(ctx, f);
        if stmts.len() != 1 {
            continue;
        }
        let stmt = stmts[0].trim_end_matches(&['}', '{'][..]).trim();
        let header = lines.get(f.header_line - 1).copied().unwrap_or("");

        let identity_on_param = single_param(header)
            .map(|p| {
                stmt == format!("return {p};")
                    || stmt == format!("return {p}")
                    || stmt == p
            })
            .unwrap_or(false);

        let stubby = not_implemented().is_match(stmt)
            || is_python_noop(stmt)
            || identity_on_param
            || (identity_return().is_match(stmt) && !stmt.is_empty());

        if stubby {
            findings.push(Finding {
                file: ctx.file.rel_path.clone(),
                line_start: f.header_line,
                line_end: f.body_end_line,
                pattern_id: pattern.id.clone(),
                category: pattern.category,
                certainty: pattern.certainty,
                auto_fix: pattern.auto_fix,
                message: format!("{} is a stub: `{stmt}`", f.name),
                evidence: truncate_evidence(header.trim_start()),
                related_files: Vec::new(),
                phase: Phase::MultiPass,
            });
        }
    }
    findings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::functions_in;
    use crate::mask::SourceMask;
    use std::path::PathBuf;

    fn run_on(rel: &str, lang: Language, content: &str) -> Vec<Finding> {
        let registry = PatternRegistry::builtin().unwrap();
        let file = SourceFile {
            rel_path: rel.to_string(),
            abs_path: PathBuf::from(rel),
            language: lang,
            size: 0,
        };
        let mask = SourceMask::compute(content, lang);
        let classes = mask.classify_lines(content);
        let functions = functions_in(content, lang, &mask, &classes);
        let ctx = FileContext { file: &file, content, mask: &mask, classes: &classes, functions: &functions };
        analyze(&ctx, &registry)
    }

    #[test]
    fn test_return_zero_stub() {
        let src = "function count() {\n  return 0;\n}\n";
        let findings = run_on("src/s.js", Language::Js, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].pattern_id, "stub_function");
        assert_eq!(findings[0].certainty, Certainty::High);
        assert_eq!(findings[0].auto_fix, AutoFix::Flag);
    }

    #[test]
    fn test_return_null_single_line_body() {
        let src = "function fetchUser() { return null; }\n";
        let findings = run_on("src/s.js", Language::Js, src);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_python_pass_body() {
        let src = "def handler(event):\n    pass\n";
        let findings = run_on("src/h.py", Language::Python, src);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_python_docstring_then_pass() {
        let src = "def handler(event):\n    \"\"\"Handles events.\"\"\"\n    pass\n";
        let findings = run_on("src/h.py", Language::Python, src);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_identity_on_only_parameter() {
        let src = "def transform(value):\n    return value\n";
        let findings = run_on("src/t.py", Language::Python, src);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_raise_not_implemented_stub() {
        let src = "def todo(x, y):\n    raise NotImplementedError(\"soon\")\n";
        let findings = run_on("src/t.py", Language::Python, src);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_real_function_not_a_stub() {
        let src = "fn add(a: u32, b: u32) -> u32 {\n    a + b\n}\n";
        let findings = run_on("src/m.rs", Language::Rust, src);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_multi_statement_body_not_a_stub() {
        let src = "function f() {\n  log();\n  return 0;\n}\n";
        let findings = run_on("src/f.js", Language::Js, src);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_test_fixture_paths_exempt() {
        let src = "function count() {\n  return 0;\n}\n";
        let findings = run_on("tests/helpers/count.js", Language::Js, src);
        assert!(findings.is_empty());
        let findings = run_on("src/count.test.js", Language::Js, src);
        assert!(findings.is_empty());
    }
}
