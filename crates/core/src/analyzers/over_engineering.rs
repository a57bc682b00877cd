//! Over-engineering analyzer — module structure measured against its
//! exported surface.
//!
//! Project-level: after all files are scanned, well-known entry points
//! (lib root, package index/init, main) anchor three metrics computed over
//! the files beneath them. Findings name the entry point and the metric.

use super::FileFacts;
use crate::patterns::{MultiPassId, PatternRegistry};
use crate::types::*;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const MAX_FILES_PER_EXPORT: usize = 20;
const MAX_LINES_PER_EXPORT: usize = 500;
const MAX_NESTING: usize = 4;

// ---------------------------------------------------------------------------
// Export counting (runs per file, used when the file is an entry point)
// ---------------------------------------------------------------------------

fn py_all_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)__all__\s*=\s*\[([^\]]*)\]").unwrap())
}

/// Count exported symbols under the file's language rules.
pub fn exported_count(ctx: &super::FileContext) -> usize {
    let content = ctx.content;
    match ctx.file.language {
        Language::Rust => content
            .lines()
            .filter(|l| {
                let t = l.trim_start();
                t.starts_with("pub fn ")
                    || t.starts_with("pub struct ")
                    || t.starts_with("pub enum ")
                    || t.starts_with("pub trait ")
                    || t.starts_with("pub const ")
                    || t.starts_with("pub static ")
                    || t.starts_with("pub mod ")
                    || t.starts_with("pub use ")
                    || t.starts_with("pub type ")
            })
            .count(),
        Language::Js | Language::Ts => content
            .lines()
            .filter(|l| {
                let t = l.trim_start();
                t.starts_with("export ") || t.contains("module.exports")
            })
            .count(),
        Language::Python => {
            if let Some(cap) = py_all_re().captures(content) {
                cap[1].matches(['\'', '"']).count() / 2
            } else {
                content
                    .lines()
                    .filter(|l| {
                        (l.starts_with("def ") || l.starts_with("class "))
                            || l.starts_with("from . import ")
                            || l.starts_with("from .")
                    })
                    .count()
            }
        }
        Language::Go => content
            .lines()
            .filter(|l| {
                let t = l.trim_start();
                t.starts_with("func ") || t.starts_with("type ")
            })
            .filter(|l| {
                l.trim_start()
                    .split_whitespace()
                    .nth(1)
                    .and_then(|w| w.chars().next())
                    .map(|c| c.is_ascii_uppercase())
                    .unwrap_or(false)
            })
            .count(),
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

struct EntryPoint {
    /// Directory whose contents the metrics cover (no trailing slash;
    /// empty string for the project root).
    dir: String,
    /// Extension filter for in-scope files.
    exts: &'static [&'static str],
}

fn entry_point(path: &str) -> Option<EntryPoint> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let dir = path.rsplit_once('/').map(|(d, _)| d.to_string()).unwrap_or_default();
    match file_name {
        "lib.rs" | "main.rs" => Some(EntryPoint { dir, exts: &["rs"] }),
        "index.js" | "index.mjs" | "index.jsx" => {
            Some(EntryPoint { dir, exts: &["js", "mjs", "cjs", "jsx"] })
        }
        "index.ts" | "index.tsx" => Some(EntryPoint { dir, exts: &["ts", "tsx"] }),
        "__init__.py" => Some(EntryPoint { dir, exts: &["py"] }),
        "main.go" => Some(EntryPoint { dir, exts: &["go"] }),
        _ => None,
    }
}

fn in_scope(rel: &str, entry: &EntryPoint) -> bool {
    let under = if entry.dir.is_empty() {
        rel
    } else if let Some(rest) = rel.strip_prefix(&entry.dir) {
        match rest.strip_prefix('/') {
            Some(r) => r,
            None => return false,
        }
    } else {
        return false;
    };
    let ext = under.rsplit('.').next().unwrap_or("");
    entry.exts.contains(&ext) && !under.is_empty()
}

/// Directory depth of `rel` below the entry directory.
fn nesting_of(rel: &str, entry: &EntryPoint) -> usize {
    let under = if entry.dir.is_empty() {
        rel
    } else {
        rel.strip_prefix(&entry.dir).and_then(|r| r.strip_prefix('/')).unwrap_or("")
    };
    under.matches('/').count()
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

pub fn analyze(facts: &BTreeMap<String, FileFacts>, registry: &PatternRegistry) -> Vec<Finding> {
    let pattern = registry.multi_pass(MultiPassId::OverEngineering);
    let mut findings = Vec::new();

    for (path, entry_facts) in facts {
        let entry = match entry_point(path) {
            Some(e) => e,
            None => continue,
        };
        // Nested entry points (a deeper main.rs in examples, say) measure
        // their own subtree; each is assessed independently.
        let mut file_count = 0usize;
        let mut line_count = 0usize;
        let mut nesting = 0usize;
        for (rel, f) in facts {
            if in_scope(rel, &entry) {
                file_count += 1;
                line_count += f.total_lines;
                nesting = nesting.max(nesting_of(rel, &entry));
            }
        }
        if file_count < 2 {
            continue;
        }
        let exports = entry_facts.exported_count;
        let divisor = exports.max(1);

        let mut emit = |id_suffix: &str, message: String| {
            findings.push(Finding {
                file: path.clone(),
                line_start: 1,
                line_end: 1,
                pattern_id: format!("over_engineering.{id_suffix}"),
                category: pattern.category,
                certainty: pattern.certainty,
                auto_fix: pattern.auto_fix,
                message,
                evidence: truncate_evidence(&entry_facts.first_line),
                related_files: Vec::new(),
                phase: Phase::MultiPass,
            });
        };

        let files_per_export = file_count / divisor;
        if files_per_export > MAX_FILES_PER_EXPORT {
            emit(
                "files_per_export",
                format!(
                    "{path} exports {exports} symbols across {file_count} files (files/export = {files_per_export})"
                ),
            );
        }
        let lines_per_export = line_count / divisor;
        if lines_per_export > MAX_LINES_PER_EXPORT {
            emit(
                "lines_per_export",
                format!(
                    "{path} exports {exports} symbols across {line_count} lines (lines/export = {lines_per_export})"
                ),
            );
        }
        if nesting > MAX_NESTING {
            emit(
                "nesting",
                format!("{path} sits atop {nesting} levels of directory nesting"),
            );
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
    use crate::mask::SourceMask;
    use std::path::PathBuf;

    fn facts_for(rel: &str, lang: Language, content: &str) -> FileFacts {
        let file = SourceFile {
            rel_path: rel.to_string(),
            abs_path: PathBuf::from(rel),
            language: lang,
            size: 0,
        };
        let mask = SourceMask::compute(content, lang);
        let classes = mask.classify_lines(content);
        let ctx = super::super::FileContext {
            file: &file,
            content,
            mask: &mask,
            classes: &classes,
            functions: &[],
        };
        super::super::collect_facts(&ctx)
    }

    #[test]
    fn test_exported_count_rust() {
        let src = "pub use inner::Thing;\npub fn a() {}\nfn private() {}\npub struct S;\n";
        let file = SourceFile {
            rel_path: "src/lib.rs".into(),
            abs_path: PathBuf::from("src/lib.rs"),
            language: Language::Rust,
            size: 0,
        };
        let mask = SourceMask::compute(src, Language::Rust);
        let classes = mask.classify_lines(src);
        let ctx = super::super::FileContext {
            file: &file,
            content: src,
            mask: &mask,
            classes: &classes,
            functions: &[],
        };
        assert_eq!(exported_count(&ctx), 3);
    }

    #[test]
    fn test_single_export_many_files_flagged() {
        // A lib.rs re-exporting one symbol over 25 source files.
        let mut facts = BTreeMap::new();
        facts.insert(
            "src/lib.rs".to_string(),
            facts_for("src/lib.rs", Language::Rust, "pub use detail::Only;\nmod detail;\n"),
        );
        for i in 0..24 {
            facts.insert(
                format!("src/detail_{i:02}.rs"),
                facts_for(&format!("src/detail_{i:02}.rs"), Language::Rust, "fn helper() {}\n"),
            );
        }
        let registry = PatternRegistry::builtin().unwrap();
        let findings = analyze(&facts, &registry);
        let hit = findings
            .iter()
            .find(|f| f.pattern_id == "over_engineering.files_per_export")
            .expect("files/export finding");
        assert_eq!(hit.file, "src/lib.rs");
        assert!(hit.message.contains("25"), "metric missing: {}", hit.message);
        assert_eq!(hit.certainty, Certainty::High);
    }

    #[test]
    fn test_reasonable_module_not_flagged() {
        let mut facts = BTreeMap::new();
        facts.insert(
            "src/lib.rs".to_string(),
            facts_for(
                "src/lib.rs",
                Language::Rust,
                "pub fn a() {}\npub fn b() {}\npub fn c() {}\n",
            ),
        );
        facts.insert(
            "src/util.rs".to_string(),
            facts_for("src/util.rs", Language::Rust, "fn helper() {}\n"),
        );
        let registry = PatternRegistry::builtin().unwrap();
        assert!(analyze(&facts, &registry).is_empty());
    }

    #[test]
    fn test_deep_nesting_flagged() {
        let mut facts = BTreeMap::new();
        facts.insert(
            "pkg/index.ts".to_string(),
            facts_for("pkg/index.ts", Language::Ts, "export { a } from './a';\n"),
        );
        facts.insert(
            "pkg/a/b/c/d/e/leaf.ts".to_string(),
            facts_for("pkg/a/b/c/d/e/leaf.ts", Language::Ts, "export const a = 1;\n"),
        );
        let registry = PatternRegistry::builtin().unwrap();
        let findings = analyze(&facts, &registry);
        assert!(findings.iter().any(|f| f.pattern_id == "over_engineering.nesting"));
    }

    #[test]
    fn test_python_all_export_count() {
        let src = "__all__ = [\"alpha\", \"beta\"]\n";
        let f = facts_for("pkg/__init__.py", Language::Python, src);
        assert_eq!(f.exported_count, 2);
    }
}
