use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Files larger than this are skipped and reported with a single notice.
pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

/// A NUL byte within this prefix marks a file as binary.
pub const BINARY_SNIFF_BYTES: usize = 8192;

/// Evidence snippets are truncated to this many bytes (ellipsis included).
pub const EVIDENCE_MAX_BYTES: usize = 200;

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Source language, inferred from the file extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Js,
    Ts,
    Rust,
    Python,
    Go,
    Java,
    Markdown,
    Other,
}

impl Language {
    pub fn from_ext(ext: &str) -> Self {
        match ext {
            "js" | "mjs" | "cjs" | "jsx" => Language::Js,
            "ts" | "tsx" | "mts" | "cts" => Language::Ts,
            "rs" => Language::Rust,
            "py" | "pyi" => Language::Python,
            "go" => Language::Go,
            "java" => Language::Java,
            "md" | "markdown" => Language::Markdown,
            _ => Language::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Js => "js",
            Language::Ts => "ts",
            Language::Rust => "rust",
            Language::Python => "python",
            Language::Go => "go",
            Language::Java => "java",
            Language::Markdown => "markdown",
            Language::Other => "other",
        }
    }
}

// ---------------------------------------------------------------------------
// Certainty, auto-fix verdict, category
// ---------------------------------------------------------------------------

/// Confidence grade of a finding. Ordered: Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Certainty {
    Low,
    Medium,
    High,
    Critical,
}

impl Certainty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Certainty::Low => "LOW",
            Certainty::Medium => "MEDIUM",
            Certainty::High => "HIGH",
            Certainty::Critical => "CRITICAL",
        }
    }

    /// All grades, highest first — the report block order.
    pub fn ranked() -> [Certainty; 4] {
        [Certainty::Critical, Certainty::High, Certainty::Medium, Certainty::Low]
    }
}

/// Recommendation to downstream fix automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoFix {
    Remove,
    Flag,
    None,
}

impl AutoFix {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoFix::Remove => "remove",
            AutoFix::Flag => "flag",
            AutoFix::None => "none",
        }
    }
}

/// Slop category. `Other` carries run-level informational findings
/// (unreadable files, pattern timeouts, tool failures).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Verbosity,
    Placeholder,
    GenericNaming,
    PhantomReference,
    DocRatio,
    Infrastructure,
    CodeSmell,
    OverEngineering,
    BuzzwordInflation,
    Secret,
    Style,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Verbosity => "verbosity",
            Category::Placeholder => "placeholder",
            Category::GenericNaming => "generic-naming",
            Category::PhantomReference => "phantom-reference",
            Category::DocRatio => "doc-ratio",
            Category::Infrastructure => "infrastructure",
            Category::CodeSmell => "code-smell",
            Category::OverEngineering => "over-engineering",
            Category::BuzzwordInflation => "buzzword-inflation",
            Category::Secret => "secret",
            Category::Style => "style",
            Category::Other => "other",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "verbosity" => Category::Verbosity,
            "placeholder" => Category::Placeholder,
            "generic-naming" => Category::GenericNaming,
            "phantom-reference" => Category::PhantomReference,
            "doc-ratio" => Category::DocRatio,
            "infrastructure" => Category::Infrastructure,
            "code-smell" => Category::CodeSmell,
            "over-engineering" => Category::OverEngineering,
            "buzzword-inflation" => Category::BuzzwordInflation,
            "secret" => Category::Secret,
            "style" => Category::Style,
            "other" => Category::Other,
            _ => return None,
        })
    }

    /// Sort key: lexicographic by name, with `other` forced last so
    /// run-level notices trail real findings within a certainty block.
    pub fn sort_key(&self) -> (bool, &'static str) {
        (matches!(self, Category::Other), self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Phase of origin
// ---------------------------------------------------------------------------

/// Which detection stage produced a finding. Used by the merger for
/// deduplication precedence and cross-phase subsumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Regex,
    MultiPass,
    External,
}

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

/// A single detection result. Value type: created once, never mutated
/// (the merger produces new orderings, not edits).
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    /// Repo-relative path, '/'-separated.
    pub file: String,
    /// 1-based line the match starts on.
    pub line_start: usize,
    /// 1-based line the match ends on (inclusive).
    pub line_end: usize,
    pub pattern_id: String,
    pub category: Category,
    pub certainty: Certainty,
    pub auto_fix: AutoFix,
    /// Short human-readable description of what was detected.
    pub message: String,
    /// Literal source snippet, truncated to [`EVIDENCE_MAX_BYTES`].
    pub evidence: String,
    /// Other files involved in a cross-file finding (paths only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_files: Vec<String>,
    #[serde(skip)]
    pub phase: Phase,
}

/// Truncate a snippet to [`EVIDENCE_MAX_BYTES`] at a char boundary,
/// appending an ellipsis when anything was cut. Evidence is single-line:
/// it must resolve as a substring of the file at `line_start`, and the
/// handoff format is one record per line.
pub fn truncate_evidence(snippet: &str) -> String {
    let multiline = snippet.trim_end_matches(['\r', '\n']).contains('\n');
    let snippet = snippet.lines().next().unwrap_or("").trim_end_matches('\r');
    if snippet.len() <= EVIDENCE_MAX_BYTES && !multiline {
        return snippet.to_string();
    }
    if snippet.len() + '…'.len_utf8() <= EVIDENCE_MAX_BYTES {
        return format!("{snippet}…");
    }
    // Reserve 3 bytes for the UTF-8 ellipsis.
    let mut cut = EVIDENCE_MAX_BYTES - 3;
    while cut > 0 && !snippet.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &snippet[..cut])
}

// ---------------------------------------------------------------------------
// Run parameters
// ---------------------------------------------------------------------------

/// How much work a run does: quick = Phase-1 only, normal = Phase-1 +
/// Phase-2, deep = all phases including external tools and git history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Thoroughness {
    Quick,
    #[default]
    Normal,
    Deep,
}

impl Thoroughness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Thoroughness::Quick => "quick",
            Thoroughness::Normal => "normal",
            Thoroughness::Deep => "deep",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Some(match s {
            "quick" => Thoroughness::Quick,
            "normal" => Thoroughness::Normal,
            "deep" => Thoroughness::Deep,
            _ => return None,
        })
    }

    pub fn runs_multi_pass(&self) -> bool {
        !matches!(self, Thoroughness::Quick)
    }

    pub fn runs_external(&self) -> bool {
        matches!(self, Thoroughness::Deep)
    }
}

/// Optional narrowing of a run: path globs and category allow/deny lists.
/// Empty lists mean "no restriction".
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// Include globs; when non-empty a file must match one to be scanned.
    pub paths: Vec<String>,
    pub allow_categories: Vec<Category>,
    pub deny_categories: Vec<Category>,
}

impl Filters {
    pub fn admits_category(&self, cat: Category) -> bool {
        if self.deny_categories.contains(&cat) {
            return false;
        }
        self.allow_categories.is_empty() || self.allow_categories.contains(&cat)
    }
}

// ---------------------------------------------------------------------------
// Scanned file
// ---------------------------------------------------------------------------

/// A candidate file discovered by the scanner. Immutable after enumeration.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub language: Language,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// The result of one run: the merged, ranked findings plus summary counts.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub total: usize,
    pub by_certainty: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub thoroughness: Thoroughness,
    pub duration_ms: u64,
    pub files_scanned: usize,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn new(
        findings: Vec<Finding>,
        thoroughness: Thoroughness,
        duration_ms: u64,
        files_scanned: usize,
    ) -> Self {
        let mut by_certainty = BTreeMap::new();
        let mut by_category = BTreeMap::new();
        for f in &findings {
            *by_certainty.entry(f.certainty.as_str().to_string()).or_insert(0) += 1;
            *by_category.entry(f.category.as_str().to_string()).or_insert(0) += 1;
        }
        Report {
            total: findings.len(),
            by_certainty,
            by_category,
            thoroughness,
            duration_ms,
            files_scanned,
            findings,
        }
    }

    pub fn count_at(&self, certainty: Certainty) -> usize {
        self.by_certainty.get(certainty.as_str()).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
