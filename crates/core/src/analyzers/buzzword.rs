//! Buzzword-inflation analyzer — quality claims in markdown measured
//! against evidence in the code.
//!
//! Six claim buckets, each backed by a set of evidence signatures. A claim
//! with fewer than two distinct signatures present anywhere in the
//! repository is inflation. Claims in aspirational context (TODO, planned,
//! roadmap wording nearby) are left alone.

use super::{Claim, FileContext, FileFacts};
use crate::patterns::{MultiPassId, PatternRegistry};
use crate::scan::is_test_fixture_path;
use crate::types::*;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Distinct evidence signatures a claim needs to stand.
const REQUIRED_EVIDENCE: usize = 2;

// ---------------------------------------------------------------------------
// Claim lexicon
// ---------------------------------------------------------------------------

fn claim_lexicon() -> &'static Vec<(&'static str, Regex)> {
    static RE: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    RE.get_or_init(|| {
        vec![
            (
                "production",
                Regex::new(r"(?i)\b(production[- ]ready|production[- ]grade|battle[- ]tested|ready for production)\b").unwrap(),
            ),
            (
                "enterprise",
                Regex::new(r"(?i)\benterprise[- ](grade|ready|class)\b").unwrap(),
            ),
            (
                "security",
                Regex::new(r"(?i)\b(secure by (default|design)|security[- ](hardened|first)|fully secure|hardened against)\b").unwrap(),
            ),
            (
                "scale",
                Regex::new(r"(?i)\b((highly|massively|infinitely) scalable|scales (effortlessly|horizontally)|high[- ]performance|blazing(ly)? fast|web[- ]scale)\b").unwrap(),
            ),
            (
                "reliability",
                Regex::new(r"(?i)\b(fault[- ]tolerant|highly available|rock[- ]solid|bulletproof|never fails|resilient)\b").unwrap(),
            ),
            (
                "completeness",
                Regex::new(r"(?i)\b(fully[- ](featured|complete|implemented)|feature[- ]complete|comprehensive|complete solution|batteries included)\b").unwrap(),
            ),
        ]
    })
}

fn aspirational() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(todo|planned|roadmap|coming soon|will be|should be|eventually|future work|work in progress|wip|aims to|goal is)\b",
        )
        .unwrap()
    })
}

/// Extract quality claims from a markdown file, skipping aspirational
/// context (the claim line and its neighbors).
pub fn claims_in(content: &str) -> Vec<Claim> {
    let lines: Vec<&str> = content.lines().collect();
    let mut claims = Vec::new();

    for (n, line) in lines.iter().enumerate() {
        for (bucket, re) in claim_lexicon() {
            let m = match re.find(line) {
                Some(m) => m,
                None => continue,
            };
            let window_start = n.saturating_sub(1);
            let window_end = (n + 1).min(lines.len() - 1);
            let aspirational_nearby =
                (window_start..=window_end).any(|i| aspirational().is_match(lines[i]));
            if aspirational_nearby {
                continue;
            }
            claims.push(Claim {
                bucket,
                line: n + 1,
                text: m.as_str().to_string(),
            });
        }
    }
    claims
}

// ---------------------------------------------------------------------------
// Evidence signatures
// ---------------------------------------------------------------------------

const SIGNATURES: &[(&str, &[&str])] = &[
    ("tests", &["#[test]", "def test_", "describe(", "it(", "@test", "func test"]),
    ("error-handling", &["catch", "except ", "if err != nil", "result<", "anyhow", "thiserror", ".unwrap_or"]),
    ("logging", &["import logging", "winston", "log4j", "slf4j", "tracing::", "use tracing", "log::", "logrus", "zap.", "getlogger"]),
    ("auth", &["authenticate", "authorization", "jwt", "oauth", "passport", "login", "bearer"]),
    ("validation", &["validate", "sanitize", "escape(", "schema"]),
    ("crypto", &["encrypt", "bcrypt", "argon2", "hashlib", "sha256", "crypto"]),
    ("config", &["process.env", "os.environ", "dotenv", "env::var", "config"]),
    ("async", &["async ", "await", "tokio", "go func", "promise.all", "threading", "rayon", "worker"]),
    ("cache", &["cache", "redis", "lru", "memcach"]),
    ("queue", &["queue", "kafka", "rabbit", "celery", "sqs"]),
    ("retry", &["retry", "backoff"]),
    ("timeout", &["timeout", "deadline"]),
    ("health", &["health"]),
];

/// Which signatures each claim bucket accepts as evidence.
const BUCKET_EVIDENCE: &[(&str, &[&str])] = &[
    ("production", &["tests", "error-handling", "logging"]),
    ("enterprise", &["auth", "config", "logging"]),
    ("security", &["auth", "validation", "crypto"]),
    ("scale", &["async", "cache", "queue"]),
    ("reliability", &["retry", "timeout", "health", "error-handling"]),
    ("completeness", &["tests", "docs", "error-handling"]),
];

/// Scan one code file for evidence signature hits.
pub fn evidence_in(ctx: &FileContext) -> BTreeSet<(&'static str, &'static str)> {
    let lowered = ctx.content.to_lowercase();
    let mut hits = BTreeSet::new();

    for (signature, indicators) in SIGNATURES {
        if indicators.iter().any(|ind| lowered.contains(ind)) {
            for (bucket, sigs) in BUCKET_EVIDENCE {
                if sigs.contains(signature) {
                    hits.insert((*bucket, *signature));
                }
            }
        }
    }
    // A test file is itself test evidence, whatever it contains.
    if is_test_fixture_path(&ctx.file.rel_path) {
        hits.insert(("production", "tests"));
        hits.insert(("completeness", "tests"));
    }
    hits
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

pub fn analyze(facts: &BTreeMap<String, FileFacts>, registry: &PatternRegistry) -> Vec<Finding> {
    let pattern = registry.multi_pass(MultiPassId::BuzzwordInflation);

    // Aggregate evidence across the repository.
    let mut evidence: BTreeSet<(&str, &str)> = BTreeSet::new();
    for f in facts.values() {
        evidence.extend(f.evidence_hits.iter().copied());
    }
    // Documentation beyond the README counts toward completeness.
    if facts.keys().any(|p| p.starts_with("docs/") || p.contains("/docs/")) {
        evidence.insert(("completeness", "docs"));
    }

    let mut findings = Vec::new();
    for (path, f) in facts {
        let mut seen_buckets: BTreeSet<&str> = BTreeSet::new();
        for claim in &f.claims {
            // One finding per (file, bucket); the first claim anchors it.
            if !seen_buckets.insert(claim.bucket) {
                continue;
            }
            let support = evidence.iter().filter(|(b, _)| *b == claim.bucket).count();
            if support < REQUIRED_EVIDENCE {
                findings.push(Finding {
                    file: path.clone(),
                    line_start: claim.line,
                    line_end: claim.line,
                    pattern_id: format!("buzzword_inflation.{}", claim.bucket),
                    category: pattern.category,
                    certainty: pattern.certainty,
                    auto_fix: pattern.auto_fix,
                    message: format!(
                        "\"{}\" claimed with {support} of {REQUIRED_EVIDENCE} required evidence signatures",
                        claim.text
                    ),
                    evidence: truncate_evidence(&claim.text),
                    related_files: Vec::new(),
                    phase: Phase::MultiPass,
                });
            }
        }
    }
    findings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
