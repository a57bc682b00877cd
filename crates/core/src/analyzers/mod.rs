//! Phase-2 multi-pass analyzers.
//!
//! Per-file analyzers (doc/code ratio, verbosity ratio, dead code, stub
//! functions) run inside the worker that owns the file, over the Source
//! Mask and the shallow function parse. Project-level analyzers
//! (over-engineering, buzzword inflation, infrastructure use, shotgun
//! surgery) consume facts the workers collected and run once after all
//! files complete.

pub mod buzzword;
pub mod dead_code;
pub mod infra;
pub mod over_engineering;
pub mod ratios;
pub mod shotgun;
pub mod stub_fn;

use crate::functions::FunctionSpan;
use crate::mask::{LineClass, SourceMask};
use crate::patterns::PatternRegistry;
use crate::types::*;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Per-file context
// ---------------------------------------------------------------------------

/// Everything an analyzer may need about one file. Built once per file by
/// the worker and shared by all per-file analyzers.
pub struct FileContext<'a> {
    pub file: &'a SourceFile,
    pub content: &'a str,
    pub mask: &'a SourceMask,
    pub classes: &'a [LineClass],
    pub functions: &'a [FunctionSpan],
}

/// Run every per-file analyzer.
pub fn run_file_analyzers(ctx: &FileContext, registry: &PatternRegistry) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(ratios::doc_code_ratio(ctx, registry));
    findings.extend(ratios::verbosity_ratio(ctx, registry));
    findings.extend(dead_code::analyze(ctx, registry));
    findings.extend(stub_fn::analyze(ctx, registry));
    findings
}

// ---------------------------------------------------------------------------
// Project facts (collected per file, consumed project-wide)
// ---------------------------------------------------------------------------

/// An infrastructure client constructed in a file.
#[derive(Debug, Clone)]
pub struct InfraConstructor {
    pub binding: String,
    pub constructor: String,
    pub line: usize,
    pub evidence: String,
    pub exported: bool,
}

/// A positive quality claim found in a markdown file.
#[derive(Debug, Clone)]
pub struct Claim {
    pub bucket: &'static str,
    pub line: usize,
    pub text: String,
}

/// Facts one worker extracted from one file, keyed by path in the shared
/// project-facts table.
#[derive(Debug, Default, Clone)]
pub struct FileFacts {
    pub total_lines: usize,
    pub first_line: String,
    /// Exported-symbol count under the language's export rules.
    pub exported_count: usize,
    pub constructors: Vec<InfraConstructor>,
    /// Identifiers that receive a "real use" method call in this file.
    pub usage_receivers: BTreeSet<String>,
    /// (bucket, signature) evidence hits for the buzzword analyzer.
    pub evidence_hits: BTreeSet<(&'static str, &'static str)>,
    /// Quality claims (markdown files only).
    pub claims: Vec<Claim>,
}

/// Extract project-level facts from one file.
pub fn collect_facts(ctx: &FileContext) -> FileFacts {
    let mut facts = FileFacts {
        total_lines: ctx.content.lines().count(),
        first_line: ctx.content.lines().next().unwrap_or("").to_string(),
        exported_count: over_engineering::exported_count(ctx),
        ..FileFacts::default()
    };

    if ctx.file.language == Language::Markdown {
        facts.claims = buzzword::claims_in(ctx.content);
    } else {
        facts.evidence_hits = buzzword::evidence_in(ctx);
        let (constructors, receivers) = infra::constructors_and_usage(ctx);
        facts.constructors = constructors;
        facts.usage_receivers = receivers;
    }

    facts
}
