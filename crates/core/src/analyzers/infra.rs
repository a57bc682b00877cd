//! Infrastructure-without-implementation analyzer.
//!
//! Tracks constructed infrastructure clients (databases, caches, queues,
//! API clients, event emitters) against later "real use" method calls on
//! the binding, across all files. A constructor whose binding is neither
//! used nor exported is dead weight.

use super::{FileContext, FileFacts, InfraConstructor};
use crate::mask::line_index;
use crate::patterns::{MultiPassId, PatternRegistry};
use crate::types::*;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Constructor recognition
// ---------------------------------------------------------------------------

fn js_ctor() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*(?:export\s+)?(?:const|let|var)\s+(\w+)\s*=\s*(?:new\s+(Redis|PrismaClient|Pool|Kafka|S3Client|MongoClient|WebSocket|EventEmitter)|(createClient|createPool|createConnection|createTransport))\s*\(",
        )
        .unwrap()
    })
}

fn py_ctor() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*(\w+)\s*=\s*(redis\.Redis|pymongo\.MongoClient|create_engine|boto3\.client|KafkaProducer|sqlite3\.connect|Celery)\s*\(",
        )
        .unwrap()
    })
}

fn go_ctor() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*(\w+)(?:,\s*\w+)?\s*:=\s*(sql\.Open|redis\.NewClient|kafka\.NewWriter|mongo\.Connect|amqp\.Dial)\(",
        )
        .unwrap()
    })
}

fn rust_ctor() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*let\s+(\w+)\s*=\s*((?:\w+::)*(?:Pool|Client|Connection|Producer|Registry)::(?:new|connect|builder))\s*\(",
        )
        .unwrap()
    })
}

fn java_ctor() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)\b(\w+)\s*=\s*new\s+(JedisPool|KafkaProducer|MongoClient|HikariDataSource|RestTemplate)\s*\(",
        )
        .unwrap()
    })
}

fn ctor_regex(lang: Language) -> Option<&'static Regex> {
    match lang {
        Language::Js | Language::Ts => Some(js_ctor()),
        Language::Python => Some(py_ctor()),
        Language::Go => Some(go_ctor()),
        Language::Rust => Some(rust_ctor()),
        Language::Java => Some(java_ctor()),
        Language::Markdown | Language::Other => None,
    }
}

/// Method names that count as really using a client.
fn usage_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(\w+)\s*\.\s*(?i:query|execute|exec|get|set|put|post|send|publish|subscribe|emit|on|fetch|insert|find|delete|del|produce|consume|read|write|hget|hset|lpush|rpush|xadd|commit|ping|call|request|index)\s*\(",
        )
        .unwrap()
    })
}

fn is_exported(ctx: &FileContext, binding: &str, decl_line: &str) -> bool {
    match ctx.file.language {
        Language::Js | Language::Ts => {
            decl_line.trim_start().starts_with("export ")
                || ctx.content.contains(&format!("module.exports = {binding}"))
                || ctx.content.contains(&format!("export {{ {binding}"))
                || ctx.content.contains(&format!("exports.{binding}"))
        }
        Language::Go => binding.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false),
        // Module bindings in a package init are the package's public face.
        Language::Python => ctx.file.rel_path.ends_with("__init__.py"),
        _ => false,
    }
}

/// Collect constructors and usage receivers for one file.
pub fn constructors_and_usage(ctx: &FileContext) -> (Vec<InfraConstructor>, BTreeSet<String>) {
    let mut constructors = Vec::new();
    let mut receivers = BTreeSet::new();

    if let Some(re) = ctor_regex(ctx.file.language) {
        let index = line_index(ctx.content);
        for cap in re.captures_iter(ctx.content) {
            let whole = cap.get(0).unwrap();
            let binding = cap[1].to_string();
            let constructor = cap
                .iter()
                .skip(2)
                .flatten()
                .next()
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let line = crate::mask::line_of(&index, whole.start());
            let decl_line = ctx.content.lines().nth(line - 1).unwrap_or("");
            constructors.push(InfraConstructor {
                exported: is_exported(ctx, &binding, decl_line),
                binding,
                constructor,
                line,
                evidence: truncate_evidence(decl_line.trim_start()),
            });
        }
    }

    for cap in usage_regex().captures_iter(ctx.content) {
        receivers.insert(cap[1].to_string());
    }

    (constructors, receivers)
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

pub fn analyze(facts: &BTreeMap<String, FileFacts>, registry: &PatternRegistry) -> Vec<Finding> {
    let pattern = registry.multi_pass(MultiPassId::Infrastructure);

    // Union of all receivers that see a real-use call, anywhere.
    let mut used: BTreeSet<&str> = BTreeSet::new();
    for f in facts.values() {
        used.extend(f.usage_receivers.iter().map(|s| s.as_str()));
    }

    let mut findings = Vec::new();
    for (path, f) in facts {
        for ctor in &f.constructors {
            if ctor.exported || used.contains(ctor.binding.as_str()) {
                continue;
            }
            findings.push(Finding {
                file: path.clone(),
                line_start: ctor.line,
                line_end: ctor.line,
                pattern_id: pattern.id.clone(),
                category: pattern.category,
                certainty: pattern.certainty,
                auto_fix: pattern.auto_fix,
                message: format!(
                    "`{}` ({}) is constructed but never used",
                    ctor.binding, ctor.constructor
                ),
                evidence: ctor.evidence.clone(),
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
