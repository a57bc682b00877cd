//! slopscope core — slop detection over a source tree.
//!
//! Three-phase pipeline with deterministic output: a stateless regex pass
//! over an immutable pattern registry, structural multi-pass analyzers over
//! a per-byte source mask, and optional external tools. Findings carry a
//! calibrated certainty and an auto-fix verdict so downstream automation
//! can decide whether to rewrite, flag, or ignore. The core never mutates
//! source, calls no language models, and emits no network traffic.

pub mod analyzers;
pub mod error;
pub mod external;
pub mod functions;
pub mod handoff;
pub mod mask;
pub mod merge;
pub mod patterns;
pub mod phase1;
pub mod pipeline;
pub mod render;
pub mod scan;
pub mod types;

pub use error::{Result, ScanError};
pub use handoff::format_handoff;
pub use pipeline::{run, run_with_cancel, CancelToken};
pub use render::render_report;
pub use types::{
    AutoFix, Category, Certainty, Filters, Finding, Language, Phase, Report, SourceFile,
    Thoroughness,
};

use std::path::Path;

/// Validate the pattern registry (built-ins plus the root's descriptor
/// file) without scanning anything. `Ok(())` means a run would start.
pub fn lint_patterns(root: &Path) -> Result<()> {
    patterns::PatternRegistry::for_root(root).map(|_| ())
}

/// The `thoroughness` default declared in the root's `.slopscope.toml`,
/// if any. Malformed values are ignored rather than fatal; only pattern
/// descriptors abort initialization.
pub fn configured_thoroughness(root: &Path) -> Option<Thoroughness> {
    let content = std::fs::read_to_string(root.join(patterns::CONFIG_FILE)).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    value
        .get("thoroughness")
        .and_then(|v| v.as_str())
        .and_then(Thoroughness::from_str_opt)
}
