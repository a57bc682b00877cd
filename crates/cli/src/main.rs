//! slopscope CLI — scan a repository for slop and report it.
//!
//! Thin shell over the `slopscope-core` library: argument parsing, logging
//! setup, worker-pool sizing, and output selection live here; everything
//! else is the core's business.

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use slopscope_core::{
    format_handoff, lint_patterns, render_report, run, Category, Certainty, Filters, Thoroughness,
};

// ---------------------------------------------------------------------------
// CLI definition (clap derive)
// ---------------------------------------------------------------------------

/// Scan a repository for low-value, AI-generated, or decayed code.
#[derive(Parser)]
#[command(name = "slopscope", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThoroughnessArg {
    Quick,
    Normal,
    Deep,
}

impl From<ThoroughnessArg> for Thoroughness {
    fn from(value: ThoroughnessArg) -> Self {
        match value {
            ThoroughnessArg::Quick => Thoroughness::Quick,
            ThoroughnessArg::Normal => Thoroughness::Normal,
            ThoroughnessArg::Deep => Thoroughness::Deep,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Human-readable report with evidence
    Report,
    /// Compact machine format for fix automation
    Handoff,
    /// Full report as JSON
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum FailOn {
    Low,
    Medium,
    High,
    Critical,
}

impl From<FailOn> for Certainty {
    fn from(value: FailOn) -> Self {
        match value {
            FailOn::Low => Certainty::Low,
            FailOn::Medium => Certainty::Medium,
            FailOn::High => Certainty::High,
            FailOn::Critical => Certainty::Critical,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory tree and print the findings
    Scan {
        /// Root directory (default: current directory)
        path: Option<PathBuf>,

        /// How much work to do: quick = high-certainty regex rules only,
        /// normal = + structural analyzers and remaining rules, deep =
        /// + git history and external tools.
        /// Defaults to the root's .slopscope.toml setting, then normal.
        #[arg(long, value_enum)]
        thoroughness: Option<ThoroughnessArg>,

        /// Output format
        #[arg(long, value_enum, default_value = "report")]
        format: Format,

        /// Only scan files matching these globs (repeatable)
        #[arg(long = "include", value_name = "GLOB")]
        include: Vec<String>,

        /// Only report these categories (repeatable)
        #[arg(long = "allow-category", value_name = "CATEGORY")]
        allow_categories: Vec<String>,

        /// Never report these categories (repeatable)
        #[arg(long = "deny-category", value_name = "CATEGORY")]
        deny_categories: Vec<String>,

        /// Include evidence snippets in handoff output
        #[arg(long)]
        evidence: bool,

        /// Exit 1 when any finding reaches this certainty
        #[arg(long, value_enum)]
        fail_on: Option<FailOn>,

        /// Worker threads (default: available cores)
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Validate the pattern registry without scanning
    LintPatterns {
        /// Root directory whose descriptor file to include
        path: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_root(path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let root = match path {
        Some(p) => p,
        None => std::env::current_dir().context("could not determine current directory")?,
    };
    root.canonicalize().with_context(|| format!("path not found: {}", root.display()))
}

fn parse_categories(names: &[String]) -> anyhow::Result<Vec<Category>> {
    let mut categories = Vec::with_capacity(names.len());
    for name in names {
        match Category::from_str_opt(name) {
            Some(c) => categories.push(c),
            None => bail!("unknown category: {name}"),
        }
    }
    Ok(categories)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("slopscope=warn".parse().unwrap()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            thoroughness,
            format,
            include,
            allow_categories,
            deny_categories,
            evidence,
            fail_on,
            jobs,
        } => {
            let root = resolve_root(path)?;
            if let Some(jobs) = jobs {
                // Workers are capped at the core count; rayon ignores a
                // second initialization, so configure before first use.
                let threads = jobs.clamp(1, num_threads());
                rayon::ThreadPoolBuilder::new().num_threads(threads).build_global().ok();
            }

            let filters = Filters {
                paths: include,
                allow_categories: parse_categories(&allow_categories)?,
                deny_categories: parse_categories(&deny_categories)?,
            };
            let thoroughness = thoroughness
                .map(Thoroughness::from)
                .or_else(|| slopscope_core::configured_thoroughness(&root))
                .unwrap_or_default();
            let report = run(&root, thoroughness, &filters)
                .with_context(|| format!("scan failed for {}", root.display()))?;

            match format {
                Format::Report => print!("{}", render_report(&report)),
                Format::Handoff => print!("{}", format_handoff(&report, evidence)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }

            if let Some(threshold) = fail_on {
                let threshold: Certainty = threshold.into();
                if report.findings.iter().any(|f| f.certainty >= threshold) {
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::LintPatterns { path } => {
            let root = resolve_root(path)?;
            lint_patterns(&root).context("pattern registry is invalid")?;
            eprintln!("pattern registry OK");
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "slopscope", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn num_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
