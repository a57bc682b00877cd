//! Phase-3 — optional external analyzers.
//!
//! Each tool is detected by executable presence on PATH and skipped
//! silently when absent. Invocations use argument-array spawning (never a
//! shell), carry a hard timeout, and stream-parse output under a byte cap.
//! Everything a tool reports becomes a LOW finding; everything that goes
//! wrong with a tool becomes a LOW finding too.

use crate::types::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Hard per-tool wall-clock budget.
const TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Output beyond this is discarded; parsers see at most this many bytes.
const MAX_TOOL_OUTPUT: usize = 4 * 1024 * 1024;

type ParseFn = fn(&str, &Path) -> Vec<(String, String, usize, String)>;

struct ToolSpec {
    name: &'static str,
    bin: &'static str,
    args: &'static [&'static str],
    /// Parse raw output into (rule, file, line, message) tuples.
    parse: ParseFn,
}

const TOOLS: &[ToolSpec] = &[
    ToolSpec { name: "jscpd", bin: "jscpd", args: &["--silent", "--reporters", "console"], parse: parse_jscpd },
    ToolSpec { name: "madge", bin: "madge", args: &["--circular"], parse: parse_madge },
    ToolSpec { name: "lizard", bin: "lizard", args: &["-w"], parse: parse_lizard },
    ToolSpec { name: "eslint", bin: "eslint", args: &["--format", "json", "--no-error-on-unmatched-pattern"], parse: parse_eslint },
    ToolSpec { name: "ruff", bin: "ruff", args: &["check", "--output-format", "json", "--exit-zero"], parse: parse_ruff },
];

// ---------------------------------------------------------------------------
// PATH detection and argument safety
// ---------------------------------------------------------------------------

fn find_on_path(bin: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(bin);
        if is_executable(&candidate) {
            return Some(candidate);
        }
        #[cfg(windows)]
        {
            let exe = dir.join(format!("{bin}.exe"));
            if is_executable(&exe) {
                return Some(exe);
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Paths handed to tools must be absolute and free of shell metacharacters;
/// spawning never goes through a shell, but a hostile path stays hostile in
/// the tool's own subprocesses.
fn validate_tool_path(root: &Path) -> Option<String> {
    let canonical = root.canonicalize().ok()?;
    let s = canonical.to_str()?.to_string();
    const FORBIDDEN: &[char] = &[';', '|', '&', '$', '<', '>', '`', '"', '\'', '\n', '\r'];
    if s.chars().any(|c| FORBIDDEN.contains(&c)) {
        warn!(path = s.as_str(), "Root path contains shell metacharacters; skipping external tools");
        return None;
    }
    Some(s)
}

// ---------------------------------------------------------------------------
// Invocation with timeout
// ---------------------------------------------------------------------------

enum ToolRun {
    Output(String),
    TimedOut,
    Failed(String),
}

fn run_tool(exe: &Path, args: &[&str], root_arg: &str, cancel: &Arc<AtomicBool>) -> ToolRun {
    let mut child = match Command::new(exe)
        .args(args)
        .arg(root_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(c) => c,
        Err(e) => return ToolRun::Failed(e.to_string()),
    };

    // Drain stdout on a separate thread so a chatty tool cannot fill the
    // pipe and deadlock against our timeout poll.
    let stdout = child.stdout.take();
    let reader = std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(out) = stdout {
            let _ = out.take(MAX_TOOL_OUTPUT as u64).read_to_string(&mut buf);
        }
        buf
    });

    let started = Instant::now();
    loop {
        if cancel.load(Ordering::Relaxed) {
            let _ = child.kill();
            let _ = child.wait();
            let _ = reader.join();
            return ToolRun::Failed("cancelled".to_string());
        }
        match child.try_wait() {
            Ok(Some(_status)) => break,
            Ok(None) => {
                if started.elapsed() > TOOL_TIMEOUT {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = reader.join();
                    return ToolRun::TimedOut;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                let _ = child.kill();
                return ToolRun::Failed(e.to_string());
            }
        }
    }

    match reader.join() {
        Ok(output) => ToolRun::Output(output),
        Err(_) => ToolRun::Failed("output reader panicked".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Phase entry point
// ---------------------------------------------------------------------------

/// Invoke every available external tool against the root. One invocation
/// per tool per run; absent tools are skipped silently.
pub fn run_phase3(root: &Path, cancel: &Arc<AtomicBool>) -> Vec<Finding> {
    let root_arg = match validate_tool_path(root) {
        Some(s) => s,
        None => return Vec::new(),
    };

    let mut findings = Vec::new();
    for tool in TOOLS {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let exe = match find_on_path(tool.bin) {
            Some(p) => p,
            None => continue,
        };
        debug!(tool = tool.name, exe = %exe.display(), "Running external tool");

        match run_tool(&exe, tool.args, &root_arg, cancel) {
            ToolRun::Output(output) => {
                let mut records = (tool.parse)(&output, root);
                if records.is_empty() && !output.trim().is_empty() && looks_unparseable(&output) {
                    findings.push(tool_notice(
                        tool.name,
                        "parse",
                        format!("{} output could not be parsed", tool.name),
                    ));
                    continue;
                }
                // Canonical order before merging.
                records.sort();
                for (rule, file, line, message) in records {
                    findings.push(Finding {
                        file,
                        line_start: line.max(1),
                        line_end: line.max(1),
                        pattern_id: format!("external.{}.{rule}", tool.name),
                        category: Category::CodeSmell,
                        certainty: Certainty::Low,
                        auto_fix: AutoFix::None,
                        message,
                        evidence: String::new(),
                        related_files: Vec::new(),
                        phase: Phase::External,
                    });
                }
            }
            ToolRun::TimedOut => {
                findings.push(tool_notice(
                    tool.name,
                    "timeout",
                    format!("{} exceeded its {}s budget and was killed", tool.name, TOOL_TIMEOUT.as_secs()),
                ));
            }
            ToolRun::Failed(reason) => {
                warn!(tool = tool.name, reason = reason.as_str(), "External tool failed");
            }
        }
    }
    findings
}

fn tool_notice(tool: &str, kind: &str, message: String) -> Finding {
    Finding {
        // Tool notices are project-level; they anchor at the root.
        file: ".".to_string(),
        line_start: 1,
        line_end: 1,
        pattern_id: format!("external.{tool}.{kind}"),
        category: Category::Other,
        certainty: Certainty::Low,
        auto_fix: AutoFix::None,
        message,
        evidence: String::new(),
        related_files: Vec::new(),
        phase: Phase::External,
    }
}

/// JSON tools that emitted non-JSON junk are reported as parse failures;
/// line-oriented tools with no recognized lines are simply quiet.
fn looks_unparseable(output: &str) -> bool {
    let t = output.trim_start();
    t.starts_with('{') || t.starts_with('[')
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

fn rel_to(root: &Path, path: &str) -> String {
    Path::new(path)
        .strip_prefix(root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| path.replace('\\', "/"))
}

/// `Clone found (javascript): - src/a.js [12:1 - 24:1] …` console lines.
fn parse_jscpd(output: &str, root: &Path) -> Vec<(String, String, usize, String)> {
    let mut records = Vec::new();
    for line in output.lines() {
        let t = line.trim();
        let rest = match t.strip_prefix("- ") {
            Some(r) => r,
            None => continue,
        };
        let (path, loc) = match rest.split_once(" [") {
            Some(p) => p,
            None => continue,
        };
        let line_no = loc
            .split([':', ' '])
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(1);
        records.push((
            "clone".to_string(),
            rel_to(root, path.trim()),
            line_no,
            "duplicated block detected".to_string(),
        ));
    }
    records
}

/// `1) src/a.js > src/b.js` circular-dependency lines.
fn parse_madge(output: &str, root: &Path) -> Vec<(String, String, usize, String)> {
    let mut records = Vec::new();
    for line in output.lines() {
        let t = line.trim();
        let body = match t.split_once(") ") {
            Some((n, body)) if n.chars().all(|c| c.is_ascii_digit()) => body,
            _ => continue,
        };
        if !body.contains(" > ") {
            continue;
        }
        let first = body.split(" > ").next().unwrap_or(body);
        records.push((
            "circular".to_string(),
            rel_to(root, first.trim()),
            1,
            format!("circular dependency: {body}"),
        ));
    }
    records
}

/// `path:line: warning: func has 23 CCN …` warning lines.
fn parse_lizard(output: &str, root: &Path) -> Vec<(String, String, usize, String)> {
    let mut records = Vec::new();
    for line in output.lines() {
        let t = line.trim();
        if !t.contains(": warning:") {
            continue;
        }
        let mut parts = t.splitn(3, ':');
        let path = match parts.next() {
            Some(p) => p,
            None => continue,
        };
        let line_no = parts.next().and_then(|n| n.trim().parse::<usize>().ok()).unwrap_or(1);
        let message = parts.next().map(|m| m.trim()).unwrap_or("complexity warning");
        records.push((
            "complexity".to_string(),
            rel_to(root, path),
            line_no,
            message.trim_start_matches("warning:").trim().to_string(),
        ));
    }
    records
}

fn parse_eslint(output: &str, root: &Path) -> Vec<(String, String, usize, String)> {
    let parsed: serde_json::Value = match serde_json::from_str(output) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let mut records = Vec::new();
    for entry in parsed.as_array().into_iter().flatten() {
        let file = entry["filePath"].as_str().unwrap_or("");
        for msg in entry["messages"].as_array().into_iter().flatten() {
            let rule = msg["ruleId"].as_str().unwrap_or("unknown").replace('/', "_");
            let line = msg["line"].as_u64().unwrap_or(1) as usize;
            let text = msg["message"].as_str().unwrap_or("").to_string();
            records.push((rule, rel_to(root, file), line, text));
        }
    }
    records
}

fn parse_ruff(output: &str, root: &Path) -> Vec<(String, String, usize, String)> {
    let parsed: serde_json::Value = match serde_json::from_str(output) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let mut records = Vec::new();
    for entry in parsed.as_array().into_iter().flatten() {
        let rule = entry["code"].as_str().unwrap_or("unknown").to_string();
        let file = entry["filename"].as_str().unwrap_or("");
        let line = entry["location"]["row"].as_u64().unwrap_or(1) as usize;
        let text = entry["message"].as_str().unwrap_or("").to_string();
        records.push((rule, rel_to(root, file), line, text));
    }
    records
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_madge_circular() {
        let out = "Processed 12 files\n1) src/a.js > src/b.js\n2) lib/x.js > lib/y.js > lib/x.js\n";
        let records = parse_madge(out, Path::new("/repo"));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "circular");
        assert_eq!(records[0].1, "src/a.js");
        assert!(records[1].3.contains("lib/y.js"));
    }

    #[test]
    fn test_parse_lizard_warning() {
        let out = "src/big.py:42: warning: process has 31 CCN\n";
        let records = parse_lizard(out, Path::new("/repo"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1, "src/big.py");
        assert_eq!(records[0].2, 42);
    }

    #[test]
    fn test_parse_eslint_json() {
        let out = r#"[{"filePath":"/repo/src/a.js","messages":[{"ruleId":"no-unused-vars","line":7,"message":"'x' is defined but never used."}]}]"#;
        let records = parse_eslint(out, Path::new("/repo"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "no-unused-vars");
        assert_eq!(records[0].1, "src/a.js");
        assert_eq!(records[0].2, 7);
    }

    #[test]
    fn test_parse_ruff_json() {
        let out = r#"[{"code":"F401","filename":"/repo/app.py","location":{"row":3,"column":1},"message":"os imported but unused"}]"#;
        let records = parse_ruff(out, Path::new("/repo"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "F401");
        assert_eq!(records[0].1, "app.py");
    }

    #[test]
    fn test_parse_jscpd_console() {
        let out = "Clone found (javascript):\n - src/a.js [12:1 - 24:1]\n - src/b.js [40:1 - 52:1]\n";
        let records = parse_jscpd(out, Path::new("/repo"));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].2, 12);
    }

    #[test]
    fn test_garbage_json_yields_no_records() {
        assert!(parse_eslint("not json at all", Path::new("/r")).is_empty());
        assert!(parse_ruff("{broken", Path::new("/r")).is_empty());
    }

    #[test]
    fn test_missing_tool_skipped_silently() {
        assert!(find_on_path("slopscope-no-such-tool-exists").is_none());
    }

    #[test]
    fn test_path_validation_rejects_metacharacters() {
        // Constructed path with a quote cannot be canonicalized into
        // existence here; validate against a real directory instead.
        let tmp = tempfile::tempdir().unwrap();
        assert!(validate_tool_path(tmp.path()).is_some());
        assert!(validate_tool_path(Path::new("/definitely/not/a/real/dir")).is_none());
    }
}
