//! Shallow function parser — locates function headers per language and
//! extracts the following brace-delimited or indentation-delimited body.
//!
//! This is not an AST. It is the minimum structure the Phase-2 analyzers
//! need: header line, body extent, and doc/comment/code line counts, all
//! computed against the Source Mask so strings and nested braces do not
//! confuse the walk. When body extraction fails, the function is dropped
//! and no findings are derived from it.

use crate::mask::{line_index, line_of, ByteKind, LineClass, SourceMask};
use crate::types::Language;
use regex::Regex;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Function span
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FunctionSpan {
    pub name: String,
    /// 1-based line of the header.
    pub header_line: usize,
    /// 1-based first and last line of the body (interior of the braces for
    /// brace languages; the indented suite for Python).
    pub body_start_line: usize,
    pub body_end_line: usize,
    /// Byte offsets of the body braces, when brace-delimited.
    pub brace_span: Option<(usize, usize)>,
    /// Documentation block immediately preceding the header (or the leading
    /// docstring for Python).
    pub doc_lines: usize,
    /// Of `doc_lines`, how many live inside the body (the docstring).
    pub body_doc_lines: usize,
    /// Non-blank, non-comment body lines.
    pub code_lines: usize,
    /// Comment-only body lines.
    pub comment_lines: usize,
}

// ---------------------------------------------------------------------------
// Header recognition
// ---------------------------------------------------------------------------

fn rust_headers() -> &'static Vec<Regex> {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        vec![Regex::new(
            r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?(?:const\s+)?(?:extern\s+\S+\s+)?fn\s+(\w+)",
        )
        .unwrap()]
    })
}

fn js_headers() -> &'static Vec<Regex> {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        vec![
            Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)?\s*\(")
                .unwrap(),
            // const f = (a, b) => { … }   /   const f = async a => { … }
            Regex::new(
                r"^\s*(?:export\s+)?(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s+)?(?:\([^)]*\)|\w+)\s*=>\s*\{",
            )
            .unwrap(),
            // class method shorthand: name(args) {
            Regex::new(r"^\s*(?:public\s+|private\s+|protected\s+|static\s+|async\s+)*(\w+)\s*\([^)]*\)\s*\{")
                .unwrap(),
        ]
    })
}

fn python_headers() -> &'static Vec<Regex> {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| vec![Regex::new(r"^(\s*)(?:async\s+)?def\s+(\w+)\s*\(").unwrap()])
}

fn go_headers() -> &'static Vec<Regex> {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| vec![Regex::new(r"^\s*func\s+(?:\([^)]*\)\s*)?(\w+)\s*\(").unwrap()])
}

fn java_headers() -> &'static Vec<Regex> {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        vec![Regex::new(
            r"^\s*(?:(?:public|private|protected|static|final|abstract|synchronized|native)\s+)+[\w<>\[\],\s]*?\s(\w+)\s*\([^)]*\)\s*(?:throws\s+[\w.,\s]+)?\{?\s*$",
        )
        .unwrap()]
    })
}

/// Names that header regexes can capture but that are control flow.
const KEYWORD_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "else", "match", "loop", "do", "new",
];

fn headers_for(lang: Language) -> Option<&'static Vec<Regex>> {
    match lang {
        Language::Rust => Some(rust_headers()),
        Language::Js | Language::Ts => Some(js_headers()),
        Language::Python => Some(python_headers()),
        Language::Go => Some(go_headers()),
        Language::Java => Some(java_headers()),
        Language::Markdown | Language::Other => None,
    }
}

// ---------------------------------------------------------------------------
// Brace matching
// ---------------------------------------------------------------------------

/// Find the offset of the `}` matching the `{` at `open`, counting only
/// code-kind braces.
fn matching_brace(content: &str, mask: &SourceMask, open: usize) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if mask.kind(i) != ByteKind::Code {
            continue;
        }
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// First code-kind `{` at or after `from`, stopping after `max_lines` lines.
/// A code-kind `;` before the brace means a bodiless declaration.
fn find_open_brace(
    content: &str,
    mask: &SourceMask,
    from: usize,
    max_lines: usize,
) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut lines_seen = 0;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        if b == b'\n' {
            lines_seen += 1;
            if lines_seen > max_lines {
                return None;
            }
        }
        if mask.kind(i) != ByteKind::Code {
            continue;
        }
        match b {
            b'{' => return Some(i),
            b';' => return None,
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Doc blocks
// ---------------------------------------------------------------------------

/// Count the contiguous documentation block ending on the line just above
/// `header_line` (1-based). Attribute/decorator lines are stepped over.
fn doc_block_above(lines: &[&str], header_line: usize) -> usize {
    let mut i = header_line.saturating_sub(1); // index of line above header
    if i == 0 {
        return 0;
    }
    i -= 1; // to 0-based index of the line above

    // Step over attributes and decorators between doc and header.
    loop {
        let t = lines.get(i).map(|l| l.trim()).unwrap_or("");
        if t.starts_with("#[") || t.starts_with('@') {
            if i == 0 {
                return 0;
            }
            i -= 1;
        } else {
            break;
        }
    }

    let t = lines.get(i).map(|l| l.trim()).unwrap_or("");
    // Block comment ending here: walk up to its opener.
    if t.ends_with("*/") {
        let mut count = 0;
        loop {
            count += 1;
            let lt = lines[i].trim();
            if lt.starts_with("/*") {
                return count;
            }
            if i == 0 {
                return 0; // opener never found; not a doc block
            }
            i -= 1;
        }
    }
    // Contiguous line-comment block: ///, //!, //, #.
    let mut count = 0;
    loop {
        let lt = lines.get(i).map(|l| l.trim()).unwrap_or("");
        if lt.starts_with("///") || lt.starts_with("//!") || lt.starts_with("//") || lt.starts_with('#')
        {
            count += 1;
            if i == 0 {
                break;
            }
            i -= 1;
        } else {
            break;
        }
    }
    count
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Locate all functions in a file. `classes` is the per-line classification
/// from [`SourceMask::classify_lines`].
pub fn functions_in(
    content: &str,
    lang: Language,
    mask: &SourceMask,
    classes: &[LineClass],
) -> Vec<FunctionSpan> {
    let headers = match headers_for(lang) {
        Some(h) => h,
        None => return Vec::new(),
    };
    let lines: Vec<&str> = content.lines().collect();
    let index = line_index(content);
    let mut spans = Vec::new();

    for (n, line) in lines.iter().enumerate() {
        // Headers inside comments or strings are not headers.
        if classes.get(n) != Some(&LineClass::Code) {
            continue;
        }
        let line_off = index[n];
        if let Some(first) = line.find(|c: char| !c.is_whitespace()) {
            if mask.kind(line_off + first) != ByteKind::Code {
                continue;
            }
        }

        let captures = headers.iter().find_map(|re| re.captures(line));
        let captures = match captures {
            Some(c) => c,
            None => continue,
        };
        let name = captures
            .iter()
            .skip(1)
            .flatten()
            .last()
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        if KEYWORD_NAMES.contains(&name.as_str()) {
            continue;
        }

        let span = match lang {
            Language::Python => python_body(&lines, classes, n, &name),
            _ => brace_body(content, mask, classes, &index, &lines, n, &name),
        };
        if let Some(span) = span {
            spans.push(span);
        }
    }
    spans
}

fn brace_body(
    content: &str,
    mask: &SourceMask,
    classes: &[LineClass],
    index: &[usize],
    lines: &[&str],
    header_idx: usize,
    name: &str,
) -> Option<FunctionSpan> {
    let header_line = header_idx + 1;
    let open = find_open_brace(content, mask, index[header_idx], 4)?;
    let close = matching_brace(content, mask, open)?;

    let open_line = line_of(index, open);
    let close_line = line_of(index, close);

    // Interior lines strictly between the brace lines; a one-line body
    // counts as a single code line when anything sits between the braces.
    let (body_start, body_end, code, comments) = if open_line == close_line {
        let interior = &content[open + 1..close];
        let code = if interior.trim().is_empty() { 0 } else { 1 };
        (open_line, close_line, code, 0)
    } else {
        let first = open_line + 1;
        let last = close_line.saturating_sub(1);
        let mut code = 0;
        let mut comments = 0;
        for ln in first..=last {
            match classes.get(ln - 1) {
                Some(LineClass::Code) => code += 1,
                Some(LineClass::Comment) => comments += 1,
                _ => {}
            }
        }
        (first, last.max(first), code, comments)
    };

    Some(FunctionSpan {
        name: name.to_string(),
        header_line,
        body_start_line: body_start,
        body_end_line: body_end,
        brace_span: Some((open, close)),
        doc_lines: doc_block_above(lines, header_line),
        body_doc_lines: 0,
        code_lines: code,
        comment_lines: comments,
    })
}

fn python_body(
    lines: &[&str],
    classes: &[LineClass],
    header_idx: usize,
    name: &str,
) -> Option<FunctionSpan> {
    let header = lines[header_idx];
    let header_indent = header.len() - header.trim_start().len();

    // Multi-line signatures: advance to the line whose trimmed form ends
    // with `:` (bounded lookahead).
    let mut sig_end = header_idx;
    while sig_end < lines.len() && !lines[sig_end].trim_end().ends_with(':') {
        sig_end += 1;
        if sig_end > header_idx + 6 {
            return None;
        }
    }

    let mut body_start = sig_end + 1;
    while body_start < lines.len() && lines[body_start].trim().is_empty() {
        body_start += 1;
    }
    if body_start >= lines.len() {
        return None;
    }
    let body_indent = lines[body_start].len() - lines[body_start].trim_start().len();
    if body_indent <= header_indent {
        return None; // no indented suite
    }

    let mut body_end = body_start;
    let mut n = body_start;
    while n < lines.len() {
        let line = lines[n];
        if line.trim().is_empty() {
            n += 1;
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        if indent <= header_indent {
            break;
        }
        body_end = n;
        n += 1;
    }

    // Leading docstring: contiguous run of string-only lines at body start.
    let mut docstring = 0;
    let first = lines[body_start].trim();
    if first.starts_with("\"\"\"") || first.starts_with("'''") || first.starts_with("r\"\"\"") {
        let delim = if first.contains("'''") { "'''" } else { "\"\"\"" };
        let rest = &first[first.find(delim).unwrap() + 3..];
        if rest.contains(delim) {
            docstring = 1;
        } else {
            let mut k = body_start;
            while k <= body_end {
                docstring += 1;
                if k > body_start && lines[k].contains(delim) {
                    break;
                }
                k += 1;
            }
        }
    }

    let mut code = 0;
    let mut comments = 0;
    for (offset, ln) in (body_start..=body_end).enumerate() {
        // Docstring lines are documentation, not code.
        if offset < docstring {
            continue;
        }
        match classes.get(ln) {
            Some(LineClass::Code) => code += 1,
            Some(LineClass::Comment) => comments += 1,
            _ => {}
        }
    }

    Some(FunctionSpan {
        name: name.to_string(),
        header_line: header_idx + 1,
        body_start_line: body_start + 1,
        body_end_line: body_end + 1,
        brace_span: None,
        // Comment block above the header also documents the function.
        doc_lines: docstring + doc_block_above(lines, header_idx + 1),
        body_doc_lines: docstring,
        code_lines: code,
        comment_lines: comments,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str, lang: Language) -> Vec<FunctionSpan> {
        let mask = SourceMask::compute(content, lang);
        let classes = mask.classify_lines(content);
        functions_in(content, lang, &mask, &classes)
    }

    #[test]
    fn test_rust_function_with_doc() {
        let src = "\
/// Adds one.
/// Returns the result.
pub fn add_one(x: u32) -> u32 {
    let y = x + 1;
    y
}
";
        let fns = parse(src, Language::Rust);
        assert_eq!(fns.len(), 1);
        let f = &fns[0];
        assert_eq!(f.name, "add_one");
        assert_eq!(f.header_line, 3);
        assert_eq!(f.doc_lines, 2);
        assert_eq!(f.code_lines, 2);
    }

    #[test]
    fn test_doc_block_skips_attributes() {
        let src = "\
/// Documented.
#[inline]
pub fn fast(x: u32) -> u32 {
    x
}
";
        let fns = parse(src, Language::Rust);
        assert_eq!(fns[0].doc_lines, 1);
    }

    #[test]
    fn test_jsdoc_block_counted() {
        let src = "\
/**
 * Greets.
 * @param name who
 */
function greet(name) {
  console.log(name);
  return name;
}
";
        let fns = parse(src, Language::Js);
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].doc_lines, 4);
        assert_eq!(fns[0].header_line, 5);
        assert_eq!(fns[0].code_lines, 2);
    }

    #[test]
    fn test_arrow_function_header() {
        let src = "const handler = async (req) => {\n  respond(req);\n};\n";
        let fns = parse(src, Language::Ts);
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].name, "handler");
    }

    #[test]
    fn test_python_def_with_docstring() {
        let src = "\
def compute(x):
    \"\"\"Explains.

    At length.
    \"\"\"
    y = x * 2
    return y
";
        let fns = parse(src, Language::Python);
        assert_eq!(fns.len(), 1);
        let f = &fns[0];
        assert_eq!(f.name, "compute");
        assert_eq!(f.doc_lines, 4);
        assert_eq!(f.code_lines, 2);
    }

    #[test]
    fn test_python_nested_def_bounds() {
        let src = "\
def outer():
    x = 1
    def inner():
        return x
    return inner
";
        let fns = parse(src, Language::Python);
        assert_eq!(fns.len(), 2);
        assert_eq!(fns[0].name, "outer");
        assert_eq!(fns[0].body_end_line, 5);
        assert_eq!(fns[1].name, "inner");
        assert_eq!(fns[1].body_end_line, 4);
    }

    #[test]
    fn test_nested_braces_matched_through_strings() {
        let src = "fn tricky() {\n    let s = \"} not a close\";\n    body();\n}\n";
        let fns = parse(src, Language::Rust);
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].body_end_line, 3);
        assert_eq!(fns[0].code_lines, 2);
    }

    #[test]
    fn test_bodiless_declaration_skipped() {
        let src = "trait T {\n    fn declared(&self) -> u32;\n}\n";
        let fns = parse(src, Language::Rust);
        assert!(fns.is_empty());
    }

    #[test]
    fn test_header_in_comment_ignored() {
        let src = "// fn ghost() {\nfn real() {\n    work();\n}\n";
        let fns = parse(src, Language::Rust);
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].name, "real");
    }

    #[test]
    fn test_go_method_receiver() {
        let src = "func (s *Server) Handle(w io.Writer) {\n\ts.count++\n}\n";
        let fns = parse(src, Language::Go);
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].name, "Handle");
    }

    #[test]
    fn test_unclosed_body_yields_nothing() {
        let src = "fn broken() {\n    let x = 1;\n"; // never closed
        let fns = parse(src, Language::Rust);
        assert!(fns.is_empty());
    }
}
