//! Source Mask — per-byte classification of a file into code, line-comment,
//! block-comment, and string regions.
//!
//! One forward pass per file, expressed as an explicit state machine over
//! bytes. All delimiters of interest are ASCII, so byte scanning is safe on
//! UTF-8 input. The mask is shared by the Phase-1 engine (comment/string
//! gating) and all Phase-2 analyzers.

use crate::types::Language;

// ---------------------------------------------------------------------------
// Byte and line classifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteKind {
    Code,
    LineComment,
    BlockComment,
    Str,
}

impl ByteKind {
    pub fn is_comment(&self) -> bool {
        matches!(self, ByteKind::LineComment | ByteKind::BlockComment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Blank,
    Comment,
    Code,
}

// ---------------------------------------------------------------------------
// Language syntax profile
// ---------------------------------------------------------------------------

struct SyntaxProfile {
    line_comments: &'static [&'static str],
    /// `/* */` support; `nested` only for Rust.
    block_comments: bool,
    nested_blocks: bool,
    /// Quote characters that open an escaped string literal.
    quotes: &'static [u8],
    /// Triple-quote strings (`'''`, `"""`).
    triple_quotes: bool,
    /// Backtick: template literal (JS/TS, with escapes) or raw string (Go).
    backtick: BacktickKind,
    /// `r"…"` / `r#"…"#` raw strings (Rust) or `r'…'` prefix (Python).
    raw_prefix: bool,
}

#[derive(PartialEq)]
enum BacktickKind {
    None,
    Template,
    Raw,
}

fn profile_for(lang: Language) -> Option<SyntaxProfile> {
    match lang {
        Language::Js | Language::Ts => Some(SyntaxProfile {
            line_comments: &["//"],
            block_comments: true,
            nested_blocks: false,
            quotes: b"\"'",
            triple_quotes: false,
            backtick: BacktickKind::Template,
            raw_prefix: false,
        }),
        Language::Rust => Some(SyntaxProfile {
            line_comments: &["//"],
            block_comments: true,
            nested_blocks: true,
            quotes: b"\"",
            triple_quotes: false,
            backtick: BacktickKind::None,
            raw_prefix: true,
        }),
        Language::Python => Some(SyntaxProfile {
            line_comments: &["#"],
            block_comments: false,
            nested_blocks: false,
            quotes: b"\"'",
            triple_quotes: true,
            backtick: BacktickKind::None,
            raw_prefix: true,
        }),
        Language::Go => Some(SyntaxProfile {
            line_comments: &["//"],
            block_comments: true,
            nested_blocks: false,
            quotes: b"\"'",
            triple_quotes: false,
            backtick: BacktickKind::Raw,
            raw_prefix: false,
        }),
        Language::Java => Some(SyntaxProfile {
            line_comments: &["//"],
            block_comments: true,
            nested_blocks: false,
            quotes: b"\"'",
            triple_quotes: true,
            backtick: BacktickKind::None,
            raw_prefix: false,
        }),
        // Markdown and unknown files carry no comment/string structure.
        Language::Markdown | Language::Other => None,
    }
}

// ---------------------------------------------------------------------------
// The mask
// ---------------------------------------------------------------------------

pub struct SourceMask {
    kinds: Vec<ByteKind>,
}

enum Mode {
    Code,
    LineComment,
    BlockComment { depth: u32 },
    Str(StrState),
}

struct StrState {
    delim: u8,
    triple: bool,
    escapes: bool,
    /// `#` count for Rust raw strings (`r#"…"#`). Zero for plain quotes.
    hashes: usize,
}

impl SourceMask {
    /// Classify every byte of `content` in a single forward pass.
    pub fn compute(content: &str, lang: Language) -> SourceMask {
        let bytes = content.as_bytes();
        let mut kinds = vec![ByteKind::Code; bytes.len()];

        let profile = match profile_for(lang) {
            Some(p) => p,
            None => return SourceMask { kinds },
        };

        let mut mode = Mode::Code;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            match &mut mode {
                Mode::Code => {
                    // Line comment?
                    if let Some(prefix) =
                        profile.line_comments.iter().find(|p| bytes[i..].starts_with(p.as_bytes()))
                    {
                        // `/*` takes precedence over `//`? They cannot both
                        // match at one offset for the profiles above.
                        for k in kinds.iter_mut().skip(i).take(prefix.len()) {
                            *k = ByteKind::LineComment;
                        }
                        i += prefix.len();
                        mode = Mode::LineComment;
                        continue;
                    }
                    // Block comment?
                    if profile.block_comments && bytes[i..].starts_with(b"/*") {
                        kinds[i] = ByteKind::BlockComment;
                        kinds[i + 1] = ByteKind::BlockComment;
                        i += 2;
                        mode = Mode::BlockComment { depth: 1 };
                        continue;
                    }
                    // Rust raw string: r"…", r#"…"#, br"…".
                    if profile.raw_prefix && lang == Language::Rust && (b == b'r' || b == b'b') {
                        if let Some((consumed, hashes)) = rust_raw_open(&bytes[i..]) {
                            for k in kinds.iter_mut().skip(i).take(consumed) {
                                *k = ByteKind::Str;
                            }
                            i += consumed;
                            mode = Mode::Str(StrState {
                                delim: b'"',
                                triple: false,
                                escapes: false,
                                hashes,
                            });
                            continue;
                        }
                    }
                    // Backtick string (template literal or Go raw string).
                    if b == b'`' && profile.backtick != BacktickKind::None {
                        kinds[i] = ByteKind::Str;
                        i += 1;
                        mode = Mode::Str(StrState {
                            delim: b'`',
                            triple: false,
                            escapes: profile.backtick == BacktickKind::Template,
                            hashes: 0,
                        });
                        continue;
                    }
                    // Quoted string.
                    if profile.quotes.contains(&b) {
                        let triple = profile.triple_quotes && bytes[i..].starts_with(&[b, b, b]);
                        let open_len = if triple { 3 } else { 1 };
                        let raw = profile.raw_prefix
                            && lang == Language::Python
                            && python_raw_prefix(bytes, i);
                        for k in kinds.iter_mut().skip(i).take(open_len) {
                            *k = ByteKind::Str;
                        }
                        i += open_len;
                        mode = Mode::Str(StrState {
                            delim: b,
                            triple,
                            escapes: !raw,
                            hashes: 0,
                        });
                        continue;
                    }
                    i += 1;
                }
                Mode::LineComment => {
                    if b == b'\n' {
                        mode = Mode::Code;
                        i += 1;
                    } else {
                        kinds[i] = ByteKind::LineComment;
                        i += 1;
                    }
                }
                Mode::BlockComment { depth } => {
                    if profile.nested_blocks && bytes[i..].starts_with(b"/*") {
                        kinds[i] = ByteKind::BlockComment;
                        kinds[i + 1] = ByteKind::BlockComment;
                        *depth += 1;
                        i += 2;
                    } else if bytes[i..].starts_with(b"*/") {
                        kinds[i] = ByteKind::BlockComment;
                        kinds[i + 1] = ByteKind::BlockComment;
                        *depth -= 1;
                        i += 2;
                        if *depth == 0 {
                            mode = Mode::Code;
                        }
                    } else {
                        kinds[i] = ByteKind::BlockComment;
                        i += 1;
                    }
                }
                Mode::Str(st) => {
                    kinds[i] = ByteKind::Str;
                    if st.escapes && b == b'\\' && i + 1 < bytes.len() {
                        kinds[i + 1] = ByteKind::Str;
                        i += 2;
                        continue;
                    }
                    if b == st.delim {
                        if st.triple {
                            if bytes[i..].starts_with(&[st.delim, st.delim, st.delim]) {
                                kinds[i + 1] = ByteKind::Str;
                                kinds[i + 2] = ByteKind::Str;
                                i += 3;
                                mode = Mode::Code;
                                continue;
                            }
                        } else if st.hashes > 0 {
                            let tail = &bytes[i + 1..];
                            if tail.len() >= st.hashes
                                && tail[..st.hashes].iter().all(|&c| c == b'#')
                            {
                                for k in kinds.iter_mut().skip(i + 1).take(st.hashes) {
                                    *k = ByteKind::Str;
                                }
                                i += 1 + st.hashes;
                                mode = Mode::Code;
                                continue;
                            }
                        } else {
                            i += 1;
                            mode = Mode::Code;
                            continue;
                        }
                    }
                    // Unterminated single-line strings end at the newline for
                    // non-triple, non-raw literals; keeps one bad quote from
                    // swallowing the rest of the file.
                    if b == b'\n' && !st.triple && st.hashes == 0 && st.delim != b'`' {
                        kinds[i] = ByteKind::Code;
                        mode = Mode::Code;
                    }
                    i += 1;
                }
            }
        }

        SourceMask { kinds }
    }

    pub fn kind(&self, offset: usize) -> ByteKind {
        self.kinds.get(offset).copied().unwrap_or(ByteKind::Code)
    }

    pub fn is_comment(&self, offset: usize) -> bool {
        self.kind(offset).is_comment()
    }

    pub fn is_string(&self, offset: usize) -> bool {
        self.kind(offset) == ByteKind::Str
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Classify each line as blank, comment-only, or code. String-only lines
    /// count as code; docstring handling is the function parser's concern.
    pub fn classify_lines(&self, content: &str) -> Vec<LineClass> {
        let index = line_index(content);
        let bytes = content.as_bytes();
        let mut classes = Vec::with_capacity(index.len());

        for (n, &start) in index.iter().enumerate() {
            let end = index.get(n + 1).copied().unwrap_or(bytes.len());
            let mut saw_comment = false;
            let mut saw_code = false;
            for off in start..end {
                let b = bytes[off];
                if b.is_ascii_whitespace() {
                    continue;
                }
                match self.kind(off) {
                    ByteKind::LineComment | ByteKind::BlockComment => saw_comment = true,
                    ByteKind::Code | ByteKind::Str => saw_code = true,
                }
            }
            classes.push(if saw_code {
                LineClass::Code
            } else if saw_comment {
                LineClass::Comment
            } else {
                LineClass::Blank
            });
        }
        classes
    }
}

/// Recognize `r"`, `r#"`, `br"`, `rb"` … at the start of `bytes`.
/// Returns (bytes consumed through the opening quote, hash count).
fn rust_raw_open(bytes: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    if bytes.get(i) == Some(&b'b') {
        i += 1;
    }
    if bytes.get(i) != Some(&b'r') {
        return None;
    }
    i += 1;
    let mut hashes = 0;
    while bytes.get(i) == Some(&b'#') {
        hashes += 1;
        i += 1;
    }
    if bytes.get(i) == Some(&b'"') {
        Some((i + 1, hashes))
    } else {
        None
    }
}

/// A quote at `at` is a Python raw string if an identifier-prefix of string
/// flags (r/b/f/u) immediately precedes it and includes `r`.
fn python_raw_prefix(bytes: &[u8], at: usize) -> bool {
    let mut j = at;
    let mut saw_r = false;
    while j > 0 {
        let c = bytes[j - 1].to_ascii_lowercase();
        if matches!(c, b'r' | b'b' | b'f' | b'u') {
            if c == b'r' {
                saw_r = true;
            }
            j -= 1;
        } else {
            break;
        }
    }
    if !saw_r || at - j > 2 {
        return false;
    }
    // The prefix must not be the tail of a longer identifier.
    j == 0 || !(bytes[j - 1].is_ascii_alphanumeric() || bytes[j - 1] == b'_')
}

// ---------------------------------------------------------------------------
// Line offsets
// ---------------------------------------------------------------------------

/// Byte offset of the start of each line.
pub fn line_index(content: &str) -> Vec<usize> {
    let mut index = vec![0];
    for (i, b) in content.bytes().enumerate() {
        if b == b'\n' && i + 1 < content.len() {
            index.push(i + 1);
        }
    }
    index
}

/// 1-based line number containing byte `offset`.
pub fn line_of(index: &[usize], offset: usize) -> usize {
    match index.binary_search(&offset) {
        Ok(n) => n + 1,
        Err(n) => n,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_at(mask: &SourceMask, content: &str, needle: &str) -> ByteKind {
        let off = content.find(needle).expect("needle present");
        mask.kind(off)
    }

    #[test]
    fn test_line_comment_marked() {
        let src = "let x = 1; // trailing note\nlet y = 2;\n";
        let mask = SourceMask::compute(src, Language::Rust);
        assert_eq!(kinds_at(&mask, src, "trailing"), ByteKind::LineComment);
        assert_eq!(kinds_at(&mask, src, "let y"), ByteKind::Code);
    }

    #[test]
    fn test_comment_inside_string_is_string() {
        // A comment marker inside a string literal must not be
        // classified as a comment.
        let src = "const s = \"// not a comment\";\n";
        let mask = SourceMask::compute(src, Language::Js);
        assert_eq!(kinds_at(&mask, src, "// not"), ByteKind::Str);
    }

    #[test]
    fn test_string_inside_comment_is_comment() {
        let src = "// say \"hello\"\nlet x = 1;\n";
        let mask = SourceMask::compute(src, Language::Rust);
        assert_eq!(kinds_at(&mask, src, "\"hello\""), ByteKind::LineComment);
    }

    #[test]
    fn test_nested_block_comment_rust() {
        let src = "/* outer /* inner */ still comment */ let x = 1;\n";
        let mask = SourceMask::compute(src, Language::Rust);
        assert_eq!(kinds_at(&mask, src, "still"), ByteKind::BlockComment);
        assert_eq!(kinds_at(&mask, src, "let x"), ByteKind::Code);
    }

    #[test]
    fn test_unnested_block_comment_go() {
        let src = "/* a /* b */ code();\n";
        let mask = SourceMask::compute(src, Language::Go);
        assert_eq!(kinds_at(&mask, src, "code"), ByteKind::Code);
    }

    #[test]
    fn test_escaped_quote_does_not_close() {
        let src = r#"let s = "a \" b"; let t = 1;"#;
        let mask = SourceMask::compute(src, Language::Rust);
        assert_eq!(kinds_at(&mask, src, "b\""), ByteKind::Str);
        assert_eq!(kinds_at(&mask, src, "let t"), ByteKind::Code);
    }

    #[test]
    fn test_rust_raw_string_hashes() {
        let src = r##"let s = r#"quote " inside"#; let t = 1;"##;
        let mask = SourceMask::compute(src, Language::Rust);
        assert_eq!(kinds_at(&mask, src, "inside"), ByteKind::Str);
        assert_eq!(kinds_at(&mask, src, "let t"), ByteKind::Code);
    }

    #[test]
    fn test_python_triple_quote() {
        let src = "x = \"\"\"docstring\nwith # not a comment\n\"\"\"\ny = 1  # real\n";
        let mask = SourceMask::compute(src, Language::Python);
        assert_eq!(kinds_at(&mask, src, "# not"), ByteKind::Str);
        assert_eq!(kinds_at(&mask, src, "# real"), ByteKind::LineComment);
    }

    #[test]
    fn test_python_hash_comment() {
        let src = "x = 1  # note\n";
        let mask = SourceMask::compute(src, Language::Python);
        assert_eq!(kinds_at(&mask, src, "# note"), ByteKind::LineComment);
        assert_eq!(kinds_at(&mask, src, "x ="), ByteKind::Code);
    }

    #[test]
    fn test_js_template_literal() {
        let src = "const s = `hello // ${name}`;\nconst t = 1;\n";
        let mask = SourceMask::compute(src, Language::Js);
        assert_eq!(kinds_at(&mask, src, "// $"), ByteKind::Str);
        assert_eq!(kinds_at(&mask, src, "const t"), ByteKind::Code);
    }

    #[test]
    fn test_go_raw_backtick_string() {
        let src = "s := `raw \\ no escapes`\nt := 1\n";
        let mask = SourceMask::compute(src, Language::Go);
        assert_eq!(kinds_at(&mask, src, "raw"), ByteKind::Str);
        assert_eq!(kinds_at(&mask, src, "t :="), ByteKind::Code);
    }

    #[test]
    fn test_markdown_all_code() {
        let src = "# Heading\nSome `code` text // not a comment\n";
        let mask = SourceMask::compute(src, Language::Markdown);
        assert_eq!(kinds_at(&mask, src, "# Heading"), ByteKind::Code);
        assert_eq!(kinds_at(&mask, src, "// not"), ByteKind::Code);
    }

    #[test]
    fn test_classify_lines() {
        let src = "// only comment\n\nlet x = 1; // mixed\n";
        let mask = SourceMask::compute(src, Language::Rust);
        let classes = mask.classify_lines(src);
        assert_eq!(classes[0], LineClass::Comment);
        assert_eq!(classes[1], LineClass::Blank);
        assert_eq!(classes[2], LineClass::Code);
    }

    #[test]
    fn test_line_of() {
        let src = "a\nbb\nccc\n";
        let index = line_index(src);
        assert_eq!(line_of(&index, 0), 1);
        assert_eq!(line_of(&index, 2), 2);
        assert_eq!(line_of(&index, 5), 3);
    }

    #[test]
    fn test_unterminated_string_stops_at_newline() {
        let src = "let s = \"oops\nlet t = 1; // comment\n";
        let mask = SourceMask::compute(src, Language::Rust);
        assert_eq!(kinds_at(&mask, src, "// comment"), ByteKind::LineComment);
    }
}
