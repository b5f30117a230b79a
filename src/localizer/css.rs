//! Structural scanner for stylesheets.
//!
//! Walks rules and declarations just far enough to find the `url(...)`
//! references that point at fetchable resources. Anything structurally
//! broken (unbalanced braces or parentheses, unterminated strings or
//! comments, declarations without a colon) is a [`CssError`], and callers
//! keep the stylesheet as it was.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::localizer::AssetKind;

static URL_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\burl\(\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)'|([^)"'\s]*))\s*\)"#)
        .unwrap()
});
static IMPORT_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^@import\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#).unwrap()
});

/// At-rules whose block holds rules rather than declarations.
const GROUP_RULES: &[&str] = &[
    "media",
    "supports",
    "document",
    "-moz-document",
    "layer",
    "container",
    "scope",
    "starting-style",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CssError {
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),

    #[error("unterminated string at byte {0}")]
    UnterminatedString(usize),

    #[error("unbalanced '{0}' at byte {1}")]
    Unbalanced(char, usize),

    #[error("unclosed block at byte {0}")]
    UnclosedBlock(usize),

    #[error("rule without terminator at byte {0}")]
    UnterminatedRule(usize),

    #[error("invalid declaration at byte {0}")]
    InvalidDeclaration(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Asset(AssetKind),
    Import,
}

/// A resource reference and the byte range of the token to replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRef {
    pub span: Range<usize>,
    pub url: String,
    pub kind: RefKind,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DeclMode {
    Style,
    FontFace,
}

/// Every resource reference in `css`, in source order.
pub fn find_references(css: &str) -> Result<Vec<UrlRef>, CssError> {
    let mut scanner = Scanner {
        src: css,
        bytes: css.as_bytes(),
        refs: Vec::new(),
    };
    scanner.rules(0, css.len())?;
    Ok(scanner.refs)
}

/// Replace each span with its text. Spans must not overlap.
pub fn splice(css: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(css.len());
    let mut cursor = 0;
    for (span, text) in edits {
        out.push_str(&css[cursor..span.start]);
        out.push_str(&text);
        cursor = span.end;
    }
    out.push_str(&css[cursor..]);
    out
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    refs: Vec<UrlRef>,
}

impl Scanner<'_> {
    /// A list of rules: the top level, or the body of a group at-rule.
    fn rules(&mut self, start: usize, end: usize) -> Result<(), CssError> {
        let mut i = start;
        loop {
            i = self.skip_trivia(i, end)?;
            if i >= end {
                return Ok(());
            }

            let stop = self.scan_to(i, end, b"{};")?;
            if stop >= end {
                return Err(CssError::UnterminatedRule(i));
            }

            match self.bytes[stop] {
                b'}' => return Err(CssError::Unbalanced('}', stop)),
                b';' => {
                    self.statement(i, stop)?;
                    i = stop + 1;
                }
                _ => {
                    let close = self.block_end(stop, end)?;
                    self.rule(i, stop, close)?;
                    i = close + 1;
                }
            }
        }
    }

    /// A rule with a `{ ... }` block; `open` and `close` index the braces.
    fn rule(&mut self, start: usize, open: usize, close: usize) -> Result<(), CssError> {
        let src = self.src;
        let prelude = src[start..open].trim();

        let Some(at_rule) = prelude.strip_prefix('@') else {
            return self.declarations(open + 1, close, DeclMode::Style);
        };

        let name = at_name(at_rule);
        if name == "font-face" {
            self.declarations(open + 1, close, DeclMode::FontFace)
        } else if GROUP_RULES.contains(&name.as_str()) || name.ends_with("keyframes") {
            self.rules(open + 1, close)
        } else {
            self.declarations(open + 1, close, DeclMode::Style)
        }
    }

    /// A `;` terminated statement outside any declaration block.
    fn statement(&mut self, start: usize, stop: usize) -> Result<(), CssError> {
        let src = self.src;
        let text = &src[start..stop];
        if text.trim().is_empty() {
            return Ok(());
        }
        let Some(at_rule) = text.strip_prefix('@') else {
            return Err(CssError::InvalidDeclaration(start));
        };

        if at_name(at_rule) != "import" {
            return Ok(());
        }

        if let Some(found) = URL_TOKEN.captures(text) {
            self.push_capture(start, &found, RefKind::Import);
        } else if let Some(found) = IMPORT_STRING.captures(text) {
            let Some(literal) = found.get(1).or_else(|| found.get(2)) else {
                return Ok(());
            };
            // Replace the quoted string including its quotes.
            self.refs.push(UrlRef {
                span: start + literal.start() - 1..start + literal.end() + 1,
                url: unescape(literal.as_str()),
                kind: RefKind::Import,
            });
        }
        Ok(())
    }

    /// Declarations, possibly interleaved with nested rules.
    fn declarations(&mut self, start: usize, end: usize, mode: DeclMode) -> Result<(), CssError> {
        let mut i = start;
        loop {
            i = self.skip_trivia(i, end)?;
            if i >= end {
                return Ok(());
            }

            let stop = self.scan_to(i, end, b";{")?;
            if stop < end && self.bytes[stop] == b'{' {
                let close = self.block_end(stop, end)?;
                self.rule(i, stop, close)?;
                i = close + 1;
                continue;
            }

            self.declaration(i, stop, mode)?;
            i = stop + 1;
        }
    }

    fn declaration(&mut self, start: usize, stop: usize, mode: DeclMode) -> Result<(), CssError> {
        let src = self.src;
        let text = &src[start..stop];
        if text.trim().is_empty() {
            return Ok(());
        }
        let Some(colon) = text.find(':') else {
            return Err(CssError::InvalidDeclaration(start));
        };

        let name = text[..colon].trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(CssError::InvalidDeclaration(start));
        }

        let kind = match mode {
            DeclMode::FontFace if name.eq_ignore_ascii_case("src") => AssetKind::Font,
            DeclMode::FontFace => return Ok(()),
            DeclMode::Style => AssetKind::Image,
        };

        let value_start = start + colon + 1;
        let value = &src[value_start..stop];
        for found in URL_TOKEN.captures_iter(value) {
            self.push_capture(value_start, &found, RefKind::Asset(kind));
        }
        Ok(())
    }

    fn push_capture(&mut self, offset: usize, found: &regex::Captures<'_>, kind: RefKind) {
        let Some(whole) = found.get(0) else {
            return;
        };
        let raw = found
            .get(1)
            .or_else(|| found.get(2))
            .or_else(|| found.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let url = unescape(raw.trim());
        if url.is_empty() {
            return;
        }

        self.refs.push(UrlRef {
            span: offset + whole.start()..offset + whole.end(),
            url,
            kind,
        });
    }

    /// Index just past a comment or string starting at `i`, if one does.
    fn skip_opaque(&self, i: usize, end: usize) -> Result<Option<usize>, CssError> {
        match self.bytes[i] {
            b'/' if i + 1 < end && self.bytes[i + 1] == b'*' => {
                let mut j = i + 2;
                while j + 1 < end {
                    if self.bytes[j] == b'*' && self.bytes[j + 1] == b'/' {
                        return Ok(Some(j + 2));
                    }
                    j += 1;
                }
                Err(CssError::UnterminatedComment(i))
            }
            quote @ (b'"' | b'\'') => {
                let mut j = i + 1;
                while j < end {
                    match self.bytes[j] {
                        b'\\' => j += 2,
                        b'\n' => return Err(CssError::UnterminatedString(i)),
                        c if c == quote => return Ok(Some(j + 1)),
                        _ => j += 1,
                    }
                }
                Err(CssError::UnterminatedString(i))
            }
            _ => Ok(None),
        }
    }

    /// Skip whitespace, comments and HTML comment markers.
    fn skip_trivia(&self, mut i: usize, end: usize) -> Result<usize, CssError> {
        while i < end {
            let rest = &self.bytes[i..end];
            if rest[0].is_ascii_whitespace() {
                i += 1;
            } else if rest.starts_with(b"/*") {
                i = self.skip_opaque(i, end)?.unwrap_or(end);
            } else if rest.starts_with(b"<!--") {
                i += 4;
            } else if rest.starts_with(b"-->") {
                i += 3;
            } else {
                break;
            }
        }
        Ok(i)
    }

    /// First byte in `stops` outside parentheses, brackets, strings and
    /// comments; `end` when there is none.
    fn scan_to(&self, mut i: usize, end: usize, stops: &[u8]) -> Result<usize, CssError> {
        let mut nesting: Vec<(u8, usize)> = Vec::new();
        while i < end {
            if let Some(next) = self.skip_opaque(i, end)? {
                i = next;
                continue;
            }

            let c = self.bytes[i];
            match c {
                b'(' => nesting.push((b')', i)),
                b'[' => nesting.push((b']', i)),
                b')' | b']' => match nesting.pop() {
                    Some((expected, _)) if expected == c => {}
                    _ => return Err(CssError::Unbalanced(c as char, i)),
                },
                _ if nesting.is_empty() && stops.contains(&c) => return Ok(i),
                _ => {}
            }
            i += 1;
        }

        match nesting.pop() {
            Some((_, at)) => Err(CssError::Unbalanced(self.bytes[at] as char, at)),
            None => Ok(end),
        }
    }

    /// Index of the `}` matching the `{` at `open`.
    fn block_end(&self, open: usize, end: usize) -> Result<usize, CssError> {
        let mut depth = 0usize;
        let mut i = open;
        while i < end {
            if let Some(next) = self.skip_opaque(i, end)? {
                i = next;
                continue;
            }
            match self.bytes[i] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err(CssError::UnclosedBlock(open))
    }
}

/// Lowercased at-rule name, without the leading `@`.
fn at_name(at_rule: &str) -> String {
    at_rule
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | '{' | ';' | '"' | '\''))
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Drop backslashes used as simple escapes.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
