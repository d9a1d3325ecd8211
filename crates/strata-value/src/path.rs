//! Path expressions over configuration trees.
//!
//! Two surface syntaxes are accepted and auto-detected: dotted
//! (`a.b[2].c`) and slash-separated (`a/b/2/c`). Search patterns `*`
//! (exactly one level), `[*]` (any sequence index) and `**` (recursive
//! descent, zero or more levels) are supported, as are relative anchors:
//! a leading `./` binds the path to the current file's root and each
//! leading `../` climbs one imported-file level.

use crate::error::{Result, ValueError};
use std::fmt;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Map key.
    Key(String),

    /// Sequence index (`[N]`, or a bare integer in slash syntax).
    Index(usize),

    /// `*`: every key or index at exactly one level.
    AnyKey,

    /// `[*]`: every index of a sequence.
    AnyIndex,

    /// `**`: recursive descent, zero or more levels.
    Deep,
}

impl Segment {
    /// True for `*`, `[*]` and `**`.
    pub fn is_pattern(&self) -> bool {
        matches!(self, Segment::AnyKey | Segment::AnyIndex | Segment::Deep)
    }
}

/// What a path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Absolute, from the overall document root (the default).
    Document,

    /// Relative to a file root: `up == 0` is the current file (`./`),
    /// each additional `../` climbs one importing-file level.
    File { up: usize },
}

/// An immutable, parsed path expression.
///
/// Parsing is total: it succeeds or fails with a syntax error, and is
/// independent of any tree the path will later be evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    anchor: Anchor,
    segments: Vec<Segment>,
}

impl ConfigPath {
    /// The empty absolute path (the document root).
    pub fn root() -> Self {
        ConfigPath {
            anchor: Anchor::Document,
            segments: Vec::new(),
        }
    }

    /// Build a path from pre-parsed segments.
    pub fn from_segments(anchor: Anchor, segments: Vec<Segment>) -> Self {
        ConfigPath { anchor, segments }
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if any segment is a search pattern.
    pub fn is_pattern(&self) -> bool {
        self.segments.iter().any(Segment::is_pattern)
    }

    /// Append a segment, returning the extended path.
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        ConfigPath {
            anchor: self.anchor,
            segments,
        }
    }

    /// Append all of `tail`'s segments.
    pub fn join(&self, tail: &[Segment]) -> Self {
        let mut segments = self.segments.clone();
        segments.extend_from_slice(tail);
        ConfigPath {
            anchor: self.anchor,
            segments,
        }
    }

    /// The path without its last segment; `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(ConfigPath {
            anchor: self.anchor,
            segments,
        })
    }

    /// True if `self`'s segments are a prefix of `other`'s.
    pub fn is_prefix_of(&self, other: &ConfigPath) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// Parse a path expression.
    ///
    /// # Errors
    ///
    /// `ValueError::Syntax` on mixed separators, empty segments, malformed
    /// `[...]` indexes, adjacent `**`, or a trailing `*`/`**` selector.
    pub fn parse(text: &str) -> Result<Self> {
        let (anchor, rest) = parse_anchor(text);

        let mut segments = Vec::new();
        if !rest.is_empty() {
            let sep = detect_separator(text, rest)?;
            for raw in split_unescaped(rest, sep) {
                if raw.is_empty() {
                    return Err(ValueError::syntax(text, "empty path segment"));
                }
                parse_segment(text, &raw, sep == '/', &mut segments)?;
            }
        }

        for pair in segments.windows(2) {
            if pair[0] == Segment::Deep && pair[1] == Segment::Deep {
                return Err(ValueError::syntax(text, "adjacent '**' segments"));
            }
        }
        if matches!(segments.last(), Some(Segment::AnyKey) | Some(Segment::Deep)) {
            return Err(ValueError::syntax(
                text,
                "path must not end with a wildcard selector",
            ));
        }

        Ok(ConfigPath { anchor, segments })
    }
}

fn parse_anchor(text: &str) -> (Anchor, &str) {
    let mut rest = text;
    let mut up = 0usize;
    let mut relative = false;

    loop {
        if let Some(stripped) = rest.strip_prefix("../") {
            up += 1;
            relative = true;
            rest = stripped;
        } else if rest == ".." {
            up += 1;
            relative = true;
            rest = "";
        } else {
            break;
        }
    }
    if up == 0 {
        if let Some(stripped) = rest.strip_prefix("./") {
            relative = true;
            rest = stripped;
        } else if rest == "." {
            relative = true;
            rest = "";
        }
    }

    if relative {
        (Anchor::File { up }, rest)
    } else {
        (Anchor::Document, rest)
    }
}

/// Find the first unescaped `.` or `/`; the other separator must then not
/// occur at all.
fn detect_separator(full: &str, rest: &str) -> Result<char> {
    let mut sep = None;
    let mut chars = rest.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '.' | '/' => match sep {
                None => sep = Some(ch),
                Some(prev) if prev != ch => {
                    return Err(ValueError::syntax(
                        full,
                        "mixing '.' and '/' separators in one path",
                    ));
                }
                Some(_) => {}
            },
            _ => {}
        }
    }
    Ok(sep.unwrap_or('.'))
}

/// Split on unescaped `sep`, keeping escape sequences intact.
fn split_unescaped(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            buf.push(ch);
            if let Some(next) = chars.next() {
                buf.push(next);
            }
        } else if ch == sep {
            parts.push(std::mem::take(&mut buf));
        } else {
            buf.push(ch);
        }
    }
    parts.push(buf);
    parts
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn parse_segment(
    full: &str,
    raw: &str,
    slash_syntax: bool,
    out: &mut Vec<Segment>,
) -> Result<()> {
    if raw == "*" {
        out.push(Segment::AnyKey);
        return Ok(());
    }
    if raw == "**" {
        out.push(Segment::Deep);
        return Ok(());
    }

    let (name, brackets) = match raw.find('[') {
        Some(i) => (&raw[..i], &raw[i..]),
        None => (raw, ""),
    };

    if !name.is_empty() {
        // Sequence indexes use `[N]` in dotted syntax; a bare integer
        // segment is an index only in slash syntax, so numeric map keys
        // stay unambiguous.
        if slash_syntax && brackets.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
            out.push(Segment::Index(name.parse().map_err(|_| {
                ValueError::syntax(full, "sequence index out of range")
            })?));
            return Ok(());
        }
        out.push(Segment::Key(unescape(name)));
    } else if brackets.is_empty() {
        return Err(ValueError::syntax(full, "empty path segment"));
    }

    let mut rest = brackets;
    while !rest.is_empty() {
        let close = rest
            .find(']')
            .ok_or_else(|| ValueError::syntax(full, "unbalanced '[' in path"))?;
        let inner = rest[1..close].trim();
        if inner == "*" {
            out.push(Segment::AnyIndex);
        } else {
            let index: usize = inner
                .parse()
                .map_err(|_| ValueError::syntax(full, "expected integer or '*' inside '[]'"))?;
            out.push(Segment::Index(index));
        }
        rest = &rest[close + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(ValueError::syntax(full, "unexpected text after ']'"));
        }
    }

    Ok(())
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.anchor {
            Anchor::Document => {}
            Anchor::File { up: 0 } => {
                write!(f, "./")?;
                if self.segments.is_empty() {
                    return Ok(());
                }
            }
            Anchor::File { up } => {
                for _ in 0..up {
                    write!(f, "../")?;
                }
            }
        }

        let mut first = true;
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    for ch in key.chars() {
                        if matches!(ch, '.' | '/' | '[' | '\\') {
                            write!(f, "\\")?;
                        }
                        write!(f, "{}", ch)?;
                    }
                }
                Segment::Index(i) => write!(f, "[{}]", i)?,
                Segment::AnyIndex => write!(f, "[*]")?,
                Segment::AnyKey => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "*")?;
                }
                Segment::Deep => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "**")?;
                }
            }
            first = false;
        }
        Ok(())
    }
}
