//! Placeholder grammar: parsing scalar strings into compound values.
//!
//! A scalar such as `"test-{ref:database}-url"` is decomposed into three
//! fragments: the literal `test-`, an operator call, and the literal `-url`.
//! Operator arguments are comma separated and may themselves contain nested
//! `{...}` groups, which parse recursively. Placeholders only occur in
//! values, never in keys.

use crate::error::{Result, ValueError};
use std::fmt;

/// A scalar decomposed into literal and operator-call fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundValue {
    pub fragments: Vec<Fragment>,
}

/// One piece of a [`CompoundValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Literal text, escapes already applied.
    Literal(String),

    /// An embedded `{name:args}` operator invocation.
    Call(OperatorCall),
}

/// An operator invocation. Arguments are kept raw (unresolved); handlers
/// resolve nested placeholders in their own arguments when they run.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorCall {
    pub name: String,
    pub args: Vec<CompoundValue>,
}

/// Result of parsing a scalar string.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// No operator calls; the (unescaped) text stands as-is.
    Literal(String),

    /// At least one operator call.
    Compound(CompoundValue),
}

impl CompoundValue {
    /// True if any fragment is an operator call.
    pub fn has_calls(&self) -> bool {
        self.fragments.iter().any(|f| matches!(f, Fragment::Call(_)))
    }

    /// The single operator call, when the whole value is exactly one call.
    ///
    /// This is the case where resolution preserves the call's native type
    /// instead of coercing to a string.
    pub fn single_call(&self) -> Option<&OperatorCall> {
        match self.fragments.as_slice() {
            [Fragment::Call(call)] => Some(call),
            _ => None,
        }
    }

    /// The literal text, when there are no operator calls at all.
    pub fn literal_text(&self) -> Option<String> {
        if self.has_calls() {
            return None;
        }
        let mut out = String::new();
        for fragment in &self.fragments {
            if let Fragment::Literal(text) = fragment {
                out.push_str(text);
            }
        }
        Some(out)
    }
}

impl fmt::Display for CompoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            match fragment {
                Fragment::Literal(text) => write!(f, "{}", text)?,
                Fragment::Call(call) => write!(f, "{}", call)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for OperatorCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}:", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, "}}")
    }
}

/// Parse a scalar string into a compound value or a plain literal.
///
/// Fast path: text without `{` is never converted (and never allocated
/// into fragments). Raw-marked strings must be filtered out by the caller;
/// this function does not see them.
///
/// # Errors
///
/// `ValueError::Syntax` on unbalanced braces, an empty operator name, a
/// `{...}` group without a `name:` separator, or a dangling `\` escape.
pub fn parse_scalar(text: &str) -> Result<Parsed> {
    if !text.contains('{') {
        return Ok(Parsed::Literal(text.to_string()));
    }

    let mut parser = Parser::new(text);
    let compound = parser.parse_fragments(&[])?;
    if parser.peek().is_some() {
        // Only a stray '}' can stop the top-level fragment loop.
        return Err(ValueError::syntax(text, "unbalanced '}'"));
    }

    if compound.has_calls() {
        Ok(Parsed::Compound(compound))
    } else {
        Ok(Parsed::Literal(compound.literal_text().unwrap_or_default()))
    }
}

struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Parser {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn err(&self, message: impl Into<String>) -> ValueError {
        ValueError::syntax(self.text, message)
    }

    /// Parse fragments until EOF or an unconsumed terminator character.
    fn parse_fragments(&mut self, terminators: &[char]) -> Result<CompoundValue> {
        let mut fragments = Vec::new();
        let mut buf = String::new();

        while let Some(ch) = self.peek() {
            if terminators.contains(&ch) {
                break;
            }
            match ch {
                '\\' => {
                    self.bump();
                    match self.bump() {
                        Some(escaped) => buf.push(escaped),
                        None => return Err(self.err("dangling '\\' escape")),
                    }
                }
                '{' => {
                    if !buf.is_empty() {
                        fragments.push(Fragment::Literal(std::mem::take(&mut buf)));
                    }
                    fragments.push(Fragment::Call(self.parse_call()?));
                }
                '}' => return Err(self.err("unbalanced '}'")),
                _ => {
                    self.bump();
                    buf.push(ch);
                }
            }
        }

        if !buf.is_empty() {
            fragments.push(Fragment::Literal(buf));
        }
        Ok(CompoundValue { fragments })
    }

    /// Parse `{name:arg1,arg2,...}` with the cursor on the opening brace.
    fn parse_call(&mut self) -> Result<OperatorCall> {
        self.bump(); // '{'

        let mut name = String::new();
        loop {
            match self.bump() {
                Some(':') => break,
                Some('{') | Some('}') | Some(',') => {
                    return Err(self.err("expected ':' after operator name"));
                }
                Some(ch) => name.push(ch),
                None => return Err(self.err("unbalanced '{'")),
            }
        }
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(self.err("empty operator name before ':'"));
        }

        let mut args = Vec::new();
        loop {
            let arg = self.parse_argument()?;
            if !arg.fragments.is_empty() {
                args.push(arg);
            }
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                _ => return Err(self.err("unbalanced '{'")),
            }
        }

        Ok(OperatorCall { name, args })
    }

    /// Parse a single argument, stopping (without consuming) at `,` or `}`.
    ///
    /// Quoted spans (`"..."` / `'...'`) protect separators and whitespace;
    /// unquoted whitespace at either edge is trimmed.
    fn parse_argument(&mut self) -> Result<CompoundValue> {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.bump();
        }

        let mut fragments = Vec::new();
        let mut buf = String::new();
        // Everything in buf up to this length came from a quoted span and
        // must survive trailing trim.
        let mut protected = 0usize;

        while let Some(ch) = self.peek() {
            match ch {
                ',' | '}' => break,
                '\\' => {
                    self.bump();
                    match self.bump() {
                        Some(escaped) => buf.push(escaped),
                        None => return Err(self.err("dangling '\\' escape")),
                    }
                }
                '"' | '\'' => {
                    self.bump();
                    self.read_quoted(ch, &mut buf)?;
                    protected = buf.len();
                }
                '{' => {
                    if !buf.is_empty() {
                        fragments.push(Fragment::Literal(std::mem::take(&mut buf)));
                        protected = 0;
                    }
                    fragments.push(Fragment::Call(self.parse_call()?));
                }
                _ => {
                    self.bump();
                    buf.push(ch);
                }
            }
        }

        while buf.len() > protected && buf.ends_with(char::is_whitespace) {
            buf.pop();
        }
        if !buf.is_empty() {
            fragments.push(Fragment::Literal(buf));
        }
        Ok(CompoundValue { fragments })
    }

    fn read_quoted(&mut self, quote: char, buf: &mut String) -> Result<()> {
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(escaped) => buf.push(escaped),
                    None => return Err(self.err("dangling '\\' escape")),
                },
                Some(ch) if ch == quote => return Ok(()),
                Some(ch) => buf.push(ch),
                None => return Err(self.err("unterminated quote")),
            }
        }
    }
}
