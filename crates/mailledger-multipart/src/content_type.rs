//! MIME content type handling.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Header parameters keyed by lower-cased name.
pub type Parameters = BTreeMap<String, String>;

/// MIME content type with parameters.
///
/// Type and subtype keep the case they were written in; comparisons go
/// through [`ContentType::type_with_subtype`] or the `is_*` helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentType {
    main_type: String,
    sub_type: String,
    parameters: Parameters,
}

impl ContentType {
    /// Creates a new content type without parameters.
    ///
    /// Meant for literals known to be valid tokens; values from untrusted
    /// input go through [`ContentType::try_new`] or [`ContentType::parse`].
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Parameters::new(),
        }
    }

    /// Creates a content type, checking that type and subtype are
    /// non-empty RFC 2045 tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either part is not a token.
    pub fn try_new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Result<Self> {
        let content_type = Self::new(main_type, sub_type);
        for part in [&content_type.main_type, &content_type.sub_type] {
            if part.is_empty() || !part.bytes().all(is_token_char) {
                return Err(Error::InvalidArgument(format!(
                    "invalid media type token: {part:?}"
                )));
            }
        }
        Ok(content_type)
    }

    /// Creates the RFC 2045 default, `text/plain; charset=us-ascii`.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "us-ascii")
    }

    /// Creates a `multipart/<subtype>` content type with a boundary.
    #[must_use]
    pub fn multipart(sub_type: impl Into<String>, boundary: impl Into<String>) -> Self {
        Self::new("multipart", sub_type).with_parameter("boundary", boundary)
    }

    /// Adds a parameter. The name is stored lower-cased.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Main type as written (e.g. "text", "Multipart").
    #[must_use]
    pub fn main_type(&self) -> &str {
        &self.main_type
    }

    /// Subtype as written (e.g. "plain", "Parallel").
    #[must_use]
    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    /// All parameters, keyed by lower-cased name.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Returns `"type/subtype"` lower-cased, for comparisons.
    #[must_use]
    pub fn type_with_subtype(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type).to_ascii_lowercase()
    }

    /// Looks up a parameter by name, ignoring case.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present and non-empty.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary").filter(|b| !b.is_empty())
    }

    /// Checks the main type, ignoring case.
    #[must_use]
    pub fn is_type(&self, main_type: &str) -> bool {
        self.main_type.eq_ignore_ascii_case(main_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.is_type("multipart")
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.is_type("text")
    }

    /// Checks if this is `message/rfc822`.
    #[must_use]
    pub fn is_message_rfc822(&self) -> bool {
        self.is_type("message") && self.sub_type.eq_ignore_ascii_case("rfc822")
    }

    /// Parses a content type header value.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the `type/subtype` pair is
    /// missing or the parameter list cannot be parsed.
    pub fn parse(s: &str) -> Result<Self> {
        let mut scanner = Scanner::new(s);

        scanner.skip_cfws()?;
        let main_type = scanner.token();
        if main_type.is_empty() {
            return Err(malformed("missing media type", s));
        }

        scanner.skip_cfws()?;
        if !scanner.eat(b'/') {
            return Err(malformed("missing '/' after media type", s));
        }

        scanner.skip_cfws()?;
        let sub_type = scanner.token();
        if sub_type.is_empty() {
            return Err(malformed("missing media subtype", s));
        }

        let mut content_type = Self::new(main_type, sub_type);
        content_type.parameters = scanner.parameters()?;
        Ok(content_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;
        write_parameters(f, &self.parameters)
    }
}

/// Writes `; key=value` pairs, quoting values that are not plain tokens.
pub(crate) fn write_parameters(f: &mut fmt::Formatter<'_>, parameters: &Parameters) -> fmt::Result {
    for (key, value) in parameters {
        if !value.is_empty() && value.bytes().all(is_token_char) {
            write!(f, "; {key}={value}")?;
        } else {
            write!(f, "; {key}=\"")?;
            for ch in value.chars() {
                if ch == '"' || ch == '\\' {
                    f.write_str("\\")?;
                }
                write!(f, "{ch}")?;
            }
            f.write_str("\"")?;
        }
    }
    Ok(())
}

fn malformed(what: &str, value: &str) -> Error {
    Error::MalformedHeader(format!("{what}: {value:?}"))
}

/// RFC 2045 token character: printable ASCII except SPACE and tspecials.
const fn is_token_char(b: u8) -> bool {
    matches!(b, 0x21..=0x7e)
        && !matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'@' | b',' | b';' | b':' | b'\\' | b'"' | b'/' | b'['
                | b']' | b'?' | b'='
        )
}

/// Scanner over a structured header value (`token; name=value; ...`).
pub(crate) struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    pub(crate) fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Skips whitespace and RFC 822 comments.
    pub(crate) fn skip_cfws(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => self.pos += 1,
                Some(b'(') => self.skip_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                b'\\' => self.pos = (self.pos + 1).min(self.input.len()),
                _ => {}
            }
        }
        Err(malformed("unterminated comment", self.input))
    }

    /// Reads a run of token characters.
    pub(crate) fn token(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_token_char) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Reads an unquoted parameter value.
    ///
    /// Looser than a token: senders routinely leave `=` and `/` unquoted
    /// in boundaries, and non-ASCII in filenames.
    fn bare_value(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !matches!(b, b';' | b'"' | b'(' | b' ' | b'\t' | b'\r' | b'\n'))
        {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn quoted_string(&mut self) -> Result<String> {
        // Opening quote already consumed.
        let mut value = String::new();
        let rest = &self.input[self.pos..];
        let mut chars = rest.char_indices();
        while let Some((offset, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.pos += offset + 1;
                    return Ok(value);
                }
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        value.push(escaped);
                    }
                }
                '\r' | '\n' => {}
                _ => value.push(ch),
            }
        }
        Err(malformed("unterminated quoted string", self.input))
    }

    /// Parses `; name=value` pairs up to the end of input.
    ///
    /// Empty parameters (`;;`) and a trailing `;` are accepted. When a name
    /// repeats, the first value is kept.
    pub(crate) fn parameters(&mut self) -> Result<Parameters> {
        let mut parameters = Parameters::new();
        loop {
            self.skip_cfws()?;
            if self.is_eof() {
                return Ok(parameters);
            }
            if !self.eat(b';') {
                return Err(malformed("expected ';' between parameters", self.input));
            }

            self.skip_cfws()?;
            if self.is_eof() || self.peek() == Some(b';') {
                continue;
            }

            let name = self.token();
            if name.is_empty() {
                return Err(malformed("invalid parameter name", self.input));
            }
            self.skip_cfws()?;
            if !self.eat(b'=') {
                return Err(malformed("parameter without value", self.input));
            }
            self.skip_cfws()?;
            let value = if self.eat(b'"') {
                self.quoted_string()?
            } else {
                self.bare_value().to_string()
            };

            parameters
                .entry(name.to_ascii_lowercase())
                .or_insert(value);
        }
    }
}
