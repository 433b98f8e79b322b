//! Content-Disposition header handling (RFC 2183).

use crate::content_type::{Parameters, Scanner, write_parameters};
use crate::error::{Error, Result};
use std::fmt;

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentDisposition {
    disposition_type: String,
    parameters: Parameters,
}

impl ContentDisposition {
    /// Disposition type as written (e.g. "attachment").
    #[must_use]
    pub fn disposition_type(&self) -> &str {
        &self.disposition_type
    }

    /// All parameters, keyed by lower-cased name.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Looks up a parameter by name, ignoring case.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the `filename` parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameter("filename")
    }

    /// Checks for `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.disposition_type.eq_ignore_ascii_case("attachment")
    }

    /// Checks for `inline`.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.disposition_type.eq_ignore_ascii_case("inline")
    }

    /// Parses a content disposition header value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the disposition type is missing
    /// or the parameter list cannot be parsed.
    pub fn parse(s: &str) -> Result<Self> {
        let mut scanner = Scanner::new(s);
        scanner.skip_cfws()?;
        let disposition_type = scanner.token();
        if disposition_type.is_empty() {
            return Err(Error::MalformedHeader(format!(
                "missing disposition type: {s:?}"
            )));
        }

        Ok(Self {
            disposition_type: disposition_type.to_string(),
            parameters: scanner.parameters()?,
        })
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.disposition_type)?;
        write_parameters(f, &self.parameters)
    }
}
