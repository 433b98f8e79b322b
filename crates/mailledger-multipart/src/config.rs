//! Parser configuration types.

/// Default maximum nesting depth of multipart and message bodies.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default maximum size of a single header block in bytes.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 256 * 1024;

/// Default maximum number of parts in one multipart body.
pub const DEFAULT_MAX_PARTS: usize = 10_000;

/// Default read chunk size of the stream cursor.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Resource limits applied while parsing untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum nesting depth of multipart and `message/rfc822` bodies.
    pub max_depth: usize,
    /// Maximum size of one header block in bytes.
    pub max_header_bytes: usize,
    /// Maximum number of parts in one multipart body.
    pub max_parts: usize,
    /// Longest line returned by the cursor in one piece.
    ///
    /// Longer lines are split into chunks. Only the first chunk of a line
    /// can be a boundary delimiter.
    pub max_line_length: usize,
}

impl ParserConfig {
    /// Creates a configuration with the default limits.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_parts: DEFAULT_MAX_PARTS,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub const fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder::new()
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfigBuilder {
    config: ParserConfig,
}

impl ParserConfigBuilder {
    /// Creates a new builder with the default limits.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            config: ParserConfig::new(),
        }
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Sets the maximum header block size.
    #[must_use]
    pub const fn max_header_bytes(mut self, bytes: usize) -> Self {
        self.config.max_header_bytes = bytes;
        self
    }

    /// Sets the maximum number of parts per multipart body.
    #[must_use]
    pub const fn max_parts(mut self, parts: usize) -> Self {
        self.config.max_parts = parts;
        self
    }

    /// Sets the cursor chunk size. Values below 80 are raised to 80 so
    /// that a delimiter line always fits in one chunk.
    #[must_use]
    pub const fn max_line_length(mut self, length: usize) -> Self {
        self.config.max_line_length = if length < 80 { 80 } else { length };
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub const fn build(self) -> ParserConfig {
        self.config
    }
}

impl Default for ParserConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParserConfig::default();
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.max_parts, DEFAULT_MAX_PARTS);
    }

    #[test]
    fn test_builder() {
        let config = ParserConfig::builder()
            .max_depth(4)
            .max_parts(10)
            .max_header_bytes(1024)
            .max_line_length(10)
            .build();

        assert_eq!(config.max_depth, 4);
        assert_eq!(config.max_parts, 10);
        assert_eq!(config.max_header_bytes, 1024);
        assert_eq!(config.max_line_length, 80);
    }
}
