//! Error types for MIME parsing.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
///
/// Contract violations (`NullArgument`, `InvalidArgument`) are programmer
/// errors. The remaining kinds describe bad input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument was absent or empty.
    NullArgument,
    /// An argument had a value the callee cannot accept.
    InvalidArgument,
    /// A header line or header value could not be parsed.
    MalformedHeader,
    /// The body structure could not be parsed.
    Parse,
    /// The underlying reader failed.
    Io,
    /// A payload could not be transfer-decoded.
    Decode,
}

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required argument is absent.
    #[error("Required argument is missing: {0}")]
    NullArgument(&'static str),

    /// Argument has an invalid value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid header line or header value.
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// Multipart entity without a usable `boundary` parameter.
    #[error("Multipart entity has no 'boundary' parameter")]
    MissingBoundary,

    /// Structural parse error.
    #[error("Parse error at byte {position}: {message}")]
    Parse {
        /// Stream position where the error was detected.
        position: u64,
        /// Description of what went wrong.
        message: String,
    },

    /// A configured resource limit was exceeded.
    #[error("Limit exceeded: {limit} (max {max})")]
    LimitExceeded {
        /// Name of the limit.
        limit: &'static str,
        /// Configured maximum.
        max: usize,
    },

    /// I/O error from the underlying reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid transfer encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}

impl Error {
    /// Creates a parse error at the given stream position.
    pub(crate) fn parse(position: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NullArgument(_) => ErrorKind::NullArgument,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::MalformedHeader(_) => ErrorKind::MalformedHeader,
            Self::MissingBoundary | Self::Parse { .. } | Self::LimitExceeded { .. } => {
                ErrorKind::Parse
            }
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidEncoding(_) | Self::Base64Decode(_) => ErrorKind::Decode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::MissingBoundary.kind(), ErrorKind::Parse);
        assert_eq!(Error::parse(7, "bad").kind(), ErrorKind::Parse);
        assert_eq!(
            Error::InvalidArgument("x".to_string()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            Error::NullArgument("media_type").kind(),
            ErrorKind::NullArgument
        );
    }

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse(42, "unexpected end of stream");
        assert_eq!(
            err.to_string(),
            "Parse error at byte 42: unexpected end of stream"
        );
    }
}
