//! MIME header handling.

use crate::cursor::{StreamCursor, strip_line_break};
use crate::error::{Error, Result};
use std::fmt;
use std::io::BufRead;

/// How a header block ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockEnd {
    /// Terminating blank line.
    Blank,
    /// End of stream.
    Eof,
    /// Delimiter of an enclosing multipart.
    Delimiter,
}

/// Ordered collection of header fields.
///
/// Names keep their original case; lookups ignore case. Repeated fields are
/// all retained. Values are text: bytes that are not valid UTF-8 are
/// replaced by U+FFFD when the block is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header field.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Gets all values for a header, in order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
            .collect()
    }

    /// Checks whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns an iterator over all fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses headers from raw text.
    ///
    /// Headers are in the format:
    /// ```text
    /// Header-Name: value
    ///  continuation
    /// ```
    ///
    /// Parsing stops at the first blank line or at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if a line is neither a field nor a
    /// continuation.
    pub fn parse(text: &str) -> Result<Self> {
        let mut cursor = StreamCursor::new(text.as_bytes());
        Self::read(&mut cursor, usize::MAX).map(|(headers, _)| headers)
    }

    /// Reads one header block from the cursor.
    ///
    /// Folded lines are unfolded by removing their line breaks; values are
    /// trimmed. Header lines are decoded as UTF-8 with invalid sequences
    /// (raw 8-bit bytes such as Latin-1 filenames) replaced by U+FFFD.
    ///
    /// The size limit is checked per chunk, so at most `max_bytes` plus the
    /// cursor's current chunk is buffered before [`Error::LimitExceeded`].
    pub(crate) fn read<R: BufRead>(
        cursor: &mut StreamCursor<R>,
        max_bytes: usize,
    ) -> Result<(Self, BlockEnd)> {
        let mut headers = Self::new();
        let mut current: Option<(String, String)> = None;
        let mut total = 0usize;

        let end = loop {
            let Some(mut raw) = cursor.read_line()? else {
                break if cursor.peek_delimiter()?.is_some() {
                    BlockEnd::Delimiter
                } else {
                    BlockEnd::Eof
                };
            };
            total = within_limit(total + raw.len(), max_bytes)?;
            // Re-join a line the cursor returned in several chunks.
            while raw.last() != Some(&b'\n') {
                match cursor.read_line()? {
                    Some(more) => {
                        total = within_limit(total + more.len(), max_bytes)?;
                        raw.extend_from_slice(&more);
                    }
                    None => break,
                }
            }

            let line = strip_line_break(&raw);
            if line.is_empty() {
                break BlockEnd::Blank;
            }
            let line = String::from_utf8_lossy(line);

            if line.starts_with([' ', '\t']) {
                let Some((_, value)) = current.as_mut() else {
                    return Err(Error::MalformedHeader(
                        "continuation line before first header field".to_string(),
                    ));
                };
                value.push_str(&line);
                continue;
            }

            if let Some((name, value)) = current.take() {
                headers.add(name, value.trim());
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(Error::MalformedHeader(format!(
                    "header line without ':': {line:?}"
                )));
            };
            let name = name.trim_end();
            if name.is_empty() || name.contains([' ', '\t']) {
                return Err(Error::MalformedHeader(format!(
                    "invalid header name: {name:?}"
                )));
            }
            current = Some((name.to_string(), value.to_string()));
        };

        if let Some((name, value)) = current {
            headers.add(name, value.trim());
        }

        Ok((headers, end))
    }
}

fn within_limit(total: usize, max_bytes: usize) -> Result<usize> {
    if total > max_bytes {
        return Err(Error::LimitExceeded {
            limit: "header block size",
            max: max_bytes,
        });
    }
    Ok(total)
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
        assert!(headers.contains("CONTENT-TYPE"));
    }

    #[test]
    fn test_headers_keep_order_and_duplicates() {
        let mut headers = Headers::new();
        headers.add("Received", "first");
        headers.add("Subject", "Test");
        headers.add("received", "second");

        assert_eq!(headers.get("Received"), Some("first"));
        assert_eq!(headers.get_all("RECEIVED"), vec!["first", "second"]);
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Received", "Subject", "received"]);
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Body: not a header\r\n"
        );

        let headers = Headers::parse(text).unwrap();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert!(!headers.contains("Body"));
    }

    #[test]
    fn test_headers_parse_bare_lf_and_empty_value() {
        let headers = Headers::parse("X-Empty:\nX-Tab:\tvalue\n").unwrap();
        assert_eq!(headers.get("X-Empty"), Some(""));
        assert_eq!(headers.get("X-Tab"), Some("value"));
    }

    #[test]
    fn test_headers_parse_rejects_garbage() {
        assert!(matches!(
            Headers::parse("not a header\r\n"),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            Headers::parse(" leading: continuation\r\n"),
            Err(Error::MalformedHeader(_))
        ));
        assert!(matches!(
            Headers::parse(": no name\r\n"),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_read_reports_block_end() {
        let mut cursor = StreamCursor::new(&b"A: 1\r\n\r\nbody"[..]);
        let (headers, end) = Headers::read(&mut cursor, 1024).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(end, BlockEnd::Blank);
        assert_eq!(cursor.read_line().unwrap().unwrap(), b"body");

        let mut cursor = StreamCursor::new(&b"A: 1\r\n"[..]);
        let (_, end) = Headers::read(&mut cursor, 1024).unwrap();
        assert_eq!(end, BlockEnd::Eof);

        let mut cursor = StreamCursor::new(&b"A: 1\r\n--B--\r\n"[..]);
        let mut bounded = cursor.push_bound("B");
        let (_, end) = Headers::read(&mut *bounded, 1024).unwrap();
        assert_eq!(end, BlockEnd::Delimiter);
    }

    #[test]
    fn test_read_enforces_size_limit() {
        let mut cursor = StreamCursor::new(&b"Subject: a rather long value\r\n\r\n"[..]);
        let err = Headers::read(&mut cursor, 10).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { max: 10, .. }));
    }

    /// Serves a header name followed by an endless unterminated value.
    struct EndlessHeader {
        served: usize,
    }

    impl std::io::Read for EndlessHeader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            const PREFIX: &[u8] = b"X-Long: ";
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = PREFIX.get(self.served + i).copied().unwrap_or(b'a');
            }
            self.served += buf.len();
            Ok(buf.len())
        }
    }

    #[test]
    fn test_read_limit_stops_unterminated_line_early() {
        let mut source = EndlessHeader { served: 0 };
        {
            let reader = std::io::BufReader::with_capacity(64, &mut source);
            let mut cursor = StreamCursor::with_max_line_length(reader, 80);
            let err = Headers::read(&mut cursor, 1024).unwrap_err();
            assert!(matches!(err, Error::LimitExceeded { max: 1024, .. }));
        }
        assert!(source.served < 2048, "served {} bytes", source.served);
    }

    #[test]
    fn test_read_replaces_invalid_utf8() {
        let mut cursor = StreamCursor::new(&b"Content-Disposition: attachment; filename=caf\xe9.txt\r\n\r\n"[..]);
        let (headers, _) = Headers::read(&mut cursor, 1024).unwrap();
        assert_eq!(
            headers.get("content-disposition"),
            Some("attachment; filename=caf\u{fffd}.txt")
        );
    }

    #[test]
    fn test_headers_display() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");

        assert_eq!(
            headers.to_string(),
            "From: sender@example.com\r\nTo: recipient@example.com\r\n"
        );
    }
}
