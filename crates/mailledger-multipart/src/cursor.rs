//! Line-oriented cursor over a buffered byte stream.
//!
//! The cursor keeps one chunk of look-ahead and a stack of active boundary
//! delimiters. Every read checks the look-ahead against that stack, so a
//! body part can never consume the delimiter line of any multipart that
//! encloses it. Nested parsers do not have to be trusted to stop on time.

use std::io::{BufRead, Read};
use std::ops::{Deref, DerefMut};

use crate::config::DEFAULT_MAX_LINE_LENGTH;
use crate::error::Result;

/// Smallest chunk size a cursor accepts.
const MIN_LINE_LENGTH: usize = 80;

/// A boundary delimiter line found at the head of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter {
    /// Index of the matching bound; 0 is the outermost multipart.
    pub level: usize,
    /// `--boundary--` (close) rather than `--boundary`.
    pub terminal: bool,
}

#[derive(Debug)]
struct Chunk {
    data: Vec<u8>,
    /// Bytes of `data` already handed out by [`StreamCursor::read_bytes`].
    offset: usize,
    /// Whether `data` begins at the start of a line.
    line_start: bool,
    /// Whether `data` runs to the end of its line (line break or end of
    /// stream). Only complete lines can be delimiters.
    complete: bool,
}

/// Single-owner, forward-only view over a [`BufRead`] source.
#[derive(Debug)]
pub struct StreamCursor<R> {
    reader: R,
    max_line_length: usize,
    pending: Option<Chunk>,
    at_line_start: bool,
    eof: bool,
    position: u64,
    bounds: Vec<Vec<u8>>,
}

impl<R: BufRead> StreamCursor<R> {
    /// Creates a cursor with the default chunk size.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_max_line_length(reader, DEFAULT_MAX_LINE_LENGTH)
    }

    /// Creates a cursor that returns lines longer than `max_line_length`
    /// in several chunks.
    #[must_use]
    pub fn with_max_line_length(reader: R, max_line_length: usize) -> Self {
        Self {
            reader,
            max_line_length: max_line_length.max(MIN_LINE_LENGTH),
            pending: None,
            at_line_start: true,
            eof: false,
            position: 0,
            bounds: Vec::new(),
        }
    }

    /// Number of bytes handed out so far.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Returns true while at least one bound is active.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        !self.bounds.is_empty()
    }

    /// Number of active bounds.
    #[must_use]
    pub fn bound_depth(&self) -> usize {
        self.bounds.len()
    }

    /// Activates `--boundary` as a bound until the returned guard drops.
    pub fn push_bound(&mut self, boundary: &str) -> Bounded<'_, R> {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());
        self.bounds.push(delimiter);
        Bounded { cursor: self }
    }

    fn fill(&mut self) -> Result<()> {
        if self.pending.is_some() || self.eof {
            return Ok(());
        }

        let Some(mut data) = self.read_chunk()? else {
            self.eof = true;
            return Ok(());
        };

        let line_start = self.at_line_start;
        let complete = if line_start && data.starts_with(b"--") {
            self.complete_padded_line(&mut data)?
        } else {
            data.last() == Some(&b'\n')
        };
        self.at_line_start = data.last() == Some(&b'\n');
        self.pending = Some(Chunk {
            data,
            offset: 0,
            line_start,
            complete,
        });
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut data = Vec::new();
        let limit = u64::try_from(self.max_line_length).unwrap_or(u64::MAX);
        let read = (&mut self.reader).take(limit).read_until(b'\n', &mut data)?;
        Ok((read > 0).then_some(data))
    }

    /// Pulls the rest of a cut-off line into `data` while it is transport
    /// padding, so a padded delimiter line is classified as a whole.
    ///
    /// Returns whether `data` now ends its line. Padding is followed for at
    /// most one extra `max_line_length`; a longer run leaves the line
    /// incomplete and it is read as content.
    fn complete_padded_line(&mut self, data: &mut Vec<u8>) -> Result<bool> {
        let cap = self.max_line_length.saturating_mul(2);
        while data.last() != Some(&b'\n') {
            if data.len() >= cap {
                return Ok(false);
            }
            let Some(more) = self.read_chunk()? else {
                return Ok(true);
            };
            let padding = more
                .iter()
                .all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'));
            data.extend_from_slice(&more);
            if !padding {
                break;
            }
        }
        Ok(data.last() == Some(&b'\n'))
    }

    fn classify(&self, chunk: &Chunk) -> Option<Delimiter> {
        if !chunk.line_start || !chunk.complete || chunk.offset != 0 {
            return None;
        }
        let line = trim_trailing_whitespace(&chunk.data);

        // Innermost bound first.
        self.bounds
            .iter()
            .enumerate()
            .rev()
            .find_map(|(level, bound)| match line.strip_prefix(bound.as_slice())? {
                b"" => Some(Delimiter {
                    level,
                    terminal: false,
                }),
                b"--" => Some(Delimiter {
                    level,
                    terminal: true,
                }),
                _ => None,
            })
    }

    fn take_pending(&mut self) -> Option<Vec<u8>> {
        let chunk = self.pending.take()?;
        let mut data = chunk.data;
        if chunk.offset > 0 {
            data.drain(..chunk.offset);
        }
        self.position += data.len() as u64;
        Some(data)
    }

    /// Returns the delimiter at the head of the stream, if any, without
    /// consuming it.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails.
    pub fn peek_delimiter(&mut self) -> Result<Option<Delimiter>> {
        self.fill()?;
        Ok(self.pending.as_ref().and_then(|chunk| self.classify(chunk)))
    }

    /// Consumes the head line if it is a delimiter of an active bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails.
    pub fn consume_delimiter(&mut self) -> Result<Option<Delimiter>> {
        let delimiter = self.peek_delimiter()?;
        if delimiter.is_some() {
            self.take_pending();
        }
        Ok(delimiter)
    }

    /// Reads the next line including its line break.
    ///
    /// Returns `None` at end of stream or when the next line is a delimiter
    /// of an active bound. The line break preceding a delimiter is returned
    /// as part of the previous line; callers decide whether it belongs to
    /// the content or to the delimiter.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails.
    pub fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        if self.peek_delimiter()?.is_some() {
            return Ok(None);
        }
        Ok(self.take_pending())
    }

    /// Reads up to `n` bytes, stopping early at end of stream or in front of
    /// a delimiter of an active bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n.min(8192));
        while out.len() < n {
            if self.peek_delimiter()?.is_some() {
                break;
            }
            let Some(chunk) = self.pending.as_mut() else {
                break;
            };

            let available = &chunk.data[chunk.offset..];
            let take = available.len().min(n - out.len());
            out.extend_from_slice(&available[..take]);
            chunk.offset += take;
            self.position += take as u64;
            if chunk.offset == chunk.data.len() {
                self.pending = None;
            }
        }
        Ok(out)
    }

    /// Returns true at end of stream or in front of a bound's delimiter.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails.
    pub fn is_at_end(&mut self) -> Result<bool> {
        Ok(self.peek_delimiter()?.is_some() || self.pending.is_none())
    }
}

/// Guard returned by [`StreamCursor::push_bound`]; pops the bound on drop.
#[derive(Debug)]
pub struct Bounded<'a, R> {
    cursor: &'a mut StreamCursor<R>,
}

impl<R> Bounded<'_, R> {
    /// Stack index of the bound this guard owns.
    #[must_use]
    pub fn level(&self) -> usize {
        self.cursor.bounds.len() - 1
    }
}

impl<R> Deref for Bounded<'_, R> {
    type Target = StreamCursor<R>;

    fn deref(&self) -> &Self::Target {
        self.cursor
    }
}

impl<R> DerefMut for Bounded<'_, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cursor
    }
}

impl<R> Drop for Bounded<'_, R> {
    fn drop(&mut self) {
        self.cursor.bounds.pop();
    }
}

/// Strips one trailing CRLF or LF.
pub(crate) fn strip_line_break(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r\n")
        .or_else(|| line.strip_suffix(b"\n"))
        .unwrap_or(line)
}

/// Strips the line break and any transport padding after a delimiter.
fn trim_trailing_whitespace(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b' ' | b'\t' | b'\r' | b'\n'] = line {
        line = rest;
    }
    line
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cursor(input: &[u8]) -> StreamCursor<&[u8]> {
        StreamCursor::new(input)
    }

    #[test]
    fn test_read_lines_and_position() {
        let mut c = cursor(b"one\r\ntwo\nthree");
        assert_eq!(c.read_line().unwrap().unwrap(), b"one\r\n");
        assert_eq!(c.position(), 5);
        assert_eq!(c.read_line().unwrap().unwrap(), b"two\n");
        assert_eq!(c.read_line().unwrap().unwrap(), b"three");
        assert!(c.read_line().unwrap().is_none());
        assert!(c.is_at_end().unwrap());
        assert_eq!(c.position(), 14);
    }

    #[test]
    fn test_unbounded_cursor_has_no_delimiters() {
        let mut c = cursor(b"--B\r\n");
        assert_eq!(c.peek_delimiter().unwrap(), None);
        assert_eq!(c.read_line().unwrap().unwrap(), b"--B\r\n");
    }

    #[test]
    fn test_bound_stops_read_line() {
        let mut c = cursor(b"body\r\n--B\r\nnext\r\n--B--\r\n");
        let mut bounded = c.push_bound("B");
        assert_eq!(bounded.level(), 0);
        assert_eq!(bounded.read_line().unwrap().unwrap(), b"body\r\n");
        assert!(bounded.read_line().unwrap().is_none());
        assert_eq!(
            bounded.consume_delimiter().unwrap(),
            Some(Delimiter {
                level: 0,
                terminal: false
            })
        );
        assert_eq!(bounded.read_line().unwrap().unwrap(), b"next\r\n");
        assert_eq!(
            bounded.consume_delimiter().unwrap(),
            Some(Delimiter {
                level: 0,
                terminal: true
            })
        );
        assert!(bounded.is_at_end().unwrap());
    }

    #[test]
    fn test_bound_popped_on_drop() {
        let mut c = cursor(b"--B\r\n");
        {
            let mut bounded = c.push_bound("B");
            assert!(bounded.peek_delimiter().unwrap().is_some());
        }
        assert!(!c.is_bounded());
        assert_eq!(c.read_line().unwrap().unwrap(), b"--B\r\n");
    }

    #[test]
    fn test_delimiter_requires_exact_boundary() {
        let mut c = cursor(b"--BC\r\n--B-\r\n--B \t\r\n");
        let mut bounded = c.push_bound("B");
        assert_eq!(bounded.read_line().unwrap().unwrap(), b"--BC\r\n");
        assert_eq!(bounded.read_line().unwrap().unwrap(), b"--B-\r\n");
        // Transport padding after the delimiter is allowed.
        assert!(bounded.read_line().unwrap().is_none());
        assert!(bounded.peek_delimiter().unwrap().is_some());
    }

    #[test]
    fn test_delimiter_mid_line_is_content() {
        let mut c = cursor(b"text --B\r\n");
        let mut bounded = c.push_bound("B");
        assert_eq!(bounded.read_line().unwrap().unwrap(), b"text --B\r\n");
    }

    #[test]
    fn test_innermost_and_outer_levels() {
        let mut c = cursor(b"--outer\r\n--inner--\r\n");
        let mut outer = c.push_bound("outer");
        let mut inner = outer.push_bound("inner");
        assert_eq!(inner.level(), 1);
        assert_eq!(
            inner.peek_delimiter().unwrap(),
            Some(Delimiter {
                level: 0,
                terminal: false
            })
        );
        assert_eq!(inner.bound_depth(), 2);
    }

    #[test]
    fn test_long_line_continuation_is_not_a_delimiter() {
        let mut input = vec![b'x'; 80];
        input.extend_from_slice(b"--B\r\n--B\r\n");
        let mut c = StreamCursor::with_max_line_length(input.as_slice(), 80);
        let mut bounded = c.push_bound("B");
        assert_eq!(bounded.read_line().unwrap().unwrap().len(), 80);
        assert_eq!(bounded.read_line().unwrap().unwrap(), b"--B\r\n");
        assert!(bounded.read_line().unwrap().is_none());
    }

    #[test]
    fn test_cut_off_line_is_not_a_delimiter() {
        let mut input = b"--B".to_vec();
        input.extend(std::iter::repeat_n(b' ', 77));
        input.extend_from_slice(b"not a delimiter\r\n--B--\r\n");
        let mut c = StreamCursor::with_max_line_length(input.as_slice(), 80);
        let mut bounded = c.push_bound("B");

        assert_eq!(bounded.peek_delimiter().unwrap(), None);
        let line = bounded.read_line().unwrap().unwrap();
        assert!(line.ends_with(b"not a delimiter\r\n"));
        assert_eq!(line.len(), 97);
        assert_eq!(
            bounded.peek_delimiter().unwrap(),
            Some(Delimiter {
                level: 0,
                terminal: true
            })
        );
    }

    #[test]
    fn test_delimiter_with_long_padding() {
        let mut input = b"--B".to_vec();
        input.extend(std::iter::repeat_n(b' ', 150));
        input.extend_from_slice(b"\r\nnext\r\n");
        let mut c = StreamCursor::with_max_line_length(input.as_slice(), 80);
        let mut bounded = c.push_bound("B");

        assert!(bounded.read_line().unwrap().is_none());
        assert!(bounded.consume_delimiter().unwrap().is_some());
        assert_eq!(bounded.read_line().unwrap().unwrap(), b"next\r\n");
    }

    #[test]
    fn test_delimiter_padding_beyond_cap_is_content() {
        let mut input = b"--B".to_vec();
        input.extend(std::iter::repeat_n(b' ', 400));
        input.extend_from_slice(b"\r\n");
        let mut c = StreamCursor::with_max_line_length(input.as_slice(), 80);
        let mut bounded = c.push_bound("B");

        assert_eq!(bounded.peek_delimiter().unwrap(), None);
        assert!(bounded.read_line().unwrap().is_some());
    }

    #[test]
    fn test_read_bytes_stops_at_bound() {
        let mut c = cursor(b"abcdef\r\n--B\r\n");
        let mut bounded = c.push_bound("B");
        assert_eq!(bounded.read_bytes(3).unwrap(), b"abc");
        assert_eq!(bounded.position(), 3);
        assert_eq!(bounded.read_bytes(100).unwrap(), b"def\r\n");
        assert!(bounded.read_bytes(100).unwrap().is_empty());
        assert!(bounded.peek_delimiter().unwrap().is_some());
    }

    #[test]
    fn test_strip_line_break() {
        assert_eq!(strip_line_break(b"a\r\n"), b"a");
        assert_eq!(strip_line_break(b"a\n"), b"a");
        assert_eq!(strip_line_break(b"a"), b"a");
        assert_eq!(strip_line_break(b"a\r\n\r\n"), b"a\r\n");
    }
}
