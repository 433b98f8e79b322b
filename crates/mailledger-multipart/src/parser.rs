//! Recursive-descent parser for MIME entities and multipart bodies.
//!
//! A multipart body is split on its boundary delimiter lines into preamble,
//! parts and epilogue. Every part is parsed as a full entity, recursing into
//! nested multiparts and embedded messages. The cursor's bound stack keeps
//! each part inside the delimiters of every multipart that encloses it.

use std::io::BufRead;

use bytes::{Bytes, BytesMut};

use crate::body::{Body, Multipart, MultipartKind, SinglePart};
use crate::config::ParserConfig;
use crate::cursor::{Delimiter, StreamCursor, strip_line_break};
use crate::entity::{Entity, EntityHeader};
use crate::error::{Error, Result};
use crate::header::{BlockEnd, Headers};

/// Media type of a part without a Content-Type header (RFC 2045 §5.2).
const DEFAULT_MEDIA_TYPE: &str = "text/plain";

/// MIME entity parser.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Creates a parser with the given limits.
    #[must_use]
    pub const fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Limits in effect.
    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Wraps a reader in a cursor using the configured chunk size.
    pub fn cursor<R: BufRead>(&self, reader: R) -> StreamCursor<R> {
        StreamCursor::with_max_line_length(reader, self.config.max_line_length)
    }

    /// Parses a complete entity from memory.
    ///
    /// # Errors
    ///
    /// See [`Parser::parse_entity`].
    pub fn parse_bytes(&self, input: &[u8]) -> Result<Entity> {
        self.parse_entity(&mut self.cursor(input))
    }

    /// Parses a complete entity from a reader.
    ///
    /// # Errors
    ///
    /// See [`Parser::parse_entity`].
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Entity> {
        self.parse_entity(&mut self.cursor(reader))
    }

    /// Parses a header block followed by its body.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedHeader`] for an unparsable header line, Content-Type
    ///   or Content-Disposition, anywhere in the tree.
    /// - [`Error::MissingBoundary`] for a multipart without boundary.
    /// - [`Error::Parse`] when the stream ends inside a header block. A
    ///   header block cut short by a boundary delimiter is complete and
    ///   its body is empty.
    /// - [`Error::LimitExceeded`] when a configured limit is hit.
    /// - [`Error::Io`] when the reader fails.
    pub fn parse_entity<R: BufRead>(&self, cursor: &mut StreamCursor<R>) -> Result<Entity> {
        self.entity(cursor, 0, DEFAULT_MEDIA_TYPE)
    }

    /// Reads and resolves one header block, leaving the cursor at the start
    /// of the body.
    ///
    /// # Errors
    ///
    /// Same header errors as [`Parser::parse_entity`].
    pub fn parse_header<R: BufRead>(&self, cursor: &mut StreamCursor<R>) -> Result<EntityHeader> {
        self.header(cursor)
    }

    /// Parses the body of an entity whose header has already been read.
    ///
    /// `media_type` selects the body shape; for `multipart/*` it must match
    /// the owner's Content-Type, which must carry a boundary.
    ///
    /// # Errors
    ///
    /// - [`Error::NullArgument`] if `media_type` is empty.
    /// - [`Error::MissingBoundary`] if a multipart owner has no boundary.
    /// - [`Error::InvalidArgument`] if `media_type` names a different
    ///   multipart subtype than the owner declares.
    /// - Any error from parsing nested parts.
    pub fn parse_body<R: BufRead>(
        &self,
        owner: &EntityHeader,
        media_type: &str,
        cursor: &mut StreamCursor<R>,
    ) -> Result<Body> {
        self.body(owner, media_type, cursor, 0)
    }

    fn header<R: BufRead>(&self, cursor: &mut StreamCursor<R>) -> Result<EntityHeader> {
        let start = cursor.position();
        let (headers, end) = Headers::read(cursor, self.config.max_header_bytes)?;
        match end {
            // RFC 2046 §5.1.1: a body part may end right after its headers.
            BlockEnd::Blank | BlockEnd::Delimiter => {}
            // Nothing at all before the end: an empty entity.
            BlockEnd::Eof if cursor.position() == start => {}
            BlockEnd::Eof => {
                return Err(Error::parse(
                    cursor.position(),
                    "unexpected end of stream in header block",
                ));
            }
        }
        EntityHeader::from_headers(headers)
    }

    fn entity<R: BufRead>(
        &self,
        cursor: &mut StreamCursor<R>,
        depth: usize,
        default_media_type: &str,
    ) -> Result<Entity> {
        if depth > self.config.max_depth {
            return Err(Error::LimitExceeded {
                limit: "nesting depth",
                max: self.config.max_depth,
            });
        }

        let header = self.header(cursor)?;
        let media_type = header
            .content_type()
            .map_or_else(|| default_media_type.to_string(), |ct| ct.type_with_subtype());
        let body = self.body(&header, &media_type, cursor, depth)?;
        Ok(Entity::new(header, body))
    }

    fn body<R: BufRead>(
        &self,
        owner: &EntityHeader,
        media_type: &str,
        cursor: &mut StreamCursor<R>,
        depth: usize,
    ) -> Result<Body> {
        if media_type.is_empty() {
            return Err(Error::NullArgument("media_type"));
        }

        let media_type = media_type.to_ascii_lowercase();
        let (main_type, sub_type) = media_type
            .split_once('/')
            .unwrap_or((media_type.as_str(), ""));

        match main_type {
            "multipart" => self
                .multipart(owner, sub_type, cursor, depth)
                .map(Body::Multipart),
            // RFC 2046 §5.2.1: only identity encodings are allowed here.
            "message" if sub_type == "rfc822" && owner.transfer_encoding().is_identity() => {
                let inner = self.entity(cursor, depth + 1, DEFAULT_MEDIA_TYPE)?;
                Ok(Body::Message(Box::new(inner)))
            }
            _ => {
                let (payload, _) = read_section(cursor)?;
                let part = SinglePart::new(media_type.clone(), payload);
                Ok(if main_type == "text" {
                    Body::Text(part)
                } else {
                    Body::Binary(part)
                })
            }
        }
    }

    fn multipart<R: BufRead>(
        &self,
        owner: &EntityHeader,
        sub_type: &str,
        cursor: &mut StreamCursor<R>,
        depth: usize,
    ) -> Result<Multipart> {
        let content_type = owner.content_type().ok_or(Error::MissingBoundary)?;
        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;

        let kind = MultipartKind::from_subtype(sub_type);
        if !kind.is_known() {
            tracing::warn!(subtype = sub_type, "Unknown multipart subtype, parsing generically");
        }
        let multipart = Multipart::new(kind, content_type)?;
        let default_part_type = multipart.kind().default_part_content_type();

        let mut parts = Vec::new();
        let (preamble, closed) = {
            let mut bounded = cursor.push_bound(boundary);
            let level = bounded.level();

            let (preamble, mut next) = read_section(&mut *bounded)?;
            let closed = loop {
                // End of stream or an enclosing delimiter closes this body
                // implicitly.
                let Some(delimiter) = next.filter(|d| d.level == level) else {
                    break false;
                };
                bounded.consume_delimiter()?;
                if delimiter.terminal {
                    break true;
                }

                if parts.len() >= self.config.max_parts {
                    return Err(Error::LimitExceeded {
                        limit: "parts per multipart",
                        max: self.config.max_parts,
                    });
                }
                let part = self.entity(&mut *bounded, depth + 1, default_part_type)?;
                tracing::trace!(
                    index = parts.len(),
                    media_type = %part.media_type(),
                    "Parsed body part"
                );
                parts.push(part);
                next = bounded.peek_delimiter()?;
            };
            (preamble, closed)
        };

        // The epilogue is bounded only by enclosing multiparts.
        let epilogue = if closed {
            read_section(cursor)?.0
        } else {
            tracing::warn!(boundary, "Multipart body has no terminal delimiter");
            Bytes::new()
        };

        tracing::debug!(
            kind = %multipart.kind(),
            parts = parts.len(),
            closed,
            "Parsed multipart body"
        );
        Ok(multipart.with_contents(preamble, parts, epilogue))
    }
}

/// Reads verbatim up to end of stream or the next active delimiter.
///
/// The line break in front of a delimiter belongs to the delimiter
/// (RFC 2046 §5.1.1) and is not part of the section.
fn read_section<R: BufRead>(cursor: &mut StreamCursor<R>) -> Result<(Bytes, Option<Delimiter>)> {
    let mut buf = BytesMut::new();
    while let Some(line) = cursor.read_line()? {
        buf.extend_from_slice(&line);
    }

    let delimiter = cursor.peek_delimiter()?;
    if delimiter.is_some() {
        let keep = strip_line_break(&buf).len();
        buf.truncate(keep);
    }
    Ok((buf.freeze(), delimiter))
}
