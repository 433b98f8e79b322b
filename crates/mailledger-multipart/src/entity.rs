//! MIME entity: headers plus exactly one body.

use crate::body::Body;
use crate::content_type::ContentType;
use crate::disposition::ContentDisposition;
use crate::encoding;
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::parser::Parser;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }

    /// Whether the payload is stored without transformation.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::SevenBit | Self::EightBit | Self::Binary)
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Header block of an entity with its MIME fields resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityHeader {
    headers: Headers,
    content_type: Option<ContentType>,
    content_transfer_encoding: Option<String>,
    content_disposition: Option<ContentDisposition>,
}

impl EntityHeader {
    /// Resolves Content-Type, Content-Transfer-Encoding and
    /// Content-Disposition from a header block. The first occurrence of each
    /// field wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if Content-Type or
    /// Content-Disposition cannot be parsed.
    pub fn from_headers(headers: Headers) -> Result<Self> {
        let content_types = headers.get_all("content-type");
        if content_types.len() > 1 {
            tracing::warn!(
                count = content_types.len(),
                "Duplicate Content-Type headers, using the first"
            );
        }
        let content_type = content_types
            .first()
            .map(|value| ContentType::parse(value))
            .transpose()?;

        let content_transfer_encoding = headers
            .get("content-transfer-encoding")
            .map(str::to_string);

        let content_disposition = headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
            .transpose()?;

        Ok(Self {
            headers,
            content_type,
            content_transfer_encoding,
            content_disposition,
        })
    }

    /// Creates a header block holding only a Content-Type field.
    #[must_use]
    pub fn with_content_type(content_type: ContentType) -> Self {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        Self {
            headers,
            content_type: Some(content_type),
            ..Self::default()
        }
    }

    /// All header fields in order.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Declared Content-Type, if any.
    #[must_use]
    pub const fn content_type(&self) -> Option<&ContentType> {
        self.content_type.as_ref()
    }

    /// Raw Content-Transfer-Encoding value, if any.
    #[must_use]
    pub fn content_transfer_encoding(&self) -> Option<&str> {
        self.content_transfer_encoding.as_deref()
    }

    /// Transfer encoding, `7bit` when absent or unrecognised.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.content_transfer_encoding
            .as_deref()
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Declared Content-Disposition, if any.
    #[must_use]
    pub const fn content_disposition(&self) -> Option<&ContentDisposition> {
        self.content_disposition.as_ref()
    }
}

/// A MIME entity.
///
/// Built by the parser and immutable afterwards. The tree owns every nested
/// entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    header: EntityHeader,
    body: Body,
}

impl Entity {
    pub(crate) const fn new(header: EntityHeader, body: Body) -> Self {
        Self { header, body }
    }

    /// Parses a complete entity (headers and body) with default limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the headers or the body structure are malformed.
    pub fn parse(input: &[u8]) -> Result<Self> {
        Parser::default().parse_bytes(input)
    }

    /// Resolved header block.
    #[must_use]
    pub const fn header(&self) -> &EntityHeader {
        &self.header
    }

    /// All header fields in order.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        self.header.headers()
    }

    /// Declared Content-Type, if any.
    #[must_use]
    pub const fn content_type(&self) -> Option<&ContentType> {
        self.header.content_type()
    }

    /// Raw Content-Transfer-Encoding value, if any.
    #[must_use]
    pub fn content_transfer_encoding(&self) -> Option<&str> {
        self.header.content_transfer_encoding()
    }

    /// Transfer encoding, `7bit` when absent or unrecognised.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.header.transfer_encoding()
    }

    /// Declared Content-Disposition, if any.
    #[must_use]
    pub const fn content_disposition(&self) -> Option<&ContentDisposition> {
        self.header.content_disposition()
    }

    /// Content-ID header value, if any.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.headers().get("content-id")
    }

    /// The body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Effective media type, lower-cased (defaults applied).
    #[must_use]
    pub fn media_type(&self) -> String {
        self.body.media_type()
    }

    /// Checks for `Content-Disposition: attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.content_disposition()
            .is_some_and(ContentDisposition::is_attachment)
    }

    /// File name from Content-Disposition, falling back to the Content-Type
    /// `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.content_disposition()
            .and_then(ContentDisposition::filename)
            .or_else(|| self.content_type().and_then(|ct| ct.parameter("name")))
    }

    /// Decodes the leaf payload according to the transfer encoding.
    ///
    /// The result is still in the part's charset; character decoding is
    /// left to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the body is not a leaf, or a
    /// decode error if the payload is not valid for its encoding.
    pub fn decoded_payload(&self) -> Result<Vec<u8>> {
        let payload = self.body.payload().ok_or_else(|| {
            Error::InvalidArgument("entity body is not a leaf payload".to_string())
        })?;
        encoding::decode(self.transfer_encoding(), payload)
    }

    /// Depth-first, pre-order iterator over this entity and all nested
    /// entities, including embedded messages.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

/// Iterator returned by [`Entity::walk`].
#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<&'a Entity>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Entity;

    fn next(&mut self) -> Option<Self::Item> {
        let entity = self.stack.pop()?;
        match &entity.body {
            Body::Multipart(multipart) => self.stack.extend(multipart.parts().iter().rev()),
            Body::Message(inner) => self.stack.push(inner),
            Body::Text(_) | Body::Binary(_) => {}
        }
        Some(entity)
    }
}
