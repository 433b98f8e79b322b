//! Body variants: leaf payloads, embedded messages and multiparts.

use crate::content_type::ContentType;
use crate::entity::Entity;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::fmt;

/// Multipart subtype classification (RFC 2046 §5.1, RFC 1847, RFC 2387,
/// RFC 6522, RFC 7578).
///
/// The parser treats every kind identically. The kind only tells
/// downstream consumers how the parts relate to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MultipartKind {
    /// `multipart/mixed`: independent parts in a meaningful order.
    Mixed,
    /// `multipart/alternative`: the same content in increasingly faithful
    /// representations.
    Alternative,
    /// `multipart/digest`: parts default to `message/rfc822`.
    Digest,
    /// `multipart/related`: a root part plus resources it references.
    Related,
    /// `multipart/parallel`: parts may be processed in any order.
    Parallel,
    /// `multipart/report`: a human readable part plus a machine readable
    /// report.
    Report,
    /// `multipart/signed`: signed content followed by its signature.
    Signed,
    /// `multipart/encrypted`: control information followed by ciphertext.
    Encrypted,
    /// `multipart/form-data`: named form fields.
    FormData,
    /// Any other subtype, stored lower-cased.
    Unknown(String),
}

impl MultipartKind {
    /// Maps a subtype name to its kind, ignoring case.
    #[must_use]
    pub fn from_subtype(subtype: &str) -> Self {
        match subtype.to_ascii_lowercase().as_str() {
            "mixed" => Self::Mixed,
            "alternative" => Self::Alternative,
            "digest" => Self::Digest,
            "related" => Self::Related,
            "parallel" => Self::Parallel,
            "report" => Self::Report,
            "signed" => Self::Signed,
            "encrypted" => Self::Encrypted,
            "form-data" => Self::FormData,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Lower-cased subtype name.
    #[must_use]
    pub fn subtype(&self) -> &str {
        match self {
            Self::Mixed => "mixed",
            Self::Alternative => "alternative",
            Self::Digest => "digest",
            Self::Related => "related",
            Self::Parallel => "parallel",
            Self::Report => "report",
            Self::Signed => "signed",
            Self::Encrypted => "encrypted",
            Self::FormData => "form-data",
            Self::Unknown(subtype) => subtype,
        }
    }

    /// Full media type, e.g. `multipart/parallel`.
    #[must_use]
    pub fn media_type(&self) -> String {
        format!("multipart/{}", self.subtype())
    }

    /// Returns false for [`MultipartKind::Unknown`].
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Whether the order of parts carries meaning.
    #[must_use]
    pub const fn is_order_significant(&self) -> bool {
        !matches!(self, Self::Parallel)
    }

    /// Whether parts are alternatives, the last one preferred.
    #[must_use]
    pub const fn is_alternative(&self) -> bool {
        matches!(self, Self::Alternative)
    }

    /// Whether a renderer may present the parts simultaneously.
    #[must_use]
    pub const fn parts_processed_in_parallel(&self) -> bool {
        matches!(self, Self::Parallel)
    }

    /// Media type assumed for a part that has no Content-Type header.
    #[must_use]
    pub const fn default_part_content_type(&self) -> &'static str {
        match self {
            Self::Digest => "message/rfc822",
            _ => "text/plain",
        }
    }
}

impl fmt::Display for MultipartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "multipart/{}", self.subtype())
    }
}

/// Multipart body: preamble, ordered parts and epilogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multipart {
    kind: MultipartKind,
    content_type: ContentType,
    boundary: String,
    preamble: Bytes,
    parts: Vec<Entity>,
    epilogue: Bytes,
}

impl Multipart {
    /// Creates an empty multipart body of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `content_type` is not exactly
    /// `kind`'s media type (ignoring case) or has no non-empty `boundary`.
    pub fn new(kind: MultipartKind, content_type: &ContentType) -> Result<Self> {
        let expected = kind.media_type();
        let actual = content_type.type_with_subtype();
        if actual != expected {
            return Err(Error::InvalidArgument(format!(
                "content type must be '{expected}', got '{actual}'"
            )));
        }
        let boundary = content_type.boundary().ok_or_else(|| {
            Error::InvalidArgument("content type has no 'boundary' parameter".to_string())
        })?;

        Ok(Self {
            kind,
            content_type: content_type.clone(),
            boundary: boundary.to_string(),
            preamble: Bytes::new(),
            parts: Vec::new(),
            epilogue: Bytes::new(),
        })
    }

    /// Creates a multipart body for any `multipart/*` content type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the type is not multipart or
    /// has no boundary.
    pub fn generic(content_type: &ContentType) -> Result<Self> {
        if !content_type.is_multipart() {
            return Err(Error::InvalidArgument(format!(
                "content type must be 'multipart/*', got '{}'",
                content_type.type_with_subtype()
            )));
        }
        Self::new(MultipartKind::from_subtype(content_type.sub_type()), content_type)
    }

    /// Creates a `multipart/mixed` body.
    ///
    /// # Errors
    ///
    /// See [`Multipart::new`].
    pub fn mixed(content_type: &ContentType) -> Result<Self> {
        Self::new(MultipartKind::Mixed, content_type)
    }

    /// Creates a `multipart/alternative` body.
    ///
    /// # Errors
    ///
    /// See [`Multipart::new`].
    pub fn alternative(content_type: &ContentType) -> Result<Self> {
        Self::new(MultipartKind::Alternative, content_type)
    }

    /// Creates a `multipart/digest` body.
    ///
    /// # Errors
    ///
    /// See [`Multipart::new`].
    pub fn digest(content_type: &ContentType) -> Result<Self> {
        Self::new(MultipartKind::Digest, content_type)
    }

    /// Creates a `multipart/related` body.
    ///
    /// # Errors
    ///
    /// See [`Multipart::new`].
    pub fn related(content_type: &ContentType) -> Result<Self> {
        Self::new(MultipartKind::Related, content_type)
    }

    /// Creates a `multipart/parallel` body.
    ///
    /// # Errors
    ///
    /// See [`Multipart::new`].
    pub fn parallel(content_type: &ContentType) -> Result<Self> {
        Self::new(MultipartKind::Parallel, content_type)
    }

    /// Creates a `multipart/report` body.
    ///
    /// # Errors
    ///
    /// See [`Multipart::new`].
    pub fn report(content_type: &ContentType) -> Result<Self> {
        Self::new(MultipartKind::Report, content_type)
    }

    /// Creates a `multipart/signed` body.
    ///
    /// # Errors
    ///
    /// See [`Multipart::new`].
    pub fn signed(content_type: &ContentType) -> Result<Self> {
        Self::new(MultipartKind::Signed, content_type)
    }

    /// Creates a `multipart/encrypted` body.
    ///
    /// # Errors
    ///
    /// See [`Multipart::new`].
    pub fn encrypted(content_type: &ContentType) -> Result<Self> {
        Self::new(MultipartKind::Encrypted, content_type)
    }

    /// Creates a `multipart/form-data` body.
    ///
    /// # Errors
    ///
    /// See [`Multipart::new`].
    pub fn form_data(content_type: &ContentType) -> Result<Self> {
        Self::new(MultipartKind::FormData, content_type)
    }

    pub(crate) fn with_contents(
        mut self,
        preamble: Bytes,
        parts: Vec<Entity>,
        epilogue: Bytes,
    ) -> Self {
        self.preamble = preamble;
        self.parts = parts;
        self.epilogue = epilogue;
        self
    }

    /// Subtype classification.
    #[must_use]
    pub const fn kind(&self) -> &MultipartKind {
        &self.kind
    }

    /// Content type this body was constructed from.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Boundary string, without the leading `--`.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Bytes before the first delimiter.
    #[must_use]
    pub const fn preamble(&self) -> &Bytes {
        &self.preamble
    }

    /// Body parts in stream order.
    #[must_use]
    pub fn parts(&self) -> &[Entity] {
        &self.parts
    }

    /// Bytes after the terminal delimiter.
    #[must_use]
    pub const fn epilogue(&self) -> &Bytes {
        &self.epilogue
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if there are no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Looks up a Content-Type parameter of this body.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.content_type.parameter(name)
    }

    /// `start` parameter of `multipart/related` (Content-ID of the root).
    #[must_use]
    pub fn start(&self) -> Option<&str> {
        self.parameter("start")
    }

    /// `type` parameter of `multipart/related` (media type of the root).
    #[must_use]
    pub fn related_type(&self) -> Option<&str> {
        self.parameter("type")
    }

    /// `report-type` parameter of `multipart/report`.
    #[must_use]
    pub fn report_type(&self) -> Option<&str> {
        self.parameter("report-type")
    }

    /// `protocol` parameter of `multipart/signed` and `multipart/encrypted`.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.parameter("protocol")
    }

    /// `micalg` parameter of `multipart/signed`.
    #[must_use]
    pub fn micalg(&self) -> Option<&str> {
        self.parameter("micalg")
    }

    /// The part a renderer should show.
    ///
    /// For `multipart/alternative` this is the last part; for everything
    /// else the first.
    #[must_use]
    pub fn preferred_part(&self) -> Option<&Entity> {
        if self.kind.is_alternative() {
            self.parts.last()
        } else {
            self.parts.first()
        }
    }

    /// The root of a `multipart/related` body: the part whose Content-ID
    /// matches `start`, or the first part.
    #[must_use]
    pub fn root_part(&self) -> Option<&Entity> {
        self.start()
            .map(trim_angle_brackets)
            .and_then(|start| {
                self.parts
                    .iter()
                    .find(|part| part.content_id().map(trim_angle_brackets) == Some(start))
            })
            .or_else(|| self.parts.first())
    }
}

fn trim_angle_brackets(id: &str) -> &str {
    id.trim().trim_start_matches('<').trim_end_matches('>')
}

/// A leaf payload with its effective media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinglePart {
    media_type: String,
    payload: Bytes,
}

impl SinglePart {
    pub(crate) const fn new(media_type: String, payload: Bytes) -> Self {
        Self {
            media_type,
            payload,
        }
    }

    /// Lower-cased `type/subtype`, defaulted when the part declared none.
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Raw payload, still transfer-encoded.
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// The body of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// `text/*` payload.
    Text(SinglePart),
    /// Any other non-composite payload.
    Binary(SinglePart),
    /// `message/rfc822`: a complete embedded entity.
    Message(Box<Entity>),
    /// `multipart/*`.
    Multipart(Multipart),
}

impl Body {
    /// Lower-cased media type of this body.
    #[must_use]
    pub fn media_type(&self) -> String {
        match self {
            Self::Text(part) | Self::Binary(part) => part.media_type.clone(),
            Self::Message(_) => "message/rfc822".to_string(),
            Self::Multipart(multipart) => multipart.kind.media_type(),
        }
    }

    /// Returns the leaf payload, if this is a leaf body.
    #[must_use]
    pub const fn payload(&self) -> Option<&Bytes> {
        match self {
            Self::Text(part) | Self::Binary(part) => Some(&part.payload),
            Self::Message(_) | Self::Multipart(_) => None,
        }
    }

    /// Returns the multipart body, if any.
    #[must_use]
    pub const fn as_multipart(&self) -> Option<&Multipart> {
        match self {
            Self::Multipart(multipart) => Some(multipart),
            _ => None,
        }
    }

    /// Returns the embedded message, if any.
    #[must_use]
    pub fn as_message(&self) -> Option<&Entity> {
        match self {
            Self::Message(entity) => Some(entity.as_ref()),
            _ => None,
        }
    }

    /// Returns the leaf part, if any.
    #[must_use]
    pub const fn as_single_part(&self) -> Option<&SinglePart> {
        match self {
            Self::Text(part) | Self::Binary(part) => Some(part),
            _ => None,
        }
    }

    /// Checks if this is a multipart body.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }

    /// Checks if this is a leaf body.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Text(_) | Self::Binary(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const KNOWN: [(MultipartKind, &str); 9] = [
        (MultipartKind::Mixed, "mixed"),
        (MultipartKind::Alternative, "alternative"),
        (MultipartKind::Digest, "digest"),
        (MultipartKind::Related, "related"),
        (MultipartKind::Parallel, "parallel"),
        (MultipartKind::Report, "report"),
        (MultipartKind::Signed, "signed"),
        (MultipartKind::Encrypted, "encrypted"),
        (MultipartKind::FormData, "form-data"),
    ];

    type Constructor = fn(&ContentType) -> Result<Multipart>;

    const CONSTRUCTORS: [(Constructor, &str); 9] = [
        (Multipart::mixed, "mixed"),
        (Multipart::alternative, "alternative"),
        (Multipart::digest, "digest"),
        (Multipart::related, "related"),
        (Multipart::parallel, "parallel"),
        (Multipart::report, "report"),
        (Multipart::signed, "signed"),
        (Multipart::encrypted, "encrypted"),
        (Multipart::form_data, "form-data"),
    ];

    #[test]
    fn test_kind_from_subtype() {
        for (kind, name) in KNOWN {
            assert_eq!(MultipartKind::from_subtype(name), kind);
            assert_eq!(MultipartKind::from_subtype(&name.to_uppercase()), kind);
            assert_eq!(kind.subtype(), name);
            assert!(kind.is_known());
        }
        let unknown = MultipartKind::from_subtype("X-Custom");
        assert_eq!(unknown, MultipartKind::Unknown("x-custom".to_string()));
        assert_eq!(unknown.media_type(), "multipart/x-custom");
        assert!(!unknown.is_known());
    }

    #[test]
    fn test_kind_metadata() {
        assert!(!MultipartKind::Parallel.is_order_significant());
        assert!(MultipartKind::Parallel.parts_processed_in_parallel());
        assert!(MultipartKind::Mixed.is_order_significant());
        assert!(MultipartKind::Alternative.is_alternative());
        assert_eq!(
            MultipartKind::Digest.default_part_content_type(),
            "message/rfc822"
        );
        assert_eq!(
            MultipartKind::Mixed.default_part_content_type(),
            "text/plain"
        );
        assert_eq!(MultipartKind::Report.to_string(), "multipart/report");
    }

    #[test]
    fn test_constructors_accept_matching_subtype() {
        for (constructor, name) in CONSTRUCTORS {
            let ct = ContentType::parse(&format!("Multipart/{}; boundary=b", name.to_uppercase()))
                .unwrap();
            let multipart = constructor(&ct).unwrap();
            assert_eq!(multipart.kind().subtype(), name);
            assert_eq!(multipart.boundary(), "b");
            assert!(multipart.is_empty());
        }
    }

    #[test]
    fn test_constructors_reject_mismatched_subtype() {
        for (constructor, name) in CONSTRUCTORS {
            for (_, other) in CONSTRUCTORS.iter().filter(|(_, other)| *other != name) {
                let ct = ContentType::multipart(*other, "b");
                let err = constructor(&ct).unwrap_err();
                assert!(matches!(err, Error::InvalidArgument(_)), "{name} accepted {other}");
            }
            let text = ContentType::new("text", name).with_parameter("boundary", "b");
            assert!(matches!(constructor(&text), Err(Error::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_constructor_requires_boundary() {
        let ct = ContentType::new("multipart", "parallel");
        assert!(matches!(
            Multipart::parallel(&ct),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_generic_constructor() {
        let ct = ContentType::multipart("x-vendor", "b");
        let multipart = Multipart::generic(&ct).unwrap();
        assert_eq!(
            multipart.kind(),
            &MultipartKind::Unknown("x-vendor".to_string())
        );

        let ct = ContentType::multipart("signed", "b")
            .with_parameter("protocol", "application/pgp-signature");
        let multipart = Multipart::generic(&ct).unwrap();
        assert_eq!(multipart.kind(), &MultipartKind::Signed);
        assert_eq!(multipart.protocol(), Some("application/pgp-signature"));

        let ct = ContentType::text_plain().with_parameter("boundary", "b");
        assert!(Multipart::generic(&ct).is_err());
    }

    #[test]
    fn test_body_accessors() {
        let body = Body::Binary(SinglePart::new(
            "image/png".to_string(),
            Bytes::from_static(b"\x89PNG"),
        ));
        assert!(body.is_leaf());
        assert!(!body.is_multipart());
        assert_eq!(body.media_type(), "image/png");
        assert_eq!(body.payload().unwrap().as_ref(), b"\x89PNG");
        assert!(body.as_multipart().is_none());
    }
}
