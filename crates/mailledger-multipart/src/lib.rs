//! # mailledger-multipart
//!
//! Streaming parser and immutable entity model for MIME multipart bodies.
//!
//! ## Features
//!
//! - **Multipart parsing**: Split bodies on boundary delimiters into preamble,
//!   parts and epilogue (RFC 2046 §5.1)
//! - **Nesting**: Multiparts inside multiparts and embedded `message/rfc822`
//!   entities, each part confined to its enclosing delimiters
//! - **Subtypes**: mixed, alternative, digest, related, parallel, report,
//!   signed, encrypted and form-data, with unknown subtypes treated as mixed
//! - **Header model**: Content-Type, Content-Disposition and
//!   Content-Transfer-Encoding resolved per entity
//! - **Decoding**: Base64 and Quoted-Printable leaf payloads
//! - **Limits**: Configurable nesting depth, header size and part count
//!
//! ## Quick Start
//!
//! ### Parsing a Message
//!
//! ```ignore
//! use mailledger_multipart::{Body, Entity};
//!
//! let raw = b"Content-Type: multipart/mixed; boundary=B\r\n\
//!             \r\n\
//!             --B\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             Hello, World!\r\n\
//!             --B--\r\n";
//!
//! let entity = Entity::parse(raw)?;
//! if let Body::Multipart(multipart) = entity.body() {
//!     for part in multipart.parts() {
//!         println!("{}: {} bytes", part.media_type(), part.decoded_payload()?.len());
//!     }
//! }
//! ```
//!
//! ### Parsing a Body After Its Header
//!
//! ```ignore
//! use mailledger_multipart::{Parser, ParserConfig};
//!
//! let parser = Parser::new(ParserConfig::builder().max_depth(8).build());
//! let mut cursor = parser.cursor(std::io::BufReader::new(file));
//! let header = parser.parse_header(&mut cursor)?;
//! let media_type = header.content_type().map(|ct| ct.type_with_subtype());
//! let body = parser.parse_body(&header, media_type.as_deref().unwrap_or("text/plain"), &mut cursor)?;
//! ```
//!
//! ### Walking the Tree
//!
//! ```ignore
//! let attachments: Vec<_> = entity
//!     .walk()
//!     .filter(|e| e.is_attachment())
//!     .filter_map(|e| e.filename())
//!     .collect();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod body;
mod config;
mod content_type;
mod cursor;
mod disposition;
mod entity;
mod error;
mod header;
mod parser;

pub mod encoding;

pub use body::{Body, Multipart, MultipartKind, SinglePart};
pub use config::{ParserConfig, ParserConfigBuilder};
pub use content_type::{ContentType, Parameters};
pub use cursor::{Bounded, Delimiter, StreamCursor};
pub use disposition::ContentDisposition;
pub use entity::{Entity, EntityHeader, TransferEncoding, Walk};
pub use error::{Error, ErrorKind, Result};
pub use header::Headers;
pub use parser::Parser;
