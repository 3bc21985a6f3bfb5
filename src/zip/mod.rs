//! In-memory ZIP archive reading.
//!
//! A KMZ file is a standard ZIP container whose payload is one KML
//! document plus the local resources (commonly icons) it references.
//! This module decodes such a container from a single byte buffer into
//! an [`Archive`]: an immutable entry-name → bytes mapping.
//!
//! ## Architecture
//!
//! - [`structures`]: data structures for ZIP format elements (EOCD,
//!   central directory records, signatures)
//! - [`parser`]: binary parsing of those structures from a byte slice
//! - [`archive`]: the decoded [`Archive`] the rest of the crate works on
//!
//! ## Format notes
//!
//! The End of Central Directory record is located first (from the end of
//! the buffer), then the Central Directory is walked in stored order.
//! Stored order is load-bearing: when an archive carries several `.kml`
//! members, the first one in this order is treated as authoritative.
//!
//! Only STORED and DEFLATE members are supported. ZIP64, encryption and
//! multi-disk archives are out of scope for the KMZ shape map-authoring
//! tools produce.

mod archive;
mod parser;
mod structures;

pub use archive::{Archive, ArchiveEntry};
pub use parser::ZipParser;
pub use structures::*;
