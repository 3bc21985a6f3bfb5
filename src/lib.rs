//! # geodrop
//!
//! Drag-and-drop geo file handling: format dispatch plus a native
//! KMZ-over-KML adapter.
//!
//! A map application receives dropped files as raw bytes with no
//! reliable type information. This library provides the piece that sits
//! between the drop event and the rendering layer: a registry of format
//! adapters that each declare whether they consume text or a binary
//! buffer, thin wrappers delegating the actual parsing to the `kml`,
//! `geojson` and `gpx` crates, and the one format those crates do not
//! cover natively — KMZ, a ZIP archive containing a KML document plus
//! the icons it references.
//!
//! ## Features
//!
//! - Decode KMZ buffers: unzip in memory, locate the `.kml` entry
//!   (case-insensitive, first in stored order) and extract it as text
//! - Resolve icon hrefs written in the KML against the archive's image
//!   entries, degrading to pass-through for external URLs
//! - Dispatch dropped bytes across KMZ, GPX, GeoJSON and KML in order,
//!   first format to produce features wins
//!
//! ## Example
//!
//! ```no_run
//! use geodrop::FormatRegistry;
//!
//! fn main() -> anyhow::Result<()> {
//!     let bytes = std::fs::read("trip.kmz")?;
//!
//!     let mut registry = FormatRegistry::defaults();
//!     let dropped = registry.read(&bytes)?;
//!
//!     for feature in &dropped.features {
//!         println!(
//!             "{} ({}) from {}",
//!             feature.name.as_deref().unwrap_or("unnamed"),
//!             feature.geometry_kind(),
//!             dropped.format,
//!         );
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod format;
pub mod zip;

pub use cli::Cli;
pub use format::geojson::GeoJsonFormat;
pub use format::gpx::GpxFormat;
pub use format::kml::{IconResolver, KmlFormat, PassThrough};
pub use format::kmz::KmzFormat;
pub use format::{
    DroppedFeatures, Feature, FeatureFormat, FeatureStyle, FormatInput, FormatRegistry,
    IconSource, InputKind,
};
pub use zip::{Archive, ArchiveEntry};
