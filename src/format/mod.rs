//! Feature formats and drag-and-drop dispatch.
//!
//! A dropped file arrives as raw bytes with no reliable type information.
//! Each format adapter implements [`FeatureFormat`], declaring whether its
//! native input unit is text or a binary buffer, and the
//! [`FormatRegistry`] offers the dropped contents to every registered
//! format in order until one produces features.
//!
//! The adapters here stay thin on purpose: geometry and style parsing is
//! delegated to the ecosystem crates (`kml`, `geojson`, `gpx`). The one
//! piece of real logic in this crate is [`kmz::KmzFormat`], which
//! presents a ZIP-compressed KMZ archive to the KML collaborator as if
//! it were plain KML text and resolves embedded icon references against
//! the archive.

mod dispatch;
mod feature;
pub mod geojson;
pub mod gpx;
pub mod kml;
pub mod kmz;

pub use dispatch::{DroppedFeatures, FormatRegistry};
pub use feature::{Feature, FeatureStyle, IconSource};

use anyhow::{Result, bail};

/// The input unit a format consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Binary,
}

/// Dropped file contents, in the representation a format asked for.
#[derive(Debug, Clone, Copy)]
pub enum FormatInput<'a> {
    Text(&'a str),
    Binary(&'a [u8]),
}

impl<'a> FormatInput<'a> {
    pub fn as_text(&self) -> Result<&'a str> {
        match self {
            FormatInput::Text(text) => Ok(text),
            FormatInput::Binary(_) => bail!("format expects text input, got a binary buffer"),
        }
    }

    pub fn as_binary(&self) -> Result<&'a [u8]> {
        match self {
            FormatInput::Binary(bytes) => Ok(bytes),
            FormatInput::Text(_) => bail!("format expects a binary buffer, got text input"),
        }
    }
}

/// A file format that can read geographic features.
///
/// Mirrors the surface a drag-and-drop dispatcher needs: an input-kind
/// declaration so raw bytes are routed to binary formats instead of
/// being pre-decoded as text, plus single- and multi-feature reads.
///
/// `read_features` takes `&mut self` because some formats keep per-read
/// state; the KMZ adapter holds the most recently decoded archive as its
/// image-resolution context.
pub trait FeatureFormat {
    /// Format name, for dispatch logs and listings.
    fn name(&self) -> &'static str;

    fn input_kind(&self) -> InputKind {
        InputKind::Text
    }

    /// Read every feature the input contains.
    fn read_features(&mut self, input: FormatInput<'_>) -> Result<Vec<Feature>>;

    /// Read the first feature the input contains, if any.
    fn read_feature(&mut self, input: FormatInput<'_>) -> Result<Option<Feature>> {
        Ok(self.read_features(input)?.into_iter().next())
    }
}
