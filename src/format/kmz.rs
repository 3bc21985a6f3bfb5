//! KMZ format: a ZIP archive presented to the KML collaborator as plain
//! KML text.
//!
//! The adapter intercepts the raw dropped buffer (its declared input
//! unit is binary, so dispatch never pre-decodes it as text), unzips it,
//! hands the contained KML document to [`KmlFormat`], and resolves the
//! icon hrefs the KML parser encounters against the archive's image
//! entries. No geometry or style parsing happens here.

use anyhow::Result;
use log::debug;

use crate::zip::Archive;

use super::feature::{Feature, IconSource};
use super::kml::{IconResolver, KmlFormat};
use super::{FeatureFormat, FormatInput, InputKind};

/// Reads features from KMZ buffers.
///
/// Holds the most recently decoded archive as its image-resolution
/// context; each [`decode`](Self::decode) replaces it wholesale. One
/// drop is processed to completion (decode, then the full parse with its
/// icon lookups) before the next, so a single slot suffices.
pub struct KmzFormat {
    kml: KmlFormat,
    archive: Option<Archive>,
}

impl KmzFormat {
    pub fn new() -> Self {
        Self {
            kml: KmlFormat::new(),
            archive: None,
        }
    }

    /// Decompress a KMZ buffer and extract its KML document as text.
    ///
    /// The first entry whose name ends in `.kml` (case-insensitive, in
    /// the archive's stored order) is authoritative; any further `.kml`
    /// entries are silently ignored. Returns `Ok(None)` when the archive
    /// holds no KML entry at all. Entry bytes are decoded as UTF-8
    /// lossily, so a document with stray invalid sequences still loads.
    ///
    /// The decoded archive becomes this adapter's resolution context for
    /// subsequent [`resolve_image`](Self::resolve_image) calls, whether
    /// or not a KML entry was found.
    ///
    /// # Errors
    ///
    /// Returns an error only when the buffer is not a valid ZIP
    /// container or an entry cannot be decompressed.
    pub fn decode(&mut self, buffer: &[u8]) -> Result<Option<String>> {
        let archive = Archive::parse(buffer)?;

        let text = archive
            .entries()
            .iter()
            .find(|entry| entry.name.to_ascii_lowercase().ends_with(".kml"))
            .map(|entry| {
                debug!("kmz: using KML entry {:?}", entry.name);
                String::from_utf8_lossy(&entry.data).into_owned()
            });

        if text.is_none() {
            debug!("kmz: archive has no .kml entry");
        }

        self.archive = Some(archive);
        Ok(text)
    }

    /// Resolve an image reference from the KML document against the
    /// current archive.
    ///
    /// The reference is tried verbatim as an entry name first, then by
    /// its final path segment (the text after the last `/`), so both
    /// `images/pin.png` and `../assets/pin.png` find an embedded
    /// `pin.png`. A reference matching no entry passes through unchanged;
    /// it may still be a perfectly valid external URL. Never errors.
    pub fn resolve_image(&self, href: &str) -> IconSource {
        let Some(archive) = &self.archive else {
            return IconSource::Remote(href.to_string());
        };

        let entry = archive.get(href).or_else(|| {
            let segment = href.rsplit('/').next().unwrap_or(href);
            archive.get(segment)
        });

        match entry {
            Some(entry) => IconSource::Embedded {
                name: entry.name.clone(),
                bytes: entry.data.clone(),
            },
            None => IconSource::Remote(href.to_string()),
        }
    }
}

impl Default for KmzFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl IconResolver for KmzFormat {
    fn resolve_icon(&self, href: &str) -> IconSource {
        self.resolve_image(href)
    }
}

impl FeatureFormat for KmzFormat {
    fn name(&self) -> &'static str {
        "kmz"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Binary
    }

    fn read_features(&mut self, input: FormatInput<'_>) -> Result<Vec<Feature>> {
        let buffer = input.as_binary()?;
        let Some(text) = self.decode(buffer)? else {
            // Missing KML degrades to "nothing here", same as an empty
            // document; dispatch will move on to the next format.
            return Ok(Vec::new());
        };
        self.kml.read_features_with(&text, &*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use ::zip::write::FileOptions;

    fn build_kmz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn resolve_before_any_decode_passes_through() {
        let format = KmzFormat::new();
        assert_eq!(
            format.resolve_image("images/pin.png"),
            IconSource::Remote("images/pin.png".to_string())
        );
    }

    #[test]
    fn resolve_matches_exact_entry_name() {
        let mut format = KmzFormat::new();
        let buffer = build_kmz(&[("doc.kml", b"<kml/>"), ("images/pin.png", b"\x89PNG")]);
        format.decode(&buffer).unwrap();

        match format.resolve_image("images/pin.png") {
            IconSource::Embedded { name, bytes } => {
                assert_eq!(name, "images/pin.png");
                assert_eq!(&*bytes, b"\x89PNG");
            }
            other => panic!("expected embedded icon, got {other:?}"),
        }
    }

    #[test]
    fn resolve_matches_final_path_segment() {
        let mut format = KmzFormat::new();
        let buffer = build_kmz(&[("doc.kml", b"<kml/>"), ("icon.png", b"\x89PNG")]);
        format.decode(&buffer).unwrap();

        assert!(format.resolve_image("../assets/icon.png").is_embedded());
    }

    #[test]
    fn unmatched_reference_passes_through() {
        let mut format = KmzFormat::new();
        let buffer = build_kmz(&[("doc.kml", b"<kml/>"), ("images/pin.png", b"\x89PNG")]);
        format.decode(&buffer).unwrap();

        assert_eq!(
            format.resolve_image("http://example.com/pin.png"),
            IconSource::Remote("http://example.com/pin.png".to_string())
        );
    }

    #[test]
    fn decode_replaces_resolution_context() {
        let mut format = KmzFormat::new();
        let first = build_kmz(&[("doc.kml", b"<kml/>"), ("a.png", b"a")]);
        let second = build_kmz(&[("doc.kml", b"<kml/>"), ("b.png", b"b")]);

        format.decode(&first).unwrap();
        assert!(format.resolve_image("a.png").is_embedded());

        format.decode(&second).unwrap();
        assert!(!format.resolve_image("a.png").is_embedded());
        assert!(format.resolve_image("b.png").is_embedded());
    }

    #[test]
    fn archive_without_kml_still_becomes_context() {
        let mut format = KmzFormat::new();
        let buffer = build_kmz(&[("images/pin.png", b"\x89PNG")]);

        assert!(format.decode(&buffer).unwrap().is_none());
        assert!(format.resolve_image("images/pin.png").is_embedded());
    }

    // Only the reference is stripped to its final segment; entries are
    // never matched by their own basename.
    #[test]
    fn entries_are_not_matched_by_their_basename() {
        let mut format = KmzFormat::new();
        let buffer = build_kmz(&[("doc.kml", b"<kml/>"), ("images/pin.png", b"\x89PNG")]);
        format.decode(&buffer).unwrap();

        assert_eq!(
            format.resolve_image("pin.png"),
            IconSource::Remote("pin.png".to_string())
        );
    }
}
