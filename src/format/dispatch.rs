//! Dropped-file dispatch across registered formats.

use anyhow::{Result, bail};
use log::debug;

use super::feature::Feature;
use super::geojson::GeoJsonFormat;
use super::gpx::GpxFormat;
use super::kml::KmlFormat;
use super::kmz::KmzFormat;
use super::{FeatureFormat, FormatInput, InputKind};

/// The outcome of a successful dispatch: which format accepted the file
/// and what it read.
pub struct DroppedFeatures {
    pub format: &'static str,
    pub features: Vec<Feature>,
}

/// Ordered list of formats a dropped file is offered to.
///
/// Formats are tried in registration order; the first one that reads a
/// non-empty feature set wins. Binary formats receive the raw bytes,
/// text formats a lossy UTF-8 view, so a binary container like KMZ is
/// never mangled by text decoding.
pub struct FormatRegistry {
    formats: Vec<Box<dyn FeatureFormat>>,
}

impl FormatRegistry {
    /// An empty registry; the host registers its own formats.
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// The stock lineup: KMZ first (it must see raw bytes before any
    /// text format gets a chance), then GPX, GeoJSON and KML.
    pub fn defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(KmzFormat::new()));
        registry.register(Box::new(GpxFormat));
        registry.register(Box::new(GeoJsonFormat));
        registry.register(Box::new(KmlFormat::new()));
        registry
    }

    pub fn register(&mut self, format: Box<dyn FeatureFormat>) {
        self.formats.push(format);
    }

    /// Offer a dropped file's bytes to each format in turn.
    ///
    /// Rejections and empty reads are logged at debug level and skipped;
    /// an error is returned only once every format has been exhausted.
    pub fn read(&mut self, bytes: &[u8]) -> Result<DroppedFeatures> {
        if self.formats.is_empty() {
            bail!("no formats registered");
        }

        for format in &mut self.formats {
            let name = format.name();
            let result = match format.input_kind() {
                InputKind::Binary => format.read_features(FormatInput::Binary(bytes)),
                InputKind::Text => {
                    let text = String::from_utf8_lossy(bytes);
                    format.read_features(FormatInput::Text(&text))
                }
            };

            match result {
                Ok(features) if !features.is_empty() => {
                    debug!("dispatch: {} read {} feature(s)", name, features.len());
                    return Ok(DroppedFeatures {
                        format: name,
                        features,
                    });
                }
                Ok(_) => debug!("dispatch: {name} found no features"),
                Err(err) => debug!("dispatch: {name} rejected input: {err:#}"),
            }
        }

        bail!("no registered format could read the dropped file")
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_registry_errors() {
        let mut registry = FormatRegistry::new();
        assert!(registry.read(b"{}").is_err());
    }

    #[test]
    fn geojson_text_routes_to_geojson() {
        let mut registry = FormatRegistry::defaults();
        let dropped = registry
            .read(br#"{"type":"Point","coordinates":[1.0,2.0]}"#)
            .unwrap();
        assert_eq!(dropped.format, "geojson");
        assert_eq!(dropped.features.len(), 1);
    }

    #[test]
    fn unreadable_input_exhausts_all_formats() {
        let mut registry = FormatRegistry::defaults();
        assert!(registry.read(b"certainly not a geo file").is_err());
    }
}
