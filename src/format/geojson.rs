//! GeoJSON text format, backed by the `geojson` crate.

use anyhow::Result;
use geojson::GeoJson;
use log::debug;

use super::feature::Feature;
use super::{FeatureFormat, FormatInput};

/// Reads features from GeoJSON text.
///
/// Accepts a FeatureCollection, a single Feature, or a bare Geometry.
/// A feature's `name` property, when it is a string, becomes the
/// feature name.
pub struct GeoJsonFormat;

impl FeatureFormat for GeoJsonFormat {
    fn name(&self) -> &'static str {
        "geojson"
    }

    fn read_features(&mut self, input: FormatInput<'_>) -> Result<Vec<Feature>> {
        let geojson: GeoJson = input.as_text()?.parse()?;

        let features = match geojson {
            GeoJson::FeatureCollection(collection) => collection
                .features
                .into_iter()
                .filter_map(convert_feature)
                .collect(),
            GeoJson::Feature(feature) => convert_feature(feature).into_iter().collect(),
            GeoJson::Geometry(geometry) => {
                let geometry: geo_types::Geometry<f64> = geometry.value.try_into()?;
                vec![Feature::new(geometry)]
            }
        };

        Ok(features)
    }
}

fn convert_feature(feature: geojson::Feature) -> Option<Feature> {
    let geometry = feature.geometry?;
    let geometry: geo_types::Geometry<f64> = match geometry.value.try_into() {
        Ok(geometry) => geometry,
        Err(err) => {
            debug!("geojson: skipping unconvertible geometry: {err}");
            return None;
        }
    };

    let name = feature
        .properties
        .as_ref()
        .and_then(|properties| properties.get("name"))
        .and_then(|value| value.as_str())
        .map(String::from);

    Some(Feature {
        name,
        geometry,
        style: None,
    })
}
