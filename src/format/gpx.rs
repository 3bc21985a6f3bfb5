//! GPX text format, backed by the `gpx` crate.

use anyhow::Result;

use super::feature::Feature;
use super::{FeatureFormat, FormatInput};

/// Reads features from GPX text.
///
/// Waypoints become points, tracks become multi-linestrings and routes
/// become linestrings, each carrying its GPX name when present.
pub struct GpxFormat;

impl FeatureFormat for GpxFormat {
    fn name(&self) -> &'static str {
        "gpx"
    }

    fn read_features(&mut self, input: FormatInput<'_>) -> Result<Vec<Feature>> {
        let document = gpx::read(input.as_text()?.as_bytes())?;

        let mut features = Vec::new();

        for waypoint in &document.waypoints {
            features.push(Feature {
                name: waypoint.name.clone(),
                geometry: geo_types::Geometry::Point(waypoint.point()),
                style: None,
            });
        }

        for track in &document.tracks {
            features.push(Feature {
                name: track.name.clone(),
                geometry: geo_types::Geometry::MultiLineString(track.multilinestring()),
                style: None,
            });
        }

        for route in &document.routes {
            features.push(Feature {
                name: route.name.clone(),
                geometry: geo_types::Geometry::LineString(route.linestring()),
                style: None,
            });
        }

        Ok(features)
    }
}
