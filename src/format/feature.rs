use std::sync::Arc;

/// A resolved image reference from a feature style.
///
/// `Embedded` exposes an archive entry's bytes as a refcounted handle;
/// the caller owns its clones and the bytes are released when the last
/// clone is dropped. `Remote` passes the original reference string
/// through untouched, on the assumption it is resolvable outside the
/// archive (an absolute URL, typically).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    Embedded { name: String, bytes: Arc<[u8]> },
    Remote(String),
}

impl IconSource {
    pub fn is_embedded(&self) -> bool {
        matches!(self, IconSource::Embedded { .. })
    }
}

/// Style information attached to a feature.
///
/// Only the icon is modeled; colors, line widths and the rest of the
/// KML styling vocabulary stay with the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureStyle {
    pub icon: Option<IconSource>,
}

/// One geographic feature read from a dropped file.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: Option<String>,
    pub geometry: geo_types::Geometry<f64>,
    pub style: Option<FeatureStyle>,
}

impl Feature {
    pub fn new(geometry: geo_types::Geometry<f64>) -> Self {
        Self {
            name: None,
            geometry,
            style: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Short label for the geometry kind, for listings and logs.
    pub fn geometry_kind(&self) -> &'static str {
        use geo_types::Geometry::*;
        match &self.geometry {
            Point(_) => "Point",
            Line(_) => "Line",
            LineString(_) => "LineString",
            Polygon(_) => "Polygon",
            MultiPoint(_) => "MultiPoint",
            MultiLineString(_) => "MultiLineString",
            MultiPolygon(_) => "MultiPolygon",
            GeometryCollection(_) => "GeometryCollection",
            Rect(_) => "Rect",
            Triangle(_) => "Triangle",
        }
    }
}
