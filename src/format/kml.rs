//! KML text format, backed by the `kml` crate.
//!
//! This is the collaborator the KMZ adapter delegates to: it owns the
//! actual geometry and style parsing. Every icon href encountered —
//! whether in a shared `<Style id="…">` or a placemark-local `<Style>` —
//! is run through an [`IconResolver`], the seam the KMZ adapter plugs
//! into to substitute archive-embedded images.

use std::collections::HashMap;

use anyhow::Result;
use kml::Kml;
use kml::types::{Coord, Element, Geometry as KmlGeometry, Placemark, Style};

use super::feature::{Feature, FeatureStyle, IconSource};
use super::{FeatureFormat, FormatInput};

/// Maps an icon href as written in the KML document to a loadable
/// resource.
pub trait IconResolver {
    fn resolve_icon(&self, href: &str) -> IconSource;
}

/// Default resolver: every href is treated as already resolvable.
pub struct PassThrough;

impl IconResolver for PassThrough {
    fn resolve_icon(&self, href: &str) -> IconSource {
        IconSource::Remote(href.to_string())
    }
}

/// Reads features from KML text.
pub struct KmlFormat {
    extract_styles: bool,
}

impl KmlFormat {
    pub fn new() -> Self {
        Self {
            extract_styles: true,
        }
    }

    /// Toggle shared-style extraction. With styles off, features carry
    /// geometry and name only.
    pub fn extract_styles(mut self, extract: bool) -> Self {
        self.extract_styles = extract;
        self
    }

    /// Parse KML text into features, resolving icon hrefs through
    /// `resolver`.
    ///
    /// Shared `<Style id="…">` elements are collected first (resolving
    /// each `IconStyle` href on the way), then placemarks are linked to
    /// them by `styleUrl`. A `<Style>` written inline in a placemark is
    /// resolved the same way and takes precedence over the shared one.
    pub fn read_features_with(
        &self,
        text: &str,
        resolver: &dyn IconResolver,
    ) -> Result<Vec<Feature>> {
        let root: Kml = text.parse()?;

        let mut styles = HashMap::new();
        if self.extract_styles {
            collect_styles(&root, resolver, &mut styles);
        }

        let mut features = Vec::new();
        let resolver = self.extract_styles.then_some(resolver);
        collect_features(&root, &styles, resolver, &mut features);
        Ok(features)
    }
}

impl Default for KmlFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureFormat for KmlFormat {
    fn name(&self) -> &'static str {
        "kml"
    }

    fn read_features(&mut self, input: FormatInput<'_>) -> Result<Vec<Feature>> {
        self.read_features_with(input.as_text()?, &PassThrough)
    }
}

fn collect_styles(
    node: &Kml,
    resolver: &dyn IconResolver,
    styles: &mut HashMap<String, FeatureStyle>,
) {
    match node {
        Kml::KmlDocument(doc) => {
            for element in &doc.elements {
                collect_styles(element, resolver, styles);
            }
        }
        Kml::Document { elements, .. } | Kml::Folder { elements, .. } => {
            for element in elements {
                collect_styles(element, resolver, styles);
            }
        }
        Kml::Style(style) => {
            if let (Some(id), Some(feature_style)) = (&style.id, resolve_style(style, resolver)) {
                styles.insert(id.clone(), feature_style);
            }
        }
        _ => {}
    }
}

fn resolve_style(style: &Style, resolver: &dyn IconResolver) -> Option<FeatureStyle> {
    let icon_style = style.icon.as_ref()?;
    let href = icon_style.icon.href.as_str();
    if href.is_empty() {
        return None;
    }
    Some(FeatureStyle {
        icon: Some(resolver.resolve_icon(href)),
    })
}

fn collect_features(
    node: &Kml,
    styles: &HashMap<String, FeatureStyle>,
    resolver: Option<&dyn IconResolver>,
    out: &mut Vec<Feature>,
) {
    match node {
        Kml::KmlDocument(doc) => {
            for element in &doc.elements {
                collect_features(element, styles, resolver, out);
            }
        }
        Kml::Document { elements, .. } | Kml::Folder { elements, .. } => {
            for element in elements {
                collect_features(element, styles, resolver, out);
            }
        }
        Kml::Placemark(placemark) => {
            if let Some(feature) = placemark_to_feature(placemark, styles, resolver) {
                out.push(feature);
            }
        }
        // Bare geometry outside any placemark
        Kml::Point(p) => out.push(Feature::new(geo_types::Point::from(p.clone()).into())),
        Kml::LineString(l) => {
            out.push(Feature::new(geo_types::LineString::from(l.clone()).into()));
        }
        Kml::Polygon(p) => out.push(Feature::new(geo_types::Polygon::from(p.clone()).into())),
        _ => {}
    }
}

fn placemark_to_feature(
    placemark: &Placemark,
    styles: &HashMap<String, FeatureStyle>,
    resolver: Option<&dyn IconResolver>,
) -> Option<Feature> {
    let geometry = convert_geometry(placemark.geometry.as_ref()?)?;

    // Inline style first, then the shared one linked by styleUrl.
    let style = resolver.and_then(|r| inline_style(placemark, r)).or_else(|| {
        placemark
            .style_url
            .as_deref()
            .map(|url| url.trim_start_matches('#'))
            .and_then(|id| styles.get(id))
            .cloned()
    });

    Some(Feature {
        name: placemark.name.clone(),
        geometry,
        style,
    })
}

/// Extract a placemark-local `<Style>`, which the KML reader keeps as a
/// raw element tree under the placemark's children.
fn inline_style(placemark: &Placemark, resolver: &dyn IconResolver) -> Option<FeatureStyle> {
    let style = child_element(&placemark.children, "Style")?;
    let href = child_element(&style.children, "IconStyle")
        .and_then(|icon_style| child_element(&icon_style.children, "Icon"))
        .and_then(|icon| child_element(&icon.children, "href"))
        .and_then(|href| href.content.as_deref())
        .map(str::trim)?;
    if href.is_empty() {
        return None;
    }
    Some(FeatureStyle {
        icon: Some(resolver.resolve_icon(href)),
    })
}

fn child_element<'a>(children: &'a [Element], name: &str) -> Option<&'a Element> {
    children.iter().find(|element| element.name == name)
}

fn convert_geometry(geometry: &KmlGeometry) -> Option<geo_types::Geometry<f64>> {
    match geometry {
        KmlGeometry::Point(p) => Some(geo_types::Point::from(p.clone()).into()),
        KmlGeometry::LineString(l) => Some(geo_types::LineString::from(l.clone()).into()),
        KmlGeometry::LinearRing(r) => Some(linestring_from_coords(&r.coords).into()),
        KmlGeometry::Polygon(p) => Some(geo_types::Polygon::from(p.clone()).into()),
        KmlGeometry::MultiGeometry(mg) => {
            let parts: Vec<_> = mg.geometries.iter().filter_map(convert_geometry).collect();
            if parts.is_empty() {
                None
            } else {
                Some(geo_types::Geometry::GeometryCollection(
                    geo_types::GeometryCollection(parts),
                ))
            }
        }
        _ => None,
    }
}

fn linestring_from_coords(coords: &[Coord]) -> geo_types::LineString<f64> {
    geo_types::LineString::new(
        coords
            .iter()
            .map(|c| geo_types::Coord { x: c.x, y: c.y })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Style id="camp">
      <IconStyle>
        <Icon><href>images/pin.png</href></Icon>
      </IconStyle>
    </Style>
    <Placemark>
      <name>Camp</name>
      <styleUrl>#camp</styleUrl>
      <Point><coordinates>18.5,54.3,0</coordinates></Point>
    </Placemark>
    <Placemark>
      <name>Trail</name>
      <LineString><coordinates>18.5,54.3,0 18.6,54.4,0</coordinates></LineString>
    </Placemark>
  </Document>
</kml>"#;

    #[test]
    fn placemarks_become_named_features() {
        let mut format = KmlFormat::new();
        let features = format.read_features(FormatInput::Text(DOC)).unwrap();

        assert_eq!(features.len(), 2);
        assert_eq!(features[0].name.as_deref(), Some("Camp"));
        assert_eq!(features[0].geometry_kind(), "Point");
        assert_eq!(features[1].name.as_deref(), Some("Trail"));
        assert_eq!(features[1].geometry_kind(), "LineString");
    }

    #[test]
    fn style_icons_pass_through_by_default() {
        let mut format = KmlFormat::new();
        let features = format.read_features(FormatInput::Text(DOC)).unwrap();

        let style = features[0].style.as_ref().expect("styleUrl linked");
        assert_eq!(
            style.icon,
            Some(IconSource::Remote("images/pin.png".to_string()))
        );
    }

    const INLINE_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Style id="camp">
      <IconStyle>
        <Icon><href>images/shared.png</href></Icon>
      </IconStyle>
    </Style>
    <Placemark>
      <name>Summit</name>
      <styleUrl>#camp</styleUrl>
      <Style>
        <IconStyle>
          <Icon><href>images/summit.png</href></Icon>
        </IconStyle>
      </Style>
      <Point><coordinates>18.5,54.3,0</coordinates></Point>
    </Placemark>
  </Document>
</kml>"#;

    #[test]
    fn inline_style_icons_reach_the_resolver() {
        struct Recorder;
        impl IconResolver for Recorder {
            fn resolve_icon(&self, href: &str) -> IconSource {
                IconSource::Remote(format!("resolved:{href}"))
            }
        }

        let features = KmlFormat::new()
            .read_features_with(INLINE_DOC, &Recorder)
            .unwrap();

        // The placemark-local style wins over the shared one.
        let style = features[0].style.as_ref().expect("inline style kept");
        assert_eq!(
            style.icon,
            Some(IconSource::Remote("resolved:images/summit.png".to_string()))
        );
    }

    #[test]
    fn styles_can_be_disabled() {
        let mut format = KmlFormat::new().extract_styles(false);
        let features = format.read_features(FormatInput::Text(DOC)).unwrap();
        assert!(features[0].style.is_none());

        // Inline styles are skipped too
        let features = format.read_features(FormatInput::Text(INLINE_DOC)).unwrap();
        assert!(features[0].style.is_none());
    }

    #[test]
    fn binary_input_is_refused() {
        let mut format = KmlFormat::new();
        assert!(format.read_features(FormatInput::Binary(b"PK")).is_err());
    }
}
