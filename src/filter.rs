//! OGC Filter Encoding 1.1 expressions.
//!
//! Filters are written as compact XML with the namespace declarations placed
//! on the root element, which is what the WFS `FILTER` parameter expects:
//!
//! ```rust
//! use st_lucas::filter::{ComparisonOperator, Filter};
//!
//! let filter = Filter::comparison(ComparisonOperator::PropertyIsEqualTo, "nuts0", "CZ");
//! assert_eq!(
//!     filter.to_xml(),
//!     "<ogc:PropertyIsEqualTo xmlns:ogc=\"http://www.opengis.net/ogc\">\
//!      <ogc:PropertyName>nuts0</ogc:PropertyName>\
//!      <ogc:Literal>CZ</ogc:Literal>\
//!      </ogc:PropertyIsEqualTo>"
//! );
//! ```

use std::fmt::{Display, Formatter, Write};

use geo_types::{LineString, Polygon, Rect};

pub const OGC_NAMESPACE: &str = "http://www.opengis.net/ogc";
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml";

/// CRS of the LUCAS geometries (ETRS89-extended / LAEA Europe), easting first.
pub const LUCAS_SRS_NAME: &str = "http://www.opengis.net/gml/srs/epsg.xml#3035";

/// Name of the geometry column of the LUCAS tables.
pub const GEOMETRY_PROPERTY: &str = "geom";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    PropertyIsEqualTo,
    PropertyIsNotEqualTo,
    PropertyIsLessThan,
    PropertyIsGreaterThan,
    PropertyIsLessThanOrEqualTo,
    PropertyIsGreaterThanOrEqualTo,
    /// Pattern match with `*` as wildcard, `.` as single character and `!` as escape.
    PropertyIsLike,
}

impl ComparisonOperator {
    /// Element name without the `ogc:` prefix.
    pub fn element_name(&self) -> &'static str {
        match self {
            ComparisonOperator::PropertyIsEqualTo => "PropertyIsEqualTo",
            ComparisonOperator::PropertyIsNotEqualTo => "PropertyIsNotEqualTo",
            ComparisonOperator::PropertyIsLessThan => "PropertyIsLessThan",
            ComparisonOperator::PropertyIsGreaterThan => "PropertyIsGreaterThan",
            ComparisonOperator::PropertyIsLessThanOrEqualTo => "PropertyIsLessThanOrEqualTo",
            ComparisonOperator::PropertyIsGreaterThanOrEqualTo => {
                "PropertyIsGreaterThanOrEqualTo"
            }
            ComparisonOperator::PropertyIsLike => "PropertyIsLike",
        }
    }
}

impl Display for ComparisonOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.element_name())
    }
}

/// OGC filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Comparison {
        operator: ComparisonOperator,
        property: String,
        literal: String,
    },
    BBox {
        property: String,
        envelope: Rect<f64>,
    },
    Intersects {
        property: String,
        polygon: Polygon<f64>,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// `ogc:<operator>` comparing `property` with `literal`.
    pub fn comparison(
        operator: ComparisonOperator,
        property: impl Into<String>,
        literal: impl Into<String>,
    ) -> Self {
        Filter::Comparison {
            operator,
            property: property.into(),
            literal: literal.into(),
        }
    }

    /// `ogc:BBOX` over the point geometry, `envelope` in EPSG:3035.
    pub fn bbox(envelope: Rect<f64>) -> Self {
        Filter::BBox {
            property: GEOMETRY_PROPERTY.to_string(),
            envelope,
        }
    }

    /// `ogc:Intersects` with `polygon` in EPSG:3035.
    pub fn intersects(polygon: Polygon<f64>) -> Self {
        Filter::Intersects {
            property: GEOMETRY_PROPERTY.to_string(),
            polygon,
        }
    }

    /// Joins `filters` with `ogc:Or`, or returns the only one unwrapped.
    pub fn any_of(mut filters: Vec<Filter>) -> Option<Self> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::Or(filters)),
        }
    }

    /// Joins `filters` with `ogc:And`, or returns the only one unwrapped.
    pub fn all_of(mut filters: Vec<Filter>) -> Option<Self> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::And(filters)),
        }
    }

    fn uses_gml(&self) -> bool {
        match self {
            Filter::Comparison { .. } => false,
            Filter::BBox { .. } | Filter::Intersects { .. } => true,
            Filter::And(filters) | Filter::Or(filters) => filters.iter().any(Filter::uses_gml),
        }
    }

    /// Serializes the filter with namespace declarations on the root element.
    pub fn to_xml(&self) -> String {
        let mut namespaces = format!(r#" xmlns:ogc="{OGC_NAMESPACE}""#);
        if self.uses_gml() {
            let _ = write!(namespaces, r#" xmlns:gml="{GML_NAMESPACE}""#);
        }
        let mut out = String::new();
        self.write_xml(&mut out, &namespaces);
        out
    }

    fn write_xml(&self, out: &mut String, namespaces: &str) {
        match self {
            Filter::Comparison {
                operator,
                property,
                literal,
            } => {
                let name = operator.element_name();
                out.push_str("<ogc:");
                out.push_str(name);
                out.push_str(namespaces);
                if *operator == ComparisonOperator::PropertyIsLike {
                    out.push_str(r#" wildCard="*" singleChar="." escapeChar="!""#);
                }
                out.push('>');
                write_property_name(out, property);
                out.push_str("<ogc:Literal>");
                out.push_str(&escape(literal));
                out.push_str("</ogc:Literal>");
                let _ = write!(out, "</ogc:{name}>");
            }
            Filter::BBox { property, envelope } => {
                let _ = write!(out, "<ogc:BBOX{namespaces}>");
                write_property_name(out, property);
                let (min, max) = (envelope.min(), envelope.max());
                let _ = write!(
                    out,
                    r#"<gml:Envelope srsName="{LUCAS_SRS_NAME}"><gml:lowerCorner>{} {}</gml:lowerCorner><gml:upperCorner>{} {}</gml:upperCorner></gml:Envelope>"#,
                    min.x, min.y, max.x, max.y
                );
                out.push_str("</ogc:BBOX>");
            }
            Filter::Intersects { property, polygon } => {
                let _ = write!(out, "<ogc:Intersects{namespaces}>");
                write_property_name(out, property);
                let _ = write!(out, r#"<gml:Polygon srsName="{LUCAS_SRS_NAME}">"#);
                write_ring(out, "exterior", polygon.exterior());
                for interior in polygon.interiors() {
                    write_ring(out, "interior", interior);
                }
                out.push_str("</gml:Polygon></ogc:Intersects>");
            }
            Filter::And(filters) | Filter::Or(filters) => {
                let name = if matches!(self, Filter::And(_)) {
                    "And"
                } else {
                    "Or"
                };
                let _ = write!(out, "<ogc:{name}{namespaces}>");
                for filter in filters {
                    filter.write_xml(out, "");
                }
                let _ = write!(out, "</ogc:{name}>");
            }
        }
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_xml())
    }
}

fn write_property_name(out: &mut String, property: &str) {
    out.push_str("<ogc:PropertyName>");
    out.push_str(&escape(property));
    out.push_str("</ogc:PropertyName>");
}

fn write_ring(out: &mut String, kind: &str, ring: &LineString<f64>) {
    let pos_list = ring
        .coords()
        .map(|c| format!("{} {}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = write!(
        out,
        "<gml:{kind}><gml:LinearRing><gml:posList>{pos_list}</gml:posList></gml:LinearRing></gml:{kind}>"
    );
}

pub(crate) fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{coord, polygon};

    #[test]
    fn test_equal_to() {
        let filter = Filter::comparison(
            ComparisonOperator::PropertyIsEqualTo,
            "point_id",
            "28382290",
        );
        assert_eq!(
            filter.to_xml(),
            r#"<ogc:PropertyIsEqualTo xmlns:ogc="http://www.opengis.net/ogc"><ogc:PropertyName>point_id</ogc:PropertyName><ogc:Literal>28382290</ogc:Literal></ogc:PropertyIsEqualTo>"#
        );
    }

    #[test]
    fn test_like_attributes() {
        let filter = Filter::comparison(ComparisonOperator::PropertyIsLike, "lc1", "B1*");
        assert_eq!(
            filter.to_xml(),
            r#"<ogc:PropertyIsLike xmlns:ogc="http://www.opengis.net/ogc" wildCard="*" singleChar="." escapeChar="!"><ogc:PropertyName>lc1</ogc:PropertyName><ogc:Literal>B1*</ogc:Literal></ogc:PropertyIsLike>"#
        );
    }

    #[test]
    fn test_literal_is_escaped() {
        let filter = Filter::comparison(
            ComparisonOperator::PropertyIsNotEqualTo,
            "obs_type",
            "a<b & \"c\"",
        );
        assert!(filter
            .to_xml()
            .contains("<ogc:Literal>a&lt;b &amp; &quot;c&quot;</ogc:Literal>"));
    }

    #[test]
    fn test_bbox() {
        let envelope = Rect::new(coord! { x: 1., y: 1. }, coord! { x: 0., y: 0. });
        assert_eq!(
            Filter::bbox(envelope).to_xml(),
            r#"<ogc:BBOX xmlns:ogc="http://www.opengis.net/ogc" xmlns:gml="http://www.opengis.net/gml"><ogc:PropertyName>geom</ogc:PropertyName><gml:Envelope srsName="http://www.opengis.net/gml/srs/epsg.xml#3035"><gml:lowerCorner>0 0</gml:lowerCorner><gml:upperCorner>1 1</gml:upperCorner></gml:Envelope></ogc:BBOX>"#
        );
    }

    #[test]
    fn test_intersects() {
        let aoi = polygon![
            (x: 4500000., y: 3000000.),
            (x: 4600000., y: 3000000.),
            (x: 4600000., y: 3100000.5),
        ];
        assert_eq!(
            Filter::intersects(aoi).to_xml(),
            r#"<ogc:Intersects xmlns:ogc="http://www.opengis.net/ogc" xmlns:gml="http://www.opengis.net/gml"><ogc:PropertyName>geom</ogc:PropertyName><gml:Polygon srsName="http://www.opengis.net/gml/srs/epsg.xml#3035"><gml:exterior><gml:LinearRing><gml:posList>4500000 3000000 4600000 3000000 4600000 3100000.5 4500000 3000000</gml:posList></gml:LinearRing></gml:exterior></gml:Polygon></ogc:Intersects>"#
        );
    }

    #[test]
    fn test_namespaces_on_root_only() {
        let years = Filter::any_of(vec![
            Filter::comparison(ComparisonOperator::PropertyIsEqualTo, "survey_year", "2015"),
            Filter::comparison(ComparisonOperator::PropertyIsEqualTo, "survey_year", "2018"),
        ])
        .unwrap();
        let country = Filter::comparison(ComparisonOperator::PropertyIsEqualTo, "nuts0", "CZ");
        let filter = Filter::all_of(vec![country, years]).unwrap();
        assert_eq!(
            filter.to_xml(),
            concat!(
                r#"<ogc:And xmlns:ogc="http://www.opengis.net/ogc">"#,
                r#"<ogc:PropertyIsEqualTo><ogc:PropertyName>nuts0</ogc:PropertyName><ogc:Literal>CZ</ogc:Literal></ogc:PropertyIsEqualTo>"#,
                r#"<ogc:Or>"#,
                r#"<ogc:PropertyIsEqualTo><ogc:PropertyName>survey_year</ogc:PropertyName><ogc:Literal>2015</ogc:Literal></ogc:PropertyIsEqualTo>"#,
                r#"<ogc:PropertyIsEqualTo><ogc:PropertyName>survey_year</ogc:PropertyName><ogc:Literal>2018</ogc:Literal></ogc:PropertyIsEqualTo>"#,
                r#"</ogc:Or></ogc:And>"#
            )
        );
    }

    #[test]
    fn test_single_filter_unwrapped() {
        let only = Filter::comparison(ComparisonOperator::PropertyIsLessThan, "survey_count", "3");
        assert_eq!(Filter::all_of(vec![only.clone()]), Some(only.clone()));
        assert_eq!(Filter::any_of(vec![only.clone()]), Some(only));
        assert_eq!(Filter::any_of(vec![]), None);
    }
}
