//! LUCAS request builder.
//!
//! A [`LucasRequest`] is a plain parameter holder. Fields are set directly and
//! [`LucasRequest::build`] validates them and produces the table name and the
//! OGC filter sent to the feature service.
//!
//! ```rust
//! use st_lucas::{ComparisonOperator, LucasRequest};
//!
//! let request = LucasRequest {
//!     operator: Some(ComparisonOperator::PropertyIsEqualTo),
//!     propertyname: Some("point_id".to_string()),
//!     literal: Some("28382290".to_string()),
//!     st_aggregated: true,
//!     ..LucasRequest::default()
//! };
//! let built = request.build().unwrap();
//! assert_eq!(built.typename, "lucas:lucas_st_points");
//! ```

use geo_types::{coord, Polygon, Rect};

use crate::errors::{LucasError, Result};
use crate::filter::{ComparisonOperator, Filter};

/// Namespace prefix of the LUCAS tables on the feature service.
pub const LUCAS_NAMESPACE_PREFIX: &str = "lucas";

/// Table with one feature per point and survey year.
pub const POINTS_TABLE: &str = "lucas_points";

/// Space-time aggregated table with one feature per point.
pub const ST_POINTS_TABLE: &str = "lucas_st_points";

/// Years in which the LUCAS survey took place.
pub const SURVEY_YEARS: [u16; 6] = [2006, 2009, 2012, 2015, 2018, 2022];

/// Parameters selecting a subset of LUCAS points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LucasRequest {
    /// Attribute predicate, used together with `propertyname` and `literal`.
    pub operator: Option<ComparisonOperator>,
    pub propertyname: Option<String>,
    pub literal: Option<String>,
    /// Query the space-time aggregated table instead of the per-year one.
    pub st_aggregated: bool,
    /// Bounding box in EPSG:3035.
    pub bbox: Option<Rect<f64>>,
    /// NUTS0 country codes, e.g. `CZ`.
    pub countries: Option<Vec<String>>,
    /// Survey years, only for the non-aggregated table.
    pub years: Option<Vec<u16>>,
    /// Area of interest in EPSG:3035.
    pub aoi_polygon: Option<Polygon<f64>>,
}

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRequest {
    /// Qualified table name, e.g. `lucas:lucas_st_points`.
    pub typename: String,
    /// OGC filter XML, `None` for the whole table.
    pub filter: Option<String>,
}

impl BuiltRequest {
    /// Table name without namespace prefix.
    pub fn table(&self) -> &str {
        self.typename
            .split_once(':')
            .map(|(_, table)| table)
            .unwrap_or(&self.typename)
    }
}

impl LucasRequest {
    /// Empty request, the whole non-aggregated table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bounding box from `(min_x, min_y, max_x, max_y)`.
    pub fn set_bbox(&mut self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) {
        self.bbox = Some(Rect::new(
            coord! { x: min_x, y: min_y },
            coord! { x: max_x, y: max_y },
        ));
    }

    /// Sets the attribute predicate.
    pub fn set_predicate(
        &mut self,
        operator: ComparisonOperator,
        propertyname: impl Into<String>,
        literal: impl ToString,
    ) {
        self.operator = Some(operator);
        self.propertyname = Some(propertyname.into());
        self.literal = Some(literal.to_string());
    }

    /// Qualified name of the queried table.
    pub fn typename(&self) -> String {
        let table = if self.st_aggregated {
            ST_POINTS_TABLE
        } else {
            POINTS_TABLE
        };
        format!("{LUCAS_NAMESPACE_PREFIX}:{table}")
    }

    /// Validates the request and serializes its filter.
    pub fn build(&self) -> Result<BuiltRequest> {
        let filter = self.filter()?;
        Ok(BuiltRequest {
            typename: self.typename(),
            filter: filter.map(|f| f.to_xml()),
        })
    }

    /// Validates the request and assembles its filter expression.
    pub fn filter(&self) -> Result<Option<Filter>> {
        let mut primary = Vec::new();
        if let Some(predicate) = self.predicate()? {
            primary.push(predicate);
        }
        if let Some(bbox) = self.bbox {
            let (min, max) = (bbox.min(), bbox.max());
            if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
                return Err(LucasError::RequestError(
                    "bbox coordinates must be finite".to_string(),
                ));
            }
            primary.push(Filter::bbox(bbox));
        }
        if let Some(countries) = &self.countries {
            primary.push(countries_filter(countries)?);
        }
        if let Some(aoi) = &self.aoi_polygon {
            check_aoi(aoi)?;
            primary.push(Filter::intersects(aoi.clone()));
        }
        if primary.len() > 1 {
            return Err(LucasError::RequestError(
                "only one of predicate, bbox, countries and aoi_polygon can be set".to_string(),
            ));
        }

        let mut parts = primary;
        if let Some(years) = &self.years {
            parts.push(self.years_filter(years)?);
        }
        Ok(Filter::all_of(parts))
    }

    fn predicate(&self) -> Result<Option<Filter>> {
        match (&self.operator, &self.propertyname, &self.literal) {
            (None, None, None) => Ok(None),
            (Some(operator), Some(property), Some(literal)) => {
                if property.is_empty() {
                    return Err(LucasError::RequestError(
                        "propertyname must not be empty".to_string(),
                    ));
                }
                Ok(Some(Filter::comparison(
                    *operator,
                    property.as_str(),
                    literal.as_str(),
                )))
            }
            _ => Err(LucasError::RequestError(
                "operator, propertyname and literal must be set together".to_string(),
            )),
        }
    }

    fn years_filter(&self, years: &[u16]) -> Result<Filter> {
        if self.st_aggregated {
            return Err(LucasError::RequestError(
                "years cannot be combined with the space-time aggregated table".to_string(),
            ));
        }
        if let Some(year) = years.iter().find(|y| !SURVEY_YEARS.contains(y)) {
            return Err(LucasError::RequestError(format!(
                "{year} is not a LUCAS survey year"
            )));
        }
        let filters = years
            .iter()
            .map(|year| {
                Filter::comparison(
                    ComparisonOperator::PropertyIsEqualTo,
                    "survey_year",
                    year.to_string(),
                )
            })
            .collect();
        Filter::any_of(filters)
            .ok_or_else(|| LucasError::RequestError("years must not be empty".to_string()))
    }
}

/// Every ring, holes included, must be closed over at least three vertices.
fn check_aoi(aoi: &Polygon<f64>) -> Result<()> {
    for ring in std::iter::once(aoi.exterior()).chain(aoi.interiors()) {
        if ring.0.len() < 4 {
            return Err(LucasError::RequestError(
                "area of interest rings need at least four positions".to_string(),
            ));
        }
        if !ring.coords().all(|c| c.x.is_finite() && c.y.is_finite()) {
            return Err(LucasError::RequestError(
                "area of interest coordinates must be finite".to_string(),
            ));
        }
    }
    Ok(())
}

fn countries_filter(countries: &[String]) -> Result<Filter> {
    let filters = countries
        .iter()
        .map(|code| {
            Filter::comparison(
                ComparisonOperator::PropertyIsEqualTo,
                "nuts0",
                code.to_uppercase(),
            )
        })
        .collect();
    Filter::any_of(filters)
        .ok_or_else(|| LucasError::RequestError("countries must not be empty".to_string()))
}
