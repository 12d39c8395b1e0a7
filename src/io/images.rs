//! Survey photos of LUCAS points.
//!
//! Each survey visit produces up to five photos: one of the point itself and
//! one towards each cardinal direction. Their URLs are attributes of the
//! downloaded features; when a table lacks them they are composed from the
//! GISCO photo server layout, for visits the point has survey data of.

use std::collections::BTreeMap;

use bitflags::bitflags;
use gdal::vector::Feature;

use super::features::{field_i64, field_string, has_field, FeatureCollection};
use crate::errors::{LucasError, Result};
use crate::request::SURVEY_YEARS;

bitflags! {
    /// Selection of survey photos.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageDirections: u8 {
        /// Photo of the point itself.
        const POINT = 0x01;
        const NORTH = 0x02;
        const SOUTH = 0x04;
        const EAST = 0x08;
        const WEST = 0x10;
    }
}

const DIRECTIONS: [(ImageDirections, &str, &str); 5] = [
    (ImageDirections::POINT, "P", "point"),
    (ImageDirections::NORTH, "N", "north"),
    (ImageDirections::SOUTH, "S", "south"),
    (ImageDirections::EAST, "E", "east"),
    (ImageDirections::WEST, "W", "west"),
];

impl ImageDirections {
    /// Image identifier used as key and file name suffix, e.g. `N`.
    ///
    /// Empty unless `self` is a single direction.
    pub fn label(self) -> &'static str {
        DIRECTIONS
            .iter()
            .find(|(direction, _, _)| *direction == self)
            .map_or("", |(_, label, _)| *label)
    }

    fn attribute(self) -> &'static str {
        DIRECTIONS
            .iter()
            .find(|(direction, _, _)| *direction == self)
            .map_or("", |(_, _, attribute)| *attribute)
    }
}

/// Photo URLs of `point_id` surveyed in `year`, keyed by [`ImageDirections::label`].
///
/// Empty when the point was not visited in `year`.
pub(crate) fn image_urls(
    features: &FeatureCollection,
    st_aggregated: bool,
    year: u16,
    point_id: u64,
    directions: ImageDirections,
    photo_url: &str,
) -> Result<BTreeMap<&'static str, String>> {
    if !SURVEY_YEARS.contains(&year) {
        return Err(LucasError::RequestError(format!(
            "{year} is not a LUCAS survey year"
        )));
    }
    let lookup = ImageLookup {
        st_aggregated,
        year,
        point_id,
        photo_url,
    };
    features
        .find_map(|feature| lookup.urls(feature, directions))?
        .ok_or_else(|| {
            LucasError::DataError(format!(
                "point {point_id} surveyed in {year} is not part of the downloaded data"
            ))
        })
}

struct ImageLookup<'a> {
    st_aggregated: bool,
    year: u16,
    point_id: u64,
    photo_url: &'a str,
}

impl ImageLookup<'_> {
    /// `None` unless `feature` is the requested point and year.
    fn urls(
        &self,
        feature: &Feature<'_>,
        directions: ImageDirections,
    ) -> Result<Option<BTreeMap<&'static str, String>>> {
        if field_i64(feature, "point_id")? != Some(self.point_id as i64) {
            return Ok(None);
        }
        if !self.st_aggregated && field_i64(feature, "survey_year")? != Some(self.year.into()) {
            return Ok(None);
        }

        let surveyed = self.surveyed(feature)?;
        let mut urls = BTreeMap::new();
        for direction in directions.iter() {
            let attribute = self.attribute_name(direction);
            let url = if has_field(feature, &attribute) {
                field_string(feature, &attribute)?.filter(|url| has_value(url))
            } else if surveyed {
                self.gisco_url(feature, direction)?
            } else {
                None
            };
            if let Some(url) = url {
                urls.insert(direction.label(), url);
            }
        }
        Ok(Some(urls))
    }

    /// Aggregated rows carry land cover for every year the point was visited.
    fn surveyed(&self, feature: &Feature<'_>) -> Result<bool> {
        if !self.st_aggregated {
            return Ok(true);
        }
        let land_cover = field_string(feature, &format!("lc1_{}", self.year))?;
        Ok(land_cover.is_some_and(|lc| has_value(&lc)))
    }

    fn attribute_name(&self, direction: ImageDirections) -> String {
        let name = format!("file_path_gisco_{}", direction.attribute());
        if self.st_aggregated {
            format!("{name}_{}", self.year)
        } else {
            name
        }
    }

    fn gisco_url(
        &self,
        feature: &Feature<'_>,
        direction: ImageDirections,
    ) -> Result<Option<String>> {
        let nuts0 = match field_string(feature, &format!("nuts0_{}", self.year))? {
            Some(nuts0) => Some(nuts0),
            None => field_string(feature, "nuts0")?,
        };
        Ok(nuts0.filter(|nuts0| has_value(nuts0)).and_then(|nuts0| {
            gisco_photo_url(self.photo_url, self.year, &nuts0, self.point_id, direction)
        }))
    }
}

/// GISCO photo server layout: `{base}/{year}/{nuts0}/{id[0..3]}/{id[3..6]}/{id}{label}.jpg`.
pub(crate) fn gisco_photo_url(
    base: &str,
    year: u16,
    nuts0: &str,
    point_id: u64,
    direction: ImageDirections,
) -> Option<String> {
    let id = point_id.to_string();
    if id.len() < 6 || direction.label().is_empty() {
        return None;
    }
    Some(format!(
        "{}/{year}/{nuts0}/{}/{}/{id}{}.jpg",
        base.trim_end_matches('/'),
        &id[0..3],
        &id[3..6],
        direction.label()
    ))
}

fn has_value(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.eq_ignore_ascii_case("NA")
}
