use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use gdal::vector::{Feature, LayerAccess};
use gdal::vsi::{create_mem_file, unlink_mem_file};
use gdal::{Dataset, DatasetOptions, GdalOpenFlags};
use tracing::debug;

use crate::config::configure_gdal;
use crate::errors::Result;
use crate::wfs::declared_feature_count;

static NEXT_MEM_FILE: AtomicUsize = AtomicUsize::new(0);

/// A GML payload opened by GDAL from a `/vsimem/` file.
///
/// The in-memory file lives as long as the collection.
pub(crate) struct FeatureCollection {
    dataset: Option<Dataset>,
    mem_file: Option<PathBuf>,
    count: u64,
}

impl FeatureCollection {
    pub(crate) fn empty() -> Self {
        FeatureCollection {
            dataset: None,
            mem_file: None,
            count: 0,
        }
    }

    pub(crate) fn load(gml: &[u8]) -> Result<Self> {
        if declared_feature_count(gml) == Some(0) {
            debug!("Empty feature collection");
            return Ok(Self::empty());
        }
        configure_gdal()?;

        let mem_file = PathBuf::from(format!(
            "/vsimem/st_lucas/{}_{}.gml",
            std::process::id(),
            NEXT_MEM_FILE.fetch_add(1, Ordering::Relaxed)
        ));
        create_mem_file(&mem_file, gml.to_vec())?;
        // from here on dropping `collection` cleans up the mem file
        let mut collection = FeatureCollection {
            dataset: None,
            mem_file: Some(mem_file.clone()),
            count: 0,
        };

        let dataset = Dataset::open_ex(
            &mem_file,
            DatasetOptions {
                open_flags: GdalOpenFlags::GDAL_OF_VECTOR | GdalOpenFlags::GDAL_OF_READONLY,
                allowed_drivers: Some(&["GML"]),
                open_options: Some(&["WRITE_GFS=NO"]),
                ..DatasetOptions::default()
            },
        )?;
        collection.count = dataset.layers().map(|layer| layer.feature_count()).sum();
        collection.dataset = Some(dataset);
        Ok(collection)
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }

    /// `None` for an empty collection.
    pub(crate) fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Returns the first `Some` produced by `f` over all features of all layers.
    pub(crate) fn find_map<T, F>(&self, mut f: F) -> Result<Option<T>>
    where
        F: FnMut(&Feature<'_>) -> Result<Option<T>>,
    {
        let Some(dataset) = &self.dataset else {
            return Ok(None);
        };
        for mut layer in dataset.layers() {
            for feature in layer.features() {
                if let Some(found) = f(&feature)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }
}

impl Drop for FeatureCollection {
    fn drop(&mut self) {
        // close the dataset before its file goes away
        self.dataset.take();
        if let Some(mem_file) = self.mem_file.take() {
            if let Err(e) = unlink_mem_file(&mem_file) {
                debug!(path = %mem_file.display(), error = %e, "Unable to unlink mem file");
            }
        }
    }
}

/// Field value as string, `None` when the field is absent or null.
pub(crate) fn field_string(feature: &Feature<'_>, name: &str) -> Result<Option<String>> {
    match feature.field_index(name) {
        Ok(idx) => Ok(feature.field_as_string(idx)?),
        Err(_) => Ok(None),
    }
}

/// Field value as integer, `None` when the field is absent or null.
pub(crate) fn field_i64(feature: &Feature<'_>, name: &str) -> Result<Option<i64>> {
    match feature.field_index(name) {
        Ok(idx) => Ok(feature.field_as_integer64(idx)?),
        Err(_) => Ok(None),
    }
}

/// Whether the feature's layer defines the field.
pub(crate) fn has_field(feature: &Feature<'_>, name: &str) -> bool {
    feature.field_index(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixture_bytes;

    #[test]
    fn test_load_single_feature() {
        let collection = FeatureCollection::load(&fixture_bytes("lucas_st_points.gml")).unwrap();
        assert_eq!(collection.count(), 1);
        assert!(collection.dataset().is_some());
    }

    #[test]
    fn test_empty_never_reaches_gdal() {
        let collection = FeatureCollection::load(&fixture_bytes("empty.gml")).unwrap();
        assert_eq!(collection.count(), 0);
        assert!(collection.dataset().is_none());
    }

    #[test]
    fn test_field_access() {
        let collection = FeatureCollection::load(&fixture_bytes("lucas_points.gml")).unwrap();
        assert_eq!(collection.count(), 4);
        let nuts0 = collection
            .find_map(|feature| {
                if field_i64(feature, "survey_year")? == Some(2018) {
                    field_string(feature, "nuts0")
                } else {
                    Ok(None)
                }
            })
            .unwrap();
        assert_eq!(nuts0.as_deref(), Some("CZ"));
    }

    #[test]
    fn test_missing_field() {
        let collection = FeatureCollection::load(&fixture_bytes("lucas_st_points.gml")).unwrap();
        let found = collection
            .find_map(|feature| {
                assert!(!has_field(feature, "no_such_field"));
                assert!(has_field(feature, "point_id"));
                field_string(feature, "no_such_field")
            })
            .unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_invalid_payload() {
        assert!(FeatureCollection::load(b"definitely not GML").is_err());
    }
}
