use std::collections::BTreeMap;
use std::ops::Index;

use gdal::Metadata;

use crate::errors::Result;
use crate::version::{DbVersion, CLIENT_VERSION};

pub const LUCAS_TABLE: &str = "LUCAS_TABLE";
pub const LUCAS_ST: &str = "LUCAS_ST";
pub const LUCAS_CLIENT_VERSION: &str = "LUCAS_CLIENT_VERSION";
pub const LUCAS_DB_VERSION: &str = "LUCAS_DB_VERSION";
pub const LUCAS_MAX_FEATURES: &str = "LUCAS_MAX_FEATURES";

/// Describes how a result set was produced.
///
/// Keys are the `LUCAS_*` constants of this module; values are strings, as
/// they end up as metadata items of the exported GeoPackage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LucasMetadata(BTreeMap<String, String>);

impl LucasMetadata {
    /// Items describing a download from `table`.
    pub fn new(table: &str, st_aggregated: bool, db_version: &DbVersion, max_features: u64) -> Self {
        let mut items = BTreeMap::new();
        items.insert(LUCAS_TABLE.to_string(), table.to_string());
        items.insert(
            LUCAS_ST.to_string(),
            if st_aggregated { "1" } else { "0" }.to_string(),
        );
        items.insert(LUCAS_CLIENT_VERSION.to_string(), CLIENT_VERSION.to_string());
        items.insert(LUCAS_DB_VERSION.to_string(), db_version.to_string());
        items.insert(LUCAS_MAX_FEATURES.to_string(), max_features.to_string());
        LucasMetadata(items)
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Items in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Table name without namespace prefix.
    pub fn table(&self) -> Option<&str> {
        self.get(LUCAS_TABLE)
    }

    /// Whether the space-time aggregated table was queried.
    pub fn st_aggregated(&self) -> bool {
        self.get(LUCAS_ST) == Some("1")
    }

    /// Server-side cap on the number of returned features.
    pub fn max_features(&self) -> Option<u64> {
        self.get(LUCAS_MAX_FEATURES)?.parse().ok()
    }

    /// Writes every item into the default metadata domain of `target`.
    pub fn apply_to<M: Metadata>(&self, target: &mut M) -> Result<()> {
        for (key, value) in self.iter() {
            target.set_metadata_item(key, value, "")?;
        }
        Ok(())
    }
}

impl Index<&str> for LucasMetadata {
    type Output = str;

    fn index(&self, key: &str) -> &str {
        self.get(key)
            .unwrap_or_else(|| panic!("no metadata item '{key}'"))
    }
}
