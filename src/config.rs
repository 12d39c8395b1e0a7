//! Client configuration.
//!
//! [`LucasConfig`] holds the service endpoints. Defaults point at the public
//! ST_LUCAS service and can be overridden from the environment:
//!
//! - `ST_LUCAS_URL`: WFS endpoint
//! - `ST_LUCAS_TIMEOUT`: request timeout in seconds
//!
//! The GDAL side (GML reading, GeoPackage writing) is configured once per
//! process through GDAL configuration options, see [`configure_gdal`].

use std::sync::Once;
use std::time::Duration;

use gdal::errors::CplErrType;
use tracing::{debug, error, trace, warn};

use crate::errors::Result;

pub const DEFAULT_URL: &str = "https://geoforall.fsv.cvut.cz/st_lucas/geoserver/wfs";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_METADATA_TABLE: &str = "lucas:lucas_metadata";
pub const DEFAULT_PHOTO_URL: &str = "https://gisco-services.ec.europa.eu/lucas/photos";

/// GDAL configuration options applied before the first GML payload is opened.
const GDAL_OPTIONS: [(&str, &str); 1] = [
    // keep going when single features of a large download are broken
    ("GML_SKIP_CORRUPTED_FEATURES", "YES"),
];

static GDAL_CONFIGURED: Once = Once::new();

#[derive(Debug, Clone, PartialEq)]
pub struct LucasConfig {
    /// WFS endpoint of the LUCAS feature service.
    pub url: String,
    /// WFS version used for `GetFeature`.
    pub wfs_version: String,
    /// Table holding the database version.
    pub metadata_table: String,
    /// Base URL of the GISCO photo server.
    pub photo_url: String,
    pub timeout: Duration,
}

impl Default for LucasConfig {
    fn default() -> Self {
        LucasConfig {
            url: DEFAULT_URL.to_string(),
            wfs_version: "1.1.0".to_string(),
            metadata_table: DEFAULT_METADATA_TABLE.to_string(),
            photo_url: DEFAULT_PHOTO_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LucasConfig {
    /// Defaults overridden by `ST_LUCAS_URL` and `ST_LUCAS_TIMEOUT`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = LucasConfig::default();
        if let Some(url) = var("ST_LUCAS_URL") {
            config.url = url;
        }
        if let Some(timeout) = var("ST_LUCAS_TIMEOUT") {
            match timeout.parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(_) => warn!(%timeout, "Ignoring invalid ST_LUCAS_TIMEOUT"),
            }
        }
        config
    }
}

/// Applies the GDAL configuration options this crate relies on.
///
/// Runs once per process, later calls are no-ops.
pub fn configure_gdal() -> Result<()> {
    let mut result = Ok(());
    GDAL_CONFIGURED.call_once(|| {
        for (key, value) in GDAL_OPTIONS {
            if let Err(e) = gdal::config::set_config_option(key, value) {
                result = Err(e.into());
                return;
            }
            debug!(key, value, "GDAL config option set");
        }
    });
    result
}

/// Forwards GDAL's CPL error messages to `tracing`.
///
/// This replaces the process-wide GDAL error handler, so it is left to the
/// application to call it.
pub fn route_gdal_errors_to_tracing() {
    gdal::config::set_error_handler(|class, number, msg| match class {
        CplErrType::None => {}
        CplErrType::Debug => trace!(number, "GDAL: {msg}"),
        CplErrType::Warning => warn!(number, "GDAL: {msg}"),
        CplErrType::Failure | CplErrType::Fatal => error!(number, "GDAL: {msg}"),
    });
}
