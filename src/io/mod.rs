//! Downloading LUCAS subsets and working with the result.
//!
//! ```rust, no_run
//! use st_lucas::{ComparisonOperator, LucasIo, LucasRequest};
//!
//! let mut request = LucasRequest::new();
//! request.set_predicate(ComparisonOperator::PropertyIsEqualTo, "point_id", 28382290);
//! request.st_aggregated = true;
//!
//! let mut lucasio = LucasIo::new();
//! lucasio.download(&request)?;
//! println!("{} features", lucasio.count()?);
//! lucasio.to_gpkg("28382290.gpkg")?;
//! # Ok::<(), st_lucas::errors::LucasError>(())
//! ```

mod export;
mod features;
mod images;


use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use images::ImageDirections;

use crate::config::LucasConfig;
use crate::errors::{LucasError, Result};
use crate::metadata::LucasMetadata;
use crate::request::{BuiltRequest, LucasRequest};
use crate::transport::{HttpTransport, Transport};
use crate::wfs;
use features::FeatureCollection;

/// Downloads LUCAS features and holds the result of the last download.
pub struct LucasIo {
    config: LucasConfig,
    transport: Box<dyn Transport>,
    result: Option<ResultSet>,
}

/// Everything produced by one download.
struct ResultSet {
    request: BuiltRequest,
    st_aggregated: bool,
    gml: Vec<u8>,
    features: FeatureCollection,
    metadata: LucasMetadata,
}

impl Default for LucasIo {
    fn default() -> Self {
        Self::new()
    }
}

impl LucasIo {
    /// Client configured from the environment, see [`LucasConfig::from_env`].
    pub fn new() -> Self {
        Self::with_config(LucasConfig::from_env())
    }

    /// Client talking HTTP to the endpoints of `config`.
    pub fn with_config(config: LucasConfig) -> Self {
        let transport = HttpTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }

    /// Client talking to the service through `transport`.
    pub fn with_transport(config: LucasConfig, transport: impl Transport + 'static) -> Self {
        LucasIo {
            config,
            transport: Box::new(transport),
            result: None,
        }
    }

    pub fn config(&self) -> &LucasConfig {
        &self.config
    }

    /// Downloads the features matching `request`.
    ///
    /// The result of a previous download is discarded first, also when this
    /// download fails.
    pub fn download(&mut self, request: &LucasRequest) -> Result<()> {
        self.result = None;

        let built = request.build()?;
        debug!(typename = %built.typename, filter = ?built.filter, "Downloading LUCAS features");
        let gml = wfs::get_feature(self.transport.as_ref(), &self.config, &built)?;
        let server = wfs::server_info(self.transport.as_ref(), &self.config)?;
        let features = FeatureCollection::load(&gml)?;
        let metadata = LucasMetadata::new(
            built.table(),
            request.st_aggregated,
            &server.db_version,
            server.max_features,
        );
        info!(
            typename = %built.typename,
            count = features.count(),
            max_features = server.max_features,
            "LUCAS features downloaded"
        );

        self.result = Some(ResultSet {
            request: built,
            st_aggregated: request.st_aggregated,
            gml,
            features,
            metadata,
        });
        Ok(())
    }

    fn result(&self) -> Result<&ResultSet> {
        self.result.as_ref().ok_or(LucasError::NoData)
    }

    /// Number of downloaded features.
    pub fn count(&self) -> Result<u64> {
        Ok(self.result()?.features.count())
    }

    /// Whether the last download matched no features.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    /// See [`crate::metadata`] for the keys.
    pub fn metadata(&self) -> Result<&LucasMetadata> {
        Ok(&self.result()?.metadata)
    }

    /// The request the current result was downloaded for.
    pub fn request(&self) -> Result<&BuiltRequest> {
        Ok(&self.result()?.request)
    }

    /// Raw GML payload as returned by the service.
    pub fn data(&self) -> Result<&[u8]> {
        Ok(&self.result()?.gml)
    }

    /// Writes the raw GML payload to `path`.
    pub fn to_gml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let result = self.result()?;
        fs::write(path.as_ref(), &result.gml)?;
        info!(path = %path.as_ref().display(), "GML written");
        Ok(())
    }

    /// Writes the result to a GeoPackage, replacing an existing file.
    pub fn to_gpkg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let result = self.result()?;
        let dataset = result.features.dataset().ok_or_else(|| {
            LucasError::DataError("nothing to export, the downloaded subset is empty".to_string())
        })?;
        export::write_gpkg(dataset, path.as_ref(), &result.metadata)?;
        info!(
            path = %path.as_ref().display(),
            count = result.features.count(),
            "GeoPackage written"
        );
        Ok(())
    }

    /// Photo URLs of `point_id` surveyed in `year`, keyed by `P`, `N`, `S`, `E` and `W`.
    pub fn get_images(&self, year: u16, point_id: u64) -> Result<BTreeMap<&'static str, String>> {
        self.get_images_for(year, point_id, ImageDirections::all())
    }

    /// Like [`LucasIo::get_images`], restricted to `directions`.
    pub fn get_images_for(
        &self,
        year: u16,
        point_id: u64,
        directions: ImageDirections,
    ) -> Result<BTreeMap<&'static str, String>> {
        let result = self.result()?;
        images::image_urls(
            &result.features,
            result.st_aggregated,
            year,
            point_id,
            directions,
            &self.config.photo_url,
        )
    }

    /// Fetches the photos of `point_id` surveyed in `year` into `directory`.
    ///
    /// Files are named `<point_id><P|N|S|E|W>.jpg`.
    pub fn download_images<P: AsRef<Path>>(
        &self,
        year: u16,
        point_id: u64,
        directory: P,
    ) -> Result<BTreeMap<&'static str, PathBuf>> {
        let urls = self.get_images(year, point_id)?;
        let directory = directory.as_ref();
        fs::create_dir_all(directory)?;

        let mut paths = BTreeMap::new();
        for (label, url) in urls {
            let image = self.transport.get(&url, &[])?;
            let path = directory.join(format!("{point_id}{label}.jpg"));
            fs::write(&path, image)?;
            debug!(%url, path = %path.display(), "Photo saved");
            paths.insert(label, path);
        }
        Ok(paths)
    }
}
