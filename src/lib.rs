//! Client for the [ST_LUCAS](https://geoforall.fsv.cvut.cz/st_lucas) service
//! publishing the LUCAS (Land Use/Cover Area frame Survey) points.
//!
//! Subsets are selected with a [`LucasRequest`], downloaded through the WFS
//! interface of the service with a [`LucasIo`] and exported to GeoPackage
//! using [GDAL](http://gdal.org/).
//!
//! ## Use
//!
//! ```rust, no_run
//! use st_lucas::{LucasIo, LucasRequest};
//!
//! let mut request = LucasRequest::new();
//! request.set_bbox(4504276., 3020369., 4689608., 3105290.);
//!
//! let mut lucasio = LucasIo::new();
//! lucasio.download(&request)?;
//! if !lucasio.is_empty()? {
//!     let metadata = lucasio.metadata()?;
//!     println!("{} points from {}", lucasio.count()?, &metadata["LUCAS_TABLE"]);
//!     lucasio.to_gpkg("subset.gpkg")?;
//! }
//! # Ok::<(), st_lucas::errors::LucasError>(())
//! ```

#![crate_name = "st_lucas"]
#![crate_type = "lib"]

pub mod config;
pub mod errors;
pub mod filter;
mod io;
pub mod metadata;
pub mod request;
pub mod transport;
pub mod version;
pub mod wfs;
pub mod xml;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::LucasConfig;
pub use errors::{LucasError, Result};
pub use filter::{ComparisonOperator, Filter};
pub use io::{ImageDirections, LucasIo};
pub use metadata::LucasMetadata;
pub use request::{BuiltRequest, LucasRequest};
pub use version::CLIENT_VERSION;
