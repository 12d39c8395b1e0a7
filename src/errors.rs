use std::ffi::NulError;

use gdal::errors::GdalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LucasError {
    #[error("Unable to download '{url}': {msg}")]
    DownloadError { url: String, msg: String },
    #[error("Invalid LUCAS request: {0}")]
    RequestError(String),
    #[error("LUCAS data error: {0}")]
    DataError(String),
    #[error("No LUCAS data downloaded yet")]
    NoData,
    #[error("Malformed XML document: {0}")]
    XmlError(String),
    #[error("FfiNulError")]
    FfiNulError(#[from] NulError),
    #[error(transparent)]
    GdalError(#[from] GdalError),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl LucasError {
    pub(crate) fn download(url: &str, msg: impl ToString) -> Self {
        LucasError::DownloadError {
            url: url.to_string(),
            msg: msg.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LucasError>;
