use std::path::Path;

use gdal::programs::vector::{vector_translate, VectorTranslateOptions};
use gdal::Dataset;
use tracing::debug;

use crate::errors::Result;
use crate::metadata::LucasMetadata;

/// Converts `dataset` into a GeoPackage at `path`, replacing any existing file.
///
/// The layer is named after the LUCAS table and `metadata` is stored as
/// dataset metadata items. An existing file is left untouched when the
/// conversion fails.
pub(crate) fn write_gpkg(dataset: &Dataset, path: &Path, metadata: &LucasMetadata) -> Result<()> {
    replace_file(path, |target| {
        let mut args = vec!["-f", "GPKG"];
        if let Some(table) = metadata.table() {
            args.extend(["-nln", table]);
        }
        let options = VectorTranslateOptions::new(args)?;
        let mut gpkg = vector_translate(&[dataset], target.try_into()?, Some(options))?;
        metadata.apply_to(&mut gpkg)?;
        // flushed and closed on drop
        Ok(())
    })
}

/// Lets `write` create the file in a scratch directory next to `path` and
/// moves it over `path` once `write` succeeded.
fn replace_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let scratch = tempfile::Builder::new()
        .prefix(".st_lucas")
        .tempdir_in(parent)?;
    let staged = scratch.path().join(path.file_name().unwrap_or("export".as_ref()));

    write(&staged)?;

    if path.exists() {
        debug!(path = %path.display(), "Replacing existing file");
    }
    std::fs::rename(&staged, path)?;
    Ok(())
}
