use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::errors::{LucasError, Result};
use crate::transport::Transport;

/// A struct that contains a temporary directory and a path to a file in that directory.
pub struct TempFixture {
    _temp_dir: tempfile::TempDir,
    temp_path: PathBuf,
}

impl TempFixture {
    /// Creates a temporary directory and path to a non-existent file with given `name`.
    /// Useful for writing results to during testing
    pub fn empty(name: &str) -> Self {
        let _temp_dir = tempfile::tempdir().unwrap();
        let temp_path = _temp_dir.path().join(name);
        Self {
            _temp_dir,
            temp_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.temp_path
    }
}

impl AsRef<Path> for TempFixture {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

/// Returns the fully qualified path to `filename` in `${CARGO_MANIFEST_DIR}/fixtures`.
pub fn fixture(filename: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(filename)
}

pub fn fixture_bytes(filename: &str) -> Vec<u8> {
    std::fs::read(fixture(filename)).unwrap()
}

/// A request seen by [`FixtureTransport`].
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Route = dyn Fn(&Call) -> Option<Vec<u8>>;

/// [`Transport`] answering from `fixtures/` and recording every call.
///
/// Clones share the call log.
#[derive(Clone)]
pub struct FixtureTransport {
    route: Rc<Route>,
    calls: Rc<RefCell<Vec<Call>>>,
}

pub const FAKE_JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

impl FixtureTransport {
    pub fn new(route: impl Fn(&Call) -> Option<Vec<u8>> + 'static) -> Self {
        FixtureTransport {
            route: Rc::new(route),
            calls: Rc::default(),
        }
    }

    /// Mimics the LUCAS feature service and the photo server.
    ///
    /// Any bounding box with a lower corner at the origin is empty, other
    /// bounding boxes hit the feature cap of 3 advertised in the capabilities.
    pub fn lucas() -> Self {
        Self::new(|call| {
            if call.url.ends_with(".jpg") {
                return Some(FAKE_JPEG.to_vec());
            }
            let name = match (call.param("REQUEST")?, call.param("TYPENAME")) {
                ("GetCapabilities", _) => "capabilities.xml",
                ("GetFeature", Some("lucas:lucas_metadata")) => "lucas_metadata.xml",
                ("GetFeature", Some(typename)) => {
                    let filter = call.param("FILTER").unwrap_or_default();
                    if filter.contains("<gml:lowerCorner>0 0</gml:lowerCorner>") {
                        "empty.gml"
                    } else if filter.contains("<ogc:BBOX") {
                        "lucas_points_bbox.gml"
                    } else if typename == "lucas:lucas_st_points" {
                        "lucas_st_points.gml"
                    } else if typename == "lucas:lucas_points" {
                        "lucas_points.gml"
                    } else {
                        "exception.xml"
                    }
                }
                _ => return None,
            };
            Some(fixture_bytes(name))
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl Transport for FixtureTransport {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<Vec<u8>> {
        let call = Call {
            url: url.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        self.calls.borrow_mut().push(call.clone());
        (self.route)(&call).ok_or_else(|| LucasError::download(url, "http status: 404"))
    }
}
