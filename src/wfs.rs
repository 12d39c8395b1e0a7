//! WFS key/value requests against the LUCAS feature service.

use tracing::debug;

use crate::config::LucasConfig;
use crate::errors::{LucasError, Result};
use crate::request::BuiltRequest;
use crate::transport::Transport;
use crate::version::DbVersion;
use crate::xml::XmlTree;

/// `CountDefault` is only advertised by WFS 2.0.0 capabilities.
const CAPABILITIES_VERSION: &str = "2.0.0";

/// How much of a payload is inspected for root element attributes.
const HEADER_LEN: usize = 4096;

/// Server characteristics reported in the result metadata.
/// Service properties recorded in the result metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    /// Maximum number of features returned by a single `GetFeature`.
    pub max_features: u64,
    pub db_version: DbVersion,
}

/// Runs `GetFeature` for `request` and returns the GML payload.
pub fn get_feature(
    transport: &dyn Transport,
    config: &LucasConfig,
    request: &BuiltRequest,
) -> Result<Vec<u8>> {
    let mut params = vec![
        ("SERVICE", "WFS"),
        ("VERSION", config.wfs_version.as_str()),
        ("REQUEST", "GetFeature"),
        ("TYPENAME", request.typename.as_str()),
    ];
    if let Some(filter) = &request.filter {
        params.push(("FILTER", filter.as_str()));
    }
    let body = transport.get(&config.url, &params)?;
    check_exception(&config.url, &body)?;
    debug!(typename = %request.typename, bytes = body.len(), "GetFeature done");
    Ok(body)
}

/// Reads the feature cap from the capabilities and the database version from
/// the metadata table.
pub fn server_info(transport: &dyn Transport, config: &LucasConfig) -> Result<ServerInfo> {
    let capabilities = transport.get(
        &config.url,
        &[
            ("SERVICE", "WFS"),
            ("VERSION", CAPABILITIES_VERSION),
            ("REQUEST", "GetCapabilities"),
        ],
    )?;
    check_exception(&config.url, &capabilities)?;
    let max_features = count_default(&config.url, &capabilities)?;

    let metadata = transport.get(
        &config.url,
        &[
            ("SERVICE", "WFS"),
            ("VERSION", config.wfs_version.as_str()),
            ("REQUEST", "GetFeature"),
            ("TYPENAME", config.metadata_table.as_str()),
        ],
    )?;
    check_exception(&config.url, &metadata)?;
    let db_version = db_version(&config.url, &metadata)?;

    debug!(max_features, %db_version, "Server info");
    Ok(ServerInfo {
        max_features,
        db_version,
    })
}

/// Fails with a download error when `body` is an OWS exception report.
pub fn check_exception(url: &str, body: &[u8]) -> Result<()> {
    if !String::from_utf8_lossy(header(body)).contains("ExceptionReport") {
        return Ok(());
    }
    let xml = parse(url, body)?;
    let Some(root) = xml.root() else {
        return Ok(());
    };
    if !root.local_name().ends_with("ExceptionReport") {
        return Ok(());
    }
    let texts: Vec<String> = root
        .descendants()
        .filter(|e| matches!(e.local_name(), "ExceptionText" | "ServiceException"))
        .filter_map(|e| e.text())
        .collect();
    let msg = if texts.is_empty() {
        "service exception".to_string()
    } else {
        texts.join("; ")
    };
    Err(LucasError::download(url, msg))
}

/// Number of features declared on the feature collection root, if any.
pub fn declared_feature_count(body: &[u8]) -> Option<u64> {
    let head = String::from_utf8_lossy(header(body));
    ["numberOfFeatures=\"", "numberReturned=\""]
        .iter()
        .find_map(|attr| {
            let start = head.find(attr)? + attr.len();
            let len = head[start..].find('"')?;
            head[start..start + len].parse().ok()
        })
}

fn header(body: &[u8]) -> &[u8] {
    &body[..body.len().min(HEADER_LEN)]
}

fn parse(url: &str, body: &[u8]) -> Result<XmlTree> {
    let text = std::str::from_utf8(body)
        .map_err(|e| LucasError::download(url, format!("response is not UTF-8: {e}")))?;
    XmlTree::parse(text)
}

fn count_default(url: &str, capabilities: &[u8]) -> Result<u64> {
    let xml = parse(url, capabilities)?;
    let root = xml
        .root()
        .ok_or_else(|| LucasError::download(url, "empty capabilities document"))?;
    let count = root
        .descendants()
        .filter(|e| e.local_name() == "Constraint")
        .find(|e| e.attribute("name") == Some("CountDefault"))
        .and_then(|e| e.find("DefaultValue"))
        .and_then(|e| e.text())
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| LucasError::download(url, "capabilities do not advertise CountDefault"));
    count
}

fn db_version(url: &str, metadata: &[u8]) -> Result<DbVersion> {
    let xml = parse(url, metadata)?;
    xml.root()
        .and_then(|root| root.find("version"))
        .and_then(|e| e.text())
        .ok_or_else(|| LucasError::download(url, "metadata table does not contain a version"))?
        .parse()
}
