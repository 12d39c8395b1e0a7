//! Client and database version handling.
//!
//! The client version is the crate version. The LUCAS database publishes its
//! version as a short decimal string (`"0.9"`, `"1.0"`), which is read
//! leniently into a [`semver::Version`] so it can be compared.
//!
//! ```rust
//! use st_lucas::version::DbVersion;
//!
//! let db: DbVersion = "1.0".parse().unwrap();
//! assert!(db >= "0.9".parse().unwrap());
//! assert_eq!(db.to_string(), "1.0");
//! ```

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use semver::Version;

use crate::errors::LucasError;

/// Version of this client, reported as `LUCAS_CLIENT_VERSION`.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the LUCAS database behind the feature service.
#[derive(Debug, Clone)]
pub struct DbVersion {
    raw: String,
    version: Version,
}

impl DbVersion {
    /// Normalized three-part version.
    pub fn semver(&self) -> &Version {
        &self.version
    }

    /// The string as published by the server.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for DbVersion {
    type Err = LucasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        // pad "1" and "1.0" up to three components
        let mut parts: Vec<&str> = raw.split('.').collect();
        if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(LucasError::DataError(format!(
                "invalid database version '{raw}'"
            )));
        }
        while parts.len() < 3 {
            parts.push("0");
        }
        let version = Version::parse(&parts.join("."))
            .map_err(|e| LucasError::DataError(format!("invalid database version '{raw}': {e}")))?;
        Ok(DbVersion {
            raw: raw.to_string(),
            version,
        })
    }
}

impl PartialEq for DbVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for DbVersion {}

impl PartialOrd for DbVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DbVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

impl Display for DbVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_version() {
        assert!(Version::parse(CLIENT_VERSION).is_ok());
    }

    #[test]
    fn test_short_versions() {
        let v: DbVersion = "0.9".parse().unwrap();
        assert_eq!(v.semver(), &Version::new(0, 9, 0));
        assert_eq!(v.as_str(), "0.9");

        let v: DbVersion = " 1 ".parse().unwrap();
        assert_eq!(v.semver(), &Version::new(1, 0, 0));
        assert_eq!(v.to_string(), "1");
    }

    #[test]
    fn test_ordering() {
        let old: DbVersion = "0.9".parse().unwrap();
        let new: DbVersion = "1.0.1".parse().unwrap();
        assert!(new > old);
        assert_eq!(old, "0.9.0".parse::<DbVersion>().unwrap());
    }

    #[test]
    fn test_invalid() {
        assert!("".parse::<DbVersion>().is_err());
        assert!("1..2".parse::<DbVersion>().is_err());
        assert!("1.2.3.4".parse::<DbVersion>().is_err());
        assert!("one".parse::<DbVersion>().is_err());
    }
}
