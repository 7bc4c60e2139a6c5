//! Trust configuration: the filesystem locations bound to an engine instance.
//!
//! The six paths are established once at initialization and read by every
//! subsequent signing and verification call. The bundle can also be loaded
//! from and saved to a TOML file for deployments that keep the trust layout
//! in configuration management.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Immutable bundle of filesystem locations for one engine instance.
///
/// All paths must reference readable filesystem locations before any signing
/// or verification call can succeed; `validate` is run during engine
/// initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Root directory of the trust material layout.
    pub root_dir: PathBuf,
    /// Key container holding the signer's private key material.
    pub key_container: PathBuf,
    /// Directory of certificate authority certificates.
    pub ca_dir: PathBuf,
    /// Directory of certificate revocation lists. May be empty.
    pub crl_dir: PathBuf,
    /// Certificate identifying the signer (sender identity).
    pub signer_cert: PathBuf,
    /// Certificate identifying the receiver used during verification.
    pub receiver_cert: PathBuf,
}

impl TrustConfig {
    /// Load a trust configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("Loading trust configuration from: {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save the trust configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        log::info!("Saving trust configuration to: {}", path.display());

        let content =
            toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })?;

        fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check that every configured path references a readable location.
    ///
    /// Directories must be enumerable and files openable. The first failure
    /// is reported with the name of the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields: [(&'static str, &Path); 6] = [
            ("root_dir", &self.root_dir),
            ("key_container", &self.key_container),
            ("ca_dir", &self.ca_dir),
            ("crl_dir", &self.crl_dir),
            ("signer_cert", &self.signer_cert),
            ("receiver_cert", &self.receiver_cert),
        ];

        for (field, path) in fields {
            check_readable(field, path)?;
        }
        Ok(())
    }
}

fn check_readable(field: &'static str, path: &Path) -> Result<(), ConfigError> {
    let unreadable = |source| ConfigError::UnreadablePath {
        field,
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).map_err(unreadable)?;
    if metadata.is_dir() {
        fs::read_dir(path).map_err(unreadable)?;
    } else {
        fs::File::open(path).map_err(unreadable)?;
    }
    Ok(())
}
