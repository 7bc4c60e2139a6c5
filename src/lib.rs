//! Certificate-based buffer signing library.
//!
//! Signs opaque byte buffers with a sender identity and verifies the
//! resulting detached PKCS#7 signatures against a receiver identity, using a
//! pluggable cryptographic engine plus a certificate trust chain (CA store
//! and revocation lists).
//!
//! The entry point is [`SigningService::initialize`], which binds a
//! [`TrustConfig`] to an engine backend, runs an end-to-end signing
//! self-check, and returns the only handle through which signing and
//! verification can be performed.

pub mod config;
pub mod engine;
pub mod error;
pub mod openssl_backend;
pub mod service;
pub mod types;



use std::str::FromStr;

pub use config::TrustConfig;
pub use engine::{ContextHandle, CryptoBackend, FLAG_DETACHED, STATUS_BUFFER_TOO_SMALL, STATUS_OK};
pub use error::{ConfigError, EngineError, SignError, VerifyError};
pub use openssl_backend::OpensslBackend;
pub use service::SigningService;
pub use types::Signature;

/// Supported digest algorithm families.
///
/// Fixed per engine instance at initialization; not overridable per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// The name handed to the engine, also reported as the configured
    /// algorithm identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            other => Err(ConfigError::UnknownDigest {
                name: other.to_string(),
            }),
        }
    }
}

/// Fixed signing configuration for one engine instance.
#[derive(Debug, Clone)]
pub struct SigningOptions {
    /// Digest algorithm family.
    pub digest: DigestAlgorithm,
    /// Whether to embed the signer certificate in produced signatures.
    pub include_signer_certificate: bool,
    /// Whether to embed the signing time in produced signatures.
    pub include_signing_time: bool,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            digest: DigestAlgorithm::Sha256,
            include_signer_certificate: false,
            include_signing_time: false,
        }
    }
}
