//! Error types for engine lifecycle, signing, and verification.
//!
//! Every native-engine failure is wrapped with the name of the failed
//! operation and, where available, the numeric status code reported by the
//! engine. Nothing is retried or swallowed here; recovery is a caller-level
//! decision.

use std::path::PathBuf;

use thiserror::Error;

/// Trust configuration failures: unreadable paths and config file problems.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum ConfigError {
    #[error("{field} path is not readable: {path}")]
    UnreadablePath {
        field: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read trust configuration file: {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse trust configuration file: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize trust configuration")]
    Serialize {
        #[source]
        source: toml::ser::Error,
    },

    #[error("failed to write trust configuration file: {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown digest algorithm: {name}")]
    UnknownDigest { name: String },
}

/// Engine lifecycle failures.
///
/// A failed self-check carries the same severity as a failed engine start:
/// both abort initialization and leave no usable service behind.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum EngineError {
    #[error("invalid trust configuration")]
    Config(#[from] ConfigError),

    #[error("cryptographic engine failed to start (status {status})")]
    InitFailed { status: i32 },

    #[error("post-initialization self-check failed")]
    SelfCheckFailed(#[source] SignError),
}

/// Signing protocol failures, one variant per protocol step.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SignError {
    #[error("failed to load private key material (status {status})")]
    KeyLoadFailed { status: i32 },

    #[error("failed to load certificate authority material (status {status})")]
    CaLoadFailed { status: i32 },

    #[error("engine returned an empty signing context")]
    ContextCreationFailed,

    #[error("failed to register signer identity (status {status})")]
    SignerRegistrationFailed { status: i32 },

    #[error("signing operation failed (status {status})")]
    SignOperationFailed { status: i32 },
}

/// Verification protocol failures, one variant per protocol step.
///
/// `SignatureInvalid` covers both cryptographic mismatch and
/// revoked/expired-certificate conditions; the engine does not distinguish
/// them at this layer.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum VerifyError {
    #[error("failed to load certificate authority material (status {status})")]
    CaLoadFailed { status: i32 },

    #[error("failed to load revocation lists (status {status})")]
    CrlLoadFailed { status: i32 },

    #[error("engine returned an empty verification context")]
    ContextCreationFailed,

    #[error("failed to register receiver identity (status {status})")]
    SignerRegistrationFailed { status: i32 },

    #[error("signature did not verify (status {status})")]
    SignatureInvalid { status: i32 },
}
