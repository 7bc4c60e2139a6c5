//! Native cryptographic engine boundary.
//!
//! This module defines the common interface for the underlying PKCS#7 engine
//! so that different implementations can sit behind the same signing and
//! verification protocols. The interface is status-code based: the engine
//! reports numeric statuses and the protocol layer maps them onto the error
//! taxonomy.

use std::path::Path;

/// Status meaning the operation completed.
pub const STATUS_OK: i32 = 0;

/// Distinguished status for the size-probe phase of `sign_buffer`.
///
/// When the output buffer is too small for the signature, the engine writes
/// the exact required length to `out_len` and returns this code. During the
/// size probe it means "output length reported, no error"; in any other
/// position it is a real failure.
pub const STATUS_BUFFER_TOO_SMALL: i32 = 160;

/// `sign_buffer` flag selecting detached-signature mode.
pub const FLAG_DETACHED: i32 = 1;

/// Opaque handle to an engine-owned signing or verification context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(u64);

impl ContextHandle {
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        ContextHandle(raw)
    }

    #[must_use]
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// Operations the signing and verification protocols require from the engine.
///
/// Implementations own all native state: loaded key material, CA and CRL
/// stores, and live contexts. Contexts are created fresh per call by the
/// protocol layer and must be released through `release_context`; an
/// implementation must tolerate release of a handle it no longer knows.
pub trait CryptoBackend: Send {
    /// Start the engine bound to the key container location.
    fn start(&mut self, key_container: &Path) -> i32;

    /// Stop the engine and drop all loaded material and live contexts.
    fn stop(&mut self);

    /// Select the active digest algorithm by engine-specific name.
    fn set_digest_algorithm(&mut self, name: &str);

    /// Control whether the signer certificate is embedded in signatures.
    fn set_signer_inclusion(&mut self, include: bool);

    /// Control whether the signing time is embedded in signatures.
    fn set_signing_time_inclusion(&mut self, include: bool);

    /// Load private key material from the key container.
    fn load_private_key(&mut self, key_container: &Path) -> i32;

    /// Load certificate authority material from a directory.
    fn load_ca_material(&mut self, ca_dir: &Path) -> i32;

    /// Load certificate revocation lists from a directory.
    ///
    /// An empty directory is valid and loads zero lists.
    fn load_revocation_lists(&mut self, crl_dir: &Path) -> i32;

    /// Create a fresh signing context, or `None` if the engine cannot.
    fn create_signing_context(&mut self) -> Option<ContextHandle>;

    /// Create a fresh verification context, or `None` if the engine cannot.
    fn create_verification_context(&mut self) -> Option<ContextHandle>;

    /// Release a context created by either constructor.
    fn release_context(&mut self, context: ContextHandle);

    /// Register the identity certificate at `certificate` into a context.
    fn register_identity(&mut self, context: ContextHandle, certificate: &Path) -> i32;

    /// Produce a signature over `data[..data_len]` into `out`.
    ///
    /// Two-phase contract: when `out` is shorter than the signature, the
    /// engine writes the required length to `out_len` and returns
    /// [`STATUS_BUFFER_TOO_SMALL`]. When `out` has sufficient capacity it
    /// writes the signature bytes, sets `out_len` to the written length, and
    /// returns [`STATUS_OK`]. `data_len` may be shorter than `data` — the
    /// size probe passes the full buffer with a zero length.
    fn sign_buffer(
        &mut self,
        context: ContextHandle,
        data: &[u8],
        data_len: usize,
        out: &mut [u8],
        out_len: &mut usize,
        flags: i32,
    ) -> i32;

    /// Verify a detached `signature` over `data`.
    ///
    /// Returns [`STATUS_OK`] only when the signature is cryptographically
    /// valid, the signer chains to the loaded CA material, and the registered
    /// identity is not on any loaded revocation list.
    fn verify_buffer(&mut self, context: ContextHandle, signature: &[u8], data: &[u8]) -> i32;
}
