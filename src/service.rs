//! Signing service: engine lifecycle plus the signing and verification
//! protocols.
//!
//! The service owns the engine backend and the trust configuration. It is the
//! only constructor of a usable engine, so use-before-initialization cannot
//! be expressed, and `shutdown` consumes the service so use-after-teardown
//! cannot be expressed either.

use crate::config::TrustConfig;
use crate::engine::{ContextHandle, CryptoBackend, FLAG_DETACHED, STATUS_BUFFER_TOO_SMALL, STATUS_OK};
use crate::error::{EngineError, SignError, VerifyError};
use crate::types::Signature;
use crate::SigningOptions;

/// Fixed, non-secret probe signed during the post-initialization self-check.
const SELF_CHECK_PROBE: &[u8] = b"Hello world!";

/// One initialized engine instance bound to a trust configuration.
///
/// Signing and verification each build an ephemeral engine context, use it
/// for exactly one call, and release it on every exit path. No context is
/// ever cached or shared across calls.
pub struct SigningService {
    backend: Box<dyn CryptoBackend>,
    trust: TrustConfig,
    options: SigningOptions,
    stopped: bool,
}

impl SigningService {
    /// Initialize the engine: validate the trust configuration, start the
    /// backend bound to the key container, then run the self-check.
    ///
    /// The self-check exercises the full signing protocol on a fixed probe
    /// string so that path, permission, and certificate misconfiguration
    /// surfaces here instead of on first real use. Any failure leaves no
    /// service behind and stops the backend.
    pub fn initialize(
        mut backend: Box<dyn CryptoBackend>,
        trust: TrustConfig,
        options: SigningOptions,
    ) -> Result<Self, EngineError> {
        trust.validate()?;

        log::info!(
            "Initializing signing engine, root: {}",
            trust.root_dir.display()
        );
        let status = backend.start(&trust.key_container);
        if status != STATUS_OK {
            return Err(EngineError::InitFailed { status });
        }

        let mut service = Self {
            backend,
            trust,
            options,
            stopped: false,
        };
        if let Err(err) = service.self_check() {
            log::warn!("Self-check failed: {err}");
            service.backend.stop();
            service.stopped = true;
            return Err(EngineError::SelfCheckFailed(err));
        }

        log::info!("Signing engine ready");
        Ok(service)
    }

    fn self_check(&mut self) -> Result<(), SignError> {
        log::debug!("Running signing self-check");
        self.sign(SELF_CHECK_PROBE).map(drop)
    }

    /// The fixed configured algorithm identifier. No native call is made.
    #[must_use]
    pub fn algorithm_name(&self) -> &'static str {
        self.options.digest.as_str()
    }

    /// The trust configuration this engine instance was initialized with.
    #[must_use]
    pub fn trust_config(&self) -> &TrustConfig {
        &self.trust
    }

    /// Produce a detached signature over `data`.
    ///
    /// An empty buffer is valid input and goes through the same two-phase
    /// buffer negotiation as any other.
    pub fn sign(&mut self, data: &[u8]) -> Result<Signature, SignError> {
        log::debug!("Signing {} byte buffer", data.len());
        let backend = self.backend.as_mut();

        // Fixed configuration, not per-call parameters.
        backend.set_digest_algorithm(self.options.digest.as_str());
        backend.set_signer_inclusion(self.options.include_signer_certificate);
        backend.set_signing_time_inclusion(self.options.include_signing_time);

        let status = backend.load_private_key(&self.trust.key_container);
        if status != STATUS_OK {
            return Err(SignError::KeyLoadFailed { status });
        }
        let status = backend.load_ca_material(&self.trust.ca_dir);
        if status != STATUS_OK {
            return Err(SignError::CaLoadFailed { status });
        }

        let handle = backend
            .create_signing_context()
            .ok_or(SignError::ContextCreationFailed)?;
        let mut context = ContextGuard::new(backend, handle);

        let status = context.register_identity(&self.trust.signer_cert);
        if status != STATUS_OK {
            return Err(SignError::SignerRegistrationFailed { status });
        }

        // Size probe: the engine cannot report the exact signature length
        // without attempting to produce it once. The zero-length output
        // buffer makes the engine answer with the distinguished size code
        // and the required length. Anything else forbids the second call.
        let mut required = 0usize;
        let status = context.sign_buffer(data, 0, &mut [], &mut required, FLAG_DETACHED);
        if status != STATUS_BUFFER_TOO_SMALL {
            return Err(SignError::SignOperationFailed { status });
        }

        let mut out = vec![0u8; required];
        let mut written = 0usize;
        let status = context.sign_buffer(data, data.len(), &mut out, &mut written, FLAG_DETACHED);
        if status != STATUS_OK {
            return Err(SignError::SignOperationFailed { status });
        }
        out.truncate(written);

        log::debug!("Produced {written} byte signature");
        Ok(Signature::from_bytes(out))
    }

    /// Verify a detached `signature` over `data` against the receiver
    /// identity and the configured trust chain.
    ///
    /// Returns `Ok(true)` on success and never `Ok(false)`: a failed check is
    /// always surfaced as [`VerifyError::SignatureInvalid`], which covers
    /// cryptographic mismatch as well as revoked or expired certificates.
    pub fn verify(&mut self, data: &[u8], signature: &Signature) -> Result<bool, VerifyError> {
        log::debug!(
            "Verifying {} byte signature over {} byte buffer",
            signature.len(),
            data.len()
        );
        let backend = self.backend.as_mut();

        let status = backend.load_ca_material(&self.trust.ca_dir);
        if status != STATUS_OK {
            return Err(VerifyError::CaLoadFailed { status });
        }
        let status = backend.load_revocation_lists(&self.trust.crl_dir);
        if status != STATUS_OK {
            return Err(VerifyError::CrlLoadFailed { status });
        }

        let handle = backend
            .create_verification_context()
            .ok_or(VerifyError::ContextCreationFailed)?;
        let mut context = ContextGuard::new(backend, handle);

        let status = context.register_identity(&self.trust.receiver_cert);
        if status != STATUS_OK {
            return Err(VerifyError::SignerRegistrationFailed { status });
        }

        let status = context.verify_buffer(signature.as_bytes(), data);
        if status != STATUS_OK {
            return Err(VerifyError::SignatureInvalid { status });
        }
        Ok(true)
    }

    /// Release the engine. Consumes the service, so no further call can
    /// observe stale engine state.
    pub fn shutdown(mut self) {
        log::info!("Shutting down signing engine");
        self.backend.stop();
        self.stopped = true;
    }
}

impl Drop for SigningService {
    fn drop(&mut self) {
        if !self.stopped {
            self.backend.stop();
        }
    }
}

/// Releases an engine context on every exit path.
struct ContextGuard<'a> {
    backend: &'a mut dyn CryptoBackend,
    handle: ContextHandle,
}

impl<'a> ContextGuard<'a> {
    fn new(backend: &'a mut dyn CryptoBackend, handle: ContextHandle) -> Self {
        Self { backend, handle }
    }

    fn register_identity(&mut self, certificate: &std::path::Path) -> i32 {
        self.backend.register_identity(self.handle, certificate)
    }

    fn sign_buffer(
        &mut self,
        data: &[u8],
        data_len: usize,
        out: &mut [u8],
        out_len: &mut usize,
        flags: i32,
    ) -> i32 {
        self.backend
            .sign_buffer(self.handle, data, data_len, out, out_len, flags)
    }

    fn verify_buffer(&mut self, signature: &[u8], data: &[u8]) -> i32 {
        self.backend.verify_buffer(self.handle, signature, data)
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.backend.release_context(self.handle);
    }
}
