//! OpenSSL-backed implementation of the engine boundary.
//!
//! Trust material is plain PEM on disk: the key container is a PEM private
//! key file, the CA directory holds PEM certificates, and the CRL directory
//! holds PEM revocation lists. Signatures are detached CMS/PKCS#7 structures
//! in DER form.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use openssl::cms::{CMSOptions, CmsContentInfo};
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{CrlStatus, X509, X509Crl};

use crate::engine::{
    ContextHandle, CryptoBackend, FLAG_DETACHED, STATUS_BUFFER_TOO_SMALL, STATUS_OK,
};

// Engine-specific failure statuses. The protocol layer only distinguishes
// zero and the size-probe code; these exist for diagnostics.
pub const STATUS_NOT_STARTED: i32 = 201;
pub const STATUS_BAD_PATH: i32 = 202;
pub const STATUS_PARSE_FAILED: i32 = 203;
pub const STATUS_NO_KEY: i32 = 204;
pub const STATUS_NO_IDENTITY: i32 = 205;
pub const STATUS_BAD_CONTEXT: i32 = 206;
pub const STATUS_UNSUPPORTED_DIGEST: i32 = 207;
pub const STATUS_CRYPTO_FAILED: i32 = 208;
pub const STATUS_VERIFY_FAILED: i32 = 209;
pub const STATUS_REVOKED: i32 = 210;
pub const STATUS_BAD_LENGTH: i32 = 211;

const SUPPORTED_DIGESTS: [&str; 3] = ["sha256", "sha384", "sha512"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextKind {
    Sign,
    Verify,
}

struct EngineContext {
    kind: ContextKind,
    identity: Option<X509>,
}

/// Software PKCS#7 engine over OpenSSL CMS.
pub struct OpensslBackend {
    started: bool,
    digest_name: String,
    include_signer: bool,
    include_signing_time: bool,
    private_key: Option<PKey<Private>>,
    cas: Vec<X509>,
    crls: Vec<X509Crl>,
    contexts: HashMap<ContextHandle, EngineContext>,
    next_handle: u64,
}

impl OpensslBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: false,
            digest_name: String::from("sha256"),
            include_signer: false,
            include_signing_time: false,
            private_key: None,
            cas: Vec::new(),
            crls: Vec::new(),
            contexts: HashMap::new(),
            next_handle: 1,
        }
    }

    fn create_context(&mut self, kind: ContextKind) -> Option<ContextHandle> {
        if !self.started {
            log::warn!("Context requested before engine start");
            return None;
        }
        let handle = ContextHandle::from_raw(self.next_handle);
        self.next_handle += 1;
        self.contexts.insert(
            handle,
            EngineContext {
                kind,
                identity: None,
            },
        );
        Some(handle)
    }

    fn context(&self, handle: ContextHandle, kind: ContextKind) -> Option<&EngineContext> {
        self.contexts.get(&handle).filter(|ctx| ctx.kind == kind)
    }

    fn sign_options(&self, flags: i32) -> CMSOptions {
        let mut options = CMSOptions::BINARY | CMSOptions::NOSMIMECAP;
        if flags & FLAG_DETACHED != 0 {
            options |= CMSOptions::DETACHED;
        }
        if !self.include_signer {
            options |= CMSOptions::CMS_NOCERTS;
        }
        if !self.include_signing_time {
            // CMS attaches a signingTime attribute whenever signed attributes
            // are present, so excluding the time means signing the content
            // directly with no attribute set.
            options |= CMSOptions::NOATTR;
        }
        options
    }
}

impl Default for OpensslBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn fail(operation: &str, status: i32, err: impl std::fmt::Display) -> i32 {
    log::warn!("{operation} failed (status {status}): {err}");
    status
}

impl CryptoBackend for OpensslBackend {
    fn start(&mut self, key_container: &Path) -> i32 {
        if let Err(e) = fs::metadata(key_container) {
            return fail("Engine start", STATUS_BAD_PATH, e);
        }
        self.started = true;
        log::info!(
            "OpenSSL engine started, key container: {}",
            key_container.display()
        );
        STATUS_OK
    }

    fn stop(&mut self) {
        self.started = false;
        self.private_key = None;
        self.cas.clear();
        self.crls.clear();
        self.contexts.clear();
        log::info!("OpenSSL engine stopped");
    }

    fn set_digest_algorithm(&mut self, name: &str) {
        self.digest_name = name.to_string();
    }

    fn set_signer_inclusion(&mut self, include: bool) {
        self.include_signer = include;
    }

    fn set_signing_time_inclusion(&mut self, include: bool) {
        self.include_signing_time = include;
    }

    fn load_private_key(&mut self, key_container: &Path) -> i32 {
        if !self.started {
            return STATUS_NOT_STARTED;
        }
        let pem = match fs::read(key_container) {
            Ok(pem) => pem,
            Err(e) => return fail("Private key read", STATUS_BAD_PATH, e),
        };
        match PKey::private_key_from_pem(&pem) {
            Ok(key) => {
                self.private_key = Some(key);
                STATUS_OK
            }
            Err(e) => fail("Private key parse", STATUS_PARSE_FAILED, e),
        }
    }

    fn load_ca_material(&mut self, ca_dir: &Path) -> i32 {
        if !self.started {
            return STATUS_NOT_STARTED;
        }
        let entries = match fs::read_dir(ca_dir) {
            Ok(entries) => entries,
            Err(e) => return fail("CA directory read", STATUS_BAD_PATH, e),
        };

        let mut cas = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return fail("CA directory read", STATUS_BAD_PATH, e),
            };
            if !entry.path().is_file() {
                continue;
            }
            let pem = match fs::read(entry.path()) {
                Ok(pem) => pem,
                Err(e) => return fail("CA certificate read", STATUS_BAD_PATH, e),
            };
            match X509::stack_from_pem(&pem) {
                Ok(mut certs) => cas.append(&mut certs),
                Err(e) => return fail("CA certificate parse", STATUS_PARSE_FAILED, e),
            }
        }
        log::debug!("Loaded {} CA certificate(s)", cas.len());
        self.cas = cas;
        STATUS_OK
    }

    fn load_revocation_lists(&mut self, crl_dir: &Path) -> i32 {
        if !self.started {
            return STATUS_NOT_STARTED;
        }
        let entries = match fs::read_dir(crl_dir) {
            Ok(entries) => entries,
            Err(e) => return fail("CRL directory read", STATUS_BAD_PATH, e),
        };

        let mut crls = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return fail("CRL directory read", STATUS_BAD_PATH, e),
            };
            if !entry.path().is_file() {
                continue;
            }
            let pem = match fs::read(entry.path()) {
                Ok(pem) => pem,
                Err(e) => return fail("CRL read", STATUS_BAD_PATH, e),
            };
            match X509Crl::from_pem(&pem) {
                Ok(crl) => crls.push(crl),
                Err(e) => return fail("CRL parse", STATUS_PARSE_FAILED, e),
            }
        }
        log::debug!("Loaded {} revocation list(s)", crls.len());
        self.crls = crls;
        STATUS_OK
    }

    fn create_signing_context(&mut self) -> Option<ContextHandle> {
        self.create_context(ContextKind::Sign)
    }

    fn create_verification_context(&mut self) -> Option<ContextHandle> {
        self.create_context(ContextKind::Verify)
    }

    fn release_context(&mut self, context: ContextHandle) {
        self.contexts.remove(&context);
    }

    fn register_identity(&mut self, context: ContextHandle, certificate: &Path) -> i32 {
        if !self.started {
            return STATUS_NOT_STARTED;
        }
        let pem = match fs::read(certificate) {
            Ok(pem) => pem,
            Err(e) => return fail("Identity certificate read", STATUS_BAD_PATH, e),
        };
        let cert = match X509::from_pem(&pem) {
            Ok(cert) => cert,
            Err(e) => return fail("Identity certificate parse", STATUS_PARSE_FAILED, e),
        };
        match self.contexts.get_mut(&context) {
            Some(ctx) => {
                ctx.identity = Some(cert);
                STATUS_OK
            }
            None => STATUS_BAD_CONTEXT,
        }
    }

    fn sign_buffer(
        &mut self,
        context: ContextHandle,
        data: &[u8],
        data_len: usize,
        out: &mut [u8],
        out_len: &mut usize,
        flags: i32,
    ) -> i32 {
        if !self.started {
            return STATUS_NOT_STARTED;
        }
        let Some(payload) = data.get(..data_len) else {
            return STATUS_BAD_LENGTH;
        };
        let Some(ctx) = self.context(context, ContextKind::Sign) else {
            return STATUS_BAD_CONTEXT;
        };
        let Some(identity) = ctx.identity.as_ref() else {
            return STATUS_NO_IDENTITY;
        };
        let Some(key) = self.private_key.as_ref() else {
            return STATUS_NO_KEY;
        };
        if !SUPPORTED_DIGESTS.contains(&self.digest_name.as_str()) {
            log::warn!("Unsupported digest algorithm: {}", self.digest_name);
            return STATUS_UNSUPPORTED_DIGEST;
        }

        let options = self.sign_options(flags);
        let cms = match CmsContentInfo::sign(Some(identity), Some(key), None, Some(payload), options)
        {
            Ok(cms) => cms,
            Err(e) => return fail("CMS sign", STATUS_CRYPTO_FAILED, e),
        };
        let der = match cms.to_der() {
            Ok(der) => der,
            Err(e) => return fail("CMS encode", STATUS_CRYPTO_FAILED, e),
        };

        if out.len() < der.len() {
            *out_len = der.len();
            return STATUS_BUFFER_TOO_SMALL;
        }
        out[..der.len()].copy_from_slice(&der);
        *out_len = der.len();
        STATUS_OK
    }

    fn verify_buffer(&mut self, context: ContextHandle, signature: &[u8], data: &[u8]) -> i32 {
        if !self.started {
            return STATUS_NOT_STARTED;
        }
        let Some(ctx) = self.context(context, ContextKind::Verify) else {
            return STATUS_BAD_CONTEXT;
        };
        let Some(identity) = ctx.identity.as_ref() else {
            return STATUS_NO_IDENTITY;
        };

        let mut cms = match CmsContentInfo::from_der(signature) {
            Ok(cms) => cms,
            Err(e) => return fail("CMS decode", STATUS_PARSE_FAILED, e),
        };

        let mut store = match X509StoreBuilder::new() {
            Ok(builder) => builder,
            Err(e) => return fail("Trust store create", STATUS_CRYPTO_FAILED, e),
        };
        for ca in &self.cas {
            if let Err(e) = store.add_cert(ca.clone()) {
                return fail("Trust store add", STATUS_CRYPTO_FAILED, e);
            }
        }
        let store = store.build();

        let mut candidates = match Stack::new() {
            Ok(stack) => stack,
            Err(e) => return fail("Candidate stack create", STATUS_CRYPTO_FAILED, e),
        };
        if let Err(e) = candidates.push(identity.clone()) {
            return fail("Candidate stack push", STATUS_CRYPTO_FAILED, e);
        }

        let options = CMSOptions::DETACHED | CMSOptions::BINARY;
        if let Err(e) = cms.verify(Some(&candidates), Some(&store), Some(data), None, options) {
            return fail("CMS verify", STATUS_VERIFY_FAILED, e);
        }

        for crl in &self.crls {
            if !matches!(crl.get_by_cert(identity), CrlStatus::NotRevoked) {
                log::warn!("Identity certificate is revoked");
                return STATUS_REVOKED;
            }
        }
        STATUS_OK
    }
}
