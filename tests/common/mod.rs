//! Shared fixture: a self-signed RSA identity laid out as a trust directory.
//!
//! The generated certificate acts as its own certificate authority, so the
//! same identity serves as signer, receiver, and trust root. The CRL
//! directory starts empty, which is a valid configuration.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::fs;

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{BasicConstraints, KeyUsage};
use openssl::x509::{X509, X509Builder, X509NameBuilder};
use tempfile::TempDir;

use pkcs7_signer::TrustConfig;

pub struct TrustFixture {
    // Held so the directory outlives the config pointing into it.
    pub dir: TempDir,
    pub config: TrustConfig,
}

pub fn self_signed_identity() -> (PKey<Private>, X509) {
    let rsa = Rsa::generate(2048).unwrap();
    let pkey = PKey::from_rsa(rsa).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "pkcs7-signer test identity")
        .unwrap();
    let name = name.build();

    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .digital_signature()
                .key_cert_sign()
                .crl_sign()
                .build()
                .unwrap(),
        )
        .unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();

    (pkey, builder.build())
}

pub fn write_trust_layout() -> TrustFixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let (pkey, cert) = self_signed_identity();

    fs::create_dir(root.join("ca")).unwrap();
    fs::create_dir(root.join("crl")).unwrap();

    let key_pem = pkey.private_key_to_pem_pkcs8().unwrap();
    let cert_pem = cert.to_pem().unwrap();

    fs::write(root.join("key.pem"), &key_pem).unwrap();
    fs::write(root.join("ca").join("root.pem"), &cert_pem).unwrap();
    fs::write(root.join("signer.pem"), &cert_pem).unwrap();
    fs::write(root.join("receiver.pem"), &cert_pem).unwrap();

    let config = TrustConfig {
        root_dir: root.to_path_buf(),
        key_container: root.join("key.pem"),
        ca_dir: root.join("ca"),
        crl_dir: root.join("crl"),
        signer_cert: root.join("signer.pem"),
        receiver_cert: root.join("receiver.pem"),
    };

    TrustFixture { dir, config }
}
