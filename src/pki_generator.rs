//! RSA key generation and X.509 certificate construction.
//!
//! Two certificate shapes are produced:
//!
//! ```text
//! Root CA (self-signed, CA=true, pathlen=0)
//!   └── VPN server / client certificate (CA=false, serverAuth | clientAuth)
//! ```
//!
//! Every certificate gets a fresh random serial, so two calls with identical
//! inputs never produce the same bytes.

use crate::configs::KeygenConfig;
use crate::error::{Result, VpnPkiError};
use crate::subject_name::{build_subject_name, truncate_unique};
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
    SubjectKeyIdentifier,
};
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509Builder, X509Ref, X509StoreContext, X509};

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2
const RSA_PUBLIC_EXPONENT: u32 = 65537;
const ROOT_CA_PATH_LENGTH: u32 = 0;
/// Random serial width; one bit short of 160 keeps the DER integer positive and within 20 octets.
const SERIAL_NUMBER_BITS: i32 = 159;

/// Purpose written into the leaf certificate's critical ExtendedKeyUsage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsagePurpose {
    ServerAuth,
    ClientAuth,
}

/// Generate an RSA key pair with public exponent 65537.
pub fn generate_key_pair(bits: u32) -> Result<PKey<Private>> {
    let exponent = BigNum::from_u32(RSA_PUBLIC_EXPONENT).map_err(VpnPkiError::KeyGeneration)?;
    let rsa = Rsa::generate_with_e(bits, &exponent).map_err(VpnPkiError::KeyGeneration)?;
    PKey::from_rsa(rsa).map_err(VpnPkiError::KeyGeneration)
}

fn random_serial() -> Result<Asn1Integer> {
    let mut serial =
        BigNum::new().map_err(VpnPkiError::certificate("Failed to allocate serial number"))?;
    serial
        .rand(SERIAL_NUMBER_BITS, MsbOption::MAYBE_ZERO, false)
        .map_err(VpnPkiError::certificate("Failed to generate serial number"))?;
    serial
        .to_asn1_integer()
        .map_err(VpnPkiError::certificate("Failed to encode serial number"))
}

fn new_builder(subject_key: &PKeyRef<Private>, expire_days: u32) -> Result<X509Builder> {
    let mut builder =
        X509::builder().map_err(VpnPkiError::certificate("Failed to create X509 builder"))?;

    builder
        .set_version(X509_VERSION_3)
        .map_err(VpnPkiError::certificate("Failed to set version"))?;

    let serial = random_serial()?;
    builder
        .set_serial_number(&serial)
        .map_err(VpnPkiError::certificate("Failed to set serial number"))?;

    let not_before = Asn1Time::days_from_now(0)
        .map_err(VpnPkiError::certificate("Failed to create not_before"))?;
    builder
        .set_not_before(&not_before)
        .map_err(VpnPkiError::certificate("Failed to set not_before"))?;

    let not_after = Asn1Time::days_from_now(expire_days)
        .map_err(VpnPkiError::certificate("Failed to create not_after"))?;
    builder
        .set_not_after(&not_after)
        .map_err(VpnPkiError::certificate("Failed to set not_after"))?;

    builder
        .set_pubkey(subject_key)
        .map_err(VpnPkiError::certificate("Failed to set public key"))?;

    Ok(builder)
}

/// Build the self-signed root CA certificate for `key`.
///
/// Subject and issuer are both the configured organizational name with
/// common name `org_common_name`. Extensions:
/// - **SubjectKeyIdentifier**, **AuthorityKeyIdentifier**: non-critical, from `key`
/// - **BasicConstraints**: CA=true, pathlen=0, critical
pub fn build_root_ca_cert(
    keygen: &KeygenConfig,
    key: &PKeyRef<Private>,
    org_common_name: &str,
    expire_days: u32,
) -> Result<X509> {
    let name = build_subject_name(keygen, org_common_name)?;
    let mut builder = new_builder(key, expire_days)?;

    builder
        .set_subject_name(&name)
        .map_err(VpnPkiError::certificate("Failed to set subject"))?;
    builder
        .set_issuer_name(&name)
        .map_err(VpnPkiError::certificate("Failed to set issuer"))?;

    // SKI must be present before AKI so the self-signed keyid lookup finds it
    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(None, None))
        .map_err(VpnPkiError::certificate("Failed to build SubjectKeyIdentifier"))?;
    builder
        .append_extension(ski)
        .map_err(VpnPkiError::certificate("Failed to add SubjectKeyIdentifier"))?;

    // `always`: OpenSSL omits the keyid of self-signed certificates otherwise
    let aki = AuthorityKeyIdentifier::new()
        .keyid(true)
        .build(&builder.x509v3_context(None, None))
        .map_err(VpnPkiError::certificate("Failed to build AuthorityKeyIdentifier"))?;
    builder
        .append_extension(aki)
        .map_err(VpnPkiError::certificate("Failed to add AuthorityKeyIdentifier"))?;

    let bc = BasicConstraints::new()
        .critical()
        .ca()
        .pathlen(ROOT_CA_PATH_LENGTH)
        .build()
        .map_err(VpnPkiError::certificate("Failed to build BasicConstraints"))?;
    builder
        .append_extension(bc)
        .map_err(VpnPkiError::certificate("Failed to add BasicConstraints"))?;

    builder
        .sign(key, MessageDigest::sha256())
        .map_err(VpnPkiError::certificate("Failed to sign certificate"))?;

    Ok(builder.build())
}

/// Build a leaf certificate for `subject_key`, signed by `issuer_key`.
///
/// The common name is `truncate_unique(subject_name)` and is repeated as the
/// single DNS entry of the SubjectAlternativeName, even when it is not a
/// valid hostname. `issuer_cert` supplies the issuer name and the authority
/// key identifier.
///
/// # Extensions
/// - **SubjectAlternativeName**: DNS = common name, non-critical
/// - **SubjectKeyIdentifier** / **AuthorityKeyIdentifier**: non-critical
/// - **KeyUsage**: digitalSignature only, critical
/// - **ExtendedKeyUsage**: `purpose`, critical
/// - **BasicConstraints**: CA=false, critical
///
/// Returns the certificate together with the common name actually used.
pub fn build_leaf_cert(
    keygen: &KeygenConfig,
    subject_name: &str,
    subject_key: &PKeyRef<Private>,
    issuer_cert: &X509Ref,
    issuer_key: &PKeyRef<Private>,
    purpose: ExtendedKeyUsagePurpose,
    expire_days: u32,
) -> Result<(X509, String)> {
    let common_name = truncate_unique(subject_name);
    let name = build_subject_name(keygen, &common_name)?;
    let mut builder = new_builder(subject_key, expire_days)?;

    builder
        .set_subject_name(&name)
        .map_err(VpnPkiError::certificate("Failed to set subject"))?;
    builder
        .set_issuer_name(issuer_cert.subject_name())
        .map_err(VpnPkiError::certificate("Failed to set issuer from CA"))?;

    let san = SubjectAlternativeName::new()
        .dns(&common_name)
        .build(&builder.x509v3_context(Some(issuer_cert), None))
        .map_err(VpnPkiError::certificate("Failed to build SubjectAlternativeName"))?;
    builder
        .append_extension(san)
        .map_err(VpnPkiError::certificate("Failed to add SubjectAlternativeName"))?;

    let ski = SubjectKeyIdentifier::new()
        .build(&builder.x509v3_context(Some(issuer_cert), None))
        .map_err(VpnPkiError::certificate("Failed to build SubjectKeyIdentifier"))?;
    builder
        .append_extension(ski)
        .map_err(VpnPkiError::certificate("Failed to add SubjectKeyIdentifier"))?;

    let aki = AuthorityKeyIdentifier::new()
        .keyid(false)
        .build(&builder.x509v3_context(Some(issuer_cert), None))
        .map_err(VpnPkiError::certificate("Failed to build AuthorityKeyIdentifier"))?;
    builder
        .append_extension(aki)
        .map_err(VpnPkiError::certificate("Failed to add AuthorityKeyIdentifier"))?;

    let ku = KeyUsage::new()
        .critical()
        .digital_signature()
        .build()
        .map_err(VpnPkiError::certificate("Failed to build KeyUsage"))?;
    builder
        .append_extension(ku)
        .map_err(VpnPkiError::certificate("Failed to add KeyUsage"))?;

    let mut eku = ExtendedKeyUsage::new();
    eku.critical();
    match purpose {
        ExtendedKeyUsagePurpose::ServerAuth => eku.server_auth(),
        ExtendedKeyUsagePurpose::ClientAuth => eku.client_auth(),
    };
    let eku = eku
        .build()
        .map_err(VpnPkiError::certificate("Failed to build ExtendedKeyUsage"))?;
    builder
        .append_extension(eku)
        .map_err(VpnPkiError::certificate("Failed to add ExtendedKeyUsage"))?;

    // CA=false: end-entity certificate
    let bc = BasicConstraints::new()
        .critical()
        .build()
        .map_err(VpnPkiError::certificate("Failed to build BasicConstraints"))?;
    builder
        .append_extension(bc)
        .map_err(VpnPkiError::certificate("Failed to add BasicConstraints"))?;

    builder
        .sign(issuer_key, MessageDigest::sha256())
        .map_err(VpnPkiError::certificate("Failed to sign certificate"))?;

    Ok((builder.build(), common_name))
}

/// Standard X.509 chain verification of `leaf` against the single trusted `ca`.
pub fn verify_issued_by(leaf: &X509Ref, ca: &X509Ref) -> Result<bool> {
    let mut store_builder = X509StoreBuilder::new()
        .map_err(VpnPkiError::certificate("Failed to create X509 store"))?;
    store_builder
        .add_cert(ca.to_owned())
        .map_err(VpnPkiError::certificate("Failed to add CA to X509 store"))?;
    let store = store_builder.build();

    let chain = Stack::new().map_err(VpnPkiError::certificate("Failed to create chain stack"))?;
    let mut context =
        X509StoreContext::new().map_err(VpnPkiError::certificate("Failed to create store context"))?;
    context
        .init(&store, leaf, &chain, |ctx| ctx.verify_cert())
        .map_err(VpnPkiError::certificate("Certificate verification failed to run"))
}
