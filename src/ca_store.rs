//! Root CA Store
//!
//! Owns the single root CA of the VPN: its password-encrypted private key and
//! its self-signed certificate, each kept at a fixed path from
//! [`CaPaths`](crate::configs::CaPaths).
//!
//! # Storage Format
//! - **Key file**: traditional OpenSSL (PKCS#1) PEM, AES-256-CBC encrypted with
//!   the configured password, permissions 0600 on Unix
//! - **Certificate file**: PEM `CERTIFICATE`
//!
//! # Lifecycle
//! ```text
//! Uninitialized --bootstrap()--> Ready
//! ```
//! [`CaStore::bootstrap`] is idempotent but not synchronized: two processes
//! bootstrapping a fresh store at the same time can both generate a key.
//! Callers must ensure at most one bootstrap runs at a time (a single admin
//! command, a file lock, or a "bootstrap done" flag in their own database).
//!
//! Nothing is cached: every [`CaStore::load_ca_material`] call rereads the
//! files, so a store can be shared freely between issuing threads.

use crate::configs::VpnPkiConfig;
use crate::error::{CaUnavailableReason, Result, VpnPkiError};
use crate::pki_generator::{build_root_ca_cert, generate_key_pair};
use openssl::pkey::{Id, PKey, Private};
use openssl::symm::Cipher;
use openssl::x509::X509;
use secrecy::ExposeSecret;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// Whether the CA key and certificate are both present on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaState {
    Uninitialized,
    Ready,
}

/// The root CA private key and certificate, loaded for one signing operation.
pub struct CaMaterial {
    pub key: PKey<Private>,
    pub cert: X509,
}

impl fmt::Debug for CaMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaMaterial")
            .field("key", &"<redacted>")
            .field("cert", &self.cert.subject_name())
            .finish()
    }
}

/// File-backed root CA store.
#[derive(Debug, Clone)]
pub struct CaStore {
    config: VpnPkiConfig,
}

impl CaStore {
    /// Wrap a validated configuration.
    ///
    /// # Errors
    /// [`VpnPkiError::Config`] if [`VpnPkiConfig::validate`] rejects `config`.
    pub fn new(config: VpnPkiConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &VpnPkiConfig {
        &self.config
    }

    pub fn state(&self) -> CaState {
        if self.config.ca.key_path.exists() && self.config.ca.cert_path.exists() {
            CaState::Ready
        } else {
            CaState::Uninitialized
        }
    }

    /// Create the root CA key and certificate if they are missing.
    ///
    /// - Key file absent: generate a new key and write it encrypted.
    ///   Key file present: load and decrypt it.
    /// - Certificate file absent: self-sign a certificate for the key with
    ///   common name `"<organization> CA"`. Present: left untouched.
    ///
    /// Calling this again on a ready store changes nothing on disk.
    ///
    /// # Errors
    /// - [`VpnPkiError::CaUnavailable`] if an existing key cannot be read,
    ///   decrypted or is not RSA
    /// - [`VpnPkiError::KeyGeneration`] if a new key cannot be generated
    /// - [`VpnPkiError::Io`] if writing either file fails
    pub fn bootstrap(&self) -> Result<()> {
        let ca = &self.config.ca;
        let keygen = &self.config.keygen;

        let key = if !ca.key_path.exists() {
            info!(path = %ca.key_path.display(), bits = keygen.key_size, "Generating root CA private key");
            let key = generate_key_pair(keygen.key_size)?;
            let pem = key
                .rsa()
                .and_then(|rsa| {
                    rsa.private_key_to_pem_passphrase(
                        Cipher::aes_256_cbc(),
                        ca.key_password.expose_secret().as_bytes(),
                    )
                })
                .map_err(VpnPkiError::certificate("Failed to encrypt root CA private key"))?;
            write_file(&ca.key_path, &pem, true)?;
            key
        } else {
            debug!(path = %ca.key_path.display(), "Root CA private key exists, reusing it");
            self.load_ca_key()?
        };

        if !ca.cert_path.exists() {
            let common_name = format!("{} CA", keygen.organization);
            info!(path = %ca.cert_path.display(), %common_name, "Creating self-signed root CA certificate");
            let cert = build_root_ca_cert(keygen, &key, &common_name, keygen.ca_expire_days)?;
            let pem = cert
                .to_pem()
                .map_err(VpnPkiError::certificate("Failed to encode root CA certificate"))?;
            write_file(&ca.cert_path, &pem, false)?;
        } else {
            debug!(path = %ca.cert_path.display(), "Root CA certificate exists, leaving it untouched");
        }

        Ok(())
    }

    /// Load both halves of the CA material.
    pub fn load_ca_material(&self) -> Result<CaMaterial> {
        let cert = self.load_ca_cert()?;
        let key = self.load_ca_key()?;
        Ok(CaMaterial { key, cert })
    }

    /// Read and decrypt the root CA private key.
    pub fn load_ca_key(&self) -> Result<PKey<Private>> {
        let path = &self.config.ca.key_path;
        let pem_data = read_ca_file(path)?;

        let key = PKey::private_key_from_pem_passphrase(
            &pem_data,
            self.config.ca.key_password.expose_secret().as_bytes(),
        )
        .map_err(|e| {
            let reason = if is_encrypted_pem(&pem_data) {
                CaUnavailableReason::InvalidPassword(e)
            } else {
                CaUnavailableReason::Parse(e)
            };
            VpnPkiError::ca_unavailable(path, reason)
        })?;

        if key.id() != Id::RSA {
            return Err(VpnPkiError::ca_unavailable(path, CaUnavailableReason::NotRsa));
        }
        Ok(key)
    }

    /// Read the root CA certificate.
    pub fn load_ca_cert(&self) -> Result<X509> {
        let path = &self.config.ca.cert_path;
        let pem_data = read_ca_file(path)?;
        X509::from_pem(&pem_data)
            .map_err(|e| VpnPkiError::ca_unavailable(path, CaUnavailableReason::Parse(e)))
    }

    /// Root CA certificate as PEM text, for embedding into config files.
    pub fn ca_cert_pem(&self) -> Result<String> {
        let pem = self
            .load_ca_cert()?
            .to_pem()
            .map_err(VpnPkiError::certificate("Failed to encode root CA certificate"))?;
        Ok(String::from_utf8_lossy(&pem).into_owned())
    }
}

fn read_ca_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        let reason = match e.kind() {
            io::ErrorKind::NotFound => CaUnavailableReason::FileNotFound(e),
            _ => CaUnavailableReason::Unreadable(e),
        };
        VpnPkiError::ca_unavailable(path, reason)
    })
}

fn is_encrypted_pem(pem_data: &[u8]) -> bool {
    let text = String::from_utf8_lossy(pem_data);
    text.contains("ENCRYPTED")
}

fn write_file(path: &Path, contents: &[u8], private: bool) -> Result<()> {
    let io_err = |source: io::Error| VpnPkiError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    if private {
        open_private(path)
            .and_then(|mut file| file.write_all(contents))
            .map_err(io_err)?;
    } else {
        fs::write(path, contents).map_err(io_err)?;
    }

    info!(path = %path.display(), "Wrote root CA file");
    Ok(())
}

/// Create a new file readable and writable by the owner only (Unix).
/// Fails if the file already exists.
fn open_private(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}
