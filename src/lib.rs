//! VPN PKI - Root CA and OpenVPN credential core
//!
//! Issues and manages the certificate trust chain of a VPN overlay: a single
//! root Certificate Authority, short-lived server and client certificates
//! signed by it, and the OpenVPN configuration text that embeds them.
//!
//! # Overview
//!
//! ```text
//! Root CA (self-signed, CA=true, pathlen=0)
//!   ├── VPN server certificate (serverAuth)
//!   └── VPN client certificate (clientAuth)
//! ```
//!
//! The crate only produces bytes (keys, certificates, config text) and
//! consumes bytes (templates, existing CA files). Persisting issued
//! credentials, mapping them to hosts and serving them is up to the caller.
//!
//! - **RSA keys** of configurable size (2048 bits minimum), SHA-256 signatures
//! - **Encrypted CA key**: password-protected PEM at a fixed path
//! - **Stateless issuance**: CA material is reread from disk for every signature
//!
//! # Quick Start
//!
//! ```no_run
//! use vpn_pki::ca_store::CaStore;
//! use vpn_pki::configs::VpnPkiConfig;
//! use vpn_pki::issuer::{ClientEndpoint, CredentialIssuer, EndpointOwner};
//! use vpn_pki::vpn_config::{render_ccd_entry, VpnConfigRenderer};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = VpnPkiConfig::from_file("vpn_pki.toml")?;
//!     let ca_store = CaStore::new(config)?;
//!
//!     // Run once, from a single process
//!     ca_store.bootstrap()?;
//!
//!     let issuer = CredentialIssuer::new(ca_store.clone());
//!     let client = issuer.issue_client_credential(&ClientEndpoint {
//!         network_path: "1-ff00:0:112".to_string(),
//!         owner: EndpointOwner::User {
//!             owner_email: "alice@example.org".to_string(),
//!         },
//!     })?;
//!
//!     let renderer = VpnConfigRenderer::new(ca_store);
//!     let client_conf = renderer.client_config(
//!         "192.0.2.1".parse()?,
//!         1194,
//!         &client.cert_pem,
//!         &client.key_pem,
//!     )?;
//!     let (common_name, ccd_line) =
//!         render_ccd_entry(&client.cert_pem, "10.0.8.2".parse()?, "255.255.255.0".parse()?)?;
//!     println!("{}\n{} -> {}", client_conf, common_name, ccd_line);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`configs`]: TOML configuration (CA paths and password, key sizes,
//!   validity, organizational name fields, template paths)
//! - [`subject_name`]: distinguished names and the 64 character common name rule
//! - [`pki_generator`]: RSA key generation, root and leaf certificate builders
//! - [`ca_store`]: bootstrap and loading of the root CA
//! - [`issuer`]: server/client credential issuance, common name extraction
//! - [`templates`]: `$Name` placeholder substitution
//! - [`vpn_config`]: client config, server config and CCD entry rendering
//!
//! # Concurrency
//!
//! All operations are synchronous and blocking. Issuance and rendering keep
//! no shared mutable state and may run concurrently. [`ca_store::CaStore::bootstrap`]
//! is not synchronized; run it from one place only.
//!
//! # Error Handling
//!
//! Library APIs return [`error::Result`] with the typed [`error::VpnPkiError`].
//! Configuration loading returns `anyhow::Result` with context attached.

pub mod ca_store;
pub mod configs;
pub mod error;
pub mod issuer;
pub mod pki_generator;
pub mod subject_name;
pub mod templates;
pub mod vpn_config;

pub use error::{Result, VpnPkiError};
