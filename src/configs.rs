//! Configuration for the VPN PKI core.
//!
//! Loaded once by the hosting environment and passed explicitly into
//! [`CaStore`](crate::ca_store::CaStore),
//! [`CredentialIssuer`](crate::issuer::CredentialIssuer) and
//! [`VpnConfigRenderer`](crate::vpn_config::VpnConfigRenderer).

use crate::error::{Result, VpnPkiError};
use anyhow::Context;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Smallest RSA modulus accepted for CA and leaf keys.
pub const MIN_KEY_SIZE: u32 = 2048;

#[derive(Debug, Deserialize, Clone)]
pub struct VpnPkiConfig {
    pub ca: CaPaths,
    #[serde(default)]
    pub keygen: KeygenConfig,
    #[serde(default)]
    pub templates: TemplatePaths,
}

/// Fixed locations of the root CA material and the key encryption password.
#[derive(Debug, Deserialize, Clone)]
pub struct CaPaths {
    #[serde(default = "default_ca_key_path")]
    pub key_path: PathBuf,
    #[serde(default = "default_ca_cert_path")]
    pub cert_path: PathBuf,
    pub key_password: SecretString,
}

fn default_ca_key_path() -> PathBuf {
    PathBuf::from("run/root_ca_key.pem")
}

fn default_ca_cert_path() -> PathBuf {
    PathBuf::from("run/root_ca_cert.pem")
}

/// Key sizes, validity windows and the fixed organizational name fields.
#[derive(Debug, Deserialize, Clone)]
pub struct KeygenConfig {
    #[serde(default = "default_key_size")]
    pub key_size: u32,
    #[serde(default = "default_ca_expire_days")]
    pub ca_expire_days: u32,
    #[serde(default = "default_key_expire_days")]
    pub key_expire_days: u32,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_province")]
    pub province: String,
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default = "default_organizational_unit")]
    pub organizational_unit: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_email")]
    pub email: String,
}

impl Default for KeygenConfig {
    fn default() -> Self {
        Self {
            key_size: default_key_size(),
            ca_expire_days: default_ca_expire_days(),
            key_expire_days: default_key_expire_days(),
            country: default_country(),
            province: default_province(),
            city: default_city(),
            organization: default_organization(),
            organizational_unit: default_organizational_unit(),
            name: default_name(),
            email: default_email(),
        }
    }
}

fn default_key_size() -> u32 {
    2048
}

fn default_ca_expire_days() -> u32 {
    3650 // 10 years
}

fn default_key_expire_days() -> u32 {
    1095 // 3 years
}

fn default_country() -> String {
    "CH".to_string()
}

fn default_province() -> String {
    "ZH".to_string()
}

fn default_city() -> String {
    "Zurich".to_string()
}

fn default_organization() -> String {
    "Example Network".to_string()
}

fn default_organizational_unit() -> String {
    "VPN".to_string()
}

fn default_name() -> String {
    "Example Network VPN".to_string()
}

fn default_email() -> String {
    "vpn@example.org".to_string()
}

/// Locations of the client and server config templates.
#[derive(Debug, Deserialize, Clone)]
pub struct TemplatePaths {
    #[serde(default = "default_client_template")]
    pub client_config_path: PathBuf,
    #[serde(default = "default_server_template")]
    pub server_config_path: PathBuf,
}

impl Default for TemplatePaths {
    fn default() -> Self {
        Self {
            client_config_path: default_client_template(),
            server_config_path: default_server_template(),
        }
    }
}

fn default_client_template() -> PathBuf {
    PathBuf::from("templates/client.conf.tmpl")
}

fn default_server_template() -> PathBuf {
    PathBuf::from("templates/server.conf.tmpl")
}

impl VpnPkiConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config_str =
            fs::read_to_string(path).context(format!("Failed to read config file: {}", path))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(config_str: &str) -> anyhow::Result<Self> {
        let config: VpnPkiConfig =
            toml::from_str(config_str).context("Failed to parse config file")?;
        config.validate().context("Config file rejected")?;

        Ok(config)
    }

    /// Check the invariants the PKI relies on.
    ///
    /// - RSA modulus of at least [`MIN_KEY_SIZE`] bits
    /// - leaf validity strictly shorter than CA validity
    /// - two-letter country code (X.509 `countryName` is fixed-size)
    pub fn validate(&self) -> Result<()> {
        let keygen = &self.keygen;
        if keygen.key_size < MIN_KEY_SIZE {
            return Err(VpnPkiError::Config(format!(
                "key_size {} is below the {} bit minimum",
                keygen.key_size, MIN_KEY_SIZE
            )));
        }
        if keygen.key_expire_days == 0 || keygen.key_expire_days >= keygen.ca_expire_days {
            return Err(VpnPkiError::Config(format!(
                "key_expire_days ({}) must be positive and shorter than ca_expire_days ({})",
                keygen.key_expire_days, keygen.ca_expire_days
            )));
        }
        if keygen.country.chars().count() != 2 {
            return Err(VpnPkiError::Config(format!(
                "country must be a two-letter code, got {:?}",
                keygen.country
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const MINIMAL: &str = r#"
        [ca]
        key_password = "hunter2"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = VpnPkiConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.ca.key_path, PathBuf::from("run/root_ca_key.pem"));
        assert_eq!(config.ca.key_password.expose_secret(), "hunter2");
        assert_eq!(config.keygen.key_size, 2048);
        assert_eq!(config.keygen.ca_expire_days, 3650);
        assert_eq!(
            config.templates.client_config_path,
            PathBuf::from("templates/client.conf.tmpl")
        );
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let config = VpnPkiConfig::from_toml_str(MINIMAL).unwrap();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_rejects_small_key_size() {
        let toml = r#"
            [ca]
            key_password = "pw"
            [keygen]
            key_size = 1024
        "#;
        assert!(VpnPkiConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_rejects_leaf_validity_not_shorter_than_ca() {
        let toml = r#"
            [ca]
            key_password = "pw"
            [keygen]
            ca_expire_days = 365
            key_expire_days = 365
        "#;
        assert!(VpnPkiConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_rejects_long_country() {
        let mut config = VpnPkiConfig::from_toml_str(MINIMAL).unwrap();
        config.keygen.country = "CHE".to_string();
        assert!(matches!(config.validate(), Err(VpnPkiError::Config(_))));
    }
}
