//! VPN Credential Issuance
//!
//! Issues server and client key/certificate pairs signed by the root CA in
//! [`CaStore`]. The certificate common name doubles as the lookup key of the
//! client's entry in the server's client-config-directory, so it is derived
//! from the endpoint identity rather than from the certificate:
//!
//! | Endpoint                 | Common name                                |
//! |--------------------------|--------------------------------------------|
//! | VPN server               | `<network-path>__<public-address>` (`:`→`_`) |
//! | infrastructure client    | `<network-path>_<host-id>`                 |
//! | user-owned client        | `<owner-email>_<network-path>`             |
//!
//! A user-owned network has a single VPN client, so the email/network pair is
//! unique per logical client and stays compatible with earlier certificates.
//! Names longer than 64 characters are truncated with a random suffix; persist
//! the issued certificate rather than recomputing the name.

use crate::ca_store::CaStore;
use crate::error::{Result, VpnPkiError};
use crate::pki_generator::{build_leaf_cert, generate_key_pair, ExtendedKeyUsagePurpose};
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use tracing::debug;

/// A VPN server identified by its network and public address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    /// Network path of the server's network, e.g. `1-ff00:0:110`
    pub network_path: String,
    /// Public IP address (IPv6 colons are replaced in the common name)
    pub public_address: String,
}

/// Who a VPN client belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointOwner {
    /// Host inside an infrastructure network
    Infrastructure { host_id: String },
    /// Host of a user-owned network
    User { owner_email: String },
}

/// A VPN client endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEndpoint {
    pub network_path: String,
    pub owner: EndpointOwner,
}

impl ServerIdentity {
    pub fn subject(&self) -> String {
        format!(
            "{}__{}",
            self.network_path,
            self.public_address.replace(':', "_")
        )
    }
}

impl ClientEndpoint {
    pub fn subject(&self) -> String {
        match &self.owner {
            EndpointOwner::Infrastructure { host_id } => {
                format!("{}_{}", self.network_path, host_id)
            }
            EndpointOwner::User { owner_email } => {
                format!("{}_{}", owner_email, self.network_path)
            }
        }
    }
}

/// PEM text of an issued key and certificate; ownership passes to the caller.
#[derive(Clone)]
pub struct IssuedCredential {
    /// Unencrypted PKCS#1 PEM private key
    pub key_pem: String,
    /// PEM certificate
    pub cert_pem: String,
    /// Common name written into the certificate (possibly truncated)
    pub common_name: String,
}

impl std::fmt::Debug for IssuedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCredential")
            .field("key_pem", &"<redacted>")
            .field("common_name", &self.common_name)
            .finish()
    }
}

pub struct CredentialIssuer {
    ca_store: CaStore,
}

impl CredentialIssuer {
    pub fn new(ca_store: CaStore) -> Self {
        Self { ca_store }
    }

    pub fn ca_store(&self) -> &CaStore {
        &self.ca_store
    }

    /// Issue a serverAuth credential for a VPN server.
    pub fn issue_server_credential(&self, server: &ServerIdentity) -> Result<IssuedCredential> {
        self.issue(&server.subject(), ExtendedKeyUsagePurpose::ServerAuth)
    }

    /// Issue a clientAuth credential for a VPN client.
    pub fn issue_client_credential(&self, client: &ClientEndpoint) -> Result<IssuedCredential> {
        self.issue(&client.subject(), ExtendedKeyUsagePurpose::ClientAuth)
    }

    fn issue(&self, subject: &str, purpose: ExtendedKeyUsagePurpose) -> Result<IssuedCredential> {
        let ca = self.ca_store.load_ca_material()?;
        let keygen = &self.ca_store.config().keygen;

        let key = generate_key_pair(keygen.key_size)?;
        let (cert, common_name) = build_leaf_cert(
            keygen,
            subject,
            &key,
            &ca.cert,
            &ca.key,
            purpose,
            keygen.key_expire_days,
        )?;

        debug!(
            %common_name,
            ?purpose,
            serial = %serial_hex(&cert),
            "Issued VPN certificate"
        );

        Ok(IssuedCredential {
            key_pem: private_key_pem(&key)?,
            cert_pem: cert_pem(&cert)?,
            common_name,
        })
    }
}

fn private_key_pem(key: &PKey<Private>) -> Result<String> {
    let pem = key
        .rsa()
        .and_then(|rsa| rsa.private_key_to_pem())
        .map_err(VpnPkiError::certificate("Failed to encode private key"))?;
    Ok(String::from_utf8_lossy(&pem).into_owned())
}

fn cert_pem(cert: &X509) -> Result<String> {
    let pem = cert
        .to_pem()
        .map_err(VpnPkiError::certificate("Failed to encode certificate"))?;
    Ok(String::from_utf8_lossy(&pem).into_owned())
}

fn serial_hex(cert: &X509) -> String {
    cert.serial_number()
        .to_bn()
        .and_then(|bn| bn.to_hex_str().map(|s| s.to_string()))
        .unwrap_or_default()
}

/// Extract the single Common Name from a PEM certificate.
///
/// Certificates may come from stored data rather than fresh issuance, so a
/// subject with zero or several CN attributes is rejected with
/// [`VpnPkiError::AmbiguousSubject`].
pub fn extract_common_name(cert_pem: &[u8]) -> Result<String> {
    let cert = X509::from_pem(cert_pem)
        .map_err(VpnPkiError::certificate("Failed to parse PEM certificate"))?;

    let entries: Vec<_> = cert
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .collect();
    let [entry] = entries.as_slice() else {
        return Err(VpnPkiError::AmbiguousSubject {
            count: entries.len(),
        });
    };

    let common_name = entry
        .data()
        .as_utf8()
        .map_err(VpnPkiError::certificate("Failed to decode Common Name"))?;
    Ok(common_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_subject_replaces_colons() {
        let server = ServerIdentity {
            network_path: "1-ff00:0:110".to_string(),
            public_address: "2001:db8::1".to_string(),
        };
        assert_eq!(server.subject(), "1-ff00:0:110__2001_db8__1");

        let server = ServerIdentity {
            network_path: "1-ff00:0:110".to_string(),
            public_address: "192.0.2.10".to_string(),
        };
        assert_eq!(server.subject(), "1-ff00:0:110__192.0.2.10");
    }

    #[test]
    fn test_client_subjects() {
        let infra = ClientEndpoint {
            network_path: "1-ff00:0:110".to_string(),
            owner: EndpointOwner::Infrastructure {
                host_id: "8d2c0b6e".to_string(),
            },
        };
        assert_eq!(infra.subject(), "1-ff00:0:110_8d2c0b6e");

        let user = ClientEndpoint {
            network_path: "1-ff00:0:112".to_string(),
            owner: EndpointOwner::User {
                owner_email: "alice@example.org".to_string(),
            },
        };
        assert_eq!(user.subject(), "alice@example.org_1-ff00:0:112");
    }

    #[test]
    fn test_extract_common_name_rejects_garbage() {
        assert!(matches!(
            extract_common_name(b"-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n"),
            Err(VpnPkiError::Certificate { .. })
        ));
    }
}
