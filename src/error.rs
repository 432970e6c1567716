//! Error types for the VPN PKI library.
//!
//! Every failure here is structural (missing file, wrong password, malformed
//! certificate, template/config mismatch). Nothing is retried internally and
//! nothing is swallowed: all errors propagate to the caller.

use openssl::error::ErrorStack;
use std::path::PathBuf;
use thiserror::Error;

/// Guidance attached to every [`VpnPkiError::CaUnavailable`].
pub const CA_REMEDIATION_HINT: &str = "Missing or unusable root CA configuration. \
     Run the root CA bootstrap step or import an existing root CA configuration.";

/// The main error type for VPN PKI operations.
#[derive(Error, Debug)]
pub enum VpnPkiError {
    /// CA key or certificate file missing, unreadable or undecryptable
    #[error("CA material at {} unavailable: {reason}. {}", path.display(), CA_REMEDIATION_HINT)]
    CaUnavailable {
        path: PathBuf,
        #[source]
        reason: CaUnavailableReason,
    },

    /// RSA key generation failed (entropy or allocation failure)
    #[error("Key generation error: {0}")]
    KeyGeneration(#[source] ErrorStack),

    /// Certificate has zero or several Common Name attributes
    #[error("Certificate Common Name field is not unequivocal: found {count} CN attributes")]
    AmbiguousSubject { count: usize },

    /// Template references a placeholder the renderer does not supply
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// OpenSSL failure while building, signing, parsing or encoding a certificate
    #[error("Certificate error: {context}")]
    Certificate {
        context: &'static str,
        #[source]
        source: ErrorStack,
    },

    /// Writing CA material or reading a template failed
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration values rejected by validation
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Why the CA material could not be loaded.
#[derive(Error, Debug)]
pub enum CaUnavailableReason {
    #[error("file not found")]
    FileNotFound(#[source] std::io::Error),

    #[error("file unreadable")]
    Unreadable(#[source] std::io::Error),

    #[error("invalid password for encrypted private key")]
    InvalidPassword(#[source] ErrorStack),

    #[error("failed to parse PEM data")]
    Parse(#[source] ErrorStack),

    #[error("private key is not an RSA key")]
    NotRsa,
}

/// Placeholder substitution failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("placeholder ${name} is not supplied")]
    MissingPlaceholder { name: String },

    #[error("invalid placeholder at line {line}, column {column}")]
    InvalidPlaceholder { line: usize, column: usize },
}

impl VpnPkiError {
    pub(crate) fn certificate(context: &'static str) -> impl FnOnce(ErrorStack) -> Self {
        move |source| VpnPkiError::Certificate { context, source }
    }

    pub(crate) fn ca_unavailable(path: impl Into<PathBuf>, reason: CaUnavailableReason) -> Self {
        VpnPkiError::CaUnavailable {
            path: path.into(),
            reason,
        }
    }
}

/// A specialized Result type for VPN PKI operations.
pub type Result<T> = std::result::Result<T, VpnPkiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ca_unavailable_carries_remediation() {
        let err = VpnPkiError::ca_unavailable(
            "/nonexistent/ca.key",
            CaUnavailableReason::FileNotFound(std::io::Error::from(
                std::io::ErrorKind::NotFound,
            )),
        );
        let msg = err.to_string();
        assert!(msg.contains("/nonexistent/ca.key"));
        assert!(msg.contains("file not found"));
        assert!(msg.contains("bootstrap"));
    }

    #[test]
    fn test_template_error_display() {
        let err = VpnPkiError::from(TemplateError::MissingPlaceholder {
            name: "ServerIP".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Template error: placeholder $ServerIP is not supplied"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VpnPkiError>();
    }
}
