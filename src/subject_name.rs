//! Distinguished name construction for the root CA and issued certificates.
//!
//! All names share the seven organizational attributes from
//! [`KeygenConfig`]; only the common name varies.

use crate::configs::KeygenConfig;
use crate::error::{Result, VpnPkiError};
use openssl::nid::Nid;
use openssl::x509::{X509Name, X509NameBuilder};
use tracing::warn;
use uuid::Uuid;

/// Upper bound on the X.509 common name (`ub-common-name`).
pub const COMMON_NAME_MAX_LEN: usize = 64;
/// Length of the random hex suffix appended to truncated common names.
pub const UNIQUE_SUFFIX_LEN: usize = 32;

/// Build the subject name `C, ST, L, O, OU, CN, name, emailAddress` for `common_name`.
pub fn build_subject_name(keygen: &KeygenConfig, common_name: &str) -> Result<X509Name> {
    let mut name_builder =
        X509NameBuilder::new().map_err(VpnPkiError::certificate("Failed to create name builder"))?;

    let entries: [(Nid, &str, &'static str); 8] = [
        (Nid::COUNTRYNAME, keygen.country.as_str(), "Failed to set country"),
        (Nid::STATEORPROVINCENAME, keygen.province.as_str(), "Failed to set state/province"),
        (Nid::LOCALITYNAME, keygen.city.as_str(), "Failed to set locality"),
        (Nid::ORGANIZATIONNAME, keygen.organization.as_str(), "Failed to set organization"),
        (
            Nid::ORGANIZATIONALUNITNAME,
            keygen.organizational_unit.as_str(),
            "Failed to set organizational unit",
        ),
        (Nid::COMMONNAME, common_name, "Failed to set CN"),
        (Nid::NAME, keygen.name.as_str(), "Failed to set name"),
        (Nid::PKCS9_EMAILADDRESS, keygen.email.as_str(), "Failed to set email"),
    ];
    for (nid, value, context) in entries {
        name_builder
            .append_entry_by_nid(nid, value)
            .map_err(VpnPkiError::certificate(context))?;
    }

    Ok(name_builder.build())
}

/// Enforce the 64 character common name limit.
///
/// Names within the limit are returned unchanged. Longer names keep their
/// first 32 characters followed by 32 random hex digits, so the result is
/// unique per call and cannot be recomputed from the input; callers must
/// persist the returned value.
pub fn truncate_unique(name: &str) -> String {
    if name.chars().count() <= COMMON_NAME_MAX_LEN {
        return name.to_string();
    }

    let mut shortened: String = name
        .chars()
        .take(COMMON_NAME_MAX_LEN - UNIQUE_SUFFIX_LEN)
        .collect();
    shortened.push_str(&Uuid::new_v4().simple().to_string());
    warn!(subject = name, truncated = %shortened, "Subject name exceeds 64 characters, truncated");
    shortened
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn entries(name: &X509Name, nid: Nid) -> Vec<String> {
        name.entries_by_nid(nid)
            .map(|e| e.data().as_utf8().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_short_name_is_unchanged() {
        let name = "1-ff00:0:110_10.0.0.1";
        assert_eq!(truncate_unique(name), name);
        assert_eq!(truncate_unique(&truncate_unique(name)), name);
    }

    #[test]
    fn test_exactly_64_is_unchanged() {
        let name = "a".repeat(64);
        assert_eq!(truncate_unique(&name), name);
    }

    #[test]
    fn test_long_name_truncated_with_hex_suffix() {
        let name: String = ('a'..='z').cycle().take(80).collect();
        let truncated = truncate_unique(&name);

        assert_eq!(truncated.chars().count(), 64);
        assert_eq!(&truncated[..32], &name[..32]);
        assert!(truncated[32..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_long_name_truncation_is_unique() {
        let name = "x".repeat(65);
        let outputs: HashSet<String> = (0..1000).map(|_| truncate_unique(&name)).collect();
        assert_eq!(outputs.len(), 1000);
    }

    #[test]
    fn test_truncation_counts_characters() {
        let name = "ü".repeat(70);
        let truncated = truncate_unique(&name);
        assert_eq!(truncated.chars().count(), 64);
        assert!(truncated.starts_with(&"ü".repeat(32)));
    }

    #[test]
    fn test_subject_name_fields() {
        let keygen = KeygenConfig::default();
        let name = build_subject_name(&keygen, "host-1").unwrap();

        assert_eq!(entries(&name, Nid::COMMONNAME), vec!["host-1"]);
        assert_eq!(entries(&name, Nid::COUNTRYNAME), vec![keygen.country.clone()]);
        assert_eq!(entries(&name, Nid::ORGANIZATIONNAME), vec![keygen.organization.clone()]);
        assert_eq!(entries(&name, Nid::NAME), vec![keygen.name.clone()]);
        assert_eq!(entries(&name, Nid::PKCS9_EMAILADDRESS), vec![keygen.email.clone()]);
        assert_eq!(name.entries().count(), 8);
    }
}
