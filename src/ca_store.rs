// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! Retrieval of the stored CA bundle (and its published URL entries) that
//! anchors non-root issuance.

use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

use crate::error::{IssuanceError, IssuanceResult};
use crate::request::{RequestContext, Storage};
use crate::role::{KeyType, PathLength};
use crate::urls::UrlEntries;
use crate::x509::der;

/// Storage key the signing bundle is read from.
pub const CA_BUNDLE_KEY: &str = "config/ca_bundle";
/// Storage key the root's published `UrlEntries` are read from.
pub const URLS_KEY: &str = "config/urls";

/// The on-disk shape of the CA bundle: PEM-concatenated certificate,
/// private key, and (optionally) the rest of the issuing chain, in that
/// order. This is the representation the router is expected to have
/// serialized before handing storage to this core.
pub struct StoredCaBundle {
    pub certificate_pem: String,
    pub private_key_pem: String,
    pub chain_pem: Vec<String>,
}

impl StoredCaBundle {
    pub fn decode(data: &[u8]) -> IssuanceResult<Self> {
        let blocks = pem::parse_many(data)
            .map_err(|e| IssuanceError::internal(format!("malformed CA bundle record: {e}")))?;
        if blocks.is_empty() {
            return Err(IssuanceError::internal("CA bundle record contains no PEM blocks"));
        }

        let mut certs = Vec::new();
        let mut key = None;
        for block in &blocks {
            match block.tag() {
                "CERTIFICATE" => certs.push(pem::encode(block)),
                "RSA PRIVATE KEY" | "EC PRIVATE KEY" | "PRIVATE KEY" => {
                    if key.is_some() {
                        return Err(IssuanceError::internal(
                            "CA bundle record contains more than one private key",
                        ));
                    }
                    key = Some(pem::encode(block));
                }
                other => {
                    return Err(IssuanceError::internal(format!(
                        "CA bundle record contains an unrecognized PEM block: {other}"
                    )))
                }
            }
        }

        if certs.is_empty() {
            return Err(IssuanceError::internal("CA bundle record has no certificate"));
        }
        let private_key_pem = key.ok_or_else(|| {
            IssuanceError::internal("CA bundle record has no private key")
        })?;

        let mut certs = certs.into_iter();
        let certificate_pem = certs.next().unwrap();
        let chain_pem = certs.collect();

        Ok(StoredCaBundle {
            certificate_pem,
            private_key_pem,
            chain_pem,
        })
    }
}

/// The parsed CA certificate, its private key, the rest of the issuing
/// chain, and the URL entries it publishes on certificates it signs.
/// Treated as read-only, borrowed data for the duration of an issuance
/// call; never cloned beyond what OpenSSL's signing API requires.
#[derive(Clone)]
pub struct SigningBundle {
    pub certificate: X509,
    pub certificate_der: Vec<u8>,
    pub private_key: PKey<Private>,
    pub key_type: KeyType,
    pub chain: Vec<X509>,
    pub path_length: PathLength,
    pub urls: UrlEntries,
}

impl SigningBundle {
    /// Whether `now + ttl` would exceed this CA's own expiry.
    pub fn exceeds_expiry(&self, not_after: &openssl::asn1::Asn1TimeRef) -> IssuanceResult<bool> {
        let diff = self.certificate.not_after().diff(not_after)?;
        Ok(diff.days > 0 || (diff.days == 0 && diff.secs > 0))
    }
}

/// Reads the signing bundle and its published URL entries from storage.
///
/// Fails with [`IssuanceError::User`] if no CA is configured yet (the
/// mount simply hasn't been initialized); with [`IssuanceError::Internal`]
/// on any decode or parse failure, since a once-valid stored bundle
/// failing to parse indicates storage or router corruption, not a bad
/// request. Absent URL entries are not an error.
pub fn fetch_ca_info(request: &RequestContext<'_>) -> IssuanceResult<SigningBundle> {
    let raw = request
        .storage
        .get(CA_BUNDLE_KEY)?
        .ok_or_else(|| IssuanceError::user("backend must be configured with a CA certificate/key"))?;

    let stored = StoredCaBundle::decode(&raw)?;

    let certificate = X509::from_pem(stored.certificate_pem.as_bytes())
        .map_err(|e| IssuanceError::internal(format!("failed to parse stored CA certificate: {e}")))?;
    let certificate_der = certificate
        .to_der()
        .map_err(|e| IssuanceError::internal(format!("failed to re-encode CA certificate: {e}")))?;
    let private_key = PKey::private_key_from_pem(stored.private_key_pem.as_bytes())
        .map_err(|e| IssuanceError::internal(format!("failed to parse stored CA private key: {e}")))?;

    let key_type = match private_key.id() {
        openssl::pkey::Id::RSA => KeyType::Rsa,
        openssl::pkey::Id::EC => KeyType::Ec,
        other => {
            return Err(IssuanceError::internal(format!(
                "stored CA private key has unsupported algorithm: {other:?}"
            )))
        }
    };

    let mut chain = Vec::with_capacity(stored.chain_pem.len());
    for pem_block in &stored.chain_pem {
        chain.push(
            X509::from_pem(pem_block.as_bytes())
                .map_err(|e| IssuanceError::internal(format!("failed to parse CA chain entry: {e}")))?,
        );
    }

    let (_is_ca, path_length) = der::basic_constraints(&certificate_der)?;

    let urls = match request.storage.get(URLS_KEY)? {
        Some(data) => UrlEntries::decode(&data)?,
        None => UrlEntries::default(),
    };

    Ok(SigningBundle {
        certificate,
        certificate_der,
        private_key,
        key_type,
        chain,
        path_length,
        urls,
    })
}

/// One of the four storage locations the revocation paths (external to
/// this core) resolve a serial to. Exposed as a pure helper since it has
/// no persistence side effects of its own and the router needs identical
/// normalization on both the write and read side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateStorageLocation {
    Ca,
    Crl,
    Revoked,
    Certs,
}

/// Normalizes a serial number string to this core's canonical on-disk
/// form: lower case, with hyphens replaced by colons.
pub fn normalize_serial(serial: &str) -> String {
    serial.to_lowercase().replace('-', ":")
}

/// Resolves `(prefix, serial)` to the storage path the revocation paths
/// read or write certificate material at.
pub fn certificate_storage_path(prefix: &str, serial: &str, location: CertificateStorageLocation) -> String {
    let normalized = normalize_serial(serial);
    match location {
        CertificateStorageLocation::Ca => format!("{prefix}ca"),
        CertificateStorageLocation::Crl => format!("{prefix}crl"),
        CertificateStorageLocation::Revoked => format!("{prefix}revoked/{normalized}"),
        CertificateStorageLocation::Certs => format!("{prefix}certs/{normalized}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_serial_case_and_separators() {
        assert_eq!(normalize_serial("AA-BB-CC"), "aa:bb:cc");
    }

    #[test]
    fn resolves_storage_paths() {
        assert_eq!(
            certificate_storage_path("pki/", "AA-BB", CertificateStorageLocation::Certs),
            "pki/certs/aa:bb"
        );
        assert_eq!(
            certificate_storage_path("pki/", "AA-BB", CertificateStorageLocation::Revoked),
            "pki/revoked/aa:bb"
        );
        assert_eq!(certificate_storage_path("pki/", "", CertificateStorageLocation::Ca), "pki/ca");
        assert_eq!(certificate_storage_path("pki/", "", CertificateStorageLocation::Crl), "pki/crl");
    }
}
