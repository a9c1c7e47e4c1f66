// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! Builders for the subject name and extensions that make up an X.509
//! (or CertificateRequest) template: everything the Key & Template
//! Constructor assembles before the Signer produces ASN.1/DER bytes.

use std::net::IpAddr;

use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName,
};
use openssl::x509::{X509Extension, X509Name, X509v3Context};

use crate::error::IssuanceResult;
use crate::role::{KeyType, PathLength, UsageFlags};
use crate::urls::UrlEntries;

/// A subject name carrying only a CommonName, per §4.4: other DN attributes
/// are never populated outside the CSR pass-through path.
pub fn subject_name(common_name: &str) -> IssuanceResult<X509Name> {
    let mut builder = X509Name::builder()?;
    builder.append_entry_by_nid(Nid::COMMONNAME, common_name)?;
    Ok(builder.build())
}

/// Baseline `key_usage = DigitalSignature | KeyEncipherment | KeyAgreement`,
/// extended with `CertSign | CRLSign` when the template is a CA.
pub fn key_usage_extension(is_ca: bool) -> IssuanceResult<X509Extension> {
    let mut builder = KeyUsage::new();
    builder.critical().digital_signature().key_encipherment().key_agreement();
    if is_ca {
        builder.key_cert_sign().crl_sign();
    }
    Ok(builder.build()?)
}

/// Extended key usage assembled from the role's usage mask, with
/// `OCSPSigning` added for CA templates. `None` if the resulting set would
/// be empty, since OpenSSL rejects an extension with no usages.
pub fn extended_key_usage_extension(usage: &UsageFlags, is_ca: bool) -> Option<IssuanceResult<X509Extension>> {
    if usage.is_empty() && !is_ca {
        return None;
    }
    let mut builder = ExtendedKeyUsage::new();
    if usage.server {
        builder.server_auth();
    }
    if usage.client {
        builder.client_auth();
    }
    if usage.code_signing {
        builder.code_signing();
    }
    if usage.email_protection {
        builder.email_protection();
    }
    if is_ca {
        // openssl-rs has no dedicated `ocsp_signing()` builder method; the
        // generic `.other(...)` escape hatch names it the way OpenSSL's own
        // config-file extension syntax does.
        builder.other("OCSPSigning");
    }
    Some(Ok(builder.build()?))
}

/// `basic_constraints_valid = true`, `CA:{true,false}`, and the pathlen
/// field, which is only ever present when the template is a CA and the
/// path length is `Limited` — `Unconstrained` omits the field entirely,
/// letting the tri-state round-trip without a sentinel value.
pub fn basic_constraints_extension(is_ca: bool, path_length: PathLength) -> IssuanceResult<X509Extension> {
    let mut builder = BasicConstraints::new();
    builder.critical();
    if is_ca {
        builder.ca();
        if let PathLength::Limited(n) = path_length {
            builder.pathlen(n);
        }
    }
    Ok(builder.build()?)
}

/// DNS, email, and IP SANs from the creation bundle. `None` if all three
/// are empty, since an empty SAN extension is meaningless.
pub fn subject_alt_name_extension(
    ctx: &X509v3Context<'_>,
    dns_names: &[String],
    email_addresses: &[String],
    ip_addresses: &[IpAddr],
) -> Option<IssuanceResult<X509Extension>> {
    if dns_names.is_empty() && email_addresses.is_empty() && ip_addresses.is_empty() {
        return None;
    }
    let mut builder = SubjectAlternativeName::new();
    for name in dns_names {
        builder.dns(name);
    }
    for email in email_addresses {
        builder.email(email);
    }
    for ip in ip_addresses {
        builder.ip(&ip.to_string());
    }
    Some(Ok(builder.build(ctx)?))
}

/// The issuer's key identifier, carried on every non-root certificate.
pub fn authority_key_identifier_extension(ctx: &X509v3Context<'_>) -> IssuanceResult<X509Extension> {
    Ok(AuthorityKeyIdentifier::new().keyid(true).build(ctx)?)
}

/// `crlDistributionPoints`, built from the generic extension-value syntax
/// since openssl-rs has no dedicated builder type for this extension.
/// `None` if there are no URLs to publish.
pub fn crl_distribution_points_extension(ctx: &X509v3Context<'_>, urls: &UrlEntries) -> Option<IssuanceResult<X509Extension>> {
    if urls.crl_distribution_points.is_empty() {
        return None;
    }
    let value = urls
        .crl_distribution_points
        .iter()
        .map(|url| format!("URI:{url}"))
        .collect::<Vec<_>>()
        .join(",");
    Some(build_named_extension(ctx, "crlDistributionPoints", &value))
}

/// `authorityInfoAccess`, combining issuing-certificate URLs (`caIssuers`)
/// and OCSP server URLs (`OCSP`), again via the generic value syntax.
/// `None` if both lists are empty.
pub fn authority_info_access_extension(
    ctx: &X509v3Context<'_>,
    issuing_certificates: &[String],
    ocsp_servers: &[String],
) -> Option<IssuanceResult<X509Extension>> {
    if issuing_certificates.is_empty() && ocsp_servers.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    for url in issuing_certificates {
        parts.push(format!("caIssuers;URI:{url}"));
    }
    for url in ocsp_servers {
        parts.push(format!("OCSP;URI:{url}"));
    }
    Some(build_named_extension(ctx, "authorityInfoAccess", &parts.join(",")))
}

fn build_named_extension(ctx: &X509v3Context<'_>, name: &str, value: &str) -> IssuanceResult<X509Extension> {
    Ok(X509Extension::new(None, Some(ctx), name, value)?)
}

/// The signing digest for both supported key types: this crate always
/// signs with SHA-256, whether the key is RSA (SHA-256 with RSA) or EC
/// (ECDSA with SHA-256).
pub fn signature_digest(_key_type: KeyType) -> MessageDigest {
    MessageDigest::sha256()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_name_carries_only_common_name() {
        let name = subject_name("example.com").unwrap();
        let mut entries = name.entries();
        let cn = entries.next().unwrap();
        assert_eq!(cn.data().as_utf8().unwrap().to_string(), "example.com");
        assert!(entries.next().is_none());
    }

    #[test]
    fn extended_key_usage_is_none_for_empty_leaf_mask() {
        assert!(extended_key_usage_extension(&UsageFlags::default(), false).is_none());
    }

    #[test]
    fn extended_key_usage_is_some_for_ca_even_with_empty_mask() {
        assert!(extended_key_usage_extension(&UsageFlags::default(), true).is_some());
    }

    #[test]
    fn signature_digest_is_always_sha256() {
        assert_eq!(signature_digest(KeyType::Rsa).type_(), MessageDigest::sha256().type_());
        assert_eq!(signature_digest(KeyType::Ec).type_(), MessageDigest::sha256().type_());
    }
}
