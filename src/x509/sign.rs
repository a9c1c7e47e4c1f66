// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! The Signer: the four entry points an external caller drives (`issue`,
//! `sign_csr`, `generate_self_signed`, `generate_intermediate_csr`), each of
//! which calls the Creation-Bundle Builder and the Key & Template
//! Constructor before producing ASN.1/DER bytes.

use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::{X509, X509Builder, X509Extension, X509Ref, X509Req, X509ReqBuilder};

use crate::bundle::{self, CreationBundle};
use crate::ca_store::SigningBundle;
use crate::error::{IssuanceError, IssuanceResult};
use crate::request::{IssuanceData, RequestContext};
use crate::result::{CsrResultBundle, ResultBundle};
use crate::role::RolePolicy;
use crate::x509::der;
use crate::x509::keys;
use crate::x509::template;

/// Generates a keypair and signs a leaf or intermediate certificate under
/// `signing_bundle`.
pub fn issue(
    role: &RolePolicy,
    signing_bundle: &SigningBundle,
    request: &RequestContext<'_>,
    data: &IssuanceData,
    is_ca: bool,
) -> IssuanceResult<ResultBundle> {
    let creation = bundle::build(role, Some(signing_bundle), None, request, data, is_ca, false)?;
    refuse_ca_under_zero_path_length(signing_bundle, is_ca)?;

    let key = keys::generate_key(role.key_type, role.key_bits)?;
    let public_key_der = key.public_key_to_der()?;

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    builder.set_subject_name(&template::subject_name(&creation.common_name)?)?;
    builder.set_issuer_name(signing_bundle.certificate.subject_name())?;
    builder.set_pubkey(&key)?;
    set_validity(&mut builder, &creation)?;
    builder.set_serial_number(&keys::random_serial()?.to_asn1_integer()?)?;

    append_common_extensions(&mut builder, &creation, Some(&signing_bundle.certificate))?;
    append_ski_from_der(&mut builder, &public_key_der)?;

    builder.sign(&signing_bundle.private_key, template::signature_digest(signing_bundle.key_type))?;
    let certificate = builder.build();

    finish(certificate, signing_bundle.certificate.clone(), Some(key))
}

/// Parses a PEM CSR, verifies its self-signature, and signs a certificate
/// over it either by copying its subject/extensions wholesale
/// (`use_csr_values`) or by rebuilding the template from the creation
/// bundle as `issue` does.
pub fn sign_csr(
    role: &RolePolicy,
    signing_bundle: &SigningBundle,
    request: &RequestContext<'_>,
    data: &IssuanceData,
    is_ca: bool,
    use_csr_values: bool,
) -> IssuanceResult<ResultBundle> {
    let csr_pem = data
        .csr
        .as_deref()
        .ok_or_else(|| IssuanceError::user("a CSR must be supplied to sign"))?;
    let csr = X509Req::from_pem(csr_pem.as_bytes())
        .map_err(|e| IssuanceError::user(format!("malformed CSR: {e}")))?;
    let csr_der = csr
        .to_der()
        .map_err(|e| IssuanceError::internal(format!("failed to re-encode CSR: {e}")))?;

    let csr_public_key = csr
        .public_key()
        .map_err(|e| IssuanceError::user(format!("CSR has no usable public key: {e}")))?;
    let self_signed = csr
        .verify(&csr_public_key)
        .map_err(|e| IssuanceError::user(format!("failed to verify CSR signature: {e}")))?;
    if !self_signed {
        return Err(IssuanceError::user("CSR signature does not verify against its own public key"));
    }

    if use_csr_values && !is_ca && der::contains_basic_constraints_oid(&csr_der) {
        return Err(IssuanceError::user(
            "will not sign a CSR asking for CA rights: BasicConstraints present on a non-CA endpoint",
        ));
    }

    let creation = bundle::build(role, Some(signing_bundle), Some(&csr), request, data, is_ca, use_csr_values)?;
    refuse_ca_under_zero_path_length(signing_bundle, is_ca)?;

    let public_key_der = csr_public_key.public_key_to_der()?;

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    builder.set_issuer_name(signing_bundle.certificate.subject_name())?;
    builder.set_pubkey(&csr_public_key)?;
    set_validity(&mut builder, &creation)?;
    builder.set_serial_number(&keys::random_serial()?.to_asn1_integer()?)?;

    if use_csr_values {
        builder.set_subject_name(csr.subject_name())?;
        if let Ok(extensions) = csr.extensions() {
            for extension in extensions.iter() {
                builder.append_extension2(extension)?;
            }
        }
    } else {
        builder.set_subject_name(&template::subject_name(&creation.common_name)?)?;
        append_common_extensions(&mut builder, &creation, Some(&signing_bundle.certificate))?;
    }
    append_ski_from_der(&mut builder, &public_key_der)?;

    builder.sign(&signing_bundle.private_key, template::signature_digest(signing_bundle.key_type))?;
    let certificate = builder.build();

    finish(certificate, signing_bundle.certificate.clone(), None)
}

/// Generates a keypair and a self-signed root certificate: no signing
/// bundle, the template is always a CA.
pub fn generate_self_signed(
    role: &RolePolicy,
    request: &RequestContext<'_>,
    data: &IssuanceData,
) -> IssuanceResult<ResultBundle> {
    let creation = bundle::build(role, None, None, request, data, true, false)?;

    let key = keys::generate_key(role.key_type, role.key_bits)?;
    let public_key_der = key.public_key_to_der()?;
    let subject = template::subject_name(&creation.common_name)?;

    let mut builder = X509::builder()?;
    builder.set_version(2)?;
    builder.set_subject_name(&subject)?;
    builder.set_issuer_name(&subject)?;
    builder.set_pubkey(&key)?;
    set_validity(&mut builder, &creation)?;
    builder.set_serial_number(&keys::random_serial()?.to_asn1_integer()?)?;

    append_common_extensions(&mut builder, &creation, None)?;
    append_ski_from_der(&mut builder, &public_key_der)?;

    builder.sign(&key, template::signature_digest(role.key_type))?;
    let certificate = builder.build();

    finish(certificate.clone(), certificate, Some(key))
}

/// Generates a keypair and a PKCS#10 CSR requesting an intermediate CA, with
/// the requested path length carried on the CSR's own BasicConstraints
/// extension so the CA that eventually signs it can read the constraint
/// back.
pub fn generate_intermediate_csr(
    role: &RolePolicy,
    request: &RequestContext<'_>,
    data: &IssuanceData,
) -> IssuanceResult<CsrResultBundle> {
    let creation = bundle::build(role, None, None, request, data, true, false)?;

    let key = keys::generate_key(role.key_type, role.key_bits)?;

    let mut builder = X509ReqBuilder::new()?;
    builder.set_version(0)?;
    builder.set_subject_name(&template::subject_name(&creation.common_name)?)?;
    builder.set_pubkey(&key)?;

    let mut extensions = Stack::new()?;
    extensions.push(template::basic_constraints_extension(true, creation.max_path_length)?)?;
    let san = {
        let ctx = builder.x509v3_context(None);
        template::subject_alt_name_extension(&ctx, &creation.dns_names, &creation.email_addresses, &creation.ip_addresses)
    };
    if let Some(san) = san {
        extensions.push(san?)?;
    }
    builder.add_extensions(&extensions)?;

    builder.sign(&key, template::signature_digest(role.key_type))?;
    let csr = builder.build();

    let csr_der = csr
        .to_der()
        .map_err(|e| IssuanceError::internal(format!("failed to re-encode generated CSR: {e}")))?;
    X509Req::from_der(&csr_der)
        .map_err(|e| IssuanceError::internal(format!("generated CSR failed to round-trip: {e}")))?;

    Ok(CsrResultBundle {
        csr_der,
        csr,
        private_key: key,
    })
}

fn refuse_ca_under_zero_path_length(signing_bundle: &SigningBundle, is_ca: bool) -> IssuanceResult<()> {
    if is_ca && signing_bundle.path_length.is_zero() {
        return Err(IssuanceError::user(
            "refusing to issue a CA certificate: the signing CA's path length is exhausted",
        ));
    }
    Ok(())
}

fn set_validity(builder: &mut X509Builder, creation: &CreationBundle<'_>) -> IssuanceResult<()> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let not_before = openssl::asn1::Asn1Time::from_unix(now.as_secs() as i64)?;
    let not_after = openssl::asn1::Asn1Time::from_unix((now + creation.ttl).as_secs() as i64)?;
    builder.set_not_before(&not_before)?;
    builder.set_not_after(&not_after)?;
    Ok(())
}

/// Appends key usage, extended key usage, basic constraints, and SAN
/// extensions built from the creation bundle, plus (when `issuer_cert` is
/// `Some`) the authority key identifier and the published CRL/AIA URLs.
fn append_common_extensions(
    builder: &mut X509Builder,
    creation: &CreationBundle<'_>,
    issuer_cert: Option<&X509Ref>,
) -> IssuanceResult<()> {
    let key_usage = template::key_usage_extension(creation.is_ca)?;
    builder.append_extension(key_usage)?;

    if let Some(eku) = template::extended_key_usage_extension(&creation.usage, creation.is_ca) {
        builder.append_extension(eku?)?;
    }

    let basic_constraints = template::basic_constraints_extension(creation.is_ca, creation.max_path_length)?;
    builder.append_extension(basic_constraints)?;

    let (san, crl, aia, aki) = {
        let ctx = builder.x509v3_context(issuer_cert, None);
        let san = template::subject_alt_name_extension(
            &ctx,
            &creation.dns_names,
            &creation.email_addresses,
            &creation.ip_addresses,
        );
        let crl = template::crl_distribution_points_extension(&ctx, &creation.urls);
        let aia = template::authority_info_access_extension(
            &ctx,
            &creation.urls.issuing_certificates,
            &creation.urls.ocsp_servers,
        );
        let aki = issuer_cert.map(|_| template::authority_key_identifier_extension(&ctx));
        (san, crl, aia, aki)
    };

    if let Some(san) = san {
        builder.append_extension(san?)?;
    }
    if let Some(crl) = crl {
        builder.append_extension(crl?)?;
    }
    if let Some(aia) = aia {
        builder.append_extension(aia?)?;
    }
    if let Some(aki) = aki {
        builder.append_extension(aki?)?;
    }
    Ok(())
}

/// Computes the subject key identifier directly from `public_key_der`
/// rather than through OpenSSL's extension builder, since the sign-CSR path
/// needs the SKI of the CSR's key, which the certificate builder being
/// populated never itself holds as a keypair.
fn append_ski_from_der(builder: &mut X509Builder, public_key_der: &[u8]) -> IssuanceResult<()> {
    let mut hasher = openssl::hash::Hasher::new(openssl::hash::MessageDigest::sha1())?;
    hasher.update(public_key_der)?;
    let digest = hasher.finish()?;
    let ski = X509Extension::new(None, None, "subjectKeyIdentifier", &hex_colon(&digest))?;
    builder.append_extension(ski)?;
    Ok(())
}

fn hex_colon(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":")
}

fn finish(certificate: X509, issuing_ca: X509, private_key: Option<PKey<Private>>) -> IssuanceResult<ResultBundle> {
    let certificate_der = certificate
        .to_der()
        .map_err(|e| IssuanceError::internal(format!("failed to re-encode issued certificate: {e}")))?;
    X509::from_der(&certificate_der)
        .map_err(|e| IssuanceError::internal(format!("issued certificate failed to round-trip: {e}")))?;
    let issuing_ca_der = issuing_ca
        .to_der()
        .map_err(|e| IssuanceError::internal(format!("failed to re-encode issuing CA: {e}")))?;

    Ok(ResultBundle {
        certificate_der,
        certificate,
        issuing_ca_der,
        issuing_ca,
        private_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ca_store::SigningBundle;
    use crate::config::SystemDefaults;
    use crate::role::{KeyType, PathLength};
    use crate::urls::UrlEntries;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryStorage(Mutex<HashMap<String, Vec<u8>>>);

    impl MemoryStorage {
        fn new() -> Self {
            MemoryStorage(Mutex::new(HashMap::new()))
        }
    }

    impl crate::request::Storage for MemoryStorage {
        fn get(&self, key: &str) -> IssuanceResult<Option<Vec<u8>>> {
            Ok(self.0.lock().unwrap().get(key).cloned())
        }

        fn put(&self, key: &str, value: &[u8]) -> IssuanceResult<()> {
            self.0.lock().unwrap().insert(key.to_string(), value.to_vec());
            Ok(())
        }
    }

    fn role() -> RolePolicy {
        RolePolicy {
            allow_any_name: true,
            key_type: KeyType::Rsa,
            key_bits: 2048,
            ..RolePolicy::default()
        }
    }

    fn request(storage: &MemoryStorage) -> RequestContext<'_> {
        RequestContext::new("token", storage).with_defaults(SystemDefaults::default())
    }

    fn root_signing_bundle(path_length: PathLength) -> SigningBundle {
        let storage = MemoryStorage::new();
        let request = request(&storage);
        let mut root_role = role();
        root_role.max_path_length = Some(path_length);
        let result = generate_self_signed(
            &root_role,
            &request,
            &IssuanceData {
                common_name: "Test Root CA".to_string(),
                ttl: "8760h".to_string(),
                ..IssuanceData::default()
            },
        )
        .unwrap();

        SigningBundle {
            certificate: result.certificate.clone(),
            certificate_der: result.certificate_der.clone(),
            private_key: result.private_key.unwrap(),
            key_type: KeyType::Rsa,
            chain: Vec::new(),
            path_length,
            urls: UrlEntries::default(),
        }
    }

    #[test]
    fn self_signed_root_is_its_own_issuer() {
        let signing_bundle = root_signing_bundle(PathLength::Unconstrained);
        assert_eq!(
            signing_bundle.certificate.subject_name().to_der().unwrap(),
            signing_bundle.certificate.issuer_name().to_der().unwrap()
        );
    }

    #[test]
    fn issue_leaf_under_root_succeeds() {
        let signing_bundle = root_signing_bundle(PathLength::Unconstrained);
        let storage = MemoryStorage::new();
        let request = request(&storage);
        let result = issue(
            &role(),
            &signing_bundle,
            &request,
            &IssuanceData {
                common_name: "svc.internal".to_string(),
                ttl: "1h".to_string(),
                ..IssuanceData::default()
            },
            false,
        )
        .unwrap();
        assert_eq!(
            result.certificate.issuer_name().to_der().unwrap(),
            signing_bundle.certificate.subject_name().to_der().unwrap()
        );
    }

    #[test]
    fn zero_path_length_refuses_further_ca() {
        let signing_bundle = root_signing_bundle(PathLength::Limited(0));
        let storage = MemoryStorage::new();
        let request = request(&storage);
        let err = issue(
            &role(),
            &signing_bundle,
            &request,
            &IssuanceData {
                common_name: "intermediate.internal".to_string(),
                ttl: "1h".to_string(),
                ..IssuanceData::default()
            },
            true,
        )
        .unwrap_err();
        assert!(err.is_user());

        let leaf = issue(
            &role(),
            &signing_bundle,
            &request,
            &IssuanceData {
                common_name: "leaf.internal".to_string(),
                ttl: "1h".to_string(),
                ..IssuanceData::default()
            },
            false,
        );
        assert!(leaf.is_ok());
    }

    #[test]
    fn generate_intermediate_csr_round_trips() {
        let storage = MemoryStorage::new();
        let request = request(&storage);
        let bundle = generate_intermediate_csr(
            &role(),
            &request,
            &IssuanceData {
                common_name: "Test Intermediate".to_string(),
                ttl: "8760h".to_string(),
                ..IssuanceData::default()
            },
        )
        .unwrap();
        assert!(X509Req::from_der(&bundle.csr_der).is_ok());
    }
}
