// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! The certificate-issuance core of a PKI secrets backend.
//!
//! Accepts issuance requests (generate a key and issue, or sign a supplied
//! CSR), validates them against a declarative [`role::RolePolicy`],
//! constructs an X.509 template, and produces a signed certificate or CSR.
//! The HTTP/secret-backend request router, on-disk persistence of issued
//! certificates, CRL generation, and lease management live outside this
//! crate; it is handed a [`request::RequestContext`] and a
//! [`ca_store::SigningBundle`] and returns a [`result::ResultBundle`].

pub mod bundle;
pub mod ca_store;
pub mod config;
pub mod duration;
pub mod error;
pub mod names;
pub mod request;
pub mod result;
pub mod role;
pub mod urls;
pub mod x509;

pub use ca_store::{fetch_ca_info, SigningBundle};
pub use error::{IssuanceError, IssuanceResult};
pub use request::{IssuanceData, OutputFormat, RequestContext, Storage};
pub use result::{CsrResultBundle, ResultBundle};
pub use role::RolePolicy;

/// Generates a keypair and issues a leaf or intermediate certificate under
/// `signing_bundle`. See [`x509::sign::issue`].
pub fn issue(
    role: &RolePolicy,
    signing_bundle: &SigningBundle,
    request: &RequestContext<'_>,
    data: &IssuanceData,
    is_ca: bool,
) -> IssuanceResult<ResultBundle> {
    x509::sign::issue(role, signing_bundle, request, data, is_ca)
}

/// Verifies and signs a supplied CSR under `signing_bundle`. See
/// [`x509::sign::sign_csr`].
pub fn sign(
    role: &RolePolicy,
    signing_bundle: &SigningBundle,
    request: &RequestContext<'_>,
    data: &IssuanceData,
    is_ca: bool,
    use_csr_values: bool,
) -> IssuanceResult<ResultBundle> {
    x509::sign::sign_csr(role, signing_bundle, request, data, is_ca, use_csr_values)
}

/// Generates a keypair and a self-signed root certificate. See
/// [`x509::sign::generate_self_signed`].
pub fn generate_root(role: &RolePolicy, request: &RequestContext<'_>, data: &IssuanceData) -> IssuanceResult<ResultBundle> {
    x509::sign::generate_self_signed(role, request, data)
}

/// Generates a keypair and a PKCS#10 CSR requesting an intermediate CA. See
/// [`x509::sign::generate_intermediate_csr`].
pub fn generate_intermediate_csr(
    role: &RolePolicy,
    request: &RequestContext<'_>,
    data: &IssuanceData,
) -> IssuanceResult<CsrResultBundle> {
    x509::sign::generate_intermediate_csr(role, request, data)
}
