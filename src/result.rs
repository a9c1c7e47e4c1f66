// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! The output of a successful issuance: DER and parsed forms of the issued
//! certificate and the CA that issued it, plus the generated private key
//! when one was created.

use openssl::pkey::{PKey, Private};
use openssl::x509::{X509, X509Req};

use crate::error::IssuanceResult;

/// Result of `issue` / `sign` / `generate_self_signed`.
pub struct ResultBundle {
    pub certificate_der: Vec<u8>,
    pub certificate: X509,
    pub issuing_ca_der: Vec<u8>,
    pub issuing_ca: X509,
    /// `Some` only when this core generated the key (the `issue` and
    /// self-signed-root paths); `None` when signing an externally supplied
    /// CSR, since the private key never leaves the requester.
    pub private_key: Option<PKey<Private>>,
}

impl ResultBundle {
    pub fn certificate_pem(&self) -> IssuanceResult<Vec<u8>> {
        Ok(self.certificate.to_pem()?)
    }

    pub fn issuing_ca_pem(&self) -> IssuanceResult<Vec<u8>> {
        Ok(self.issuing_ca.to_pem()?)
    }

    pub fn private_key_pem(&self) -> IssuanceResult<Option<Vec<u8>>> {
        self.private_key
            .as_ref()
            .map(|key| Ok(key.private_key_to_pem_pkcs8()?))
            .transpose()
    }
}

/// Result of `generate_intermediate_csr`.
pub struct CsrResultBundle {
    pub csr_der: Vec<u8>,
    pub csr: X509Req,
    pub private_key: PKey<Private>,
}

impl CsrResultBundle {
    pub fn csr_pem(&self) -> IssuanceResult<Vec<u8>> {
        Ok(self.csr.to_pem()?)
    }

    pub fn private_key_pem(&self) -> IssuanceResult<Vec<u8>> {
        Ok(self.private_key.private_key_to_pem_pkcs8()?)
    }
}
