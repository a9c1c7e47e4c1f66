// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! Key generation and the random serial number every issued certificate
//! carries.

use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;

use crate::error::{IssuanceError, IssuanceResult};
use crate::role::KeyType;

const VALID_RSA_BITS: [u32; 4] = [1024, 2048, 4096, 8192];
const VALID_EC_BITS: [u32; 4] = [224, 256, 384, 521];

/// Generates a keypair for `key_type`/`key_bits`. Rejects any combination
/// outside the supported matrix before doing any cryptographic work.
pub fn generate_key(key_type: KeyType, key_bits: u32) -> IssuanceResult<PKey<Private>> {
    match key_type {
        KeyType::Rsa => {
            if !VALID_RSA_BITS.contains(&key_bits) {
                return Err(IssuanceError::user(format!(
                    "{key_bits} is not a supported RSA key length; must be one of {VALID_RSA_BITS:?}"
                )));
            }
            let rsa = Rsa::generate(key_bits)?;
            Ok(PKey::from_rsa(rsa)?)
        }
        KeyType::Ec => {
            let nid = match key_bits {
                224 => Nid::SECP224R1,
                256 => Nid::X9_62_PRIME256V1,
                384 => Nid::SECP384R1,
                521 => Nid::SECP521R1,
                _ => {
                    return Err(IssuanceError::user(format!(
                        "{key_bits} is not a supported EC curve size; must be one of {VALID_EC_BITS:?}"
                    )))
                }
            };
            let group = EcGroup::from_curve_name(nid)?;
            let ec_key = EcKey::generate(&group)?;
            Ok(PKey::from_ec_key(ec_key)?)
        }
    }
}

/// A cryptographically random, positive 128-bit serial number.
///
/// OpenSSL's RNG is the crate's entropy source throughout; exhaustion
/// surfaces as [`IssuanceError::Internal`] via the `ErrorStack` conversion.
pub fn random_serial() -> IssuanceResult<BigNum> {
    let mut serial = BigNum::new()?;
    // 128 bits, MSB cleared by `msb_off` so the value can never be
    // interpreted as negative once DER-encoded as an INTEGER.
    serial.rand(128, openssl::bn::MsbOption::MAYBE_ZERO, false)?;
    if serial.is_zero() {
        // Astronomically unlikely; re-roll rather than issue a zero serial.
        serial.rand(128, openssl::bn::MsbOption::ONE, false)?;
    }
    Ok(serial)
}

/// SHA-1 over the DER-encoded `SubjectPublicKeyInfo` of `key`, the value
/// OpenSSL's `SubjectKeyIdentifier` extension builder computes
/// automatically from the certificate/request being built; exposed here
/// only for tests that want to check the invariant directly.
pub fn subject_key_identifier(key: &PKey<Private>) -> IssuanceResult<Vec<u8>> {
    let public_der = key.public_key_to_der()?;
    let mut hasher = openssl::hash::Hasher::new(openssl::hash::MessageDigest::sha1())?;
    hasher.update(&public_der)?;
    Ok(hasher.finish()?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn rejects_unsupported_rsa_bits() {
        assert!(generate_key(KeyType::Rsa, 512).is_err());
    }

    #[test]
    fn rejects_unsupported_ec_bits() {
        assert!(generate_key(KeyType::Ec, 192).is_err());
    }

    #[test]
    fn generates_ec_p256() {
        let key = generate_key(KeyType::Ec, 256).unwrap();
        assert_eq!(key.id(), openssl::pkey::Id::EC);
    }

    #[test]
    fn serials_are_distinct_and_nonzero() {
        let mut seen = HashSet::new();
        for _ in 0..256 {
            let serial = random_serial().unwrap();
            assert!(!serial.is_zero());
            assert!(seen.insert(serial.to_hex_str().unwrap().to_string()));
        }
    }
}
