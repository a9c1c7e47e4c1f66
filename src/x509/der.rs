// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! A minimal DER TLV reader, used for exactly one job OpenSSL's safe
//! binding doesn't expose: reading the `pathLenConstraint` a *previously
//! issued* CA certificate carries in its own `BasicConstraints` extension,
//! so that an intermediate issued under it can decrement it (§4.3 step 8).
//!
//! `openssl::x509::extension::BasicConstraints` can *write* this extension
//! (used throughout `x509::template`) but `X509Ref` has no matching getter.
//! Rather than pull in a full ASN.1 certificate grammar for one field, this
//! walks the handful of TLVs between `TBSCertificate` and the extension we
//! want, generically, the same way `RawTlv`-style helpers do elsewhere in
//! this ecosystem.

use crate::error::{IssuanceError, IssuanceResult};
use crate::role::PathLength;

const SEQUENCE: u8 = 0x30;
const OID: u8 = 0x06;
const BOOLEAN: u8 = 0x01;
const INTEGER: u8 = 0x02;
const OCTET_STRING: u8 = 0x04;
const EXTENSIONS_CONTEXT_TAG: u8 = 0xa3;

/// DER encoding of the BasicConstraints OID, 2.5.29.19.
const BASIC_CONSTRAINTS_OID: [u8; 3] = [0x55, 0x1d, 0x13];

struct Tlv<'a> {
    tag: u8,
    content: &'a [u8],
}

fn read_tlv(data: &[u8]) -> Option<(Tlv<'_>, &[u8])> {
    let (&tag, rest) = data.split_first()?;
    let (len, rest) = read_length(rest)?;
    if rest.len() < len {
        return None;
    }
    let (content, remainder) = rest.split_at(len);
    Some((Tlv { tag, content }, remainder))
}

fn read_length(data: &[u8]) -> Option<(usize, &[u8])> {
    let (&first, rest) = data.split_first()?;
    if first & 0x80 == 0 {
        return Some((first as usize, rest));
    }
    let n = (first & 0x7f) as usize;
    if n == 0 || n > std::mem::size_of::<usize>() || rest.len() < n {
        return None;
    }
    let mut len = 0usize;
    for &b in &rest[..n] {
        len = (len << 8) | b as usize;
    }
    Some((len, &rest[n..]))
}

fn iter_tlvs(mut data: &[u8]) -> impl Iterator<Item = Tlv<'_>> {
    std::iter::from_fn(move || {
        let (tlv, rest) = read_tlv(data)?;
        data = rest;
        Some(tlv)
    })
}

fn expect_sequence(data: &[u8]) -> Option<&[u8]> {
    let (tlv, _) = read_tlv(data)?;
    (tlv.tag == SEQUENCE).then_some(tlv.content)
}

fn decode_uint(bytes: &[u8]) -> u32 {
    let mut v: u64 = 0;
    for &b in bytes.iter().take(8) {
        v = (v << 8) | b as u64;
    }
    v.try_into().unwrap_or(u32::MAX)
}

/// Returns `(is_ca, path_length)` as carried by `cert_der`'s
/// `BasicConstraints` extension, or `(false, Unconstrained)` if the
/// extension (or the `pathLenConstraint` field within it) is absent.
pub fn basic_constraints(cert_der: &[u8]) -> IssuanceResult<(bool, PathLength)> {
    let malformed = || IssuanceError::internal("stored CA certificate has malformed DER");

    let cert_content = expect_sequence(cert_der).ok_or_else(malformed)?;
    let tbs = iter_tlvs(cert_content).next().ok_or_else(malformed)?;
    if tbs.tag != SEQUENCE {
        return Err(malformed());
    }

    let extensions_content = iter_tlvs(tbs.content)
        .find(|tlv| tlv.tag == EXTENSIONS_CONTEXT_TAG)
        .map(|tlv| tlv.content);
    let Some(extensions_content) = extensions_content else {
        return Ok((false, PathLength::Unconstrained));
    };
    let extensions_seq = expect_sequence(extensions_content).ok_or_else(malformed)?;

    for extension in iter_tlvs(extensions_seq) {
        if extension.tag != SEQUENCE {
            continue;
        }
        let mut fields = iter_tlvs(extension.content);
        let Some(oid) = fields.next() else { continue };
        if oid.tag != OID || oid.content != BASIC_CONSTRAINTS_OID {
            continue;
        }

        let mut next = fields.next();
        if matches!(&next, Some(t) if t.tag == BOOLEAN) {
            next = fields.next(); // skip the optional `critical` field
        }
        let Some(octet) = next.filter(|t| t.tag == OCTET_STRING) else {
            continue;
        };

        let bc_content = expect_sequence(octet.content).ok_or_else(malformed)?;
        let mut bc_fields = iter_tlvs(bc_content);

        let mut is_ca = false;
        let mut path_length = PathLength::Unconstrained;

        if let Some(first) = bc_fields.next() {
            if first.tag == BOOLEAN {
                is_ca = first.content.first().copied().unwrap_or(0) != 0;
                if let Some(second) = bc_fields.next() {
                    if second.tag == INTEGER {
                        path_length = PathLength::Limited(decode_uint(second.content));
                    }
                }
            } else if first.tag == INTEGER {
                path_length = PathLength::Limited(decode_uint(first.content));
            }
        }

        return Ok((is_ca, path_length));
    }

    Ok((false, PathLength::Unconstrained))
}

/// Whether `der` contains the DER encoding of the BasicConstraints OID
/// anywhere in its bytes. Used to guard CSR pass-through signing (§4.5):
/// rather than parse the CSR's `extensionRequest` attribute framing just to
/// answer "is BasicConstraints present", a raw scan for the 5-byte OID TLV
/// is sufficient — a coincidental match within unrelated CSR content is not
/// realistically possible.
pub fn contains_basic_constraints_oid(der: &[u8]) -> bool {
    let needle = [OID, 0x03, BASIC_CONSTRAINTS_OID[0], BASIC_CONSTRAINTS_OID[1], BASIC_CONSTRAINTS_OID[2]];
    der.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn der_len(len: usize) -> Vec<u8> {
        assert!(len < 128);
        vec![len as u8]
    }

    fn wrap(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend(der_len(content.len()));
        out.extend_from_slice(content);
        out
    }

    /// Builds a minimal (invalid-as-a-cert, but structurally faithful)
    /// TBSCertificate-shaped blob with only an extensions field, enough to
    /// exercise the walker above without a real keypair.
    fn fake_cert_with_basic_constraints(bc_content: &[u8]) -> Vec<u8> {
        let basic_constraints_value = wrap(SEQUENCE, bc_content);
        let extension = wrap(
            SEQUENCE,
            &[wrap(OID, &BASIC_CONSTRAINTS_OID), wrap(OCTET_STRING, &basic_constraints_value)].concat(),
        );
        let extensions_seq = wrap(SEQUENCE, &extension);
        let extensions_field = wrap(EXTENSIONS_CONTEXT_TAG, &extensions_seq);
        // A couple of filler TLVs standing in for version/serial/etc.
        let filler = wrap(INTEGER, &[0x01]);
        let tbs = wrap(SEQUENCE, &[filler.clone(), filler, extensions_field].concat());
        wrap(SEQUENCE, &tbs)
    }

    #[test]
    fn reads_unconstrained_when_no_pathlen() {
        let ca_true = wrap(BOOLEAN, &[0xff]);
        let cert = fake_cert_with_basic_constraints(&ca_true);
        let (is_ca, path_length) = basic_constraints(&cert).unwrap();
        assert!(is_ca);
        assert_eq!(path_length, PathLength::Unconstrained);
    }

    #[test]
    fn reads_explicit_zero_pathlen() {
        let ca_true = wrap(BOOLEAN, &[0xff]);
        let pathlen_zero = wrap(INTEGER, &[0x00]);
        let cert = fake_cert_with_basic_constraints(&[ca_true, pathlen_zero].concat());
        let (is_ca, path_length) = basic_constraints(&cert).unwrap();
        assert!(is_ca);
        assert_eq!(path_length, PathLength::Limited(0));
    }

    #[test]
    fn reads_positive_pathlen() {
        let ca_true = wrap(BOOLEAN, &[0xff]);
        let pathlen = wrap(INTEGER, &[0x02]);
        let cert = fake_cert_with_basic_constraints(&[ca_true, pathlen].concat());
        let (_, path_length) = basic_constraints(&cert).unwrap();
        assert_eq!(path_length, PathLength::Limited(2));
    }

    #[test]
    fn missing_extensions_is_unconstrained_non_ca() {
        let cert = wrap(SEQUENCE, &wrap(SEQUENCE, &wrap(INTEGER, &[0x01])));
        let (is_ca, path_length) = basic_constraints(&cert).unwrap();
        assert!(!is_ca);
        assert_eq!(path_length, PathLength::Unconstrained);
    }

    #[test]
    fn detects_basic_constraints_oid_anywhere() {
        let blob = wrap(OID, &BASIC_CONSTRAINTS_OID);
        assert!(contains_basic_constraints_oid(&blob));
        assert!(!contains_basic_constraints_oid(&wrap(OID, &[0x55, 0x1d, 0x0e])));
    }
}
