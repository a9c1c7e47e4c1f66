// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! The Creation-Bundle Builder: merges user input, role defaults, optional
//! CSR-derived values, TTL bounds, and (for non-root issuance) the signing
//! bundle into a single immutable issuance descriptor.

use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use openssl::asn1::Asn1Time;
use openssl::nid::Nid;
use openssl::x509::X509Req;

use crate::ca_store::SigningBundle;
use crate::duration::parse_duration;
use crate::error::{IssuanceError, IssuanceResult};
use crate::names;
use crate::request::{IssuanceData, RequestContext};
use crate::role::{PathLength, RolePolicy, UsageFlags};
use crate::urls::UrlEntries;

/// The immutable issuance descriptor the Key & Template Constructor builds
/// a certificate (or CSR) template from.
pub struct CreationBundle<'a> {
    pub common_name: String,
    pub dns_names: Vec<String>,
    pub email_addresses: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub is_ca: bool,
    pub ttl: Duration,
    pub usage: UsageFlags,
    pub signing_bundle: Option<&'a SigningBundle>,
    pub use_csr_values: bool,
    pub urls: UrlEntries,
    pub max_path_length: PathLength,
}

/// Builds a [`CreationBundle`] from `role`, the (optional) `signing_bundle`
/// anchoring non-root issuance, an (optional) already-parsed `csr`, the
/// request context, and the raw issuance `data`.
///
/// `is_ca` and `use_csr_values` are caller intent, not derived from the
/// other inputs: the three `x509::sign` entry points set them according to
/// which operation (issue / sign / self-signed root / intermediate CSR)
/// they implement.
#[allow(clippy::too_many_arguments)]
pub fn build<'a>(
    role: &RolePolicy,
    signing_bundle: Option<&'a SigningBundle>,
    csr: Option<&X509Req>,
    request: &RequestContext<'_>,
    data: &IssuanceData,
    is_ca: bool,
    use_csr_values: bool,
) -> IssuanceResult<CreationBundle<'a>> {
    // Step 1: common name.
    let common_name = if let (Some(csr), true) = (csr, role.use_csr_common_name) {
        csr_common_name(csr)?
    } else {
        data.common_name.clone()
    };
    if common_name.is_empty() {
        return Err(IssuanceError::user("common name must be set"));
    }

    // Step 2: SAN classification.
    let mut dns_names = Vec::new();
    let mut email_addresses = Vec::new();
    if common_name.contains('@') {
        email_addresses.push(common_name.clone());
    } else {
        dns_names.push(common_name.clone());
    }
    for raw in split_list(&data.alt_names) {
        if raw.contains('@') {
            // The common name is appended here, not the parsed alt_names
            // element. Likely a bug, but not ours to silently fix.
            email_addresses.push(common_name.clone());
        } else {
            dns_names.push(raw);
        }
    }

    // Step 3: IP SANs.
    let ip_sans = split_list(&data.ip_sans);
    if !ip_sans.is_empty() && !role.allow_ip_sans {
        return Err(IssuanceError::user(
            "IP Subject Alternative Names are not allowed in this role",
        ));
    }
    let mut ip_addresses = Vec::with_capacity(ip_sans.len());
    for raw in &ip_sans {
        let ip: IpAddr = raw
            .parse()
            .map_err(|_| IssuanceError::user(format!("{raw} is not a valid IP SAN")))?;
        ip_addresses.push(ip);
    }

    // Step 4: TTL resolution.
    let (mut ttl, user_supplied_ttl) = if !data.ttl.is_empty() {
        (parse_duration(&data.ttl)?, true)
    } else if !role.ttl.is_empty() {
        (parse_duration(&role.ttl)?, false)
    } else {
        (request.defaults.default_lease_ttl, false)
    };
    let max_ttl = if !role.max_ttl.is_empty() {
        parse_duration(&role.max_ttl)?
    } else {
        request.defaults.default_max_lease_ttl
    };
    if ttl > max_ttl {
        if user_supplied_ttl {
            return Err(IssuanceError::user(format!(
                "requested TTL {ttl:?} is greater than the role's max TTL {max_ttl:?}"
            )));
        }
        ttl = max_ttl;
    }

    // Step 5: CA expiry guard.
    if let Some(signing_bundle) = signing_bundle {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let not_after_unix = (now + ttl).as_secs() as i64;
        let not_after = Asn1Time::from_unix(not_after_unix)?;
        if signing_bundle.exceeds_expiry(&not_after)? {
            return Err(IssuanceError::user(
                "cannot satisfy request's TTL, as it is after the issuing CA's own expiration",
            ));
        }
    }

    // Step 6: name admission, DNS then email, against the same role.
    names::validate_names(&request.display_name, &dns_names, role)?;
    names::validate_names(&request.display_name, &email_addresses, role)?;

    // Step 7: usage mask.
    let usage = role.usage_flags();

    // Step 8: path length.
    let max_path_length = match signing_bundle {
        None => role.max_path_length.unwrap_or(PathLength::Unconstrained),
        Some(signing_bundle) => role
            .max_path_length
            .unwrap_or_else(|| signing_bundle.path_length.decrement()),
    };

    // Step 9: URL entries.
    let urls = match signing_bundle {
        None => request.fetch_url_entries()?,
        Some(signing_bundle) => signing_bundle.urls.clone(),
    };

    Ok(CreationBundle {
        common_name,
        dns_names,
        email_addresses,
        ip_addresses,
        is_ca,
        ttl,
        usage,
        signing_bundle,
        use_csr_values,
        urls,
        max_path_length,
    })
}

fn csr_common_name(csr: &X509Req) -> IssuanceResult<String> {
    let subject = csr.subject_name();
    let entry = subject
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .ok_or_else(|| IssuanceError::user("CSR has no common name"))?;
    entry
        .data()
        .as_utf8()
        .map(|s| s.to_string())
        .map_err(|e| IssuanceError::user(format!("CSR common name is not valid UTF-8: {e}")))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(
            split_list(" a.example.com , ,b.example.com"),
            vec!["a.example.com".to_string(), "b.example.com".to_string()]
        );
        assert_eq!(split_list(""), Vec::<String>::new());
    }
}
