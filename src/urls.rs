// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! The URL-entries record: issuing-certificate URLs, CRL distribution
//! points, and OCSP servers published on issued certificates.

use crate::error::{IssuanceError, IssuanceResult};

/// Absence of any category is represented as an empty `Vec`, never as a
/// missing field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlEntries {
    pub issuing_certificates: Vec<String>,
    pub crl_distribution_points: Vec<String>,
    pub ocsp_servers: Vec<String>,
}

impl UrlEntries {
    pub fn is_empty(&self) -> bool {
        self.issuing_certificates.is_empty()
            && self.crl_distribution_points.is_empty()
            && self.ocsp_servers.is_empty()
    }

    /// Serializes to the on-disk line-oriented record this core reads back
    /// with [`UrlEntries::decode`]. One `key=comma,separated,values` line per
    /// category; a category with no entries still gets a (blank) line so the
    /// format round-trips unambiguously.
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "issuing_certificates={}\ncrl_distribution_points={}\nocsp_servers={}\n",
            self.issuing_certificates.join(","),
            self.crl_distribution_points.join(","),
            self.ocsp_servers.join(","),
        )
        .into_bytes()
    }

    pub fn decode(data: &[u8]) -> IssuanceResult<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|e| IssuanceError::internal(format!("url entries record is not utf-8: {e}")))?;

        let mut entries = UrlEntries::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(IssuanceError::internal(format!(
                    "malformed url entries line: {line:?}"
                )));
            };
            let values = split_list(value);
            match key {
                "issuing_certificates" => entries.issuing_certificates = values,
                "crl_distribution_points" => entries.crl_distribution_points = values,
                "ocsp_servers" => entries.ocsp_servers = values,
                other => {
                    return Err(IssuanceError::internal(format!(
                        "unknown url entries field: {other:?}"
                    )))
                }
            }
        }
        Ok(entries)
    }
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
    fn round_trips_through_encode_decode() {
        let entries = UrlEntries {
            issuing_certificates: vec!["https://example.com/ca.crt".to_string()],
            crl_distribution_points: vec!["https://example.com/ca.crl".to_string()],
            ocsp_servers: vec![],
        };
        let decoded = UrlEntries::decode(&entries.encode()).unwrap();
        assert_eq!(entries, decoded);
    }

    #[test]
    fn missing_categories_decode_to_empty() {
        let decoded = UrlEntries::decode(b"issuing_certificates=\n").unwrap();
        assert!(decoded.is_empty());
    }
}
