// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! The inputs an external caller (the secret-backend router) supplies: the
//! storage collaborator, the request-scoped display name, and the raw
//! issuance fields.

use crate::config::SystemDefaults;
use crate::error::IssuanceResult;
use crate::urls::UrlEntries;

/// The storage collaborator this core reads the CA bundle and URL entries
/// from. A trait rather than a concrete client so the core stays
/// decoupled from any one backend and is unit-testable with an in-memory
/// fake; synchronous by design (see the concurrency notes on why this core
/// does not assume an async runtime).
pub trait Storage {
    fn get(&self, key: &str) -> IssuanceResult<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> IssuanceResult<()>;
}

/// Requested output encoding for the issued certificate/key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Unspecified,
    Pem,
    Der,
}

/// Raw issuance fields, as supplied by the request before any role-driven
/// validation is applied.
#[derive(Debug, Clone, Default)]
pub struct IssuanceData {
    pub common_name: String,
    /// Comma-separated list of DNS names and/or email addresses.
    pub alt_names: String,
    /// Comma-separated list of IPv4/IPv6 literals.
    pub ip_sans: String,
    /// Duration string; empty means "use the role/system default".
    pub ttl: String,
    /// PEM-encoded PKCS#10 CSR; only meaningful for the `sign` operation.
    pub csr: Option<String>,
    pub format: OutputFormat,
}

/// Everything about the caller's request that isn't already captured by the
/// role or the issuance data: the token's display name (used for
/// display-name-scoped name admission) and the system-wide TTL fallbacks.
pub struct RequestContext<'a> {
    pub display_name: String,
    pub storage: &'a dyn Storage,
    pub defaults: SystemDefaults,
}

impl<'a> RequestContext<'a> {
    pub fn new(display_name: impl Into<String>, storage: &'a dyn Storage) -> Self {
        RequestContext {
            display_name: display_name.into(),
            storage,
            defaults: SystemDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: SystemDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Fetches the URL entries a freshly self-signed root should publish on
    /// itself. Absent entries are not an error; they decode to the empty
    /// record.
    pub fn fetch_url_entries(&self) -> IssuanceResult<UrlEntries> {
        match self.storage.get(crate::ca_store::URLS_KEY)? {
            Some(data) => UrlEntries::decode(&data),
            None => Ok(UrlEntries::default()),
        }
    }
}
