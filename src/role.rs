// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! The declarative, read-only role policy and the small value types it is
//! built from.

/// The key algorithm a role (or a signing bundle) uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    Ec,
}

/// The tri-state "path length" value from BasicConstraints: absent
/// (unconstrained), or a concrete, possibly-zero limit.
///
/// Modeled as a tagged variant rather than a nullable integer so that "zero"
/// and "unset" can never be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLength {
    Unconstrained,
    Limited(u32),
}

impl PathLength {
    /// The path length an issued intermediate inherits when a role leaves
    /// `max_path_length` unset: unconstrained stays unconstrained, a limit
    /// of zero stays zero (and blocks further CA issuance), anything else
    /// decrements by one.
    pub fn decrement(self) -> PathLength {
        match self {
            PathLength::Unconstrained => PathLength::Unconstrained,
            PathLength::Limited(0) => PathLength::Limited(0),
            PathLength::Limited(n) => PathLength::Limited(n - 1),
        }
    }

    pub fn is_zero(self) -> bool {
        matches!(self, PathLength::Limited(0))
    }
}

/// The OR-ed set of extended key usages a role grants. A plain struct of
/// `bool`s rather than a bitflags dependency or a class hierarchy: four
/// flags don't justify either.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageFlags {
    pub server: bool,
    pub client: bool,
    pub code_signing: bool,
    pub email_protection: bool,
}

impl UsageFlags {
    pub fn is_empty(&self) -> bool {
        !(self.server || self.client || self.code_signing || self.email_protection)
    }
}

/// The declarative per-role name-admission and issuance policy. Read-only
/// for the duration of a single issuance call.
#[derive(Debug, Clone)]
pub struct RolePolicy {
    pub allow_localhost: bool,
    pub allow_base_domain: bool,
    pub allowed_base_domain: String,
    pub allow_token_display_name: bool,
    pub allow_subdomains: bool,
    pub allow_any_name: bool,
    pub enforce_hostnames: bool,
    pub allow_ip_sans: bool,

    pub server_flag: bool,
    pub client_flag: bool,
    pub code_signing_flag: bool,
    pub email_protection_flag: bool,

    pub use_csr_common_name: bool,

    pub key_type: KeyType,
    pub key_bits: u32,

    /// Empty means "inherit `SystemDefaults::default_lease_ttl`".
    pub ttl: String,
    /// Empty means "inherit `SystemDefaults::default_max_lease_ttl`".
    pub max_ttl: String,

    /// `None` means "derive from the signing CA (or unconstrained, for a
    /// self-signed root)"; `Some(_)` is an explicit role override.
    pub max_path_length: Option<PathLength>,
}

impl Default for RolePolicy {
    fn default() -> Self {
        RolePolicy {
            allow_localhost: false,
            allow_base_domain: false,
            allowed_base_domain: String::new(),
            allow_token_display_name: false,
            allow_subdomains: false,
            allow_any_name: false,
            enforce_hostnames: true,
            allow_ip_sans: true,
            server_flag: true,
            client_flag: false,
            code_signing_flag: false,
            email_protection_flag: false,
            use_csr_common_name: true,
            key_type: KeyType::Rsa,
            key_bits: 2048,
            ttl: String::new(),
            max_ttl: String::new(),
            max_path_length: None,
        }
    }
}

impl RolePolicy {
    pub fn usage_flags(&self) -> UsageFlags {
        UsageFlags {
            server: self.server_flag,
            client: self.client_flag,
            code_signing: self.code_signing_flag,
            email_protection: self.email_protection_flag,
        }
    }
}
