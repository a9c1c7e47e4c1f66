// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

//! Role-driven name admission for DNS, email, and wildcard subjects.
//!
//! Evaluates a list of requested subject names against a role policy and
//! reports the first rejected name, or admits all of them. IP SANs are
//! validated separately by [`crate::bundle`], which only needs to know
//! whether the role allows them at all.

use crate::error::{IssuanceError, IssuanceResult};
use crate::role::RolePolicy;

/// `label (. label)*` with LDH rules: each label is one or more
/// `[A-Za-z0-9]` characters, optionally containing interior hyphens, but
/// never starting or ending with one. The empty string never matches.
pub fn is_valid_hostname(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    name.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    if bytes.is_empty() {
        return false;
    }
    if bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
        return false;
    }
    bytes.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'-')
}

/// Validates every name in `names` against `role`, in order, stopping at
/// the first rejection. The empty slice admits trivially.
pub fn validate_names(display_name: &str, names: &[String], role: &RolePolicy) -> IssuanceResult<()> {
    for name in names {
        if !is_admitted(display_name, name, role) {
            return Err(IssuanceError::user(format!(
                "{name} is not an allowed name for this role, or the role's allowed domains \
                 does not allow the given common/alt name"
            )));
        }
    }
    Ok(())
}

fn is_admitted(display_name: &str, name: &str, role: &RolePolicy) -> bool {
    let is_email = name.contains('@');

    // Preprocessing step 1/2: determine the sanitized form (the email
    // domain, or the name itself).
    let sanitized_base = if is_email {
        // Early rejection, ahead of any allow-list: an email without the
        // right flags is rejected before admission rules are consulted.
        if !role.email_protection_flag && !role.allow_any_name {
            return false;
        }
        let parts: Vec<&str> = name.split('@').collect();
        if parts.len() != 2 || parts[1].is_empty() {
            return false;
        }
        parts[1].to_string()
    } else {
        name.to_string()
    };

    // Preprocessing step 3: strip a leading wildcard label.
    let (is_wildcard, sanitized) = match sanitized_base.strip_prefix("*.") {
        Some(rest) => (true, rest.to_string()),
        None => (false, sanitized_base),
    };

    if role.enforce_hostnames && !is_valid_hostname(&sanitized) {
        return false;
    }

    if role.allow_any_name {
        return true;
    }

    // Exact-equality rules compare against the original name (or, for
    // email, the domain part) rather than the wildcard-stripped sanitized
    // form.
    let exact_cmp: &str = if is_email { sanitized.as_str() } else { name };

    if role.allow_localhost && exact_cmp == "localhost" {
        return true;
    }

    if role.allow_localhost
        && role.allow_subdomains
        && (is_direct_subdomain(&sanitized, display_name)
            || (is_wildcard && sanitized == role.allowed_base_domain))
    {
        return true;
    }

    if role.allow_token_display_name {
        if exact_cmp == display_name {
            return true;
        }
        if role.allow_subdomains && is_direct_subdomain(&sanitized, display_name) {
            return true;
        }
    }

    if !role.allowed_base_domain.is_empty() {
        if role.allow_base_domain && exact_cmp == role.allowed_base_domain {
            return true;
        }
        if role.allow_subdomains
            && (is_subdomain_with_valid_prefix(&sanitized, &role.allowed_base_domain)
                || (is_wildcard && sanitized == role.allowed_base_domain))
        {
            return true;
        }
    }

    false
}

/// `sanitized == "<nonempty-label>.<base>"`, without requiring the prefix
/// itself to be a valid hostname label (used for the display-name rules,
/// which are not qualified with a grammar check).
fn is_direct_subdomain(sanitized: &str, base: &str) -> bool {
    if base.is_empty() {
        return false;
    }
    let suffix = format!(".{base}");
    sanitized
        .strip_suffix(suffix.as_str())
        .map(|prefix| !prefix.is_empty())
        .unwrap_or(false)
}

/// As [`is_direct_subdomain`], but additionally requires the stripped
/// prefix to itself satisfy the hostname grammar (used for
/// `allowed_base_domain`, which is explicitly qualified this way).
fn is_subdomain_with_valid_prefix(sanitized: &str, base: &str) -> bool {
    if base.is_empty() {
        return false;
    }
    let suffix = format!(".{base}");
    match sanitized.strip_suffix(suffix.as_str()) {
        Some(prefix) => !prefix.is_empty() && is_valid_hostname(prefix),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::RolePolicy;

    fn role(f: impl FnOnce(&mut RolePolicy)) -> RolePolicy {
        let mut role = RolePolicy {
            enforce_hostnames: false,
            allow_ip_sans: true,
            ..RolePolicy::default()
        };
        role.allow_localhost = false;
        role.allow_base_domain = false;
        role.allow_subdomains = false;
        role.allow_any_name = false;
        role.allow_token_display_name = false;
        f(&mut role);
        role
    }

    #[test]
    fn empty_list_admits_trivially() {
        let role = role(|_| {});
        assert!(validate_names("token", &[], &role).is_ok());
    }

    #[test]
    fn allow_any_name_admits_everything() {
        let role = role(|r| r.allow_any_name = true);
        assert!(validate_names("token", &["anything.at.all".to_string()], &role).is_ok());
    }

    #[test]
    fn wildcard_admission_requires_base_domain_and_allow_flag() {
        let role = role(|r| {
            r.allowed_base_domain = "example.com".to_string();
            r.allow_subdomains = true;
            r.enforce_hostnames = true;
        });
        assert!(validate_names("token", &["*.example.com".to_string()], &role).is_ok());
        let err = validate_names("token", &["*.*.example.com".to_string()], &role).unwrap_err();
        assert!(format!("{err}").contains("*.*.example.com"));
    }

    #[test]
    fn subdomain_of_base_domain_is_admitted() {
        let role = role(|r| {
            r.allowed_base_domain = "example.com".to_string();
            r.allow_subdomains = true;
        });
        assert!(validate_names("token", &["www.example.com".to_string()], &role).is_ok());
        assert!(validate_names("token", &["a.b.example.com".to_string()], &role).is_ok());
        assert!(validate_names("token", &["evil.com".to_string()], &role).is_err());
    }

    #[test]
    fn base_domain_itself_requires_allow_base_domain() {
        let mut role = role(|r| r.allowed_base_domain = "example.com".to_string());
        assert!(validate_names("token", &["example.com".to_string()], &role).is_err());
        role.allow_base_domain = true;
        assert!(validate_names("token", &["example.com".to_string()], &role).is_ok());
    }

    #[test]
    fn email_requires_email_protection_or_any_name() {
        let role = role(|r| {
            r.allowed_base_domain = "example.com".to_string();
            r.allow_base_domain = true;
        });
        assert!(validate_names("token", &["user@example.com".to_string()], &role).is_err());

        let role = role(|r| {
            r.allowed_base_domain = "example.com".to_string();
            r.allow_base_domain = true;
            r.email_protection_flag = true;
        });
        assert!(validate_names("token", &["user@example.com".to_string()], &role).is_ok());
    }

    #[test]
    fn malformed_email_is_rejected() {
        let role = role(|r| r.allow_any_name = false);
        assert!(validate_names("token", &["user@a@b".to_string()], &role).is_err());
    }

    #[test]
    fn token_display_name_admission() {
        let role = role(|r| r.allow_token_display_name = true);
        assert!(validate_names("svc.internal", &["svc.internal".to_string()], &role).is_ok());
        assert!(validate_names("svc.internal", &["other.internal".to_string()], &role).is_err());
    }

    #[test]
    fn hostname_grammar_rejects_bad_labels() {
        assert!(is_valid_hostname("foo.bar"));
        assert!(is_valid_hostname("foo-bar.baz"));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("-foo.bar"));
        assert!(!is_valid_hostname("foo-.bar"));
        assert!(!is_valid_hostname("foo..bar"));
        assert!(!is_valid_hostname("*.bar"));
    }

    #[test]
    fn monotonicity_widening_never_rejects_previously_admitted() {
        let base = role(|r| {
            r.allowed_base_domain = "example.com".to_string();
            r.allow_base_domain = true;
        });
        let name = vec!["example.com".to_string()];
        assert!(validate_names("token", &name, &base).is_ok());

        let mut widened = base.clone();
        widened.allow_any_name = true;
        assert!(validate_names("token", &name, &widened).is_ok());
    }
}
