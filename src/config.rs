// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

use std::time::Duration;

/// System-wide fallback TTLs consulted by the Creation-Bundle Builder when
/// neither the request nor the role supplies one. In the secrets-engine this
/// core is embedded in, these come from the mount's tuned lease settings;
/// here they're a plain value the caller constructs and passes in.
#[derive(Debug, Clone, Copy)]
pub struct SystemDefaults {
    pub default_lease_ttl: Duration,
    pub default_max_lease_ttl: Duration,
}

impl Default for SystemDefaults {
    fn default() -> Self {
        SystemDefaults {
            default_lease_ttl: Duration::from_secs(60 * 60 * 24 * 30),
            default_max_lease_ttl: Duration::from_secs(60 * 60 * 24 * 90),
        }
    }
}
