//! URL safety validation.
//!
//! Every request descriptor passes through a [`UrlGuard`] before any socket
//! is opened. The guard rejects loopback, private-network, and link-local
//! targets so a chain fed from untrusted previous results cannot be steered
//! at internal infrastructure.
//!
//! Validation works on the URL as written: host names are classified
//! textually (`localhost` and `*.localhost`), IP literals by range. The
//! guard performs no DNS resolution, since resolving is itself network
//! activity.

use crate::errors::{SsrfValidationError, SsrfViolation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Configuration for URL safety validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlGuardConfig {
    /// Schemes a request may use.
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: HashSet<String>,
    /// Whether loopback targets (127.0.0.0/8, ::1, `localhost`) are allowed.
    #[serde(default)]
    pub allow_localhost: bool,
    /// Whether private and link-local network targets are allowed.
    #[serde(default)]
    pub allow_private_networks: bool,
    /// Hosts that bypass the loopback/private classification entirely.
    /// Matched exactly against the URL's host; scheme rules still apply.
    #[serde(default)]
    pub allowed_hosts: HashSet<String>,
}

fn default_allowed_schemes() -> HashSet<String> {
    ["http".to_string(), "https".to_string()].into_iter().collect()
}

impl Default for UrlGuardConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: default_allowed_schemes(),
            allow_localhost: false,
            allow_private_networks: false,
            allowed_hosts: HashSet::new(),
        }
    }
}

impl UrlGuardConfig {
    /// Creates a new guard configuration with the strict defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an allowed scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.allowed_schemes.insert(scheme.into());
        self
    }

    /// Sets whether loopback targets are allowed.
    #[must_use]
    pub fn with_allow_localhost(mut self, allow: bool) -> Self {
        self.allow_localhost = allow;
        self
    }

    /// Sets whether private-network targets are allowed.
    #[must_use]
    pub fn with_allow_private_networks(mut self, allow: bool) -> Self {
        self.allow_private_networks = allow;
        self
    }

    /// Adds a host that bypasses the loopback/private classification.
    #[must_use]
    pub fn with_allowed_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into());
        self
    }
}

/// Validates request URLs against an SSRF policy.
#[derive(Debug, Clone, Default)]
pub struct UrlGuard {
    config: UrlGuardConfig,
}

impl UrlGuard {
    /// Creates a guard with the given configuration.
    #[must_use]
    pub const fn new(config: UrlGuardConfig) -> Self {
        Self { config }
    }

    /// Returns the guard's configuration.
    #[must_use]
    pub const fn config(&self) -> &UrlGuardConfig {
        &self.config
    }

    /// Validates a URL, returning the specific violation on rejection.
    ///
    /// The scheme allow-list is checked first and is never bypassed by
    /// `allowed_hosts`; host classification runs after it.
    pub fn validate(&self, raw: &str) -> Result<(), SsrfValidationError> {
        let parsed = Url::parse(raw)
            .map_err(|_| SsrfValidationError::new(raw, SsrfViolation::Malformed))?;

        if !self.config.allowed_schemes.contains(parsed.scheme()) {
            return Err(SsrfValidationError::new(raw, SsrfViolation::Scheme));
        }

        let Some(host) = parsed.host() else {
            return Err(SsrfValidationError::new(raw, SsrfViolation::MissingHost));
        };

        if self.config.allowed_hosts.contains(&host.to_string()) {
            return Ok(());
        }

        let violation = match host {
            Host::Ipv4(ip) => classify_ipv4(ip),
            Host::Ipv6(ip) => classify_ipv6(ip),
            Host::Domain(domain) => classify_domain(domain),
        };

        match violation {
            Some(SsrfViolation::Loopback) if !self.config.allow_localhost => {
                Err(SsrfValidationError::new(raw, SsrfViolation::Loopback))
            }
            Some(SsrfViolation::PrivateNetwork) if !self.config.allow_private_networks => {
                Err(SsrfValidationError::new(raw, SsrfViolation::PrivateNetwork))
            }
            _ => Ok(()),
        }
    }
}

fn classify_ipv4(ip: Ipv4Addr) -> Option<SsrfViolation> {
    if ip.is_loopback() || ip.is_unspecified() {
        Some(SsrfViolation::Loopback)
    } else if ip.is_private() || ip.is_link_local() {
        Some(SsrfViolation::PrivateNetwork)
    } else {
        None
    }
}

fn classify_ipv6(ip: Ipv6Addr) -> Option<SsrfViolation> {
    // IPv4-mapped addresses are classified by their embedded IPv4 address.
    if let Some(mapped) = ipv4_mapped(ip) {
        return classify_ipv4(mapped);
    }
    if ip.is_loopback() || ip.is_unspecified() {
        Some(SsrfViolation::Loopback)
    } else if is_unique_local(ip) || is_unicast_link_local(ip) {
        Some(SsrfViolation::PrivateNetwork)
    } else {
        None
    }
}

fn classify_domain(domain: &str) -> Option<SsrfViolation> {
    // The url crate lowercases registered names during parsing.
    if domain == "localhost" || domain.ends_with(".localhost") {
        Some(SsrfViolation::Loopback)
    } else {
        None
    }
}

fn ipv4_mapped(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    match ip.octets() {
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, a, b, c, d] => Some(Ipv4Addr::new(a, b, c, d)),
        _ => None,
    }
}

/// fc00::/7
fn is_unique_local(ip: Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xfe00) == 0xfc00
}

/// fe80::/10
fn is_unicast_link_local(ip: Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}
