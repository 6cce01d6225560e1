//! Reverse DNS lookup for displayed addresses.

use std::collections::HashMap;
use std::net::IpAddr;

/// Caches reverse lookups for the lifetime of one capture cycle.
#[derive(Debug, Default)]
pub struct Resolver {
    cache: HashMap<IpAddr, Option<String>>,
}

impl Resolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first name for `ip`, or its numeric form if it has none.
    pub fn name_for(&mut self, ip: IpAddr) -> String {
        if ip.is_unspecified() {
            return ip.to_string();
        }
        self.cache
            .entry(ip)
            .or_insert_with(|| reverse_lookup(ip))
            .clone()
            .unwrap_or_else(|| ip.to_string())
    }
}

/// Asks the system resolver for the name of `ip`.
///
/// Returns `None` when the lookup fails or only yields the numeric form.
pub fn reverse_lookup(ip: IpAddr) -> Option<String> {
    match dns_lookup::lookup_addr(&ip) {
        Ok(name) if !name.is_empty() && name != ip.to_string() => Some(name),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(%ip, error = %e, "reverse lookup failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn unspecified_addresses_are_not_looked_up() {
        let mut resolver = Resolver::new();
        assert_eq!(resolver.name_for(IpAddr::V4(Ipv4Addr::UNSPECIFIED)), "0.0.0.0");
        assert_eq!(resolver.name_for(IpAddr::V6(Ipv6Addr::UNSPECIFIED)), "::");
        assert!(resolver.cache.is_empty());
    }

    #[test]
    fn lookups_are_cached() {
        let mut resolver = Resolver::new();
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let first = resolver.name_for(ip);
        let second = resolver.name_for(ip);
        assert_eq!(first, second);
        assert_eq!(resolver.cache.len(), 1);
    }

    #[test]
    fn lookup_never_returns_numeric_form() {
        for ip in [
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            IpAddr::V6("2001:db8::1".parse().expect("ipv6")),
        ] {
            assert_ne!(reverse_lookup(ip), Some(ip.to_string()));
        }
    }
}
