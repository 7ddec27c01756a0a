//! Resolver implementations.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

use crate::traits::Resolver;

/// Resolver backed by the platform's name service.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolve_ipv4(&self, hostname: &str) -> io::Result<Vec<Ipv4Addr>> {
        let addrs = (hostname, 0).to_socket_addrs()?;
        Ok(addrs
            .filter_map(|addr| match addr.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .collect())
    }
}

/// Resolver with a fixed host table.
///
/// Literal IPv4 addresses resolve to themselves; any other name must be
/// present in the table.
///
/// # Example
///
/// ```
/// use std::net::Ipv4Addr;
/// use rust_netsock::{Resolver, StaticResolver};
///
/// let resolver = StaticResolver::new().with_host("gateway", Ipv4Addr::new(192, 168, 4, 1));
/// assert_eq!(resolver.resolve_ipv4("gateway").unwrap(), vec![Ipv4Addr::new(192, 168, 4, 1)]);
/// assert!(resolver.resolve_ipv4("elsewhere").unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<Ipv4Addr>>,
}

impl StaticResolver {
    /// Create an empty host table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address for a hostname.
    #[must_use]
    pub fn with_host(mut self, hostname: impl Into<String>, addr: Ipv4Addr) -> Self {
        self.hosts.entry(hostname.into()).or_default().push(addr);
        self
    }
}

impl Resolver for StaticResolver {
    fn resolve_ipv4(&self, hostname: &str) -> io::Result<Vec<Ipv4Addr>> {
        if let Ok(literal) = hostname.parse::<Ipv4Addr>() {
            return Ok(vec![literal]);
        }
        Ok(self.hosts.get(hostname).cloned().unwrap_or_default())
    }
}
