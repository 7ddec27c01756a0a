//! Core traits for the bootstrap.
//!
//! - [`Resolver`]: maps a hostname to IPv4 addresses.

use std::io;
use std::net::Ipv4Addr;

/// Hostname resolution seam.
///
/// The bootstrap only ever connects to the first address returned, so
/// implementations should return addresses in a deterministic order.
pub trait Resolver {
    /// Resolve `hostname` to its IPv4 addresses.
    ///
    /// An empty vector means "no records" and is treated the same as an
    /// error by the caller.
    fn resolve_ipv4(&self, hostname: &str) -> io::Result<Vec<Ipv4Addr>>;
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn resolve_ipv4(&self, hostname: &str) -> io::Result<Vec<Ipv4Addr>> {
        (**self).resolve_ipv4(hostname)
    }
}
