//! Unix platform implementation of the bootstrap.
//!
//! This module provides:
//!
//! - [`Socket`]: an owned, connected IPv4 stream socket
//! - [`Connector`]: socket creation, timeout policy, resolution and a
//!   bounded connect
//!
//! All system calls go through `rustix`.

mod connect;
mod socket;

pub use connect::{Connector, close_socket, connect};
pub use socket::Socket;
