//! rust-netsock: IPv4 stream socket bootstrap
//!
//! This crate opens the TCP connection an SSH session runs over. Every
//! socket it hands out carries a bounded connect and symmetric
//! send/receive timeouts, so no later transport operation can block
//! forever.
//!
//! # Quick Start
//!
//! ```no_run
//! use rust_netsock::{close_socket, connect};
//!
//! let socket = connect("test.rebex.net", 22)?;
//! println!("connected to {}", socket.remote_addr());
//! close_socket(socket);
//! # Ok::<(), rust_netsock::ConnectError>(())
//! ```
//!
//! # Failure Modes
//!
//! - [`ConnectError::InvalidArgument`]: empty hostname or port outside `1..=65535`
//! - [`ConnectError::ResourceExhausted`]: the OS refused to create a socket
//! - [`ConnectError::NameResolutionFailed`]: no IPv4 record for the hostname
//! - [`ConnectError::ConnectFailed`]: refused, unreachable, or timed out
//!
//! No variant leaves a descriptor open.

pub mod config;
pub mod error;
pub mod resolve;
pub mod traits;

#[cfg(unix)]
pub mod unix;

pub use config::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_IO_TIMEOUT_MS, TimeoutPolicy};
pub use error::{ConnectError, Result};
pub use resolve::{StaticResolver, SystemResolver};
pub use traits::Resolver;

#[cfg(unix)]
pub use unix::{Connector, Socket, close_socket, connect};
