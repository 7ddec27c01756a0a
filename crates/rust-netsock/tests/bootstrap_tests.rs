//! Integration tests for the connection bootstrap.

#![cfg(unix)]

use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpListener};
use std::time::Duration;

use proptest::prelude::*;
use rust_netsock::{ConnectError, Connector, StaticResolver, TimeoutPolicy, close_socket, connect};

fn listener() -> (TcpListener, i32) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = i32::from(listener.local_addr().unwrap().port());
    (listener, port)
}

#[test]
fn socket_carries_default_io_timeout() {
    let (_listener, port) = listener();
    let socket = connect("127.0.0.1", port).unwrap();

    let (recv, send) = socket.io_timeouts().unwrap();
    assert_eq!(recv, Some(Duration::from_millis(10_000)));
    assert_eq!(send, Some(Duration::from_millis(10_000)));
    close_socket(socket);
}

#[test]
fn socket_is_usable_for_io() {
    let (listener, port) = listener();
    let socket = connect("127.0.0.1", port).unwrap();
    let (mut peer, _) = listener.accept().unwrap();

    peer.write_all(b"SSH-2.0-test\r\n").unwrap();

    let mut stream = std::net::TcpStream::from(socket.into_owned_fd());
    let mut buf = [0u8; 14];
    stream.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"SSH-2.0-test\r\n");
}

#[test]
fn localhost_by_name() {
    let (_listener, port) = listener();
    let resolver = StaticResolver::new().with_host("localhost", Ipv4Addr::LOCALHOST);
    let socket = Connector::new()
        .with_resolver(resolver)
        .connect("localhost", port)
        .unwrap();
    assert_eq!(socket.remote_addr().ip(), &Ipv4Addr::LOCALHOST);
}

#[test]
fn refused_port_is_connect_failed() {
    let (listener, port) = listener();
    drop(listener);

    let err = connect("127.0.0.1", port).unwrap_err();
    assert!(matches!(err, ConnectError::ConnectFailed { .. }));
    assert!(err.code().is_some());
}

#[test]
fn short_policy_is_applied() {
    let (_listener, port) = listener();
    let socket = Connector::new()
        .with_policy(TimeoutPolicy::from_millis(500, 250))
        .connect("127.0.0.1", port)
        .unwrap();

    // The kernel rounds socket timeouts up to whole ticks.
    let (recv, send) = socket.io_timeouts().unwrap();
    for timeout in [recv.unwrap(), send.unwrap()] {
        assert!(timeout >= Duration::from_millis(250), "{timeout:?}");
        assert!(timeout < Duration::from_millis(260), "{timeout:?}");
    }
}

#[test]
fn name_resolution_failure() {
    let err = Connector::new()
        .with_resolver(StaticResolver::new())
        .connect("unknown-host", 22)
        .unwrap_err();
    assert!(matches!(err, ConnectError::NameResolutionFailed { ref hostname } if hostname == "unknown-host"));
}

proptest! {
    #[test]
    fn non_positive_ports_rejected(port in i32::MIN..=0) {
        let err = connect("127.0.0.1", port).unwrap_err();
        prop_assert!(err.is_invalid_argument());
    }

    #[test]
    fn oversized_ports_rejected(port in 65_536i32..=i32::MAX) {
        let err = connect("127.0.0.1", port).unwrap_err();
        prop_assert!(err.is_invalid_argument());
    }

    #[test]
    fn empty_hostname_rejected(port in any::<i32>()) {
        let err = connect("", port).unwrap_err();
        prop_assert!(err.is_invalid_argument());
    }
}
