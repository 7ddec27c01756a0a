//! Descriptor accounting for the bootstrap.
//!
//! A single test in its own binary, so nothing else opens descriptors
//! while the table is being counted.

#![cfg(target_os = "linux")]

use std::net::{Ipv4Addr, TcpListener};

use rust_netsock::{Connector, StaticResolver, connect};

fn open_descriptors() -> usize {
    std::fs::read_dir("/proc/self/fd").unwrap().count()
}

#[test]
fn descriptors_are_released() {
    let refused_port = {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        i32::from(listener.local_addr().unwrap().port())
    };
    let unresolved = Connector::new().with_resolver(StaticResolver::new());

    let before = open_descriptors();
    for _ in 0..32 {
        assert!(connect("", 22).is_err());
        assert!(connect("127.0.0.1", 0).is_err());
        assert!(unresolved.connect("nowhere", 22).is_err());
        assert!(connect("127.0.0.1", refused_port).is_err());
    }
    assert_eq!(open_descriptors(), before);

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = i32::from(listener.local_addr().unwrap().port());

    let before = open_descriptors();
    let socket = connect("127.0.0.1", port).unwrap();
    assert_eq!(open_descriptors(), before + 1);
    rust_netsock::close_socket(socket);
    assert_eq!(open_descriptors(), before);
}
