//! Host key verification against an OpenSSH `known_hosts` file.
//!
//! Both plain host names and hashed entries (`|1|salt|hash`, as written by
//! `ssh-keygen -H` or `ssh-keyscan -H`) are recognised.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use russh::keys::{HashAlg, PublicKey};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Default `known_hosts` location, honouring `SSH_KNOWN_HOSTS`.
#[must_use]
pub fn known_hosts_path() -> PathBuf {
    if let Ok(path) = std::env::var("SSH_KNOWN_HOSTS") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".ssh").join("known_hosts")
}

/// Check whether the host field of a `known_hosts` line names `host:port`.
///
/// Port 22 entries use the bare host; other ports use `[host]:port`.
/// Hashed entries are compared by HMAC-SHA1 of that same pattern.
#[must_use]
pub fn host_matches(hosts: &str, host: &str, port: u16) -> bool {
    let pattern = if port == 22 {
        host.to_string()
    } else {
        format!("[{host}]:{port}")
    };
    hosts
        .split(',')
        .map(str::trim)
        .any(|entry| entry == pattern || entry == "*" || hashed_matches(entry, &pattern))
}

/// Match a `|1|base64salt|base64hash` entry against `pattern`.
fn hashed_matches(entry: &str, pattern: &str) -> bool {
    let Some((salt, hash)) = entry
        .strip_prefix("|1|")
        .and_then(|rest| rest.split_once('|'))
    else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (BASE64.decode(salt), BASE64.decode(hash)) else {
        tracing::debug!(entry = %entry, "Malformed hashed known_hosts entry");
        return false;
    };
    let Ok(mut mac) = HmacSha1::new_from_slice(&salt) else {
        return false;
    };
    mac.update(pattern.as_bytes());
    mac.verify_slice(&hash).is_ok()
}

/// Look `key` up in `contents`.
///
/// Returns `true` only when a line for the host carries the same key.
/// A line for the host with a different key is a mismatch and rejects.
#[must_use]
pub fn verify(contents: &str, host: &str, port: u16, key: &PublicKey) -> bool {
    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(hosts), Some(key_type), Some(key_data)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if !host_matches(hosts, host, port) {
            continue;
        }
        let Some(stored) = parse_key(key_type, key_data) else {
            continue;
        };
        if stored.algorithm() != key.algorithm() {
            continue;
        }
        if stored.fingerprint(HashAlg::Sha256) == key.fingerprint(HashAlg::Sha256) {
            tracing::debug!(host = %host, "Host key verified against known_hosts");
            return true;
        }
        tracing::error!(host = %host, "HOST KEY MISMATCH! Possible man-in-the-middle attack!");
        return false;
    }
    tracing::warn!(host = %host, port, "Host not found in known_hosts");
    false
}

/// Verify `key` against the default `known_hosts` file.
#[must_use]
pub fn check(host: &str, port: u16, key: &PublicKey) -> bool {
    let path = known_hosts_path();
    match std::fs::read_to_string(&path) {
        Ok(contents) => verify(&contents, host, port, key),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Cannot read known_hosts, rejecting key");
            false
        }
    }
}

fn parse_key(key_type: &str, key_data: &str) -> Option<PublicKey> {
    match key_type {
        "ssh-ed25519"
        | "ssh-rsa"
        | "ecdsa-sha2-nistp256"
        | "ecdsa-sha2-nistp384"
        | "ecdsa-sha2-nistp521" => russh::keys::parse_public_key_base64(key_data).ok(),
        _ => {
            tracing::debug!(key_type = %key_type, "Unknown key type in known_hosts");
            None
        }
    }
}
