// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

// Network utility functions

use std::net::{IpAddr, SocketAddr};

/// Check if a string is usable as a VPN server address.
/// Supports IPv4/IPv6 addresses, socket addresses ("10.0.0.1:443", "[::1]:443"),
/// DNS hostnames, and hostnames with a port ("vpn.example.com:443")
pub fn is_valid_server_address(address: &str) -> bool {
    if address.is_empty() || address.chars().any(char::is_whitespace) {
        return false;
    }

    if address.parse::<IpAddr>().is_ok() || address.parse::<SocketAddr>().is_ok() {
        return true;
    }

    let host = match address.split_once(':') {
        Some((host, port)) => {
            // A second colon means a malformed IPv6 literal, not host:port
            if port.contains(':') {
                return false;
            }
            match port.parse::<u16>() {
                Ok(p) if p > 0 => host,
                _ => return false,
            }
        }
        None => address,
    };

    is_valid_hostname(host)
}

fn is_valid_hostname(host: &str) -> bool {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() || host.len() > 253 {
        return false;
    }

    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
