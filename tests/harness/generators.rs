// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for abuse simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Email values the validator must reject.
pub fn generate_malformed_emails() -> Vec<&'static str> {
    vec![
        "",
        "   ",
        "plainaddress",
        "@no-local-part.com",
        "no-domain@",
        "no-tld@example",
        "two@@example.com",
        "a@b@example.com",
        "white space@example.com",
        "trailing@example.com ",
    ]
}

/// Header values that spoof or pad the forwarded-for chain.
pub fn generate_forwarded_chains(client: &str) -> Vec<String> {
    vec![
        client.to_string(),
        format!("{client}, 10.0.0.1"),
        format!("  {client} ,192.168.0.1, 172.16.0.1"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }
}
