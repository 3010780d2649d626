//! Desired-vs-remote comparisons
//!
//! Remote systems do not necessarily echo addresses back in canonical form,
//! so IPv6 values are compared by their bytes, never by their text.

use std::net::Ipv4Addr;

use crate::addr::codec;
use crate::traits::{DnsRecord, RecordType};

/// Whether two IPv6 texts denote the same address.
///
/// Unparsable text never matches, so it gets overwritten.
pub fn same_ipv6(a: &str, b: &str) -> bool {
    match (codec::parse(a.trim()), codec::parse(b.trim())) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Whether two `address/len` texts denote the same network entry
pub fn same_network(a: &str, b: &str) -> bool {
    match (a.trim().split_once('/'), b.trim().split_once('/')) {
        (Some((addr_a, len_a)), Some((addr_b, len_b))) => {
            len_a == len_b && same_ipv6(addr_a, addr_b)
        }
        _ => a.trim() == b.trim(),
    }
}

/// Whether an address-list entry is IPv6 (a range, network or address)
pub fn is_ipv6_entry(entry: &str) -> bool {
    entry.contains(':')
}

/// Whether a record already holds exactly `value`
pub fn record_matches(record: &DnsRecord, value: &str) -> bool {
    let Some(current) = record.single_value() else {
        return false;
    };

    match record.record_type {
        RecordType::A => match (current.parse::<Ipv4Addr>(), value.parse::<Ipv4Addr>()) {
            (Ok(current), Ok(value)) => current == value,
            _ => false,
        },
        RecordType::Aaaa => same_ipv6(current, value),
    }
}

/// New pool address list with `network` in place of the first IPv6 entry.
///
/// Every other entry is kept in order. Returns `None` when the first IPv6
/// entry already equals `network`.
pub fn merge_pool_addresses(current: &[String], network: &str) -> Option<Vec<String>> {
    match current.iter().position(|entry| is_ipv6_entry(entry)) {
        Some(index) if same_network(&current[index], network) => None,
        Some(index) => {
            let mut addresses = current.to_vec();
            addresses[index] = network.to_string();
            Some(addresses)
        }
        None => {
            let mut addresses = current.to_vec();
            addresses.push(network.to_string());
            Some(addresses)
        }
    }
}

/// New load-balancer IP annotation value carrying `address` as its IPv6 entry.
///
/// IPv4 entries are kept in order; the IPv6 entry takes the place of the
/// first existing one (or is appended). Returns `None` when the annotation
/// already holds exactly one IPv6 entry equal to `address`.
pub fn merge_lb_ips(current: Option<&str>, address: &str) -> Option<String> {
    let entries: Vec<&str> = current
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();

    let ipv6: Vec<&str> = entries.iter().copied().filter(|e| is_ipv6_entry(e)).collect();
    if let [only] = ipv6.as_slice()
        && same_ipv6(only, address)
    {
        return None;
    }

    let mut merged: Vec<&str> = Vec::with_capacity(entries.len() + 1);
    let mut placed = false;
    for entry in entries {
        if !is_ipv6_entry(entry) {
            merged.push(entry);
        } else if !placed {
            merged.push(address);
            placed = true;
        }
    }
    if !placed {
        merged.push(address);
    }

    Some(merged.join(","))
}
