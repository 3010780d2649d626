//! IPv6 address algebra
//!
//! - [`codec`]: text ↔ 16-byte conversion with `::` compression
//! - [`compose`]: 7-byte prefix + 9-byte suffix composition
//!
//! Everything here is pure and allocation-light; no I/O.

pub mod codec;
pub mod compose;

pub use compose::{Prefix, compose, network_address};

/// Length of the detected prefix kept from the public address (56 bits)
pub const PREFIX_LEN: usize = 7;

/// Length of the configured suffix appended to the prefix (72 bits)
pub const SUFFIX_LEN: usize = 9;

/// A full IPv6 address in network byte order
pub type Ipv6Bytes = [u8; 16];

/// The expanded suffix occupying bytes 7..16 of a composed address
pub type SuffixBytes = [u8; SUFFIX_LEN];
