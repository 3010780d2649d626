// # v6sync-core
//
// Core library for the v6sync reconciliation job.
//
// A run detects the current public IPv4/IPv6 addresses and pushes them into
// DNS, a firewall controller and cluster resources. The IPv6 side never uses
// the detected address directly: it keeps the first 56 bits (the prefix the
// ISP hands out) and appends a stable 72-bit suffix taken from configuration.
//
// ## Architecture Overview
//
// - **addr**: IPv6 text/byte codec and prefix/suffix composition (pure)
// - **traits**: Collaborator interfaces (IP detection, DNS zone, firewall,
//   service and pool APIs, notifications)
// - **Reconciler**: Sequences one run and diffs desired vs. remote state
// - **RunReport**: Changes and failures accumulated during a run
//
// ## Design Principles
//
// 1. **Pure core**: address algebra has no I/O and is unit tested in isolation
// 2. **Thin collaborators**: plugins execute single API calls, the reconciler
//    decides whether a write is needed
// 3. **Isolation**: a failing target never stops its siblings
// 4. **Stateless**: remote systems are the only memory between runs

pub mod addr;
pub mod config;
pub mod engine;
pub mod error;
pub mod traits;

// Re-export core types for convenience
pub use addr::{Ipv6Bytes, Prefix, SuffixBytes};
pub use config::{DomainSuffix, PoolTarget, ServiceRef, SyncConfig};
pub use engine::{Reconciler, RunReport};
pub use error::{Error, Result};
pub use traits::{DnsZone, FirewallController, IpSource, Notifier, PoolApi, ServiceApi};
