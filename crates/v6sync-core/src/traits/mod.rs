//! Collaborator traits for v6sync
//!
//! The reconciler talks to the outside world only through these interfaces.
//!
//! - [`IpSource`]: Detect the current public IPv4/IPv6 address
//! - [`DnsZone`]: Read, create and replace records in a managed zone
//! - [`FirewallController`]: Edit address groups on a firewall controller
//! - [`ServiceApi`] / [`PoolApi`]: Patch cluster load-balancer resources
//! - [`Notifier`]: Best-effort human notifications

pub mod cluster;
pub mod dns_zone;
pub mod firewall;
pub mod ip_source;
pub mod notifier;

pub use cluster::{Annotations, PoolApi, ServiceApi};
pub use dns_zone::{DnsRecord, DnsZone, RecordType};
pub use firewall::{FirewallController, FirewallGroup};
pub use ip_source::{IpSource, IpVersion};
pub use notifier::{LogNotifier, Notifier};
