//! Reconciliation driver
//!
//! The [`Reconciler`] runs one linear pass:
//!
//! ```text
//!  validate ──▶ IPv4 phase ──▶ IPv6 phase ──────────────────────────▶ report
//!               detect v4      detect v6, take prefix
//!               A records      pools ─▶ per domain: AAAA ─▶ firewall ─▶ service
//! ```
//!
//! ## Failure scopes
//!
//! - Configuration errors abort before any collaborator is called
//! - A detection failure skips its own phase only
//! - Every other failure skips one target; it is logged, notified and
//!   recorded in the [`RunReport`]
//!
//! Each target is read, compared and written at most once, so a target is
//! either fully updated or left untouched.

pub mod diff;
pub mod report;

pub use report::{RunReport, Subsystem};

use std::net::Ipv4Addr;

use tracing::{debug, error, info, warn};

use crate::addr::{Prefix, codec};
use crate::config::{DomainSuffix, PoolTarget, ServiceRef, SyncConfig, fqdn};
use crate::error::{Error, Result};
use crate::traits::{
    DnsZone, FirewallController, FirewallGroup, IpSource, IpVersion, Notifier, PoolApi,
    RecordType, ServiceApi,
};

/// Firewall session state within one run
enum FirewallSession {
    /// Not needed yet
    Idle,
    /// Logged in, groups fetched
    Open(Vec<FirewallGroup>),
    /// Login or listing failed; firewall targets are skipped for this run
    Broken { logged_in: bool },
}

impl FirewallSession {
    fn logged_in(&self) -> bool {
        match self {
            FirewallSession::Idle => false,
            FirewallSession::Open(_) => true,
            FirewallSession::Broken { logged_in } => *logged_in,
        }
    }
}

/// Core reconciliation driver
///
/// Owns its collaborators; the [`SyncConfig`] is borrowed per run so the same
/// reconciler can run repeatedly.
///
/// ## Example
///
/// ```rust,ignore
/// let reconciler = Reconciler::new(Box::new(ip_source), Box::new(notifier))
///     .with_dns(Box::new(zone))
///     .with_firewall(Box::new(unifi));
///
/// let report = reconciler.run(&config).await?;
/// ```
pub struct Reconciler {
    /// Public address detection
    ip_source: Box<dyn IpSource>,

    /// Managed DNS zone
    dns: Option<Box<dyn DnsZone>>,

    /// Firewall controller
    firewall: Option<Box<dyn FirewallController>>,

    /// Service annotation API
    services: Option<Box<dyn ServiceApi>>,

    /// Address pool API
    pools: Option<Box<dyn PoolApi>>,

    /// Best-effort notifications
    notifier: Box<dyn Notifier>,
}

impl Reconciler {
    /// Create a reconciler with the two collaborators every run needs
    pub fn new(ip_source: Box<dyn IpSource>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            ip_source,
            dns: None,
            firewall: None,
            services: None,
            pools: None,
            notifier,
        }
    }

    /// Set the DNS zone collaborator
    pub fn with_dns(mut self, dns: Box<dyn DnsZone>) -> Self {
        self.dns = Some(dns);
        self
    }

    /// Set the firewall controller collaborator
    pub fn with_firewall(mut self, firewall: Box<dyn FirewallController>) -> Self {
        self.firewall = Some(firewall);
        self
    }

    /// Set the service collaborator
    pub fn with_services(mut self, services: Box<dyn ServiceApi>) -> Self {
        self.services = Some(services);
        self
    }

    /// Set the pool collaborator
    pub fn with_pools(mut self, pools: Box<dyn PoolApi>) -> Self {
        self.pools = Some(pools);
        self
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(RunReport)`: The run completed; individual targets may have failed
    /// - `Err(Error)`: Configuration is missing or malformed; nothing was touched
    pub async fn run(&self, config: &SyncConfig) -> Result<RunReport> {
        self.validate(config)?;

        let mut report = RunReport::new();
        info!(
            "{} starting: {} IPv4 domain(s), {} IPv6 domain(s), {} pool(s)",
            Subsystem::Run,
            config.ipv4_domains.len(),
            config.ipv6_domains.len(),
            config.pools.len()
        );

        if !config.ipv4_domains.is_empty() {
            self.sync_ipv4(config, &mut report).await;
        }

        if config.has_ipv6_targets() {
            self.sync_ipv6(config, &mut report).await;
        }

        self.finish(&report).await;
        Ok(report)
    }

    /// Check configuration against the wired collaborators
    fn validate(&self, config: &SyncConfig) -> Result<()> {
        config.validate()?;

        if config.has_dns_targets() && self.dns.is_none() {
            return Err(Error::config_missing(
                "DNS targets configured but no DNS zone collaborator",
            ));
        }
        if !config.firewall_groups.is_empty() && self.firewall.is_none() {
            return Err(Error::config_missing(
                "Firewall groups configured but no firewall controller",
            ));
        }
        if !config.services.is_empty() && self.services.is_none() {
            return Err(Error::config_missing(
                "Service mappings configured but no service collaborator",
            ));
        }
        if !config.pools.is_empty() && self.pools.is_none() {
            return Err(Error::config_missing(
                "Pool targets configured but no pool collaborator",
            ));
        }

        for domain in config.firewall_groups.keys().chain(config.services.keys()) {
            if !config.ipv6_domains.iter().any(|d| &d.domain == domain) {
                warn!(
                    "{} {} has a firewall/service mapping but no IPv6 suffix, ignoring",
                    Subsystem::Run,
                    domain
                );
            }
        }

        Ok(())
    }

    async fn sync_ipv4(&self, config: &SyncConfig, report: &mut RunReport) {
        let ip = match self.detect(IpVersion::V4).await.and_then(|text| {
            text.trim()
                .parse::<Ipv4Addr>()
                .map_err(|e| Error::detection(format!("'{text}' is not IPv4: {e}")))
        }) {
            Ok(ip) => ip,
            Err(e) => {
                self.fail(report, Subsystem::Ipv4, "skipping IPv4 phase", &e)
                    .await;
                return;
            }
        };
        info!("{} public address {}", Subsystem::Ipv4, ip);

        let Some(dns) = self.dns.as_deref() else {
            return;
        };
        let value = ip.to_string();
        for domain in &config.ipv4_domains {
            let name = fqdn(domain);
            if let Err(e) = self
                .upsert_record(dns, &name, RecordType::A, &value, config.default_ttl, report)
                .await
            {
                self.fail(report, Subsystem::Dns, &format!("{name} A"), &e)
                    .await;
            }
        }
    }

    async fn sync_ipv6(&self, config: &SyncConfig, report: &mut RunReport) {
        let prefix = match self
            .detect(IpVersion::V6)
            .await
            .and_then(|text| {
                Prefix::from_address(text.trim()).map_err(|e| Error::detection(e.to_string()))
            })
        {
            Ok(prefix) => prefix,
            Err(e) => {
                self.fail(report, Subsystem::Ipv6, "skipping IPv6 phase", &e)
                    .await;
                return;
            }
        };
        info!("{} public prefix {}", Subsystem::Ipv6, prefix);

        if let Some(pools) = self.pools.as_deref() {
            for target in &config.pools {
                if let Err(e) = self.sync_pool(pools, target, &prefix, report).await {
                    self.fail(report, Subsystem::Pool, &target.to_string(), &e)
                        .await;
                }
            }
        }

        let mut session = FirewallSession::Idle;
        for entry in &config.ipv6_domains {
            self.sync_domain(config, entry, &prefix, &mut session, report)
                .await;
        }

        if session.logged_in()
            && let Some(firewall) = self.firewall.as_deref()
            && let Err(e) = firewall.logout().await
        {
            warn!("{} logout failed: {}", Subsystem::Firewall, e);
        }
    }

    /// DNS, then firewall, then service for one domain
    async fn sync_domain(
        &self,
        config: &SyncConfig,
        entry: &DomainSuffix,
        prefix: &Prefix,
        session: &mut FirewallSession,
        report: &mut RunReport,
    ) {
        let address = match prefix.compose(&entry.suffix) {
            Ok(bytes) => codec::serialize(&bytes),
            Err(e) => {
                let context = format!("{} suffix '{}'", entry.domain, entry.suffix);
                self.fail(report, Subsystem::Ipv6, &context, &e).await;
                return;
            }
        };
        debug!("{} {} -> {}", Subsystem::Ipv6, entry.domain, address);

        if let Some(dns) = self.dns.as_deref() {
            let name = fqdn(&entry.domain);
            if let Err(e) = self
                .upsert_record(dns, &name, RecordType::Aaaa, &address, config.default_ttl, report)
                .await
            {
                self.fail(report, Subsystem::Dns, &format!("{name} AAAA"), &e)
                    .await;
            }
        }

        if let (Some(group), Some(firewall)) = (
            config.firewall_groups.get(&entry.domain),
            self.firewall.as_deref(),
        ) {
            if let Err(e) = self
                .sync_firewall_group(firewall, session, group, &address, report)
                .await
            {
                self.fail(report, Subsystem::Firewall, &format!("group '{group}'"), &e)
                    .await;
            }
        }

        if let (Some(service), Some(services)) =
            (config.services.get(&entry.domain), self.services.as_deref())
        {
            if let Err(e) = self
                .sync_service(services, service, &config.service_annotation, &address, report)
                .await
            {
                self.fail(report, Subsystem::Service, &service.to_string(), &e)
                    .await;
            }
        }
    }

    /// Create or replace a record unless it already holds `value`
    async fn upsert_record(
        &self,
        dns: &dyn DnsZone,
        name: &str,
        record_type: RecordType,
        value: &str,
        default_ttl: u32,
        report: &mut RunReport,
    ) -> Result<()> {
        match dns.get_record(name, record_type).await? {
            Some(existing) if diff::record_matches(&existing, value) => {
                debug!("{} {} {} unchanged ({})", Subsystem::Dns, name, record_type, value);
            }
            Some(existing) => {
                dns.replace_record(&existing, value).await?;
                let line = report.record_change(
                    Subsystem::Dns,
                    format!(
                        "{} {} updated: {} -> {}",
                        name,
                        record_type,
                        existing.rrdatas.join(","),
                        value
                    ),
                );
                info!("{}", line);
            }
            None => {
                dns.create_record(name, record_type, value, default_ttl)
                    .await?;
                let line = report.record_change(
                    Subsystem::Dns,
                    format!("{name} {record_type} created: {value} (ttl {default_ttl})"),
                );
                info!("{}", line);
            }
        }
        Ok(())
    }

    /// Make `address` the sole member of a firewall group
    async fn sync_firewall_group(
        &self,
        firewall: &dyn FirewallController,
        session: &mut FirewallSession,
        group_name: &str,
        address: &str,
        report: &mut RunReport,
    ) -> Result<()> {
        if let FirewallSession::Idle = session {
            *session = self.open_firewall_session(firewall, report).await;
        }
        let FirewallSession::Open(groups) = session else {
            debug!(
                "{} session unavailable, skipping group '{}'",
                Subsystem::Firewall,
                group_name
            );
            return Ok(());
        };

        let group = groups
            .iter_mut()
            .find(|g| g.name == group_name)
            .ok_or_else(|| Error::not_found(format!("firewall group '{group_name}'")))?;

        if let [only] = group.members.as_slice()
            && diff::same_ipv6(only, address)
        {
            debug!("{} group '{}' unchanged", Subsystem::Firewall, group_name);
            return Ok(());
        }

        let members = vec![address.to_string()];
        firewall.edit_group(group, &members).await?;

        let previous = if group.members.is_empty() {
            "(empty)".to_string()
        } else {
            group.members.join(",")
        };
        group.members = members;

        let line = report.record_change(
            Subsystem::Firewall,
            format!("group '{group_name}': {previous} -> {address}"),
        );
        info!("{}", line);
        Ok(())
    }

    async fn open_firewall_session(
        &self,
        firewall: &dyn FirewallController,
        report: &mut RunReport,
    ) -> FirewallSession {
        if let Err(e) = firewall.login().await {
            self.fail(
                report,
                Subsystem::Firewall,
                &format!("login to {} failed, skipping firewall groups", firewall.controller_name()),
                &e,
            )
            .await;
            return FirewallSession::Broken { logged_in: false };
        }

        match firewall.groups().await {
            Ok(groups) => {
                debug!("{} {} group(s) listed", Subsystem::Firewall, groups.len());
                FirewallSession::Open(groups)
            }
            Err(e) => {
                self.fail(
                    report,
                    Subsystem::Firewall,
                    "listing groups failed, skipping firewall groups",
                    &e,
                )
                .await;
                FirewallSession::Broken { logged_in: true }
            }
        }
    }

    /// Put `address` into a service's load-balancer IP annotation
    async fn sync_service(
        &self,
        services: &dyn ServiceApi,
        service: &ServiceRef,
        key: &str,
        address: &str,
        report: &mut RunReport,
    ) -> Result<()> {
        let annotations = services
            .read_service(&service.namespace, &service.name)
            .await?;
        let current = annotations.get(key).map(String::as_str);

        let Some(value) = diff::merge_lb_ips(current, address) else {
            debug!("{} {} unchanged", Subsystem::Service, service);
            return Ok(());
        };

        services
            .patch_service_annotation(&service.namespace, &service.name, key, &value)
            .await?;

        let line = report.record_change(
            Subsystem::Service,
            format!("{service} {key}: {} -> {value}", current.unwrap_or("(unset)")),
        );
        info!("{}", line);
        Ok(())
    }

    /// Replace the IPv6 network of an address pool
    async fn sync_pool(
        &self,
        pools: &dyn PoolApi,
        target: &PoolTarget,
        prefix: &Prefix,
        report: &mut RunReport,
    ) -> Result<()> {
        let network = prefix.network_address(&target.suffix)?;
        let current = pools.get_pool(&target.namespace, &target.pool).await?;

        let Some(addresses) = diff::merge_pool_addresses(&current, &network) else {
            debug!("{} {} unchanged ({})", Subsystem::Pool, target, network);
            return Ok(());
        };

        pools
            .patch_pool_addresses(&target.namespace, &target.pool, &addresses)
            .await?;

        let previous = current
            .iter()
            .find(|entry| diff::is_ipv6_entry(entry))
            .map_or("(none)", String::as_str);
        let line = report.record_change(
            Subsystem::Pool,
            format!("{target}: {previous} -> {network}"),
        );
        info!("{}", line);
        Ok(())
    }

    async fn detect(&self, version: IpVersion) -> Result<String> {
        self.ip_source
            .current(version)
            .await
            .map_err(|e| match e {
                Error::Detection(_) => e,
                other => Error::detection(format!(
                    "{} ({}): {}",
                    version,
                    self.ip_source.source_name(),
                    other
                )),
            })
    }

    /// Log, notify and record a per-target or per-phase failure
    async fn fail(&self, report: &mut RunReport, subsystem: Subsystem, context: &str, err: &Error) {
        let line = report.record_failure(subsystem, format!("{context}: {err}"));
        error!("{}", line);
        self.notifier.send(&line).await;
    }

    /// Emit the consolidated notification
    async fn finish(&self, report: &RunReport) {
        if report.has_changes() {
            info!(
                "{} {} change(s), {} failure(s)",
                Subsystem::Run,
                report.changes().len(),
                report.failures().len()
            );
            self.notifier.send(&report.summary()).await;
        } else {
            info!(
                "{} no changes, {} failure(s)",
                Subsystem::Run,
                report.failures().len()
            );
        }
    }
}
