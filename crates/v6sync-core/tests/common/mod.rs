//! Test doubles and common utilities for reconciliation contract tests
//!
//! Every double records its calls into a shared [`CallLog`] so tests can
//! assert both what happened and in which order. Doubles are `Clone` and
//! share their state, so a test keeps one handle while the reconciler owns
//! the boxed copy.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use v6sync_core::error::{Error, Result};
use v6sync_core::traits::{
    Annotations, DnsRecord, DnsZone, FirewallController, FirewallGroup, IpSource, IpVersion,
    Notifier, PoolApi, RecordType, ServiceApi,
};
use v6sync_core::{Reconciler, SyncConfig};

/// Ordered record of collaborator calls shared between doubles
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Calls that modify remote state
    pub fn writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                ["create", "replace", "edit", "patch"]
                    .iter()
                    .any(|verb| c.starts_with(verb))
            })
            .collect()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }
}

/// An IP source returning fixed answers
#[derive(Clone)]
pub struct StaticIpSource {
    v4: Option<String>,
    v6: Option<String>,
    log: CallLog,
}

impl StaticIpSource {
    pub fn new(v4: Option<&str>, v6: Option<&str>, log: &CallLog) -> Self {
        Self {
            v4: v4.map(str::to_string),
            v6: v6.map(str::to_string),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl IpSource for StaticIpSource {
    async fn current(&self, version: IpVersion) -> Result<String> {
        self.log.push(format!("detect {version}"));
        let answer = match version {
            IpVersion::V4 => &self.v4,
            IpVersion::V6 => &self.v6,
        };
        answer
            .clone()
            .ok_or_else(|| Error::detection(format!("{version} lookup timed out")))
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// An in-memory DNS zone
#[derive(Clone)]
pub struct MemoryZone {
    records: Arc<Mutex<HashMap<(String, RecordType), DnsRecord>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    log: CallLog,
}

impl MemoryZone {
    pub fn new(log: &CallLog) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            log: log.clone(),
        }
    }

    /// Seed an existing record
    pub fn insert(&self, name: &str, record_type: RecordType, ttl: u32, value: &str) {
        self.records.lock().unwrap().insert(
            (name.to_string(), record_type),
            DnsRecord {
                name: name.to_string(),
                record_type,
                ttl,
                rrdatas: vec![value.to_string()],
            },
        );
    }

    pub fn record(&self, name: &str, record_type: RecordType) -> Option<DnsRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(name.to_string(), record_type))
            .cloned()
    }

    /// Make every write to `name` fail
    pub fn fail_writes_to(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    fn check_writable(&self, name: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(name) {
            return Err(Error::collaborator("memory-zone", format!("write to {name} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl DnsZone for MemoryZone {
    async fn get_record(&self, name: &str, record_type: RecordType) -> Result<Option<DnsRecord>> {
        self.log.push(format!("get {name} {record_type}"));
        Ok(self.record(name, record_type))
    }

    async fn create_record(
        &self,
        name: &str,
        record_type: RecordType,
        value: &str,
        ttl: u32,
    ) -> Result<()> {
        self.log
            .push(format!("create {name} {record_type} {value} {ttl}"));
        self.check_writable(name)?;
        self.insert(name, record_type, ttl, value);
        Ok(())
    }

    async fn replace_record(&self, existing: &DnsRecord, value: &str) -> Result<()> {
        self.log.push(format!(
            "replace {} {} {} {}",
            existing.name, existing.record_type, value, existing.ttl
        ));
        self.check_writable(&existing.name)?;
        self.insert(&existing.name, existing.record_type, existing.ttl, value);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// An in-memory firewall controller
#[derive(Clone)]
pub struct MemoryFirewall {
    groups: Arc<Mutex<Vec<FirewallGroup>>>,
    fail_login: Arc<Mutex<bool>>,
    failing_groups: Arc<Mutex<HashSet<String>>>,
    log: CallLog,
}

impl MemoryFirewall {
    pub fn new(log: &CallLog) -> Self {
        Self {
            groups: Arc::new(Mutex::new(Vec::new())),
            fail_login: Arc::new(Mutex::new(false)),
            failing_groups: Arc::new(Mutex::new(HashSet::new())),
            log: log.clone(),
        }
    }

    pub fn add_group(&self, name: &str, members: &[&str]) {
        let mut groups = self.groups.lock().unwrap();
        let id = format!("id-{}", groups.len());
        groups.push(FirewallGroup {
            id,
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            extra: serde_json::json!({ "group_type": "ipv6-address-group" }),
        });
    }

    pub fn members(&self, name: &str) -> Option<Vec<String>> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.members.clone())
    }

    pub fn reject_login(&self) {
        *self.fail_login.lock().unwrap() = true;
    }

    pub fn fail_edits_to(&self, name: &str) {
        self.failing_groups.lock().unwrap().insert(name.to_string());
    }
}

#[async_trait]
impl FirewallController for MemoryFirewall {
    async fn login(&self) -> Result<()> {
        self.log.push("login");
        if *self.fail_login.lock().unwrap() {
            return Err(Error::collaborator("memory-firewall", "invalid credentials"));
        }
        Ok(())
    }

    async fn groups(&self) -> Result<Vec<FirewallGroup>> {
        self.log.push("groups");
        Ok(self.groups.lock().unwrap().clone())
    }

    async fn edit_group(&self, group: &FirewallGroup, members: &[String]) -> Result<()> {
        self.log
            .push(format!("edit {} {}", group.name, members.join(",")));
        if self.failing_groups.lock().unwrap().contains(&group.name) {
            return Err(Error::collaborator("memory-firewall", "group is read-only"));
        }
        let mut groups = self.groups.lock().unwrap();
        let stored = groups
            .iter_mut()
            .find(|g| g.id == group.id)
            .ok_or_else(|| Error::not_found(group.id.clone()))?;
        stored.members = members.to_vec();
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        self.log.push("logout");
        Ok(())
    }

    fn controller_name(&self) -> &'static str {
        "memory-firewall"
    }
}

/// An in-memory cluster with services and address pools
#[derive(Clone)]
pub struct MemoryCluster {
    services: Arc<Mutex<BTreeMap<String, Annotations>>>,
    pools: Arc<Mutex<BTreeMap<String, Vec<String>>>>,
    log: CallLog,
}

impl MemoryCluster {
    pub fn new(log: &CallLog) -> Self {
        Self {
            services: Arc::new(Mutex::new(BTreeMap::new())),
            pools: Arc::new(Mutex::new(BTreeMap::new())),
            log: log.clone(),
        }
    }

    pub fn add_service(&self, namespace: &str, name: &str, annotations: &[(&str, &str)]) {
        self.services.lock().unwrap().insert(
            format!("{namespace}/{name}"),
            annotations
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
    }

    pub fn annotation(&self, namespace: &str, name: &str, key: &str) -> Option<String> {
        self.services
            .lock()
            .unwrap()
            .get(&format!("{namespace}/{name}"))
            .and_then(|a| a.get(key).cloned())
    }

    pub fn add_pool(&self, namespace: &str, name: &str, addresses: &[&str]) {
        self.pools.lock().unwrap().insert(
            format!("{namespace}/{name}"),
            addresses.iter().map(|a| a.to_string()).collect(),
        );
    }

    pub fn pool(&self, namespace: &str, name: &str) -> Option<Vec<String>> {
        self.pools
            .lock()
            .unwrap()
            .get(&format!("{namespace}/{name}"))
            .cloned()
    }
}

#[async_trait]
impl ServiceApi for MemoryCluster {
    async fn read_service(&self, namespace: &str, name: &str) -> Result<Annotations> {
        self.log.push(format!("read service {namespace}/{name}"));
        self.services
            .lock()
            .unwrap()
            .get(&format!("{namespace}/{name}"))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("service {namespace}/{name}")))
    }

    async fn patch_service_annotation(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.log
            .push(format!("patch service {namespace}/{name} {key}={value}"));
        let mut services = self.services.lock().unwrap();
        let annotations = services
            .get_mut(&format!("{namespace}/{name}"))
            .ok_or_else(|| Error::not_found(format!("service {namespace}/{name}")))?;
        annotations.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl PoolApi for MemoryCluster {
    async fn get_pool(&self, namespace: &str, name: &str) -> Result<Vec<String>> {
        self.log.push(format!("get pool {namespace}/{name}"));
        self.pool(namespace, name)
            .ok_or_else(|| Error::not_found(format!("pool {namespace}/{name}")))
    }

    async fn patch_pool_addresses(
        &self,
        namespace: &str,
        name: &str,
        addresses: &[String],
    ) -> Result<()> {
        self.log
            .push(format!("patch pool {namespace}/{name} {}", addresses.join(",")));
        self.pools
            .lock()
            .unwrap()
            .insert(format!("{namespace}/{name}"), addresses.to_vec());
        Ok(())
    }
}

/// A notifier that keeps every message
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

/// Every double wired to one call log
pub struct Harness {
    pub log: CallLog,
    pub zone: MemoryZone,
    pub firewall: MemoryFirewall,
    pub cluster: MemoryCluster,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            zone: MemoryZone::new(&log),
            firewall: MemoryFirewall::new(&log),
            cluster: MemoryCluster::new(&log),
            notifier: RecordingNotifier::default(),
            log,
        }
    }

    /// A reconciler with every collaborator wired in
    pub fn reconciler(&self, v4: Option<&str>, v6: Option<&str>) -> Reconciler {
        Reconciler::new(
            Box::new(StaticIpSource::new(v4, v6, &self.log)),
            Box::new(self.notifier.clone()),
        )
        .with_dns(Box::new(self.zone.clone()))
        .with_firewall(Box::new(self.firewall.clone()))
        .with_services(Box::new(self.cluster.clone()))
        .with_pools(Box::new(self.cluster.clone()))
    }
}

/// A configuration touching every kind of target
pub fn full_config() -> SyncConfig {
    SyncConfig::new()
        .with_ipv4_domain("home.example.com")
        .with_ipv6_domain("example.com", "::1")
        .with_ipv6_domain("www.example.com", "::2")
        .with_firewall_group("example.com", "web-v6")
        .with_service(
            "www.example.com",
            v6sync_core::ServiceRef::new("ingress", "nginx"),
        )
        .with_pool(v6sync_core::PoolTarget::new(
            "metallb-system",
            "public",
            "::100",
        ))
}
