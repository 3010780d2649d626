//! Environment configuration
//!
//! Read once at startup. Every malformed or missing value is reported here,
//! before any network call, as `ConfigMissing` or `Config`.

use tracing::Level;

use v6sync_core::config::{
    DEFAULT_LB_ANNOTATION, DEFAULT_TTL, parse_domain_suffixes, parse_firewall_groups, parse_list,
    parse_pools, parse_services,
};
use v6sync_core::{Error, Result, SyncConfig};

/// Default IPv4 lookup endpoint
const DEFAULT_LOOKUP_URL4: &str = "https://api.ipify.org";

/// Default IPv6 lookup endpoint
const DEFAULT_LOOKUP_URL6: &str = "https://api6.ipify.org";

/// Cloud DNS access
pub struct GcloudEnv {
    pub project: String,
    pub zone: String,
    /// `None` means the metadata server
    pub access_token: Option<String>,
}

impl std::fmt::Debug for GcloudEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcloudEnv")
            .field("project", &self.project)
            .field("zone", &self.zone)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// UniFi controller access
pub struct UnifiEnv {
    pub url: String,
    pub user: String,
    pub password: String,
    pub site: String,
    pub insecure: bool,
}

impl std::fmt::Debug for UnifiEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiEnv")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .field("site", &self.site)
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// Kubernetes API access
pub enum KubeEnv {
    /// Mounted service account
    InCluster,
    /// `KUBE_API_URL` + `KUBE_TOKEN`
    Explicit { url: String, token: String },
}

impl std::fmt::Debug for KubeEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KubeEnv::InCluster => f.write_str("InCluster"),
            KubeEnv::Explicit { url, .. } => f
                .debug_struct("Explicit")
                .field("url", url)
                .field("token", &"<REDACTED>")
                .finish(),
        }
    }
}

/// How public addresses are detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpLookup {
    Http { url4: String, url6: String },
    Dig,
}

/// Application configuration
#[derive(Debug)]
pub struct Config {
    /// Targets handed to the reconciler
    pub sync: SyncConfig,
    /// Present when DNS targets are configured
    pub gcloud: Option<GcloudEnv>,
    /// Present when firewall groups are configured
    pub unifi: Option<UnifiEnv>,
    /// Present when services or pools are configured
    pub kube: Option<KubeEnv>,
    pub ip_lookup: IpLookup,
    pub webhook_url: Option<String>,
    pub dry_run: bool,
    pub log_level: Level,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Unset and blank are the same
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str, why: &str| {
            var(key).ok_or_else(|| Error::config_missing(format!("{key} is required {why}")))
        };

        let mut sync = SyncConfig::new();
        sync.ipv4_domains = parse_list(&var("GCLOUD_DNS_NAME4").unwrap_or_default());
        sync.ipv6_domains = parse_domain_suffixes(&var("GCLOUD_DNS_NAME6").unwrap_or_default())?;
        sync.firewall_groups = parse_firewall_groups(&var("UNIFI_GROUP6").unwrap_or_default())?;
        sync.services = parse_services(&var("K8S_SERVICE6").unwrap_or_default())?;
        sync.pools = parse_pools(&var("K8S_POOL6").unwrap_or_default())?;
        sync.default_ttl = match var("DNS_TTL") {
            Some(ttl) => ttl
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("DNS_TTL must be a positive integer, got '{ttl}'")))?,
            None => DEFAULT_TTL,
        };
        sync.service_annotation =
            var("K8S_LB_ANNOTATION").unwrap_or_else(|| DEFAULT_LB_ANNOTATION.to_string());
        sync.validate()?;

        let gcloud = if sync.has_dns_targets() {
            let why = "when GCLOUD_DNS_NAME4/GCLOUD_DNS_NAME6 are set";
            Some(GcloudEnv {
                project: required("GCLOUD_PROJECT", why)?,
                zone: required("GCLOUD_DNS_ZONE", why)?,
                access_token: var("GCLOUD_ACCESS_TOKEN"),
            })
        } else {
            None
        };

        let unifi = if sync.firewall_groups.is_empty() {
            None
        } else {
            let why = "when UNIFI_GROUP6 is set";
            Some(UnifiEnv {
                url: required("UNIFI_URL", why)?,
                user: required("UNIFI_USER", why)?,
                password: required("UNIFI_PASSWORD", why)?,
                site: var("UNIFI_SITE").unwrap_or_else(|| "default".to_string()),
                insecure: parse_bool("UNIFI_INSECURE", var("UNIFI_INSECURE"))?,
            })
        };

        let kube = if sync.services.is_empty() && sync.pools.is_empty() {
            None
        } else {
            match (var("KUBE_API_URL"), var("KUBE_TOKEN")) {
                (Some(url), Some(token)) => Some(KubeEnv::Explicit { url, token }),
                (None, None) => Some(KubeEnv::InCluster),
                _ => {
                    return Err(Error::config(
                        "KUBE_API_URL and KUBE_TOKEN must be set together",
                    ));
                }
            }
        };

        let ip_lookup = match var("IP_LOOKUP").as_deref().map(str::trim) {
            None | Some("http") => IpLookup::Http {
                url4: var("IP_LOOKUP_URL4").unwrap_or_else(|| DEFAULT_LOOKUP_URL4.to_string()),
                url6: var("IP_LOOKUP_URL6").unwrap_or_else(|| DEFAULT_LOOKUP_URL6.to_string()),
            },
            Some("dig") => IpLookup::Dig,
            Some(other) => {
                return Err(Error::config(format!(
                    "IP_LOOKUP '{other}' is not supported. Supported: http, dig"
                )));
            }
        };

        let dry_run = match var("V6SYNC_MODE").as_deref().map(str::trim) {
            None | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => {
                return Err(Error::config(format!(
                    "V6SYNC_MODE '{other}' is not valid. Valid modes: live, dry-run"
                )));
            }
        };

        Ok(Self {
            sync,
            gcloud,
            unifi,
            kube,
            ip_lookup,
            webhook_url: var("NOTIFY_WEBHOOK_URL"),
            dry_run,
            log_level: parse_log_level(var("V6SYNC_LOG_LEVEL").as_deref())?,
        })
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("false" | "0" | "no") => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some(other) => Err(Error::config(format!(
            "{key} must be true or false, got '{other}'"
        ))),
    }
}

fn parse_log_level(value: Option<&str>) -> Result<Level> {
    match value.map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("info") => Ok(Level::INFO),
        Some("trace") => Ok(Level::TRACE),
        Some("debug") => Ok(Level::DEBUG),
        Some("warn") => Ok(Level::WARN),
        Some("error") => Ok(Level::ERROR),
        Some(other) => Err(Error::config(format!(
            "V6SYNC_LOG_LEVEL '{other}' is not valid. \
            Valid levels: trace, debug, info, warn, error"
        ))),
    }
}
