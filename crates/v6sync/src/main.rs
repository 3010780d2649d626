// # v6sync
//
// One-shot reconciliation job, meant to be run by a scheduler (cron,
// systemd timer, Kubernetes CronJob).
//
// This binary is a thin integration layer:
// 1. Read configuration from environment variables
// 2. Initialize logging and a single-threaded runtime
// 3. Build the collaborators the configured targets need
// 4. Run the reconciler once and exit
//
// ## Configuration
//
// ### Targets
// - `GCLOUD_DNS_NAME4`: Comma-separated domains tracking the public IPv4
// - `GCLOUD_DNS_NAME6`: Comma-separated `domain=suffix` pairs
// - `UNIFI_GROUP6`: Comma-separated `domain=group` pairs
// - `K8S_SERVICE6`: Comma-separated `domain=namespace/service` pairs
// - `K8S_POOL6`: Comma-separated `namespace/pool/suffix` triples
//
// ### Cloud DNS
// - `GCLOUD_PROJECT`, `GCLOUD_DNS_ZONE`: Required with any DNS target
// - `GCLOUD_ACCESS_TOKEN`: Bearer token (default: metadata server)
// - `DNS_TTL`: TTL for created records (default: 300)
//
// ### UniFi
// - `UNIFI_URL`, `UNIFI_USER`, `UNIFI_PASSWORD`: Required with `UNIFI_GROUP6`
// - `UNIFI_SITE`: Site name (default: default)
// - `UNIFI_INSECURE`: Accept self-signed certificates
//
// ### Kubernetes
// - `KUBE_API_URL`, `KUBE_TOKEN`: Out-of-cluster access (default: service account)
// - `K8S_LB_ANNOTATION`: Load-balancer IP annotation key
//
// ### Runtime
// - `IP_LOOKUP`: `http` (default) or `dig`
// - `IP_LOOKUP_URL4`, `IP_LOOKUP_URL6`: HTTP lookup endpoints
// - `NOTIFY_WEBHOOK_URL`: Chat webhook for notifications
// - `V6SYNC_MODE`: `dry-run` reads remote state but writes nothing
// - `V6SYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export GCLOUD_PROJECT=my-project
// export GCLOUD_DNS_ZONE=home
// export GCLOUD_DNS_NAME6=example.com=::1,www.example.com=::2
// export UNIFI_GROUP6=example.com=web-v6
// export UNIFI_URL=https://192.168.1.1:8443 UNIFI_USER=v6sync UNIFI_PASSWORD=...
//
// v6sync
// ```

mod config;

use anyhow::Result;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

use config::{Config, IpLookup};
use v6sync_core::traits::LogNotifier;
use v6sync_core::{IpSource, Notifier, Reconciler};
use v6sync_ip_http::{DigIpSource, HttpIpSource};

/// Exit codes
///
/// - 0: The run completed (individual targets may have failed)
/// - 1: Configuration error, nothing was touched
/// - 2: Runtime setup error
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    Completed = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::RuntimeError.into();
    }

    info!(
        "Starting v6sync {}{}",
        env!("CARGO_PKG_VERSION"),
        if config.dry_run { " (dry-run)" } else { "" }
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let reconciler = match build_reconciler(&config) {
            Ok(reconciler) => reconciler,
            Err(e) => return setup_failure(&e),
        };

        match reconciler.run(&config.sync).await {
            Ok(report) => {
                if !report.is_clean() {
                    warn!("{} target(s) failed, see above", report.failures().len());
                }
                SyncExitCode::Completed
            }
            Err(e) if e.is_fatal() => {
                error!("Configuration error: {}", e);
                SyncExitCode::ConfigError
            }
            Err(e) => {
                error!("Run aborted: {}", e);
                SyncExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Exit code for an error raised while wiring collaborators
fn setup_failure(e: &anyhow::Error) -> SyncExitCode {
    match e.downcast_ref::<v6sync_core::Error>() {
        Some(core) if core.is_fatal() => {
            error!("Configuration error: {:#}", e);
            SyncExitCode::ConfigError
        }
        _ => {
            error!("Setup error: {:#}", e);
            SyncExitCode::RuntimeError
        }
    }
}

/// Wire the collaborators the configured targets need
///
/// A target class whose collaborator is compiled out is left unwired; the
/// reconciler then rejects the configuration as missing.
fn build_reconciler(config: &Config) -> Result<Reconciler> {
    let ip_source: Box<dyn IpSource> = match &config.ip_lookup {
        IpLookup::Http { url4, url6 } => Box::new(HttpIpSource::with_urls(url4, url6)),
        IpLookup::Dig => Box::new(DigIpSource::new()),
    };
    info!("IP lookup: {}", ip_source.source_name());

    let mut reconciler = Reconciler::new(ip_source, notifier(config)?);

    if let Some(gcloud) = &config.gcloud {
        reconciler = with_dns(reconciler, gcloud, config.dry_run)?;
    }
    if let Some(unifi) = &config.unifi {
        reconciler = with_firewall(reconciler, unifi, config.dry_run)?;
    }
    if let Some(kube) = &config.kube {
        reconciler = with_cluster(reconciler, kube, config.dry_run)?;
    }

    Ok(reconciler)
}

#[cfg(feature = "webhook")]
fn notifier(config: &Config) -> Result<Box<dyn Notifier>> {
    use anyhow::Context;

    match &config.webhook_url {
        Some(url) => {
            let webhook = v6sync_notify_webhook::WebhookNotifier::new(url)
                .context("NOTIFY_WEBHOOK_URL")?;
            info!("Notifications: webhook ({})", webhook.host());
            Ok(Box::new(webhook))
        }
        None => Ok(Box::new(LogNotifier)),
    }
}

#[cfg(not(feature = "webhook"))]
fn notifier(config: &Config) -> Result<Box<dyn Notifier>> {
    if config.webhook_url.is_some() {
        warn!("NOTIFY_WEBHOOK_URL is set but webhook support is not compiled in");
    }
    Ok(Box::new(LogNotifier))
}

#[cfg(feature = "gcloud")]
fn with_dns(reconciler: Reconciler, env: &config::GcloudEnv, dry_run: bool) -> Result<Reconciler> {
    use v6sync_provider_gcloud::{CloudDnsZone, TokenSource};

    let token = match &env.access_token {
        Some(token) => TokenSource::fixed(token.clone()),
        None => TokenSource::metadata(),
    };
    let zone = CloudDnsZone::new(env.project.clone(), env.zone.clone(), token, dry_run)?;
    info!("DNS: Cloud DNS zone {}/{}", env.project, env.zone);
    Ok(reconciler.with_dns(Box::new(zone)))
}

#[cfg(not(feature = "gcloud"))]
fn with_dns(reconciler: Reconciler, _env: &config::GcloudEnv, _dry_run: bool) -> Result<Reconciler> {
    warn!("DNS targets configured but Cloud DNS support is not compiled in");
    Ok(reconciler)
}

#[cfg(feature = "unifi")]
fn with_firewall(reconciler: Reconciler, env: &config::UnifiEnv, dry_run: bool) -> Result<Reconciler> {
    use v6sync_firewall_unifi::{UnifiController, UnifiSettings};

    let controller = UnifiController::new(
        UnifiSettings {
            url: env.url.clone(),
            username: env.user.clone(),
            password: env.password.clone(),
            site: env.site.clone(),
            insecure: env.insecure,
        },
        dry_run,
    )?;
    info!("Firewall: UniFi controller {} (site {})", env.url, env.site);
    Ok(reconciler.with_firewall(Box::new(controller)))
}

#[cfg(not(feature = "unifi"))]
fn with_firewall(reconciler: Reconciler, _env: &config::UnifiEnv, _dry_run: bool) -> Result<Reconciler> {
    warn!("Firewall groups configured but UniFi support is not compiled in");
    Ok(reconciler)
}

#[cfg(feature = "kube")]
fn with_cluster(reconciler: Reconciler, env: &config::KubeEnv, dry_run: bool) -> Result<Reconciler> {
    use v6sync_kube::KubeClient;

    let client = |dry_run| match env {
        config::KubeEnv::InCluster => KubeClient::in_cluster(dry_run),
        config::KubeEnv::Explicit { url, token } => KubeClient::new(url.clone(), token.clone(), dry_run),
    };
    let services = client(dry_run)?;
    info!("Cluster: Kubernetes API {}", services.api_url());
    let pools = client(dry_run)?;

    Ok(reconciler
        .with_services(Box::new(services))
        .with_pools(Box::new(pools)))
}

#[cfg(not(feature = "kube"))]
fn with_cluster(reconciler: Reconciler, _env: &config::KubeEnv, _dry_run: bool) -> Result<Reconciler> {
    warn!("Services or pools configured but Kubernetes support is not compiled in");
    Ok(reconciler)
}
