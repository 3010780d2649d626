// # UniFi Firewall Groups
//
// This crate provides the `FirewallController` implementation for a UniFi
// Network controller (classic `/api` endpoints).
//
// ## Session
//
// `login` stores the session cookie in the client's cookie jar; every
// following call reuses it until `logout`. Controllers commonly run with a
// self-signed certificate, which can be accepted explicitly.
//
// ## API Reference
//
// - Login: POST `/api/login` `{"username", "password"}`
// - List groups: GET `/api/s/{site}/rest/firewallgroup`
// - Edit group: PUT `/api/s/{site}/rest/firewallgroup/{id}`
// - Logout: POST `/api/logout`
//
// Every response is wrapped as `{"meta": {"rc": "ok"|"error", "msg"}, "data": [...]}`.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use v6sync_core::traits::{FirewallController, FirewallGroup};
use v6sync_core::{Error, Result};

/// Default HTTP timeout for controller requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Site used when none is configured
pub const DEFAULT_SITE: &str = "default";

/// Collaborator name used in errors
const NAME: &str = "unifi";

/// Connection settings for a controller
#[derive(Clone)]
pub struct UnifiSettings {
    /// Controller base URL (e.g. `https://192.168.1.1:8443`)
    pub url: String,
    pub username: String,
    /// ⚠️ NEVER log this value
    pub password: String,
    pub site: String,
    /// Accept self-signed certificates
    pub insecure: bool,
}

impl std::fmt::Debug for UnifiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("site", &self.site)
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// UniFi controller client
///
/// In dry-run mode the session is still opened and groups are listed, but
/// group edits are only logged.
#[derive(Debug)]
pub struct UnifiController {
    settings: UnifiSettings,
    client: reqwest::Client,
    dry_run: bool,
}

impl UnifiController {
    /// Create a controller client
    ///
    /// # Errors
    ///
    /// `Error::Config` when the URL or credentials are empty.
    pub fn new(settings: UnifiSettings, dry_run: bool) -> Result<Self> {
        if settings.url.trim().is_empty() {
            return Err(Error::config("UniFi controller URL cannot be empty"));
        }
        if settings.username.is_empty() || settings.password.is_empty() {
            return Err(Error::config("UniFi username and password are required"));
        }
        if settings.insecure {
            tracing::warn!(
                "Accepting invalid TLS certificates from UniFi controller {}",
                settings.url
            );
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .cookie_store(true)
            .danger_accept_invalid_certs(settings.insecure)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            settings,
            client,
            dry_run,
        })
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.url.trim_end_matches('/'), path)
    }

    /// Path of the site's firewall group collection
    pub fn groups_path(&self) -> String {
        format!("/api/s/{}/rest/firewallgroup", self.settings.site)
    }

    async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Vec<Value>> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::collaborator(NAME, format!("{method} {path} failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read {path} response: {e}")))?;

        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => Error::collaborator(
                    NAME,
                    format!("{method} {path}: not authorized ({status}), check credentials"),
                ),
                404 => Error::not_found(format!("{path} ({status})")),
                _ => Error::collaborator(NAME, format!("{method} {path}: {status} - {}", envelope_message(&text))),
            });
        }

        parse_envelope(&text)
    }
}

#[derive(Deserialize)]
struct Envelope {
    meta: Meta,
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Deserialize)]
struct Meta {
    rc: String,
    #[serde(default)]
    msg: Option<String>,
}

/// Unwrap a controller response, failing unless `meta.rc` is `ok`
pub fn parse_envelope(body: &str) -> Result<Vec<Value>> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| Error::collaborator(NAME, format!("Unexpected response: {e}")))?;
    if envelope.meta.rc != "ok" {
        return Err(Error::collaborator(
            NAME,
            format!(
                "Controller returned rc={} ({})",
                envelope.meta.rc,
                envelope.meta.msg.as_deref().unwrap_or("no message")
            ),
        ));
    }
    Ok(envelope.data)
}

/// The `meta.msg` of an error body, or the body itself
fn envelope_message(body: &str) -> String {
    serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|e| e.meta.msg)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Convert a raw firewall group object.
///
/// The whole object is kept as `extra` so that writing the group back
/// preserves every field the controller sent.
pub fn group_from_value(value: Value) -> Result<FirewallGroup> {
    let field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::collaborator(NAME, format!("Firewall group without '{key}'")))
    };
    let id = field("_id")?;
    let name = field("name")?;
    let members = value
        .get("group_members")
        .and_then(Value::as_array)
        .map(|members| {
            members
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(FirewallGroup {
        id,
        name,
        members,
        extra: value,
    })
}

/// Body for a group edit: the stored object with new members
pub fn edit_payload(group: &FirewallGroup, members: &[String]) -> Value {
    let mut payload = match &group.extra {
        Value::Object(_) => group.extra.clone(),
        _ => serde_json::json!({ "_id": group.id, "name": group.name }),
    };
    payload["group_members"] = Value::from(members.to_vec());
    payload
}

#[async_trait]
impl FirewallController for UnifiController {
    async fn login(&self) -> Result<()> {
        tracing::debug!(
            "Logging in to UniFi controller {} as {}",
            self.settings.url,
            self.settings.username
        );
        let body = serde_json::json!({
            "username": self.settings.username,
            "password": self.settings.password,
        });
        self.call(Method::POST, "/api/login", Some(&body)).await?;
        Ok(())
    }

    async fn groups(&self) -> Result<Vec<FirewallGroup>> {
        self.call(Method::GET, &self.groups_path(), None)
            .await?
            .into_iter()
            .map(group_from_value)
            .collect()
    }

    async fn edit_group(&self, group: &FirewallGroup, members: &[String]) -> Result<()> {
        let path = format!("{}/{}", self.groups_path(), group.id);
        let payload = edit_payload(group, members);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send PUT {} with payload: {}", path, payload);
            return Ok(());
        }

        self.call(Method::PUT, &path, Some(&payload)).await?;
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        self.call(Method::POST, "/api/logout", None).await?;
        Ok(())
    }

    fn controller_name(&self) -> &'static str {
        "unifi"
    }
}
