// # Firewall Controller Trait
//
// Defines the interface to a firewall controller holding named address
// groups (e.g. a UniFi Network controller).
//
// A run uses one session: `login`, `groups`, any number of `edit_group`
// calls, then `logout`.

use async_trait::async_trait;

/// An address group as reported by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallGroup {
    /// Controller-specific group ID
    pub id: String,
    /// Human-readable group name (what configuration refers to)
    pub name: String,
    /// Current members
    pub members: Vec<String>,
    /// Any additional controller-specific fields needed to write the group back
    pub extra: serde_json::Value,
}

/// Trait for firewall controller implementations
#[async_trait]
pub trait FirewallController: Send + Sync {
    /// Open a session
    async fn login(&self) -> Result<(), crate::Error>;

    /// List all address groups
    async fn groups(&self) -> Result<Vec<FirewallGroup>, crate::Error>;

    /// Replace the member list of a group
    async fn edit_group(&self, group: &FirewallGroup, members: &[String])
    -> Result<(), crate::Error>;

    /// Close the session
    async fn logout(&self) -> Result<(), crate::Error>;

    /// Get the controller name (for logging/debugging)
    fn controller_name(&self) -> &'static str;
}
