// # Notifier Trait
//
// Human-facing notifications (chat webhook, etc.).
//
// Sending is best effort: a notifier never returns an error and never makes
// the run fail. Implementations log their own delivery problems.

use async_trait::async_trait;

/// Trait for notification sinks
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message, swallowing any delivery failure
    async fn send(&self, text: &str);
}

/// Notifier that only writes to the log
///
/// Used when no notification endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) {
        tracing::debug!("notification (log only): {}", text);
    }
}
