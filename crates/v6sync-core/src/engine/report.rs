//! Run report: changes and failures collected during one run

use std::fmt;

/// Subsystem tag prefixed to every log line and notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Ipv4,
    Ipv6,
    Dns,
    Firewall,
    Service,
    Pool,
    Run,
}

impl Subsystem {
    /// Short tag used in messages
    pub fn tag(&self) -> &'static str {
        match self {
            Subsystem::Ipv4 => "ipv4",
            Subsystem::Ipv6 => "ipv6",
            Subsystem::Dns => "dns",
            Subsystem::Firewall => "firewall",
            Subsystem::Service => "service",
            Subsystem::Pool => "pool",
            Subsystem::Run => "run",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.tag())
    }
}

/// Ordered changes and failures of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    changes: Vec<String>,
    failures: Vec<String>,
}

impl RunReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an applied change, returning the tagged message
    pub fn record_change(&mut self, subsystem: Subsystem, message: impl fmt::Display) -> String {
        let line = format!("{subsystem} {message}");
        self.changes.push(line.clone());
        line
    }

    /// Record a failure, returning the tagged message
    pub fn record_failure(&mut self, subsystem: Subsystem, message: impl fmt::Display) -> String {
        let line = format!("{subsystem} {message}");
        self.failures.push(line.clone());
        line
    }

    /// Changes in the order they were applied
    pub fn changes(&self) -> &[String] {
        &self.changes
    }

    /// Failures in the order they happened
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Whether anything was changed
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Whether every target succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Consolidated notification text listing every change
    pub fn summary(&self) -> String {
        let mut text = format!("v6sync applied {} change(s):", self.changes.len());
        for change in &self.changes {
            text.push_str("\n- ");
            text.push_str(change);
        }
        if !self.failures.is_empty() {
            text.push_str(&format!("\n{} target(s) failed", self.failures.len()));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_tagged() {
        let mut report = RunReport::new();
        let line = report.record_change(Subsystem::Dns, "example.com. AAAA created");
        assert_eq!(line, "[dns] example.com. AAAA created");
        assert_eq!(report.changes(), ["[dns] example.com. AAAA created"]);
        assert!(report.is_clean());
    }

    #[test]
    fn summary_lists_changes_and_failure_count() {
        let mut report = RunReport::new();
        report.record_change(Subsystem::Dns, "a");
        report.record_change(Subsystem::Pool, "b");
        report.record_failure(Subsystem::Firewall, "c");

        assert_eq!(
            report.summary(),
            "v6sync applied 2 change(s):\n- [dns] a\n- [pool] b\n1 target(s) failed"
        );
    }
}
