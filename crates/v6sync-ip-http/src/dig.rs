//! `dig`-based IP source
//!
//! OpenDNS resolvers answer `myip.opendns.com` with the address the query
//! came from. Forcing the transport family (`-4`/`-6`) makes the answer the
//! public address of that family.

use std::process::Stdio;

use tokio::process::Command;

use crate::is_family;
use v6sync_core::traits::{IpSource, IpVersion};
use v6sync_core::{Error, Result};

/// Default `dig` executable
const DIG: &str = "dig";

/// IP source querying OpenDNS through `dig`
#[derive(Debug, Clone)]
pub struct DigIpSource {
    program: String,
}

impl DigIpSource {
    /// Use `dig` from `PATH`
    pub fn new() -> Self {
        Self::with_program(DIG)
    }

    /// Use a specific `dig` executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DigIpSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments for one lookup
pub fn dig_args(version: IpVersion) -> [&'static str; 6] {
    match version {
        IpVersion::V4 => [
            "+short",
            "-4",
            "A",
            "myip.opendns.com",
            "@resolver1.opendns.com",
            "+time=5",
        ],
        IpVersion::V6 => [
            "+short",
            "-6",
            "AAAA",
            "myip.opendns.com",
            "@resolver1.ipv6-sandbox.opendns.com",
            "+time=5",
        ],
    }
}

/// First line of `dig +short` output that is an address of the family.
///
/// `+short` may also print CNAME targets or `;;` diagnostics; those are
/// skipped.
pub fn parse_output(version: IpVersion, stdout: &str) -> Result<String> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| is_family(version, line))
        .map(str::to_string)
        .ok_or_else(|| {
            Error::detection(format!(
                "dig returned no {version} answer: '{}'",
                stdout.trim()
            ))
        })
}

#[async_trait::async_trait]
impl IpSource for DigIpSource {
    async fn current(&self, version: IpVersion) -> Result<String> {
        let args = dig_args(version);
        tracing::debug!("Running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::detection(format!("Failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(Error::detection(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_output(version, &String::from_utf8_lossy(&output.stdout))
    }

    fn source_name(&self) -> &'static str {
        "dig"
    }
}
