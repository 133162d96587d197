use clap::ValueEnum;
use handshake_check::error::ProbeError;
use handshake_check::HandshakeProtocol;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::num::NonZeroU16;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub hosts: Vec<String>,
    pub input: Option<String>,
    pub protocols: Vec<Arc<dyn HandshakeProtocol>>,
    pub port: Option<NonZeroU16>,
    pub timeout: Duration,
    pub concurrency: usize,
    pub verify_certificates: bool,
    pub output: OutputConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let protocols: Vec<&str> = self.protocols.iter().map(|p| p.name()).collect();
        f.debug_struct("Config")
            .field("hosts", &self.hosts)
            .field("input", &self.input)
            .field("protocols", &protocols)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .field("concurrency", &self.concurrency)
            .field("verify_certificates", &self.verify_certificates)
            .field("output", &self.output)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Clone, Debug, Serialize, Deserialize, ValueEnum)]
pub enum OutputFormat {
    Jsonl,
    Pretty,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Jsonl => write!(f, "jsonl"),
            OutputFormat::Pretty => write!(f, "pretty"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Reachable,
    Unreachable,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub host: String,
    pub protocol: String,
    pub port: u16,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u128,
    pub timestamp: String,
}

impl ProbeReport {
    /// `last_failure` is the most recent transport error seen while trying
    /// addresses; it is only shown when no address succeeded.
    pub fn new(
        host: &str,
        protocol: &dyn HandshakeProtocol,
        port: u16,
        result: Result<Option<IpAddr>, ProbeError>,
        last_failure: Option<String>,
        elapsed: Duration,
    ) -> Self {
        let (status, address, error) = match result {
            Ok(Some(ip)) => (Status::Reachable, Some(ip.to_string()), None),
            Ok(None) => (Status::Unreachable, None, last_failure),
            Err(err) => (Status::Error, None, Some(err.to_string())),
        };

        Self {
            host: host.to_string(),
            protocol: protocol.name().to_string(),
            port,
            status,
            address,
            error,
            elapsed_ms: elapsed.as_millis(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }

    pub fn status_text(&self) -> &'static str {
        match self.status {
            Status::Reachable => "reachable",
            Status::Unreachable => "unreachable",
            Status::Error => "error",
        }
    }
}
