use crate::model::{Config, OutputConfig, OutputFormat};
use clap::{ArgAction, Parser};
use handshake_check::protocol::{self, CustomProtocol, Exchange, HandshakeProtocol};
use handshake_check::util::hex::{from_hex, to_hex};
use std::fmt::Write;
use std::num::NonZeroU16;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Checks TCP services by their opening handshake",
    long_about = None
)]
pub struct Cli {
    /// Host name or address to probe (repeatable)
    #[arg(short = 'H', long = "host", value_name = "HOST")]
    pub hosts: Vec<String>,

    /// File containing host names (one per line)
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<String>,

    /// Built-in protocol to check (repeatable); all of them when omitted
    #[arg(short = 'P', long = "protocol", value_name = "NAME")]
    pub protocols: Vec<String>,

    /// Port overriding each protocol's default
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Budget per address attempt and for resolution, in milliseconds
    #[arg(long = "timeout-ms", default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Probes in flight at once
    #[arg(long = "concurrency", default_value_t = 16)]
    pub concurrency: usize,

    /// Validate TLS certificates against the system trust store
    #[arg(long = "verify-certificates", action = ArgAction::SetTrue)]
    pub verify_certificates: bool,

    /// Name of the ad-hoc protocol
    #[arg(long = "custom-name", default_value = "CUSTOM")]
    pub custom_name: String,

    /// Default port of the ad-hoc protocol
    #[arg(long = "custom-port", value_name = "PORT")]
    pub custom_port: Option<u16>,

    /// Wrap the ad-hoc protocol in TLS
    #[arg(long = "custom-tls", action = ArgAction::SetTrue)]
    pub custom_tls: bool,

    /// Ad-hoc send-first payload, hex encoded (may be empty with --custom-tls)
    #[arg(long = "send-hex", value_name = "HEX", conflicts_with = "expect_hex")]
    pub send_hex: Option<String>,

    /// Ad-hoc receive-first prefix, hex encoded
    #[arg(long = "expect-hex", value_name = "HEX")]
    pub expect_hex: Option<String>,

    /// Print the built-in protocols and exit
    #[arg(long = "list-protocols", action = ArgAction::SetTrue)]
    pub list_protocols: bool,

    /// Output format
    #[arg(long = "output", default_value_t = OutputFormat::Jsonl)]
    pub output: OutputFormat,

    /// Shorthand for --output pretty
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pub pretty: bool,
}

impl Cli {
    pub fn into_config(self) -> anyhow::Result<Config> {
        if self.hosts.is_empty() && self.input.is_none() {
            anyhow::bail!("at least one --host or an --input file is required");
        }

        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be greater than zero");
        }

        let port = match self.port {
            Some(p) => Some(NonZeroU16::new(p).ok_or_else(|| anyhow::anyhow!("port must be non-zero"))?),
            None => None,
        };

        let custom = self.custom_protocol()?;

        let mut protocols: Vec<Arc<dyn HandshakeProtocol>> = Vec::new();
        for name in &self.protocols {
            protocols.push(Arc::new(protocol::find(name)?));
        }
        if let Some(custom) = custom {
            protocols.push(Arc::new(custom));
        } else if protocols.is_empty() {
            protocols.extend(
                protocol::builtin()
                    .into_iter()
                    .map(|p| Arc::new(p) as Arc<dyn HandshakeProtocol>),
            );
        }

        Ok(Config {
            hosts: self.hosts,
            input: self.input,
            protocols,
            port,
            timeout: Duration::from_millis(self.timeout_ms),
            concurrency: self.concurrency,
            verify_certificates: self.verify_certificates,
            output: OutputConfig {
                format: if self.pretty {
                    OutputFormat::Pretty
                } else {
                    self.output
                },
            },
        })
    }

    fn custom_protocol(&self) -> anyhow::Result<Option<CustomProtocol>> {
        let payload_given = self.send_hex.is_some() || self.expect_hex.is_some();
        if !payload_given {
            if self.custom_port.is_some() || self.custom_tls {
                anyhow::bail!("--custom-port/--custom-tls need --send-hex or --expect-hex");
            }
            return Ok(None);
        }

        let Some(port) = self.custom_port else {
            anyhow::bail!("--custom-port is required for an ad-hoc protocol");
        };

        let custom = match (&self.send_hex, &self.expect_hex) {
            (Some(hex), None) => {
                CustomProtocol::send_first(&self.custom_name, port, self.custom_tls, from_hex(hex)?)?
            }
            (None, Some(hex)) => CustomProtocol::receive_first(
                &self.custom_name,
                port,
                self.custom_tls,
                from_hex(hex)?,
            )?,
            _ => anyhow::bail!("--send-hex and --expect-hex are mutually exclusive"),
        };
        Ok(Some(custom))
    }
}

/// One line per built-in protocol: name, port, TLS, exchange shape and bytes.
pub fn render_catalog() -> String {
    let mut out = String::new();
    for p in protocol::builtin() {
        let (shape, bytes) = match p.exchange() {
            Exchange::SendFirst(bytes) => ("send", bytes),
            Exchange::ReceiveFirst(bytes) => ("expect", bytes),
        };
        let tls = if p.requires_tls() { "tls" } else { "tcp" };
        let _ = writeln!(
            out,
            "{:<6} {:>5} {} {:<6} {}",
            p.name(),
            p.default_port(),
            tls,
            shape,
            to_hex(bytes)
        );
    }
    out
}
