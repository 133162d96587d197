use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// The suspension points of a probe, each raced against the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    TlsHandshake,
    Send,
    Receive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Connect => "connect",
            Stage::TlsHandshake => "tls handshake",
            Stage::Send => "send",
            Stage::Receive => "receive",
        };
        write!(f, "{label}")
    }
}

/// Why a single handshake attempt failed. Never escapes the engine: it is
/// logged, optionally handed to the caller's exception handler, and turned
/// into `false`.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("{stage} timed out")]
    TimedOut { stage: Stage },

    #[error("{stage} cancelled")]
    Cancelled { stage: Stage },

    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    #[error("TLS setup failed: {0}")]
    TlsSetup(#[from] openssl::error::ErrorStack),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(#[source] openssl::ssl::Error),

    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
}

impl HandshakeError {
    /// True for timeouts and cancellations, which are expected outcomes rather
    /// than transport faults.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            HandshakeError::TimedOut { .. } | HandshakeError::Cancelled { .. }
        )
    }

    pub fn stage(&self) -> Stage {
        match self {
            HandshakeError::TimedOut { stage } | HandshakeError::Cancelled { stage } => *stage,
            HandshakeError::Connect(_) => Stage::Connect,
            HandshakeError::TlsSetup(_) | HandshakeError::TlsHandshake(_) => Stage::TlsHandshake,
            HandshakeError::Send(_) => Stage::Send,
            HandshakeError::Receive(_) => Stage::Receive,
        }
    }
}

/// Terminal failures of a whole host probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("resolving {host} did not finish within {timeout:?}")]
    ResolveTimeout { host: String, timeout: Duration },

    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },
}
