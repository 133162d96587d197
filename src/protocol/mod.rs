//! Protocol descriptors: the static shape of one protocol's opening exchange.

pub mod catalog;
mod custom;

pub use catalog::{builtin, find};
pub use custom::CustomProtocol;

use std::fmt;
use std::num::NonZeroU16;
use thiserror::Error;

/// The single exchange step a protocol needs to prove the peer speaks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange<'a> {
    /// Client talks first. Any reply counts as success; an empty payload means
    /// the transport (or TLS) handshake alone is the success criterion.
    SendFirst(&'a [u8]),
    /// Server talks first. The first read must start with this prefix.
    ReceiveFirst(&'a [u8]),
}

/// Describes how to recognise a service without implementing its protocol.
///
/// The engine only ever looks at [`HandshakeProtocol::exchange`] to decide what
/// to do, so a new protocol is just a new implementation of this trait.
pub trait HandshakeProtocol: Send + Sync {
    fn name(&self) -> &str;
    fn default_port(&self) -> NonZeroU16;
    fn requires_tls(&self) -> bool;
    fn exchange(&self) -> Exchange<'_>;
}

impl<T: HandshakeProtocol + ?Sized> HandshakeProtocol for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn default_port(&self) -> NonZeroU16 {
        (**self).default_port()
    }

    fn requires_tls(&self) -> bool {
        (**self).requires_tls()
    }

    fn exchange(&self) -> Exchange<'_> {
        (**self).exchange()
    }
}

impl fmt::Debug for dyn HandshakeProtocol + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeProtocol")
            .field("name", &self.name())
            .field("default_port", &self.default_port())
            .field("requires_tls", &self.requires_tls())
            .field("exchange", &self.exchange())
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("protocol port must be between 1 and 65535")]
    ZeroPort,
    #[error("receive-first protocol needs a non-empty expected prefix")]
    EmptyExpectedPrefix,
    #[error("unknown protocol `{0}`")]
    UnknownProtocol(String),
}
