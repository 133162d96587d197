//! Checks whether a TCP service speaks an expected protocol by performing only
//! its opening exchange (or a TLS handshake), one attempt per resolved address.

pub mod engine;
pub mod error;
pub mod protocol;
pub mod util;

pub use engine::{
    cancel_pair, probe_host, probe_host_with, test_handshake, CancelHandle, CancelSignal,
    CertificateValidator, ProbeOptions,
};
pub use error::{HandshakeError, ProbeError, Stage};
pub use protocol::{CustomProtocol, Exchange, HandshakeProtocol, ProtocolError};
