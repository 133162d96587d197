//! The handshake engine: resolution, per-address handshakes and the deadline
//! machinery they share.

pub mod deadline;
pub mod handshake;
pub mod options;
pub mod probe;
pub mod resolver;
pub mod tls;

pub use deadline::{cancel_pair, CancelHandle, CancelSignal, Deadline, Interrupted};
pub use handshake::{test_handshake, READ_BUFFER_LEN};
pub use options::{ExceptionHandler, ProbeOptions, DEFAULT_TIMEOUT};
pub use probe::{probe_host, probe_host_with};
pub use resolver::{resolve_addresses, Resolve, SystemResolver};
pub use tls::CertificateValidator;
