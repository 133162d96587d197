use super::deadline::CancelSignal;
use super::tls::CertificateValidator;
use crate::error::HandshakeError;
use std::fmt;
use std::num::NonZeroU16;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Observes transport failures. Has no influence on the verdict.
pub type ExceptionHandler = Arc<dyn Fn(&HandshakeError) + Send + Sync>;

/// Per-probe knobs. Everything is optional; see the field docs for defaults.
#[derive(Clone, Default)]
pub struct ProbeOptions {
    /// Overrides the protocol's default port.
    pub port: Option<NonZeroU16>,
    /// Budget for each address attempt, and for resolution. Defaults to
    /// [`DEFAULT_TIMEOUT`].
    pub timeout: Option<Duration>,
    /// Name sent as SNI and checked by certificate validation. Defaults to the
    /// textual IP address.
    pub server_name: Option<String>,
    pub exception_handler: Option<ExceptionHandler>,
    /// Defaults to accepting any certificate.
    pub certificate_validator: Option<CertificateValidator>,
    pub cancel: Option<CancelSignal>,
}

impl ProbeOptions {
    pub fn with_port(mut self, port: NonZeroU16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    pub fn with_exception_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&HandshakeError) + Send + Sync + 'static,
    {
        self.exception_handler = Some(Arc::new(handler));
        self
    }

    pub fn with_certificate_validator(mut self, validator: CertificateValidator) -> Self {
        self.certificate_validator = Some(validator);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn effective_timeout(&self) -> Duration {
        effective_timeout(self.timeout)
    }

    pub(crate) fn report(&self, err: &HandshakeError) {
        if let Some(handler) = &self.exception_handler {
            handler(err);
        }
    }
}

pub(crate) fn effective_timeout(timeout: Option<Duration>) -> Duration {
    timeout.unwrap_or(DEFAULT_TIMEOUT)
}

impl fmt::Debug for ProbeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeOptions")
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .field("server_name", &self.server_name)
            .field("exception_handler", &self.exception_handler.is_some())
            .field("certificate_validator", &self.certificate_validator)
            .field("cancel", &self.cancel)
            .finish()
    }
}
