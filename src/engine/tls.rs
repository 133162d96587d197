//! TLS upgrade of a raw connection.
//!
//! The default policy accepts any certificate: a probe answers "does this
//! endpoint complete a TLS handshake", not "should this endpoint be trusted".
//! Callers wanting the latter pass [`CertificateValidator::system_trust`] or a
//! custom validator.

use super::deadline::Deadline;
use crate::error::{HandshakeError, Stage};
use openssl::error::ErrorStack;
use openssl::ssl::{Ssl, SslConnector, SslMethod, SslVerifyMode};
use openssl::x509::X509StoreContextRef;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use tokio::net::TcpStream;
use tokio_openssl::SslStream;

/// Called once per certificate in the peer chain with OpenSSL's own verdict
/// and the store context (current certificate, chain, verification error).
/// Returning `false` aborts the handshake.
pub type VerifyFn = dyn Fn(bool, &mut X509StoreContextRef) -> bool + Send + Sync;

#[derive(Clone)]
enum Policy {
    AcceptAny,
    SystemTrust,
    Custom(Arc<VerifyFn>),
}

#[derive(Clone)]
pub struct CertificateValidator {
    policy: Policy,
}

impl CertificateValidator {
    pub fn accept_any() -> Self {
        Self {
            policy: Policy::AcceptAny,
        }
    }

    /// Chain and host name checked against the system trust store.
    pub fn system_trust() -> Self {
        Self {
            policy: Policy::SystemTrust,
        }
    }

    pub fn from_fn<F>(verify: F) -> Self
    where
        F: Fn(bool, &mut X509StoreContextRef) -> bool + Send + Sync + 'static,
    {
        Self {
            policy: Policy::Custom(Arc::new(verify)),
        }
    }
}

impl Default for CertificateValidator {
    fn default() -> Self {
        Self::accept_any()
    }
}

impl fmt::Debug for CertificateValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.policy {
            Policy::AcceptAny => "AcceptAny",
            Policy::SystemTrust => "SystemTrust",
            Policy::Custom(_) => "Custom",
        };
        f.debug_tuple("CertificateValidator").field(&label).finish()
    }
}

fn connector() -> Result<&'static SslConnector, HandshakeError> {
    static CONNECTOR: OnceLock<Result<SslConnector, ErrorStack>> = OnceLock::new();

    CONNECTOR
        .get_or_init(|| Ok(SslConnector::builder(SslMethod::tls())?.build()))
        .as_ref()
        .map_err(|err| HandshakeError::TlsSetup(err.clone()))
}

fn client_ssl(
    server_name: &str,
    validator: Option<&CertificateValidator>,
) -> Result<Ssl, HandshakeError> {
    let mut config = connector()?.configure()?;
    let ssl = match validator.map(|v| &v.policy) {
        None | Some(Policy::AcceptAny) => {
            config.set_verify(SslVerifyMode::NONE);
            config.verify_hostname(false).into_ssl(server_name)?
        }
        Some(Policy::SystemTrust) => {
            config.set_verify(SslVerifyMode::PEER);
            config.into_ssl(server_name)?
        }
        Some(Policy::Custom(verify)) => {
            let verify = Arc::clone(verify);
            let mut ssl = config.into_ssl(server_name)?;
            ssl.set_verify_callback(SslVerifyMode::PEER, move |preverified, ctx| {
                verify(preverified, ctx)
            });
            ssl
        }
    };

    Ok(ssl)
}

/// Runs the client side of a TLS handshake over `tcp`, racing `deadline`.
pub(crate) async fn upgrade(
    tcp: TcpStream,
    server_name: &str,
    validator: Option<&CertificateValidator>,
    deadline: &Deadline,
) -> Result<SslStream<TcpStream>, HandshakeError> {
    let ssl = client_ssl(server_name, validator)?;
    let mut stream = SslStream::new(ssl, tcp)?;

    deadline
        .race(Pin::new(&mut stream).connect())
        .await
        .map_err(|reason| reason.at(Stage::TlsHandshake))?
        .map_err(HandshakeError::TlsHandshake)?;

    Ok(stream)
}
