use super::deadline::Deadline;
use super::options::ProbeOptions;
use super::tls;
use crate::error::{HandshakeError, Stage};
use crate::protocol::{Exchange, HandshakeProtocol};
use crate::util::hex::to_hex;
use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, instrument, trace};

/// Large enough to hold a greeting or a response head in a single read.
pub const READ_BUFFER_LEN: usize = 64_000;

/// Checks whether `ip` completes `protocol`'s opening exchange.
///
/// Every outcome other than success, including timeouts, cancellation and
/// transport errors, is reported as `false`. Transport errors are passed to
/// [`ProbeOptions::exception_handler`] first.
pub async fn test_handshake<P>(protocol: &P, ip: IpAddr, options: &ProbeOptions) -> bool
where
    P: HandshakeProtocol + ?Sized,
{
    let port = options.port.unwrap_or_else(|| protocol.default_port());
    let addr = SocketAddr::new(ip, port.get());

    match attempt(protocol, addr, options).await {
        Ok(verdict) => {
            debug!(protocol = protocol.name(), %addr, verdict, "handshake finished");
            verdict
        }
        Err(err) if err.is_interrupted() => {
            debug!(protocol = protocol.name(), %addr, error = %err, "handshake interrupted");
            false
        }
        Err(err) => {
            debug!(protocol = protocol.name(), %addr, error = %err, "handshake failed");
            options.report(&err);
            false
        }
    }
}

#[instrument(level = "trace", skip_all, fields(protocol = protocol.name(), %addr))]
async fn attempt<P>(
    protocol: &P,
    addr: SocketAddr,
    options: &ProbeOptions,
) -> Result<bool, HandshakeError>
where
    P: HandshakeProtocol + ?Sized,
{
    let deadline = Deadline::after(options.effective_timeout(), options.cancel.clone());

    let tcp = deadline
        .race(TcpStream::connect(addr))
        .await
        .map_err(|reason| reason.at(Stage::Connect))?
        .map_err(HandshakeError::Connect)?;

    // The stream is owned by whichever branch runs and closed when it returns.
    if protocol.requires_tls() {
        let server_name = options
            .server_name
            .clone()
            .unwrap_or_else(|| addr.ip().to_string());
        let stream = tls::upgrade(
            tcp,
            &server_name,
            options.certificate_validator.as_ref(),
            &deadline,
        )
        .await?;
        exchange(stream, protocol.exchange(), &deadline).await
    } else {
        exchange(tcp, protocol.exchange(), &deadline).await
    }
}

async fn exchange<S>(
    mut stream: S,
    step: Exchange<'_>,
    deadline: &Deadline,
) -> Result<bool, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match step {
        Exchange::SendFirst([]) => Ok(true),
        Exchange::SendFirst(payload) => {
            deadline
                .race(async {
                    stream.write_all(payload).await?;
                    stream.flush().await
                })
                .await
                .map_err(|reason| reason.at(Stage::Send))?
                .map_err(HandshakeError::Send)?;

            let mut buf = vec![0u8; READ_BUFFER_LEN];
            let read = read_once(&mut stream, &mut buf, deadline).await?;
            Ok(read > 0)
        }
        Exchange::ReceiveFirst(prefix) => {
            let mut buf = vec![0u8; READ_BUFFER_LEN];
            let read = read_once(&mut stream, &mut buf, deadline).await?;
            if read == 0 {
                return Ok(false);
            }
            Ok(buf[..read].starts_with(prefix))
        }
    }
}

async fn read_once<S>(
    stream: &mut S,
    buf: &mut [u8],
    deadline: &Deadline,
) -> Result<usize, HandshakeError>
where
    S: AsyncRead + Unpin,
{
    let read = deadline
        .race(stream.read(buf))
        .await
        .map_err(|reason| reason.at(Stage::Receive))?
        .map_err(HandshakeError::Receive)?;

    trace!(read, head = %to_hex(&buf[..read.min(16)]), "first read");
    Ok(read)
}
