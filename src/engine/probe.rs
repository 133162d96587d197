use super::handshake::test_handshake;
use super::options::ProbeOptions;
use super::resolver::{resolve_addresses, Resolve, SystemResolver};
use crate::error::ProbeError;
use crate::protocol::HandshakeProtocol;
use std::net::IpAddr;
use tracing::{debug, instrument};

/// Resolves `host` with the system resolver and returns the first address,
/// in resolver order, that completes `protocol`'s handshake.
///
/// `Ok(None)` means every address was tried and none succeeded. Errors are
/// reserved for resolution failures.
pub async fn probe_host<P>(
    protocol: &P,
    host: &str,
    options: &ProbeOptions,
) -> Result<Option<IpAddr>, ProbeError>
where
    P: HandshakeProtocol + ?Sized,
{
    probe_host_with(&SystemResolver, protocol, host, options).await
}

#[instrument(skip_all, fields(protocol = protocol.name(), host = %host))]
pub async fn probe_host_with<R, P>(
    resolver: &R,
    protocol: &P,
    host: &str,
    options: &ProbeOptions,
) -> Result<Option<IpAddr>, ProbeError>
where
    R: Resolve + ?Sized,
    P: HandshakeProtocol + ?Sized,
{
    let addrs = resolve_addresses(resolver, host, options.timeout, options.cancel.clone()).await?;

    // SNI and certificate checks should see the name, not the address.
    let named;
    let options = if options.server_name.is_none() {
        named = options.clone().with_server_name(host);
        &named
    } else {
        options
    };

    for ip in addrs {
        if test_handshake(protocol, ip, options).await {
            debug!(%ip, "handshake succeeded");
            return Ok(Some(ip));
        }
    }

    debug!("no address completed the handshake");
    Ok(None)
}
