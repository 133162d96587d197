use super::deadline::{CancelSignal, Deadline};
use super::options::effective_timeout;
use crate::error::ProbeError;
use async_trait::async_trait;
use std::io;
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::lookup_host;
use tracing::debug;

/// Turns a host name into the addresses it should be probed on.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolution through the operating system's resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Resolves `host`, keeping the order the resolver reports. A lookup that
/// outlives the timeout (or is cancelled) is abandoned and reported as
/// [`ProbeError::ResolveTimeout`].
pub async fn resolve_addresses<R>(
    resolver: &R,
    host: &str,
    timeout: Option<Duration>,
    cancel: Option<CancelSignal>,
) -> Result<Vec<IpAddr>, ProbeError>
where
    R: Resolve + ?Sized,
{
    let timeout = effective_timeout(timeout);
    let deadline = Deadline::after(timeout, cancel);

    match deadline.race(resolver.lookup(host)).await {
        Ok(Ok(addrs)) => {
            debug!(host, count = addrs.len(), "resolved host");
            Ok(addrs)
        }
        Ok(Err(source)) => Err(ProbeError::Resolve {
            host: host.to_string(),
            source,
        }),
        Err(reason) => {
            debug!(host, ?reason, "resolution interrupted");
            Err(ProbeError::ResolveTimeout {
                host: host.to_string(),
                timeout,
            })
        }
    }
}
