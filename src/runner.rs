use crate::model::{Config, ProbeReport};
use crate::output::OutputSink;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use handshake_check::{probe_host, CancelSignal, CertificateValidator, HandshakeProtocol, ProbeOptions};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{error, instrument, warn};

pub struct Runner {
    cfg: Config,
    sink: OutputSink,
    options: ProbeOptions,
    sem: Arc<Semaphore>,
}

impl Runner {
    pub fn new(cfg: Config, sink: OutputSink, cancel: CancelSignal) -> Self {
        let mut options = ProbeOptions {
            port: cfg.port,
            timeout: Some(cfg.timeout),
            cancel: Some(cancel),
            ..ProbeOptions::default()
        };
        if cfg.verify_certificates {
            options = options.with_certificate_validator(CertificateValidator::system_trust());
        }

        Self {
            sem: Arc::new(Semaphore::new(cfg.concurrency)),
            cfg,
            sink,
            options,
        }
    }

    /// Probes every host with every selected protocol; one report each.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut hosts = crate::input::stream_hosts(&self.cfg)?;
        let mut tasks = FuturesUnordered::new();

        while let Some(host) = hosts.next().await {
            for protocol in &self.cfg.protocols {
                let permit = self.sem.clone().acquire_owned().await?;
                let protocol = Arc::clone(protocol);
                let options = self.options.clone();
                let sink = self.sink.clone();
                let host = host.clone();
                tasks.push(tokio::spawn(async move {
                    let _permit = permit;
                    let report = probe_one(protocol.as_ref(), &host, options).await;
                    if let Err(err) = sink.emit(report).await {
                        warn!(error = %err, "dropping probe report");
                    }
                }));
            }
        }

        while let Some(joined) = tasks.next().await {
            if let Err(err) = joined {
                error!(error = %err, "probe task failed");
            }
        }
        Ok(())
    }
}

pub async fn probe_one(
    protocol: &dyn HandshakeProtocol,
    host: &str,
    options: ProbeOptions,
) -> ProbeReport {
    let last_failure = Arc::new(Mutex::new(None::<String>));
    let seen = Arc::clone(&last_failure);
    let options = options.with_exception_handler(move |err| {
        if let Ok(mut slot) = seen.lock() {
            *slot = Some(err.to_string());
        }
    });

    let port = options.port.unwrap_or_else(|| protocol.default_port()).get();
    let started = Instant::now();
    let result = probe_host(protocol, host, &options).await;
    let elapsed = started.elapsed();

    let last_failure = last_failure.lock().ok().and_then(|mut slot| slot.take());
    ProbeReport::new(host, protocol, port, result, last_failure, elapsed)
}
