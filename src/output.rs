use crate::model::{OutputConfig, OutputFormat, ProbeReport};
use std::io::{BufWriter, Write};
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct OutputSink {
    inner: std::sync::Arc<OutputInner>,
}

struct OutputInner {
    tx: tokio::sync::Mutex<Option<mpsc::Sender<ProbeReport>>>,
    handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl OutputSink {
    pub fn new(cfg: OutputConfig) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel(1024);
        let handle = tokio::task::spawn_blocking(move || run_writer(cfg, rx));

        Ok(Self {
            inner: std::sync::Arc::new(OutputInner {
                tx: tokio::sync::Mutex::new(Some(tx)),
                handle: tokio::sync::Mutex::new(Some(handle)),
            }),
        })
    }

    pub async fn emit(&self, report: ProbeReport) -> anyhow::Result<()> {
        let guard = self.inner.tx.lock().await;
        let Some(tx) = guard.as_ref() else {
            anyhow::bail!("output worker not available; dropping probe report");
        };
        tx.send(report)
            .await
            .map_err(|err| anyhow::anyhow!("output worker not available: {err}"))
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.inner.tx.lock().await.take();

        if let Some(handle) = self.inner.handle.lock().await.take() {
            handle
                .await
                .map_err(|err| anyhow::anyhow!("failed to join output worker: {err}"))?;
        }

        Ok(())
    }
}

fn run_writer(cfg: OutputConfig, mut rx: mpsc::Receiver<ProbeReport>) {
    let mut writer = BufWriter::new(std::io::stdout());

    while let Some(report) = rx.blocking_recv() {
        if let Err(err) = write_report(&cfg, &mut writer, &report) {
            eprintln!("failed to write probe report: {err}");
        }
    }

    let _ = writer.flush();
}

fn write_report<W: Write>(
    cfg: &OutputConfig,
    writer: &mut W,
    report: &ProbeReport,
) -> anyhow::Result<()> {
    match cfg.format {
        OutputFormat::Jsonl => {
            let line = serde_json::to_string(report)?;
            writeln!(writer, "{line}")?;
        }
        OutputFormat::Pretty => {
            write!(
                writer,
                "{} {}/{} -> {}",
                report.host,
                report.protocol,
                report.port,
                report.status_text()
            )?;
            if let Some(address) = &report.address {
                write!(writer, " via {address}")?;
            }
            writeln!(writer, " ({} ms)", report.elapsed_ms)?;
            if let Some(error) = &report.error {
                writeln!(writer, "  error: {error}")?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}
