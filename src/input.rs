use crate::model::Config;
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Streams host names from `--host` arguments followed by the `--input` file.
pub fn stream_hosts(cfg: &Config) -> anyhow::Result<ReceiverStream<String>> {
    let (tx, rx) = mpsc::channel(256);

    let hosts = cfg.hosts.clone();
    let input = cfg.input.clone();
    tokio::spawn(async move {
        for host in hosts {
            if let Some(host) = parse_host(&host) {
                if tx.send(host).await.is_err() {
                    return;
                }
            }
        }

        if let Some(path) = input {
            if let Err(err) = read_file(path, tx).await {
                tracing::error!(error = %err, "failed to read input file");
            }
        }
    });

    Ok(ReceiverStream::new(rx))
}

async fn read_file(path: String, tx: mpsc::Sender<String>) -> anyhow::Result<()> {
    let file = tokio::fs::File::open(&path)
        .await
        .with_context(|| format!("cannot open input {}", path))?;
    let mut reader = BufReader::new(file).lines();
    while let Some(line) = reader.next_line().await? {
        match parse_host(&line) {
            Some(host) => {
                if tx.send(host).await.is_err() {
                    break;
                }
            }
            None if !is_skippable(&line) => {
                tracing::warn!(line = %line.trim(), "skipping invalid host");
            }
            None => {}
        }
    }
    Ok(())
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Accepts a bare name or address; bracketed IPv6 literals are unwrapped.
fn parse_host(line: &str) -> Option<String> {
    if is_skippable(line) {
        return None;
    }

    let host = line
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }
    Some(host.to_string())
}
