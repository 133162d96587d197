//! Racing suspendable steps against a shared deadline and a cancel signal.

use crate::error::{HandshakeError, Stage};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Requests cancellation of every probe holding a [`CancelSignal`] from it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Cooperative cancellation observed at every suspension point.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once cancellation is requested. Never completes if the
    /// handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Why a raced step lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    TimedOut,
    Cancelled,
}

impl Interrupted {
    pub fn at(self, stage: Stage) -> HandshakeError {
        match self {
            Interrupted::TimedOut => HandshakeError::TimedOut { stage },
            Interrupted::Cancelled => HandshakeError::Cancelled { stage },
        }
    }
}

/// Stand-in for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A point in time shared by every step of one attempt.
#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    cancel: Option<CancelSignal>,
}

impl Deadline {
    pub fn after(timeout: Duration, cancel: Option<CancelSignal>) -> Self {
        Self {
            at: far_enough(Instant::now(), timeout),
            cancel,
        }
    }

    /// Runs `op` until it finishes, the deadline passes or cancellation is
    /// requested. Cancellation wins over the deadline, which wins over the
    /// operation; the losing operation is dropped, never awaited.
    pub async fn race<F, T>(&self, op: F) -> Result<T, Interrupted>
    where
        F: Future<Output = T>,
    {
        if self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled) {
            return Err(Interrupted::Cancelled);
        }
        if Instant::now() >= self.at {
            return Err(Interrupted::TimedOut);
        }

        let cancelled = async {
            match &self.cancel {
                Some(signal) => signal.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(Interrupted::Cancelled),
            _ = sleep_until(self.at) => Err(Interrupted::TimedOut),
            out = op => Ok(out),
        }
    }
}

fn far_enough(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}
