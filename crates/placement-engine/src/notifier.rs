use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Delivers one-time codes to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_code(&self, address: &str, code: &str) -> anyhow::Result<()>;
}

/// Records that a code was issued without sending it anywhere. The code
/// itself never reaches the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_code(&self, address: &str, code: &str) -> anyhow::Result<()> {
        debug!(address, code = %redact(code), "Password reset code issued (log delivery)");
        Ok(())
    }
}

fn redact(code: &str) -> String {
    "*".repeat(code.chars().count())
}

#[derive(Debug)]
struct CodeMessage {
    address: String,
    code: String,
}

/// Bounded hand-off between request handlers and the delivery worker.
/// Enqueueing never waits; a full queue drops the message.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<CodeMessage>,
}

impl NotificationQueue {
    /// Spawn the delivery worker. It exits when `shutdown` fires or every
    /// queue handle has been dropped.
    pub fn start(
        notifier: Arc<dyn Notifier>,
        capacity: usize,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (queue, rx) = Self::channel(capacity);
        let worker = tokio::spawn(run_worker(rx, notifier, shutdown));
        (queue, worker)
    }

    fn channel(capacity: usize) -> (Self, mpsc::Receiver<CodeMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Returns whether the message was queued.
    pub fn enqueue(&self, address: &str, code: &str) -> bool {
        let message = CodeMessage {
            address: address.to_string(),
            code: code.to_string(),
        };
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!(address = %message.address, "Notification queue full, dropping code");
                false
            }
            Err(TrySendError::Closed(message)) => {
                warn!(address = %message.address, "Notification worker stopped, dropping code");
                false
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<CodeMessage>,
    notifier: Arc<dyn Notifier>,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        match notifier.send_code(&message.address, &message.code).await {
            Ok(()) => debug!(address = %message.address, "Delivered reset code"),
            Err(e) => warn!(address = %message.address, error = %e, "Failed to deliver reset code"),
        }
    }
    debug!("Notification worker stopped");
}
