//! Operator notification subsystem.
//!
//! # Data Flow
//! ```text
//! detection (alert decided)
//!     → Notifier::send (non-blocking enqueue, bounded channel)
//!     → worker task
//!     → telegram.rs (one POST per message)
//! ```
//!
//! # Design Decisions
//! - The request path never awaits delivery; a full queue drops the alert
//! - Missing credentials disable alerting only, logged once at startup
//! - Delivery failures are logged and discarded

pub mod message;
pub mod telegram;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub use message::AttackReport;
pub use telegram::{NotifyError, TelegramClient};

use crate::config::NotifierConfig;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// Cheap, cloneable handle for enqueueing alerts.
#[derive(Clone, Debug, Default)]
pub struct Notifier {
    tx: Option<mpsc::Sender<String>>,
}

impl Notifier {
    /// A notifier that drops everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Wrap an existing channel; the caller owns the receiving side.
    pub fn from_sender(tx: mpsc::Sender<String>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Start the delivery worker, or return a disabled notifier when the
    /// channel credentials are not configured.
    pub fn spawn(config: &NotifierConfig, shutdown: ShutdownSignal) -> Result<Self, reqwest::Error> {
        let Some(client) = TelegramClient::from_config(config)? else {
            tracing::warn!("Notification credentials not configured, attack alerts disabled");
            return Ok(Self::disabled());
        };

        let (tx, rx) = mpsc::channel(config.queue_capacity);
        tokio::spawn(run_worker(client, rx, shutdown));
        tracing::info!(queue_capacity = config.queue_capacity, "Notification worker started");
        Ok(Self::from_sender(tx))
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Enqueue a message for delivery. Returns whether it was accepted.
    pub fn send(&self, message: String) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Notification queue full, dropping alert");
                metrics::record_notification("dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("Notification worker stopped, dropping alert");
                metrics::record_notification("dropped");
                false
            }
        }
    }
}

async fn run_worker(
    client: TelegramClient,
    mut rx: mpsc::Receiver<String>,
    mut shutdown: ShutdownSignal,
) {
    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else { break };
                match client.send_message(&message).await {
                    Ok(()) => {
                        tracing::info!("Attack notification delivered");
                        metrics::record_notification("sent");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Attack notification failed");
                        metrics::record_notification("failed");
                    }
                }
            }
            _ = shutdown.wait() => break,
        }
    }
    tracing::debug!("Notification worker exiting");
}
