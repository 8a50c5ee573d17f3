//! Alert sinks
//!
//! Publishing is best effort. A failed publish is logged by the caller and
//! never blocks the score that raised it; redelivery belongs to the
//! notification subsystem behind the sink.

use super::Alert;
use async_trait::async_trait;
use circulus_common::{ReputationError, Result};
use tokio::sync::mpsc;
use tracing::warn;

/// Destination for reputation alerts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn publish(&self, alert: Alert) -> Result<()>;
}

/// Sink that writes alerts to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn publish(&self, alert: Alert) -> Result<()> {
        warn!(
            alert_type = %alert.alert_type,
            entity = %alert.entity_id,
            role = %alert.entity_type,
            score = alert.score,
            previous = ?alert.previous_score,
            change = ?alert.change,
            "Reputation alert"
        );
        Ok(())
    }
}

/// Sink that forwards alerts to a bounded channel without waiting
#[derive(Debug, Clone)]
pub struct ChannelAlertSink {
    tx: mpsc::Sender<Alert>,
}

impl ChannelAlertSink {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Alert>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AlertSink for ChannelAlertSink {
    async fn publish(&self, alert: Alert) -> Result<()> {
        self.tx.try_send(alert).map_err(|e| match e {
            mpsc::error::TrySendError::Full(a) => {
                ReputationError::Internal(format!("alert channel full, dropped {}", a.alert_type))
            }
            mpsc::error::TrySendError::Closed(a) => {
                ReputationError::Internal(format!("alert channel closed, dropped {}", a.alert_type))
            }
        })
    }
}
