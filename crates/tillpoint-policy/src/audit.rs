//! Audit recording pipeline.
//!
//! Check-path entries go through a bounded channel consumed by a writer
//! task, decoupling decision latency from storage-write latency. A write
//! failure never reaches the caller: it is reported to the operational
//! log and the triggering permission decision stands. Mutation entries
//! use the flushed path because administrators rely on them for
//! compliance review.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

use tillpoint_entity::audit::{CreateAuditLogEntry, RiskLevel};

use crate::store::AuditSink;

enum AuditMessage {
    Entry(CreateAuditLogEntry),
    Flush(oneshot::Sender<()>),
}

/// Handle to the audit pipeline. Cheap to clone.
#[derive(Clone)]
pub struct AuditRecorder {
    tx: mpsc::Sender<AuditMessage>,
    sink: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder").finish()
    }
}

impl AuditRecorder {
    /// Spawn the writer task and return a recorder handle.
    pub fn spawn(sink: Arc<dyn AuditSink>, queue_capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<AuditMessage>(queue_capacity.max(1));
        let writer_sink = sink.clone();

        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    AuditMessage::Entry(entry) => {
                        if let Err(e) = writer_sink.append(entry).await {
                            error!(error = %e, "Audit log write failed");
                        }
                    }
                    AuditMessage::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Self { tx, sink }
    }

    /// Record an entry without waiting for the write.
    ///
    /// A full or closed queue drops the entry and reports it; audit
    /// emission must never stall or fail a permission check.
    pub fn record(&self, entry: CreateAuditLogEntry) {
        if let Err(e) = self.tx.try_send(AuditMessage::Entry(entry)) {
            warn!(error = %e, "Audit queue unavailable; dropping entry");
        }
    }

    /// Record an entry and wait until it is persisted.
    ///
    /// Used for administrative mutations. A write failure is still
    /// swallowed after being reported; the mutation itself stands.
    pub async fn record_flushed(&self, entry: CreateAuditLogEntry) {
        if let Err(e) = self.sink.append(entry).await {
            error!(error = %e, "Audit log write failed");
        }
    }

    /// Wait until every entry queued before this call has been processed.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(AuditMessage::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// Risk level of a check entry.
pub(crate) fn check_risk(is_sensitive: bool, granted: bool) -> RiskLevel {
    match (is_sensitive, granted) {
        (false, true) => RiskLevel::Low,
        (false, false) => RiskLevel::Medium,
        (true, true) => RiskLevel::Medium,
        (true, false) => RiskLevel::High,
    }
}

/// Risk level of a policy violation entry.
pub(crate) fn violation_risk(is_sensitive: bool) -> RiskLevel {
    if is_sensitive {
        RiskLevel::Critical
    } else {
        RiskLevel::High
    }
}

/// Risk level of an administrative mutation entry.
pub(crate) fn mutation_risk(is_sensitive: bool) -> RiskLevel {
    if is_sensitive {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}
