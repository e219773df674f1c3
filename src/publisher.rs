// =============================================================================
// publisher.rs — THE STDOUT TOWN CRIER
// =============================================================================
//
// This module takes lead records from the crossbeam channel and hands
// them to the external persistence collaborator, one JSON line per
// record on stdout. What happens to them after that — CSV, database,
// carrier pigeon — is somebody else's architecture diagram.
//
// Architecture:
// 1. Consumer loop reads from the lock-free crossbeam channel
// 2. Records are serialized to JSON (serde does the heavy lifting)
// 3. One record per line, flushed per batch, channel order preserved
// 4. On shutdown, the channel is drained before we leave
//
// The channel is the ONLY hand-off point between the pipeline and the
// outside world, so record ordering on the wire is exactly the order
// the pipeline produced.
// =============================================================================

use anyhow::Result;
use crossbeam_channel::Receiver;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::models::{LeadRecord, RecordType};

/// The record publisher. Consumes lead records from the crossbeam
/// channel and emits them with the urgency of a sales rep who just
/// heard about a fresh burglary.
pub struct RecordPublisher {
    receiver: Receiver<LeadRecord>,
    shutdown: watch::Receiver<bool>,
    stats: Arc<PublisherStats>,
}

/// Publisher statistics for end-of-run reporting.
pub struct PublisherStats {
    pub records_published: portable_atomic::AtomicU64,
    pub incident_records: portable_atomic::AtomicU64,
    pub nearby_records: portable_atomic::AtomicU64,
    pub serialize_errors: portable_atomic::AtomicU64,
}

impl PublisherStats {
    pub fn new() -> Self {
        Self {
            records_published: portable_atomic::AtomicU64::new(0),
            incident_records: portable_atomic::AtomicU64::new(0),
            nearby_records: portable_atomic::AtomicU64::new(0),
            serialize_errors: portable_atomic::AtomicU64::new(0),
        }
    }
}

impl Default for PublisherStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A serializable snapshot of publisher stats.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PublisherSnapshot {
    pub records_published: u64,
    pub incident_records: u64,
    pub nearby_records: u64,
    pub serialize_errors: u64,
}

impl RecordPublisher {
    /// Create a new RecordPublisher.
    ///
    /// # Arguments
    /// * `receiver` - The receiving end of the crossbeam channel
    /// * `shutdown` - Watch channel for graceful shutdown signaling
    pub fn new(
        receiver: Receiver<LeadRecord>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, Arc<PublisherStats>) {
        let stats = Arc::new(PublisherStats::new());
        let stats_clone = Arc::clone(&stats);
        (
            Self {
                receiver,
                shutdown,
                stats,
            },
            stats_clone,
        )
    }

    /// Run the publisher loop until the channel disconnects or the
    /// shutdown signal arrives — whichever comes first, the channel is
    /// drained before returning so no record is left behind.
    pub async fn run(self) -> Result<()> {
        info!("Record publisher starting — persistence collaborator, brace yourself");

        const BATCH_SIZE: usize = 50;
        let mut batch: Vec<LeadRecord> = Vec::with_capacity(BATCH_SIZE);

        loop {
            if *self.shutdown.borrow() {
                info!("Shutdown signal received — draining remaining records");
                batch.clear();
                while let Ok(record) = self.receiver.try_recv() {
                    batch.push(record);
                }
                if !batch.is_empty() {
                    self.publish_batch(&batch);
                }
                info!("Record publisher shutting down — no more leads to cry about");
                return Ok(());
            }

            batch.clear();
            while batch.len() < BATCH_SIZE {
                match self.receiver.try_recv() {
                    Ok(record) => batch.push(record),
                    Err(crossbeam_channel::TryRecvError::Empty) => break,
                    Err(crossbeam_channel::TryRecvError::Disconnected) => {
                        if !batch.is_empty() {
                            self.publish_batch(&batch);
                        }
                        info!("Channel disconnected — publisher shutting down");
                        return Ok(());
                    }
                }
            }

            if batch.is_empty() {
                // No records waiting. Sleep briefly and check again.
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }

            self.publish_batch(&batch);
        }
    }

    /// Serialize and emit a batch, one JSON line per record, in channel
    /// order. A record that refuses to serialize is logged and counted,
    /// never allowed to block the ones behind it.
    fn publish_batch(&self, batch: &[LeadRecord]) {
        use portable_atomic::Ordering;

        let stdout = std::io::stdout();
        let mut out = stdout.lock();

        for record in batch {
            match serde_json::to_string(record) {
                Ok(json) => {
                    if let Err(e) = writeln!(out, "{json}") {
                        error!(error = %e, record_id = %record.id, "failed to write record");
                        self.stats.serialize_errors.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    self.stats.records_published.fetch_add(1, Ordering::Relaxed);
                    match record.record_type {
                        RecordType::Incident => {
                            self.stats.incident_records.fetch_add(1, Ordering::Relaxed)
                        }
                        RecordType::Nearby => {
                            self.stats.nearby_records.fetch_add(1, Ordering::Relaxed)
                        }
                    };
                    debug!(record = %record, "record published");
                }
                Err(e) => {
                    error!(error = %e, record_id = %record.id, "failed to serialize record");
                    self.stats.serialize_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let _ = out.flush();
    }

    /// Get a snapshot of publisher statistics.
    pub fn snapshot(stats: &PublisherStats) -> PublisherSnapshot {
        use portable_atomic::Ordering;
        PublisherSnapshot {
            records_published: stats.records_published.load(Ordering::Relaxed),
            incident_records: stats.incident_records.load(Ordering::Relaxed),
            nearby_records: stats.nearby_records.load(Ordering::Relaxed),
            serialize_errors: stats.serialize_errors.load(Ordering::Relaxed),
        }
    }
}
