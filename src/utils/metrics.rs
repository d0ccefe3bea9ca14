// src/utils/metrics.rs
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{Duration, Instant};

/// Server-wide session counters. Each outcome is recorded exactly once per connection.
pub struct SessionMetrics {
    start_time: Instant,
    sessions_accepted: AtomicU64,
    sessions_rejected: AtomicU64,
    sessions_decrypted: AtomicU64,
    sessions_failed: AtomicU64,
    processing_time: AtomicU64,
}

/// How a server session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Decrypted,
    /// Credential missing, malformed or wrongly signed.
    Rejected,
    /// Anything else: handshake, framing, decode or I/O failure.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub accepted: u64,
    pub rejected: u64,
    pub decrypted: u64,
    pub failed: u64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            sessions_accepted: AtomicU64::new(0),
            sessions_rejected: AtomicU64::new(0),
            sessions_decrypted: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            processing_time: AtomicU64::new(0),
        }
    }

    pub fn record_accepted(&self) {
        self.sessions_accepted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_outcome(&self, outcome: SessionOutcome, duration: Duration) {
        self.processing_time.fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
        let counter = match outcome {
            SessionOutcome::Decrypted => &self.sessions_decrypted,
            SessionOutcome::Rejected => &self.sessions_rejected,
            SessionOutcome::Failed => &self.sessions_failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.sessions_accepted.load(Ordering::SeqCst),
            rejected: self.sessions_rejected.load(Ordering::SeqCst),
            decrypted: self.sessions_decrypted.load(Ordering::SeqCst),
            failed: self.sessions_failed.load(Ordering::SeqCst),
        }
    }

    fn average_time_micros(&self, finished: u64) -> u64 {
        if finished == 0 {
            return 0;
        }
        self.processing_time.load(Ordering::SeqCst) / finished
    }

    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        let finished = snapshot.rejected + snapshot.decrypted + snapshot.failed;
        tracing::info!(
            accepted = snapshot.accepted,
            decrypted = snapshot.decrypted,
            rejected = snapshot.rejected,
            failed = snapshot.failed,
            in_flight = snapshot.accepted.saturating_sub(finished),
            avg_session_us = self.average_time_micros(finished),
            uptime_secs = self.start_time.elapsed().as_secs(),
            "Session metrics"
        );
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
