//! Processing transparency log.
//!
//! Counts what the engine consumed and produced so a reviewer can audit a
//! run without inspecting any session content.

use crate::signal::types::Modality;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Processing statistics for the current process.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Sessions analyzed to completion
    sessions_analyzed: AtomicU64,
    /// Sessions that ended with insufficient data
    insufficient_sessions: AtomicU64,
    face_samples: AtomicU64,
    audio_samples: AtomicU64,
    text_samples: AtomicU64,
    /// Upstream categories dropped as unknown
    dropped_categories: AtomicU64,
    markers_emitted: AtomicU64,
    spikes_flagged: AtomicU64,
    /// Signature store reads or writes that failed
    store_failures: AtomicU64,
    started_at: DateTime<Utc>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            sessions_analyzed: AtomicU64::new(0),
            insufficient_sessions: AtomicU64::new(0),
            face_samples: AtomicU64::new(0),
            audio_samples: AtomicU64::new(0),
            text_samples: AtomicU64::new(0),
            dropped_categories: AtomicU64::new(0),
            markers_emitted: AtomicU64::new(0),
            spikes_flagged: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Record a finished session analysis.
    pub fn record_session(&self, insufficient: bool) {
        self.sessions_analyzed.fetch_add(1, Ordering::Relaxed);
        if insufficient {
            self.insufficient_sessions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record samples accepted for a modality.
    pub fn record_samples(&self, modality: Modality, count: u64) {
        let counter = match modality {
            Modality::Face => &self.face_samples,
            Modality::Audio => &self.audio_samples,
            Modality::Text => &self.text_samples,
        };
        counter.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_dropped_category(&self) {
        self.dropped_categories.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_markers(&self, count: u64) {
        self.markers_emitted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_spikes(&self, count: u64) {
        self.spikes_flagged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            sessions_analyzed: self.sessions_analyzed.load(Ordering::Relaxed),
            insufficient_sessions: self.insufficient_sessions.load(Ordering::Relaxed),
            face_samples: self.face_samples.load(Ordering::Relaxed),
            audio_samples: self.audio_samples.load(Ordering::Relaxed),
            text_samples: self.text_samples.load(Ordering::Relaxed),
            dropped_categories: self.dropped_categories.load(Ordering::Relaxed),
            markers_emitted: self.markers_emitted.load(Ordering::Relaxed),
            spikes_flagged: self.spikes_flagged.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            started_at: self.started_at,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Processing Statistics:\n\
             - Sessions analyzed: {} ({} with insufficient data)\n\
             - Samples consumed: {} face, {} audio, {} text\n\
             - Unknown categories dropped: {}\n\
             - Incongruence markers emitted: {}\n\
             - Intensity spikes flagged: {}\n\
             - Signature store failures: {}\n\
             \n\
             Observation Guarantee:\n\
             - Outputs are timestamped signal relationships only\n\
             - No diagnosis or prediction is made",
            stats.sessions_analyzed,
            stats.insufficient_sessions,
            stats.face_samples,
            stats.audio_samples,
            stats.text_samples,
            stats.dropped_categories,
            stats.markers_emitted,
            stats.spikes_flagged,
            stats.store_failures,
        )
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.sessions_analyzed,
            &self.insufficient_sessions,
            &self.face_samples,
            &self.audio_samples,
            &self.text_samples,
            &self.dropped_categories,
            &self.markers_emitted,
            &self.spikes_flagged,
            &self.store_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub sessions_analyzed: u64,
    pub insufficient_sessions: u64,
    pub face_samples: u64,
    pub audio_samples: u64,
    pub text_samples: u64,
    pub dropped_categories: u64,
    pub markers_emitted: u64,
    pub spikes_flagged: u64,
    pub store_failures: u64,
    pub started_at: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}
