//! Core analysis pipeline.
//!
//! This module contains:
//! - Per-sample intensity and valence scoring
//! - Timeline building (grid resampling, fusion, spikes)
//! - Rule-driven incongruence detection
//! - Cross-session pattern matching
//! - Intensity summaries

pub mod incongruence;
pub mod pattern;
pub mod scoring;
pub mod summary;
pub mod timeline;

// Re-export commonly used types
pub use incongruence::{
    default_rules, explain, IncongruenceDetector, IncongruenceKind, IncongruenceMarker,
    IncongruenceRule, MarkerMetrics, MergePolicy, Signal, WindowMetrics,
};
pub use pattern::{
    pearson_similarity, phase_times, resample, signature_vector, PatternMatchResult,
    PatternMatcher, SessionSignature, SimilarSession,
};
pub use scoring::{intensity, score_sample, valence, SampleScores};
pub use summary::{
    congruence_events, summarize, CongruenceEvent, IntensitySummary, LowPeriod, SpikeMoment,
};
pub use timeline::{SessionStreams, TimelineBuilder, TimelinePoint, MAX_GRID_POINTS};
