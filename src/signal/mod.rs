//! Signal ingestion for the session analysis engine.
//!
//! This module contains:
//! - The closed category vocabularies and sample types
//! - The adapter that validates and normalizes upstream score vectors

pub mod adapter;
pub mod types;

// Re-export commonly used types
pub use adapter::{validate_duration, validate_transcript, SignalAdapter};
pub use types::{
    CategoryDistribution, EmotionCategory, Modality, ModalitySample, ModalityStream, RawSample,
    TranscriptSegment,
};
