//! Session Affect - multimodal signal alignment and incongruence detection.
//!
//! This library turns three independently sampled emotional signal streams
//! of a recorded session (facial expression, vocal tone, text sentiment)
//! into one aligned timeline, and derives observations from it: where
//! activation spikes, where the signals disagree, and whether the session's
//! activation shape repeats one of the subject's prior sessions.
//!
//! # Observation Guarantees
//!
//! - **No diagnosis**: Outputs are timestamped signal relationships only
//! - **No coercion**: Malformed input fails the session instead of being repaired
//! - **Deterministic**: Identical input produces identical timelines and markers
//! - **Transparency**: Processing is counted and auditable
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Session Analyzer                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────┐        │
//! │  │   Signal    │──▶│  Timeline   │──▶│ Incongruence │        │
//! │  │   Adapter   │   │   Builder   │   │   Detector   │        │
//! │  └─────────────┘   └─────────────┘   └──────────────┘        │
//! │         │                 │                                  │
//! │         ▼                 ▼                                  │
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────┐        │
//! │  │Transparency │   │   Pattern   │◀─▶│  Signature   │        │
//! │  │    Log      │   │   Matcher   │   │    Store     │        │
//! │  └─────────────┘   └─────────────┘   └──────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use session_affect::{AnalysisConfig, Analyzer, RawSample, SessionInput};
//!
//! let mut input = SessionInput::new("session-1", "subject-1");
//! input.face = vec![
//!     RawSample::new(0.0, [("neutral", 0.2), ("joy", 0.8)]),
//!     RawSample::new(3.0, [("neutral", 0.05), ("fear", 0.95)]),
//! ];
//!
//! let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
//! let analysis = analyzer.analyze(&input, &[]).unwrap();
//! assert_eq!(analysis.timeline.len(), 4);
//! ```

pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod signal;
pub mod store;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use analysis::{analyze, AnalysisStatus, Analyzer, SessionAnalysis, SessionInput};
pub use config::{AnalysisConfig, ConfigError};
pub use crate::core::{
    CongruenceEvent, IncongruenceDetector, IncongruenceKind, IncongruenceMarker,
    IntensitySummary, PatternMatchResult, PatternMatcher, SessionSignature, SimilarSession,
    TimelineBuilder, TimelinePoint,
};
pub use error::{AnalysisError, Result};
pub use signal::{EmotionCategory, Modality, RawSample, TranscriptSegment};
pub use store::{MemorySignatureStore, SignatureStore, StoreError};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Observation-only declaration that can be displayed to users.
pub const OBSERVATION_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║          SESSION AFFECT - OBSERVATION DECLARATION                ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This tool aligns emotional signals recorded during a session.   ║
║                                                                  ║
║  ✓ WHAT IT REPORTS:                                              ║
║    • When emotional activation rises sharply (spikes)            ║
║    • Where face, voice and words visibly disagree                ║
║    • Whether the session's shape resembles earlier sessions      ║
║                                                                  ║
║  ✗ WHAT IT NEVER DOES:                                           ║
║    • Diagnose, label or predict anything about a person          ║
║    • Repair or guess around malformed input                      ║
║    • Store anything beyond a 20-point intensity signature        ║
║                                                                  ║
║  Every observation is a timestamped relationship between         ║
║  signals, to be interpreted by a qualified professional.         ║
║                                                                  ║
║  You can view processing statistics anytime with:                ║
║    session-affect batch --input-dir <dir> --stats                ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
