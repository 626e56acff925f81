//! Session analysis entry point.
//!
//! Runs the pipeline for one session:
//! adapter -> timeline -> {incongruence, pattern match} -> summary.
//! Sessions are independent of each other; the only state shared between
//! them is the signature store.

use crate::config::AnalysisConfig;
use crate::core::incongruence::{IncongruenceDetector, IncongruenceMarker};
use crate::core::pattern::{PatternMatchResult, PatternMatcher, SessionSignature};
use crate::core::summary::{summarize, IntensitySummary};
use crate::core::timeline::{SessionStreams, TimelineBuilder, TimelinePoint};
use crate::error::Result;
use crate::signal::adapter::{validate_duration, validate_transcript, SignalAdapter};
use crate::signal::types::{Modality, RawSample, TranscriptSegment};
use crate::store::SignatureStore;
use crate::transparency::SharedTransparencyLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything known about one recorded session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInput {
    pub session_id: String,
    pub subject_id: String,
    /// Session length in seconds; the latest sample timestamp when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub face: Vec<RawSample>,
    pub audio: Vec<RawSample>,
    pub text: Vec<RawSample>,
    pub transcript: Vec<TranscriptSegment>,
    /// Recording time, used as the signature's creation time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl SessionInput {
    pub fn new(session_id: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            subject_id: subject_id.into(),
            ..Self::default()
        }
    }

    /// Total raw samples across modalities.
    pub fn sample_count(&self) -> usize {
        self.face.len() + self.audio.len() + self.text.len()
    }
}

/// Terminal state of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Complete,
    /// No samples in any modality; nothing was detected because nothing was observed
    InsufficientData,
}

/// Result of analyzing one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalysis {
    pub session_id: String,
    pub subject_id: String,
    pub status: AnalysisStatus,
    /// Seconds covered by the timeline
    pub duration_secs: f64,
    pub timeline: Vec<TimelinePoint>,
    pub incongruence_markers: Vec<IncongruenceMarker>,
    pub pattern_match: PatternMatchResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_signature: Option<SessionSignature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<IntensitySummary>,
}

impl SessionAnalysis {
    pub fn is_insufficient(&self) -> bool {
        self.status == AnalysisStatus::InsufficientData
    }
}

/// Runs session analyses with one configuration.
pub struct Analyzer {
    config: AnalysisConfig,
    builder: TimelineBuilder,
    detector: IncongruenceDetector,
    matcher: PatternMatcher,
    log: Option<SharedTransparencyLog>,
}

impl Analyzer {
    /// Create an analyzer. Fails when the configuration is invalid.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: TimelineBuilder::new(&config),
            detector: IncongruenceDetector::new(&config),
            matcher: PatternMatcher::new(&config),
            config,
            log: None,
        })
    }

    /// Record processing counts into a transparency log.
    pub fn with_log(mut self, log: SharedTransparencyLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Replace the incongruence detector, e.g. to run a custom rule set.
    pub fn with_detector(mut self, detector: IncongruenceDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a session against an in-memory list of prior signatures.
    pub fn analyze(
        &self,
        input: &SessionInput,
        priors: &[SessionSignature],
    ) -> Result<SessionAnalysis> {
        let streams = self.normalize(input)?;

        let timeline = self.builder.build(&streams, input.duration_secs);
        if timeline.is_empty() {
            tracing::info!(
                session = %input.session_id,
                "no samples in any modality, insufficient data"
            );
            if let Some(ref log) = self.log {
                log.record_session(true);
            }
            return Ok(SessionAnalysis {
                session_id: input.session_id.clone(),
                subject_id: input.subject_id.clone(),
                status: AnalysisStatus::InsufficientData,
                duration_secs: input.duration_secs.unwrap_or(0.0),
                timeline,
                incongruence_markers: Vec::new(),
                pattern_match: PatternMatchResult::none(),
                new_signature: None,
                summary: None,
            });
        }

        let markers = self.detector.detect(&timeline, &input.transcript);

        let span = TimelineBuilder::span(&streams, input.duration_secs);
        let created_at = input.recorded_at.unwrap_or_else(Utc::now);
        let new_signature = self.matcher.signature(
            &input.session_id,
            &input.subject_id,
            &self.builder,
            &streams,
            span,
            created_at,
        );
        let pattern_match = match new_signature {
            Some(ref signature) => {
                self.matcher
                    .match_against(&signature.vector, &input.session_id, priors)
            }
            None => PatternMatchResult::none(),
        };

        let summary = summarize(&timeline, &input.transcript, &self.config.summary);
        let spikes = timeline.iter().filter(|p| p.spike).count();
        let duration_secs = input
            .duration_secs
            .unwrap_or_else(|| timeline.last().map(|p| p.t).unwrap_or(0.0));

        if let Some(ref log) = self.log {
            log.record_session(false);
            log.record_markers(markers.len() as u64);
            log.record_spikes(spikes as u64);
        }
        tracing::info!(
            session = %input.session_id,
            subject = %input.subject_id,
            points = timeline.len(),
            spikes,
            markers = markers.len(),
            repetition = pattern_match.has_repetition,
            "session analyzed"
        );

        Ok(SessionAnalysis {
            session_id: input.session_id.clone(),
            subject_id: input.subject_id.clone(),
            status: AnalysisStatus::Complete,
            duration_secs,
            timeline,
            incongruence_markers: markers,
            pattern_match,
            new_signature,
            summary,
        })
    }

    /// Analyze a session using a signature store for history.
    ///
    /// Priors are read before analysis and the new signature is appended
    /// after it. A store failure never fails the analysis: an unreadable
    /// store marks the pattern match as unavailable, a failed append is
    /// logged and counted.
    pub fn analyze_with_store(
        &self,
        input: &SessionInput,
        store: &dyn SignatureStore,
    ) -> Result<SessionAnalysis> {
        let priors = match store.get(&input.subject_id) {
            Ok(priors) => Some(priors),
            Err(e) => {
                tracing::warn!(subject = %input.subject_id, error = %e, "could not read prior signatures");
                self.record_store_failure();
                None
            }
        };

        let mut analysis = self.analyze(input, priors.as_deref().unwrap_or(&[]))?;
        if priors.is_none() {
            analysis.pattern_match = PatternMatchResult::unavailable();
        }

        if let Some(ref signature) = analysis.new_signature {
            if let Err(e) = store.append(signature.clone()) {
                tracing::warn!(session = %input.session_id, error = %e, "could not store signature");
                self.record_store_failure();
            }
        }

        Ok(analysis)
    }

    fn normalize(&self, input: &SessionInput) -> Result<SessionStreams> {
        let resolution = self.config.grid_resolution_secs;
        validate_duration(input.duration_secs, resolution)?;

        let mut adapter = SignalAdapter::new(&self.config.input);
        if let Some(ref log) = self.log {
            adapter = adapter.with_log(log.clone());
        }

        let duration = input.duration_secs;
        let streams = SessionStreams {
            face: adapter.normalize(Modality::Face, &input.face, duration)?,
            audio: adapter.normalize(Modality::Audio, &input.audio, duration)?,
            text: adapter.normalize(Modality::Text, &input.text, duration)?,
        };

        // Without an explicit duration the latest sample sets the span
        let session_end = duration.or_else(|| streams.last_timestamp());
        validate_duration(session_end, resolution)?;
        validate_transcript(&input.transcript, session_end)?;

        Ok(streams)
    }

    fn record_store_failure(&self) {
        if let Some(ref log) = self.log {
            log.record_store_failure();
        }
    }
}

/// Analyze one session with an ad-hoc analyzer.
pub fn analyze(
    input: &SessionInput,
    priors: &[SessionSignature],
    config: &AnalysisConfig,
) -> Result<SessionAnalysis> {
    Analyzer::new(config.clone())?.analyze(input, priors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::store::{MemorySignatureStore, StoreError};
    use crate::transparency::create_shared_log;
    use chrono::TimeZone;

    struct OfflineStore;

    impl SignatureStore for OfflineStore {
        fn get(&self, _subject_id: &str) -> std::result::Result<Vec<SessionSignature>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        fn append(&self, _signature: SessionSignature) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    fn analyzer() -> Analyzer {
        Analyzer::new(AnalysisConfig::default()).unwrap()
    }

    fn small_session() -> SessionInput {
        let mut input = SessionInput::new("s-1", "subject-1");
        input.face = vec![
            RawSample::new(0.0, [("neutral", 0.6), ("joy", 0.4)]),
            RawSample::new(2.0, [("neutral", 0.3), ("sadness", 0.7)]),
        ];
        input.audio = vec![RawSample::new(0.0, [("neutral", 0.5), ("calm", 0.5)])];
        input
    }

    #[test]
    fn test_empty_session_is_insufficient() {
        let log = create_shared_log();
        let analysis = analyzer()
            .with_log(log.clone())
            .analyze(&SessionInput::new("s-0", "subject-1"), &[])
            .unwrap();

        assert!(analysis.is_insufficient());
        assert!(analysis.timeline.is_empty());
        assert!(analysis.incongruence_markers.is_empty());
        assert!(!analysis.pattern_match.has_repetition);
        assert!(analysis.new_signature.is_none());
        assert_eq!(log.stats().insufficient_sessions, 1);
    }

    #[test]
    fn test_invalid_sample_fails_session() {
        let mut input = small_session();
        input.duration_secs = Some(1.0);
        let err = analyzer().analyze(&input, &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
    }

    #[test]
    fn test_transcript_outside_session_fails() {
        let mut input = small_session();
        input.duration_secs = Some(5.0);
        input.transcript =
            vec![TranscriptSegment::new(100.0, 110.0, "Anyway.").with_valence(-0.8)];

        let err = analyzer().analyze(&input, &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));

        // the latest sample bounds the session when no duration is given
        input.duration_secs = None;
        assert!(analyzer().analyze(&input, &[]).is_err());
    }

    #[test]
    fn test_far_sample_timestamp_fails() {
        let mut input = small_session();
        input.audio.push(RawSample::new(1e300, [("neutral", 1.0)]));
        let err = analyzer().analyze(&input, &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalysisConfig::default();
        config.grid_resolution_secs = 0.0;
        assert!(Analyzer::new(config).is_err());
    }

    #[test]
    fn test_signature_uses_recording_time() {
        let mut input = small_session();
        let recorded = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        input.recorded_at = Some(recorded);

        let analysis = analyzer().analyze(&input, &[]).unwrap();
        let signature = analysis.new_signature.unwrap();
        assert_eq!(signature.created_at, recorded);
        assert_eq!(signature.vector.len(), 20);
        assert_eq!(analysis.status, AnalysisStatus::Complete);
        assert_eq!(analysis.duration_secs, 2.0);
    }

    #[test]
    fn test_store_round_trip_appends_signature() {
        let store = MemorySignatureStore::new();
        let analyzer = analyzer();

        let first = analyzer.analyze_with_store(&small_session(), &store).unwrap();
        assert!(!first.pattern_match.store_unavailable);
        assert_eq!(store.get("subject-1").unwrap().len(), 1);

        let mut again = small_session();
        again.session_id = "s-2".to_string();
        let second = analyzer.analyze_with_store(&again, &store).unwrap();
        assert!(second.pattern_match.has_repetition);
        assert_eq!(second.pattern_match.similar_sessions[0].session_id, "s-1");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_unavailable_store_degrades_matching() {
        let log = create_shared_log();
        let analysis = analyzer()
            .with_log(log.clone())
            .analyze_with_store(&small_session(), &OfflineStore)
            .unwrap();

        assert_eq!(analysis.status, AnalysisStatus::Complete);
        assert!(!analysis.timeline.is_empty());
        assert!(analysis.pattern_match.store_unavailable);
        assert!(!analysis.pattern_match.has_repetition);
        // one failed read, one failed append
        assert_eq!(log.stats().store_failures, 2);
    }
}
