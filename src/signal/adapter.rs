//! Signal Source Adapter.
//!
//! Normalizes the per-modality score dictionaries of upstream producers into
//! validated [`ModalityStream`]s. Malformed input fails the whole session;
//! nothing is coerced silently.

use crate::config::{InputConfig, UnknownCategoryPolicy};
use crate::core::timeline::MAX_GRID_POINTS;
use crate::error::{AnalysisError, Result};
use crate::signal::types::{
    CategoryDistribution, EmotionCategory, Modality, ModalitySample, ModalityStream, RawSample,
    TranscriptSegment,
};
use crate::transparency::SharedTransparencyLog;

/// Slack added to the distribution tolerance.
const SUM_EPSILON: f64 = 1e-9;

const TIME_EPSILON: f64 = 1e-9;

/// Converts raw upstream samples into validated modality streams.
pub struct SignalAdapter {
    tolerance: f64,
    policy: UnknownCategoryPolicy,
    log: Option<SharedTransparencyLog>,
}

impl SignalAdapter {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            tolerance: config.distribution_tolerance,
            policy: config.unknown_category,
            log: None,
        }
    }

    /// Record dropped categories and sample counts into a transparency log.
    pub fn with_log(mut self, log: SharedTransparencyLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Normalize one modality's samples.
    ///
    /// `duration` bounds the timestamps when the session length is known.
    pub fn normalize(
        &self,
        modality: Modality,
        raw: &[RawSample],
        duration: Option<f64>,
    ) -> Result<ModalityStream> {
        let mut stream = ModalityStream::new(modality);
        let mut previous: Option<f64> = None;

        for (index, sample) in raw.iter().enumerate() {
            let context = format!("{modality}[{index}]");
            let t = sample.timestamp;

            if !t.is_finite() || t < 0.0 {
                return Err(AnalysisError::invalid(
                    context,
                    format!("timestamp {t} is not a non-negative number"),
                ));
            }
            if let Some(limit) = duration {
                if t > limit {
                    return Err(AnalysisError::invalid(
                        context,
                        format!("timestamp {t} is beyond the session duration {limit}"),
                    ));
                }
            }
            if let Some(prev) = previous {
                if t <= prev {
                    return Err(AnalysisError::invalid(
                        context,
                        format!("timestamp {t} does not follow {prev}"),
                    ));
                }
            }
            previous = Some(t);

            if let Some(v) = sample.valence {
                if !(-1.0..=1.0).contains(&v) {
                    return Err(AnalysisError::invalid(
                        context,
                        format!("valence {v} is outside [-1, 1]"),
                    ));
                }
            }
            if sample.scores.is_empty() && sample.valence.is_none() {
                return Err(AnalysisError::invalid(
                    context,
                    "sample carries neither scores nor valence",
                ));
            }

            let distribution = self.resolve_distribution(modality, sample, &context)?;
            stream.samples.push(ModalitySample {
                timestamp: t,
                distribution,
                valence: sample.valence,
            });
        }

        if let Some(ref log) = self.log {
            log.record_samples(modality, stream.samples.len() as u64);
        }
        tracing::debug!(%modality, samples = stream.samples.len(), "normalized modality stream");

        Ok(stream)
    }

    /// Validate probabilities and map labels onto the modality's vocabulary.
    fn resolve_distribution(
        &self,
        modality: Modality,
        sample: &RawSample,
        context: &str,
    ) -> Result<CategoryDistribution> {
        let mut sum = 0.0;
        for (label, &p) in &sample.scores {
            if !(0.0..=1.0).contains(&p) {
                return Err(AnalysisError::invalid(
                    context,
                    format!("probability {p} for '{label}' is outside [0, 1]"),
                ));
            }
            sum += p;
        }
        if !sample.scores.is_empty() && (sum - 1.0).abs() > self.tolerance + SUM_EPSILON {
            return Err(AnalysisError::invalid(
                context,
                format!("distribution sums to {sum:.3}, expected 1"),
            ));
        }

        let mut distribution = CategoryDistribution::new();
        for (label, &p) in &sample.scores {
            match EmotionCategory::parse(label).filter(|c| modality.accepts(*c)) {
                Some(category) => {
                    let merged = distribution.get(category).unwrap_or(0.0) + p;
                    distribution.insert(category, merged);
                }
                None => match self.policy {
                    UnknownCategoryPolicy::Reject => {
                        return Err(AnalysisError::UnknownCategory {
                            modality,
                            category: label.clone(),
                        });
                    }
                    UnknownCategoryPolicy::Drop => {
                        tracing::warn!(%modality, category = %label, "dropping unknown category");
                        if let Some(ref log) = self.log {
                            log.record_dropped_category();
                        }
                    }
                },
            }
        }

        Ok(distribution)
    }
}

/// Check a session duration and the grid it implies at `resolution`.
pub fn validate_duration(duration: Option<f64>, resolution: f64) -> Result<()> {
    let Some(d) = duration else {
        return Ok(());
    };
    if !d.is_finite() || d < 0.0 {
        return Err(AnalysisError::invalid(
            "duration",
            format!("session duration {d} is not a non-negative number"),
        ));
    }
    if d / resolution >= MAX_GRID_POINTS as f64 {
        return Err(AnalysisError::invalid(
            "duration",
            format!(
                "session duration {d}s needs at least {MAX_GRID_POINTS} grid points at {resolution}s"
            ),
        ));
    }
    Ok(())
}

/// Check that transcript segments are well-formed, ordered and non-overlapping.
///
/// With a known `session_end`, every segment must start within the session.
pub fn validate_transcript(
    segments: &[TranscriptSegment],
    session_end: Option<f64>,
) -> Result<()> {
    let mut previous_end: Option<f64> = None;

    for (index, segment) in segments.iter().enumerate() {
        let context = format!("transcript[{index}]");

        if !segment.start.is_finite() || !segment.end.is_finite() || segment.start < 0.0 {
            return Err(AnalysisError::invalid(context, "segment bounds are not valid times"));
        }
        if segment.end <= segment.start {
            return Err(AnalysisError::invalid(
                context,
                format!("segment end {} is not after start {}", segment.end, segment.start),
            ));
        }
        if let Some(end) = session_end {
            if segment.start > end + TIME_EPSILON {
                return Err(AnalysisError::invalid(
                    context,
                    format!(
                        "segment starts at {} after the session ends at {end}",
                        segment.start
                    ),
                ));
            }
        }
        if let Some(prev) = previous_end {
            if segment.start < prev {
                return Err(AnalysisError::invalid(
                    context,
                    format!("segment starting at {} overlaps previous segment", segment.start),
                ));
            }
        }
        if let Some(v) = segment.valence {
            if !(-1.0..=1.0).contains(&v) {
                return Err(AnalysisError::invalid(
                    context,
                    format!("valence {v} is outside [-1, 1]"),
                ));
            }
        }
        previous_end = Some(segment.end);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transparency::create_shared_log;

    fn adapter(policy: UnknownCategoryPolicy) -> SignalAdapter {
        SignalAdapter::new(&InputConfig {
            unknown_category: policy,
            ..InputConfig::default()
        })
    }

    #[test]
    fn test_normalize_resolves_aliases() {
        let raw = vec![RawSample::new(0.0, [("neutral", 0.2), ("happy", 0.8)])];
        let stream = adapter(UnknownCategoryPolicy::Drop)
            .normalize(Modality::Face, &raw, None)
            .unwrap();

        let dist = &stream.samples[0].distribution;
        assert_eq!(dist.get(EmotionCategory::Joy), Some(0.8));
        assert_eq!(dist.get(EmotionCategory::Neutral), Some(0.2));
    }

    #[test]
    fn test_unknown_category_dropped_with_count() {
        let log = create_shared_log();
        let raw = vec![RawSample::new(0.0, [("neutral", 0.9), ("contempt", 0.1)])];
        let stream = adapter(UnknownCategoryPolicy::Drop)
            .with_log(log.clone())
            .normalize(Modality::Face, &raw, None)
            .unwrap();

        assert_eq!(stream.samples[0].distribution.len(), 1);
        assert_eq!(log.stats().dropped_categories, 1);
        assert_eq!(log.stats().face_samples, 1);
    }

    #[test]
    fn test_out_of_vocabulary_category_rejected() {
        // calm is an audio category, not a face one
        let raw = vec![RawSample::new(0.0, [("neutral", 0.5), ("calm", 0.5)])];
        let err = adapter(UnknownCategoryPolicy::Reject)
            .normalize(Modality::Face, &raw, None)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownCategory { .. }));

        assert!(adapter(UnknownCategoryPolicy::Reject)
            .normalize(Modality::Audio, &raw, None)
            .is_ok());
    }

    #[test]
    fn test_distribution_sum_checked() {
        let raw = vec![RawSample::new(0.0, [("neutral", 0.5), ("joy", 0.2)])];
        let err = adapter(UnknownCategoryPolicy::Drop)
            .normalize(Modality::Face, &raw, None)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
    }

    #[test]
    fn test_default_tolerance_accepts_rounded_scores() {
        let adapter = SignalAdapter::new(&InputConfig::default());

        let rounded = vec![RawSample::new(0.0, [("neutral", 0.9)])];
        let stream = adapter.normalize(Modality::Audio, &rounded, None).unwrap();
        assert_eq!(stream.samples[0].distribution.get(EmotionCategory::Neutral), Some(0.9));

        let short = vec![RawSample::new(0.0, [("neutral", 0.85)])];
        let err = adapter.normalize(Modality::Audio, &short, None).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
    }

    #[test]
    fn test_timestamps_must_increase() {
        let raw = vec![
            RawSample::new(1.0, [("neutral", 1.0)]),
            RawSample::new(1.0, [("neutral", 1.0)]),
        ];
        assert!(adapter(UnknownCategoryPolicy::Drop)
            .normalize(Modality::Audio, &raw, None)
            .is_err());
    }

    #[test]
    fn test_timestamp_beyond_duration() {
        let raw = vec![RawSample::new(12.0, [("neutral", 1.0)])];
        assert!(adapter(UnknownCategoryPolicy::Drop)
            .normalize(Modality::Audio, &raw, Some(10.0))
            .is_err());
    }

    #[test]
    fn test_valence_only_sample() {
        let raw = vec![RawSample::with_valence(0.0, -0.6)];
        let stream = adapter(UnknownCategoryPolicy::Drop)
            .normalize(Modality::Text, &raw, None)
            .unwrap();
        assert_eq!(stream.samples[0].valence, Some(-0.6));
        assert!(stream.samples[0].distribution.is_empty());

        let raw = vec![RawSample::with_valence(0.0, 1.5)];
        assert!(adapter(UnknownCategoryPolicy::Drop)
            .normalize(Modality::Text, &raw, None)
            .is_err());
    }

    #[test]
    fn test_transcript_validation() {
        let ok = vec![
            TranscriptSegment::new(0.0, 2.0, "hello"),
            TranscriptSegment::new(2.0, 4.0, "again"),
        ];
        assert!(validate_transcript(&ok, None).is_ok());
        assert!(validate_transcript(&ok, Some(3.0)).is_ok());

        let overlapping = vec![
            TranscriptSegment::new(0.0, 3.0, "hello"),
            TranscriptSegment::new(2.0, 4.0, "again"),
        ];
        assert!(validate_transcript(&overlapping, None).is_err());

        let empty_span = vec![TranscriptSegment::new(1.0, 1.0, "hm")];
        assert!(validate_transcript(&empty_span, None).is_err());
    }

    #[test]
    fn test_segment_after_session_end_rejected() {
        let late = vec![
            TranscriptSegment::new(0.0, 2.0, "hello"),
            TranscriptSegment::new(100.0, 110.0, "much later"),
        ];
        let err = validate_transcript(&late, Some(5.0)).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
        assert!(err.to_string().contains("transcript[1]"));

        // starting on the last second is still inside the session
        let edge = vec![TranscriptSegment::new(5.0, 6.0, "bye")];
        assert!(validate_transcript(&edge, Some(5.0)).is_ok());
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(validate_duration(Some(-1.0), 1.0).is_err());
        assert!(validate_duration(Some(0.0), 1.0).is_ok());
        assert!(validate_duration(None, 1.0).is_ok());
    }

    #[test]
    fn test_unbounded_grid_rejected() {
        let err = validate_duration(Some(1e300), 1.0).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { .. }));
        assert!(validate_duration(Some(1e7), 0.5).is_err());
        assert!(validate_duration(Some(7200.0), 0.25).is_ok());
    }
}
