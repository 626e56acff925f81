//! Incongruence Detector.
//!
//! Scans the fused timeline window by window and flags intervals where the
//! modalities disagree. Windows are transcript segments when a transcript is
//! available, otherwise fixed-width sliding windows over the grid.
//!
//! Detection is driven by an ordered list of [`IncongruenceRule`]
//! descriptors. Every rule names the signals it requires; a rule never fires
//! on a window where one of them is absent.

use crate::config::{AnalysisConfig, IncongruenceConfig};
use crate::core::timeline::TimelinePoint;
use crate::signal::types::TranscriptSegment;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fmt;

const TIME_EPSILON: f64 = 1e-9;

/// Kind of detected mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncongruenceKind {
    /// Strongly polarized words with near-zero activation
    EmotionalFlattening,
    /// Positive words while face/voice read negative
    PositiveWordsNegativePhysiology,
    /// Negative words while face/voice read positive
    NegativeWordsPositivePhysiology,
    /// Positive face, negative voice
    SmilingButVoiceShowsStress,
    /// Negative face, neutral or positive voice
    NegativeFaceButCalmVoice,
}

impl IncongruenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IncongruenceKind::EmotionalFlattening => "emotional_flattening",
            IncongruenceKind::PositiveWordsNegativePhysiology => {
                "positive_words_negative_physiology"
            }
            IncongruenceKind::NegativeWordsPositivePhysiology => {
                "negative_words_positive_physiology"
            }
            IncongruenceKind::SmilingButVoiceShowsStress => "smiling_but_voice_shows_stress",
            IncongruenceKind::NegativeFaceButCalmVoice => "negative_face_but_calm_voice",
        }
    }
}

impl fmt::Display for IncongruenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An input a rule depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The window is a transcript segment
    Transcript,
    TextValence,
    FaceValence,
    AudioValence,
    /// Face or audio valence, whichever is stronger
    NonverbalValence,
    Intensity,
}

/// How a repeated trigger of the same kind is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Extend the previous marker when the new window overlaps or touches it
    Extend,
    /// Always emit a separate marker
    Distinct,
}

/// Predicate over one window's metrics.
pub type TriggerFn = fn(&WindowMetrics, &IncongruenceConfig) -> bool;

/// Declarative description of one detection rule.
#[derive(Debug, Clone)]
pub struct IncongruenceRule {
    pub kind: IncongruenceKind,
    pub required: &'static [Signal],
    pub trigger: TriggerFn,
    pub merge: MergePolicy,
}

impl IncongruenceRule {
    fn applies(&self, window: &WindowMetrics, config: &IncongruenceConfig) -> bool {
        self.required.iter().all(|&s| window.has(s)) && (self.trigger)(window, config)
    }
}

/// Aggregated signal values over one detection window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMetrics {
    pub start: f64,
    pub end: f64,
    pub face_valence: Option<f64>,
    pub audio_valence: Option<f64>,
    pub text_valence: Option<f64>,
    pub intensity: Option<f64>,
    pub from_transcript: bool,
    pub snippet: Option<String>,
}

impl WindowMetrics {
    pub fn has(&self, signal: Signal) -> bool {
        match signal {
            Signal::Transcript => self.from_transcript,
            Signal::TextValence => self.text_valence.is_some(),
            Signal::FaceValence => self.face_valence.is_some(),
            Signal::AudioValence => self.audio_valence.is_some(),
            Signal::NonverbalValence => self.nonverbal_valence().is_some(),
            Signal::Intensity => self.intensity.is_some(),
        }
    }

    /// Face or audio valence with the larger magnitude; face wins ties.
    pub fn nonverbal_valence(&self) -> Option<f64> {
        self.metrics().nonverbal_valence()
    }

    fn metrics(&self) -> MarkerMetrics {
        MarkerMetrics {
            text_valence: self.text_valence,
            face_valence: self.face_valence,
            audio_valence: self.audio_valence,
            intensity: self.intensity,
        }
    }
}

/// Signal values recorded on a marker for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerMetrics {
    pub text_valence: Option<f64>,
    pub face_valence: Option<f64>,
    pub audio_valence: Option<f64>,
    pub intensity: Option<f64>,
}

impl MarkerMetrics {
    /// Face or audio valence with the larger magnitude; face wins ties.
    pub fn nonverbal_valence(&self) -> Option<f64> {
        match (self.face_valence, self.audio_valence) {
            (Some(f), Some(a)) => Some(if a.abs() > f.abs() { a } else { f }),
            (f, a) => f.or(a),
        }
    }
}

/// A detected interval of incongruence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncongruenceMarker {
    pub start: f64,
    pub end: f64,
    pub kind: IncongruenceKind,
    /// Mean of the triggering windows' metrics
    pub metrics: MarkerMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_snippet: Option<String>,
    /// Number of triggering windows merged into this marker
    pub window_count: u32,
    /// Readable account of the disagreement, built from `metrics`
    #[serde(default)]
    pub explanation: String,
}

fn signed(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:+.2}"))
}

/// Describe a marker in terms of the values that triggered it.
pub fn explain(kind: IncongruenceKind, metrics: &MarkerMetrics) -> String {
    match kind {
        IncongruenceKind::EmotionalFlattening => format!(
            "Strongly polarized words (valence {}) with little visible activation (intensity {}).",
            signed(metrics.text_valence),
            metrics
                .intensity
                .map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
        ),
        IncongruenceKind::PositiveWordsNegativePhysiology => format!(
            "Words read positive (valence {}) while face and voice read negative (valence {}).",
            signed(metrics.text_valence),
            signed(metrics.nonverbal_valence())
        ),
        IncongruenceKind::NegativeWordsPositivePhysiology => format!(
            "Words read negative (valence {}) while face and voice read positive (valence {}).",
            signed(metrics.text_valence),
            signed(metrics.nonverbal_valence())
        ),
        IncongruenceKind::SmilingButVoiceShowsStress => format!(
            "Face reads positive (valence {}) while the voice reads tense (valence {}).",
            signed(metrics.face_valence),
            signed(metrics.audio_valence)
        ),
        IncongruenceKind::NegativeFaceButCalmVoice => format!(
            "Face reads negative (valence {}) while the voice stays calm (valence {}).",
            signed(metrics.face_valence),
            signed(metrics.audio_valence)
        ),
    }
}

/// The rule set applied when none is supplied.
pub fn default_rules() -> Vec<IncongruenceRule> {
    vec![
        IncongruenceRule {
            kind: IncongruenceKind::EmotionalFlattening,
            required: &[Signal::Transcript, Signal::TextValence, Signal::Intensity],
            trigger: emotional_flattening,
            merge: MergePolicy::Extend,
        },
        IncongruenceRule {
            kind: IncongruenceKind::PositiveWordsNegativePhysiology,
            required: &[Signal::Transcript, Signal::TextValence, Signal::NonverbalValence],
            trigger: positive_words_negative_physiology,
            merge: MergePolicy::Extend,
        },
        IncongruenceRule {
            kind: IncongruenceKind::NegativeWordsPositivePhysiology,
            required: &[Signal::Transcript, Signal::TextValence, Signal::NonverbalValence],
            trigger: negative_words_positive_physiology,
            merge: MergePolicy::Extend,
        },
        IncongruenceRule {
            kind: IncongruenceKind::SmilingButVoiceShowsStress,
            required: &[Signal::FaceValence, Signal::AudioValence],
            trigger: smiling_but_voice_shows_stress,
            merge: MergePolicy::Extend,
        },
        IncongruenceRule {
            kind: IncongruenceKind::NegativeFaceButCalmVoice,
            required: &[Signal::FaceValence, Signal::AudioValence],
            trigger: negative_face_but_calm_voice,
            merge: MergePolicy::Extend,
        },
    ]
}

fn emotional_flattening(w: &WindowMetrics, c: &IncongruenceConfig) -> bool {
    let (Some(text), Some(intensity)) = (w.text_valence, w.intensity) else {
        return false;
    };
    text.abs() >= c.strong_text_valence && intensity <= c.flat_intensity
}

fn positive_words_negative_physiology(w: &WindowMetrics, c: &IncongruenceConfig) -> bool {
    let (Some(text), Some(body)) = (w.text_valence, w.nonverbal_valence()) else {
        return false;
    };
    text > 0.0 && body < 0.0 && (text - body).abs() > c.valence_gap
}

fn negative_words_positive_physiology(w: &WindowMetrics, c: &IncongruenceConfig) -> bool {
    let (Some(text), Some(body)) = (w.text_valence, w.nonverbal_valence()) else {
        return false;
    };
    text < 0.0 && body > 0.0 && (text - body).abs() > c.valence_gap
}

fn smiling_but_voice_shows_stress(w: &WindowMetrics, c: &IncongruenceConfig) -> bool {
    let (Some(face), Some(audio)) = (w.face_valence, w.audio_valence) else {
        return false;
    };
    face > 0.0
        && audio < 0.0
        && face - audio > c.valence_gap
        && face.abs().max(audio.abs()) > c.confidence_floor
}

fn negative_face_but_calm_voice(w: &WindowMetrics, c: &IncongruenceConfig) -> bool {
    let (Some(face), Some(audio)) = (w.face_valence, w.audio_valence) else {
        return false;
    };
    face < 0.0
        && audio >= -c.calm_voice_band
        && audio - face > c.valence_gap
        && face.abs().max(audio.abs()) > c.confidence_floor
}

/// Marker under construction; metrics are averaged when it is closed.
struct OpenMarker {
    start: f64,
    end: f64,
    kind: IncongruenceKind,
    windows: Vec<MarkerMetrics>,
    snippets: Vec<String>,
}

impl OpenMarker {
    fn new(kind: IncongruenceKind, window: &WindowMetrics) -> Self {
        let mut marker = Self {
            start: window.start,
            end: window.end,
            kind,
            windows: Vec::new(),
            snippets: Vec::new(),
        };
        marker.absorb(window);
        marker
    }

    fn absorb(&mut self, window: &WindowMetrics) {
        self.end = self.end.max(window.end);
        self.windows.push(window.metrics());
        if let Some(ref snippet) = window.snippet {
            if !self.snippets.contains(snippet) {
                self.snippets.push(snippet.clone());
            }
        }
    }

    fn close(self) -> IncongruenceMarker {
        let average = |field: fn(&MarkerMetrics) -> Option<f64>| {
            let values: Vec<f64> = self.windows.iter().filter_map(field).collect();
            mean(&values)
        };
        let metrics = MarkerMetrics {
            text_valence: average(|m| m.text_valence),
            face_valence: average(|m| m.face_valence),
            audio_valence: average(|m| m.audio_valence),
            intensity: average(|m| m.intensity),
        };
        IncongruenceMarker {
            start: self.start,
            end: self.end,
            kind: self.kind,
            explanation: explain(self.kind, &metrics),
            metrics,
            transcript_snippet: if self.snippets.is_empty() {
                None
            } else {
                Some(self.snippets.join(" "))
            },
            window_count: self.windows.len() as u32,
        }
    }
}

/// Applies the rule set to a fused timeline.
pub struct IncongruenceDetector {
    config: IncongruenceConfig,
    resolution: f64,
    rules: Vec<IncongruenceRule>,
}

impl IncongruenceDetector {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.incongruence.clone(),
            resolution: config.grid_resolution_secs,
            rules: default_rules(),
        }
    }

    /// Replace the rule set.
    pub fn with_rules(mut self, rules: Vec<IncongruenceRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &[IncongruenceRule] {
        &self.rules
    }

    /// Detect markers, ordered by start.
    ///
    /// `transcript` must be ordered and non-overlapping.
    pub fn detect(
        &self,
        timeline: &[TimelinePoint],
        transcript: &[TranscriptSegment],
    ) -> Vec<IncongruenceMarker> {
        if timeline.is_empty() {
            return Vec::new();
        }

        let windows = if transcript.is_empty() {
            self.sliding_windows(timeline)
        } else {
            self.transcript_windows(timeline, transcript)
        };

        let mut markers: Vec<OpenMarker> = Vec::new();
        let mut last_by_kind: HashMap<IncongruenceKind, usize> = HashMap::new();

        for window in &windows {
            for rule in &self.rules {
                if !rule.applies(window, &self.config) {
                    continue;
                }

                let previous = match rule.merge {
                    MergePolicy::Extend => last_by_kind
                        .get(&rule.kind)
                        .copied()
                        .filter(|&i| window.start <= markers[i].end + TIME_EPSILON),
                    MergePolicy::Distinct => None,
                };

                match previous {
                    Some(index) => markers[index].absorb(window),
                    None => {
                        last_by_kind.insert(rule.kind, markers.len());
                        markers.push(OpenMarker::new(rule.kind, window));
                    }
                }
            }
        }

        tracing::debug!(
            windows = windows.len(),
            markers = markers.len(),
            transcript = !transcript.is_empty(),
            "incongruence scan complete"
        );

        markers.into_iter().map(OpenMarker::close).collect()
    }

    /// Fixed-width windows stepping across the grid.
    fn sliding_windows(&self, timeline: &[TimelinePoint]) -> Vec<WindowMetrics> {
        let last_t = timeline.last().map(|p| p.t).unwrap_or(0.0);
        let width = self.config.window_secs;
        let step = self.config.step_secs;

        let mut windows = Vec::new();
        let mut k = 0usize;
        loop {
            let start = k as f64 * step;
            if k > 0 && start >= last_t - TIME_EPSILON {
                break;
            }
            let end = start + width;
            let points: Vec<&TimelinePoint> = timeline
                .iter()
                .filter(|p| p.t >= start - TIME_EPSILON && p.t < end - TIME_EPSILON)
                .collect();
            windows.push(aggregate(start, end, &points, None, None));
            k += 1;
        }
        windows
    }

    /// One window per transcript segment that overlaps the timeline.
    fn transcript_windows(
        &self,
        timeline: &[TimelinePoint],
        transcript: &[TranscriptSegment],
    ) -> Vec<WindowMetrics> {
        let last_t = timeline.last().map(|p| p.t).unwrap_or(0.0);

        transcript
            .iter()
            .filter_map(|segment| {
                let mut points: Vec<&TimelinePoint> = timeline
                    .iter()
                    .filter(|p| {
                        p.t >= segment.start - TIME_EPSILON && p.t <= segment.end + TIME_EPSILON
                    })
                    .collect();
                if points.is_empty() {
                    if segment.start > last_t + self.resolution {
                        tracing::debug!(
                            start = segment.start,
                            end = segment.end,
                            "transcript segment lies past the timeline, skipped"
                        );
                        return None;
                    }
                    // Segment falls between grid points: use the point holding at its start
                    let index = ((segment.start / self.resolution).floor() as usize)
                        .min(timeline.len() - 1);
                    points.push(&timeline[index]);
                }

                let text = segment.text.trim();
                let snippet = (!text.is_empty()).then(|| segment.text.clone());
                let mut window =
                    aggregate(segment.start, segment.end, &points, segment.valence, snippet);
                window.from_transcript = true;
                Some(window)
            })
            .collect()
    }
}

/// Mean of per-point values over a window.
fn aggregate(
    start: f64,
    end: f64,
    points: &[&TimelinePoint],
    text_override: Option<f64>,
    snippet: Option<String>,
) -> WindowMetrics {
    let collect = |field: fn(&TimelinePoint) -> Option<f64>| {
        let values: Vec<f64> = points.iter().filter_map(|p| field(*p)).collect();
        mean(&values)
    };

    WindowMetrics {
        start,
        end,
        face_valence: collect(|p| p.face_valence),
        audio_valence: collect(|p| p.vocal_valence),
        text_valence: text_override.or_else(|| collect(|p| p.text_valence)),
        intensity: collect(|p| p.has_intensity().then_some(p.intensity)),
        from_transcript: false,
        snippet,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().mean())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(t: f64, intensity: f64, face: Option<f64>, vocal: Option<f64>) -> TimelinePoint {
        TimelinePoint {
            t,
            face_intensity: Some(intensity),
            vocal_intensity: Some(intensity),
            intensity,
            spike: false,
            face_valence: face,
            vocal_valence: vocal,
            text_valence: None,
        }
    }

    fn detector() -> IncongruenceDetector {
        IncongruenceDetector::new(&AnalysisConfig::default())
    }

    #[test]
    fn test_smiling_with_stressed_voice_merges_into_one_marker() {
        let mut timeline: Vec<TimelinePoint> =
            (0..4).map(|t| point(t as f64, 0.5, Some(0.1), Some(0.0))).collect();
        timeline.extend((4..8).map(|t| point(t as f64, 0.6, Some(0.8), Some(-0.6))));
        timeline.extend((8..12).map(|t| point(t as f64, 0.5, Some(0.1), Some(0.0))));

        let markers = detector().detect(&timeline, &[]);
        let smiling: Vec<&IncongruenceMarker> = markers
            .iter()
            .filter(|m| m.kind == IncongruenceKind::SmilingButVoiceShowsStress)
            .collect();

        assert_eq!(smiling.len(), 1);
        let marker = smiling[0];
        assert!(marker.start < marker.end);
        assert!(marker.start <= 4.0 && marker.end >= 8.0);
        assert!(marker.window_count > 1);
        assert!(marker.transcript_snippet.is_none());
    }

    #[test]
    fn test_noise_level_disagreement_ignored() {
        // Opposite signs but both below the confidence floor
        let timeline: Vec<TimelinePoint> =
            (0..6).map(|t| point(t as f64, 0.3, Some(0.15), Some(-0.16))).collect();
        assert!(detector().detect(&timeline, &[]).is_empty());
    }

    #[test]
    fn test_negative_face_calm_voice() {
        let timeline: Vec<TimelinePoint> =
            (0..5).map(|t| point(t as f64, 0.6, Some(-0.7), Some(0.05))).collect();
        let markers = detector().detect(&timeline, &[]);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].kind, IncongruenceKind::NegativeFaceButCalmVoice);
        assert_eq!(markers[0].start, 0.0);
    }

    #[test]
    fn test_face_voice_rules_need_both_signals() {
        let timeline: Vec<TimelinePoint> =
            (0..5).map(|t| point(t as f64, 0.6, Some(-0.9), None)).collect();
        assert!(detector().detect(&timeline, &[]).is_empty());
    }

    #[test]
    fn test_flattening_on_transcript_segment() {
        let timeline: Vec<TimelinePoint> =
            (0..10).map(|t| point(t as f64, 0.05, Some(0.0), Some(0.0))).collect();
        let transcript = vec![
            TranscriptSegment::new(1.0, 4.0, "My father died last month.").with_valence(-0.8),
            TranscriptSegment::new(5.0, 7.0, "Anyway.").with_valence(0.0),
        ];

        let markers = detector().detect(&timeline, &transcript);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].kind, IncongruenceKind::EmotionalFlattening);
        assert_eq!(markers[0].start, 1.0);
        assert_eq!(markers[0].end, 4.0);
        assert_eq!(
            markers[0].transcript_snippet.as_deref(),
            Some("My father died last month.")
        );
        assert_eq!(markers[0].metrics.text_valence, Some(-0.8));
        assert!(markers[0].explanation.starts_with("Strongly polarized words (valence -0.80)"));
    }

    #[test]
    fn test_text_rules_silent_without_transcript() {
        let mut timeline: Vec<TimelinePoint> =
            (0..6).map(|t| point(t as f64, 0.02, Some(0.0), Some(0.0))).collect();
        for p in &mut timeline {
            p.text_valence = Some(0.9);
        }
        assert!(detector().detect(&timeline, &[]).is_empty());
    }

    #[test]
    fn test_positive_words_negative_physiology() {
        let timeline: Vec<TimelinePoint> =
            (0..6).map(|t| point(t as f64, 0.6, Some(-0.5), Some(-0.4))).collect();
        let transcript =
            vec![TranscriptSegment::new(0.0, 5.0, "I'm fine, really.").with_valence(0.7)];

        let markers = detector().detect(&timeline, &transcript);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].kind, IncongruenceKind::PositiveWordsNegativePhysiology);
    }

    #[test]
    fn test_negative_words_positive_physiology() {
        let timeline: Vec<TimelinePoint> =
            (0..6).map(|t| point(t as f64, 0.6, Some(0.6), Some(0.2))).collect();
        let transcript =
            vec![TranscriptSegment::new(1.0, 4.0, "Nothing ever works out.").with_valence(-0.7)];

        let markers = detector().detect(&timeline, &transcript);
        assert_eq!(markers.len(), 1);
        let marker = &markers[0];
        assert_eq!(marker.kind, IncongruenceKind::NegativeWordsPositivePhysiology);
        assert_eq!((marker.start, marker.end), (1.0, 4.0));
        assert_eq!(marker.metrics.text_valence, Some(-0.7));
        // face is the stronger nonverbal signal
        assert_eq!(marker.metrics.nonverbal_valence(), Some(0.6));
        assert_eq!(
            marker.explanation,
            "Words read negative (valence -0.70) while face and voice read positive (valence +0.60)."
        );
    }

    #[test]
    fn test_negative_words_small_gap_ignored() {
        // |-0.1 - 0.15| = 0.25 does not exceed the 0.3 gap
        let timeline: Vec<TimelinePoint> =
            (0..6).map(|t| point(t as f64, 0.6, Some(0.15), Some(0.05))).collect();
        let transcript =
            vec![TranscriptSegment::new(1.0, 4.0, "Could be better.").with_valence(-0.1)];

        assert!(detector().detect(&timeline, &transcript).is_empty());
    }

    #[test]
    fn test_explanation_for_each_kind() {
        let metrics = MarkerMetrics {
            text_valence: Some(0.8),
            face_valence: Some(-0.5),
            audio_valence: None,
            intensity: Some(0.04),
        };
        assert_eq!(
            explain(IncongruenceKind::EmotionalFlattening, &metrics),
            "Strongly polarized words (valence +0.80) with little visible activation (intensity 0.04)."
        );
        assert!(explain(IncongruenceKind::PositiveWordsNegativePhysiology, &metrics)
            .contains("(valence -0.50)"));
        assert!(explain(IncongruenceKind::NegativeFaceButCalmVoice, &metrics)
            .ends_with("stays calm (valence n/a)."));
    }

    #[test]
    fn test_segment_past_timeline_skipped() {
        let timeline: Vec<TimelinePoint> =
            (0..6).map(|t| point(t as f64, 0.05, Some(0.0), Some(0.0))).collect();
        let transcript =
            vec![TranscriptSegment::new(100.0, 110.0, "Much later.").with_valence(-0.9)];

        assert!(detector().detect(&timeline, &transcript).is_empty());
    }

    #[test]
    fn test_touching_segments_merge_for_same_kind() {
        let timeline: Vec<TimelinePoint> =
            (0..8).map(|t| point(t as f64, 0.05, Some(0.0), Some(0.0))).collect();
        let transcript = vec![
            TranscriptSegment::new(0.0, 3.0, "It was terrible.").with_valence(-0.7),
            TranscriptSegment::new(3.0, 6.0, "Just awful.").with_valence(-0.9),
        ];

        let markers = detector().detect(&timeline, &transcript);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].start, 0.0);
        assert_eq!(markers[0].end, 6.0);
        assert_eq!(markers[0].window_count, 2);
        assert_eq!(
            markers[0].transcript_snippet.as_deref(),
            Some("It was terrible. Just awful.")
        );
        assert!((markers[0].metrics.text_valence.unwrap() + 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_distinct_policy_keeps_windows_apart() {
        let rules: Vec<IncongruenceRule> = default_rules()
            .into_iter()
            .map(|mut rule| {
                rule.merge = MergePolicy::Distinct;
                rule
            })
            .collect();
        let timeline: Vec<TimelinePoint> =
            (0..5).map(|t| point(t as f64, 0.6, Some(-0.7), Some(0.05))).collect();

        let markers = detector().with_rules(rules).detect(&timeline, &[]);
        // windows start at 0, 1, 2, 3
        assert_eq!(markers.len(), 4);
        assert!(markers.windows(2).all(|w| w[0].start <= w[1].start));
    }

    #[test]
    fn test_segment_between_grid_points_uses_holding_point() {
        let timeline: Vec<TimelinePoint> =
            (0..4).map(|t| point(t as f64, 0.05, Some(0.0), Some(0.0))).collect();
        let transcript =
            vec![TranscriptSegment::new(1.2, 1.6, "No.").with_valence(-0.9)];

        let markers = detector().detect(&timeline, &transcript);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].metrics.intensity, Some(0.05));
    }
}
