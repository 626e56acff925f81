//! Per-session intensity summary.
//!
//! Besides peak and spike statistics, the summary scores how well the
//! available valences agree at every grid point and lists the points where
//! they disagree most.

use crate::config::SummaryConfig;
use crate::core::timeline::TimelinePoint;
use crate::signal::types::TranscriptSegment;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

const TIME_EPSILON: f64 = 1e-9;

/// Longest transcript excerpt attached to a congruence event, in characters.
const SNIPPET_CHARS: usize = 160;

/// A grid point flagged as an intensity spike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeMoment {
    pub t: f64,
    pub intensity: f64,
}

/// A sustained run of low intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowPeriod {
    pub start: f64,
    pub end: f64,
    pub mean_intensity: f64,
}

/// A grid point where the modalities disagree strongly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongruenceEvent {
    pub t: f64,
    /// `1 - mean pairwise |valence gap| / 2`, in [0, 1]
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_valence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocal_valence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_valence: Option<f64>,
    /// Text of the transcript segment spoken at `t`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Aggregate view of a session's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensitySummary {
    pub mean_intensity: f64,
    pub peak_intensity: f64,
    pub peak_t: f64,
    pub spikes: Vec<SpikeMoment>,
    pub low_periods: Vec<LowPeriod>,
    /// Agreement between available valences, 1.0 meaning identical
    pub mean_congruence: Option<f64>,
    /// Least congruent points, worst first
    #[serde(default)]
    pub congruence_events: Vec<CongruenceEvent>,
}

/// Summarize a non-empty timeline. Returns `None` for an empty one.
///
/// Transcript segment valence, where given, stands in for the text stream
/// when scoring congruence.
pub fn summarize(
    timeline: &[TimelinePoint],
    transcript: &[TranscriptSegment],
    config: &SummaryConfig,
) -> Option<IntensitySummary> {
    let first = timeline.first()?;

    let mean_intensity = timeline.iter().map(|p| p.intensity).mean();

    // Earliest point wins on equal peaks
    let peak = timeline
        .iter()
        .fold(first, |best, p| if p.intensity > best.intensity { p } else { best });

    let spikes = timeline
        .iter()
        .filter(|p| p.spike)
        .map(|p| SpikeMoment {
            t: p.t,
            intensity: p.intensity,
        })
        .collect();

    Some(IntensitySummary {
        mean_intensity,
        peak_intensity: peak.intensity,
        peak_t: peak.t,
        spikes,
        low_periods: low_periods(timeline, config),
        mean_congruence: mean_congruence(timeline, transcript),
        congruence_events: congruence_events(timeline, transcript, config),
    })
}

fn low_periods(timeline: &[TimelinePoint], config: &SummaryConfig) -> Vec<LowPeriod> {
    let mut periods = Vec::new();
    let mut run: Vec<&TimelinePoint> = Vec::new();

    let mut flush = |run: &mut Vec<&TimelinePoint>| {
        if run.len() >= config.min_low_points {
            periods.push(LowPeriod {
                start: run[0].t,
                end: run[run.len() - 1].t,
                mean_intensity: run.iter().map(|p| p.intensity).mean(),
            });
        }
        run.clear();
    };

    for point in timeline {
        if point.has_intensity() && point.intensity < config.low_intensity {
            run.push(point);
        } else {
            flush(&mut run);
        }
    }
    flush(&mut run);

    periods
}

/// The transcript segment spoken at `t`, if any.
fn segment_at(transcript: &[TranscriptSegment], t: f64) -> Option<&TranscriptSegment> {
    transcript
        .iter()
        .find(|s| s.start - TIME_EPSILON <= t && t <= s.end + TIME_EPSILON)
}

/// Face, vocal and text valence at a point; segment valence overrides text.
fn valences_at(point: &TimelinePoint, segment: Option<&TranscriptSegment>) -> [Option<f64>; 3] {
    let text = segment.and_then(|s| s.valence).or(point.text_valence);
    [point.face_valence, point.vocal_valence, text]
}

/// `1 - mean pairwise |gap| / 2` over the present valences; needs two.
fn congruence_score(valences: &[Option<f64>; 3]) -> Option<f64> {
    let present: Vec<f64> = valences.iter().flatten().copied().collect();
    if present.len() < 2 {
        return None;
    }
    let mut gaps = Vec::new();
    for (i, a) in present.iter().enumerate() {
        for b in &present[i + 1..] {
            gaps.push((a - b).abs());
        }
    }
    Some((1.0 - gaps.iter().mean() / 2.0).clamp(0.0, 1.0))
}

/// Mean congruence over points carrying at least two valences.
pub fn mean_congruence(
    timeline: &[TimelinePoint],
    transcript: &[TranscriptSegment],
) -> Option<f64> {
    let scores: Vec<f64> = timeline
        .iter()
        .filter_map(|p| congruence_score(&valences_at(p, segment_at(transcript, p.t))))
        .collect();

    (!scores.is_empty()).then(|| scores.iter().mean())
}

/// Points scoring at or below the congruence threshold, worst first.
///
/// Equal scores keep timeline order. At most `max_congruence_events` are
/// returned.
pub fn congruence_events(
    timeline: &[TimelinePoint],
    transcript: &[TranscriptSegment],
    config: &SummaryConfig,
) -> Vec<CongruenceEvent> {
    let mut events: Vec<CongruenceEvent> = timeline
        .iter()
        .filter_map(|p| {
            let segment = segment_at(transcript, p.t);
            let valences = valences_at(p, segment);
            let score = congruence_score(&valences)?;
            let [face_valence, vocal_valence, text_valence] = valences;
            (score <= config.congruence_threshold).then(|| CongruenceEvent {
                t: p.t,
                score,
                face_valence,
                vocal_valence,
                text_valence,
                snippet: segment
                    .map(|s| s.text.trim())
                    .filter(|text| !text.is_empty())
                    .map(|text| text.chars().take(SNIPPET_CHARS).collect()),
            })
        })
        .collect();

    // sort_by is stable
    events.sort_by(|a, b| a.score.total_cmp(&b.score));
    events.truncate(config.max_congruence_events);
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(t: f64, intensity: f64) -> TimelinePoint {
        TimelinePoint {
            t,
            face_intensity: Some(intensity),
            vocal_intensity: None,
            intensity,
            spike: false,
            face_valence: None,
            vocal_valence: None,
            text_valence: None,
        }
    }

    #[test]
    fn test_empty_timeline_has_no_summary() {
        assert!(summarize(&[], &[], &SummaryConfig::default()).is_none());
    }

    #[test]
    fn test_peak_and_mean() {
        let mut timeline: Vec<TimelinePoint> = [0.2, 0.8, 0.4, 0.8]
            .iter()
            .enumerate()
            .map(|(i, &v)| point(i as f64, v))
            .collect();
        timeline[1].spike = true;

        let summary = summarize(&timeline, &[], &SummaryConfig::default()).unwrap();
        assert!((summary.mean_intensity - 0.55).abs() < 1e-12);
        assert_eq!(summary.peak_intensity, 0.8);
        assert_eq!(summary.peak_t, 1.0);
        assert_eq!(summary.spikes, vec![SpikeMoment { t: 1.0, intensity: 0.8 }]);
        assert!(summary.mean_congruence.is_none());
        assert!(summary.congruence_events.is_empty());
    }

    #[test]
    fn test_low_period_needs_minimum_run() {
        let values = [0.5, 0.1, 0.1, 0.1, 0.1, 0.1, 0.6, 0.1, 0.1, 0.5];
        let timeline: Vec<TimelinePoint> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| point(i as f64, v))
            .collect();

        let summary = summarize(&timeline, &[], &SummaryConfig::default()).unwrap();
        assert_eq!(summary.low_periods.len(), 1);
        assert_eq!(summary.low_periods[0].start, 1.0);
        assert_eq!(summary.low_periods[0].end, 5.0);
        assert!((summary.low_periods[0].mean_intensity - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_congruence() {
        let mut agreeing = point(0.0, 0.5);
        agreeing.face_valence = Some(0.5);
        agreeing.vocal_valence = Some(0.5);
        let mut opposed = point(1.0, 0.5);
        opposed.face_valence = Some(1.0);
        opposed.vocal_valence = Some(-1.0);
        let mut single = point(2.0, 0.5);
        single.text_valence = Some(0.3);

        // 1.0 and 0.0; the single-valence point is ignored
        assert_eq!(mean_congruence(&[agreeing, opposed, single], &[]), Some(0.5));
    }

    fn valenced(t: f64, face: f64, vocal: f64) -> TimelinePoint {
        let mut p = point(t, 0.5);
        p.face_valence = Some(face);
        p.vocal_valence = Some(vocal);
        p
    }

    #[test]
    fn test_congruence_events_worst_first() {
        let timeline = vec![
            valenced(0.0, 0.2, 0.1),
            valenced(1.0, 0.8, -0.6),
            valenced(2.0, 0.95, -1.0),
            valenced(3.0, 0.5, 0.4),
            valenced(4.0, 0.8, -0.6),
        ];
        let transcript =
            vec![TranscriptSegment::new(1.5, 2.5, "  I'm totally fine.  ").with_valence(0.9)];

        let events = congruence_events(&timeline, &transcript, &SummaryConfig::default());
        let times: Vec<f64> = events.iter().map(|e| e.t).collect();
        // t=1 and t=4 tie at 0.3 and keep timeline order; the segment's
        // valence lifts t=2 from 0.025 to 0.35
        assert_eq!(times, vec![1.0, 4.0, 2.0]);
        assert!((events[0].score - 0.3).abs() < 1e-12);
        assert!((events[2].score - 0.35).abs() < 1e-12);
        assert_eq!(events[2].snippet.as_deref(), Some("I'm totally fine."));
        assert_eq!(events[2].text_valence, Some(0.9));
        assert!(events[0].snippet.is_none());
    }

    #[test]
    fn test_congruence_events_capped() {
        let timeline: Vec<TimelinePoint> =
            (0..10).map(|t| valenced(t as f64, 1.0, -1.0)).collect();
        let config = SummaryConfig {
            max_congruence_events: 3,
            ..SummaryConfig::default()
        };

        let events = congruence_events(&timeline, &[], &config);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].t, 0.0);
        assert_eq!(events[0].score, 0.0);
    }
}
