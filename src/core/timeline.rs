//! Timeline Builder.
//!
//! Resamples the three modality streams onto a shared fixed-rate grid,
//! fuses face and vocal intensity, and flags intensity spikes.
//!
//! Each modality is resampled with a nearest-preceding-sample hold: a
//! sample's value is valid from its timestamp until the next sample of the
//! same modality. Grid points before a modality's first sample take that
//! first value. A modality with no samples stays `None` throughout.

use crate::config::{AnalysisConfig, FusionWeights, SpikeConfig};
use crate::core::scoring::{score_sample, SampleScores};
use crate::signal::types::{Modality, ModalityStream};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Tolerance when comparing sample timestamps against grid times.
const TIME_EPSILON: f64 = 1e-9;

/// Upper bound on the number of grid points in one timeline.
pub const MAX_GRID_POINTS: usize = 10_000_000;

/// One point of the fused timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// Grid time in seconds
    pub t: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_intensity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocal_intensity: Option<f64>,
    /// Fused intensity (0-1)
    pub intensity: f64,
    pub spike: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_valence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocal_valence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_valence: Option<f64>,
}

impl TimelinePoint {
    /// Whether the fused intensity is backed by at least one modality.
    pub fn has_intensity(&self) -> bool {
        self.face_intensity.is_some() || self.vocal_intensity.is_some()
    }
}

/// The validated streams of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStreams {
    pub face: ModalityStream,
    pub audio: ModalityStream,
    pub text: ModalityStream,
}

impl SessionStreams {
    pub fn empty() -> Self {
        Self {
            face: ModalityStream::new(Modality::Face),
            audio: ModalityStream::new(Modality::Audio),
            text: ModalityStream::new(Modality::Text),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.face.is_empty() && self.audio.is_empty() && self.text.is_empty()
    }

    /// Latest sample timestamp across all modalities.
    pub fn last_timestamp(&self) -> Option<f64> {
        [&self.face, &self.audio, &self.text]
            .iter()
            .filter_map(|s| s.last_timestamp())
            .reduce(f64::max)
    }
}

/// Builds the fused timeline of a session.
#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    resolution: f64,
    fusion: FusionWeights,
    spike: SpikeConfig,
}

impl TimelineBuilder {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            resolution: config.grid_resolution_secs,
            fusion: config.fusion.clone(),
            spike: config.spike.clone(),
        }
    }

    /// Grid resolution in seconds.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Session length: `duration` when given, otherwise the latest sample.
    pub fn span(streams: &SessionStreams, duration: Option<f64>) -> f64 {
        duration
            .or_else(|| streams.last_timestamp())
            .unwrap_or(0.0)
    }

    /// Build the timeline covering `[0, duration]`.
    ///
    /// `duration` defaults to the latest sample timestamp. An all-empty
    /// session yields an empty timeline.
    pub fn build(&self, streams: &SessionStreams, duration: Option<f64>) -> Vec<TimelinePoint> {
        if streams.is_empty() {
            return Vec::new();
        }
        let duration = Self::span(streams, duration);

        let grid = self.grid(duration);
        let face = hold_resample(&streams.face, &grid);
        let audio = hold_resample(&streams.audio, &grid);
        let text = hold_resample(&streams.text, &grid);

        let mut timeline: Vec<TimelinePoint> = grid
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let face_intensity = face.get(i).and_then(|s| s.intensity);
                let vocal_intensity = audio.get(i).and_then(|s| s.intensity);
                TimelinePoint {
                    t,
                    face_intensity,
                    vocal_intensity,
                    intensity: self.fuse(face_intensity, vocal_intensity),
                    spike: false,
                    face_valence: face.get(i).and_then(|s| s.valence),
                    vocal_valence: audio.get(i).and_then(|s| s.valence),
                    text_valence: text.get(i).and_then(|s| s.valence),
                }
            })
            .collect();

        let spikes = self.mark_spikes(&mut timeline);
        tracing::debug!(
            points = timeline.len(),
            spikes,
            duration,
            "built fused timeline"
        );

        timeline
    }

    /// Fused intensity at arbitrary ascending `times`.
    ///
    /// Streams are held and fused exactly as on the grid, so the values do
    /// not depend on where grid points happen to fall.
    pub fn intensity_at(&self, streams: &SessionStreams, times: &[f64]) -> Vec<f64> {
        let face = hold_resample(&streams.face, times);
        let audio = hold_resample(&streams.audio, times);
        (0..times.len())
            .map(|i| {
                self.fuse(
                    face.get(i).and_then(|s| s.intensity),
                    audio.get(i).and_then(|s| s.intensity),
                )
            })
            .collect()
    }

    /// Grid times `i * resolution` for every `i` with `t <= duration`,
    /// capped at [`MAX_GRID_POINTS`].
    fn grid(&self, duration: f64) -> Vec<f64> {
        let steps = (duration / self.resolution)
            .floor()
            .min((MAX_GRID_POINTS - 1) as f64);
        let mut last = steps as usize;
        if last + 1 < MAX_GRID_POINTS && (last + 1) as f64 * self.resolution <= duration {
            last += 1;
        }
        while last > 0 && last as f64 * self.resolution > duration {
            last -= 1;
        }
        (0..=last).map(|i| i as f64 * self.resolution).collect()
    }

    /// Weighted mean over the modalities present at a point.
    fn fuse(&self, face: Option<f64>, vocal: Option<f64>) -> f64 {
        let fused = match (face, vocal) {
            (Some(f), Some(v)) if f == v => f,
            (Some(f), Some(v)) => {
                let FusionWeights {
                    face_weight,
                    vocal_weight,
                } = self.fusion;
                (face_weight * f + vocal_weight * v) / (face_weight + vocal_weight)
            }
            (Some(f), None) => f,
            (None, Some(v)) => v,
            (None, None) => 0.0,
        };
        fused.clamp(0.0, 1.0)
    }

    /// Flag spikes in place and return how many were flagged.
    ///
    /// A spike exceeds `max(mean + k * std, floor)` and is a local maximum:
    /// strictly above its left neighbor and not below its right one.
    fn mark_spikes(&self, timeline: &mut [TimelinePoint]) -> usize {
        let values: Vec<f64> = timeline
            .iter()
            .filter(|p| p.has_intensity())
            .map(|p| p.intensity)
            .collect();
        if values.is_empty() {
            return 0;
        }

        let mean = values.iter().mean();
        let std = values.iter().population_std_dev();
        let threshold = (mean + self.spike.std_multiplier * std).max(self.spike.absolute_floor);

        let flags: Vec<bool> = (0..timeline.len())
            .map(|i| {
                let point = &timeline[i];
                let above_left = i == 0 || point.intensity > timeline[i - 1].intensity;
                let not_below_right =
                    i + 1 == timeline.len() || point.intensity >= timeline[i + 1].intensity;
                point.has_intensity() && point.intensity > threshold && above_left && not_below_right
            })
            .collect();

        let mut count = 0;
        for (point, flag) in timeline.iter_mut().zip(flags) {
            point.spike = flag;
            count += usize::from(flag);
        }
        count
    }
}

/// Resample one stream onto the grid with a nearest-preceding-sample hold.
///
/// Returns an empty vector for an empty stream.
fn hold_resample(stream: &ModalityStream, grid: &[f64]) -> Vec<SampleScores> {
    if stream.is_empty() {
        return Vec::new();
    }
    let scores: Vec<SampleScores> = stream.samples.iter().map(score_sample).collect();

    let mut cursor = 0;
    grid.iter()
        .map(|&t| {
            while cursor + 1 < stream.samples.len()
                && stream.samples[cursor + 1].timestamp <= t + TIME_EPSILON
            {
                cursor += 1;
            }
            scores[cursor]
        })
        .collect()
}
