//! Cross-Session Pattern Matcher.
//!
//! A session is reduced to a fixed-length intensity signature sampled at
//! equally spaced phase points, so sessions of different durations compare
//! by shape rather than by absolute timing.
//!
//! Phase points are taken in continuous session time: stretching every
//! timestamp by a constant factor leaves the signature unchanged, whatever
//! the grid resolution.

use crate::config::{AnalysisConfig, PatternConfig};
use crate::core::timeline::{SessionStreams, TimelineBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Standard deviations below this are treated as a flat signal.
const FLAT_EPSILON: f64 = 1e-9;

/// Duration-normalized intensity shape of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSignature {
    pub session_id: String,
    pub subject_id: String,
    /// Intensity at K equally spaced phase points, each in [0, 1]
    pub vector: Vec<f64>,
    pub created_at: DateTime<Utc>,
}

/// A prior session whose shape resembles the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarSession {
    pub session_id: String,
    pub similarity: f64,
}

/// Outcome of comparing a session against the subject's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatchResult {
    pub has_repetition: bool,
    pub similar_sessions: Vec<SimilarSession>,
    /// Priors could not be read; no comparison was made
    #[serde(default)]
    pub store_unavailable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

impl PatternMatchResult {
    /// No repetition found.
    pub fn none() -> Self {
        Self {
            has_repetition: false,
            similar_sessions: Vec::new(),
            store_unavailable: false,
            observation: None,
        }
    }

    /// The signature store could not be read.
    pub fn unavailable() -> Self {
        Self {
            store_unavailable: true,
            ..Self::none()
        }
    }
}

/// Resample a sequence to `len` points by linear interpolation over its
/// normalized index space.
///
/// A single value is repeated; an empty input yields an empty vector.
pub fn resample(values: &[f64], len: usize) -> Vec<f64> {
    match values.len() {
        0 => Vec::new(),
        1 => vec![values[0]; len],
        n => {
            let last = (n - 1) as f64;
            (0..len)
                .map(|j| {
                    let phase = if len > 1 {
                        j as f64 / (len - 1) as f64
                    } else {
                        0.0
                    };
                    let position = phase * last;
                    let lower = (position.floor() as usize).min(n - 1);
                    let upper = (lower + 1).min(n - 1);
                    let frac = position - lower as f64;
                    values[lower] + (values[upper] - values[lower]) * frac
                })
                .collect()
        }
    }
}

/// `len` equally spaced times over `[0, duration]`, both ends included.
pub fn phase_times(duration: f64, len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = (len - 1) as f64;
            (0..len).map(|j| j as f64 / last * duration).collect()
        }
    }
}

/// Signature vector: fused intensity at `len` phase points of a session
/// lasting `duration` seconds.
pub fn signature_vector(
    builder: &TimelineBuilder,
    streams: &SessionStreams,
    duration: f64,
    len: usize,
) -> Vec<f64> {
    builder
        .intensity_at(streams, &phase_times(duration, len))
        .into_iter()
        .map(|v| v.clamp(0.0, 1.0))
        .collect()
}

/// Pearson correlation of two equal-length vectors, in [-1, 1].
///
/// A flat vector has no defined correlation and scores 0.
pub fn pearson_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return 0.0;
    }
    let sa = a.iter().population_std_dev();
    let sb = b.iter().population_std_dev();
    if !(sa > FLAT_EPSILON && sb > FLAT_EPSILON) {
        return 0.0;
    }
    let covariance = a.iter().population_covariance(b.iter());
    let r = covariance / (sa * sb);
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Compares a session's signature with the subject's prior signatures.
pub struct PatternMatcher {
    config: PatternConfig,
}

impl PatternMatcher {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.pattern.clone(),
        }
    }

    pub fn signature_len(&self) -> usize {
        self.config.signature_len
    }

    /// Build the signature for a finished session. Sessions without any
    /// samples have none.
    pub fn signature(
        &self,
        session_id: &str,
        subject_id: &str,
        builder: &TimelineBuilder,
        streams: &SessionStreams,
        duration: f64,
        created_at: DateTime<Utc>,
    ) -> Option<SessionSignature> {
        if streams.is_empty() {
            return None;
        }
        Some(SessionSignature {
            session_id: session_id.to_string(),
            subject_id: subject_id.to_string(),
            vector: signature_vector(builder, streams, duration, self.config.signature_len),
            created_at,
        })
    }

    /// Match `current` against `priors`, in prior order.
    ///
    /// Priors belonging to `session_id` itself are skipped. Matches at or
    /// above the threshold are ranked by descending similarity; ties keep
    /// the earlier prior first.
    pub fn match_against(
        &self,
        current: &[f64],
        session_id: &str,
        priors: &[SessionSignature],
    ) -> PatternMatchResult {
        let k = self.config.signature_len;
        let mut similar: Vec<SimilarSession> = Vec::new();

        for prior in priors.iter().filter(|p| p.session_id != session_id) {
            let similarity = if prior.vector.len() == k {
                pearson_similarity(current, &prior.vector)
            } else {
                pearson_similarity(current, &resample(&prior.vector, k))
            };
            tracing::trace!(prior = %prior.session_id, similarity, "compared signature");

            if similarity >= self.config.similarity_threshold {
                similar.push(SimilarSession {
                    session_id: prior.session_id.clone(),
                    similarity,
                });
            }
        }

        // sort_by is stable
        similar.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

        let observation = (!similar.is_empty()).then(|| {
            let names: Vec<&str> = similar
                .iter()
                .take(self.config.observation_limit)
                .map(|s| s.session_id.as_str())
                .collect();
            format!("Pattern similar to sessions: {}", names.join(", "))
        });

        PatternMatchResult {
            has_repetition: !similar.is_empty(),
            similar_sessions: similar,
            store_unavailable: false,
            observation,
        }
    }
}
