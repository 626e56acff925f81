//! Per-sample scalar scores.
//!
//! Intensity measures activation regardless of which category dominates;
//! valence is the signed polarity of the distribution.

use crate::signal::types::{CategoryDistribution, EmotionCategory, ModalitySample};

/// Intensity of a distribution, in [0, 1].
///
/// `1 - P(neutral)` when a neutral entry exists, otherwise
/// `1 - max(distribution)`. An empty distribution has no intensity.
pub fn intensity(distribution: &CategoryDistribution) -> Option<f64> {
    let reference = match distribution.get(EmotionCategory::Neutral) {
        Some(neutral) => neutral,
        None => distribution.max_probability()?,
    };
    Some((1.0 - reference).clamp(0.0, 1.0))
}

/// Valence of a distribution, in [-1, 1].
pub fn valence(distribution: &CategoryDistribution) -> Option<f64> {
    if distribution.is_empty() {
        return None;
    }
    let v: f64 = distribution
        .iter()
        .map(|(category, p)| p * category.polarity())
        .sum();
    Some(v.clamp(-1.0, 1.0))
}

/// Scores of a single sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleScores {
    pub intensity: Option<f64>,
    pub valence: Option<f64>,
}

/// Score a sample. An explicit upstream valence passes through unchanged.
pub fn score_sample(sample: &ModalitySample) -> SampleScores {
    SampleScores {
        intensity: intensity(&sample.distribution),
        valence: sample.valence.or_else(|| valence(&sample.distribution)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EmotionCategory::*;

    fn dist(entries: &[(EmotionCategory, f64)]) -> CategoryDistribution {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_intensity_from_neutral() {
        let d = dist(&[(Neutral, 0.2), (Joy, 0.8)]);
        assert!((intensity(&d).unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_intensity_without_neutral_uses_max() {
        let d = dist(&[(Joy, 0.7), (Fear, 0.3)]);
        assert!((intensity(&d).unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(intensity(&CategoryDistribution::new()), None);
    }

    #[test]
    fn test_valence_polarity() {
        let d = dist(&[(Neutral, 0.2), (Joy, 0.8)]);
        assert!((valence(&d).unwrap() - 0.8).abs() < 1e-12);

        let d = dist(&[(Neutral, 0.05), (Fear, 0.95)]);
        assert!((valence(&d).unwrap() + 0.95).abs() < 1e-12);

        let d = dist(&[(Calm, 0.6), (Neutral, 0.4)]);
        assert_eq!(valence(&d), Some(0.0));

        let d = dist(&[(Surprise, 1.0)]);
        assert_eq!(valence(&d), Some(0.5));
    }

    #[test]
    fn test_explicit_valence_passes_through() {
        let sample = ModalitySample {
            timestamp: 0.0,
            distribution: dist(&[(Joy, 1.0)]),
            valence: Some(-0.4),
        };
        let scores = score_sample(&sample);
        assert_eq!(scores.valence, Some(-0.4));
        // No neutral entry, max is 1.0
        assert_eq!(scores.intensity, Some(0.0));
    }
}
