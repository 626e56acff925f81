//! Signal types shared by every stage of the pipeline.
//!
//! Upstream producers hand over loosely-typed score dictionaries
//! ([`RawSample`]). The adapter turns them into [`ModalitySample`]s whose
//! categories come from a closed, per-modality vocabulary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One independent channel of emotion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    /// Facial expression
    Face,
    /// Vocal tone
    Audio,
    /// Text-derived sentiment
    Text,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Face, Modality::Audio, Modality::Text];

    /// The closed category vocabulary this modality accepts.
    pub fn vocabulary(self) -> &'static [EmotionCategory] {
        use EmotionCategory::*;
        match self {
            Modality::Face | Modality::Text => {
                &[Neutral, Joy, Sadness, Anger, Fear, Disgust, Surprise]
            }
            Modality::Audio => &[Neutral, Calm, Joy, Sadness, Anger, Fear, Disgust, Surprise],
        }
    }

    /// Check whether a category belongs to this modality's vocabulary.
    pub fn accepts(self, category: EmotionCategory) -> bool {
        self.vocabulary().contains(&category)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Face => "face",
            Modality::Audio => "audio",
            Modality::Text => "text",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emotion category known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionCategory {
    Neutral,
    Calm,
    Joy,
    Sadness,
    Anger,
    Fear,
    Disgust,
    Surprise,
}

impl EmotionCategory {
    /// Resolve an upstream label, accepting the common classifier aliases.
    pub fn parse(label: &str) -> Option<Self> {
        let category = match label.trim().to_lowercase().as_str() {
            "neutral" => EmotionCategory::Neutral,
            "calm" => EmotionCategory::Calm,
            "joy" | "happy" | "happiness" => EmotionCategory::Joy,
            "sadness" | "sad" => EmotionCategory::Sadness,
            "anger" | "angry" => EmotionCategory::Anger,
            "fear" | "fearful" => EmotionCategory::Fear,
            "disgust" | "disgusted" => EmotionCategory::Disgust,
            "surprise" | "surprised" => EmotionCategory::Surprise,
            _ => return None,
        };
        Some(category)
    }

    /// Polarity weight used when deriving valence.
    pub fn polarity(self) -> f64 {
        match self {
            EmotionCategory::Joy => 1.0,
            EmotionCategory::Surprise => 0.5,
            EmotionCategory::Neutral | EmotionCategory::Calm => 0.0,
            EmotionCategory::Sadness
            | EmotionCategory::Anger
            | EmotionCategory::Fear
            | EmotionCategory::Disgust => -1.0,
        }
    }
}

/// Probability per category for one modality at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryDistribution(BTreeMap<EmotionCategory, f64>);

impl CategoryDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: EmotionCategory, probability: f64) {
        self.0.insert(category, probability);
    }

    pub fn get(&self, category: EmotionCategory) -> Option<f64> {
        self.0.get(&category).copied()
    }

    /// Largest probability in the distribution.
    pub fn max_probability(&self) -> Option<f64> {
        self.0.values().copied().reduce(f64::max)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmotionCategory, f64)> + '_ {
        self.0.iter().map(|(&c, &p)| (c, p))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(EmotionCategory, f64)> for CategoryDistribution {
    fn from_iter<I: IntoIterator<Item = (EmotionCategory, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A score vector as delivered by an upstream producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Seconds from session start
    pub timestamp: f64,
    /// Label to probability, labels not yet resolved
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    /// Valence already computed upstream (text sentiment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valence: Option<f64>,
}

impl RawSample {
    /// Build a sample from `(label, probability)` pairs.
    pub fn new<'a>(timestamp: f64, scores: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            timestamp,
            scores: scores
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            valence: None,
        }
    }

    /// Build a sample that carries only a pre-computed valence.
    pub fn with_valence(timestamp: f64, valence: f64) -> Self {
        Self {
            timestamp,
            scores: BTreeMap::new(),
            valence: Some(valence),
        }
    }
}

/// A validated sample of one modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalitySample {
    pub timestamp: f64,
    pub distribution: CategoryDistribution,
    /// Explicit valence, passed through unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valence: Option<f64>,
}

/// The ordered samples of one modality for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityStream {
    pub modality: Modality,
    pub samples: Vec<ModalitySample>,
}

impl ModalityStream {
    pub fn new(modality: Modality) -> Self {
        Self {
            modality,
            samples: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the last sample, if any.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.samples.last().map(|s| s.timestamp)
    }
}

/// A transcript segment in the same time base as the modality samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Text valence of this segment, when the producer scored it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valence: Option<f64>,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            valence: None,
        }
    }

    pub fn with_valence(mut self, valence: f64) -> Self {
        self.valence = Some(valence);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_aliases() {
        assert_eq!(EmotionCategory::parse("Happy"), Some(EmotionCategory::Joy));
        assert_eq!(EmotionCategory::parse(" fearful "), Some(EmotionCategory::Fear));
        assert_eq!(EmotionCategory::parse("surprised"), Some(EmotionCategory::Surprise));
        assert_eq!(EmotionCategory::parse("contempt"), None);
    }

    #[test]
    fn test_vocabularies() {
        assert!(Modality::Audio.accepts(EmotionCategory::Calm));
        assert!(!Modality::Face.accepts(EmotionCategory::Calm));
        assert!(Modality::Text.accepts(EmotionCategory::Joy));
    }

    #[test]
    fn test_distribution_max() {
        let dist: CategoryDistribution = [
            (EmotionCategory::Neutral, 0.2),
            (EmotionCategory::Joy, 0.7),
            (EmotionCategory::Fear, 0.1),
        ]
        .into_iter()
        .collect();
        assert_eq!(dist.max_probability(), Some(0.7));
        assert_eq!(dist.get(EmotionCategory::Anger), None);
        assert!(CategoryDistribution::new().max_probability().is_none());
    }

    #[test]
    fn test_distribution_serializes_in_stable_order() {
        let dist: CategoryDistribution = [
            (EmotionCategory::Surprise, 0.5),
            (EmotionCategory::Neutral, 0.5),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&dist).unwrap();
        assert_eq!(json, r#"{"neutral":0.5,"surprise":0.5}"#);
    }
}
