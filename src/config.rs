//! Configuration for session analysis.
//!
//! Every threshold the engine applies lives here. The defaults are
//! empirically chosen starting points, exposed so they can be tuned.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the analysis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Spacing of the shared timeline grid (seconds)
    pub grid_resolution_secs: f64,
    pub fusion: FusionWeights,
    pub spike: SpikeConfig,
    pub incongruence: IncongruenceConfig,
    pub pattern: PatternConfig,
    pub input: InputConfig,
    pub summary: SummaryConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            grid_resolution_secs: 1.0,
            fusion: FusionWeights::default(),
            spike: SpikeConfig::default(),
            incongruence: IncongruenceConfig::default(),
            pattern: PatternConfig::default(),
            input: InputConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

/// Weights used when fusing face and vocal intensity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub face_weight: f64,
    pub vocal_weight: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            face_weight: 0.5,
            vocal_weight: 0.5,
        }
    }
}

/// Spike rule: `intensity > max(mean + std_multiplier * std, absolute_floor)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeConfig {
    pub std_multiplier: f64,
    pub absolute_floor: f64,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            std_multiplier: 1.0,
            absolute_floor: 0.5,
        }
    }
}

/// Windowing and thresholds for incongruence rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncongruenceConfig {
    /// Sliding window width when no transcript is available
    pub window_secs: f64,
    /// Sliding window step
    pub step_secs: f64,
    /// Minimum absolute valence difference between disagreeing signals
    pub valence_gap: f64,
    /// At least one face/voice valence must exceed this magnitude
    pub confidence_floor: f64,
    /// Audio valence at or above `-calm_voice_band` counts as calm
    pub calm_voice_band: f64,
    /// Text valence magnitude considered strongly polarized
    pub strong_text_valence: f64,
    /// Fused intensity at or below this is "near zero"
    pub flat_intensity: f64,
}

impl Default for IncongruenceConfig {
    fn default() -> Self {
        Self {
            window_secs: 2.0,
            step_secs: 1.0,
            valence_gap: 0.3,
            confidence_floor: 0.2,
            calm_voice_band: 0.1,
            strong_text_valence: 0.3,
            flat_intensity: 0.1,
        }
    }
}

/// Cross-session signature comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Number of phase points in a signature (K)
    pub signature_len: usize,
    /// Pearson similarity at or above which a prior session is reported
    pub similarity_threshold: f64,
    /// How many top matches the observation text names
    pub observation_limit: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            signature_len: 20,
            similarity_threshold: 0.75,
            observation_limit: 3,
        }
    }
}

/// What to do with categories outside a modality's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Drop the category and log a warning
    Drop,
    /// Fail the analysis
    Reject,
}

/// Input validation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Allowed deviation of a distribution's sum from 1, inclusive
    pub distribution_tolerance: f64,
    pub unknown_category: UnknownCategoryPolicy,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            distribution_tolerance: 0.1,
            unknown_category: UnknownCategoryPolicy::Drop,
        }
    }
}

/// Thresholds for the session intensity summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Intensity below which a point counts as low
    pub low_intensity: f64,
    /// Consecutive low points needed to report a low period
    pub min_low_points: usize,
    /// Points scoring at or below this congruence are reported as events
    pub congruence_threshold: f64,
    /// Cap on reported congruence events, worst first
    pub max_congruence_events: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            low_intensity: 0.15,
            min_low_points: 5,
            congruence_threshold: 0.4,
            max_congruence_events: 32,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: AnalysisConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("session-affect")
            .join("config.json")
    }

    /// Check that every value lies in its domain.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |msg: String| Err(AnalysisError::InvalidConfig(msg));

        if !(self.grid_resolution_secs.is_finite() && self.grid_resolution_secs > 0.0) {
            return invalid(format!(
                "grid_resolution_secs must be positive, got {}",
                self.grid_resolution_secs
            ));
        }

        let FusionWeights {
            face_weight,
            vocal_weight,
        } = self.fusion;
        if face_weight < 0.0 || vocal_weight < 0.0 || face_weight + vocal_weight <= 0.0 {
            return invalid(format!(
                "fusion weights must be non-negative with a positive sum, got {face_weight}/{vocal_weight}"
            ));
        }

        if self.spike.std_multiplier < 0.0 || !(0.0..=1.0).contains(&self.spike.absolute_floor) {
            return invalid("spike thresholds out of range".to_string());
        }

        let inc = &self.incongruence;
        if !(inc.window_secs > 0.0 && inc.step_secs > 0.0) {
            return invalid(format!(
                "window ({}) and step ({}) must be positive",
                inc.window_secs, inc.step_secs
            ));
        }
        if inc.valence_gap < 0.0
            || inc.confidence_floor < 0.0
            || inc.calm_voice_band < 0.0
            || inc.strong_text_valence < 0.0
            || inc.flat_intensity < 0.0
        {
            return invalid("incongruence thresholds must be non-negative".to_string());
        }

        if self.pattern.signature_len < 2 {
            return invalid(format!(
                "signature_len must be at least 2, got {}",
                self.pattern.signature_len
            ));
        }
        if !(-1.0..=1.0).contains(&self.pattern.similarity_threshold) {
            return invalid(format!(
                "similarity_threshold must be in [-1, 1], got {}",
                self.pattern.similarity_threshold
            ));
        }

        if !(self.input.distribution_tolerance >= 0.0) {
            return invalid("distribution_tolerance must be non-negative".to_string());
        }

        if !(0.0..=1.0).contains(&self.summary.congruence_threshold) {
            return invalid(format!(
                "congruence_threshold must be in [0, 1], got {}",
                self.summary.congruence_threshold
            ));
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
