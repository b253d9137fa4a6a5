//! Configuration types for the analysis pipeline.
//!
//! Every field has a default so a partial JSON document (or none at all) is a
//! valid configuration. Spectral window sizes and band edges are fixed
//! constants of the feature extractor and are not configurable here.

use serde::{Deserialize, Serialize};

use crate::processing::ica::FastIca;
use crate::twin::intervention::InterventionTable;

// ============================================================================
// Preprocessing
// ============================================================================

/// Independent component analysis settings for EOG artifact removal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcaConfig {
    /// Maximum number of components
    pub n_components: usize,
    /// Seed for the initial unmixing matrix
    pub seed: u64,
    /// Iteration cap
    pub max_iter: usize,
    /// Convergence tolerance
    pub tolerance: f64,
    /// Minimum |Pearson r| between a component and an EOG channel for the
    /// component to be removed
    pub eog_correlation_threshold: f64,
}

impl Default for IcaConfig {
    fn default() -> Self {
        Self {
            n_components: 15,
            seed: 42,
            max_iter: 200,
            tolerance: 1e-4,
            eog_correlation_threshold: 0.7,
        }
    }
}

impl IcaConfig {
    /// Build the estimator for these settings.
    #[must_use]
    pub fn estimator(&self) -> FastIca {
        FastIca {
            n_components: self.n_components,
            seed: self.seed,
            max_iter: self.max_iter,
            tolerance: self.tolerance,
        }
    }
}

/// Signal preprocessing settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Band-pass lower edge in Hz
    pub bandpass_low_hz: f64,
    /// Band-pass upper edge in Hz
    pub bandpass_high_hz: f64,
    /// Mains frequencies to notch out
    pub notch_freqs_hz: Vec<f64>,
    /// Notch quality factor
    pub notch_q: f64,
    /// Substring identifying eye-movement (EOG) channels
    pub eog_marker: String,
    /// ICA settings
    pub ica: IcaConfig,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            bandpass_low_hz: 1.0,
            bandpass_high_hz: 45.0,
            notch_freqs_hz: vec![50.0, 60.0],
            notch_q: 30.0,
            eog_marker: "EOG".to_string(),
            ica: IcaConfig::default(),
        }
    }
}

impl PreprocessConfig {
    /// Whether a channel name follows the eye-movement sensor convention.
    #[must_use]
    pub fn is_eog_channel(&self, name: &str) -> bool {
        !self.eog_marker.is_empty() && name.to_ascii_uppercase().contains(&self.eog_marker.to_ascii_uppercase())
    }
}

// ============================================================================
// Top-level
// ============================================================================

/// Complete analysis configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Preprocessing settings
    pub preprocess: PreprocessConfig,
    /// Intervention effect table
    pub interventions: InterventionTable,
}

impl AnalysisConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the document is not valid JSON or has
    /// fields of the wrong type.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
