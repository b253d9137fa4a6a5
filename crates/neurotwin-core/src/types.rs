//! Core data types for NeuroTwin
//!
//! This module defines the data model shared by every analysis stage:
//!
//! - [`Recording`]: validated multi-channel, evenly sampled EEG
//! - [`EegBand`]: the five canonical frequency bands
//! - [`Region`]: anatomical regions used by the digital twin
//! - [`Condition`]: the fixed set of scored clinical conditions
//! - [`ConditionProbabilities`]: per-condition probabilities in \[0, 1\]
//! - [`FeatureMap`]: flat map of named scalar features

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::math::clamp01;

/// Flat mapping from feature name to value.
///
/// A missing key means "not computed", never zero.
pub type FeatureMap = BTreeMap<String, f64>;

// ============================================================================
// Recording
// ============================================================================

/// Multi-channel, evenly sampled EEG recording (channels × time).
///
/// Construction through [`Recording::new`] enforces the invariants: at least
/// one channel, at least one sample, equal row lengths, unique channel names,
/// a finite positive sample rate and finite samples.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recording {
    channel_names: Vec<String>,
    sample_rate: f64,
    data: Vec<Vec<f64>>,
}

impl Recording {
    /// Create a validated recording.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidRecording`] if any invariant is violated.
    pub fn new(
        channel_names: Vec<String>,
        sample_rate: f64,
        data: Vec<Vec<f64>>,
    ) -> AnalysisResult<Self> {
        if channel_names.is_empty() || data.is_empty() {
            return Err(AnalysisError::invalid_recording("recording has no channels"));
        }
        if channel_names.len() != data.len() {
            return Err(AnalysisError::invalid_recording(format!(
                "{} channel names but {} data rows",
                channel_names.len(),
                data.len()
            )));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(AnalysisError::invalid_recording(format!(
                "invalid sample rate {sample_rate}"
            )));
        }

        let n_samples = data[0].len();
        if n_samples == 0 {
            return Err(AnalysisError::invalid_recording("recording has no samples"));
        }

        let mut seen = HashSet::with_capacity(channel_names.len());
        for (name, row) in channel_names.iter().zip(&data) {
            if !seen.insert(name.as_str()) {
                return Err(AnalysisError::invalid_recording(format!(
                    "duplicate channel name '{name}'"
                )));
            }
            if row.len() != n_samples {
                return Err(AnalysisError::invalid_recording(format!(
                    "channel '{name}' has {} samples, expected {n_samples}",
                    row.len()
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(AnalysisError::invalid_recording(format!(
                    "channel '{name}' contains non-finite samples"
                )));
            }
        }

        Ok(Self { channel_names, sample_rate, data })
    }

    /// Channel names in recording order.
    #[must_use]
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    /// Sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of channels.
    #[must_use]
    pub fn n_channels(&self) -> usize {
        self.channel_names.len()
    }

    /// Number of samples per channel.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    /// Duration in seconds.
    #[must_use]
    pub fn duration_s(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate
    }

    /// Sample matrix, one row per channel.
    #[must_use]
    pub fn data(&self) -> &[Vec<f64>] {
        &self.data
    }

    /// Index of a channel by name.
    #[must_use]
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel_names.iter().position(|n| n == name)
    }

    /// Samples of a channel by name.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channel_index(name).map(|i| self.data[i].as_slice())
    }

    /// Iterate over `(name, samples)` pairs.
    pub fn channels(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.channel_names
            .iter()
            .map(String::as_str)
            .zip(self.data.iter().map(Vec::as_slice))
    }

    /// Replace the sample matrix, keeping channel names and sample rate.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidRecording`] if the new matrix changes
    /// the channel or sample count, or contains non-finite values.
    pub fn with_data(&self, data: Vec<Vec<f64>>) -> AnalysisResult<Self> {
        if data.len() != self.n_channels() || data.iter().any(|r| r.len() != self.n_samples()) {
            return Err(AnalysisError::invalid_recording(
                "processed data changed the recording shape",
            ));
        }
        Self::new(self.channel_names.clone(), self.sample_rate, data)
    }
}

// ============================================================================
// Frequency Bands
// ============================================================================

/// Canonical EEG frequency bands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EegBand {
    /// Delta: 1-4 Hz
    Delta,
    /// Theta: 4-8 Hz
    Theta,
    /// Alpha: 8-13 Hz
    Alpha,
    /// Beta: 13-30 Hz
    Beta,
    /// Gamma: 30-45 Hz
    Gamma,
}

impl EegBand {
    /// All bands, lowest frequency first.
    pub const ALL: [Self; 5] = [Self::Delta, Self::Theta, Self::Alpha, Self::Beta, Self::Gamma];

    /// Get the frequency range for this band (low, high) in Hz
    #[inline]
    #[must_use]
    pub const fn range_hz(self) -> (f64, f64) {
        match self {
            Self::Delta => (1.0, 4.0),
            Self::Theta => (4.0, 8.0),
            Self::Alpha => (8.0, 13.0),
            Self::Beta => (13.0, 30.0),
            Self::Gamma => (30.0, 45.0),
        }
    }

    /// Lowercase band name, as used in feature keys.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Delta => "delta",
            Self::Theta => "theta",
            Self::Alpha => "alpha",
            Self::Beta => "beta",
            Self::Gamma => "gamma",
        }
    }

    /// Parse a lowercase band name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

impl fmt::Display for EegBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Regions
// ============================================================================

/// Anatomical region of the digital twin.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// F-prefixed electrodes
    Frontal,
    /// T-prefixed electrodes
    Temporal,
    /// P-prefixed electrodes
    Parietal,
    /// O-prefixed electrodes
    Occipital,
}

impl Region {
    /// All regions.
    pub const ALL: [Self; 4] = [Self::Frontal, Self::Temporal, Self::Parietal, Self::Occipital];

    /// Region name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Frontal => "frontal",
            Self::Temporal => "temporal",
            Self::Parietal => "parietal",
            Self::Occipital => "occipital",
        }
    }

    /// Region of a 10-20 style channel name, by its leading letter.
    #[must_use]
    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel.chars().next()? {
            'F' => Some(Self::Frontal),
            'T' => Some(Self::Temporal),
            'P' => Some(Self::Parietal),
            'O' => Some(Self::Occipital),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Conditions
// ============================================================================

/// Clinical conditions scored by the pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Epileptiform activity risk
    Epilepsy,
    /// Cognitive stress
    CognitiveStress,
    /// Depression
    Depression,
}

impl Condition {
    /// All scored conditions.
    pub const ALL: [Self; 3] = [Self::Epilepsy, Self::CognitiveStress, Self::Depression];

    /// Snake-case condition name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Epilepsy => "epilepsy",
            Self::CognitiveStress => "cognitive_stress",
            Self::Depression => "depression",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Epilepsy => "Epilepsy",
            Self::CognitiveStress => "Cognitive stress",
            Self::Depression => "Depression",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Condition {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| AnalysisError::invalid_input("condition", format!("unknown condition '{s}'")))
    }
}

// ============================================================================
// Condition Probabilities
// ============================================================================

/// Per-condition probabilities, each in \[0, 1\].
///
/// Entries may be absent (e.g. a historical record that never scored a
/// condition); every stored value is clamped on insertion, including when
/// deserialized.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Condition, f64>", into = "BTreeMap<Condition, f64>")]
pub struct ConditionProbabilities(BTreeMap<Condition, f64>);

impl ConditionProbabilities {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Probability for a condition, if present.
    #[must_use]
    pub fn get(&self, condition: Condition) -> Option<f64> {
        self.0.get(&condition).copied()
    }

    /// Store a probability, clamped to \[0, 1\].
    pub fn set(&mut self, condition: Condition, value: f64) {
        self.0.insert(condition, clamp01(value));
    }

    /// Iterate over `(condition, probability)` pairs in condition order.
    pub fn iter(&self) -> impl Iterator<Item = (Condition, f64)> + '_ {
        self.0.iter().map(|(&c, &p)| (c, p))
    }

    /// Number of conditions present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no condition is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<Condition, f64>> for ConditionProbabilities {
    fn from(map: BTreeMap<Condition, f64>) -> Self {
        map.into_iter().collect()
    }
}

impl From<ConditionProbabilities> for BTreeMap<Condition, f64> {
    fn from(probs: ConditionProbabilities) -> Self {
        probs.0
    }
}

impl FromIterator<(Condition, f64)> for ConditionProbabilities {
    fn from_iter<I: IntoIterator<Item = (Condition, f64)>>(iter: I) -> Self {
        let mut probs = Self::new();
        for (c, p) in iter {
            probs.set(c, p);
        }
        probs
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_recording_rejects_empty() {
        assert!(matches!(
            Recording::new(vec![], 250.0, vec![]),
            Err(AnalysisError::InvalidRecording { .. })
        ));
        assert!(matches!(
            Recording::new(names(&["Cz"]), 250.0, vec![vec![]]),
            Err(AnalysisError::InvalidRecording { .. })
        ));
    }

    #[test]
    fn test_recording_rejects_ragged_and_duplicates() {
        let ragged = Recording::new(names(&["F3", "F4"]), 250.0, vec![vec![0.0; 4], vec![0.0; 3]]);
        assert!(ragged.is_err());

        let dup = Recording::new(names(&["F3", "F3"]), 250.0, vec![vec![0.0; 4], vec![0.0; 4]]);
        assert!(dup.is_err());

        let rate = Recording::new(names(&["F3"]), 0.0, vec![vec![0.0; 4]]);
        assert!(rate.is_err());
    }

    #[test]
    fn test_recording_accessors() {
        let rec = Recording::new(names(&["F3", "O2"]), 100.0, vec![vec![1.0; 200], vec![2.0; 200]])
            .unwrap();
        assert_eq!(rec.n_samples(), 200);
        assert!((rec.duration_s() - 2.0).abs() < 1e-12);
        assert_eq!(rec.channel("O2").map(|c| c[0]), Some(2.0));
        assert!(rec.channel("Cz").is_none());
        assert!(rec.with_data(vec![vec![0.0; 10], vec![0.0; 10]]).is_err());
    }

    #[test]
    fn test_region_from_channel() {
        assert_eq!(Region::from_channel("Fp1"), Some(Region::Frontal));
        assert_eq!(Region::from_channel("T7"), Some(Region::Temporal));
        assert_eq!(Region::from_channel("Pz"), Some(Region::Parietal));
        assert_eq!(Region::from_channel("O1"), Some(Region::Occipital));
        assert_eq!(Region::from_channel("Cz"), None);
        assert_eq!(Region::from_channel("frontal"), None);
    }

    #[test]
    fn test_band_names_round_trip() {
        for band in EegBand::ALL {
            assert_eq!(EegBand::from_name(band.name()), Some(band));
        }
        assert_eq!(EegBand::from_name("ratio"), None);
    }

    #[test]
    fn test_probabilities_clamp_and_serialize() {
        let probs: ConditionProbabilities =
            [(Condition::Epilepsy, -0.2), (Condition::CognitiveStress, 0.4)].into_iter().collect();
        assert_eq!(probs.get(Condition::Epilepsy), Some(0.0));
        assert_eq!(probs.get(Condition::Depression), None);

        let json = serde_json::to_string(&probs).unwrap();
        assert_eq!(json, r#"{"epilepsy":0.0,"cognitive_stress":0.4}"#);
    }

    #[test]
    fn test_probabilities_clamped_when_deserialized() {
        let probs: ConditionProbabilities =
            serde_json::from_str(r#"{"epilepsy":1.7,"depression":-0.3,"cognitive_stress":0.25}"#).unwrap();
        assert_eq!(probs.get(Condition::Epilepsy), Some(1.0));
        assert_eq!(probs.get(Condition::Depression), Some(0.0));
        assert_eq!(probs.get(Condition::CognitiveStress), Some(0.25));
    }

    #[test]
    fn test_recording_rejects_non_finite_samples() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = Recording::new(names(&["F3", "F4"]), 250.0, vec![vec![0.0; 4], vec![0.0, bad, 0.0, 0.0]]);
            assert!(matches!(result, Err(AnalysisError::InvalidRecording { .. })), "accepted {bad}");
        }
    }

    #[test]
    fn test_condition_from_str() {
        assert_eq!("cognitive_stress".parse::<Condition>().unwrap(), Condition::CognitiveStress);
        assert!("anxiety".parse::<Condition>().is_err());
    }
}
