//! Digital twin construction
//!
//! Reorganizes a flat feature map and condition probabilities into a
//! region → channel → band snapshot with asymmetry and biomarker summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use neurotwin_core::math::mean;
use neurotwin_core::types::{Condition, ConditionProbabilities, EegBand, FeatureMap, Region};

use crate::ml::features::keys;

/// Channel → band → power
pub type ChannelBands = BTreeMap<String, BTreeMap<EegBand, f64>>;

/// Biomarker names used by the twin and the intervention table.
pub mod biomarkers {
    /// Mean of per-channel line-length means
    pub const LINE_LENGTH_MEAN: &str = "line_length_mean";
    /// Mean of per-channel line-length variances
    pub const LINE_LENGTH_VARIANCE: &str = "line_length_variance";
    /// Mean delta power over scalp channels
    pub const MEAN_DELTA_POWER: &str = "mean_delta_power";
    /// Mean theta power over scalp channels
    pub const MEAN_THETA_POWER: &str = "mean_theta_power";
    /// Mean beta power over scalp channels
    pub const MEAN_BETA_POWER: &str = "mean_beta_power";
    /// Mean of per-channel theta/beta ratios
    pub const MEAN_THETA_BETA_RATIO: &str = "mean_theta_beta_ratio";
}

/// Region-structured snapshot of one recording.
///
/// Built once by [`build_twin`]; nothing outside this module can modify an
/// existing twin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DigitalTwin {
    #[serde(rename = "brain_regions")]
    regions: BTreeMap<Region, ChannelBands>,
    condition_probabilities: ConditionProbabilities,
    asymmetry_metrics: BTreeMap<String, f64>,
    biomarkers: BTreeMap<Condition, BTreeMap<String, f64>>,
}

impl DigitalTwin {
    /// Band powers per region and channel. All four regions are present.
    #[must_use]
    pub fn regions(&self) -> &BTreeMap<Region, ChannelBands> {
        &self.regions
    }

    /// Band powers for one region.
    #[must_use]
    pub fn region(&self, region: Region) -> Option<&ChannelBands> {
        self.regions.get(&region)
    }

    /// Condition probabilities.
    #[must_use]
    pub fn condition_probabilities(&self) -> &ConditionProbabilities {
        &self.condition_probabilities
    }

    /// Every `*_asymmetry` feature.
    #[must_use]
    pub fn asymmetry_metrics(&self) -> &BTreeMap<String, f64> {
        &self.asymmetry_metrics
    }

    /// Named biomarkers per condition.
    #[must_use]
    pub fn biomarkers(&self) -> &BTreeMap<Condition, BTreeMap<String, f64>> {
        &self.biomarkers
    }

    /// One biomarker value.
    #[must_use]
    pub fn biomarker(&self, condition: Condition, name: &str) -> Option<f64> {
        self.biomarkers.get(&condition)?.get(name).copied()
    }

    pub(crate) fn set_probability(&mut self, condition: Condition, value: f64) {
        self.condition_probabilities.set(condition, value);
    }

    /// Scale a biomarker and any asymmetry metric of the same name.
    /// Returns the biomarker's `(before, after)` values.
    pub(crate) fn scale_biomarker(&mut self, condition: Condition, name: &str, multiplier: f64) -> Option<(f64, f64)> {
        let value = self.biomarkers.get_mut(&condition)?.get_mut(name)?;
        let before = *value;
        *value *= multiplier;
        let after = *value;

        if let Some(metric) = self.asymmetry_metrics.get_mut(name) {
            *metric *= multiplier;
        }
        Some((before, after))
    }
}

/// Split a `{channel}_{band}` key. Only channels on one of the four scalp
/// regions are accepted.
fn parse_band_key(key: &str) -> Option<(Region, &str, EegBand)> {
    let (channel, band) = key.rsplit_once('_')?;
    let band = EegBand::from_name(band)?;
    let region = Region::from_channel(channel)?;
    Some((region, channel, band))
}

/// Assemble a digital twin. Pure and deterministic.
#[must_use]
pub fn build_twin(features: &FeatureMap, probabilities: &ConditionProbabilities) -> DigitalTwin {
    let mut regions: BTreeMap<Region, ChannelBands> =
        Region::ALL.into_iter().map(|r| (r, ChannelBands::new())).collect();

    for (key, &value) in features {
        if let Some((region, channel, band)) = parse_band_key(key) {
            regions
                .entry(region)
                .or_default()
                .entry(channel.to_string())
                .or_default()
                .insert(band, value);
        }
    }

    let asymmetry_metrics = features
        .iter()
        .filter(|(k, _)| k.ends_with("_asymmetry"))
        .map(|(k, v)| (k.clone(), *v))
        .collect();

    let biomarkers = Condition::ALL
        .into_iter()
        .map(|c| (c, condition_biomarkers(c, features, &regions)))
        .collect();

    DigitalTwin {
        regions,
        condition_probabilities: probabilities.clone(),
        asymmetry_metrics,
        biomarkers,
    }
}

fn condition_biomarkers(
    condition: Condition,
    features: &FeatureMap,
    regions: &BTreeMap<Region, ChannelBands>,
) -> BTreeMap<String, f64> {
    let scalp_channels: Vec<&str> = regions.values().flat_map(|chs| chs.keys().map(String::as_str)).collect();

    let band_mean = |band: EegBand| {
        let values: Vec<f64> = regions
            .values()
            .flat_map(ChannelBands::values)
            .filter_map(|bands| bands.get(&band).copied())
            .collect();
        mean(&values)
    };
    let channel_mean = |suffix: &str| {
        let values: Vec<f64> = scalp_channels
            .iter()
            .filter_map(|ch| features.get(&format!("{ch}_{suffix}")).copied())
            .collect();
        mean(&values)
    };
    let copied = |key: &str| features.get(key).copied();

    let entries: Vec<(&str, Option<f64>)> = match condition {
        Condition::Epilepsy => vec![
            (biomarkers::LINE_LENGTH_MEAN, channel_mean(keys::LINE_LENGTH_MEAN_SUFFIX)),
            (biomarkers::LINE_LENGTH_VARIANCE, channel_mean(keys::LINE_LENGTH_VARIANCE_SUFFIX)),
            (biomarkers::MEAN_DELTA_POWER, band_mean(EegBand::Delta)),
            (biomarkers::MEAN_THETA_POWER, band_mean(EegBand::Theta)),
        ],
        Condition::CognitiveStress => vec![
            (keys::FRONTAL_ALPHA_ASYMMETRY, copied(keys::FRONTAL_ALPHA_ASYMMETRY)),
            (
                keys::FRONTAL_MIDLINE_THETA_BETA_RATIO,
                copied(keys::FRONTAL_MIDLINE_THETA_BETA_RATIO),
            ),
            (biomarkers::MEAN_BETA_POWER, band_mean(EegBand::Beta)),
            (biomarkers::MEAN_THETA_BETA_RATIO, channel_mean(keys::THETA_BETA_RATIO_SUFFIX)),
        ],
        Condition::Depression => vec![
            (keys::FRONTAL_ALPHA_LOG_ASYMMETRY, copied(keys::FRONTAL_ALPHA_LOG_ASYMMETRY)),
            (keys::PARIETAL_ALPHA_LOG_ASYMMETRY, copied(keys::PARIETAL_ALPHA_LOG_ASYMMETRY)),
            (keys::FRONTAL_THETA_MEAN, copied(keys::FRONTAL_THETA_MEAN)),
            (keys::PARIETAL_THETA_MEAN, copied(keys::PARIETAL_THETA_MEAN)),
        ],
    };

    entries
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
        .collect()
}
