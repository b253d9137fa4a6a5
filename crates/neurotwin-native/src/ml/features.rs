//! Feature extraction for condition scoring
//!
//! Turns a cleaned recording into a flat [`FeatureMap`]:
//!
//! - per channel: five band powers (`{ch}_{band}`) and `{ch}_theta_beta_ratio`
//! - per channel: line-length mean and variance over 2 s windows
//! - stress group: frontal alpha asymmetry, frontal midline theta/beta ratio
//! - depression group: log alpha asymmetry at F3/F4 and P3/P4, mean frontal
//!   and parietal theta
//!
//! A feature whose inputs are missing (channel absent, zero denominator,
//! non-positive log argument) is omitted, never set to a placeholder.

use tracing::debug;

use neurotwin_core::math::{line_length, mean, variance};
use neurotwin_core::types::{EegBand, FeatureMap, Recording, Region};

use crate::processing::fft::{BandPowers, WelchEstimator};

/// Window length for line-length statistics, in seconds.
pub const LINE_LENGTH_WINDOW_S: f64 = 2.0;

/// Names of composite features.
pub mod keys {
    /// `(right − left) / (right + left)` frontal alpha
    pub const FRONTAL_ALPHA_ASYMMETRY: &str = "frontal_alpha_asymmetry";
    /// Theta/beta ratio at Fz
    pub const FRONTAL_MIDLINE_THETA_BETA_RATIO: &str = "frontal_midline_theta_beta_ratio";
    /// `ln(F4 alpha) − ln(F3 alpha)`
    pub const FRONTAL_ALPHA_LOG_ASYMMETRY: &str = "frontal_alpha_log_asymmetry";
    /// `ln(P4 alpha) − ln(P3 alpha)`
    pub const PARIETAL_ALPHA_LOG_ASYMMETRY: &str = "parietal_alpha_log_asymmetry";
    /// Mean theta power over frontal channels
    pub const FRONTAL_THETA_MEAN: &str = "frontal_theta_mean";
    /// Mean theta power over parietal channels
    pub const PARIETAL_THETA_MEAN: &str = "parietal_theta_mean";

    /// Suffix of per-channel theta/beta ratios
    pub const THETA_BETA_RATIO_SUFFIX: &str = "theta_beta_ratio";
    /// Suffix of per-channel line-length means
    pub const LINE_LENGTH_MEAN_SUFFIX: &str = "line_length_mean";
    /// Suffix of per-channel line-length variances
    pub const LINE_LENGTH_VARIANCE_SUFFIX: &str = "line_length_variance";
}

/// Feature key for a channel band power.
#[must_use]
pub fn band_key(channel: &str, band: EegBand) -> String {
    format!("{channel}_{}", band.name())
}

/// Laterality of an electrode by its trailing number (odd = left, even = right).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// Odd-numbered electrode
    Left,
    /// Even-numbered electrode
    Right,
    /// No trailing number (e.g. `Fz`)
    Midline,
}

impl Side {
    /// Laterality of a 10-20 style channel name.
    #[must_use]
    pub fn of_channel(channel: &str) -> Self {
        let digits: String = channel
            .chars()
            .rev()
            .take_while(char::is_ascii_digit)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        match digits.parse::<u32>() {
            Ok(n) if n % 2 == 1 => Self::Left,
            Ok(_) => Self::Right,
            Err(_) => Self::Midline,
        }
    }
}

/// Mean and variance of per-window line length, `None` if the signal is
/// shorter than one window.
#[must_use]
pub fn line_length_stats(samples: &[f64], window_len: usize) -> Option<(f64, f64)> {
    if window_len < 2 {
        return None;
    }
    let per_window: Vec<f64> = samples.chunks_exact(window_len).map(line_length).collect();
    Some((mean(&per_window)?, variance(&per_window)?))
}

/// Extracts the flat feature map from a cleaned recording.
#[derive(Clone, Debug, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a feature extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extract all feature groups.
    #[must_use]
    pub fn extract(&self, recording: &Recording) -> FeatureMap {
        let fs = recording.sample_rate();
        let mut welch = WelchEstimator::new(fs);
        let window_len = (LINE_LENGTH_WINDOW_S * fs).round() as usize;

        let mut features = FeatureMap::new();
        let mut powers: Vec<(&str, BandPowers)> = Vec::with_capacity(recording.n_channels());

        for (name, samples) in recording.channels() {
            let bp = welch.compute_psd(samples).band_powers();
            for band in EegBand::ALL {
                match bp.get(band) {
                    Some(power) => {
                        features.insert(band_key(name, band), power);
                    }
                    None => debug!("No spectral bins in {} for {name}; band omitted", band.name()),
                }
            }
            if let Some(ratio) = bp.theta_beta_ratio() {
                features.insert(format!("{name}_{}", keys::THETA_BETA_RATIO_SUFFIX), ratio);
            }

            if let Some((ll_mean, ll_var)) = line_length_stats(samples, window_len) {
                features.insert(format!("{name}_{}", keys::LINE_LENGTH_MEAN_SUFFIX), ll_mean);
                features.insert(format!("{name}_{}", keys::LINE_LENGTH_VARIANCE_SUFFIX), ll_var);
            }

            powers.push((name, bp));
        }

        stress_features(&powers, &mut features);
        depression_features(&powers, &mut features);

        debug!(
            channels = recording.n_channels(),
            features = features.len(),
            "Feature extraction complete"
        );
        features
    }
}

/// Frontal alpha asymmetry and frontal midline theta/beta ratio.
fn stress_features(powers: &[(&str, BandPowers)], features: &mut FeatureMap) {
    let frontal_alpha = |side: Side| -> Vec<f64> {
        powers
            .iter()
            .filter(|(name, _)| Region::from_channel(name) == Some(Region::Frontal))
            .filter(|(name, _)| Side::of_channel(name) == side)
            .filter_map(|(_, bp)| bp.alpha)
            .collect()
    };

    if let (Some(left), Some(right)) = (mean(&frontal_alpha(Side::Left)), mean(&frontal_alpha(Side::Right))) {
        let sum = right + left;
        if sum != 0.0 {
            features.insert(keys::FRONTAL_ALPHA_ASYMMETRY.to_string(), (right - left) / sum);
        }
    }

    if let Some(ratio) = lookup(powers, "Fz").and_then(|bp| bp.theta_beta_ratio()) {
        features.insert(keys::FRONTAL_MIDLINE_THETA_BETA_RATIO.to_string(), ratio);
    }
}

/// Log alpha asymmetry at fixed pairs and regional theta means.
fn depression_features(powers: &[(&str, BandPowers)], features: &mut FeatureMap) {
    let pairs = [
        ("F3", "F4", keys::FRONTAL_ALPHA_LOG_ASYMMETRY),
        ("P3", "P4", keys::PARIETAL_ALPHA_LOG_ASYMMETRY),
    ];
    for (left, right, key) in pairs {
        let alpha = |channel: &str| lookup(powers, channel).and_then(|bp| bp.alpha);
        if let (Some(l), Some(r)) = (alpha(left), alpha(right)) {
            if l > 0.0 && r > 0.0 {
                features.insert(key.to_string(), r.ln() - l.ln());
            }
        }
    }

    let regional = [
        (Region::Frontal, keys::FRONTAL_THETA_MEAN),
        (Region::Parietal, keys::PARIETAL_THETA_MEAN),
    ];
    for (region, key) in regional {
        let thetas: Vec<f64> = powers
            .iter()
            .filter(|(name, _)| Region::from_channel(name) == Some(region))
            .filter_map(|(_, bp)| bp.theta)
            .collect();
        if let Some(m) = mean(&thetas) {
            features.insert(key.to_string(), m);
        }
    }
}

fn lookup(powers: &[(&str, BandPowers)], channel: &str) -> Option<BandPowers> {
    powers.iter().find(|(name, _)| *name == channel).map(|(_, bp)| *bp)
}
