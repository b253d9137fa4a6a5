//! Recording preprocessing
//!
//! Band-pass filtering, mains notch filtering and ICA-based eye-movement
//! artifact suppression. The input recording is never modified; a cleaned
//! copy with the same channels and sample count is returned.

use tracing::{debug, info};

use neurotwin_core::error::{AnalysisError, AnalysisResult};
use neurotwin_core::math::pearson_correlation;
use neurotwin_core::types::Recording;

use crate::config::PreprocessConfig;
use crate::processing::filters::{BandpassFilter, NotchBank};

/// A preprocessed recording plus a summary of what was done to it.
#[derive(Clone, Debug, PartialEq)]
pub struct CleanedRecording {
    /// Cleaned signal (same channels and sample count as the input)
    pub recording: Recording,
    /// Names of channels treated as EOG references
    pub eog_channels: Vec<String>,
    /// Indices of ICA components removed as eye-movement artifacts
    pub removed_components: Vec<usize>,
}

/// Recording preprocessor
#[derive(Clone, Debug, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Create a preprocessor with the given settings.
    #[must_use]
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    #[must_use]
    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Clean a recording.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidRecording`] if the recording has no
    /// channels or no samples.
    pub fn preprocess(&self, recording: &Recording) -> AnalysisResult<CleanedRecording> {
        if recording.n_channels() == 0 || recording.n_samples() == 0 {
            return Err(AnalysisError::invalid_recording("recording is empty"));
        }

        let fs = recording.sample_rate();
        let pad_len = fs.round() as usize;
        let bandpass = BandpassFilter::new(fs, self.config.bandpass_low_hz, self.config.bandpass_high_hz);
        let notches = NotchBank::new(fs, &self.config.notch_freqs_hz, self.config.notch_q);

        if !bandpass.has_lowpass() {
            debug!(
                "Upper band edge {} Hz is above Nyquist for {} Hz; lowpass skipped",
                self.config.bandpass_high_hz, fs
            );
        }

        let filtered: Vec<Vec<f64>> = recording
            .data()
            .iter()
            .map(|row| notches.filtfilt(&bandpass.filtfilt(row, pad_len), pad_len))
            .collect();

        let eog_channels: Vec<String> = recording
            .channel_names()
            .iter()
            .filter(|name| self.config.is_eog_channel(name))
            .cloned()
            .collect();

        let (cleaned, removed_components) = if eog_channels.is_empty() {
            info!("No EOG channels found. Skipping EOG artifact removal.");
            (filtered, Vec::new())
        } else {
            self.remove_eye_artifacts(recording, filtered)?
        };

        Ok(CleanedRecording {
            recording: recording.with_data(cleaned)?,
            eog_channels,
            removed_components,
        })
    }

    /// Fit ICA on the non-EOG channels and drop components that track any
    /// EOG channel.
    fn remove_eye_artifacts(
        &self,
        recording: &Recording,
        mut filtered: Vec<Vec<f64>>,
    ) -> AnalysisResult<(Vec<Vec<f64>>, Vec<usize>)> {
        let (eog_idx, data_idx): (Vec<usize>, Vec<usize>) = (0..recording.n_channels())
            .partition(|&i| self.config.is_eog_channel(&recording.channel_names()[i]));

        if data_idx.is_empty() {
            info!("Recording has only EOG channels. Skipping EOG artifact removal.");
            return Ok((filtered, Vec::new()));
        }

        let data: Vec<Vec<f64>> = data_idx.iter().map(|&i| filtered[i].clone()).collect();
        let decomposition = match self.config.ica.estimator().fit(&data) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("ICA fit failed ({e}); skipping EOG artifact removal");
                return Ok((filtered, Vec::new()));
            }
        };

        let threshold = self.config.ica.eog_correlation_threshold;
        let bad: Vec<usize> = (0..decomposition.n_components())
            .filter(|&comp| {
                let source = decomposition.source(comp);
                eog_idx
                    .iter()
                    .any(|&e| pearson_correlation(&source, &filtered[e]).abs() >= threshold)
            })
            .collect();

        info!(
            "ICA fitted {} components on {} channels; removing {} EOG component(s) {:?}",
            decomposition.n_components(),
            data_idx.len(),
            bad.len(),
            bad
        );

        if !bad.is_empty() {
            let cleaned = decomposition.remove_components(&data, &bad);
            for (row, &ch) in cleaned.into_iter().zip(&data_idx) {
                filtered[ch] = row;
            }
        }

        Ok((filtered, bad))
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    const FS: f64 = 250.0;
    const N: usize = 5000;

    fn sine(freq: f64, amp: f64) -> Vec<f64> {
        (0..N).map(|i| amp * (2.0 * PI * freq * i as f64 / FS).sin()).collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_removes_line_noise_and_keeps_shape() {
        let alpha = sine(10.0, 20.0);
        let mains = sine(50.0, 20.0);
        let noisy: Vec<f64> = alpha.iter().zip(&mains).map(|(a, m)| a + m).collect();
        let rec = Recording::new(names(&["O1", "O2"]), FS, vec![noisy.clone(), noisy]).unwrap();

        let cleaned = Preprocessor::default().preprocess(&rec).unwrap();
        assert_eq!(cleaned.recording.n_channels(), 2);
        assert_eq!(cleaned.recording.n_samples(), N);
        assert!(cleaned.eog_channels.is_empty());
        assert!(cleaned.removed_components.is_empty());

        let out = &cleaned.recording.data()[0];
        let residual: Vec<f64> = out.iter().zip(&alpha).map(|(o, a)| o - a).collect();
        assert!(rms(&residual[1000..4000]) < 0.1 * rms(&mains[1000..4000]));
    }

    #[test]
    fn test_removes_60_hz_mains() {
        let alpha = sine(10.0, 20.0);
        let mains = sine(60.0, 20.0);
        let noisy: Vec<f64> = alpha.iter().zip(&mains).map(|(a, m)| a + m).collect();
        let rec = Recording::new(names(&["O1"]), FS, vec![noisy]).unwrap();

        let residual_rms = |preprocessor: Preprocessor| {
            let cleaned = preprocessor.preprocess(&rec).unwrap();
            let residual: Vec<f64> = cleaned.recording.data()[0].iter().zip(&alpha).map(|(o, a)| o - a).collect();
            rms(&residual[1000..4000])
        };

        let with_notch = residual_rms(Preprocessor::default());
        let low_pass_only = residual_rms(Preprocessor::new(PreprocessConfig {
            notch_freqs_hz: vec![50.0],
            ..PreprocessConfig::default()
        }));

        assert!(with_notch < 0.05 * rms(&mains[1000..4000]), "residual {with_notch}");
        assert!(with_notch < 0.25 * low_pass_only);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let rec = Recording::new(names(&["Cz"]), FS, vec![sine(10.0, 1.0)]).unwrap();
        let copy = rec.clone();
        let _ = Preprocessor::default().preprocess(&rec).unwrap();
        assert_eq!(rec, copy);
    }

    #[test]
    fn test_eog_component_is_removed() {
        // Slow blink-like bursts leak into the frontal channels.
        let blinks: Vec<f64> = (0..N)
            .map(|i| {
                let phase = (i % 500) as f64 / 500.0;
                if phase < 0.1 { 100.0 * (PI * phase / 0.1).sin() } else { 0.0 }
            })
            .collect();
        let alpha = sine(10.0, 10.0);
        let beta = sine(21.0, 5.0);

        let fp1: Vec<f64> = (0..N).map(|i| alpha[i] + 0.9 * blinks[i]).collect();
        let fp2: Vec<f64> = (0..N).map(|i| beta[i] + 0.7 * blinks[i]).collect();
        let o1: Vec<f64> = (0..N).map(|i| alpha[i] + beta[i] + 0.05 * blinks[i]).collect();

        let rec = Recording::new(
            names(&["Fp1", "Fp2", "O1", "EOG"]),
            FS,
            vec![fp1, fp2, o1, blinks.clone()],
        )
        .unwrap();

        let cleaned = Preprocessor::default().preprocess(&rec).unwrap();
        assert_eq!(cleaned.eog_channels, vec!["EOG".to_string()]);
        assert_eq!(cleaned.removed_components.len(), 1);

        let eog_filtered = cleaned.recording.channel("EOG").unwrap().to_vec();
        let fp1_clean = cleaned.recording.channel("Fp1").unwrap();
        assert!(pearson_correlation(fp1_clean, &eog_filtered).abs() < 0.3);
    }

    #[test]
    fn test_preprocessing_is_deterministic() {
        let rec = Recording::new(
            names(&["F3", "F4", "HEOG"]),
            FS,
            vec![sine(10.0, 5.0), sine(6.0, 3.0), sine(1.5, 50.0)],
        )
        .unwrap();
        let pre = Preprocessor::default();
        assert_eq!(pre.preprocess(&rec).unwrap(), pre.preprocess(&rec).unwrap());
    }
}
