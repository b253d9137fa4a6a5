//! FFT-based spectral analysis
//!
//! Welch power-spectral-density estimation and band power integration.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use neurotwin_core::types::EegBand;

/// Minimum Welch segment duration in seconds. The segment length is this
/// many seconds of samples rounded up to a power of two, so bin spacing stays
/// at or below 0.5 Hz at any sample rate.
pub const WELCH_SEGMENT_S: f64 = 2.0;

/// Fractional overlap between consecutive Welch segments.
pub const WELCH_OVERLAP: f64 = 0.5;

/// One-sided power spectral density (units²/Hz).
#[derive(Clone, Debug, PartialEq)]
pub struct Psd {
    /// Frequency resolution (Hz per bin)
    pub freq_res: f64,
    /// Density per bin, DC first
    pub values: Vec<f64>,
}

impl Psd {
    /// Frequency of a bin in Hz
    #[must_use]
    pub fn frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.freq_res
    }

    /// Integrated power over bins with `low_hz <= f < high_hz`
    /// (`f <= high_hz` when `include_high`).
    #[must_use]
    pub fn integrate(&self, low_hz: f64, high_hz: f64, include_high: bool) -> f64 {
        self.values
            .iter()
            .enumerate()
            .filter(|&(bin, _)| {
                let f = self.frequency(bin);
                f >= low_hz && if include_high { f <= high_hz } else { f < high_hz }
            })
            .map(|(_, &p)| p)
            .sum::<f64>()
            * self.freq_res
    }

    /// Whether any bin falls inside `low_hz..high_hz` (`..=` when `include_high`).
    #[must_use]
    pub fn covers(&self, low_hz: f64, high_hz: f64, include_high: bool) -> bool {
        (0..self.values.len()).map(|bin| self.frequency(bin)).any(|f| {
            f >= low_hz && if include_high { f <= high_hz } else { f < high_hz }
        })
    }

    /// Power in a standard EEG band. Gamma includes its upper edge.
    ///
    /// `None` when the resolution leaves no bin inside the band.
    #[must_use]
    pub fn band_power(&self, band: EegBand) -> Option<f64> {
        let (low, high) = band.range_hz();
        let include_high = band == EegBand::Gamma;
        self.covers(low, high, include_high)
            .then(|| self.integrate(low, high, include_high))
    }

    /// All five band powers
    #[must_use]
    pub fn band_powers(&self) -> BandPowers {
        BandPowers {
            delta: self.band_power(EegBand::Delta),
            theta: self.band_power(EegBand::Theta),
            alpha: self.band_power(EegBand::Alpha),
            beta: self.band_power(EegBand::Beta),
            gamma: self.band_power(EegBand::Gamma),
        }
    }
}

/// Welch PSD estimator with a fixed Hann window and 50% overlap.
pub struct WelchEstimator {
    sample_rate: f64,
    segment_len: usize,
    planner: FftPlanner<f64>,
}

impl WelchEstimator {
    /// Create an estimator whose segment spans [`WELCH_SEGMENT_S`].
    #[must_use]
    pub fn new(sample_rate: f64) -> Self {
        Self::with_segment_len(sample_rate, segment_len_for(sample_rate))
    }

    /// Create an estimator with a custom segment length.
    #[must_use]
    pub fn with_segment_len(sample_rate: f64, segment_len: usize) -> Self {
        Self {
            sample_rate,
            segment_len: segment_len.max(1),
            planner: FftPlanner::new(),
        }
    }

    /// Sample rate in Hz
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Samples per full segment
    #[must_use]
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Estimate the one-sided PSD of `samples`.
    ///
    /// Signals shorter than one segment are analysed as a single segment of
    /// their own length. Each segment has its mean removed before windowing.
    pub fn compute_psd(&mut self, samples: &[f64]) -> Psd {
        let n = samples.len();
        let seg_len = self.segment_len.min(n).max(1);
        let step = ((seg_len as f64 * (1.0 - WELCH_OVERLAP)).round() as usize).max(1);

        let window = hann_window(seg_len);
        let window_power: f64 = window.iter().map(|w| w * w).sum();
        let fft: Arc<dyn Fft<f64>> = self.planner.plan_fft_forward(seg_len);

        let n_freqs = seg_len / 2 + 1;
        let mut accum = vec![0.0; n_freqs];
        let mut buffer = vec![Complex::new(0.0, 0.0); seg_len];
        let mut segments = 0usize;

        let mut start = 0;
        while start + seg_len <= n {
            let segment = &samples[start..start + seg_len];
            let seg_mean = segment.iter().sum::<f64>() / seg_len as f64;

            for ((slot, &s), &w) in buffer.iter_mut().zip(segment).zip(&window) {
                *slot = Complex::new((s - seg_mean) * w, 0.0);
            }
            fft.process(&mut buffer);

            for (acc, c) in accum.iter_mut().zip(&buffer) {
                *acc += c.norm_sqr();
            }
            segments += 1;
            start += step;
        }

        let scale = 1.0 / (segments.max(1) as f64 * self.sample_rate * window_power.max(f64::EPSILON));
        let nyquist_bin = (seg_len % 2 == 0).then_some(seg_len / 2);
        let values = accum
            .into_iter()
            .enumerate()
            .map(|(bin, p)| {
                let one_sided = if bin == 0 || Some(bin) == nyquist_bin { 1.0 } else { 2.0 };
                p * scale * one_sided
            })
            .collect();

        Psd {
            freq_res: self.sample_rate / seg_len as f64,
            values,
        }
    }
}

/// EEG band powers container
///
/// A band is `None` when the spectrum has no bin inside it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandPowers {
    /// Delta band power (1-4 Hz)
    pub delta: Option<f64>,
    /// Theta band power (4-8 Hz)
    pub theta: Option<f64>,
    /// Alpha band power (8-13 Hz)
    pub alpha: Option<f64>,
    /// Beta band power (13-30 Hz)
    pub beta: Option<f64>,
    /// Gamma band power (30-45 Hz)
    pub gamma: Option<f64>,
}

impl BandPowers {
    /// Power of a single band
    #[must_use]
    pub fn get(&self, band: EegBand) -> Option<f64> {
        match band {
            EegBand::Delta => self.delta,
            EegBand::Theta => self.theta,
            EegBand::Alpha => self.alpha,
            EegBand::Beta => self.beta,
            EegBand::Gamma => self.gamma,
        }
    }

    /// Total power across the bands that are present
    #[must_use]
    pub fn total(&self) -> f64 {
        EegBand::ALL.into_iter().filter_map(|band| self.get(band)).sum()
    }

    /// Theta/beta ratio, `None` when either band is missing or beta is zero
    #[must_use]
    pub fn theta_beta_ratio(&self) -> Option<f64> {
        let (theta, beta) = (self.theta?, self.beta?);
        (beta > 0.0).then(|| theta / beta)
    }
}

/// Segment length covering [`WELCH_SEGMENT_S`] at `sample_rate`, rounded up
/// to a power of two.
#[must_use]
pub fn segment_len_for(sample_rate: f64) -> usize {
    let samples = (WELCH_SEGMENT_S * sample_rate).ceil();
    if samples.is_finite() && samples >= 1.0 {
        (samples as usize).next_power_of_two()
    } else {
        1
    }
}

/// Generate periodic Hann window coefficients
fn hann_window(size: usize) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos()))
        .collect()
}
