//! Digital filters for EEG preprocessing
//!
//! Floating-point Butterworth and notch biquads with a zero-phase
//! (forward-backward) application mode for offline recordings.

/// Butterworth IIR filter coefficients (second-order section)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoeffs {
    /// Numerator coefficients [b0, b1, b2]
    pub b: [f64; 3],
    /// Denominator coefficients [a0=1, a1, a2]
    pub a: [f64; 3],
}

/// Second-order biquad filter section (transposed direct form II)
#[derive(Clone, Debug)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    /// State: [z1, z2]
    state: [f64; 2],
}

impl Biquad {
    /// Create a new biquad section with given coefficients
    #[must_use]
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self { coeffs, state: [0.0, 0.0] }
    }

    /// Create a second-order Butterworth lowpass filter
    #[must_use]
    pub fn lowpass(sample_rate: f64, cutoff: f64) -> Self {
        let omega = std::f64::consts::PI * cutoff / sample_rate;
        let k = omega.tan();
        let k2 = k * k;
        let sqrt2 = std::f64::consts::SQRT_2;

        let norm = 1.0 / (1.0 + sqrt2 * k + k2);

        let coeffs = BiquadCoeffs {
            b: [k2 * norm, 2.0 * k2 * norm, k2 * norm],
            a: [1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - sqrt2 * k + k2) * norm],
        };

        Self::new(coeffs)
    }

    /// Create a second-order Butterworth highpass filter
    #[must_use]
    pub fn highpass(sample_rate: f64, cutoff: f64) -> Self {
        let omega = std::f64::consts::PI * cutoff / sample_rate;
        let k = omega.tan();
        let k2 = k * k;
        let sqrt2 = std::f64::consts::SQRT_2;

        let norm = 1.0 / (1.0 + sqrt2 * k + k2);

        let coeffs = BiquadCoeffs {
            b: [norm, -2.0 * norm, norm],
            a: [1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - sqrt2 * k + k2) * norm],
        };

        Self::new(coeffs)
    }

    /// Create a notch filter for power line interference
    #[must_use]
    pub fn notch(sample_rate: f64, notch_freq: f64, q: f64) -> Self {
        let omega = 2.0 * std::f64::consts::PI * notch_freq / sample_rate;
        let cos_omega = omega.cos();
        let sin_omega = omega.sin();
        let alpha = sin_omega / (2.0 * q);

        let norm = 1.0 / (1.0 + alpha);

        let coeffs = BiquadCoeffs {
            b: [norm, -2.0 * cos_omega * norm, norm],
            a: [1.0, -2.0 * cos_omega * norm, (1.0 - alpha) * norm],
        };

        Self::new(coeffs)
    }

    /// Filter coefficients
    #[must_use]
    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    /// Process a single sample
    fn filter(&mut self, input: f64) -> f64 {
        let BiquadCoeffs { b, a } = self.coeffs;
        let output = b[0] * input + self.state[0];

        self.state[0] = b[1] * input - a[1] * output + self.state[1];
        self.state[1] = b[2] * input - a[2] * output;

        output
    }

    /// Reset filter state
    fn reset(&mut self) {
        self.state = [0.0, 0.0];
    }

    /// Apply the section forward then backward over a whole signal.
    ///
    /// The result has zero phase distortion and squared magnitude response.
    /// The signal is extended by odd reflection at both ends to damp the
    /// start-up transient.
    #[must_use]
    pub fn filtfilt(&self, samples: &[f64], pad_len: usize) -> Vec<f64> {
        let n = samples.len();
        if n < 2 {
            return samples.to_vec();
        }
        let pad = pad_len.min(n - 1);

        let mut extended = Vec::with_capacity(n + 2 * pad);
        let first = samples[0];
        let last = samples[n - 1];
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - samples[i]));
        extended.extend_from_slice(samples);
        extended.extend((1..=pad).map(|i| 2.0 * last - samples[n - 1 - i]));

        let mut section = Self::new(self.coeffs);
        for x in &mut extended {
            *x = section.filter(*x);
        }

        section.reset();
        for x in extended.iter_mut().rev() {
            *x = section.filter(*x);
        }

        extended[pad..pad + n].to_vec()
    }
}

/// Bandpass filter built from a Butterworth highpass and lowpass pair
#[derive(Clone, Debug)]
pub struct BandpassFilter {
    lowpass: Option<Biquad>,
    highpass: Biquad,
}

impl BandpassFilter {
    /// Create a bandpass filter for a frequency range.
    ///
    /// The lowpass stage is omitted when `high_cutoff` is at or above the
    /// Nyquist frequency.
    #[must_use]
    pub fn new(sample_rate: f64, low_cutoff: f64, high_cutoff: f64) -> Self {
        let lowpass = (high_cutoff < sample_rate / 2.0).then(|| Biquad::lowpass(sample_rate, high_cutoff));
        Self {
            lowpass,
            highpass: Biquad::highpass(sample_rate, low_cutoff),
        }
    }

    /// Whether the lowpass stage is active
    #[must_use]
    pub fn has_lowpass(&self) -> bool {
        self.lowpass.is_some()
    }

    /// Zero-phase application over a whole signal
    #[must_use]
    pub fn filtfilt(&self, samples: &[f64], pad_len: usize) -> Vec<f64> {
        let hp = self.highpass.filtfilt(samples, pad_len);
        match &self.lowpass {
            Some(lp) => lp.filtfilt(&hp, pad_len),
            None => hp,
        }
    }
}

/// Line-noise notch bank (one notch per mains frequency)
#[derive(Clone, Debug)]
pub struct NotchBank {
    notches: Vec<Biquad>,
}

impl NotchBank {
    /// Create notches for each frequency strictly below Nyquist.
    #[must_use]
    pub fn new(sample_rate: f64, freqs: &[f64], q: f64) -> Self {
        let notches = freqs
            .iter()
            .filter(|&&f| f > 0.0 && f < sample_rate / 2.0)
            .map(|&f| Biquad::notch(sample_rate, f, q))
            .collect();
        Self { notches }
    }

    /// Number of active notches
    #[must_use]
    pub fn len(&self) -> usize {
        self.notches.len()
    }

    /// True when no notch is active
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notches.is_empty()
    }

    /// Zero-phase application of every notch in turn
    #[must_use]
    pub fn filtfilt(&self, samples: &[f64], pad_len: usize) -> Vec<f64> {
        self.notches
            .iter()
            .fold(samples.to_vec(), |acc, notch| notch.filtfilt(&acc, pad_len))
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    fn sine(freq: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin()).collect()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_lowpass_dc_gain_is_unity() {
        let c = Biquad::lowpass(250.0, 30.0).coeffs();
        let gain = (c.b[0] + c.b[1] + c.b[2]) / (c.a[0] + c.a[1] + c.a[2]);
        assert!((gain - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_notch_removes_line_noise() {
        let fs = 250.0;
        let noise = sine(50.0, fs, 2500);
        let bank = NotchBank::new(fs, &[50.0, 60.0], 30.0);
        assert_eq!(bank.len(), 2);

        let out = bank.filtfilt(&noise, 250);
        // Ignore the edges; the middle should be almost silent.
        assert!(rms(&out[500..2000]) < 0.05 * rms(&noise[500..2000]));
    }

    #[test]
    fn test_notch_above_nyquist_is_skipped() {
        let bank = NotchBank::new(100.0, &[50.0, 60.0], 30.0);
        assert!(bank.is_empty());
    }

    #[test]
    fn test_bandpass_passes_alpha_rejects_drift() {
        let fs = 250.0;
        let alpha = sine(10.0, fs, 5000);
        let drift: Vec<f64> = (0..5000).map(|i| i as f64 * 0.01).collect();
        let bp = BandpassFilter::new(fs, 1.0, 45.0);
        assert!(bp.has_lowpass());

        let passed = bp.filtfilt(&alpha, 250);
        let ratio = rms(&passed[1000..4000]) / rms(&alpha[1000..4000]);
        assert!(ratio > 0.9 && ratio < 1.1, "alpha gain {ratio}");

        let removed = bp.filtfilt(&drift, 250);
        assert!(rms(&removed[1000..4000]) < 0.1);
    }

    #[test]
    fn test_filtfilt_preserves_length() {
        let bq = Biquad::highpass(128.0, 1.0);
        assert_eq!(bq.filtfilt(&[1.0, 2.0, 3.0], 100).len(), 3);
        assert_eq!(bq.filtfilt(&[1.0], 100), vec![1.0]);
    }
}
