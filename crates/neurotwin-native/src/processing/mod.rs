//! Signal processing
//!
//! - [`filters`]: Butterworth biquads with zero-phase application
//! - [`fft`]: Welch power spectral density and band integration
//! - [`ica`]: FastICA decomposition
//! - [`preprocess`]: Band-pass, notch and EOG artifact removal

pub mod fft;
pub mod filters;
pub mod ica;
pub mod preprocess;

pub use fft::{BandPowers, Psd, WelchEstimator};
pub use preprocess::{CleanedRecording, Preprocessor};
