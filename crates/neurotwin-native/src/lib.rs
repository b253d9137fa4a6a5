//! NeuroTwin Native - EEG analysis pipeline
//!
//! This crate turns raw multi-channel EEG recordings into clinical-risk
//! probabilities and a region-structured digital twin:
//! - Signal preprocessing (band-pass, mains notch, ICA eye-artifact removal)
//! - Spectral and line-length feature extraction
//! - Condition scoring from classifier votes or trained classifiers
//! - Digital twin construction and intervention simulation
//! - Longitudinal trend analysis over repeated recordings
//!
//! # Modules
//!
//! - [`processing`]: Filters, Welch PSD, FastICA, preprocessing
//! - [`ml`]: Feature extraction, scoring strategies, classifier boundary
//! - [`twin`]: Twin builder, intervention simulator, trend analyzer
//! - [`pipeline`]: End-to-end orchestration
//! - [`config`]: Serde configuration with built-in defaults
//! - [`io`]: Recording ingestion
//!
//! Every analysis call is a pure function of its inputs; a [`Pipeline`] can
//! be shared across threads and used for independent recordings.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod config;
pub mod io;
pub mod ml;
pub mod pipeline;
pub mod processing;
pub mod twin;

// Re-export key types
pub use config::AnalysisConfig;
pub use pipeline::{AnalysisReport, Pipeline};
pub use twin::{analyze_trend, build_twin, simulate, DigitalTwin, Intervention};
