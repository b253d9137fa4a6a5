//! NeuroTwin Core - shared types and utilities
//!
//! This crate provides the foundational types, error definitions and numeric
//! helpers used across the NeuroTwin EEG analysis workspace. It performs no
//! I/O and holds no state.
//!
//! # Modules
//!
//! - [`types`]: Recordings, frequency bands, regions, conditions, probabilities
//! - [`error`]: The [`AnalysisError`] type shared by every analysis stage
//! - [`math`]: Small statistics helpers (mean, variance, OLS slope, correlation)
//!
//! # Example
//!
//! ```rust
//! use neurotwin_core::types::{Condition, ConditionProbabilities, Recording};
//!
//! let recording = Recording::new(
//!     vec!["F3".to_string(), "F4".to_string()],
//!     250.0,
//!     vec![vec![0.0; 500], vec![0.0; 500]],
//! )
//! .unwrap();
//! assert_eq!(recording.n_channels(), 2);
//!
//! let mut probs = ConditionProbabilities::new();
//! probs.set(Condition::Epilepsy, 1.7);
//! assert_eq!(probs.get(Condition::Epilepsy), Some(1.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod math;
pub mod types;

pub use error::{AnalysisError, AnalysisResult};
pub use types::{
    Condition, ConditionProbabilities, EegBand, FeatureMap, Recording, Region,
};
