//! Feature extraction and condition scoring

pub mod classifier;
pub mod features;
pub mod scoring;

pub use classifier::{ClassifierInference, ClassifierSet, InferenceOutput, LogisticClassifier};
pub use features::FeatureExtractor;
pub use scoring::{ClassifierScorer, ConditionScorer, ScoreReport, ScoreSource, ScorerInput, VoteScorer};
