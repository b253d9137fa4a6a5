//! Classifier abstractions
//!
//! - [`BinaryClassifier`]: per-condition probabilistic classifier over a
//!   feature map, trained offline
//! - [`ClassifierSet`]: explicit condition → classifier mapping handed to the
//!   scorer at construction
//! - [`ClassifierInference`]: boundary to the external inference service,
//!   which yields either a vote vector or probabilities

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use neurotwin_core::error::{AnalysisError, AnalysisResult};
use neurotwin_core::types::{Condition, ConditionProbabilities, FeatureMap, Recording};

// ============================================================================
// Binary classifiers
// ============================================================================

/// A probabilistic binary classifier for one condition.
pub trait BinaryClassifier: Send + Sync {
    /// Probability of the positive class for these features.
    fn predict_proba(&self, features: &FeatureMap) -> f64;
}

/// One standardized input of a logistic model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    /// Feature key
    pub name: String,
    /// Coefficient on the standardized value
    pub weight: f64,
    /// Training mean
    #[serde(default)]
    pub mean: f64,
    /// Training standard deviation
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

fn unit_scale() -> f64 {
    1.0
}

/// Logistic regression over standardized features.
///
/// A feature missing from the map is imputed with its training mean, so it
/// contributes nothing to the logit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    /// Intercept term
    pub intercept: f64,
    /// Feature coefficients
    pub features: Vec<FeatureWeight>,
}

impl LogisticClassifier {
    /// Logit for a feature map.
    #[must_use]
    pub fn decision_function(&self, features: &FeatureMap) -> f64 {
        self.features.iter().fold(self.intercept, |acc, fw| {
            let z = features
                .get(&fw.name)
                .filter(|v| v.is_finite())
                .map_or(0.0, |v| {
                    if fw.scale > 0.0 { (v - fw.mean) / fw.scale } else { v - fw.mean }
                });
            acc + fw.weight * z
        })
    }
}

impl BinaryClassifier for LogisticClassifier {
    fn predict_proba(&self, features: &FeatureMap) -> f64 {
        1.0 / (1.0 + (-self.decision_function(features)).exp())
    }
}

/// Trained classifiers keyed by condition.
#[derive(Clone, Default)]
pub struct ClassifierSet {
    classifiers: BTreeMap<Condition, Arc<dyn BinaryClassifier>>,
}

impl ClassifierSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, condition: Condition, classifier: impl BinaryClassifier + 'static) -> Self {
        self.insert(condition, classifier);
        self
    }

    /// Register the classifier for a condition, replacing any previous one.
    pub fn insert(&mut self, condition: Condition, classifier: impl BinaryClassifier + 'static) {
        self.classifiers.insert(condition, Arc::new(classifier));
    }

    /// Classifier for a condition.
    #[must_use]
    pub fn get(&self, condition: Condition) -> Option<&dyn BinaryClassifier> {
        self.classifiers.get(&condition).map(AsRef::as_ref)
    }

    /// Conditions that have a classifier.
    pub fn conditions(&self) -> impl Iterator<Item = Condition> + '_ {
        self.classifiers.keys().copied()
    }

    /// Number of registered classifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    /// True when no classifier is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    /// Load logistic classifiers from a JSON object keyed by condition name.
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed documents or unknown conditions.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let models: BTreeMap<Condition, LogisticClassifier> = serde_json::from_str(json)?;
        Ok(models.into_iter().fold(Self::new(), |set, (c, m)| set.with(c, m)))
    }
}

impl fmt::Debug for ClassifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierSet")
            .field("conditions", &self.classifiers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// External inference boundary
// ============================================================================

/// Output of the external inference service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceOutput {
    /// `[record_id, lpd, gpd, lrda, grda, other]`
    Votes(Vec<f64>),
    /// Per-condition probabilities
    Probabilities(ConditionProbabilities),
}

/// The classifier-inference collaborator.
///
/// Implementations either return a typed output or fail with
/// [`AnalysisError::UpstreamUnavailable`].
pub trait ClassifierInference {
    /// Run inference on a recording.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::UpstreamUnavailable`] when the service cannot answer.
    fn infer(&self, recording: &Recording) -> AnalysisResult<InferenceOutput>;
}

/// Inference stand-in that always returns the same output.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticInference(pub InferenceOutput);

impl ClassifierInference for StaticInference {
    fn infer(&self, _recording: &Recording) -> AnalysisResult<InferenceOutput> {
        Ok(self.0.clone())
    }
}

/// Inference stand-in for a deployment with no model available.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInference;

impl ClassifierInference for NoInference {
    fn infer(&self, _recording: &Recording) -> AnalysisResult<InferenceOutput> {
        Err(AnalysisError::UpstreamUnavailable {
            reason: "no inference model configured".to_string(),
        })
    }
}
