//! Condition scoring
//!
//! Two interchangeable strategies behind [`ConditionScorer`]:
//!
//! - [`VoteScorer`]: ratio formulas over the five vote scores of an external
//!   pattern classifier
//! - [`ClassifierScorer`]: one trained binary classifier per condition over
//!   the feature map
//!
//! Every probability produced here lies in \[0, 1\]. Degraded results
//! (placeholders) are always flagged in the [`ScoreReport`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use neurotwin_core::error::{AnalysisError, AnalysisResult};
use neurotwin_core::math::clamp01;
use neurotwin_core::types::{Condition, ConditionProbabilities, FeatureMap, Recording};

use crate::ml::classifier::{ClassifierInference, ClassifierSet, InferenceOutput};

/// Division guard in the vote formulas.
pub const VOTE_EPSILON: f64 = 0.001;

/// Expected vote vector length: `[record_id, lpd, gpd, lrda, grda, other]`.
pub const VOTE_VECTOR_LEN: usize = 6;

/// Vote vector substituted when inference is unavailable.
pub const PLACEHOLDER_VOTES: [f64; VOTE_VECTOR_LEN] = [1.0, 0.3, 0.2, 0.7, 0.4, 0.6];

/// Probability reported for a condition without a trained classifier.
pub const PLACEHOLDER_PROBABILITY: f64 = 0.5;

/// Input to a scorer.
#[derive(Clone, Copy, Debug)]
pub enum ScorerInput<'a> {
    /// Six-element vote vector
    Votes(&'a [f64]),
    /// Extracted features
    Features(&'a FeatureMap),
}

/// Where a set of probabilities came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Vote formulas over real classifier votes
    Votes,
    /// Per-condition trained classifiers
    Classifiers,
    /// Probabilities returned directly by the inference service
    Inference,
    /// Documented fallback; not a validated result
    Placeholder,
}

/// Scorer output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Per-condition probabilities
    pub probabilities: ConditionProbabilities,
    /// Origin of the probabilities
    pub source: ScoreSource,
    /// Conditions whose value is a placeholder
    pub placeholder_conditions: Vec<Condition>,
    /// Vote vector used, if any
    pub raw_votes: Option<Vec<f64>>,
    /// Why the result was degraded, if it was
    pub degraded_reason: Option<String>,
}

impl ScoreReport {
    /// True when no value in the report is a placeholder.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.source != ScoreSource::Placeholder && self.placeholder_conditions.is_empty()
    }
}

/// Common interface of the scoring strategies.
pub trait ConditionScorer {
    /// Score one input.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidInput`] for malformed or mismatched input.
    fn score(&self, input: &ScorerInput<'_>) -> AnalysisResult<ScoreReport>;
}

// ============================================================================
// Vote-based strategy
// ============================================================================

/// Ratio formulas over the external classifier's vote vector.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoteScorer;

impl VoteScorer {
    /// Compute probabilities from `[record_id, lpd, gpd, lrda, grda, other]`.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidInput`] if the vector does not have six finite
    /// elements.
    pub fn probabilities(votes: &[f64]) -> AnalysisResult<ConditionProbabilities> {
        let Ok(votes) = <&[f64; VOTE_VECTOR_LEN]>::try_from(votes) else {
            return Err(AnalysisError::invalid_input(
                "vote scorer",
                format!("expected {VOTE_VECTOR_LEN} votes, got {}", votes.len()),
            ));
        };
        if votes.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::invalid_input("vote scorer", "votes must be finite"));
        }
        Ok(Self::ratio_probabilities(votes))
    }

    fn ratio_probabilities(votes: &[f64; VOTE_VECTOR_LEN]) -> ConditionProbabilities {
        let [_, lpd, gpd, lrda, grda, other] = *votes;

        let epilepsy = (0.4 * gpd + 0.4 * lpd + 0.2 * lrda) / (gpd + lpd + lrda + VOTE_EPSILON);
        let stress = (0.6 * lrda + 0.2 * grda + 0.2 * other) / (lrda + grda + other + VOTE_EPSILON);
        let depression = (0.3 * lrda + 0.3 * grda + 0.4 * other) / (lrda + grda + other + VOTE_EPSILON);

        [
            (Condition::Epilepsy, clamp01(epilepsy)),
            (Condition::CognitiveStress, clamp01(stress)),
            (Condition::Depression, clamp01(depression)),
        ]
        .into_iter()
        .collect()
    }
}

impl ConditionScorer for VoteScorer {
    fn score(&self, input: &ScorerInput<'_>) -> AnalysisResult<ScoreReport> {
        let ScorerInput::Votes(votes) = input else {
            return Err(AnalysisError::invalid_input("vote scorer", "expected a vote vector"));
        };
        let probabilities = Self::probabilities(votes)?;
        debug!(?probabilities, "Scored vote vector");

        Ok(ScoreReport {
            probabilities,
            source: ScoreSource::Votes,
            placeholder_conditions: Vec::new(),
            raw_votes: Some(votes.to_vec()),
            degraded_reason: None,
        })
    }
}

// ============================================================================
// Classifier-based strategy
// ============================================================================

/// Per-condition trained classifiers over the feature map.
#[derive(Clone, Debug, Default)]
pub struct ClassifierScorer {
    classifiers: ClassifierSet,
}

impl ClassifierScorer {
    /// Create a scorer over an explicit classifier set.
    #[must_use]
    pub fn new(classifiers: ClassifierSet) -> Self {
        Self { classifiers }
    }

    /// Classifiers in use
    #[must_use]
    pub fn classifiers(&self) -> &ClassifierSet {
        &self.classifiers
    }
}

impl ConditionScorer for ClassifierScorer {
    fn score(&self, input: &ScorerInput<'_>) -> AnalysisResult<ScoreReport> {
        let ScorerInput::Features(features) = input else {
            return Err(AnalysisError::invalid_input("classifier scorer", "expected a feature map"));
        };
        if features.is_empty() {
            return Err(AnalysisError::invalid_input("classifier scorer", "feature map is empty"));
        }

        let mut probabilities = ConditionProbabilities::new();
        let mut placeholders = Vec::new();
        for condition in Condition::ALL {
            match self.classifiers.get(condition) {
                Some(clf) => probabilities.set(condition, clf.predict_proba(features)),
                None => {
                    probabilities.set(condition, PLACEHOLDER_PROBABILITY);
                    placeholders.push(condition);
                }
            }
        }

        if !placeholders.is_empty() {
            warn!(
                "No trained classifier for {:?}; reporting placeholder probability {}",
                placeholders, PLACEHOLDER_PROBABILITY
            );
        }

        let degraded_reason = (!placeholders.is_empty()).then(|| "no trained classifier".to_string());
        Ok(ScoreReport {
            probabilities,
            source: ScoreSource::Classifiers,
            placeholder_conditions: placeholders,
            raw_votes: None,
            degraded_reason,
        })
    }
}

// ============================================================================
// Inference boundary
// ============================================================================

/// Score a recording through the external inference service.
///
/// Never fails: an unavailable service or an unusable answer degrades to
/// [`PLACEHOLDER_VOTES`] and the report is marked as a placeholder.
pub fn score_inference(inference: &dyn ClassifierInference, recording: &Recording) -> ScoreReport {
    match inference.infer(recording) {
        Ok(InferenceOutput::Votes(votes)) => match VoteScorer.score(&ScorerInput::Votes(&votes)) {
            Ok(report) => report,
            Err(e) => placeholder_report(&e.to_string()),
        },
        Ok(InferenceOutput::Probabilities(returned)) => {
            let mut probabilities = ConditionProbabilities::new();
            let mut placeholders = Vec::new();
            for condition in Condition::ALL {
                match returned.get(condition) {
                    Some(p) => probabilities.set(condition, p),
                    None => {
                        probabilities.set(condition, PLACEHOLDER_PROBABILITY);
                        placeholders.push(condition);
                    }
                }
            }
            let degraded_reason =
                (!placeholders.is_empty()).then(|| "inference omitted some conditions".to_string());
            ScoreReport {
                probabilities,
                source: ScoreSource::Inference,
                placeholder_conditions: placeholders,
                raw_votes: None,
                degraded_reason,
            }
        }
        Err(e) => placeholder_report(&e.to_string()),
    }
}

fn placeholder_report(reason: &str) -> ScoreReport {
    warn!("Classifier inference unusable ({reason}); using placeholder votes");

    ScoreReport {
        probabilities: VoteScorer::ratio_probabilities(&PLACEHOLDER_VOTES),
        source: ScoreSource::Placeholder,
        placeholder_conditions: Condition::ALL.to_vec(),
        raw_votes: Some(PLACEHOLDER_VOTES.to_vec()),
        degraded_reason: Some(reason.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use neurotwin_core::types::Recording;

    use super::*;
    use crate::ml::classifier::{FeatureWeight, LogisticClassifier, NoInference, StaticInference};

    const SCENARIO: [f64; 6] = [1.0, 0.3, 0.2, 0.7, 0.4, 0.6];

    fn recording() -> Recording {
        Recording::new(vec!["Cz".to_string()], 100.0, vec![vec![0.0; 10]]).unwrap()
    }

    #[test]
    fn test_vote_scenario() {
        let p = VoteScorer::probabilities(&SCENARIO).unwrap();

        let epi = (0.4 * 0.2 + 0.4 * 0.3 + 0.2 * 0.7) / (0.2 + 0.3 + 0.7 + 0.001);
        let stress = (0.6 * 0.7 + 0.2 * 0.4 + 0.2 * 0.6) / (0.7 + 0.4 + 0.6 + 0.001);
        let dep = (0.3 * 0.7 + 0.3 * 0.4 + 0.4 * 0.6) / (0.7 + 0.4 + 0.6 + 0.001);

        assert!((p.get(Condition::Epilepsy).unwrap() - epi).abs() < 1e-12);
        assert!((p.get(Condition::CognitiveStress).unwrap() - stress).abs() < 1e-12);
        assert!((p.get(Condition::Depression).unwrap() - dep).abs() < 1e-12);

        assert!((epi - 0.283).abs() < 1e-3);
        assert!((stress - 0.364).abs() < 1e-3);
        assert!((dep - 0.335).abs() < 1e-3);
    }

    #[test]
    fn test_all_zero_votes_are_guarded() {
        let p = VoteScorer::probabilities(&[0.0; 6]).unwrap();
        for (_, v) in p.iter() {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let cases: [[f64; 6]; 4] = [
            [0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            [7.0, 100.0, 0.5, 3.0, 0.0, 42.0],
            [1.0, -0.5, 0.2, -0.1, 0.3, 0.4],
            [1.0, 1e-9, 1e-9, 1e-9, 1e-9, 1e-9],
        ];
        for votes in cases {
            let p = VoteScorer::probabilities(&votes).unwrap();
            assert_eq!(p.len(), 3);
            for (_, v) in p.iter() {
                assert!((0.0..=1.0).contains(&v), "{votes:?} -> {v}");
            }
        }
    }

    #[test]
    fn test_vote_scaling_invariance() {
        let base = VoteScorer::probabilities(&SCENARIO).unwrap();
        for k in [2.0, 10.0, 100.0] {
            let scaled: Vec<f64> = SCENARIO.iter().map(|v| v * k).collect();
            let p = VoteScorer::probabilities(&scaled).unwrap();
            for c in Condition::ALL {
                assert!((p.get(c).unwrap() - base.get(c).unwrap()).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_malformed_votes_rejected() {
        assert!(matches!(
            VoteScorer::probabilities(&[1.0, 0.3, 0.2]),
            Err(AnalysisError::InvalidInput { .. })
        ));
        assert!(VoteScorer::probabilities(&[1.0, f64::NAN, 0.2, 0.7, 0.4, 0.6]).is_err());
        assert!(VoteScorer.score(&ScorerInput::Features(&FeatureMap::new())).is_err());
    }

    #[test]
    fn test_classifier_scorer_flags_placeholders() {
        let set = ClassifierSet::new().with(
            Condition::Epilepsy,
            LogisticClassifier {
                intercept: 0.0,
                features: vec![FeatureWeight {
                    name: "T3_line_length_variance".to_string(),
                    weight: 1.0,
                    mean: 0.0,
                    scale: 1.0,
                }],
            },
        );
        let mut features = FeatureMap::new();
        features.insert("T3_line_length_variance".to_string(), 2.0);

        let report = ClassifierScorer::new(set).score(&ScorerInput::Features(&features)).unwrap();
        assert_eq!(report.source, ScoreSource::Classifiers);
        assert!(!report.is_validated());
        assert_eq!(
            report.placeholder_conditions,
            vec![Condition::CognitiveStress, Condition::Depression]
        );
        assert_eq!(report.probabilities.get(Condition::Depression), Some(PLACEHOLDER_PROBABILITY));

        let epi = report.probabilities.get(Condition::Epilepsy).unwrap();
        assert!((epi - 1.0 / (1.0 + (-2.0_f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_classifier_scorer_rejects_empty_features() {
        let scorer = ClassifierScorer::default();
        assert!(matches!(
            scorer.score(&ScorerInput::Features(&FeatureMap::new())),
            Err(AnalysisError::InvalidInput { .. })
        ));
        assert!(scorer.score(&ScorerInput::Votes(&SCENARIO)).is_err());
    }

    #[test]
    fn test_unavailable_inference_degrades_to_placeholder() {
        let report = score_inference(&NoInference, &recording());
        assert_eq!(report.source, ScoreSource::Placeholder);
        assert!(!report.is_validated());
        assert_eq!(report.raw_votes.as_deref(), Some(&PLACEHOLDER_VOTES[..]));
        assert_eq!(report.placeholder_conditions.len(), 3);
        assert!(report.degraded_reason.is_some());
        assert_eq!(report.probabilities, VoteScorer::probabilities(&PLACEHOLDER_VOTES).unwrap());
    }

    #[test]
    fn test_bad_inference_votes_degrade_to_placeholder() {
        let inference = StaticInference(InferenceOutput::Votes(vec![1.0, 2.0]));
        let report = score_inference(&inference, &recording());
        assert_eq!(report.source, ScoreSource::Placeholder);
    }

    #[test]
    fn test_inference_votes_are_validated() {
        let inference = StaticInference(InferenceOutput::Votes(SCENARIO.to_vec()));
        let report = score_inference(&inference, &recording());
        assert_eq!(report.source, ScoreSource::Votes);
        assert!(report.is_validated());
    }

    #[test]
    fn test_inference_probabilities_fill_missing() {
        let returned: ConditionProbabilities = [(Condition::Epilepsy, 0.9)].into_iter().collect();
        let report = score_inference(&StaticInference(InferenceOutput::Probabilities(returned)), &recording());
        assert_eq!(report.source, ScoreSource::Inference);
        assert_eq!(report.probabilities.get(Condition::Epilepsy), Some(0.9));
        assert_eq!(report.placeholder_conditions.len(), 2);
    }
}
