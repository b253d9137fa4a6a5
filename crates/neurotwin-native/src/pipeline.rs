//! End-to-end analysis: preprocess → features → score → twin.

use serde::{Deserialize, Serialize};
use tracing::info;

use neurotwin_core::error::AnalysisResult;
use neurotwin_core::types::{FeatureMap, Recording};

use crate::config::AnalysisConfig;
use crate::ml::classifier::{ClassifierInference, ClassifierSet, NoInference};
use crate::ml::features::FeatureExtractor;
use crate::ml::scoring::{score_inference, ClassifierScorer, ConditionScorer, ScoreReport, ScorerInput, VoteScorer};
use crate::processing::preprocess::Preprocessor;
use crate::twin::builder::{build_twin, DigitalTwin};
use crate::twin::intervention::{simulate, Intervention, SimulationResult};

/// Result of analyzing one recording.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Digital twin of the recording
    pub twin: DigitalTwin,
    /// Scoring details, including whether the probabilities are validated
    pub score: ScoreReport,
    /// Number of features extracted
    pub feature_count: usize,
    /// Number of ICA components removed as eye-movement artifacts
    pub eog_components_removed: usize,
}

/// Configured analysis pipeline. Holds no per-run state.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    config: AnalysisConfig,
    classifiers: Option<ClassifierSet>,
    preprocessor: Preprocessor,
    extractor: FeatureExtractor,
}

impl Pipeline {
    /// Create a pipeline from a configuration.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        let preprocessor = Preprocessor::new(config.preprocess.clone());
        Self {
            config,
            classifiers: None,
            preprocessor,
            extractor: FeatureExtractor::new(),
        }
    }

    /// Use trained classifiers when no vote vector is supplied.
    #[must_use]
    pub fn with_classifiers(mut self, classifiers: ClassifierSet) -> Self {
        self.classifiers = Some(classifiers);
        self
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a recording.
    ///
    /// Scoring uses `votes` when given, otherwise the configured classifiers,
    /// otherwise the placeholder policy of [`score_inference`].
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidRecording`](neurotwin_core::AnalysisError::InvalidRecording)
    /// from preprocessing and
    /// [`AnalysisError::InvalidInput`](neurotwin_core::AnalysisError::InvalidInput)
    /// from scoring.
    pub fn analyze(&self, recording: &Recording, votes: Option<&[f64]>) -> AnalysisResult<AnalysisReport> {
        self.run(recording, |features| match (votes, &self.classifiers) {
            (Some(votes), _) => VoteScorer.score(&ScorerInput::Votes(votes)),
            (None, Some(classifiers)) => {
                ClassifierScorer::new(classifiers.clone()).score(&ScorerInput::Features(features))
            }
            (None, None) => Ok(score_inference(&NoInference, recording)),
        })
    }

    /// Analyze a recording, scoring through an inference collaborator.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::InvalidRecording`](neurotwin_core::AnalysisError::InvalidRecording)
    /// from preprocessing. Inference failures degrade to placeholders.
    pub fn analyze_with_inference(
        &self,
        recording: &Recording,
        inference: &dyn ClassifierInference,
    ) -> AnalysisResult<AnalysisReport> {
        self.run(recording, |_| Ok(score_inference(inference, recording)))
    }

    /// Simulate an intervention with the configured effect table.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::UnknownIntervention`](neurotwin_core::AnalysisError::UnknownIntervention)
    /// for pairs missing from the table.
    pub fn simulate(&self, twin: &DigitalTwin, intervention: &Intervention) -> AnalysisResult<SimulationResult> {
        simulate(twin, intervention, &self.config.interventions)
    }

    fn run<F>(&self, recording: &Recording, score: F) -> AnalysisResult<AnalysisReport>
    where
        F: FnOnce(&FeatureMap) -> AnalysisResult<ScoreReport>,
    {
        let cleaned = self.preprocessor.preprocess(recording)?;
        let features = self.extractor.extract(&cleaned.recording);
        let score = score(&features)?;
        let twin = build_twin(&features, &score.probabilities);

        info!(
            features = features.len(),
            eog_removed = cleaned.removed_components.len(),
            source = ?score.source,
            "Analysis complete"
        );

        Ok(AnalysisReport {
            twin,
            feature_count: features.len(),
            eog_components_removed: cleaned.removed_components.len(),
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use neurotwin_core::types::{Condition, Region};

    use super::*;
    use crate::ml::classifier::{InferenceOutput, StaticInference};
    use crate::ml::scoring::ScoreSource;

    const FS: f64 = 250.0;
    const N: usize = 2500;

    fn recording() -> Recording {
        let wave = |f: f64, a: f64, phase: f64| -> Vec<f64> {
            (0..N).map(|i| a * (2.0 * PI * f * i as f64 / FS + phase).sin()).collect()
        };
        let blinks: Vec<f64> = (0..N)
            .map(|i| if (i % 400) < 40 { 80.0 * (PI * (i % 400) as f64 / 40.0).sin() } else { 0.0 })
            .collect();
        let mix = |a: &[f64], b: &[f64], k: f64| -> Vec<f64> { a.iter().zip(b).map(|(x, y)| x + k * y).collect() };

        let names = ["F3", "F4", "Fz", "P3", "P4", "O1", "EOG"];
        let data = vec![
            mix(&wave(10.0, 8.0, 0.0), &blinks, 0.6),
            mix(&wave(10.0, 12.0, 0.3), &blinks, 0.5),
            mix(&wave(6.0, 6.0, 0.1), &wave(20.0, 2.0, 0.0), 1.0),
            wave(9.0, 7.0, 0.7),
            mix(&wave(11.0, 9.0, 0.2), &wave(5.0, 3.0, 0.0), 1.0),
            wave(10.0, 15.0, 1.1),
            blinks,
        ];
        Recording::new(names.iter().map(|s| (*s).to_string()).collect(), FS, data).unwrap()
    }

    #[test]
    fn test_full_pipeline_is_deterministic() {
        let pipeline = Pipeline::default();
        let rec = recording();
        let votes = [1.0, 0.3, 0.2, 0.7, 0.4, 0.6];

        let a = pipeline.analyze(&rec, Some(&votes[..])).unwrap();
        let b = pipeline.analyze(&rec, Some(&votes[..])).unwrap();
        assert_eq!(a, b);

        assert!(a.score.is_validated());
        assert!(a.feature_count > 0);
        assert_eq!(a.twin.region(Region::Frontal).unwrap().len(), 3);
        assert!(a.twin.asymmetry_metrics().contains_key("frontal_alpha_asymmetry"));
    }

    #[test]
    fn test_without_votes_or_classifiers_uses_placeholder() {
        let report = Pipeline::default().analyze(&recording(), None).unwrap();
        assert_eq!(report.score.source, ScoreSource::Placeholder);
        assert!(!report.score.is_validated());
    }

    #[test]
    fn test_classifiers_used_when_no_votes() {
        let pipeline = Pipeline::default().with_classifiers(ClassifierSet::new());
        let report = pipeline.analyze(&recording(), None).unwrap();
        assert_eq!(report.score.source, ScoreSource::Classifiers);
        assert_eq!(report.score.placeholder_conditions.len(), 3);
    }

    #[test]
    fn test_malformed_votes_fail() {
        assert!(Pipeline::default().analyze(&recording(), Some(&[1.0, 2.0][..])).is_err());
    }

    #[test]
    fn test_inference_and_simulation() {
        let pipeline = Pipeline::default();
        let inference = StaticInference(InferenceOutput::Votes(vec![1.0, 0.9, 0.8, 0.1, 0.1, 0.1]));
        let report = pipeline.analyze_with_inference(&recording(), &inference).unwrap();
        assert_eq!(report.score.source, ScoreSource::Votes);

        let result = pipeline
            .simulate(&report.twin, &Intervention::new("medication", Condition::Epilepsy))
            .unwrap();
        assert_eq!(result.original, report.twin);
        let before = report.twin.condition_probabilities().get(Condition::Epilepsy).unwrap();
        let after = result.simulated.condition_probabilities().get(Condition::Epilepsy).unwrap();
        assert!((after - before * 0.6).abs() < 1e-12);
    }
}
