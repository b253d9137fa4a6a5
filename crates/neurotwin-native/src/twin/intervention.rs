//! Intervention simulation
//!
//! A static effect table maps `(condition, intervention type)` to a
//! probability multiplier and per-biomarker multipliers. Simulation applies
//! one effect to a copy of a twin and reports before/after deltas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use neurotwin_core::error::{AnalysisError, AnalysisResult};
use neurotwin_core::math::clamp01;
use neurotwin_core::types::Condition;

use crate::ml::features::keys;
use crate::twin::builder::{biomarkers, DigitalTwin};

// ============================================================================
// Effect table
// ============================================================================

/// Declared effect of one intervention on one condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterventionEffect {
    /// Multiplier on the condition probability
    pub effect_multiplier: f64,
    /// Multiplier per biomarker name
    #[serde(default)]
    pub biomarkers: BTreeMap<String, f64>,
}

/// Flat serialized form of one table row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Target condition
    pub condition: Condition,
    /// Intervention type
    pub intervention: String,
    /// Declared effect
    #[serde(flatten)]
    pub effect: InterventionEffect,
}

fn row(condition: Condition, kind: &str, multiplier: f64, markers: &[(&str, f64)]) -> TableEntry {
    TableEntry {
        condition,
        intervention: kind.to_string(),
        effect: InterventionEffect {
            effect_multiplier: multiplier,
            biomarkers: markers.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
        },
    }
}

/// Read-only `(condition, intervention type) → effect` table.
///
/// Serialized as a list of `{ condition, intervention, effect_multiplier, biomarkers }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<TableEntry>", into = "Vec<TableEntry>")]
pub struct InterventionTable {
    effects: BTreeMap<(Condition, String), InterventionEffect>,
}

impl From<Vec<TableEntry>> for InterventionTable {
    fn from(entries: Vec<TableEntry>) -> Self {
        Self {
            effects: entries
                .into_iter()
                .map(|e| ((e.condition, e.intervention), e.effect))
                .collect(),
        }
    }
}

impl From<InterventionTable> for Vec<TableEntry> {
    fn from(table: InterventionTable) -> Self {
        table
            .effects
            .into_iter()
            .map(|((condition, intervention), effect)| TableEntry { condition, intervention, effect })
            .collect()
    }
}

impl Default for InterventionTable {
    fn default() -> Self {
        vec![
            row(
                Condition::Epilepsy,
                "medication",
                0.60,
                &[
                    (biomarkers::LINE_LENGTH_VARIANCE, 0.70),
                    (biomarkers::LINE_LENGTH_MEAN, 0.85),
                    (biomarkers::MEAN_DELTA_POWER, 0.85),
                ],
            ),
            row(
                Condition::Epilepsy,
                "neurostimulation",
                0.75,
                &[(biomarkers::LINE_LENGTH_VARIANCE, 0.80), (biomarkers::MEAN_THETA_POWER, 0.90)],
            ),
            row(Condition::Epilepsy, "sleep_hygiene", 0.90, &[(biomarkers::LINE_LENGTH_VARIANCE, 0.90)]),
            row(
                Condition::CognitiveStress,
                "meditation",
                0.70,
                &[
                    (keys::FRONTAL_MIDLINE_THETA_BETA_RATIO, 0.85),
                    (biomarkers::MEAN_BETA_POWER, 0.90),
                    (keys::FRONTAL_ALPHA_ASYMMETRY, 1.20),
                ],
            ),
            row(Condition::CognitiveStress, "exercise", 0.80, &[(biomarkers::MEAN_BETA_POWER, 0.90)]),
            row(Condition::CognitiveStress, "medication", 0.75, &[(biomarkers::MEAN_BETA_POWER, 0.85)]),
            row(
                Condition::Depression,
                "medication",
                0.65,
                &[(keys::FRONTAL_ALPHA_LOG_ASYMMETRY, 0.60), (keys::FRONTAL_THETA_MEAN, 0.90)],
            ),
            row(Condition::Depression, "therapy", 0.75, &[(keys::FRONTAL_ALPHA_LOG_ASYMMETRY, 0.80)]),
            row(
                Condition::Depression,
                "exercise",
                0.80,
                &[(keys::FRONTAL_THETA_MEAN, 0.90), (keys::PARIETAL_THETA_MEAN, 0.90)],
            ),
        ]
        .into()
    }
}

impl InterventionTable {
    /// Table with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self { effects: BTreeMap::new() }
    }

    /// Add or replace an entry.
    #[must_use]
    pub fn with(mut self, condition: Condition, kind: impl Into<String>, effect: InterventionEffect) -> Self {
        self.effects.insert((condition, kind.into()), effect);
        self
    }

    /// Effect for a condition and intervention type.
    #[must_use]
    pub fn get(&self, condition: Condition, kind: &str) -> Option<&InterventionEffect> {
        self.effects.get(&(condition, kind.to_string()))
    }

    /// All `(condition, type, effect)` rows in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (Condition, &str, &InterventionEffect)> {
        self.effects.iter().map(|((c, k), e)| (*c, k.as_str(), e))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// True when the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// A requested hypothetical intervention.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    /// Intervention type, e.g. `"medication"`
    #[serde(rename = "type")]
    pub kind: String,
    /// Condition the intervention targets
    pub target_condition: Condition,
}

impl Intervention {
    /// Create an intervention descriptor.
    #[must_use]
    pub fn new(kind: impl Into<String>, target_condition: Condition) -> Self {
        Self { kind: kind.into(), target_condition }
    }
}

/// Before/after values of one quantity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Value in the original twin
    pub before: f64,
    /// Value in the simulated twin
    pub after: f64,
    /// `(before − after) / before × 100`; `None` when `before` is zero
    pub percent_change: Option<f64>,
}

impl Delta {
    fn new(before: f64, after: f64) -> Self {
        let percent_change = (before != 0.0).then(|| (before - after) / before * 100.0);
        Self { before, after, percent_change }
    }
}

/// Changes caused by one intervention.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterventionDeltas {
    /// Target condition probability, if the twin carries it
    pub probability: Option<Delta>,
    /// Affected biomarkers present in the twin
    pub biomarkers: BTreeMap<String, Delta>,
}

/// Output of [`simulate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Intervention applied
    pub intervention: Intervention,
    /// Input twin, unchanged
    pub original: DigitalTwin,
    /// Counterfactual twin
    pub simulated: DigitalTwin,
    /// Per-quantity changes
    pub deltas: InterventionDeltas,
}

/// Apply an intervention to a copy of `twin`.
///
/// # Errors
///
/// [`AnalysisError::UnknownIntervention`] if the table has no entry for the
/// target condition and type. Nothing is produced in that case.
pub fn simulate(
    twin: &DigitalTwin,
    intervention: &Intervention,
    table: &InterventionTable,
) -> AnalysisResult<SimulationResult> {
    let target = intervention.target_condition;
    let effect = table
        .get(target, &intervention.kind)
        .ok_or_else(|| AnalysisError::UnknownIntervention {
            condition: target,
            intervention: intervention.kind.clone(),
        })?;

    let mut simulated = twin.clone();

    let probability = twin.condition_probabilities().get(target).map(|before| {
        let after = clamp01(before * effect.effect_multiplier);
        simulated.set_probability(target, after);
        Delta::new(before, after)
    });

    let mut biomarker_deltas = BTreeMap::new();
    for (name, multiplier) in &effect.biomarkers {
        if let Some((before, after)) = simulated.scale_biomarker(target, name, *multiplier) {
            biomarker_deltas.insert(name.clone(), Delta::new(before, after));
        } else {
            debug!("Biomarker {name} not in twin for {target}; skipped");
        }
    }

    Ok(SimulationResult {
        intervention: intervention.clone(),
        original: twin.clone(),
        simulated,
        deltas: InterventionDeltas { probability, biomarkers: biomarker_deltas },
    })
}
