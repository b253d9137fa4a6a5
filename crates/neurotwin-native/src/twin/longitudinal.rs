//! Longitudinal trend analysis over repeated recordings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use neurotwin_core::math::ols_slope;
use neurotwin_core::types::{Condition, ConditionProbabilities};

/// Slope magnitude separating a trend from a stable series.
pub const TREND_SLOPE_THRESHOLD: f64 = 0.05;

/// Latest probability above which an increasing trend is of high concern.
pub const HIGH_CONCERN_LEVEL: f64 = 0.5;

/// Latest probability above which a stable trend is of medium concern.
pub const MEDIUM_CONCERN_LEVEL: f64 = 0.4;

/// One historical analysis result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Recording time, seconds since the Unix epoch
    pub timestamp: u64,
    /// Probabilities from that recording
    pub probabilities: ConditionProbabilities,
}

/// Direction of a fitted trend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Slope above the threshold
    Increasing,
    /// Slope below the negative threshold
    Decreasing,
    /// Anything in between
    Stable,
}

impl TrendDirection {
    fn from_slope(slope: f64) -> Self {
        if slope > TREND_SLOPE_THRESHOLD {
            Self::Increasing
        } else if slope < -TREND_SLOPE_THRESHOLD {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        })
    }
}

/// Clinical concern attached to a trend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcernLevel {
    /// Improving or low and stable
    Low,
    /// Stable at an elevated level
    Medium,
    /// Rising from a low level
    Moderate,
    /// Rising and already elevated
    High,
}

impl ConcernLevel {
    fn classify(direction: TrendDirection, latest: f64) -> Self {
        match direction {
            TrendDirection::Increasing if latest > HIGH_CONCERN_LEVEL => Self::High,
            TrendDirection::Increasing => Self::Moderate,
            TrendDirection::Decreasing => Self::Low,
            TrendDirection::Stable if latest > MEDIUM_CONCERN_LEVEL => Self::Medium,
            TrendDirection::Stable => Self::Low,
        }
    }
}

impl fmt::Display for ConcernLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Moderate => "moderate",
            Self::High => "high",
        })
    }
}

/// Fitted trend for one condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Trend direction
    pub direction: TrendDirection,
    /// OLS slope per recording
    pub slope: f64,
    /// Most recent probability
    pub latest: f64,
    /// Concern level
    pub concern: ConcernLevel,
    /// Number of recordings used
    pub data_points: usize,
}

/// Output of [`analyze_trend`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    /// Conditions with at least two data points
    pub trends: BTreeMap<Condition, TrendSummary>,
    /// Human-readable notes on notable trends
    pub insights: Vec<String>,
}

/// Fit a trend per condition over a history of results.
///
/// Entries are ordered by timestamp (stable for ties). The slope is fitted
/// against the recording index `0..n`, so uneven spacing in time is ignored.
/// Conditions with fewer than two values are left out.
#[must_use]
pub fn analyze_trend(history: &[HistoryEntry]) -> TrendReport {
    let mut ordered: Vec<&HistoryEntry> = history.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut report = TrendReport::default();
    for condition in Condition::ALL {
        let series: Vec<f64> = ordered
            .iter()
            .filter_map(|e| e.probabilities.get(condition))
            .collect();

        let (Some(slope), Some(&latest)) = (ols_slope(&series), series.last()) else {
            debug!("Only {} data point(s) for {condition}; trend omitted", series.len());
            continue;
        };

        let direction = TrendDirection::from_slope(slope);
        let concern = ConcernLevel::classify(direction, latest);

        match direction {
            TrendDirection::Increasing => report.insights.push(format!(
                "{} risk is increasing ({concern} concern, latest {latest:.2}). Consider closer monitoring.",
                condition.label()
            )),
            TrendDirection::Decreasing => report.insights.push(format!(
                "{} risk is decreasing (latest {latest:.2}). Current management appears effective.",
                condition.label()
            )),
            TrendDirection::Stable => {}
        }

        report.trends.insert(
            condition,
            TrendSummary {
                direction,
                slope,
                latest,
                concern,
                data_points: series.len(),
            },
        );
    }
    report
}
