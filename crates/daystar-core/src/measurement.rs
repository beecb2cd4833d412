// A single day's measurement of one action, tagged with the model used to
// score it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScoreError;
use crate::score::{score_exact, score_range};

/// Which scoring formula applies to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementModel {
    /// Compare against an exact count; binary actions use target 0.
    Exact,
    /// "Max allowed" target, or a target with a bonus region up to a limit.
    Range,
}

impl MeasurementModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementModel::Exact => "exact",
            MeasurementModel::Range => "range",
        }
    }
}

impl fmt::Display for MeasurementModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MeasurementModel {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MeasurementModel::Exact),
            "range" => Ok(MeasurementModel::Range),
            _ => Err(ScoreError::InvalidFormat(format!(
                "unknown measurement model {s:?} (expected \"exact\" or \"range\")"
            ))),
        }
    }
}

/// Raw integers for one action, ready to be scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMeasurement {
    pub model: MeasurementModel,
    pub actual: i64,
    pub target: i64,
    #[serde(default)]
    pub upper_limit: Option<i64>,
}

impl ActionMeasurement {
    pub fn exact(actual: i64, target: i64) -> Self {
        Self {
            model: MeasurementModel::Exact,
            actual,
            target,
            upper_limit: None,
        }
    }

    pub fn range(actual: i64, target: i64, upper_limit: Option<i64>) -> Self {
        Self {
            model: MeasurementModel::Range,
            actual,
            target,
            upper_limit,
        }
    }

    /// Score this measurement with the formula its model selects.
    ///
    /// An upper limit only has meaning for the range model; passing one with
    /// an exact measurement is rejected instead of silently dropped.
    pub fn score(&self) -> Result<u8, ScoreError> {
        match self.model {
            MeasurementModel::Exact => {
                if let Some(limit) = self.upper_limit {
                    return Err(ScoreError::InvalidInput(format!(
                        "upper_limit ({limit}) is only valid for range measurements"
                    )));
                }
                score_exact(self.actual, self.target)
            }
            MeasurementModel::Range => score_range(self.actual, self.target, self.upper_limit),
        }
    }
}
