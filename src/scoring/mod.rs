pub mod engine;
pub mod gaps;
pub mod ranking;
pub mod whatif;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::ScoringEngine;
pub use gaps::{CaseGaps, DimensionGap, GapReport};

/// Overall scores at or above this are banded as strong.
pub const STRONG_BAND_MIN: f64 = 70.0;
pub const MODERATE_BAND_MIN: f64 = 50.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SubScore {
    Financial,
    Strategic,
    Feasibility,
    Impact,
    Resource,
}

impl SubScore {
    pub const ALL: [SubScore; 5] = [
        SubScore::Financial,
        SubScore::Strategic,
        SubScore::Feasibility,
        SubScore::Impact,
        SubScore::Resource,
    ];
}

impl Display for SubScore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Financial => "Financial",
            Self::Strategic => "Strategic",
            Self::Feasibility => "Feasibility",
            Self::Impact => "Impact",
            Self::Resource => "Resource",
        };
        write!(f, "{display}")
    }
}

/// Sub-score weights in whole percent. Held as integers so that closure
/// (summing to exactly 100%) is checked without float drift.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreWeights {
    #[serde(default = "default_financial")]
    pub financial: u8,
    #[serde(default = "default_strategic")]
    pub strategic: u8,
    #[serde(default = "default_feasibility")]
    pub feasibility: u8,
    #[serde(default = "default_impact")]
    pub impact: u8,
    #[serde(default = "default_resource")]
    pub resource: u8,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("score weights must sum to 100%, got {0}%")]
pub struct WeightsError(pub u32);

impl ScoreWeights {
    pub fn percent(&self, sub: SubScore) -> u8 {
        match sub {
            SubScore::Financial => self.financial,
            SubScore::Strategic => self.strategic,
            SubScore::Feasibility => self.feasibility,
            SubScore::Impact => self.impact,
            SubScore::Resource => self.resource,
        }
    }

    pub fn fraction(&self, sub: SubScore) -> f64 {
        f64::from(self.percent(sub)) / 100.0
    }

    pub fn total_percent(&self) -> u32 {
        SubScore::ALL
            .iter()
            .map(|sub| u32::from(self.percent(*sub)))
            .sum()
    }

    pub fn validate(&self) -> Result<(), WeightsError> {
        match self.total_percent() {
            100 => Ok(()),
            other => Err(WeightsError(other)),
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            financial: default_financial(),
            strategic: default_strategic(),
            feasibility: default_feasibility(),
            impact: default_impact(),
            resource: default_resource(),
        }
    }
}

fn default_financial() -> u8 {
    30
}

fn default_strategic() -> u8 {
    25
}

fn default_feasibility() -> u8 {
    20
}

fn default_impact() -> u8 {
    15
}

fn default_resource() -> u8 {
    10
}

/// Output of [`ScoringEngine::score`]. Sub-scores are nominally 0-10 and
/// `overall` nominally 0-100; out-of-range inputs are not clamped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    pub financial: f64,
    pub strategic: f64,
    pub feasibility: f64,
    pub impact: f64,
    pub resource: f64,
    pub overall: f64,
}

impl ScoreResult {
    pub fn sub_score(&self, sub: SubScore) -> f64 {
        match sub {
            SubScore::Financial => self.financial,
            SubScore::Strategic => self.strategic,
            SubScore::Feasibility => self.feasibility,
            SubScore::Impact => self.impact,
            SubScore::Resource => self.resource,
        }
    }

    /// Contribution of one sub-score to `overall / 10`.
    pub fn weighted(&self, sub: SubScore, weights: &ScoreWeights) -> f64 {
        self.sub_score(sub) * weights.fraction(sub)
    }

    pub fn band(&self) -> ScoreBand {
        ScoreBand::for_score(self.overall)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Weak,
    Moderate,
    Strong,
}

impl ScoreBand {
    pub fn for_score(overall: f64) -> Self {
        if overall >= STRONG_BAND_MIN {
            Self::Strong
        } else if overall >= MODERATE_BAND_MIN {
            Self::Moderate
        } else {
            Self::Weak
        }
    }
}

impl Display for ScoreBand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Weak => "Weak",
            Self::Moderate => "Moderate",
            Self::Strong => "Strong",
        };
        write!(f, "{display}")
    }
}
