pub mod promoter;
pub mod store;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::case::CaseRecord;

pub use promoter::{
    PipelinePromoter, PromotionOutcome, PromotionRecord, DEFAULT_PROMOTION_THRESHOLD,
};
pub use store::{PipelineStore, PipelineSummary};

/// Pipeline stage of a tracked case. Cases that never qualified are simply
/// absent from the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ParkingLot,
    Backlog,
    Roadmap,
}

/// Every allowed forward move. Stages never regress.
pub const STAGE_TRANSITIONS: [(Stage, Stage); 2] = [
    (Stage::ParkingLot, Stage::Backlog),
    (Stage::Backlog, Stage::Roadmap),
];

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::ParkingLot, Stage::Backlog, Stage::Roadmap];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::ParkingLot => "parking_lot",
            Self::Backlog => "backlog",
            Self::Roadmap => "roadmap",
        }
    }

    pub fn next(&self) -> Option<Stage> {
        STAGE_TRANSITIONS
            .iter()
            .find(|(from, _)| from == self)
            .map(|(_, to)| *to)
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::ParkingLot => "Parking Lot",
            Self::Backlog => "Backlog",
            Self::Roadmap => "Roadmap",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown pipeline stage: {0}")]
pub struct StageParseError(pub String);

impl FromStr for Stage {
    type Err = StageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "parking_lot" | "parkinglot" | "parking" => Ok(Self::ParkingLot),
            "backlog" => Ok(Self::Backlog),
            "roadmap" => Ok(Self::Roadmap),
            _ => Err(StageParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineEntry {
    pub case: CaseRecord,
    pub stage: Stage,
    /// Overall score captured when the case was promoted.
    pub score: f64,
    pub date_entered: DateTime<Utc>,
    pub stage_changed_at: DateTime<Utc>,
}

impl PipelineEntry {
    pub fn new(case: CaseRecord, score: f64, at: DateTime<Utc>) -> Self {
        Self {
            case,
            stage: Stage::ParkingLot,
            score,
            date_entered: at,
            stage_changed_at: at,
        }
    }

    pub fn case_id(&self) -> &str {
        self.case.id()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionRejection {
    #[error("{0} is the final stage")]
    Terminal(Stage),
    #[error("case is not in the pipeline")]
    NotInPipeline,
    #[error("entry is stale: expected {expected}, pipeline holds it in {actual}")]
    StaleEntry { expected: Stage, actual: Stage },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("invalid transition for case {case_id}: {reason}")]
    InvalidTransition {
        case_id: String,
        reason: TransitionRejection,
    },
}

impl PipelineError {
    pub fn invalid(case_id: impl Into<String>, reason: TransitionRejection) -> Self {
        Self::InvalidTransition {
            case_id: case_id.into(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::pipeline::{PipelineError, Stage, TransitionRejection};

    #[test]
    fn stages_only_move_forward() {
        assert_eq!(Stage::ParkingLot.next(), Some(Stage::Backlog));
        assert_eq!(Stage::Backlog.next(), Some(Stage::Roadmap));
        assert_eq!(Stage::Roadmap.next(), None);
        assert!(Stage::Roadmap.is_terminal());
        for stage in Stage::ALL {
            if let Some(next) = stage.next() {
                assert!(next > stage);
            }
        }
    }

    #[test]
    fn parses_stage_names() {
        assert_eq!(Stage::from_str("Parking Lot").unwrap(), Stage::ParkingLot);
        assert_eq!(Stage::from_str("parking-lot").unwrap(), Stage::ParkingLot);
        assert_eq!(Stage::from_str("ROADMAP").unwrap(), Stage::Roadmap);
        assert!(Stage::from_str("done").is_err());
        for stage in Stage::ALL {
            assert_eq!(Stage::from_str(stage.as_slug()).unwrap(), stage);
        }
    }

    #[test]
    fn error_message_names_case_and_reason() {
        let err = PipelineError::invalid("bc-1", TransitionRejection::Terminal(Stage::Roadmap));
        assert_eq!(
            err.to_string(),
            "invalid transition for case bc-1: Roadmap is the final stage"
        );
    }
}
