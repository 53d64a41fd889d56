use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::case::CaseRecord;
use crate::pipeline::{PipelineEntry, PipelineError, PipelineStore, Stage};
use crate::scoring::{ScoreResult, ScoringEngine};

pub const DEFAULT_PROMOTION_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "stage")]
pub enum PromotionOutcome {
    Promoted,
    /// The case already has an entry; nothing changed.
    AlreadyTracked(Stage),
    BelowThreshold,
}

impl PromotionOutcome {
    pub fn qualified(&self) -> bool {
        !matches!(self, Self::BelowThreshold)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub case_id: String,
    pub title: String,
    pub overall: f64,
    pub outcome: PromotionOutcome,
}

/// Drives cases into the pipeline on score and forward on explicit request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelinePromoter {
    threshold: f64,
}

impl PipelinePromoter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn qualifies(&self, result: &ScoreResult) -> bool {
        result.overall >= self.threshold
    }

    /// Parks a qualifying case that is not yet tracked. A score below the
    /// threshold never touches an existing entry.
    pub fn evaluate(
        &self,
        store: &mut PipelineStore,
        case: &CaseRecord,
        result: &ScoreResult,
    ) -> PromotionOutcome {
        if !self.qualifies(result) {
            return PromotionOutcome::BelowThreshold;
        }
        if let Some(stage) = store.stage_of(case.id()) {
            return PromotionOutcome::AlreadyTracked(stage);
        }
        let entry = PipelineEntry::new(case.clone(), result.overall, Utc::now());
        store.insert(entry);
        info!(
            case_id = case.id(),
            score = result.overall,
            "case promoted to {}",
            Stage::ParkingLot
        );
        PromotionOutcome::Promoted
    }

    pub fn evaluate_for_parking_lot(
        &self,
        store: &mut PipelineStore,
        case: &CaseRecord,
        result: &ScoreResult,
    ) -> bool {
        self.evaluate(store, case, result).qualified()
    }

    /// Scores and evaluates a batch in input order.
    pub fn evaluate_all(
        &self,
        store: &mut PipelineStore,
        engine: &ScoringEngine,
        cases: &[CaseRecord],
    ) -> Vec<PromotionRecord> {
        cases
            .iter()
            .map(|case| {
                let result = engine.score(case);
                PromotionRecord {
                    case_id: case.id().to_string(),
                    title: case.title.clone(),
                    overall: result.overall,
                    outcome: self.evaluate(store, case, &result),
                }
            })
            .collect()
    }

    pub fn advance(
        &self,
        store: &mut PipelineStore,
        case_id: &str,
    ) -> Result<PipelineEntry, PipelineError> {
        let entry = store.advance(case_id)?;
        info!(case_id, "case advanced to {}", entry.stage);
        Ok(entry)
    }

    pub fn advance_entry(
        &self,
        store: &mut PipelineStore,
        entry: &PipelineEntry,
    ) -> Result<PipelineEntry, PipelineError> {
        let moved = store.advance_entry(entry)?;
        info!(case_id = moved.case_id(), "case advanced to {}", moved.stage);
        Ok(moved)
    }

    pub fn remove(&self, store: &mut PipelineStore, case_id: &str) -> Option<PipelineEntry> {
        let removed = store.remove(case_id)?;
        info!(case_id, "case removed from {}", removed.stage);
        Some(removed)
    }
}

impl Default for PipelinePromoter {
    fn default() -> Self {
        Self::new(DEFAULT_PROMOTION_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::case::CaseRecord;
    use crate::pipeline::promoter::{PipelinePromoter, PromotionOutcome};
    use crate::pipeline::{PipelineError, PipelineStore, Stage, TransitionRejection};
    use crate::scoring::{ScoreResult, ScoringEngine};

    fn result(overall: f64) -> ScoreResult {
        ScoreResult {
            financial: 0.0,
            strategic: 0.0,
            feasibility: 0.0,
            impact: 0.0,
            resource: 0.0,
            overall,
        }
    }

    #[test]
    fn promotes_once_and_stays_idempotent() {
        let promoter = PipelinePromoter::default();
        let mut store = PipelineStore::new();
        let case = CaseRecord::new("bc-1", "Qualifier");

        assert!(promoter.evaluate_for_parking_lot(&mut store, &case, &result(84.4)));
        assert!(promoter.evaluate_for_parking_lot(&mut store, &case, &result(84.4)));
        assert_eq!(store.len(), 1);

        let entry = store.get("bc-1").unwrap();
        assert_eq!(entry.stage, Stage::ParkingLot);
        assert_eq!(entry.score, 84.4);
        assert!(entry.date_entered <= Utc::now());
        assert_eq!(
            promoter.evaluate(&mut store, &case, &result(90.0)),
            PromotionOutcome::AlreadyTracked(Stage::ParkingLot)
        );
        assert_eq!(store.get("bc-1").unwrap().score, 84.4);
    }

    #[test]
    fn threshold_is_inclusive_and_misses_are_not_errors() {
        let promoter = PipelinePromoter::default();
        let mut store = PipelineStore::new();
        let edge = CaseRecord::new("edge", "Edge");
        let low = CaseRecord::new("low", "Low");

        assert_eq!(
            promoter.evaluate(&mut store, &edge, &result(70.0)),
            PromotionOutcome::Promoted
        );
        assert!(!promoter.evaluate_for_parking_lot(&mut store, &low, &result(69.99)));
        assert!(!store.contains("low"));
    }

    #[test]
    fn low_rescore_never_regresses_tracked_case() {
        let promoter = PipelinePromoter::new(60.0);
        let mut store = PipelineStore::new();
        let case = CaseRecord::new("bc-2", "Fading");
        promoter.evaluate(&mut store, &case, &result(65.0));
        promoter.advance(&mut store, "bc-2").unwrap();

        assert_eq!(
            promoter.evaluate(&mut store, &case, &result(10.0)),
            PromotionOutcome::BelowThreshold
        );
        assert_eq!(store.stage_of("bc-2"), Some(Stage::Backlog));
    }

    #[test]
    fn advancing_roadmap_entry_is_invalid() {
        let promoter = PipelinePromoter::default();
        let mut store = PipelineStore::new();
        let case = CaseRecord::new("bc-3", "Finisher");
        promoter.evaluate(&mut store, &case, &result(99.0));
        promoter.advance(&mut store, "bc-3").unwrap();
        let roadmap = promoter.advance(&mut store, "bc-3").unwrap();
        assert_eq!(roadmap.stage, Stage::Roadmap);

        let err = promoter.advance_entry(&mut store, &roadmap).unwrap_err();
        assert_eq!(
            err,
            PipelineError::invalid("bc-3", TransitionRejection::Terminal(Stage::Roadmap))
        );
    }

    #[test]
    fn removal_allows_fresh_promotion() {
        let promoter = PipelinePromoter::default();
        let mut store = PipelineStore::new();
        let case = CaseRecord::new("bc-4", "Recycled");
        promoter.evaluate(&mut store, &case, &result(75.0));
        promoter.advance(&mut store, "bc-4").unwrap();

        assert!(promoter.remove(&mut store, "bc-4").is_some());
        assert!(promoter.remove(&mut store, "bc-4").is_none());
        assert_eq!(
            promoter.evaluate(&mut store, &case, &result(75.0)),
            PromotionOutcome::Promoted
        );
        assert_eq!(store.stage_of("bc-4"), Some(Stage::ParkingLot));
    }

    #[test]
    fn evaluates_batches_in_order() {
        let promoter = PipelinePromoter::new(30.0);
        let mut store = PipelineStore::new();
        let cases = vec![
            CaseRecord::new("a", "Neutral"),
            CaseRecord::builder("b", "Risky")
                .technology_complexity(10.0)
                .implementation_risk(10.0)
                .strategic_alignment(0.0)
                .client_impact(0.0)
                .build(),
            CaseRecord::new("a", "Neutral again"),
        ];
        let records = promoter.evaluate_all(&mut store, &ScoringEngine::default(), &cases);
        let outcomes: Vec<PromotionOutcome> = records.iter().map(|r| r.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                PromotionOutcome::Promoted,
                PromotionOutcome::BelowThreshold,
                PromotionOutcome::AlreadyTracked(Stage::ParkingLot),
            ]
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn outcome_serializes_with_stage() {
        let json = serde_json::to_value(PromotionOutcome::AlreadyTracked(Stage::Backlog)).unwrap();
        assert_eq!(json["outcome"], "already_tracked");
        assert_eq!(json["stage"], "backlog");
    }
}
