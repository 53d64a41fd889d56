use crate::case::{CaseRecord, OperatingField};
use crate::scoring::gaps::{compute_gaps, GapReport};
use crate::scoring::{ScoreResult, ScoreWeights, SubScore, WeightsError};

/// Pure scorer for business cases. Holds only the validated weights, so it is
/// cheap to copy and safe to share.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoringEngine {
    weights: ScoreWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoreWeights) -> Result<Self, WeightsError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn score(&self, case: &CaseRecord) -> ScoreResult {
        let mut result = ScoreResult {
            financial: financial_score(case),
            strategic: strategic_score(case),
            feasibility: feasibility_score(case),
            impact: impact_score(case),
            resource: resource_score(case),
            overall: 0.0,
        };
        let weighted: f64 = SubScore::ALL
            .iter()
            .map(|sub| result.weighted(*sub, &self.weights))
            .sum();
        result.overall = weighted * 10.0;
        result
    }

    pub fn gaps(&self, case: &CaseRecord) -> GapReport {
        compute_gaps(case)
    }
}

pub fn financial_score(case: &CaseRecord) -> f64 {
    let roi_score = (case.roi_percent / 50.0 * 10.0).min(10.0);
    let payback_score = (10.0 - case.payback_months / 6.0).max(0.0);
    roi_score * 0.6 + payback_score * 0.4
}

pub fn strategic_score(case: &CaseRecord) -> f64 {
    case.strategic_alignment * 0.7 + case.client_impact * 0.3
}

pub fn feasibility_score(case: &CaseRecord) -> f64 {
    let complexity_penalty = (10.0 - case.technology_complexity) / 10.0 * 10.0;
    let risk_penalty = (10.0 - case.implementation_risk) / 10.0 * 10.0;
    complexity_penalty * 0.5 + risk_penalty * 0.5
}

pub fn impact_score(case: &CaseRecord) -> f64 {
    let field = OperatingField::ProcessEfficiency;
    let efficiency_gain = case.target.get(field) - case.current.get(field);
    let field = OperatingField::ErrorRatePercent;
    let error_reduction = (case.current.get(field) - case.target.get(field)).max(0.0);
    (efficiency_gain * 0.6 + error_reduction * 0.4).min(10.0)
}

pub fn resource_score(case: &CaseRecord) -> f64 {
    let fte_efficiency = (case.current.fte_count - case.target.fte_count).max(0.0);
    (fte_efficiency * 2.0).min(10.0)
}
