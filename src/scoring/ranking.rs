use serde::{Deserialize, Serialize};

use crate::case::CaseRecord;
use crate::scoring::{ScoreBand, ScoreResult, ScoringEngine};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseScore {
    pub case_id: String,
    pub title: String,
    pub score: ScoreResult,
    pub band: ScoreBand,
    pub qualifies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCase {
    pub rank: usize,
    #[serde(flatten)]
    pub case: CaseScore,
}

/// Scores cases in input order.
pub fn score_cases(engine: &ScoringEngine, cases: &[CaseRecord], threshold: f64) -> Vec<CaseScore> {
    cases
        .iter()
        .map(|case| {
            let score = engine.score(case);
            CaseScore {
                case_id: case.id().to_string(),
                title: case.title.clone(),
                band: score.band(),
                qualifies: score.overall >= threshold,
                score,
            }
        })
        .collect()
}

/// Scores every case and orders them best first; ties keep id order.
pub fn rank_cases(engine: &ScoringEngine, cases: &[CaseRecord], threshold: f64) -> Vec<RankedCase> {
    let mut scored = score_cases(engine, cases, threshold);
    scored.sort_by(|a, b| {
        b.score
            .overall
            .total_cmp(&a.score.overall)
            .then_with(|| a.case_id.cmp(&b.case_id))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(idx, case)| RankedCase {
            rank: idx + 1,
            case,
        })
        .collect()
}

pub fn summarize_ranking(ranked: &[RankedCase]) -> String {
    if ranked.is_empty() {
        return "No cases scored.".to_string();
    }
    let qualifying = ranked.iter().filter(|r| r.case.qualifies).count();
    let mean = ranked.iter().map(|r| r.case.score.overall).sum::<f64>() / ranked.len() as f64;
    format!(
        "Qualifying: {qualifying}/{} ({:.1}%), mean score {mean:.1}",
        ranked.len(),
        (qualifying as f64 / ranked.len() as f64) * 100.0
    )
}
