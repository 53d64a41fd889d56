use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::case::{CaseRecord, FieldKey};
use crate::scoring::{ScoreResult, ScoringEngine, SubScore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: FieldKey,
    pub from: f64,
    pub to: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub case_id: String,
    pub changes_applied: Vec<FieldChange>,
    pub before: ScoreResult,
    pub after: ScoreResult,
    pub overall_change: f64,
    pub qualified_before: bool,
    pub qualified_after: bool,
}

impl WhatIfResult {
    pub fn sub_score_changes(&self) -> BTreeMap<SubScore, f64> {
        SubScore::ALL
            .iter()
            .map(|sub| (*sub, self.after.sub_score(*sub) - self.before.sub_score(*sub)))
            .collect()
    }

    pub fn gains_qualification(&self) -> bool {
        !self.qualified_before && self.qualified_after
    }

    pub fn loses_qualification(&self) -> bool {
        self.qualified_before && !self.qualified_after
    }
}

/// Re-scores `case` with `changes` applied in order. The input case is left
/// untouched; later changes to the same field win.
pub fn simulate_whatif(
    engine: &ScoringEngine,
    case: &CaseRecord,
    changes: &[(FieldKey, f64)],
    threshold: f64,
) -> WhatIfResult {
    let before = engine.score(case);

    let mut changed = case.clone();
    let mut changes_applied = Vec::with_capacity(changes.len());
    for (field, to) in changes {
        let from = changed.field_value(*field);
        changed.apply_change(*field, *to);
        changes_applied.push(FieldChange {
            field: *field,
            from,
            to: *to,
        });
    }

    let after = engine.score(&changed);
    WhatIfResult {
        case_id: case.id().to_string(),
        changes_applied,
        overall_change: after.overall - before.overall,
        qualified_before: before.overall >= threshold,
        qualified_after: after.overall >= threshold,
        before,
        after,
    }
}
