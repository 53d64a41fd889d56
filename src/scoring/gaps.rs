use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::case::{CaseRecord, OperatingField};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DimensionGap {
    pub current: f64,
    pub target: f64,
    /// Positive means improvement is planned, whichever direction that is.
    pub gap: f64,
    pub improvement_percent: f64,
}

impl DimensionGap {
    pub fn new(field: OperatingField, current: f64, target: f64) -> Self {
        let gap = if field.is_inverted() {
            current - target
        } else {
            target - current
        };
        let improvement_percent = if current == 0.0 {
            0.0
        } else {
            gap / current * 100.0
        };
        Self {
            current,
            target,
            gap,
            improvement_percent,
        }
    }

    pub fn is_improvement(&self) -> bool {
        self.gap > 0.0
    }
}

/// Current-vs-target analysis keyed by operating dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct GapReport {
    dimensions: BTreeMap<OperatingField, DimensionGap>,
}

impl GapReport {
    pub fn get(&self, field: OperatingField) -> Option<&DimensionGap> {
        self.dimensions.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OperatingField, &DimensionGap)> {
        self.dimensions.iter()
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Dimensions where the target is worse than the current state.
    pub fn regressions(&self) -> Vec<OperatingField> {
        self.dimensions
            .iter()
            .filter(|(_, gap)| gap.gap < 0.0)
            .map(|(field, _)| *field)
            .collect()
    }
}

/// Gap report tagged with the case it was computed for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseGaps {
    pub case_id: String,
    pub title: String,
    pub gaps: GapReport,
}

impl CaseGaps {
    pub fn for_case(case: &CaseRecord) -> Self {
        Self {
            case_id: case.id().to_string(),
            title: case.title.clone(),
            gaps: compute_gaps(case),
        }
    }
}

pub fn compute_gaps(case: &CaseRecord) -> GapReport {
    let dimensions = OperatingField::ALL
        .iter()
        .map(|field| {
            let gap = DimensionGap::new(*field, case.current.get(*field), case.target.get(*field));
            (*field, gap)
        })
        .collect();
    GapReport { dimensions }
}
