use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::pipeline::{PipelineEntry, PipelineStore, Stage};

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Selected lanes keyed by stage slug, in pipeline order.
pub fn render_pipeline_json(store: &PipelineStore, stages: &[Stage]) -> Result<String> {
    let lanes: BTreeMap<Stage, &[PipelineEntry]> = stages
        .iter()
        .map(|stage| (*stage, store.entries(*stage)))
        .collect();
    render_json(&lanes)
}

#[cfg(test)]
mod tests {
    use crate::case::CaseRecord;
    use crate::output::json::render_pipeline_json;
    use crate::pipeline::{PipelinePromoter, PipelineStore, Stage};
    use crate::scoring::ScoringEngine;

    #[test]
    fn pipeline_json_only_holds_selected_lanes() {
        let engine = ScoringEngine::default();
        let mut store = PipelineStore::new();
        let case = CaseRecord::new("a", "Alpha");
        PipelinePromoter::new(0.0).evaluate(&mut store, &case, &engine.score(&case));

        let all: serde_json::Value =
            serde_json::from_str(&render_pipeline_json(&store, &Stage::ALL).unwrap()).unwrap();
        assert_eq!(all["parking_lot"][0]["case"]["id"], "a");
        assert_eq!(all["roadmap"].as_array().unwrap().len(), 0);

        let backlog: serde_json::Value =
            serde_json::from_str(&render_pipeline_json(&store, &[Stage::Backlog]).unwrap())
                .unwrap();
        assert!(backlog.get("parking_lot").is_none());
        assert!(backlog["backlog"].as_array().unwrap().is_empty());
    }
}
