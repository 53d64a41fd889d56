use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::{PipelineEntry, PipelineError, Stage, TransitionRejection};

/// Owner of every pipeline entry, one ordered lane per stage. A case id
/// appears in at most one lane. The host decides how long a store lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineStore {
    #[serde(default)]
    parking_lot: Vec<PipelineEntry>,
    #[serde(default)]
    backlog: Vec<PipelineEntry>,
    #[serde(default)]
    roadmap: Vec<PipelineEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSummary {
    pub parking_lot: usize,
    pub backlog: usize,
    pub roadmap: usize,
    pub mean_score: Option<f64>,
}

impl PipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a saved session, or an empty store when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed reading pipeline state: {}", path.display()))?;
        let store: Self = serde_json::from_str(&data)
            .with_context(|| format!("failed parsing pipeline state: {}", path.display()))?;
        store
            .check_lanes()
            .with_context(|| format!("inconsistent pipeline state: {}", path.display()))?;
        Ok(store)
    }

    /// Every entry sits in the lane of its own stage and no case id is
    /// tracked twice.
    fn check_lanes(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for stage in Stage::ALL {
            for entry in self.entries(stage) {
                if entry.stage != stage {
                    bail!(
                        "case {} is marked {} but stored in {}",
                        entry.case_id(),
                        entry.stage,
                        stage
                    );
                }
                if !seen.insert(entry.case_id()) {
                    bail!("case {} appears more than once", entry.case_id());
                }
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating state directory: {}", parent.display())
            })?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)
            .with_context(|| format!("failed writing pipeline state: {}", path.display()))
    }

    pub fn entries(&self, stage: Stage) -> &[PipelineEntry] {
        match stage {
            Stage::ParkingLot => &self.parking_lot,
            Stage::Backlog => &self.backlog,
            Stage::Roadmap => &self.roadmap,
        }
    }

    fn lane_mut(&mut self, stage: Stage) -> &mut Vec<PipelineEntry> {
        match stage {
            Stage::ParkingLot => &mut self.parking_lot,
            Stage::Backlog => &mut self.backlog,
            Stage::Roadmap => &mut self.roadmap,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineEntry> {
        Stage::ALL.into_iter().flat_map(|stage| self.entries(stage).iter())
    }

    pub fn get(&self, case_id: &str) -> Option<&PipelineEntry> {
        self.iter().find(|entry| entry.case_id() == case_id)
    }

    pub fn contains(&self, case_id: &str) -> bool {
        self.get(case_id).is_some()
    }

    pub fn stage_of(&self, case_id: &str) -> Option<Stage> {
        self.get(case_id).map(|entry| entry.stage)
    }

    pub fn len(&self) -> usize {
        Stage::ALL.iter().map(|stage| self.entries(*stage).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a new Parking Lot entry. Returns `false`, leaving the store
    /// unchanged, when the case is already tracked.
    pub(crate) fn insert(&mut self, entry: PipelineEntry) -> bool {
        if self.contains(entry.case_id()) {
            return false;
        }
        let stage = entry.stage;
        self.lane_mut(stage).push(entry);
        true
    }

    /// Moves a case one stage forward, appending it to the next lane.
    pub fn advance(&mut self, case_id: &str) -> Result<PipelineEntry, PipelineError> {
        self.advance_at(case_id, Utc::now())
    }

    pub fn advance_at(
        &mut self,
        case_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PipelineEntry, PipelineError> {
        let stage = self
            .stage_of(case_id)
            .ok_or_else(|| PipelineError::invalid(case_id, TransitionRejection::NotInPipeline))?;
        let next = stage
            .next()
            .ok_or_else(|| PipelineError::invalid(case_id, TransitionRejection::Terminal(stage)))?;

        let lane = self.lane_mut(stage);
        let Some(pos) = lane.iter().position(|entry| entry.case_id() == case_id) else {
            return Err(PipelineError::invalid(
                case_id,
                TransitionRejection::NotInPipeline,
            ));
        };
        let mut entry = lane.remove(pos);
        entry.stage = next;
        entry.stage_changed_at = at;
        self.lane_mut(next).push(entry.clone());
        Ok(entry)
    }

    /// Like [`PipelineStore::advance`], but rejects a snapshot whose stage no
    /// longer matches the stored entry.
    pub fn advance_entry(&mut self, entry: &PipelineEntry) -> Result<PipelineEntry, PipelineError> {
        let case_id = entry.case_id();
        let actual = self
            .stage_of(case_id)
            .ok_or_else(|| PipelineError::invalid(case_id, TransitionRejection::NotInPipeline))?;
        if actual != entry.stage {
            return Err(PipelineError::invalid(
                case_id,
                TransitionRejection::StaleEntry {
                    expected: entry.stage,
                    actual,
                },
            ));
        }
        self.advance(case_id)
    }

    pub fn remove(&mut self, case_id: &str) -> Option<PipelineEntry> {
        let stage = self.stage_of(case_id)?;
        let lane = self.lane_mut(stage);
        let pos = lane.iter().position(|entry| entry.case_id() == case_id)?;
        Some(lane.remove(pos))
    }

    pub fn summary(&self) -> PipelineSummary {
        let total = self.len();
        let mean_score = if total > 0 {
            Some(self.iter().map(|entry| entry.score).sum::<f64>() / total as f64)
        } else {
            None
        };
        PipelineSummary {
            parking_lot: self.parking_lot.len(),
            backlog: self.backlog.len(),
            roadmap: self.roadmap.len(),
            mean_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::case::CaseRecord;
    use crate::pipeline::store::PipelineStore;
    use crate::pipeline::{PipelineEntry, PipelineError, Stage, TransitionRejection};

    fn entry(id: &str, score: f64) -> PipelineEntry {
        PipelineEntry::new(CaseRecord::new(id, format!("Case {id}")), score, Utc::now())
    }

    #[test]
    fn insert_dedups_by_case_id() {
        let mut store = PipelineStore::new();
        assert!(store.insert(entry("a", 80.0)));
        assert!(!store.insert(entry("a", 95.0)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().score, 80.0);
    }

    #[test]
    fn advances_through_every_stage_then_rejects() {
        let mut store = PipelineStore::new();
        store.insert(entry("a", 80.0));
        let later = Utc::now() + Duration::hours(1);

        let moved = store.advance_at("a", later).unwrap();
        assert_eq!(moved.stage, Stage::Backlog);
        assert_eq!(moved.stage_changed_at, later);
        assert!(moved.date_entered < later);
        assert!(store.entries(Stage::ParkingLot).is_empty());
        assert_eq!(store.entries(Stage::Backlog).len(), 1);

        assert_eq!(store.advance("a").unwrap().stage, Stage::Roadmap);
        let err = store.advance("a").unwrap_err();
        assert_eq!(
            err,
            PipelineError::invalid("a", TransitionRejection::Terminal(Stage::Roadmap))
        );
        assert_eq!(store.stage_of("a"), Some(Stage::Roadmap));
    }

    #[test]
    fn advancing_unknown_case_is_rejected() {
        let mut store = PipelineStore::new();
        let err = store.advance("ghost").unwrap_err();
        assert_eq!(
            err,
            PipelineError::invalid("ghost", TransitionRejection::NotInPipeline)
        );
    }

    #[test]
    fn stale_snapshots_are_rejected() {
        let mut store = PipelineStore::new();
        store.insert(entry("a", 80.0));
        let snapshot = store.get("a").unwrap().clone();
        store.advance_entry(&snapshot).unwrap();

        let err = store.advance_entry(&snapshot).unwrap_err();
        assert_eq!(
            err,
            PipelineError::invalid(
                "a",
                TransitionRejection::StaleEntry {
                    expected: Stage::ParkingLot,
                    actual: Stage::Backlog,
                }
            )
        );
        assert_eq!(store.stage_of("a"), Some(Stage::Backlog));

        let foreign = entry("b", 90.0);
        assert!(store.advance_entry(&foreign).is_err());
    }

    #[test]
    fn lanes_keep_arrival_order() {
        let mut store = PipelineStore::new();
        store.insert(entry("a", 71.0));
        store.insert(entry("b", 72.0));
        store.insert(entry("c", 73.0));
        store.advance("c").unwrap();
        store.advance("a").unwrap();
        let backlog: Vec<&str> = store
            .entries(Stage::Backlog)
            .iter()
            .map(|e| e.case_id())
            .collect();
        assert_eq!(backlog, vec!["c", "a"]);
    }

    #[test]
    fn removal_is_explicit() {
        let mut store = PipelineStore::new();
        store.insert(entry("a", 80.0));
        assert!(store.remove("missing").is_none());
        let removed = store.remove("a").unwrap();
        assert_eq!(removed.case_id(), "a");
        assert!(store.is_empty());
        assert!(store.insert(entry("a", 75.0)));
    }

    #[test]
    fn summarizes_lanes() {
        let mut store = PipelineStore::new();
        assert_eq!(store.summary().mean_score, None);
        store.insert(entry("a", 80.0));
        store.insert(entry("b", 90.0));
        store.advance("b").unwrap();
        let summary = store.summary();
        assert_eq!(summary.parking_lot, 1);
        assert_eq!(summary.backlog, 1);
        assert_eq!(summary.roadmap, 0);
        assert_eq!(summary.mean_score, Some(85.0));
    }

    #[test]
    fn saves_and_loads_session_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/pipeline.json");
        assert!(PipelineStore::load(&path).unwrap().is_empty());

        let mut store = PipelineStore::new();
        store.insert(entry("a", 80.0));
        store.insert(entry("b", 90.0));
        store.advance("b").unwrap();
        store.save(&path).unwrap();

        let loaded = PipelineStore::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.stage_of("b"), Some(Stage::Backlog));
    }

    #[test]
    fn corrupt_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(PipelineStore::load(&path).is_err());
    }

    #[test]
    fn duplicate_case_across_lanes_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let mut promoted = entry("a", 80.0);
        promoted.stage = Stage::Backlog;
        let store = PipelineStore {
            parking_lot: vec![entry("a", 80.0)],
            backlog: vec![promoted],
            roadmap: Vec::new(),
        };
        store.save(&path).unwrap();

        let err = PipelineStore::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("case a appears more than once"));
    }

    #[test]
    fn entry_in_wrong_lane_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let mut misplaced = entry("a", 80.0);
        misplaced.stage = Stage::Backlog;
        let store = PipelineStore {
            parking_lot: vec![misplaced],
            backlog: Vec::new(),
            roadmap: Vec::new(),
        };
        store.save(&path).unwrap();

        let err = PipelineStore::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("case a is marked Backlog but stored in Parking Lot"));
    }
}
