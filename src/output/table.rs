use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::pipeline::{PipelineStore, PromotionOutcome, PromotionRecord, Stage};
use crate::scoring::ranking::{CaseScore, RankedCase};
use crate::scoring::whatif::WhatIfResult;
use crate::scoring::{CaseGaps, ScoreBand, SubScore};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn band_cell(band: ScoreBand) -> Cell {
    let color = match band {
        ScoreBand::Strong => Color::Green,
        ScoreBand::Moderate => Color::Yellow,
        ScoreBand::Weak => Color::Red,
    };
    Cell::new(band.to_string()).fg(color)
}

fn score_cells(s: &CaseScore) -> Vec<Cell> {
    vec![
        Cell::new(&s.case_id),
        Cell::new(&s.title),
        Cell::new(format!("{:.2}", s.score.financial)),
        Cell::new(format!("{:.2}", s.score.strategic)),
        Cell::new(format!("{:.2}", s.score.feasibility)),
        Cell::new(format!("{:.2}", s.score.impact)),
        Cell::new(format!("{:.2}", s.score.resource)),
        Cell::new(format!("{:.1}", s.score.overall)),
        band_cell(s.band),
        Cell::new(if s.qualifies { "YES" } else { "NO" }),
    ]
}

const SCORE_HEADER: [&str; 10] = [
    "Case",
    "Title",
    "Financial",
    "Strategic",
    "Feasibility",
    "Impact",
    "Resource",
    "Overall",
    "Band",
    "Qualifies",
];

pub fn render_scores_table(scores: &[CaseScore]) -> String {
    let mut table = new_table();
    table.set_header(SCORE_HEADER.to_vec());
    for s in scores {
        table.add_row(Row::from(score_cells(s)));
    }
    table.to_string()
}

pub fn render_ranking_table(ranked: &[RankedCase]) -> String {
    let mut table = new_table();
    let mut header = vec!["Rank"];
    header.extend(SCORE_HEADER);
    table.set_header(header);
    for r in ranked {
        let mut cells = vec![Cell::new(r.rank)];
        cells.extend(score_cells(&r.case));
        table.add_row(Row::from(cells));
    }
    table.to_string()
}

pub fn render_gaps_table(reports: &[CaseGaps]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Case",
        "Dimension",
        "Current",
        "Target",
        "Gap",
        "Improvement",
    ]);
    for report in reports {
        for (field, gap) in report.gaps.iter() {
            let gap_cell = if gap.gap < 0.0 {
                Cell::new(format!("{:.2}", gap.gap)).fg(Color::Red)
            } else {
                Cell::new(format!("{:.2}", gap.gap))
            };
            table.add_row(Row::from(vec![
                Cell::new(&report.case_id),
                Cell::new(field.to_string()),
                Cell::new(format!("{:.2}", gap.current)),
                Cell::new(format!("{:.2}", gap.target)),
                gap_cell,
                Cell::new(format!("{:.1}%", gap.improvement_percent)),
            ]));
        }
    }
    table.to_string()
}

pub fn render_whatif_table(result: &WhatIfResult) -> String {
    let mut table = new_table();
    table.set_header(vec!["Score", "Before", "After", "Change"]);
    let changes = result.sub_score_changes();
    for sub in SubScore::ALL {
        table.add_row(vec![
            sub.to_string(),
            format!("{:.2}", result.before.sub_score(sub)),
            format!("{:.2}", result.after.sub_score(sub)),
            format!("{:+.2}", changes.get(&sub).copied().unwrap_or(0.0)),
        ]);
    }
    table.add_row(vec![
        "Overall".to_string(),
        format!("{:.1}", result.before.overall),
        format!("{:.1}", result.after.overall),
        format!("{:+.1}", result.overall_change),
    ]);

    let applied = result
        .changes_applied
        .iter()
        .map(|c| format!("{} {} -> {}", c.field, c.from, c.to))
        .collect::<Vec<_>>()
        .join(", ");
    let mut out = table.to_string();
    out.push_str(&format!(
        "\nCase {}: {applied}\nQualifies before: {}, after: {}",
        result.case_id, result.qualified_before, result.qualified_after
    ));
    out
}

pub fn render_promotions_table(records: &[PromotionRecord]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Case", "Title", "Overall", "Outcome"]);
    for record in records {
        let outcome = match record.outcome {
            PromotionOutcome::Promoted => {
                Cell::new(format!("Promoted to {}", Stage::ParkingLot)).fg(Color::Green)
            }
            PromotionOutcome::AlreadyTracked(stage) => Cell::new(format!("Already in {stage}")),
            PromotionOutcome::BelowThreshold => Cell::new("Below threshold").fg(Color::Red),
        };
        table.add_row(Row::from(vec![
            Cell::new(&record.case_id),
            Cell::new(&record.title),
            Cell::new(format!("{:.1}", record.overall)),
            outcome,
        ]));
    }
    table.to_string()
}

/// Kanban view of the selected lanes, followed by counts for every lane.
pub fn render_pipeline_table(store: &PipelineStore, stages: &[Stage]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Stage",
        "Case",
        "Title",
        "Score",
        "Entered",
        "Stage Since",
    ]);
    for stage in stages {
        for entry in store.entries(*stage) {
            table.add_row(vec![
                stage.to_string(),
                entry.case_id().to_string(),
                entry.case.title.clone(),
                format!("{:.1}", entry.score),
                entry.date_entered.format("%Y-%m-%d").to_string(),
                entry.stage_changed_at.format("%Y-%m-%d").to_string(),
            ]);
        }
    }

    let summary = store.summary();
    let mut out = table.to_string();
    out.push_str(&format!(
        "\n{}: {} | {}: {} | {}: {} | mean score: {}",
        Stage::ParkingLot,
        summary.parking_lot,
        Stage::Backlog,
        summary.backlog,
        Stage::Roadmap,
        summary.roadmap,
        summary
            .mean_score
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| "-".to_string())
    ));
    out
}

#[cfg(test)]
mod tests {
    use crate::case::{CaseRecord, FieldKey};
    use crate::output::table::{
        render_pipeline_table, render_promotions_table, render_ranking_table, render_whatif_table,
    };
    use crate::pipeline::{PipelinePromoter, PipelineStore, Stage};
    use crate::scoring::ranking::rank_cases;
    use crate::scoring::whatif::simulate_whatif;
    use crate::scoring::ScoringEngine;

    #[test]
    fn ranking_table_mentions_every_case() {
        let cases = vec![CaseRecord::new("a", "Alpha"), CaseRecord::new("b", "Beta")];
        let rendered = render_ranking_table(&rank_cases(&ScoringEngine::default(), &cases, 70.0));
        assert!(rendered.contains("Alpha"));
        assert!(rendered.contains("Beta"));
    }

    #[test]
    fn whatif_table_lists_applied_changes() {
        let case = CaseRecord::new("a", "Alpha");
        let result = simulate_whatif(
            &ScoringEngine::default(),
            &case,
            &[(FieldKey::RoiPercent, 40.0)],
            70.0,
        );
        let rendered = render_whatif_table(&result);
        assert!(rendered.contains("roi_percent 0 -> 40"));
        assert!(rendered.contains("Overall"));
    }

    #[test]
    fn pipeline_table_shows_stage_counts() {
        let engine = ScoringEngine::default();
        let mut store = PipelineStore::new();
        let case = CaseRecord::new("a", "Alpha");
        PipelinePromoter::new(0.0).evaluate(&mut store, &case, &engine.score(&case));
        let rendered = render_pipeline_table(&store, &Stage::ALL);
        assert!(rendered.contains("Parking Lot: 1 | Backlog: 0 | Roadmap: 0"));
        assert!(rendered.contains("Alpha"));

        let backlog_only = render_pipeline_table(&store, &[Stage::Backlog]);
        assert!(!backlog_only.contains("Alpha"));
    }

    #[test]
    fn promotions_table_describes_outcomes() {
        let engine = ScoringEngine::default();
        let mut store = PipelineStore::new();
        let cases = vec![CaseRecord::new("a", "Alpha"), CaseRecord::new("a", "Alpha")];
        let records = PipelinePromoter::new(0.0).evaluate_all(&mut store, &engine, &cases);
        let rendered = render_promotions_table(&records);
        assert!(rendered.contains("Promoted to Parking Lot"));
        assert!(rendered.contains("Already in Parking Lot"));
    }
}
