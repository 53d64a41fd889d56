use anyhow::Result;

use crate::pipeline::{PipelineStore, PromotionOutcome, PromotionRecord, Stage};
use crate::scoring::ranking::{CaseScore, RankedCase};
use crate::scoring::whatif::WhatIfResult;
use crate::scoring::{CaseGaps, SubScore};

pub fn scores_to_csv(scores: &[CaseScore]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "case_id",
        "title",
        "financial",
        "strategic",
        "feasibility",
        "impact",
        "resource",
        "overall",
        "band",
        "qualifies",
    ])?;
    for s in scores {
        writer.write_record(score_fields(s))?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn ranking_to_csv(ranked: &[RankedCase]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "rank",
        "case_id",
        "title",
        "financial",
        "strategic",
        "feasibility",
        "impact",
        "resource",
        "overall",
        "band",
        "qualifies",
    ])?;
    for r in ranked {
        let mut record = vec![r.rank.to_string()];
        record.extend(score_fields(&r.case));
        writer.write_record(record)?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn gaps_to_csv(reports: &[CaseGaps]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "case_id",
        "dimension",
        "current",
        "target",
        "gap",
        "improvement_percent",
    ])?;
    for report in reports {
        for (field, gap) in report.gaps.iter() {
            writer.write_record([
                report.case_id.clone(),
                field.as_slug().to_string(),
                format!("{:.4}", gap.current),
                format!("{:.4}", gap.target),
                format!("{:.4}", gap.gap),
                format!("{:.2}", gap.improvement_percent),
            ])?;
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn pipeline_to_csv(store: &PipelineStore, stages: &[Stage]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "stage",
        "case_id",
        "title",
        "score",
        "date_entered",
        "stage_changed_at",
    ])?;
    for stage in stages {
        for entry in store.entries(*stage) {
            writer.write_record([
                stage.as_slug().to_string(),
                entry.case_id().to_string(),
                entry.case.title.clone(),
                format!("{:.2}", entry.score),
                entry.date_entered.to_rfc3339(),
                entry.stage_changed_at.to_rfc3339(),
            ])?;
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn promotions_to_csv(records: &[PromotionRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["case_id", "title", "overall", "outcome", "stage"])?;
    for record in records {
        let (outcome, stage) = match record.outcome {
            PromotionOutcome::Promoted => ("promoted", Stage::ParkingLot.as_slug()),
            PromotionOutcome::AlreadyTracked(stage) => ("already_tracked", stage.as_slug()),
            PromotionOutcome::BelowThreshold => ("below_threshold", ""),
        };
        writer.write_record([
            record.case_id.as_str(),
            record.title.as_str(),
            &format!("{:.2}", record.overall),
            outcome,
            stage,
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// One row per sub-score plus an `overall` row.
pub fn whatif_to_csv(result: &WhatIfResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "case_id",
        "score",
        "before",
        "after",
        "change",
        "qualified_before",
        "qualified_after",
    ])?;
    let qualified_before = result.qualified_before.to_string();
    let qualified_after = result.qualified_after.to_string();
    let changes = result.sub_score_changes();
    for sub in SubScore::ALL {
        writer.write_record([
            result.case_id.as_str(),
            &sub.to_string().to_ascii_lowercase(),
            &format!("{:.4}", result.before.sub_score(sub)),
            &format!("{:.4}", result.after.sub_score(sub)),
            &format!("{:.4}", changes.get(&sub).copied().unwrap_or(0.0)),
            &qualified_before,
            &qualified_after,
        ])?;
    }
    writer.write_record([
        result.case_id.as_str(),
        "overall",
        &format!("{:.2}", result.before.overall),
        &format!("{:.2}", result.after.overall),
        &format!("{:.2}", result.overall_change),
        &qualified_before,
        &qualified_after,
    ])?;
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

fn score_fields(s: &CaseScore) -> Vec<String> {
    vec![
        s.case_id.clone(),
        s.title.clone(),
        format!("{:.4}", s.score.financial),
        format!("{:.4}", s.score.strategic),
        format!("{:.4}", s.score.feasibility),
        format!("{:.4}", s.score.impact),
        format!("{:.4}", s.score.resource),
        format!("{:.2}", s.score.overall),
        s.band.to_string(),
        s.qualifies.to_string(),
    ]
}
