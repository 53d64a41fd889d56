//! Business-case scoring, current/target gap analysis and a three-stage
//! promotion pipeline (Parking Lot, Backlog, Roadmap).
//!
//! Scoring is pure; the pipeline lives in a [`pipeline::PipelineStore`] owned
//! by the caller.

pub mod case;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod scoring;

pub use case::{CaseRecord, FieldKey, OperatingField};
pub use pipeline::{
    PipelineEntry, PipelineError, PipelinePromoter, PipelineStore, PromotionOutcome, Stage,
};
pub use scoring::{GapReport, ScoreResult, ScoreWeights, ScoringEngine};
