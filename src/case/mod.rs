pub mod ingest;
pub mod normalize;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default for inputs rated on a 0-10 scale when the source omits them.
pub const NEUTRAL_RATING: f64 = 5.0;

/// Default for amounts, percents, counts and durations.
pub const NEUTRAL_QUANTITY: f64 = 0.0;

/// Operating metric captured both as the current state and the planned target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum OperatingField {
    ProcessEfficiency,
    ErrorRatePercent,
    ClientSatisfaction,
    FteCount,
}

impl OperatingField {
    pub const ALL: [OperatingField; 4] = [
        OperatingField::ProcessEfficiency,
        OperatingField::ErrorRatePercent,
        OperatingField::ClientSatisfaction,
        OperatingField::FteCount,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::ProcessEfficiency => "process_efficiency",
            Self::ErrorRatePercent => "error_rate_percent",
            Self::ClientSatisfaction => "client_satisfaction",
            Self::FteCount => "fte_count",
        }
    }

    /// Reduction is the improvement direction for these metrics.
    pub fn is_inverted(&self) -> bool {
        matches!(self, Self::ErrorRatePercent | Self::FteCount)
    }

    pub fn default_value(&self) -> f64 {
        match self {
            Self::ProcessEfficiency | Self::ClientSatisfaction => NEUTRAL_RATING,
            Self::ErrorRatePercent | Self::FteCount => NEUTRAL_QUANTITY,
        }
    }

    pub fn expected_range(&self) -> (f64, f64) {
        match self {
            Self::ProcessEfficiency | Self::ClientSatisfaction => (0.0, 10.0),
            Self::ErrorRatePercent => (0.0, 100.0),
            Self::FteCount => (0.0, f64::MAX),
        }
    }
}

impl Display for OperatingField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::ProcessEfficiency => "Process Efficiency",
            Self::ErrorRatePercent => "Error Rate (%)",
            Self::ClientSatisfaction => "Client Satisfaction",
            Self::FteCount => "FTE Count",
        };
        write!(f, "{display}")
    }
}

/// One numeric input of a [`CaseRecord`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    InvestmentAmount,
    RoiPercent,
    PaybackMonths,
    StrategicAlignment,
    ClientImpact,
    TechnologyComplexity,
    ImplementationRisk,
    Current(OperatingField),
    Target(OperatingField),
}

impl FieldKey {
    pub const ALL: [FieldKey; 15] = [
        FieldKey::InvestmentAmount,
        FieldKey::RoiPercent,
        FieldKey::PaybackMonths,
        FieldKey::StrategicAlignment,
        FieldKey::ClientImpact,
        FieldKey::TechnologyComplexity,
        FieldKey::ImplementationRisk,
        FieldKey::Current(OperatingField::ProcessEfficiency),
        FieldKey::Target(OperatingField::ProcessEfficiency),
        FieldKey::Current(OperatingField::ErrorRatePercent),
        FieldKey::Target(OperatingField::ErrorRatePercent),
        FieldKey::Current(OperatingField::ClientSatisfaction),
        FieldKey::Target(OperatingField::ClientSatisfaction),
        FieldKey::Current(OperatingField::FteCount),
        FieldKey::Target(OperatingField::FteCount),
    ];

    /// Value used when the field is absent or not numeric.
    pub fn default_value(&self) -> f64 {
        match self {
            Self::StrategicAlignment
            | Self::ClientImpact
            | Self::TechnologyComplexity
            | Self::ImplementationRisk => NEUTRAL_RATING,
            Self::InvestmentAmount | Self::RoiPercent | Self::PaybackMonths => NEUTRAL_QUANTITY,
            Self::Current(field) | Self::Target(field) => field.default_value(),
        }
    }

    /// Documented input range; `None` when any finite value is meaningful.
    pub fn expected_range(&self) -> Option<(f64, f64)> {
        match self {
            Self::StrategicAlignment
            | Self::ClientImpact
            | Self::TechnologyComplexity
            | Self::ImplementationRisk => Some((0.0, 10.0)),
            Self::InvestmentAmount | Self::PaybackMonths => Some((0.0, f64::MAX)),
            Self::RoiPercent => None,
            Self::Current(field) | Self::Target(field) => Some(field.expected_range()),
        }
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvestmentAmount => write!(f, "investment_amount"),
            Self::RoiPercent => write!(f, "roi_percent"),
            Self::PaybackMonths => write!(f, "payback_months"),
            Self::StrategicAlignment => write!(f, "strategic_alignment"),
            Self::ClientImpact => write!(f, "client_impact"),
            Self::TechnologyComplexity => write!(f, "technology_complexity"),
            Self::ImplementationRisk => write!(f, "implementation_risk"),
            Self::Current(field) => write!(f, "current_{}", field.as_slug()),
            Self::Target(field) => write!(f, "target_{}", field.as_slug()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown case field: {0}")]
pub struct FieldKeyParseError(pub String);

impl FromStr for FieldKey {
    type Err = FieldKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize::normalize_key(s);
        if let Some(rest) = normalized.strip_prefix("current_") {
            return parse_operating(rest)
                .map(FieldKey::Current)
                .ok_or_else(|| FieldKeyParseError(s.to_string()));
        }
        if let Some(rest) = normalized.strip_prefix("target_") {
            return parse_operating(rest)
                .map(FieldKey::Target)
                .ok_or_else(|| FieldKeyParseError(s.to_string()));
        }
        let key = match normalized.as_str() {
            "investment_amount" | "investment" | "capex" => FieldKey::InvestmentAmount,
            "roi_percent" | "roi" | "roi_pct" => FieldKey::RoiPercent,
            "payback_months" | "payback" | "payback_period" => FieldKey::PaybackMonths,
            "strategic_alignment" | "alignment" => FieldKey::StrategicAlignment,
            "client_impact" => FieldKey::ClientImpact,
            "technology_complexity" | "tech_complexity" | "complexity" => {
                FieldKey::TechnologyComplexity
            }
            "implementation_risk" | "risk" => FieldKey::ImplementationRisk,
            _ => return Err(FieldKeyParseError(s.to_string())),
        };
        Ok(key)
    }
}

fn parse_operating(raw: &str) -> Option<OperatingField> {
    match raw {
        "process_efficiency" | "efficiency" => Some(OperatingField::ProcessEfficiency),
        "error_rate_percent" | "error_rate" | "error_rate_pct" => {
            Some(OperatingField::ErrorRatePercent)
        }
        "client_satisfaction" | "satisfaction" => Some(OperatingField::ClientSatisfaction),
        "fte_count" | "fte" | "ftes" => Some(OperatingField::FteCount),
        _ => None,
    }
}

/// Operating metrics at one point in time. A case holds one for the current
/// state and one for the target, so every current metric has a target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OperatingState {
    #[serde(default = "default_rating")]
    pub process_efficiency: f64,
    #[serde(default)]
    pub error_rate_percent: f64,
    #[serde(default = "default_rating")]
    pub client_satisfaction: f64,
    #[serde(default)]
    pub fte_count: f64,
}

impl OperatingState {
    pub fn get(&self, field: OperatingField) -> f64 {
        match field {
            OperatingField::ProcessEfficiency => self.process_efficiency,
            OperatingField::ErrorRatePercent => self.error_rate_percent,
            OperatingField::ClientSatisfaction => self.client_satisfaction,
            OperatingField::FteCount => self.fte_count,
        }
    }

    pub fn set(&mut self, field: OperatingField, value: f64) {
        match field {
            OperatingField::ProcessEfficiency => self.process_efficiency = value,
            OperatingField::ErrorRatePercent => self.error_rate_percent = value,
            OperatingField::ClientSatisfaction => self.client_satisfaction = value,
            OperatingField::FteCount => self.fte_count = value,
        }
    }
}

impl Default for OperatingState {
    fn default() -> Self {
        Self {
            process_efficiency: NEUTRAL_RATING,
            error_rate_percent: NEUTRAL_QUANTITY,
            client_satisfaction: NEUTRAL_RATING,
            fte_count: NEUTRAL_QUANTITY,
        }
    }
}

fn default_rating() -> f64 {
    NEUTRAL_RATING
}

/// One business case under evaluation.
///
/// Absent inputs take the lenient defaults described on [`FieldKey::default_value`]:
/// 0-10 ratings sit at the neutral midpoint, everything else at zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseRecord {
    id: String,
    pub title: String,
    #[serde(default)]
    pub investment_amount: f64,
    #[serde(default)]
    pub roi_percent: f64,
    #[serde(default)]
    pub payback_months: f64,
    #[serde(default = "default_rating")]
    pub strategic_alignment: f64,
    #[serde(default = "default_rating")]
    pub client_impact: f64,
    #[serde(default = "default_rating")]
    pub technology_complexity: f64,
    #[serde(default = "default_rating")]
    pub implementation_risk: f64,
    #[serde(default)]
    pub current: OperatingState,
    #[serde(default)]
    pub target: OperatingState,
}

impl CaseRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            investment_amount: NEUTRAL_QUANTITY,
            roi_percent: NEUTRAL_QUANTITY,
            payback_months: NEUTRAL_QUANTITY,
            strategic_alignment: NEUTRAL_RATING,
            client_impact: NEUTRAL_RATING,
            technology_complexity: NEUTRAL_RATING,
            implementation_risk: NEUTRAL_RATING,
            current: OperatingState::default(),
            target: OperatingState::default(),
        }
    }

    pub fn builder(id: impl Into<String>, title: impl Into<String>) -> CaseRecordBuilder {
        CaseRecordBuilder {
            record: Self::new(id, title),
        }
    }

    /// Builds a case from a flat key/value row, defaulting anything missing
    /// or unparseable. Returns `None` when the row has neither id nor title.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Option<Self> {
        normalize::case_from_fields(fields)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn field_value(&self, key: FieldKey) -> f64 {
        match key {
            FieldKey::InvestmentAmount => self.investment_amount,
            FieldKey::RoiPercent => self.roi_percent,
            FieldKey::PaybackMonths => self.payback_months,
            FieldKey::StrategicAlignment => self.strategic_alignment,
            FieldKey::ClientImpact => self.client_impact,
            FieldKey::TechnologyComplexity => self.technology_complexity,
            FieldKey::ImplementationRisk => self.implementation_risk,
            FieldKey::Current(field) => self.current.get(field),
            FieldKey::Target(field) => self.target.get(field),
        }
    }

    pub fn apply_change(&mut self, key: FieldKey, to: f64) {
        match key {
            FieldKey::InvestmentAmount => self.investment_amount = to,
            FieldKey::RoiPercent => self.roi_percent = to,
            FieldKey::PaybackMonths => self.payback_months = to,
            FieldKey::StrategicAlignment => self.strategic_alignment = to,
            FieldKey::ClientImpact => self.client_impact = to,
            FieldKey::TechnologyComplexity => self.technology_complexity = to,
            FieldKey::ImplementationRisk => self.implementation_risk = to,
            FieldKey::Current(field) => self.current.set(field, to),
            FieldKey::Target(field) => self.target.set(field, to),
        }
    }

    /// Fields whose value falls outside the documented range. Values are
    /// reported, never clamped.
    pub fn out_of_range_fields(&self) -> Vec<FieldKey> {
        FieldKey::ALL
            .iter()
            .copied()
            .filter(|key| {
                let Some((min, max)) = key.expected_range() else {
                    return false;
                };
                !(min..=max).contains(&self.field_value(*key))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct CaseRecordBuilder {
    record: CaseRecord,
}

impl CaseRecordBuilder {
    pub fn investment_amount(mut self, value: f64) -> Self {
        self.record.investment_amount = value;
        self
    }

    pub fn roi_percent(mut self, value: f64) -> Self {
        self.record.roi_percent = value;
        self
    }

    pub fn payback_months(mut self, value: f64) -> Self {
        self.record.payback_months = value;
        self
    }

    pub fn strategic_alignment(mut self, value: f64) -> Self {
        self.record.strategic_alignment = value;
        self
    }

    pub fn client_impact(mut self, value: f64) -> Self {
        self.record.client_impact = value;
        self
    }

    pub fn technology_complexity(mut self, value: f64) -> Self {
        self.record.technology_complexity = value;
        self
    }

    pub fn implementation_risk(mut self, value: f64) -> Self {
        self.record.implementation_risk = value;
        self
    }

    pub fn operating(mut self, field: OperatingField, current: f64, target: f64) -> Self {
        self.record.current.set(field, current);
        self.record.target.set(field, target);
        self
    }

    pub fn field(mut self, key: FieldKey, value: f64) -> Self {
        self.record.apply_change(key, value);
        self
    }

    pub fn build(self) -> CaseRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::case::{CaseRecord, FieldKey, OperatingField, NEUTRAL_RATING};

    #[test]
    fn new_case_uses_documented_defaults() {
        let case = CaseRecord::new("c-1", "Empty");
        assert_eq!(case.id(), "c-1");
        assert_eq!(case.strategic_alignment, NEUTRAL_RATING);
        assert_eq!(case.current.process_efficiency, NEUTRAL_RATING);
        assert_eq!(case.target.client_satisfaction, NEUTRAL_RATING);
        assert_eq!(case.roi_percent, 0.0);
        assert_eq!(case.payback_months, 0.0);
        assert_eq!(case.current.fte_count, 0.0);
        assert_eq!(case.target.error_rate_percent, 0.0);
    }

    #[test]
    fn parses_field_keys_with_aliases_and_prefixes() {
        assert_eq!(FieldKey::from_str("ROI").unwrap(), FieldKey::RoiPercent);
        assert_eq!(
            FieldKey::from_str("current.processEfficiency").unwrap(),
            FieldKey::Current(OperatingField::ProcessEfficiency)
        );
        assert_eq!(
            FieldKey::from_str("target-fte").unwrap(),
            FieldKey::Target(OperatingField::FteCount)
        );
        assert!(FieldKey::from_str("current_unknown").is_err());
        assert!(FieldKey::from_str("").is_err());
    }

    #[test]
    fn field_key_display_round_trips_through_parse() {
        for key in FieldKey::ALL {
            assert_eq!(FieldKey::from_str(&key.to_string()).unwrap(), key);
        }
    }

    #[test]
    fn builder_sets_paired_metrics() {
        let case = CaseRecord::builder("c-2", "Paired")
            .operating(OperatingField::ErrorRatePercent, 8.0, 0.5)
            .field(FieldKey::RoiPercent, 42.0)
            .build();
        assert_eq!(case.current.error_rate_percent, 8.0);
        assert_eq!(case.target.error_rate_percent, 0.5);
        assert_eq!(case.field_value(FieldKey::RoiPercent), 42.0);
    }

    #[test]
    fn reports_out_of_range_without_clamping() {
        let case = CaseRecord::builder("c-3", "Wild")
            .strategic_alignment(14.0)
            .roi_percent(-300.0)
            .build();
        assert_eq!(case.out_of_range_fields(), vec![FieldKey::StrategicAlignment]);
        assert_eq!(case.strategic_alignment, 14.0);
    }

    #[test]
    fn deserializes_sparse_json_with_defaults() {
        let case: CaseRecord =
            serde_json::from_str(r#"{"id":"c-4","title":"Sparse","roi_percent":25.0}"#).unwrap();
        assert_eq!(case.roi_percent, 25.0);
        assert_eq!(case.client_impact, NEUTRAL_RATING);
        assert_eq!(case.current.process_efficiency, NEUTRAL_RATING);
    }
}
