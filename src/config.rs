use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::{PipelinePromoter, DEFAULT_PROMOTION_THRESHOLD};
use crate::scoring::{ScoreWeights, ScoringEngine};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoreWeights,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    #[serde(default = "default_promotion_threshold")]
    pub promotion_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub promotion_threshold: Option<f64>,
    pub state_path: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/case-pipeline/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        parsed
            .validate()
            .with_context(|| format!("invalid config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        if !self.pipeline.promotion_threshold.is_finite() {
            return Err(anyhow!(
                "promotion_threshold must be finite, got {}",
                self.pipeline.promotion_threshold
            ));
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(threshold) = overrides.promotion_threshold {
            self.pipeline.promotion_threshold = threshold;
        }
        if let Some(state_path) = overrides.state_path {
            self.storage.state_path = state_path;
        }
    }

    pub fn engine(&self) -> Result<ScoringEngine> {
        Ok(ScoringEngine::new(self.scoring)?)
    }

    pub fn promoter(&self) -> PipelinePromoter {
        PipelinePromoter::new(self.pipeline.promotion_threshold)
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_state_path(&self) -> PathBuf {
        expand_tilde(&self.storage.state_path)
    }

    pub fn default_template() -> String {
        let template = r#"# Sub-score weights in whole percent; they must add up to 100.
[scoring]
financial = 30
strategic = 25
feasibility = 20
impact = 15
resource = 10

[pipeline]
promotion_threshold = 70.0

[storage]
state_path = "~/.local/share/case-pipeline/pipeline.json"
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: default_promotion_threshold(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
        }
    }
}

fn default_promotion_threshold() -> f64 {
    DEFAULT_PROMOTION_THRESHOLD
}

fn default_state_path() -> String {
    "~/.local/share/case-pipeline/pipeline.json".to_string()
}
