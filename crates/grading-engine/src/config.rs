use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use gradebook_core::domain::{GradeBand, GradeScale, ScoreBounds, ScoreValidator};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{GradingError, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GradebookConfig {
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl GradebookConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.grading.validator()?;
        let generation = &self.generation;
        let positive = [
            ("max_parallel", generation.max_parallel as u64),
            ("aggregation_timeout_ms", generation.aggregation_timeout_ms),
            ("lock_timeout_ms", generation.lock_timeout_ms),
            ("store_timeout_ms", generation.store_timeout_ms),
            ("event_buffer_size", generation.event_buffer_size as u64),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(GradingError::Config(format!(
                "generation.{name} must be at least 1"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GradingConfig {
    #[serde(default = "default_ca_max")]
    pub ca_max: Decimal,
    #[serde(default = "default_exam_max")]
    pub exam_max: Decimal,
    #[serde(default = "default_bands")]
    pub bands: Vec<GradeBand>,
}

impl GradingConfig {
    pub fn validator(&self) -> Result<ScoreValidator> {
        if self.ca_max <= Decimal::ZERO || self.exam_max <= Decimal::ZERO {
            return Err(GradingError::Config(format!(
                "score bounds must be positive, got ca_max={} exam_max={}",
                self.ca_max, self.exam_max
            )));
        }

        let scale = GradeScale::new(self.bands.clone())
            .map_err(|err| GradingError::Config(err.to_string()))?;
        let bounds = ScoreBounds {
            ca_max: self.ca_max,
            exam_max: self.exam_max,
        };
        Ok(ScoreValidator::new(bounds, scale))
    }
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            ca_max: default_ca_max(),
            exam_max: default_exam_max(),
            bands: default_bands(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    #[serde(default = "default_aggregation_timeout_ms")]
    pub aggregation_timeout_ms: u64,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Upper bound for a single store or enrollment call outside aggregation.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    #[serde(default = "default_regenerate_on_approval")]
    pub regenerate_on_approval: bool,
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl GenerationConfig {
    pub fn aggregation_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregation_timeout_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            aggregation_timeout_ms: default_aggregation_timeout_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
            store_timeout_ms: default_store_timeout_ms(),
            regenerate_on_approval: default_regenerate_on_approval(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

/// Loads the config at `path`, or defaults when the file does not exist.
pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<GradebookConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(GradebookConfig::default());
    }
    GradebookConfig::from_file(path)
        .with_context(|| format!("failed to load gradebook config: {}", path.display()))
}

fn default_ca_max() -> Decimal {
    Decimal::from(30)
}

fn default_exam_max() -> Decimal {
    Decimal::from(70)
}

fn default_bands() -> Vec<GradeBand> {
    GradeScale::default().bands().to_vec()
}

fn default_max_parallel() -> usize {
    8
}

fn default_aggregation_timeout_ms() -> u64 {
    5_000
}

fn default_lock_timeout_ms() -> u64 {
    30_000
}

fn default_store_timeout_ms() -> u64 {
    10_000
}

fn default_regenerate_on_approval() -> bool {
    true
}

fn default_event_buffer_size() -> usize {
    1_000
}
