use crate::error::{AnnapurnaError, Result};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnapurnaConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Custom path for the SQLite store. Defaults to `~/.config/annapurna/annapurna.db`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Generate a picture for each suggested recipe.
    #[serde(default = "default_true")]
    pub images: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            env_var: None,
            base_url: None,
            text_model: default_text_model(),
            image_model: default_image_model(),
            images: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_calorie_goal")]
    pub default_calorie_goal: u32,
    #[serde(default = "default_water_goal_ml")]
    pub water_goal_ml: u32,
    #[serde(default = "default_glass_ml")]
    pub glass_ml: u32,
    #[serde(default = "default_bottle_ml")]
    pub bottle_ml: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_calorie_goal: default_calorie_goal(),
            water_goal_ml: default_water_goal_ml(),
            glass_ml: default_glass_ml(),
            bottle_ml: default_bottle_ml(),
        }
    }
}

// -- Defaults --

pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_image_model() -> String {
    "imagen-4.0-generate-001".to_string()
}
fn default_true() -> bool {
    true
}
fn default_calorie_goal() -> u32 {
    crate::model::DEFAULT_CALORIE_GOAL
}
fn default_water_goal_ml() -> u32 {
    3000
}
fn default_glass_ml() -> u32 {
    250
}
fn default_bottle_ml() -> u32 {
    1000
}

impl AnnapurnaConfig {
    /// Load configuration with three-layer TOML merge:
    /// 1. ~/.config/annapurna/config.toml (global)
    /// 2. .annapurna/config.toml (project)
    /// 3. .annapurna/config.local.toml (local, gitignored)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".annapurna").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            let local_config = dir.join(".annapurna").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| AnnapurnaError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| AnnapurnaError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Load with defaults only (no files).
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Validate config values, replacing unusable ones and logging warnings.
    /// Lenient: bad values are fixed, never rejected.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        let tracker_defaults = TrackerConfig::default();
        let amount_checks: Vec<(&str, &mut u32, u32)> = vec![
            (
                "tracker.default_calorie_goal",
                &mut self.tracker.default_calorie_goal,
                tracker_defaults.default_calorie_goal,
            ),
            (
                "tracker.water_goal_ml",
                &mut self.tracker.water_goal_ml,
                tracker_defaults.water_goal_ml,
            ),
            (
                "tracker.glass_ml",
                &mut self.tracker.glass_ml,
                tracker_defaults.glass_ml,
            ),
            (
                "tracker.bottle_ml",
                &mut self.tracker.bottle_ml,
                tracker_defaults.bottle_ml,
            ),
        ];
        for (name, val, fallback) in amount_checks {
            if *val == 0 {
                warnings.push(format!("{name} = 0, setting to {fallback}"));
                *val = fallback;
            }
        }

        if self.ai.text_model.trim().is_empty() {
            warnings.push(format!(
                "ai.text_model is empty, setting to {}",
                default_text_model()
            ));
            self.ai.text_model = default_text_model();
        }
        if self.ai.image_model.trim().is_empty() {
            warnings.push(format!(
                "ai.image_model is empty, setting to {}",
                default_image_model()
            ));
            self.ai.image_model = default_image_model();
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }

    /// Where the SQLite store lives for this configuration.
    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(p) => Ok(PathBuf::from(p)),
            None => default_storage_path(),
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("annapurna").join("config.toml"))
}

/// Default store path: `~/.config/annapurna/annapurna.db`
pub fn default_storage_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("annapurna").join("annapurna.db"))
        .ok_or_else(|| AnnapurnaError::Config("cannot determine config directory".to_string()))
}

/// Resolve the AI API key: config field first, then the configured (or
/// default) environment variable.
pub fn resolve_api_key(config: &AiConfig) -> Result<String> {
    if let Some(ref key) = config.api_key {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }

    let env_var_name = config.env_var.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);

    match std::env::var(env_var_name) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(AnnapurnaError::Config(format!(
            "the AI service requires an API key (set ai.api_key or {env_var_name})"
        ))),
    }
}
