use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;


/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Upper bound for the fail-safe sampling interval.
pub const MAX_POLL_INTERVAL_MS: u64 = 50;

/// Upper bound for `computer_control.max_wait_seconds`.
pub const MAX_WAIT_SECONDS_LIMIT: f64 = 600.0;

const DEFAULT_PATHS: [&str; 3] = [
    "./deskhand.toml",
    "~/.config/deskhand/config.toml",
    "~/.deskhand.toml",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub agent: AgentConfig,
    pub fail_safe: FailSafeConfig,
    pub computer_control: ComputerControlConfig,
    pub shell: ShellConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: 1024,
            temperature: None,
            base_url: None,
            timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum decision-maker turns per task
    pub max_turns: u32,
    /// Replaces the built-in system prompt when set
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 25,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailSafeConfig {
    /// Distance from a corner, in pixels, that counts as "in the corner"
    pub corner_margin_px: u32,
    pub poll_interval_ms: u64,
    /// Consecutive failed pointer probes before the monitor aborts
    pub max_probe_failures: u32,
}

impl Default for FailSafeConfig {
    fn default() -> Self {
        Self {
            corner_margin_px: 10,
            poll_interval_ms: 25,
            max_probe_failures: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputerControlConfig {
    pub post_action_pause_ms: u64,
    pub focus_settle_ms: u64,
    pub close_settle_ms: u64,
    pub max_wait_seconds: f64,
}

impl Default for ComputerControlConfig {
    fn default() -> Self {
        Self {
            post_action_pause_ms: 20,
            focus_settle_ms: 300,
            close_settle_ms: 300,
            max_wait_seconds: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub timeout_seconds: u64,
    pub max_output_chars: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            max_output_chars: 3000,
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path_to_load = match config_path {
            Some(path) => {
                let expanded = shellexpand::tilde(path).to_string();
                if !Path::new(&expanded).exists() {
                    anyhow::bail!("Configuration file not found: {}", expanded);
                }
                Some(expanded)
            }
            None => Self::find_default_path(),
        };

        // If no config exists, create and save a default config
        let Some(path) = path_to_load else {
            let default_config = Self::default();
            let config_file = Self::default_config_file();
            if let Some(dir) = config_file.parent() {
                std::fs::create_dir_all(dir).ok();
            }
            if let Err(e) = default_config.save(&config_file) {
                eprintln!("Warning: Could not save default config: {}", e);
            } else {
                println!(
                    "Created default configuration at: {}",
                    config_file.display()
                );
            }
            return Ok(default_config);
        };

        debug!("Loading configuration from {}", path);
        let config_content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&config_content)
            .map_err(|e| anyhow::anyhow!("Invalid configuration in {}: {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_with_overrides(
        config_path: Option<&str>,
        model_override: Option<String>,
        max_turns_override: Option<u32>,
    ) -> Result<Self> {
        let mut config = Self::load(config_path)?;

        if let Some(model) = model_override {
            config.provider.model = model;
        }
        if let Some(max_turns) = max_turns_override {
            config.agent.max_turns = max_turns;
        }

        config.validate()?;
        Ok(config)
    }

    fn find_default_path() -> Option<String> {
        DEFAULT_PATHS.iter().find_map(|path| {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                Some(expanded_path.to_string())
            } else {
                None
            }
        })
    }

    fn default_config_file() -> PathBuf {
        dirs::home_dir()
            .map(|mut path| {
                path.push(".config");
                path.push("deskhand");
                path
            })
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent.max_turns == 0 {
            anyhow::bail!("agent.max_turns must be at least 1");
        }
        if self.fail_safe.poll_interval_ms == 0
            || self.fail_safe.poll_interval_ms > MAX_POLL_INTERVAL_MS
        {
            anyhow::bail!(
                "fail_safe.poll_interval_ms must be between 1 and {} (got {})",
                MAX_POLL_INTERVAL_MS,
                self.fail_safe.poll_interval_ms
            );
        }
        if self.fail_safe.max_probe_failures == 0 {
            anyhow::bail!("fail_safe.max_probe_failures must be at least 1");
        }
        let max_wait = self.computer_control.max_wait_seconds;
        if !max_wait.is_finite() || !(0.0..=MAX_WAIT_SECONDS_LIMIT).contains(&max_wait) {
            anyhow::bail!(
                "computer_control.max_wait_seconds must be between 0 and {} (got {})",
                MAX_WAIT_SECONDS_LIMIT,
                max_wait
            );
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.provider.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }
}
