use crate::agent::context::{DEFAULT_SYSTEM_PROMPT, SYSTEM_TIME_PLACEHOLDER};
use crate::agent::loop_::{DEFAULT_STEP_BUDGET, DEFAULT_TOOL_TIMEOUT};
use crate::agent::phase::PhasePlan;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const TALLY_DIR: &str = ".tally";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    /// Passed through to the provider untouched.
    pub model: String,
    pub step_budget: usize,
    pub tool_timeout_secs: u64,
    pub system_prompt: String,
    pub phases: PhasePlan,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o".to_string(),
            step_budget: DEFAULT_STEP_BUDGET,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT.as_secs(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            phases: PhasePlan::default(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.step_budget == 0 {
            bail!("step_budget must be greater than zero");
        }
        if self.tool_timeout_secs == 0 {
            bail!("tool_timeout_secs must be greater than zero");
        }
        if !self.system_prompt.contains(SYSTEM_TIME_PLACEHOLDER) {
            tracing::debug!("system prompt has no {} placeholder", SYSTEM_TIME_PLACEHOLDER);
        }
        for phase in self
            .phases
            .before_action
            .iter()
            .chain(&self.phases.after_tools)
        {
            if phase.name.trim().is_empty() {
                bail!("every advisory phase needs a name");
            }
        }
        Ok(())
    }
}

pub fn get_tally_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(TALLY_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_tally_dir().join("config.toml")
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'tally onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config in {}", config_path.display()))?;

    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    save_config_to(config, &get_config_path())
}

pub fn save_config_to(config: &Config, config_path: &Path) -> Result<()> {
    if let Some(dir) = config_path.parent()
        && !dir.exists()
    {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory at {}", dir.display()))?;
    }

    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let config = Config {
            provider: Some("openrouter".into()),
            api_key: "sk-test".into(),
            step_budget: 7,
            ..Default::default()
        };

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "model = \"llama3.1\"\nstep_budget = 4\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.model, "llama3.1");
        assert_eq!(config.step_budget, 4);
        assert_eq!(config.tool_timeout(), DEFAULT_TOOL_TIMEOUT);
        assert_eq!(config.phases, PhasePlan::default());
    }

    #[test]
    fn zero_budget_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "step_budget = 0\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("step_budget must be greater than zero"));
    }

    #[test]
    fn custom_phases() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[phases]
after_tools = []

[[phases.before_action]]
name = "plan"
system_prompt = "You plan."
instruction = "What is the plan?"
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.phases.before_action.len(), 1);
        assert!(config.phases.after_tools.is_empty());
    }

    #[test]
    fn missing_file_points_to_onboard() {
        let tmp = TempDir::new().unwrap();
        let err = load_config_from(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("tally onboard"));
    }
}
