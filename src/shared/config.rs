use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default = "MatcherConfig::default_title_weight")]
    pub title_weight: u32,
    #[serde(default = "MatcherConfig::default_keyword_weight")]
    pub keyword_weight: u32,
    #[serde(default = "MatcherConfig::default_description_weight")]
    pub description_weight: u32,
}

impl MatcherConfig {
    fn default_title_weight() -> u32 {
        3
    }

    fn default_keyword_weight() -> u32 {
        2
    }

    fn default_description_weight() -> u32 {
        1
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            title_weight: 3,
            keyword_weight: 2,
            description_weight: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "AssistantConfig::default_greeting_delay_ms")]
    pub greeting_delay_ms: u64,
    #[serde(default = "AssistantConfig::default_reply_delay_ms")]
    pub reply_delay_ms: u64,
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,
}

impl AssistantConfig {
    fn default_greeting_delay_ms() -> u64 {
        600
    }

    fn default_reply_delay_ms() -> u64 {
        1000
    }

    pub fn greeting_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_delay_ms)
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    pub fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            greeting_delay_ms: 600,
            reply_delay_ms: 1000,
            highlight_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "SearchConfig::default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "SearchConfig::default_min_query_chars")]
    pub min_query_chars: usize,
    /// Result target that opens the vacancies listing instead of scrolling.
    #[serde(default = "SearchConfig::default_vacancies_target")]
    pub vacancies_target: String,
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,
}

impl SearchConfig {
    fn default_debounce_ms() -> u64 {
        200
    }

    fn default_min_query_chars() -> usize {
        2
    }

    fn default_vacancies_target() -> String {
        "vacancies".to_string()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            min_query_chars: 2,
            vacancies_target: "vacancies".to_string(),
            highlight_ms: 2000,
        }
    }
}

fn default_highlight_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LinksConfig {
    /// External consultation form opened by the terminal host.
    pub consultation_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub links: LinksConfig,
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
            .join("markaz-assistant");
        Ok(config_dir.join("config.yaml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let config = if config_path.exists() {
            let config_content = fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            Self::from_yaml(&config_content)?
        } else {
            // Create default config if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let default_config = Self::default();
            fs::write(&config_path, serde_yaml::to_string(&default_config)?)?;
            default_config
        };

        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("invalid config")
    }
}

// Global config instance
use once_cell::sync::OnceCell;
static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| Config::load().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("search:\n  debounce_ms: 350\n").unwrap();
        assert_eq!(config.search.debounce_ms, 350);
        assert_eq!(config.search.min_query_chars, 2);
        assert_eq!(config.search.vacancies_target, "vacancies");
        assert_eq!(config.matcher.title_weight, 3);
        assert_eq!(config.assistant.reply_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.assistant.greeting_delay_ms, 600);
        assert_eq!(config.matcher.keyword_weight, 2);
        assert!(config.links.consultation_url.is_none());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(Config::from_yaml("matcher: [1, 2").is_err());
    }
}
