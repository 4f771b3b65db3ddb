use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// Personal access token used for every outbound request.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

impl AppConfig {
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_path = if let Some(path) = custom_path {
            path
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".octogate/config.json")
        };

        let s = Config::builder()
            .add_source(File::from(config_path).required(false))
            // Environment overrides (OCTOGATE_GITHUB__TOKEN, ...)
            .add_source(Environment::with_prefix("OCTOGATE").separator("__"))
            .build()?;

        let mut cfg: AppConfig = s.try_deserialize()?;

        // Conventional variable used by GitHub tooling takes over when the
        // config file leaves the token empty.
        if cfg.github.token.is_empty() {
            if let Ok(token) = std::env::var("GITHUB_PERSONAL_ACCESS_TOKEN") {
                cfg.github.token = token;
            }
        }

        Ok(cfg)
    }
}
