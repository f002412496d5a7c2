use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::model::{ModelProfile, ProviderKind};

const DEV_CONFIG_FILE: &str = "config.json";
const HOME_CONFIG_FILE: &str = ".ai.json";
const DEFAULT_MAX_HISTORY: usize = 10;

fn default_default_model() -> String {
    "openai".to_string()
}

fn default_models() -> BTreeMap<String, ModelEntry> {
    BTreeMap::from([
        (
            "openai".to_string(),
            ModelEntry {
                api_key: String::new(),
                model: "gpt-3.5-turbo".to_string(),
                api_base: "https://api.openai.com/v1/".to_string(),
            },
        ),
        (
            "deepseek".to_string(),
            ModelEntry {
                api_key: String::new(),
                model: "deepseek-chat".to_string(),
                api_base: "https://api.deepseek.com/v1/".to_string(),
            },
        ),
        (
            "qwen".to_string(),
            ModelEntry {
                api_key: String::new(),
                model: "qwen-max".to_string(),
                api_base: "https://dashscope.aliyuncs.com/api/v1/".to_string(),
            },
        ),
    ])
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_stream_output() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub http: String,
    #[serde(default)]
    pub https: String,
}

impl ProxyConfig {
    /// Applies the configured proxies to a client under construction. A
    /// disabled or empty proxy block leaves the builder untouched.
    pub fn apply(
        &self,
        mut builder: reqwest::ClientBuilder,
    ) -> Result<reqwest::ClientBuilder, ConfigError> {
        if !self.enabled {
            return Ok(builder);
        }
        if !self.http.trim().is_empty() {
            let proxy = reqwest::Proxy::http(self.http.trim())
                .map_err(|err| ConfigError::Proxy(err.to_string()))?;
            builder = builder.proxy(proxy);
        }
        if !self.https.trim().is_empty() {
            let proxy = reqwest::Proxy::https(self.https.trim())
                .map_err(|err| ConfigError::Proxy(err.to_string()))?;
            builder = builder.proxy(proxy);
        }
        Ok(builder)
    }
}

/// Preferred reply language. `auto` leaves the model to mirror the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Auto,
    Zh,
    En,
}

impl Language {
    pub fn system_prompt(&self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::Zh => Some("请始终使用中文回答。"),
            Self::En => Some("Always reply in English."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_default_model")]
    pub default_model: String,
    #[serde(default = "default_models")]
    pub models: BTreeMap<String, ModelEntry>,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_stream_output")]
    pub stream_output: bool,
    #[serde(default)]
    pub language: Language,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: default_default_model(),
            models: default_models(),
            proxy: ProxyConfig::default(),
            max_history: default_max_history(),
            stream_output: default_stream_output(),
            language: Language::default(),
        }
    }
}

impl Config {
    /// Resolves the config file path: a `config.json` in the working
    /// directory overrides the per-user file (development mode, announced on
    /// stdout).
    pub fn locate() -> PathBuf {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let (path, dev_mode) = locate_in(&cwd, &home);
        if dev_mode {
            println!("[dev mode] using config file: {}", path.display());
        }
        path
    }

    /// Loads the file at `path`, writing the default template first if no
    /// file exists yet.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.write_to(path)?;
            debug!(path = %path.display(), "created default config file");
            return Ok(config);
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Malformed {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let as_io = |source: std::io::Error| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(as_io)?;
        }
        let rendered = serde_json::to_string_pretty(self).map_err(|source| {
            ConfigError::Malformed {
                path: path.display().to_string(),
                source,
            }
        })?;
        fs::write(path, rendered).map_err(as_io)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.models.contains_key(&self.default_model) {
            return Err(ConfigError::UnknownModel(self.default_model.clone()));
        }
        Ok(())
    }

    /// Resolves credentials and endpoint for `name`. The per-model
    /// environment variable (for example `OPENAI_API_KEY`) overrides the key
    /// stored in the file.
    pub fn resolve_profile(&self, name: &str) -> Result<ModelProfile, ConfigError> {
        self.resolve_profile_with(name, |key| env::var(key).ok())
    }

    fn resolve_profile_with(
        &self,
        name: &str,
        mut get_var: impl FnMut(&str) -> Option<String>,
    ) -> Result<ModelProfile, ConfigError> {
        let entry = self
            .models
            .get(name)
            .ok_or_else(|| ConfigError::UnknownModel(name.to_string()))?;
        let kind = ProviderKind::from_model_name(name)
            .ok_or_else(|| ConfigError::UnsupportedProvider(name.to_string()))?;

        let env_var = api_key_env_var(name);
        let api_key = get_var(&env_var)
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| entry.api_key.clone());
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey {
                model: name.to_string(),
                env_var,
            });
        }

        Ok(ModelProfile {
            name: name.to_string(),
            kind,
            api_key,
            api_base: entry.api_base.clone(),
            model: entry.model.clone(),
        })
    }
}

fn locate_in(cwd: &Path, home: &Path) -> (PathBuf, bool) {
    let dev_path = cwd.join(DEV_CONFIG_FILE);
    if dev_path.exists() {
        (dev_path, true)
    } else {
        (home.join(HOME_CONFIG_FILE), false)
    }
}

pub(crate) fn api_key_env_var(model_name: &str) -> String {
    format!("{}_API_KEY", model_name.to_ascii_uppercase())
}
