// SPDX-License-Identifier: MIT

//! Settings from the environment, optionally overlaid by a YAML file
//!
//! Environment variables (a `.env` file is honoured):
//!
//! | variable | default |
//! |---|---|
//! | `CADRE_BASE_URL` / `OPENAI_BASE_URL` | `http://127.0.0.1:11434/v1` |
//! | `OPENAI_API_KEY` | unset |
//! | `MODEL_NAME` | `llama3` |
//! | `CADRE_REQUEST_TIMEOUT_SECS` | unset |
//! | `CADRE_STRUCTURED_OUTPUT` | `false` |
//! | `CADRE_MAX_CRITIQUE_ROUNDS` | `3` (`none` for unbounded) |
//! | `CADRE_STEP_LIMIT` | unset |
//! | `CADRE_DATA_DIR` | `data` |
//! | `CADRE_REFLECTION` | `false` |
//! | `CADRE_SKILL_LEARNING` | `false` |
//! | `CADRE_MEMORY_TAIL` | `20` |

use dotenv::dotenv;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::adk::error::CadreError;
use crate::graph::RunToggles;
use crate::teams::HierarchicalConfig;
use crate::workers::memory_hook::{DEFAULT_CONTENT_LIMIT, DEFAULT_TAIL_LEN};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model_name: String,
    pub request_timeout_secs: Option<u64>,
    pub structured_output: bool,
    pub max_critique_rounds: Option<u32>,
    pub step_limit: Option<usize>,
    pub data_dir: PathBuf,
    pub reflection_enabled: bool,
    pub skill_learning_enabled: bool,
    pub memory_tail_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434/v1".to_string(),
            api_key: None,
            model_name: "llama3".to_string(),
            request_timeout_secs: None,
            structured_output: false,
            max_critique_rounds: Some(3),
            step_limit: None,
            data_dir: PathBuf::from("data"),
            reflection_enabled: false,
            skill_learning_enabled: false,
            memory_tail_len: DEFAULT_TAIL_LEN,
        }
    }
}

/// YAML overlay; every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    base_url: Option<String>,
    api_key: Option<String>,
    model_name: Option<String>,
    request_timeout_secs: Option<u64>,
    structured_output: Option<bool>,
    /// `null` keeps the default; use `max_critique_rounds: none` for unbounded
    max_critique_rounds: Option<CritiqueCap>,
    step_limit: Option<usize>,
    data_dir: Option<PathBuf>,
    reflection_enabled: Option<bool>,
    skill_learning_enabled: Option<bool>,
    memory_tail_len: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CritiqueCap {
    Rounds(u32),
    Label(String),
}

impl Settings {
    /// Load `.env`, read the environment, then apply `path` if given
    pub fn load(path: Option<&Path>) -> Result<Self, CadreError> {
        dotenv().ok();
        let mut settings = Self::from_env()?;
        if let Some(path) = path {
            settings.overlay_yaml_file(path)?;
        }
        Ok(settings)
    }

    pub fn from_env() -> Result<Self, CadreError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CadreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(url) = get("CADRE_BASE_URL").or_else(|| get("OPENAI_BASE_URL")) {
            settings.base_url = url;
        }
        settings.api_key = get("OPENAI_API_KEY");
        if let Some(model) = get("MODEL_NAME") {
            settings.model_name = model;
        }
        settings.request_timeout_secs = parse_opt(&get, "CADRE_REQUEST_TIMEOUT_SECS")?;
        if let Some(v) = parse_opt(&get, "CADRE_STRUCTURED_OUTPUT")? {
            settings.structured_output = v;
        }
        if let Some(raw) = get("CADRE_MAX_CRITIQUE_ROUNDS") {
            settings.max_critique_rounds = parse_cap(&raw)?;
        }
        settings.step_limit = parse_opt(&get, "CADRE_STEP_LIMIT")?;
        if let Some(dir) = get("CADRE_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = parse_opt(&get, "CADRE_REFLECTION")? {
            settings.reflection_enabled = v;
        }
        if let Some(v) = parse_opt(&get, "CADRE_SKILL_LEARNING")? {
            settings.skill_learning_enabled = v;
        }
        if let Some(v) = parse_opt(&get, "CADRE_MEMORY_TAIL")? {
            settings.memory_tail_len = v;
        }

        Ok(settings)
    }

    pub fn overlay_yaml_file(&mut self, path: &Path) -> Result<(), CadreError> {
        let content = fs::read_to_string(path)?;
        self.overlay_yaml(&content)
    }

    pub fn overlay_yaml(&mut self, content: &str) -> Result<(), CadreError> {
        let file: SettingsFile = serde_yaml::from_str(content)?;

        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = file.model_name {
            self.model_name = v;
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = Some(v);
        }
        if let Some(v) = file.structured_output {
            self.structured_output = v;
        }
        match file.max_critique_rounds {
            Some(CritiqueCap::Rounds(n)) => self.max_critique_rounds = Some(n),
            Some(CritiqueCap::Label(label)) => self.max_critique_rounds = parse_cap(&label)?,
            None => {}
        }
        if let Some(v) = file.step_limit {
            self.step_limit = Some(v);
        }
        if let Some(v) = file.data_dir {
            self.data_dir = v;
        }
        if let Some(v) = file.reflection_enabled {
            self.reflection_enabled = v;
        }
        if let Some(v) = file.skill_learning_enabled {
            self.skill_learning_enabled = v;
        }
        if let Some(v) = file.memory_tail_len {
            self.memory_tail_len = v;
        }
        Ok(())
    }

    pub fn toggles(&self) -> RunToggles {
        RunToggles {
            reflection_enabled: self.reflection_enabled,
            skill_learning_enabled: self.skill_learning_enabled,
        }
    }

    pub fn hierarchical_config(&self) -> HierarchicalConfig {
        HierarchicalConfig {
            max_critique_rounds: self.max_critique_rounds,
            tail_len: self.memory_tail_len,
            content_limit: DEFAULT_CONTENT_LIMIT,
        }
    }
}

fn parse_opt<T, G>(get: &G, key: &str) -> Result<Option<T>, CadreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| CadreError::config(format!("{} = '{}': {}", key, raw, e)))
        })
        .transpose()
}

fn parse_cap(raw: &str) -> Result<Option<u32>, CadreError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "none" | "unbounded" => Ok(None),
        other => other.parse().map(Some).map_err(|e| {
            CadreError::config(format!("max critique rounds '{}': {}", raw, e))
        }),
    }
}
