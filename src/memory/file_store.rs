// SPDX-License-Identifier: MIT

//! JSON-file learning store
//!
//! Layout under the data directory:
//! - `skills/<name>.json`
//! - `reflections/<timestamp>_<task>.json`

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{FailureAnalysis, LearningStore, Reflection, Skill, StoreError};
use crate::adk::model::{Message, Model, ResponseSchema};
use crate::adk::structured::{complete_structured, StructuredError};

const ANALYST_PROMPT: &str =
    "You are an expert at analyzing task failures and extracting actionable lessons.";

#[derive(Deserialize, JsonSchema)]
#[allow(dead_code)]
struct AnalysisSchema {
    failure_reason: String,
    lessons_learned: Vec<String>,
}

pub struct FileLearningStore {
    skills_dir: PathBuf,
    reflections_dir: PathBuf,
    analyzer: Option<Arc<dyn Model>>,
    write_lock: Mutex<()>,
}

impl FileLearningStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            skills_dir: root.join("skills"),
            reflections_dir: root.join("reflections"),
            analyzer: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Model used by [`LearningStore::analyze_failure`]
    pub fn with_analyzer(mut self, model: Arc<dyn Model>) -> Self {
        self.analyzer = Some(model);
        self
    }

    pub async fn load_skill(&self, name: &str) -> Result<Option<Skill>, StoreError> {
        let path = self.skills_dir.join(format!("{}.json", name));
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        let raw = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Skill names on disk, sorted
    pub async fn list_skills(&self) -> Result<Vec<String>, StoreError> {
        list_json_stems(&self.skills_dir).await
    }

    pub async fn list_reflections(&self) -> Result<Vec<String>, StoreError> {
        list_json_stems(&self.reflections_dir).await
    }

    async fn write_json(&self, dir: &Path, file_name: &str, json: String) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(file_name), json).await?;
        Ok(())
    }

    async fn ask_analyzer(
        &self,
        model: &dyn Model,
        task_description: &str,
        error_message: &str,
    ) -> Result<FailureAnalysis, StructuredError> {
        let history = [
            Message::system(ANALYST_PROMPT),
            Message::user(format!(
                "Task: {}\n\nError: {}\n\nAnalyze this failure and provide:\n\
                 1. A clear explanation of why it failed\n\
                 2. Specific lessons learned\n\
                 3. How to avoid this in the future\n\n\
                 Provide your response as JSON with keys: failure_reason, lessons_learned (list)",
                task_description, error_message
            )),
        ];
        let schema = serde_json::to_value(schemars::schema_for!(AnalysisSchema)).unwrap_or_default();
        complete_structured(model, &history, &ResponseSchema::new("failure_analysis", schema)).await
    }
}

async fn list_json_stems(dir: &Path) -> Result<Vec<String>, StoreError> {
    if !tokio::fs::try_exists(dir).await? {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// First 50 chars of the task, keeping alphanumerics, spaces and underscores
fn safe_task_name(task: &str) -> String {
    task.chars()
        .take(50)
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect::<String>()
        .trim()
        .to_string()
}

#[async_trait]
impl LearningStore for FileLearningStore {
    async fn save_skill(&self, skill: &Skill) -> Result<bool, StoreError> {
        let json = serde_json::to_string_pretty(skill)?;
        self.write_json(&self.skills_dir, &format!("{}.json", skill.name), json)
            .await?;
        log::info!("Skill saved: {}", skill.name);
        Ok(true)
    }

    async fn analyze_failure(
        &self,
        task_description: &str,
        error_message: &str,
    ) -> Result<FailureAnalysis, StoreError> {
        let analysis = match &self.analyzer {
            Some(model) => self
                .ask_analyzer(model.as_ref(), task_description, error_message)
                .await
                .map_err(|e| e.to_string()),
            None => Err("no analyzer model configured".to_string()),
        };

        Ok(analysis.unwrap_or_else(|reason| {
            log::warn!("Failure analysis fell back to the raw error: {}", reason);
            FailureAnalysis {
                failure_reason: error_message.to_string(),
                lessons: vec!["Failed to analyze with LLM".to_string()],
            }
        }))
    }

    async fn save_reflection(&self, reflection: &Reflection) -> Result<bool, StoreError> {
        let file_name = format!(
            "{}_{}.json",
            reflection.created_at.format("%Y%m%d_%H%M%S"),
            safe_task_name(&reflection.task_description)
        );
        let json = serde_json::to_string_pretty(reflection)?;
        self.write_json(&self.reflections_dir, &file_name, json).await?;
        log::info!("Reflection saved: {}", file_name);
        Ok(true)
    }
}
