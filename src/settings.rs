use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn api_url(&self) -> Option<String> {
        self.data.read().unwrap().api_url.clone()
    }

    pub fn github_token(&self) -> Option<String> {
        self.data.read().unwrap().github_token.clone()
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.data.read().unwrap().database_path.clone()
    }

    pub fn set_api_url(&self, api_url: Option<String>) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.api_url = api_url;
        self.persist(&guard)
    }

    pub fn set_github_token(&self, token: Option<String>) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.github_token = token;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
