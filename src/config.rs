use crate::log_debug;
use crate::providers::{BackendConfig, BackendTier, ProviderError, default_backends};

use anyhow::{Context, Result, anyhow};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Project configuration filename, looked up at the repository root
pub const PROJECT_CONFIG_FILENAME: &str = ".quillconfig";

/// Configuration structure for Git-Quill
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// Size limits applied while building the prompt
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Backends queried concurrently on each invocation, in tie-break order
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub project: ProjectOverrides,
    /// File inside the git dir that receives the selected message
    #[serde(default = "default_pending_message_file")]
    pub pending_message_file: String,
    /// Flag indicating if this config is from a project file
    #[serde(skip)]
    pub is_project_config: bool,
}

/// Size limits, consolidated in one place.
///
/// Truncation keeps `limit` lines of an oversized fragment: for new files the
/// first and second halves of `added_line_limit`, for modified files
/// `modified_line_limit - modified_tail_lines` head lines and
/// `modified_tail_lines` tail lines.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct BudgetConfig {
    /// Maximum characters of per-file entries before degrading to a summary
    pub max_prompt_chars: usize,
    /// Staged file count above which classification is skipped entirely
    pub max_staged_files: usize,
    /// Line threshold for newly added files
    pub added_line_limit: usize,
    /// Line threshold for modified files
    pub modified_line_limit: usize,
    /// Tail lines kept when a modified file is truncated
    pub modified_tail_lines: usize,
    /// Byte cap on the bulk diff read
    pub max_diff_bytes: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: 120_000,
            max_staged_files: 100,
            added_line_limit: 50,
            modified_line_limit: 500,
            modified_tail_lines: 50,
            max_diff_bytes: 16 * 1024 * 1024,
        }
    }
}

impl BudgetConfig {
    pub fn added_head(&self) -> usize {
        self.added_line_limit / 2
    }

    pub fn added_tail(&self) -> usize {
        self.added_line_limit - self.added_head()
    }

    pub fn modified_head(&self) -> usize {
        self.modified_line_limit.saturating_sub(self.modified_tail_lines)
    }

    pub fn modified_tail(&self) -> usize {
        self.modified_tail_lines.min(self.modified_line_limit)
    }
}

/// Settings for the generation phase
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Per-branch timeout in seconds
    pub request_timeout_secs: u64,
    /// Option styles in display order; unknown styles sort last
    pub style_priority: Vec<String>,
    /// Extra guidance appended to the system prompt
    pub instructions: String,
    /// Number of recent commit subjects included as context
    pub recent_commits: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 120,
            style_priority: default_style_priority(),
            instructions: String::new(),
            recent_commits: 5,
        }
    }
}

/// Optional overrides for the project metadata block
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub fn default_style_priority() -> Vec<String> {
    ["concise", "conventional", "detailed", "historical"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_pending_message_file() -> String {
    "COMMIT_EDITMSG".to_string()
}

impl Config {
    /// Load the personal configuration, then merge the project file under
    /// `repo_root` when one exists.
    pub fn load(repo_root: Option<&Path>) -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Invalid configuration in {}", config_path.display()))?
        } else {
            Self::default()
        };

        if let Some(root) = repo_root {
            match Self::load_project_config(root) {
                Ok(project_config) => config.merge_with_project_config(project_config),
                Err(e) => log_debug!("No project configuration used: {}", e),
            }
        }

        log_debug!("Configuration loaded: {:?}", config.redacted());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load project-specific configuration
    pub fn load_project_config(repo_root: &Path) -> Result<Self> {
        let config_path = repo_root.join(PROJECT_CONFIG_FILENAME);
        if !config_path.exists() {
            return Err(anyhow!("Project configuration file not found"));
        }

        let config_str = fs::read_to_string(&config_path)
            .map_err(|e| anyhow!("Failed to read project config file: {}", e))?;

        let mut config: Self = toml::from_str(&config_str).map_err(|e| {
            anyhow!(
                "Invalid project configuration file format: {}. Please check your {} file for syntax errors.",
                e,
                PROJECT_CONFIG_FILENAME
            )
        })?;

        config.is_project_config = true;
        Ok(config)
    }

    /// Merge project settings over this config. API keys never come from a
    /// project file.
    pub fn merge_with_project_config(&mut self, project_config: Self) {
        log_debug!("Merging with project configuration");

        if project_config.budget != BudgetConfig::default() {
            self.budget = project_config.budget;
        }
        if project_config.generation != GenerationConfig::default() {
            self.generation = project_config.generation;
        }
        if project_config.project != ProjectOverrides::default() {
            self.project = project_config.project;
        }
        if project_config.pending_message_file != default_pending_message_file() {
            self.pending_message_file = project_config.pending_message_file;
        }

        if project_config.backends != default_backends() {
            for mut proj_backend in project_config.backends {
                proj_backend.api_key.clear();
                if let Some(existing) = self.backends.iter_mut().find(|b| b.id == proj_backend.id) {
                    let api_key = std::mem::take(&mut existing.api_key);
                    *existing = proj_backend;
                    existing.api_key = api_key;
                } else {
                    self.backends.push(proj_backend);
                }
            }
        }
    }

    /// Save the configuration to the personal file
    pub fn save(&self) -> Result<()> {
        if self.is_project_config {
            return Ok(());
        }

        let config_path = Self::get_config_path()?;
        let config_content = toml::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        log_debug!("Configuration saved");
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("git-quill");
        fs::create_dir_all(&path)?;
        path.push("config.toml");
        Ok(path)
    }

    /// Enabled backends in configuration order
    pub fn enabled_backends(&self) -> impl Iterator<Item = &BackendConfig> {
        self.backends.iter().filter(|b| b.enabled)
    }

    /// Keep only the enabled fast backends
    pub fn restrict_to_fast(&mut self) {
        self.backends
            .retain(|b| b.enabled && b.tier == BackendTier::Fast);
    }

    /// Check the settings that would otherwise fail deep inside an invocation
    pub fn validate(&self) -> Result<(), ProviderError> {
        let mut seen = HashSet::new();
        for backend in self.enabled_backends() {
            if !seen.insert(backend.id.as_str()) {
                return Err(ProviderError::DuplicateId(backend.id.clone()));
            }
            backend.validate()?;
        }
        if !self.enabled_backends().any(|b| b.tier == BackendTier::Fast) {
            return Err(ProviderError::NoFastBackend);
        }
        Ok(())
    }

    /// A copy with every API key blanked, safe to log or print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for backend in &mut copy.backends {
            if !backend.api_key.is_empty() {
                backend.api_key = "********".to_string();
            }
        }
        copy
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            budget: BudgetConfig::default(),
            backends: default_backends(),
            generation: GenerationConfig::default(),
            project: ProjectOverrides::default(),
            pending_message_file: default_pending_message_file(),
            is_project_config: false,
        }
    }
}
