use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::ProjectOverrides;
use crate::log_debug;

/// How a staged path changed, from the point of view of its content
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

impl ChangeType {
    /// Maps a `--name-status` code (`M`, `A`, `D`, `R100`, `C075`, `T`, ...)
    /// onto a content change type. Renames and copies count as additions of the
    /// destination path.
    pub fn from_status_code(code: &str) -> Option<Self> {
        match code.chars().next()? {
            'A' | 'R' | 'C' => Some(Self::Added),
            'M' | 'T' | 'U' | 'X' => Some(Self::Modified),
            'D' => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Fixed context appended to every prompt in an invocation
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectMetadata {
    pub name: String,
    pub description: Option<String>,
    pub branch: Option<String>,
    pub recent_commits: Vec<String>,
}

impl ProjectMetadata {
    /// Resolves name and description from overrides, then manifests, then the
    /// repository directory name.
    pub fn resolve(repo_root: &Path, overrides: &ProjectOverrides) -> Self {
        let manifest = read_manifest(repo_root);
        let name = overrides
            .name
            .clone()
            .or_else(|| manifest.as_ref().and_then(|m| m.name.clone()))
            .or_else(|| {
                repo_root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "unnamed project".to_string());
        let description = overrides
            .description
            .clone()
            .or_else(|| manifest.and_then(|m| m.description));

        Self {
            name,
            description,
            branch: None,
            recent_commits: Vec::new(),
        }
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    pub fn with_recent_commits(mut self, commits: Vec<String>) -> Self {
        self.recent_commits = commits;
        self
    }

    /// Renders the metadata block that closes the user prompt
    pub fn render(&self) -> String {
        let mut out = format!("Project: {}\n", self.name);
        if let Some(description) = &self.description {
            out.push_str(&format!("Description: {description}\n"));
        }
        if let Some(branch) = &self.branch {
            out.push_str(&format!("Branch: {branch}\n"));
        }
        if !self.recent_commits.is_empty() {
            out.push_str("Recent commits:\n");
            for subject in &self.recent_commits {
                out.push_str(&format!("- {subject}\n"));
            }
        }
        out
    }
}

#[derive(Debug, Default)]
struct ManifestInfo {
    name: Option<String>,
    description: Option<String>,
}

fn read_manifest(repo_root: &Path) -> Option<ManifestInfo> {
    let cargo = repo_root.join("Cargo.toml");
    if let Ok(content) = fs::read_to_string(&cargo) {
        log_debug!("Reading project metadata from {}", cargo.display());
        if let Some(info) = parse_cargo_manifest(&content) {
            return Some(info);
        }
    }

    let package_json = repo_root.join("package.json");
    if let Ok(content) = fs::read_to_string(&package_json) {
        log_debug!("Reading project metadata from {}", package_json.display());
        return parse_package_json(&content);
    }

    None
}

fn parse_cargo_manifest(content: &str) -> Option<ManifestInfo> {
    let value: toml::Value = toml::from_str(content).ok()?;
    let package = value.get("package")?;
    Some(ManifestInfo {
        name: package.get("name").and_then(|v| v.as_str()).map(str::to_string),
        description: package
            .get("description")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

fn parse_package_json(content: &str) -> Option<ManifestInfo> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    Some(ManifestInfo {
        name: value.get("name").and_then(|v| v.as_str()).map(str::to_string),
        description: value
            .get("description")
            .and_then(|v| v.as_str())
            .filter(|d| !d.trim().is_empty())
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_status_codes() {
        assert_eq!(ChangeType::from_status_code("M"), Some(ChangeType::Modified));
        assert_eq!(ChangeType::from_status_code("A"), Some(ChangeType::Added));
        assert_eq!(ChangeType::from_status_code("D"), Some(ChangeType::Deleted));
        assert_eq!(ChangeType::from_status_code("R087"), Some(ChangeType::Added));
        assert_eq!(ChangeType::from_status_code("C100"), Some(ChangeType::Added));
        assert_eq!(ChangeType::from_status_code("T"), Some(ChangeType::Modified));
        assert_eq!(ChangeType::from_status_code(""), None);
    }

    #[test]
    fn test_cargo_manifest_metadata() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"widget\"\ndescription = \"Makes widgets\"\n",
        )
        .expect("write manifest");

        let meta = ProjectMetadata::resolve(dir.path(), &ProjectOverrides::default());
        assert_eq!(meta.name, "widget");
        assert_eq!(meta.description.as_deref(), Some("Makes widgets"));
    }

    #[test]
    fn test_package_json_and_overrides() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "web-app", "description": "Front end"}"#,
        )
        .expect("write manifest");

        let overrides = ProjectOverrides {
            name: Some("Custom".to_string()),
            description: None,
        };
        let meta = ProjectMetadata::resolve(dir.path(), &overrides);
        assert_eq!(meta.name, "Custom");
        assert_eq!(meta.description.as_deref(), Some("Front end"));
    }

    #[test]
    fn test_falls_back_to_directory_name() {
        let dir = TempDir::new().expect("temp dir");
        let meta = ProjectMetadata::resolve(dir.path(), &ProjectOverrides::default());
        let expected = dir
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        assert_eq!(meta.name, expected);
        assert!(meta.description.is_none());
    }

    #[test]
    fn test_render_includes_context_fields() {
        let meta = ProjectMetadata {
            name: "quill".to_string(),
            description: Some("Commit helper".to_string()),
            branch: Some("main".to_string()),
            recent_commits: vec!["Add parser".to_string()],
        };
        let rendered = meta.render();
        assert!(rendered.contains("Project: quill"));
        assert!(rendered.contains("Description: Commit helper"));
        assert!(rendered.contains("Branch: main"));
        assert!(rendered.contains("- Add parser"));
    }
}
