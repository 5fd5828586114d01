pub mod settings;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::Scope;

/// File name searched for in every directory between the repository root and
/// each scan target.
pub const CONFIG_FILE: &str = ".grobl.toml";
/// Older file name, still honoured when [`CONFIG_FILE`] is absent.
pub const LEGACY_CONFIG_FILE: &str = ".grobl.config.toml";

/// The rule-bearing part of a `.grobl.toml` file.
///
/// Other keys used by the wider tool are accepted and ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScopeConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_tree: Vec<String>,
    #[serde(
        default,
        alias = "exclude_print",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub exclude_content: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_tree_groups: Vec<String>,
    #[serde(
        default,
        alias = "exclude_print_groups",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub exclude_content_groups: Vec<String>,
}

impl ScopeConfig {
    /// Returns the pattern lines for `scope`, with group members appended
    /// after the explicit entries. Blank and `#` lines are dropped here, since
    /// the rule compiler refuses them.
    pub fn patterns(&self, scope: Scope) -> Vec<String> {
        let (explicit, group_names) = match scope {
            Scope::Tree => (&self.exclude_tree, &self.exclude_tree_groups),
            Scope::Content => (&self.exclude_content, &self.exclude_content_groups),
        };

        let mut out: Vec<String> = Vec::new();
        for line in explicit {
            if let Some(p) = clean_line(line) {
                out.push(p.to_string());
            }
        }
        for name in group_names {
            let Some(members) = self.groups.get(name) else {
                tracing::warn!("Unknown ignore group {:?} referenced in config", name);
                continue;
            };
            for line in members {
                if let Some(p) = clean_line(line) {
                    if !out.iter().any(|existing| existing == p) {
                        out.push(p.to_string());
                    }
                }
            }
        }
        out
    }

    /// The rules shipped with the tool.
    pub fn bundled_defaults() -> Self {
        let tree = [
            ".git/",
            ".hg/",
            ".svn/",
            "node_modules",
            "venv",
            ".venv",
            "__pycache__",
            ".mypy_cache",
            ".pytest_cache",
            ".ruff_cache",
            ".tox",
            ".idea",
            ".vscode",
            "target/",
            "dist/",
            "build/",
            ".DS_Store",
            "Thumbs.db",
            "*.pyc",
            LEGACY_CONFIG_FILE,
        ];

        let mut content: Vec<&str> = vec![
            "*.lock",
            "package-lock.json",
            "pnpm-lock.yaml",
            "*.log",
            "*.env",
            ".env",
        ];
        let image_extensions = [
            "*.png", "*.jpg", "*.jpeg", "*.gif", "*.bmp", "*.ico", "*.webp", "*.tiff", "*.tif",
            "*.heic", "*.heif", "*.avif", "*.icns",
        ];
        let binary_extensions = [
            "*.exe", "*.dll", "*.so", "*.dylib", "*.a", "*.lib", "*.rlib", "*.o", "*.obj",
            "*.class", "*.jar", "*.pdf", "*.zip", "*.tar", "*.gz", "*.7z", "*.rar", "*.bin",
            "*.db", "*.sqlite", "*.mp3", "*.mp4",
        ];
        content.extend(image_extensions);
        content.extend(binary_extensions);

        Self {
            exclude_tree: tree.iter().map(|s| s.to_string()).collect(),
            exclude_content: content.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }
}

fn clean_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        None
    } else {
        Some(trimmed)
    }
}
