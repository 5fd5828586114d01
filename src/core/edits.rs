//! Rule edits supplied on the command line.
//!
//! Argument parsing lives elsewhere. This module receives each flag occurrence
//! already tagged with its argv position and turns the whole set into raw
//! pattern lines per scope, in the order they were typed.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{ScopeError, ScopeResult};
use super::rule::Scope;
use crate::config::settings::read_pattern_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditAction {
    Exclude,
    Include,
}

/// The scopes an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditScopes {
    Both,
    Tree,
    Content,
}

impl EditScopes {
    pub fn contains(self, scope: Scope) -> bool {
        match self {
            EditScopes::Both => true,
            EditScopes::Tree => scope == Scope::Tree,
            EditScopes::Content => scope == Scope::Content,
        }
    }
}

/// One rule-bearing flag occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEdit {
    pub pattern: String,
    pub action: EditAction,
    pub scopes: EditScopes,
    /// Position of the flag in argv.
    pub position: usize,
}

impl RuleEdit {
    fn new(position: usize, pattern: &str, action: EditAction, scopes: EditScopes) -> Self {
        Self {
            pattern: pattern.to_string(),
            action,
            scopes,
            position,
        }
    }

    /// `--exclude`
    pub fn exclude(position: usize, pattern: &str) -> Self {
        Self::new(position, pattern, EditAction::Exclude, EditScopes::Both)
    }

    /// `--include`
    pub fn include(position: usize, pattern: &str) -> Self {
        Self::new(position, pattern, EditAction::Include, EditScopes::Both)
    }

    /// `--exclude-tree`
    pub fn exclude_tree(position: usize, pattern: &str) -> Self {
        Self::new(position, pattern, EditAction::Exclude, EditScopes::Tree)
    }

    /// `--include-tree`
    pub fn include_tree(position: usize, pattern: &str) -> Self {
        Self::new(position, pattern, EditAction::Include, EditScopes::Tree)
    }

    /// `--exclude-content`
    pub fn exclude_content(position: usize, pattern: &str) -> Self {
        Self::new(position, pattern, EditAction::Exclude, EditScopes::Content)
    }

    /// `--include-content`
    pub fn include_content(position: usize, pattern: &str) -> Self {
        Self::new(position, pattern, EditAction::Include, EditScopes::Content)
    }

    /// `--exclude-file`: one concrete path, anchored at the repository root.
    ///
    /// Fails with [`ScopeError::OutsideRoot`] for a file that is not beneath
    /// `repo_root`.
    pub fn exclude_file(position: usize, repo_root: &Path, file: &Path) -> ScopeResult<Self> {
        let pattern = anchored_literal(repo_root, file)?;
        Ok(Self::new(position, &pattern, EditAction::Exclude, EditScopes::Both))
    }

    /// `--include-file`
    pub fn include_file(position: usize, repo_root: &Path, file: &Path) -> ScopeResult<Self> {
        let pattern = anchored_literal(repo_root, file)?;
        Ok(Self::new(position, &pattern, EditAction::Include, EditScopes::Both))
    }

    /// Legacy `--add-ignore`; same as `--exclude`.
    pub fn legacy_add_ignore(position: usize, pattern: &str) -> Self {
        tracing::warn!("--add-ignore is deprecated; use --exclude (tree + content)");
        Self::exclude(position, pattern)
    }

    /// Legacy `--remove-ignore` and `--unignore`; same as `--include`.
    pub fn legacy_unignore(position: usize, pattern: &str) -> Self {
        tracing::warn!("--remove-ignore/--unignore are deprecated; use --include (tree + content)");
        Self::include(position, pattern)
    }

    /// Legacy `--ignore-file`: every pattern line of the file becomes an
    /// `--exclude` at the flag's position.
    pub fn legacy_ignore_file(position: usize, file: &Path) -> ScopeResult<Vec<Self>> {
        tracing::warn!("--ignore-file is deprecated; use --exclude (tree + content)");
        Ok(read_pattern_file(file)?
            .iter()
            .map(|p| Self::exclude(position, p))
            .collect())
    }

    /// The pattern line the rule compiler sees.
    pub fn raw_pattern(&self) -> String {
        match self.action {
            EditAction::Exclude => self.pattern.clone(),
            EditAction::Include => format!("!{}", self.pattern),
        }
    }
}

/// Orders edits by argv position and returns the raw lines for `scope`.
pub fn raw_patterns_for(edits: &[RuleEdit], scope: Scope) -> Vec<String> {
    let mut ordered: Vec<&RuleEdit> = edits.iter().collect();
    // Stable: edits expanded from one flag keep their file order.
    ordered.sort_by_key(|e| e.position);
    ordered
        .into_iter()
        .filter(|e| e.scopes.contains(scope))
        .map(RuleEdit::raw_pattern)
        .collect()
}

fn anchored_literal(repo_root: &Path, file: &Path) -> ScopeResult<String> {
    let absolute: PathBuf = if file.is_absolute() {
        file.to_path_buf()
    } else {
        repo_root.join(file)
    };
    let outside = || ScopeError::OutsideRoot {
        path: absolute.clone(),
        root: repo_root.to_path_buf(),
    };
    let relative = absolute.strip_prefix(repo_root).map_err(|_| outside())?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(outside()),
        }
    }
    if segments.is_empty() {
        return Err(outside());
    }
    let posix = segments.join("/");

    let mut escaped = String::with_capacity(posix.len() + 1);
    escaped.push('/');
    for ch in posix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\' | '!' | '#') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    Ok(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_are_ordered_by_argv_position_per_scope() {
        let edits = vec![
            RuleEdit::exclude_content(5, "*.md"),
            RuleEdit::include(1, "docs/**"),
            RuleEdit::exclude_tree(3, "build/"),
        ];

        assert_eq!(raw_patterns_for(&edits, Scope::Tree), vec!["!docs/**", "build/"]);
        assert_eq!(raw_patterns_for(&edits, Scope::Content), vec!["!docs/**", "*.md"]);
    }

    #[test]
    fn file_edits_become_root_anchored_literals() {
        let root = Path::new("/repo");
        let edit = RuleEdit::exclude_file(0, root, Path::new("src/[gen]/out*.rs")).unwrap();
        assert_eq!(edit.pattern, "/src/\\[gen\\]/out\\*.rs");

        let edit = RuleEdit::include_file(1, root, Path::new("/repo/notes/a.txt")).unwrap();
        assert_eq!(edit.raw_pattern(), "!/notes/a.txt");
    }

    #[test]
    fn file_edits_outside_the_root_are_rejected() {
        let root = Path::new("/repo");
        for file in ["/tmp/a.txt", "../elsewhere/a.txt", "/repo"] {
            assert!(
                matches!(
                    RuleEdit::exclude_file(0, root, Path::new(file)),
                    Err(ScopeError::OutsideRoot { .. })
                ),
                "{file}"
            );
        }
        assert!(RuleEdit::include_file(0, root, Path::new("/tmp/a.txt")).is_err());
    }

    #[test]
    fn legacy_ignore_file_expands_at_its_position() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("extra-ignores");
        std::fs::write(&list, "*.tmp\n# skip\ncache/\n").unwrap();

        let mut edits = RuleEdit::legacy_ignore_file(2, &list).unwrap();
        edits.push(RuleEdit::legacy_unignore(4, "cache/keep"));
        edits.push(RuleEdit::legacy_add_ignore(0, "*.bak"));

        assert_eq!(
            raw_patterns_for(&edits, Scope::Content),
            vec!["*.bak", "*.tmp", "cache/", "!cache/keep"]
        );
    }
}
