//! Repository root resolution and hierarchical config discovery.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use super::error::{ScopeError, ScopeResult};
use super::ordering::OrderingKey;
use crate::config::settings::load_config_file;
use crate::config::{ScopeConfig, CONFIG_FILE, LEGACY_CONFIG_FILE};

/// How the repository root was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    GitWorktree,
    CommonAncestor,
    WorkingDirectory,
}

/// The anchor every default and CLI rule is based at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryRoot {
    pub path: PathBuf,
    pub kind: RootKind,
}

impl RepositoryRoot {
    /// Resolves the root for already absolute, existing `targets`.
    ///
    /// Prefers the enclosing Git worktree, then the deepest common ancestor of
    /// the targets, then `cwd` when it contains every target.
    pub fn resolve(cwd: &Path, targets: &[PathBuf]) -> ScopeResult<Self> {
        if targets.is_empty() {
            return Ok(Self {
                path: cwd.to_path_buf(),
                kind: RootKind::WorkingDirectory,
            });
        }

        let dirs: Vec<PathBuf> = targets.iter().map(|t| target_dir(t)).collect();
        let common = common_ancestor(&dirs);

        if let Some(common) = common.as_deref() {
            if let Some(git_root) = find_git_root(common) {
                tracing::debug!("Repository root from git worktree: {:?}", git_root);
                return Ok(Self {
                    path: git_root,
                    kind: RootKind::GitWorktree,
                });
            }
            if has_named_component(common) {
                return Ok(Self {
                    path: common.to_path_buf(),
                    kind: RootKind::CommonAncestor,
                });
            }
        }

        if targets.iter().all(|t| t.starts_with(cwd)) {
            return Ok(Self {
                path: cwd.to_path_buf(),
                kind: RootKind::WorkingDirectory,
            });
        }
        Err(ScopeError::NoCommonAncestor)
    }
}

/// Makes `path` absolute against `cwd` and checks that it exists.
///
/// Symlinks count as existing entries; their targets are not followed. Only
/// the parent directory is canonicalized so the final name is preserved.
pub fn absolutize_target(cwd: &Path, path: &Path) -> ScopeResult<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let metadata = fs::symlink_metadata(&joined).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ScopeError::PathNotFound(path.to_path_buf()),
        _ => ScopeError::io(e, &joined),
    })?;

    if metadata.file_type().is_symlink() {
        if let (Some(parent), Some(name)) = (joined.parent(), joined.file_name()) {
            let parent = fs::canonicalize(parent).map_err(|e| ScopeError::io(e, parent))?;
            return Ok(parent.join(name));
        }
    }
    fs::canonicalize(&joined).map_err(|e| ScopeError::io(e, &joined))
}

/// A configuration file found during discovery, already parsed.
#[derive(Debug, Clone)]
pub struct DiscoveredConfig {
    pub path: PathBuf,
    /// Base directory for the file's rules.
    pub dir: PathBuf,
    pub config: ScopeConfig,
}

/// Finds configuration files between the repository root and each target.
pub struct ConfigDiscovery<'a> {
    root: &'a Path,
}

impl<'a> ConfigDiscovery<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    /// Directories from the root down to `target`'s directory, both inclusive.
    ///
    /// Empty when the target is not beneath the root.
    pub fn lineage(&self, target: &Path) -> Vec<PathBuf> {
        let leaf = target_dir(target);
        if !leaf.starts_with(self.root) {
            return Vec::new();
        }
        let mut dirs: Vec<PathBuf> = leaf
            .ancestors()
            .take_while(|d| d.starts_with(self.root))
            .map(Path::to_path_buf)
            .collect();
        dirs.reverse();
        dirs
    }

    /// Config file paths for all targets, root-to-leaf, each listed once.
    pub fn config_paths(&self, targets: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut found: Vec<PathBuf> = Vec::new();
        for target in targets {
            for dir in self.lineage(target) {
                if let Some(path) = config_in(&dir) {
                    if seen.insert(path.clone()) {
                        found.push(path);
                    }
                }
            }
        }

        found.sort_by_cached_key(|p| {
            let key = OrderingKey::for_path(self.root, p);
            (key.depth(), key)
        });
        found
    }

    /// Discovers and parses every applicable config file.
    ///
    /// `explicit` is appended last unless discovery already found it. Any
    /// unreadable or malformed file aborts discovery.
    pub fn discover(
        &self,
        targets: &[PathBuf],
        explicit: Option<&Path>,
    ) -> ScopeResult<Vec<DiscoveredConfig>> {
        let mut paths = self.config_paths(targets);

        if let Some(explicit) = explicit {
            let resolved = fs::canonicalize(explicit).map_err(|e| ScopeError::Config {
                path: explicit.to_path_buf(),
                message: format!("explicit config file is not accessible: {e}"),
            })?;
            if !paths.contains(&resolved) {
                paths.push(resolved);
            }
        }

        let mut discovered = Vec::with_capacity(paths.len());
        for path in paths {
            let config = load_config_file(&path)?;
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.root.to_path_buf());
            tracing::debug!("Discovered config {:?} (base {:?})", path, dir);
            discovered.push(DiscoveredConfig { path, dir, config });
        }
        Ok(discovered)
    }
}

/// The config file governing `dir`, if any.
///
/// `.grobl.toml` wins over the legacy name when both are present.
fn config_in(dir: &Path) -> Option<PathBuf> {
    let current = dir.join(CONFIG_FILE);
    let legacy = dir.join(LEGACY_CONFIG_FILE);
    let has_current = current.is_file();
    let has_legacy = legacy.is_file();

    match (has_current, has_legacy) {
        (true, true) => {
            tracing::warn!(
                "Both {} and {} exist in {:?}; using {}",
                CONFIG_FILE,
                LEGACY_CONFIG_FILE,
                dir,
                CONFIG_FILE
            );
            Some(current)
        }
        (true, false) => Some(current),
        (false, true) => {
            tracing::warn!(
                "Using legacy config file name {:?}; rename it to {}",
                legacy,
                CONFIG_FILE
            );
            Some(legacy)
        }
        (false, false) => None,
    }
}

fn target_dir(target: &Path) -> PathBuf {
    match fs::symlink_metadata(target) {
        Ok(md) if md.is_dir() => target.to_path_buf(),
        _ => target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| target.to_path_buf()),
    }
}

fn common_ancestor(paths: &[PathBuf]) -> Option<PathBuf> {
    let (first, rest) = paths.split_first()?;
    let mut common = first.clone();
    for path in rest {
        while !path.starts_with(&common) {
            if !common.pop() {
                return None;
            }
        }
    }
    Some(common)
}

fn has_named_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::Normal(_)))
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| fs::symlink_metadata(dir.join(".git")).is_ok())
        .map(Path::to_path_buf)
}
