//! Single-pattern gitignore matching.
//!
//! The resolver never evaluates glob syntax itself. It asks a [`PatternMatcher`]
//! whether one core pattern (negation already stripped) matches one path
//! relative to the rule's base directory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Answers "does this one pattern match this relative path".
///
/// Implementations must be pure with respect to their inputs so that the
/// resolver stays a pure function of `(path, scope, layer)`.
pub trait PatternMatcher: Send + Sync {
    /// `relative_path` is POSIX-separated and relative to the rule's base
    /// directory. `is_dir` enables trailing-slash semantics.
    fn matches(&self, core_pattern: &str, relative_path: &str, is_dir: bool) -> bool;

    /// Rejects patterns the matcher cannot honour.
    fn validate(&self, core_pattern: &str) -> Result<(), String> {
        let _ = core_pattern;
        Ok(())
    }
}

/// [`PatternMatcher`] backed by the `ignore` crate's gitignore engine.
///
/// Each distinct core pattern is compiled once and cached. A pattern that names
/// a directory also matches everything beneath that directory, as in git.
#[derive(Debug, Default)]
pub struct GitignoreMatcher {
    compiled: RwLock<HashMap<String, Arc<Gitignore>>>,
}

impl GitignoreMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a one-line gitignore for `core_pattern`.
    ///
    /// Lines that gitignore treats as blank or as comments compile to an empty
    /// matcher; those are reported as errors since they would match nothing.
    pub fn compile(core_pattern: &str) -> Result<Gitignore, String> {
        let mut builder = GitignoreBuilder::new(".");
        builder
            .add_line(None, core_pattern)
            .map_err(|e| e.to_string())?;
        let gitignore = builder.build().map_err(|e| e.to_string())?;
        if gitignore.num_ignores() + gitignore.num_whitelists() == 0 {
            return Err("pattern compiles to nothing (blank or comment)".to_string());
        }
        Ok(gitignore)
    }

    fn lookup(&self, core_pattern: &str) -> Option<Arc<Gitignore>> {
        {
            let cache = self.compiled.read().unwrap_or_else(|e| e.into_inner());
            if let Some(found) = cache.get(core_pattern) {
                return Some(Arc::clone(found));
            }
        }

        let gitignore = match Self::compile(core_pattern) {
            Ok(g) => Arc::new(g),
            Err(e) => {
                tracing::error!("Failed to compile pattern {:?}: {}", core_pattern, e);
                return None;
            }
        };
        let mut cache = self.compiled.write().unwrap_or_else(|e| e.into_inner());
        Some(Arc::clone(
            cache
                .entry(core_pattern.to_string())
                .or_insert(gitignore),
        ))
    }
}

impl PatternMatcher for GitignoreMatcher {
    fn matches(&self, core_pattern: &str, relative_path: &str, is_dir: bool) -> bool {
        // A rule never matches its own base directory.
        if relative_path.is_empty() {
            return false;
        }
        let Some(gitignore) = self.lookup(core_pattern) else {
            return false;
        };
        let relative_path = relative_path.trim_end_matches('/');
        // Whitelist matches count too: a core pattern that still begins with `!`
        // after stripping one negation is matched literally by the engine.
        !gitignore
            .matched_path_or_any_parents(Path::new(relative_path), is_dir)
            .is_none()
    }

    fn validate(&self, core_pattern: &str) -> Result<(), String> {
        Self::compile(core_pattern).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(pattern: &str, path: &str, is_dir: bool) -> bool {
        GitignoreMatcher::new().matches(pattern, path, is_dir)
    }

    #[test]
    fn unanchored_name_matches_at_any_depth() {
        assert!(m("node_modules", "node_modules", true));
        assert!(m("node_modules", "pkg/node_modules", true));
        assert!(m("*.md", "docs/guide/intro.md", false));
        assert!(!m("*.md", "docs/guide/intro.rs", false));
    }

    #[test]
    fn directory_pattern_covers_its_contents() {
        assert!(m("node_modules", "node_modules/left-pad/index.js", false));
        assert!(m("build/", "build", true));
        assert!(m("build/", "build/out.o", false));
    }

    #[test]
    fn trailing_slash_only_matches_directories() {
        assert!(!m("build/", "build", false));
        assert!(m("build/", "build", true));
    }

    #[test]
    fn anchored_patterns_stay_at_the_base() {
        assert!(m("/dist", "dist", true));
        assert!(!m("/dist", "web/dist", true));
        assert!(m("docs/**", "docs/a/b.md", false));
        assert!(!m("docs/**", "src/docs/b.md", false));
    }

    #[test]
    fn empty_relative_path_never_matches() {
        assert!(!m("*", "", true));
    }

    #[test]
    fn blank_and_comment_patterns_are_rejected() {
        let matcher = GitignoreMatcher::new();
        assert!(matcher.validate("   ").is_err());
        assert!(matcher.validate("#comment").is_err());
        assert!(matcher.validate("*.log").is_ok());
        assert!(matcher.validate("\\#literal").is_ok());
    }
}
