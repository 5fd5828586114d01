//! Compiled rules and the compiler that produces them from raw pattern lines.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{ScopeError, ScopeResult};
use super::matcher::PatternMatcher;

/// Which question a rule answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Visibility in the rendered hierarchy.
    Tree,
    /// Eligibility of a file's contents for capture.
    Content,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Tree, Scope::Content];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Tree => "tree",
            Scope::Content => "content",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a rule came from. Sources are layered in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    Defaults,
    Config,
    Cli,
}

impl RuleSource {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleSource::Defaults => "defaults",
            RuleSource::Config => "config",
            RuleSource::Cli => "cli",
        }
    }
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compiled include/exclude rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Pattern text with one leading `!` removed.
    pub core_pattern: String,
    /// A negated rule includes what it matches.
    pub negated: bool,
    pub scope: Scope,
    pub source: RuleSource,
    /// Directory the pattern is interpreted relative to.
    pub base_dir: PathBuf,
    /// Set only for rules loaded from a configuration file.
    pub origin_config_path: Option<PathBuf>,
    /// Global position in the scope's rule list. Later wins.
    pub sequence_index: usize,
}

impl PatternRule {
    /// The pattern as the user wrote it, polarity included.
    pub fn display_pattern(&self) -> String {
        if self.negated {
            format!("!{}", self.core_pattern)
        } else {
            self.core_pattern.clone()
        }
    }
}

/// Metadata describing where a batch of raw patterns comes from.
#[derive(Debug, Clone)]
pub struct RuleOrigin<'a> {
    pub scope: Scope,
    pub source: RuleSource,
    pub base_dir: &'a Path,
    pub config_path: Option<&'a Path>,
}

/// Turns raw pattern lines into [`PatternRule`]s.
///
/// Comment and blank-line filtering belongs to whoever read the lines from a
/// file; the compiler itself rejects anything that leaves an empty core.
pub struct RuleCompiler<'m> {
    matcher: &'m dyn PatternMatcher,
}

impl<'m> RuleCompiler<'m> {
    pub fn new(matcher: &'m dyn PatternMatcher) -> Self {
        Self { matcher }
    }

    /// Compiles one raw pattern. `sequence_index` is assigned by the caller.
    pub fn compile(
        &self,
        raw: &str,
        origin: &RuleOrigin<'_>,
        sequence_index: usize,
    ) -> ScopeResult<PatternRule> {
        let (negated, core) = split_negation(raw);
        if core.trim().is_empty() {
            return Err(ScopeError::pattern(raw, "empty pattern"));
        }
        self.matcher
            .validate(core)
            .map_err(|reason| ScopeError::pattern(raw, reason))?;

        let origin_config_path = match origin.source {
            RuleSource::Config => origin.config_path.map(Path::to_path_buf),
            RuleSource::Defaults | RuleSource::Cli => None,
        };

        Ok(PatternRule {
            core_pattern: core.to_string(),
            negated,
            scope: origin.scope,
            source: origin.source,
            base_dir: origin.base_dir.to_path_buf(),
            origin_config_path,
            sequence_index,
        })
    }
}

/// Splits a leading unescaped `!` off a raw pattern.
///
/// `\!` is an escaped literal and is passed through untouched.
pub fn split_negation(raw: &str) -> (bool, &str) {
    match raw.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matcher::GitignoreMatcher;

    fn origin(base: &Path) -> RuleOrigin<'_> {
        RuleOrigin {
            scope: Scope::Tree,
            source: RuleSource::Cli,
            base_dir: base,
            config_path: None,
        }
    }

    #[test]
    fn leading_bang_sets_negation_and_is_stripped() {
        let matcher = GitignoreMatcher::new();
        let compiler = RuleCompiler::new(&matcher);
        let base = PathBuf::from("/repo");

        let rule = compiler
            .compile("!tests/fixtures/**", &origin(&base), 7)
            .unwrap();
        assert!(rule.negated);
        assert_eq!(rule.core_pattern, "tests/fixtures/**");
        assert_eq!(rule.sequence_index, 7);
        assert_eq!(rule.display_pattern(), "!tests/fixtures/**");
    }

    #[test]
    fn escaped_bang_is_not_negation() {
        let matcher = GitignoreMatcher::new();
        let compiler = RuleCompiler::new(&matcher);
        let base = PathBuf::from("/repo");

        let rule = compiler.compile("\\!important", &origin(&base), 0).unwrap();
        assert!(!rule.negated);
        assert_eq!(rule.core_pattern, "\\!important");
    }

    #[test]
    fn empty_core_is_rejected() {
        let matcher = GitignoreMatcher::new();
        let compiler = RuleCompiler::new(&matcher);
        let base = PathBuf::from("/repo");

        for raw in ["", "!", "!   "] {
            let err = compiler.compile(raw, &origin(&base), 0).unwrap_err();
            assert!(matches!(err, ScopeError::Pattern { .. }), "{raw:?}");
        }
    }

    #[test]
    fn config_path_only_recorded_for_config_rules() {
        let matcher = GitignoreMatcher::new();
        let compiler = RuleCompiler::new(&matcher);
        let base = PathBuf::from("/repo/pkg");
        let cfg = PathBuf::from("/repo/pkg/.grobl.toml");

        let mut o = RuleOrigin {
            scope: Scope::Content,
            source: RuleSource::Config,
            base_dir: &base,
            config_path: Some(&cfg),
        };
        let rule = compiler.compile("*.md", &o, 0).unwrap();
        assert_eq!(rule.origin_config_path.as_deref(), Some(cfg.as_path()));

        o.source = RuleSource::Cli;
        let rule = compiler.compile("*.md", &o, 1).unwrap();
        assert_eq!(rule.origin_config_path, None);
    }
}
