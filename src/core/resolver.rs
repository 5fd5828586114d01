//! Last-match-wins resolution of one path in one scope.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::layer::RuleLayer;
use super::matcher::PatternMatcher;
use super::ordering::relative_posix;
use super::rule::{PatternRule, Scope};

/// Outcome of resolving one path in one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub included: bool,
    /// `None` means no rule matched and the path is included by default.
    pub winning_rule: Option<PatternRule>,
    /// Set on content decisions forced to "excluded" because the file is
    /// hidden from the tree.
    #[serde(default)]
    pub suppressed_by_tree: bool,
}

impl Decision {
    pub fn default_include() -> Self {
        Self {
            included: true,
            winning_rule: None,
            suppressed_by_tree: false,
        }
    }

    fn from_winner(winner: Option<&PatternRule>) -> Self {
        match winner {
            Some(rule) => Self {
                included: rule.negated,
                winning_rule: Some(rule.clone()),
                suppressed_by_tree: false,
            },
            None => Self::default_include(),
        }
    }

    /// Applies the tree gate to a content decision: content is never
    /// included for a file the tree hides. The winning rule is kept.
    pub fn gated_by(mut self, tree: &Decision) -> Self {
        if self.included && !tree.included {
            self.included = false;
            self.suppressed_by_tree = true;
        }
        self
    }
}

/// Resolves `path` against `layer` for `scope`.
///
/// Walks every rule in sequence order; a rule whose base directory does not
/// contain `path` is skipped, and each matching rule replaces the previous
/// winner. An empty layer includes everything.
pub fn resolve(
    path: &Path,
    is_dir: bool,
    scope: Scope,
    layer: &RuleLayer,
    matcher: &dyn PatternMatcher,
) -> Decision {
    let mut winner: Option<&PatternRule> = None;
    for rule in layer.rules(scope) {
        let Some(relative) = relative_posix(path, &rule.base_dir) else {
            continue;
        };
        if matcher.matches(&rule.core_pattern, &relative, is_dir) {
            winner = Some(rule);
        }
    }
    Decision::from_winner(winner)
}

/// A [`RuleLayer`] paired with the matcher that evaluates its patterns.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    layer: &'a RuleLayer,
    matcher: &'a dyn PatternMatcher,
}

impl<'a> Resolver<'a> {
    pub fn new(layer: &'a RuleLayer, matcher: &'a dyn PatternMatcher) -> Self {
        Self { layer, matcher }
    }

    pub fn layer(&self) -> &'a RuleLayer {
        self.layer
    }

    pub fn resolve(&self, path: &Path, is_dir: bool, scope: Scope) -> Decision {
        resolve(path, is_dir, scope, self.layer, self.matcher)
    }

    /// Tree and gated content decisions for one entry. Directories have no
    /// content decision.
    pub fn resolve_entry(&self, path: &Path, is_dir: bool) -> (Decision, Option<Decision>) {
        let tree = self.resolve(path, is_dir, Scope::Tree);
        let content = if is_dir {
            None
        } else {
            Some(self.resolve(path, false, Scope::Content).gated_by(&tree))
        };
        (tree, content)
    }
}
