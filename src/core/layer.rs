//! Assembly of the ordered, per-scope rule lists.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::discovery::DiscoveredConfig;
use super::edits::{raw_patterns_for, RuleEdit};
use super::error::ScopeResult;
use super::matcher::PatternMatcher;
use super::rule::{PatternRule, RuleCompiler, RuleOrigin, RuleSource, Scope};
use crate::config::ScopeConfig;

/// Which rule sources take part in an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnorePolicy {
    /// Everything, minus whatever the legacy flags switch off.
    #[default]
    Auto,
    All,
    None,
    Defaults,
    Config,
    Cli,
}

impl IgnorePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            IgnorePolicy::Auto => "auto",
            IgnorePolicy::All => "all",
            IgnorePolicy::None => "none",
            IgnorePolicy::Defaults => "defaults",
            IgnorePolicy::Config => "config",
            IgnorePolicy::Cli => "cli",
        }
    }

    pub fn selection(self, legacy: LegacyIgnoreFlags) -> LayerSelection {
        match self {
            IgnorePolicy::Auto => LayerSelection {
                defaults: !(legacy.ignore_defaults || legacy.no_ignore),
                config: !(legacy.no_ignore_config || legacy.no_ignore),
                cli: true,
            },
            IgnorePolicy::All => LayerSelection::new(true, true, true),
            IgnorePolicy::None => LayerSelection::new(false, false, false),
            IgnorePolicy::Defaults => LayerSelection::new(true, false, false),
            IgnorePolicy::Config => LayerSelection::new(false, true, false),
            IgnorePolicy::Cli => LayerSelection::new(false, false, true),
        }
    }
}

impl fmt::Display for IgnorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IgnorePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(IgnorePolicy::Auto),
            "all" => Ok(IgnorePolicy::All),
            "none" => Ok(IgnorePolicy::None),
            "defaults" => Ok(IgnorePolicy::Defaults),
            "config" => Ok(IgnorePolicy::Config),
            "cli" => Ok(IgnorePolicy::Cli),
            other => Err(format!(
                "unknown ignore policy {other:?} (expected auto, all, none, defaults, config or cli)"
            )),
        }
    }
}

/// Older on/off switches that only matter under [`IgnorePolicy::Auto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LegacyIgnoreFlags {
    pub ignore_defaults: bool,
    pub no_ignore_config: bool,
    pub no_ignore: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSelection {
    pub defaults: bool,
    pub config: bool,
    pub cli: bool,
}

impl LayerSelection {
    pub fn new(defaults: bool, config: bool, cli: bool) -> Self {
        Self {
            defaults,
            config,
            cli,
        }
    }
}

/// The final ordered rules for one invocation, one list per scope.
///
/// Immutable once built. Rules appear in increasing `sequence_index` order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleLayer {
    tree: Vec<PatternRule>,
    content: Vec<PatternRule>,
}

impl RuleLayer {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rules(&self, scope: Scope) -> &[PatternRule] {
        match scope {
            Scope::Tree => &self.tree,
            Scope::Content => &self.content,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.len() + self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_negations(&self, scope: Scope) -> bool {
        self.rules(scope).iter().any(|r| r.negated)
    }

    /// Distinct config files that contributed at least one rule, in order.
    pub fn config_files(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::new();
        for rule in self.tree.iter().chain(self.content.iter()) {
            if let Some(path) = &rule.origin_config_path {
                if !out.contains(path) {
                    out.push(path.clone());
                }
            }
        }
        out
    }

    fn list_mut(&mut self, scope: Scope) -> &mut Vec<PatternRule> {
        match scope {
            Scope::Tree => &mut self.tree,
            Scope::Content => &mut self.content,
        }
    }
}

/// Concatenates defaults, discovered configs and CLI edits into a [`RuleLayer`].
pub struct RuleLayerBuilder<'a> {
    root: &'a Path,
    compiler: RuleCompiler<'a>,
    selection: LayerSelection,
    defaults: Option<&'a ScopeConfig>,
    configs: &'a [DiscoveredConfig],
    edits: &'a [RuleEdit],
}

impl<'a> RuleLayerBuilder<'a> {
    pub fn new(root: &'a Path, matcher: &'a dyn PatternMatcher) -> Self {
        Self {
            root,
            compiler: RuleCompiler::new(matcher),
            selection: LayerSelection::new(true, true, true),
            defaults: None,
            configs: &[],
            edits: &[],
        }
    }

    pub fn selection(mut self, selection: LayerSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn defaults(mut self, defaults: &'a ScopeConfig) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn configs(mut self, configs: &'a [DiscoveredConfig]) -> Self {
        self.configs = configs;
        self
    }

    pub fn edits(mut self, edits: &'a [RuleEdit]) -> Self {
        self.edits = edits;
        self
    }

    pub fn build(self) -> ScopeResult<RuleLayer> {
        let mut layer = RuleLayer::empty();
        for scope in Scope::ALL {
            self.build_scope(scope, &mut layer)?;
        }
        tracing::debug!(
            "Built rule layer: {} tree rules, {} content rules",
            layer.tree.len(),
            layer.content.len()
        );
        Ok(layer)
    }

    fn build_scope(&self, scope: Scope, layer: &mut RuleLayer) -> ScopeResult<()> {
        let rules = layer.list_mut(scope);

        if self.selection.defaults {
            if let Some(defaults) = self.defaults {
                let origin = RuleOrigin {
                    scope,
                    source: RuleSource::Defaults,
                    base_dir: self.root,
                    config_path: None,
                };
                self.append(rules, &defaults.patterns(scope), &origin)?;
            }
        }

        if self.selection.config {
            let mut seen: HashSet<&Path> = HashSet::new();
            for discovered in self.configs {
                if !seen.insert(discovered.path.as_path()) {
                    tracing::debug!(
                        "Skipping duplicate {} rules from {:?}",
                        scope,
                        discovered.path
                    );
                    continue;
                }
                let origin = RuleOrigin {
                    scope,
                    source: RuleSource::Config,
                    base_dir: &discovered.dir,
                    config_path: Some(&discovered.path),
                };
                self.append(rules, &discovered.config.patterns(scope), &origin)?;
            }
        }

        if self.selection.cli {
            let origin = RuleOrigin {
                scope,
                source: RuleSource::Cli,
                base_dir: self.root,
                config_path: None,
            };
            self.append(rules, &raw_patterns_for(self.edits, scope), &origin)?;
        }
        Ok(())
    }

    fn append(
        &self,
        rules: &mut Vec<PatternRule>,
        raw_patterns: &[String],
        origin: &RuleOrigin<'_>,
    ) -> ScopeResult<()> {
        for raw in raw_patterns {
            let index = rules.len();
            rules.push(self.compiler.compile(raw, origin, index)?);
        }
        Ok(())
    }
}
