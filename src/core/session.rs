//! One invocation's worth of resolved state: root, configs and rules.

use std::path::{Path, PathBuf};

use super::discovery::{absolutize_target, ConfigDiscovery, DiscoveredConfig, RepositoryRoot};
use super::edits::RuleEdit;
use super::error::{ScopeError, ScopeResult};
use super::explain::{ExplainEntry, ExplainService};
use super::layer::{IgnorePolicy, LayerSelection, LegacyIgnoreFlags, RuleLayer, RuleLayerBuilder};
use super::matcher::GitignoreMatcher;
use super::resolver::Resolver;
use super::traversal::{TraversalEngine, TraversalReport};
use crate::config::ScopeConfig;

/// Inputs for [`ScopeSession::prepare`].
#[derive(Debug, Clone, Default)]
pub struct ScopeRequest {
    pub cwd: PathBuf,
    /// Scan targets, relative to `cwd` or absolute. Empty means `cwd`.
    pub targets: Vec<PathBuf>,
    pub policy: IgnorePolicy,
    pub legacy: LegacyIgnoreFlags,
    pub edits: Vec<RuleEdit>,
    pub explicit_config: Option<PathBuf>,
    /// Bundled defaults are used when unset.
    pub defaults: Option<ScopeConfig>,
}

impl ScopeRequest {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Self::default()
        }
    }

    pub fn target(mut self, target: impl Into<PathBuf>) -> Self {
        self.targets.push(target.into());
        self
    }

    pub fn policy(mut self, policy: IgnorePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn legacy(mut self, legacy: LegacyIgnoreFlags) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn edit(mut self, edit: RuleEdit) -> Self {
        self.edits.push(edit);
        self
    }

    pub fn explicit_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_config = Some(path.into());
        self
    }

    pub fn defaults(mut self, defaults: ScopeConfig) -> Self {
        self.defaults = Some(defaults);
        self
    }
}

/// Everything the traversal and explain operations share.
pub struct ScopeSession {
    cwd: PathBuf,
    root: RepositoryRoot,
    targets: Vec<PathBuf>,
    selection: LayerSelection,
    defaults: ScopeConfig,
    edits: Vec<RuleEdit>,
    explicit_config: Option<PathBuf>,
    configs: Vec<DiscoveredConfig>,
    layer: RuleLayer,
    matcher: GitignoreMatcher,
}

impl ScopeSession {
    /// Validates targets, resolves the root, discovers configs and builds the
    /// rule layer. Any failure here aborts the invocation.
    pub fn prepare(request: ScopeRequest) -> ScopeResult<Self> {
        let cwd = request.cwd;
        let raw_targets = if request.targets.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            request.targets
        };
        let targets = raw_targets
            .iter()
            .map(|t| absolutize_target(&cwd, t))
            .collect::<ScopeResult<Vec<_>>>()?;

        let root = RepositoryRoot::resolve(&cwd, &targets)?;
        tracing::info!("Repository root {:?} ({:?})", root.path, root.kind);

        let mut session = Self {
            cwd,
            root,
            targets: Vec::new(),
            selection: request.policy.selection(request.legacy),
            defaults: request.defaults.unwrap_or_else(ScopeConfig::bundled_defaults),
            edits: request.edits,
            explicit_config: request.explicit_config,
            configs: Vec::new(),
            layer: RuleLayer::empty(),
            matcher: GitignoreMatcher::new(),
        };
        session.configs = session.discover(&targets)?;
        session.layer = session.build_layer(&session.configs)?;
        session.targets = targets;
        tracing::info!(
            "Session ready: policy {}, {} config file(s), {} rule(s)",
            request.policy,
            session.configs.len(),
            session.layer.len()
        );
        Ok(session)
    }

    pub fn root(&self) -> &RepositoryRoot {
        &self.root
    }

    pub fn targets(&self) -> &[PathBuf] {
        &self.targets
    }

    pub fn configs(&self) -> &[DiscoveredConfig] {
        &self.configs
    }

    pub fn layer(&self) -> &RuleLayer {
        &self.layer
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.layer, &self.matcher)
    }

    pub fn traverse(&self) -> ScopeResult<TraversalReport> {
        TraversalEngine::new(&self.root.path, self.resolver()).walk(&self.targets)
    }

    /// Explains `path`, taken relative to the working directory.
    pub fn explain(&self, path: &Path) -> ScopeResult<ExplainEntry> {
        self.explain_many(&[path])?
            .pop()
            .ok_or_else(|| ScopeError::PathNotFound(path.to_path_buf()))
    }

    /// Explains `paths` against configs discovered along their own lineage,
    /// not the scan targets'. Every path must lie under the repository root.
    pub fn explain_many<P: AsRef<Path>>(&self, paths: &[P]) -> ScopeResult<Vec<ExplainEntry>> {
        let absolute = paths
            .iter()
            .map(|p| absolutize_target(&self.cwd, p.as_ref()))
            .collect::<ScopeResult<Vec<_>>>()?;
        if let Some(stray) = absolute.iter().find(|p| !p.starts_with(&self.root.path)) {
            return Err(ScopeError::OutsideRoot {
                path: stray.clone(),
                root: self.root.path.clone(),
            });
        }

        let configs = self.discover(&absolute)?;
        let layer = self.build_layer(&configs)?;
        ExplainService::new(&self.root.path, Resolver::new(&layer, &self.matcher))
            .explain_many(&absolute)
    }

    fn discover(&self, paths: &[PathBuf]) -> ScopeResult<Vec<DiscoveredConfig>> {
        if !self.selection.config {
            return Ok(Vec::new());
        }
        ConfigDiscovery::new(&self.root.path).discover(paths, self.explicit_config.as_deref())
    }

    fn build_layer(&self, configs: &[DiscoveredConfig]) -> ScopeResult<RuleLayer> {
        RuleLayerBuilder::new(&self.root.path, &self.matcher)
            .selection(self.selection)
            .defaults(&self.defaults)
            .configs(configs)
            .edits(&self.edits)
            .build()
    }
}
