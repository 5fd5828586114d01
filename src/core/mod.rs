pub mod discovery;
pub mod edits;
pub mod error;
pub mod explain;
pub mod layer;
pub mod matcher;
pub mod ordering;
pub mod resolver;
pub mod rule;
pub mod session;
pub mod traversal;
pub mod tree_generator;

pub use discovery::{ConfigDiscovery, DiscoveredConfig, RepositoryRoot, RootKind};
pub use edits::{EditAction, EditScopes, RuleEdit};
pub use error::{EntryError, EntryErrorKind, ScopeError, ScopeResult};
pub use explain::{render_human, render_json, DecisionReport, ExplainEntry, ExplainService, Provenance};
pub use layer::{IgnorePolicy, LayerSelection, LegacyIgnoreFlags, RuleLayer, RuleLayerBuilder};
pub use matcher::{GitignoreMatcher, PatternMatcher};
pub use ordering::OrderingKey;
pub use resolver::{resolve, Decision, Resolver};
pub use rule::{PatternRule, RuleCompiler, RuleSource, Scope};
pub use session::{ScopeRequest, ScopeSession};
pub use traversal::{TraversalEngine, TraversalNode, TraversalReport};
pub use tree_generator::TreeGenerator;
