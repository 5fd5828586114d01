//! End-to-end tests for session preparation, traversal and explain reports.
//!
//! Each test builds a throwaway Git-style project on disk and drives it
//! through the public `ScopeSession` facade.

use grobl_scope::config::{ScopeConfig, LEGACY_CONFIG_FILE};
use grobl_scope::core::{
    render_human, render_json, IgnorePolicy, Provenance, RuleEdit, RuleSource, ScopeError,
    ScopeRequest, ScopeSession, TreeGenerator,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Contains the test infrastructure.
mod helpers {
    use super::*;
    use std::fs;
    use std::sync::Once;

    static LOGGING_INIT: Once = Once::new();

    /// Initializes the tracing subscriber once per test binary.
    pub fn setup_test_logging() {
        LOGGING_INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init()
                .ok();
        });
    }

    /// `TestHarness` sets up an isolated repository for each test case.
    pub struct TestHarness {
        pub root: PathBuf,
        _temp_dir: TempDir,
    }

    impl TestHarness {
        /// Creates an empty repository with a `.git` directory at its root.
        pub fn new() -> Self {
            setup_test_logging();
            let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
            let root = fs::canonicalize(temp_dir.path()).expect("Failed to canonicalize root");
            fs::create_dir(root.join(".git")).expect("Failed to create .git");
            Self {
                root,
                _temp_dir: temp_dir,
            }
        }

        pub fn write(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent dirs");
            }
            fs::write(&path, content).expect("Failed to write file");
            path
        }

        pub fn request(&self) -> ScopeRequest {
            ScopeRequest::new(&self.root)
        }

        /// A request that starts from no default rules at all.
        pub fn bare_request(&self) -> ScopeRequest {
            self.request().defaults(ScopeConfig::default())
        }
    }
}

use helpers::TestHarness;

fn visible_paths(session: &ScopeSession) -> Vec<String> {
    session
        .traverse()
        .unwrap()
        .visible_nodes()
        .map(|n| n.relative_path.clone())
        .collect()
}

#[test]
fn nested_negation_surfaces_file_inside_default_excluded_directory() {
    let h = TestHarness::new();
    h.write("pkg/.grobl.toml", "exclude_tree = [\"!node_modules/keep.txt\"]\n");
    h.write("pkg/node_modules/keep.txt", "keep");
    h.write("pkg/node_modules/other.txt", "other");
    h.write("pkg/index.js", "");

    let session = ScopeSession::prepare(h.request().target("pkg")).unwrap();
    assert_eq!(session.configs().len(), 1);
    let report = session.traverse().unwrap();

    let dir = report.find("pkg/node_modules").unwrap();
    assert!(!dir.tree_decision.included);
    assert!(dir.forced_tree_include);
    assert!(dir.is_visible());

    let keep = report.find("pkg/node_modules/keep.txt").unwrap();
    assert!(keep.tree_decision.included);
    assert_eq!(
        keep.tree_decision.winning_rule.as_ref().unwrap().base_dir,
        h.root.join("pkg")
    );
    assert!(!report.find("pkg/node_modules/other.txt").unwrap().is_visible());

    let tree = TreeGenerator::generate_tree(&report);
    assert!(tree.contains("node_modules/\n"));
    assert!(tree.contains("keep.txt\n"));
    assert!(!tree.contains("other.txt"));
    assert!(!tree.contains(".git/"));
}

#[test]
fn config_below_the_scan_target_stays_inert() {
    let h = TestHarness::new();
    h.write("pkg/.grobl.toml", "exclude_tree = [\"!node_modules/keep.txt\"]\n");
    h.write("pkg/node_modules/keep.txt", "keep");

    let session = ScopeSession::prepare(h.request()).unwrap();
    assert!(session.configs().is_empty());
    let report = session.traverse().unwrap();

    let dir = report.find("pkg/node_modules").unwrap();
    assert!(!dir.forced_tree_include);
    assert!(!dir.is_visible());
    assert!(!report.find("pkg/node_modules/keep.txt").unwrap().is_visible());
}

#[test]
fn cli_rule_overrides_earlier_config_negation() {
    let h = TestHarness::new();
    h.write(".grobl.toml", "exclude_content = [\"!docs/**\"]\n");
    h.write("docs/guide.md", "# guide");
    h.write("docs/notes.txt", "notes");

    let session =
        ScopeSession::prepare(h.request().edit(RuleEdit::exclude_content(0, "*.md"))).unwrap();
    let report = session.traverse().unwrap();

    let guide = report.find("docs/guide.md").unwrap();
    let content = guide.content_decision.as_ref().unwrap();
    assert!(!content.included);
    assert_eq!(content.winning_rule.as_ref().unwrap().source, RuleSource::Cli);
    assert!(guide.is_visible());

    let notes = report.find("docs/notes.txt").unwrap();
    let content = notes.content_decision.as_ref().unwrap();
    assert!(content.included);
    assert_eq!(content.winning_rule.as_ref().unwrap().source, RuleSource::Config);
}

#[test]
fn explain_reports_default_include_sentinel() -> anyhow::Result<()> {
    let h = TestHarness::new();
    h.write("src/app.py", "print('hello')\n");

    let session = ScopeSession::prepare(h.bare_request())?;
    let entry = session.explain(Path::new("src/app.py"))?;

    assert_eq!(entry.tree.provenance, Provenance::NoRuleMatched);
    let content = entry.content.as_ref().ok_or_else(|| anyhow::anyhow!("file has no content report"))?;
    assert_eq!(content.provenance, Provenance::NoRuleMatched);

    let human = render_human(std::slice::from_ref(&entry));
    assert!(human.starts_with("Path: src/app.py\n"));
    assert_eq!(human.matches("no rule matched, default include").count(), 2);

    let json: serde_json::Value = serde_json::from_str(&render_json(&[entry])?)?;
    assert_eq!(json[0]["content"]["provenance"]["kind"], "no_rule_matched");
    Ok(())
}

#[test]
fn shared_ancestor_config_contributes_once() {
    let h = TestHarness::new();
    h.write(".grobl.toml", "exclude_tree = [\"*.tmp\"]\n");
    h.write("pkg/.grobl.toml", "exclude_tree = [\"*.bak\"]\n");
    h.write("pkg/a/one.txt", "");
    h.write("pkg/b/two.txt", "");

    let session =
        ScopeSession::prepare(h.request().target("pkg/a").target("pkg/b")).unwrap();

    let configs: Vec<PathBuf> = session.configs().iter().map(|c| c.path.clone()).collect();
    assert_eq!(
        configs,
        vec![h.root.join(".grobl.toml"), h.root.join("pkg/.grobl.toml")]
    );
    assert_eq!(session.layer().config_files().len(), 2);

    let visible = visible_paths(&session);
    assert_eq!(
        visible,
        vec!["pkg", "pkg/a", "pkg/a/one.txt", "pkg/b", "pkg/b/two.txt"]
    );
}

#[test]
fn legacy_config_name_is_discovered() {
    let h = TestHarness::new();
    h.write(LEGACY_CONFIG_FILE, "exclude_tree = [\"secret/\"]\n");
    h.write("secret/key.txt", "");
    h.write("main.rs", "");

    let session = ScopeSession::prepare(h.bare_request()).unwrap();
    assert_eq!(session.configs().len(), 1);
    let visible = visible_paths(&session);
    assert!(visible.contains(&"main.rs".to_string()));
    assert!(!visible.iter().any(|p| p.starts_with("secret")));
}

#[test]
fn malformed_config_aborts_preparation() {
    let h = TestHarness::new();
    h.write(".grobl.toml", "exclude_tree = [\n");
    h.write("a.txt", "");

    let result = ScopeSession::prepare(h.request());
    assert!(matches!(result, Err(ScopeError::ConfigParse { .. })));
}

#[test]
fn missing_explicit_config_aborts_preparation() {
    let h = TestHarness::new();
    let result = ScopeSession::prepare(h.request().explicit_config(h.root.join("nope.toml")));
    assert!(matches!(result, Err(ScopeError::Config { .. })));
}

#[test]
fn none_policy_shows_everything() {
    let h = TestHarness::new();
    h.write(".grobl.toml", "exclude_tree = [\"*.txt\"]\n");
    h.write("node_modules/a.txt", "");

    let session = ScopeSession::prepare(
        h.request()
            .policy(IgnorePolicy::None)
            .edit(RuleEdit::exclude(0, "**")),
    )
    .unwrap();
    assert!(session.layer().is_empty());
    assert!(visible_paths(&session).contains(&"node_modules/a.txt".to_string()));
}

#[test]
fn content_is_never_captured_for_hidden_files() {
    let h = TestHarness::new();
    h.write(".grobl.toml", "exclude_tree = [\"build/\", \"*.gen.rs\"]\nexclude_content = [\"!**\"]\n");
    h.write("build/out.txt", "");
    h.write("src/lib.gen.rs", "");
    h.write("src/lib.rs", "");
    h.write("README.md", "");

    let session = ScopeSession::prepare(h.bare_request()).unwrap();
    let report = session.traverse().unwrap();

    for node in report.nodes() {
        if node.content_included() {
            assert!(node.tree_decision.included, "{} leaked", node.relative_path);
        }
    }
    let hidden = report.find("src/lib.gen.rs").unwrap();
    assert!(hidden.content_decision.as_ref().unwrap().suppressed_by_tree);

    let captured: Vec<&str> = report.content_files().map(|n| n.relative_path.as_str()).collect();
    assert_eq!(captured, vec![".grobl.toml", "README.md", "src/lib.rs"]);
}
