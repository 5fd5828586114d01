//! Read-only provenance reports for individual paths.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::{EntryError, ScopeError, ScopeResult};
use super::ordering::{relative_posix, OrderingKey};
use super::resolver::{Decision, Resolver};
use super::rule::RuleSource;
use crate::utils::file_detection::{detect_text, TextDetection};

/// Which rule, if any, produced a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// No rule matched; the path is included by default.
    NoRuleMatched,
    Rule {
        /// Pattern text with its polarity (`!` prefix when negated).
        pattern: String,
        negated: bool,
        source: RuleSource,
        base_dir: PathBuf,
        origin_config_path: Option<PathBuf>,
        sequence_index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionReport {
    pub included: bool,
    pub provenance: Provenance,
    /// The rule outcome was "include" but the file is hidden from the tree.
    pub gated_by_tree: bool,
}

impl From<&Decision> for DecisionReport {
    fn from(decision: &Decision) -> Self {
        let provenance = match &decision.winning_rule {
            None => Provenance::NoRuleMatched,
            Some(rule) => Provenance::Rule {
                pattern: rule.display_pattern(),
                negated: rule.negated,
                source: rule.source,
                base_dir: rule.base_dir.clone(),
                origin_config_path: rule.origin_config_path.clone(),
                sequence_index: rule.sequence_index,
            },
        };
        Self {
            included: decision.included,
            provenance,
            gated_by_tree: decision.suppressed_by_tree,
        }
    }
}

/// Everything known about one path's two decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainEntry {
    pub path: PathBuf,
    pub relative_path: String,
    pub is_dir: bool,
    pub tree: DecisionReport,
    /// Files only.
    pub content: Option<DecisionReport>,
    /// Reported for files whose content is included by the rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_detection: Option<TextDetection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EntryError>,
}

/// Explains decisions for arbitrary paths without walking the tree.
pub struct ExplainService<'a> {
    root: &'a Path,
    resolver: Resolver<'a>,
}

impl<'a> ExplainService<'a> {
    pub fn new(root: &'a Path, resolver: Resolver<'a>) -> Self {
        Self { root, resolver }
    }

    /// Explains one path. Relative paths are taken from the repository root;
    /// a path outside the root is rejected.
    pub fn explain(&self, path: &Path) -> ScopeResult<ExplainEntry> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let Some(relative_path) = relative_posix(&absolute, self.root) else {
            return Err(ScopeError::OutsideRoot {
                path: absolute,
                root: self.root.to_path_buf(),
            });
        };
        let metadata = fs::symlink_metadata(&absolute).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScopeError::PathNotFound(absolute.clone()),
            _ => ScopeError::io(e, &absolute),
        })?;
        let is_dir = metadata.is_dir();

        let (tree, content) = self.resolver.resolve_entry(&absolute, is_dir);

        let mut error = None;
        let text_detection = match &content {
            Some(decision) if decision.included && metadata.is_file() => {
                match detect_text(&absolute) {
                    Ok(detection) => Some(detection),
                    Err(e) => {
                        error = Some(EntryError::from_io(&absolute, &e));
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(ExplainEntry {
            relative_path,
            path: absolute,
            is_dir,
            tree: DecisionReport::from(&tree),
            content: content.as_ref().map(DecisionReport::from),
            text_detection,
            error,
        })
    }

    /// Explains several paths, ordered by [`OrderingKey`].
    pub fn explain_many<P: AsRef<Path>>(&self, paths: &[P]) -> ScopeResult<Vec<ExplainEntry>> {
        let mut entries = paths
            .iter()
            .map(|p| self.explain(p.as_ref()))
            .collect::<ScopeResult<Vec<_>>>()?;
        entries.sort_by_cached_key(|e| OrderingKey::for_path(self.root, &e.path));
        entries.dedup_by(|a, b| a.path == b.path);
        Ok(entries)
    }
}

/// Renders entries as the plain-text report shown to users.
pub fn render_human(entries: &[ExplainEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let shown = if entry.relative_path.is_empty() {
            "."
        } else {
            entry.relative_path.as_str()
        };
        let suffix = if entry.is_dir { "/" } else { "" };
        out.push_str(&format!("Path: {shown}{suffix}\n"));
        push_report(&mut out, "tree", &entry.tree);
        match &entry.content {
            Some(report) => push_report(&mut out, "content", report),
            None => out.push_str("  content: n/a (directory)\n"),
        }
        if let Some(detection) = &entry.text_detection {
            if !detection.is_text {
                let detail = detection.detail.as_deref().unwrap_or("binary file");
                out.push_str(&format!("  text detection: binary ({detail})\n"));
            }
        }
        if let Some(error) = &entry.error {
            out.push_str(&format!("  error: {}\n", error.message));
        }
    }
    out
}

/// Renders entries as pretty JSON followed by a newline.
pub fn render_json(entries: &[ExplainEntry]) -> serde_json::Result<String> {
    let mut text = serde_json::to_string_pretty(entries)?;
    text.push('\n');
    Ok(text)
}

fn push_report(out: &mut String, label: &str, report: &DecisionReport) {
    let verdict = if report.included { "included" } else { "excluded" };
    out.push_str(&format!("  {label}: {verdict}\n"));

    match &report.provenance {
        Provenance::NoRuleMatched => {
            out.push_str("    reason: no rule matched, default include\n");
        }
        Provenance::Rule {
            pattern,
            source,
            base_dir,
            origin_config_path,
            ..
        } => {
            let mut parts = vec![
                format!("pattern={pattern}"),
                format!("source={source}"),
                format!("base={}", base_dir.display()),
            ];
            if let Some(config) = origin_config_path {
                parts.push(format!("config={}", config.display()));
            }
            out.push_str(&format!("    reason: {}\n", parts.join("; ")));
        }
    }
    if report.gated_by_tree {
        out.push_str("    note: hidden from tree, content not captured\n");
    }
}
