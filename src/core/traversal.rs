//! Full, non-pruning walk of the scan targets.
//!
//! Every directory is descended into whatever its own tree decision says, so
//! that a negated rule deep inside an excluded subtree can still surface a
//! file. Once a directory's subtree is known, the directory is marked as
//! forced-visible if it is excluded but something beneath it is included.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use super::error::{EntryError, ScopeError, ScopeResult};
use super::ordering::{relative_posix, OrderingKey};
use super::resolver::{Decision, Resolver};

/// One filesystem entry visited during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraversalNode {
    pub absolute_path: PathBuf,
    /// POSIX path relative to the repository root.
    pub relative_path: String,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub tree_decision: Decision,
    /// Files only. Already gated by the tree decision.
    pub content_decision: Option<Decision>,
    pub forced_tree_include: bool,
    pub error: Option<EntryError>,
}

impl TraversalNode {
    /// Whether a renderer should show this entry.
    pub fn is_visible(&self) -> bool {
        self.tree_decision.included || self.forced_tree_include
    }

    /// Whether this file's contents may be captured.
    pub fn content_included(&self) -> bool {
        self.content_decision
            .as_ref()
            .is_some_and(|d| d.included && self.tree_decision.included)
    }
}

/// The ordered result of one walk.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalReport {
    pub root: PathBuf,
    nodes: Vec<TraversalNode>,
}

impl TraversalReport {
    /// All nodes, in [`OrderingKey`] order.
    pub fn nodes(&self) -> &[TraversalNode] {
        &self.nodes
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &TraversalNode> {
        self.nodes.iter().filter(|n| n.is_visible())
    }

    pub fn content_files(&self) -> impl Iterator<Item = &TraversalNode> {
        self.nodes.iter().filter(|n| n.content_included())
    }

    pub fn errors(&self) -> impl Iterator<Item = &EntryError> {
        self.nodes.iter().filter_map(|n| n.error.as_ref())
    }

    pub fn find(&self, relative_path: &str) -> Option<&TraversalNode> {
        self.nodes.iter().find(|n| n.relative_path == relative_path)
    }
}

/// A directory entry as listed, before any decision is made.
#[derive(Debug)]
struct Entry {
    path: PathBuf,
    is_dir: bool,
    is_symlink: bool,
    error: Option<EntryError>,
}

/// A visited entry followed by its descendants, pre-order.
struct Subtree {
    nodes: Vec<TraversalNode>,
    any_tree_included: bool,
}

pub struct TraversalEngine<'a> {
    root: &'a Path,
    resolver: Resolver<'a>,
}

impl<'a> TraversalEngine<'a> {
    pub fn new(root: &'a Path, resolver: Resolver<'a>) -> Self {
        Self { root, resolver }
    }

    /// Walks every target and returns the merged, ordered node list.
    ///
    /// A target that cannot be inspected or listed is fatal. Failures below
    /// a target are recorded on the affected node.
    pub fn walk(&self, targets: &[PathBuf]) -> ScopeResult<TraversalReport> {
        tracing::info!(
            "Starting traversal of {} target(s) under {:?}",
            targets.len(),
            self.root
        );

        let mut nodes: Vec<TraversalNode> = Vec::new();
        let mut ancestors: Vec<TraversalNode> = Vec::new();
        for target in targets {
            let (target_ancestors, walked) = self.walk_target(target)?;
            ancestors.extend(target_ancestors);
            nodes.extend(walked);
        }
        // A directory walked for one target outranks the same directory
        // synthesized as another target's ancestor.
        let walked: HashSet<PathBuf> = nodes.iter().map(|n| n.absolute_path.clone()).collect();
        nodes.extend(ancestors.into_iter().filter(|a| !walked.contains(&a.absolute_path)));

        nodes.sort_by_cached_key(|n| OrderingKey::from_relative(&n.relative_path));
        let mut seen: HashSet<PathBuf> = HashSet::new();
        nodes.retain(|n| seen.insert(n.absolute_path.clone()));
        reconcile_ancestors(&mut nodes);

        let errors = nodes.iter().filter(|n| n.error.is_some()).count();
        tracing::info!(
            "Traversal completed: {} entries, {} visible, {} with errors",
            nodes.len(),
            nodes.iter().filter(|n| n.is_visible()).count(),
            errors
        );

        Ok(TraversalReport {
            root: self.root.to_path_buf(),
            nodes,
        })
    }

    /// Returns the synthesized ancestors of `target` and the walked nodes.
    fn walk_target(&self, target: &Path) -> ScopeResult<(Vec<TraversalNode>, Vec<TraversalNode>)> {
        let metadata = fs::symlink_metadata(target).map_err(|e| ScopeError::io(e, target))?;
        let is_symlink = metadata.file_type().is_symlink();
        let is_dir = metadata.is_dir();

        let ancestors = self.ancestor_nodes(target);
        let mut nodes = Vec::new();

        if !is_dir {
            let entry = Entry {
                path: target.to_path_buf(),
                is_dir: false,
                is_symlink,
                error: None,
            };
            nodes.extend(self.visit(entry).nodes);
            return Ok((ancestors, nodes));
        }

        let children = list_children(self.root, target).map_err(|e| ScopeError::io(e, target))?;
        let subtrees: Vec<Subtree> = children.into_par_iter().map(|c| self.visit(c)).collect();
        let any_included = subtrees.iter().any(|s| s.any_tree_included);

        if target != self.root {
            let (tree_decision, _) = self.resolver.resolve_entry(target, true);
            let forced_tree_include = !tree_decision.included && any_included;
            nodes.push(self.node(target, true, false, tree_decision, None, forced_tree_include, None));
        }
        nodes.extend(subtrees.into_iter().flat_map(|s| s.nodes));
        Ok((ancestors, nodes))
    }

    /// Nodes for the directories strictly between the root and `target`.
    fn ancestor_nodes(&self, target: &Path) -> Vec<TraversalNode> {
        let mut ancestors: Vec<&Path> = target
            .ancestors()
            .skip(1)
            .take_while(|a| *a != self.root && a.starts_with(self.root))
            .collect();
        ancestors.reverse();
        ancestors
            .into_iter()
            .map(|dir| {
                let (tree_decision, _) = self.resolver.resolve_entry(dir, true);
                self.node(dir, true, false, tree_decision, None, false, None)
            })
            .collect()
    }

    fn visit(&self, entry: Entry) -> Subtree {
        let (tree_decision, content_decision) = self.resolver.resolve_entry(&entry.path, entry.is_dir);
        let mut any_tree_included = tree_decision.included;

        if !entry.is_dir || entry.is_symlink {
            let node = self.node(
                &entry.path,
                entry.is_dir,
                entry.is_symlink,
                tree_decision,
                content_decision,
                false,
                entry.error,
            );
            return Subtree {
                nodes: vec![node],
                any_tree_included,
            };
        }

        let mut error = entry.error;
        let subtrees: Vec<Subtree> = match list_children(self.root, &entry.path) {
            Ok(children) => children.into_par_iter().map(|c| self.visit(c)).collect(),
            Err(e) => {
                tracing::warn!("Unable to read directory {:?}: {}", entry.path, e);
                error = Some(EntryError::from_io(&entry.path, &e));
                Vec::new()
            }
        };

        let descendant_included = subtrees.iter().any(|s| s.any_tree_included);
        let forced_tree_include = !tree_decision.included && descendant_included;
        any_tree_included |= descendant_included;

        let mut nodes = Vec::with_capacity(1 + subtrees.iter().map(|s| s.nodes.len()).sum::<usize>());
        nodes.push(self.node(
            &entry.path,
            true,
            false,
            tree_decision,
            None,
            forced_tree_include,
            error,
        ));
        nodes.extend(subtrees.into_iter().flat_map(|s| s.nodes));

        Subtree {
            nodes,
            any_tree_included,
        }
    }

    #[allow(clippy::too_many_arguments)] // all fields of the node, built in one place
    fn node(
        &self,
        path: &Path,
        is_dir: bool,
        is_symlink: bool,
        tree_decision: Decision,
        content_decision: Option<Decision>,
        forced_tree_include: bool,
        error: Option<EntryError>,
    ) -> TraversalNode {
        TraversalNode {
            absolute_path: path.to_path_buf(),
            relative_path: relative_posix(path, self.root)
                .unwrap_or_else(|| path.to_string_lossy().replace('\\', "/")),
            is_dir,
            is_symlink,
            tree_decision,
            content_decision,
            forced_tree_include,
            error,
        }
    }
}

/// Lists the immediate children of `dir`, sorted by [`OrderingKey`].
///
/// Symlinks are reported as such and never followed.
fn list_children(root: &Path, dir: &Path) -> std::io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for item in fs::read_dir(dir)? {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                continue;
            }
        };
        let path = item.path();
        let entry = match item.file_type() {
            Ok(ft) => Entry {
                path,
                is_dir: ft.is_dir(),
                is_symlink: ft.is_symlink(),
                error: None,
            },
            Err(e) => {
                tracing::warn!("Unable to stat {:?}: {}", path, e);
                let error = Some(EntryError::from_io(&path, &e));
                Entry {
                    path,
                    is_dir: false,
                    is_symlink: false,
                    error,
                }
            }
        };
        entries.push(entry);
    }
    entries.sort_by_cached_key(|e| OrderingKey::for_path(root, &e.path));
    Ok(entries)
}

/// Forces excluded directories visible when any descendant in the merged list
/// is tree-included. Needed for ancestors synthesized between the root and a
/// nested target, whose subtrees were not walked as a whole.
fn reconcile_ancestors(nodes: &mut [TraversalNode]) {
    let index: HashMap<String, usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_dir)
        .map(|(i, n)| (n.relative_path.clone(), i))
        .collect();

    let included: Vec<String> = nodes
        .iter()
        .filter(|n| n.tree_decision.included)
        .map(|n| n.relative_path.clone())
        .collect();

    for relative in included {
        let mut current = relative.as_str();
        while let Some((parent, _)) = current.rsplit_once('/') {
            if let Some(&i) = index.get(parent) {
                let node = &mut nodes[i];
                if !node.tree_decision.included {
                    node.forced_tree_include = true;
                }
            }
            current = parent;
        }
    }
}
