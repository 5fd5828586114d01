//! Generates an ASCII representation of the visible tree.

use std::collections::HashMap;
use std::path::Path;

use super::traversal::{TraversalNode, TraversalReport};

/// A utility struct for generating an ASCII directory tree.
///
/// This struct is stateless and provides methods as associated functions.
pub struct TreeGenerator;

impl TreeGenerator {
    /// Renders every visible node of `report` below a `root/` header line.
    ///
    /// Directories carry a trailing `/`. Siblings keep the report's canonical
    /// order, so the output is stable across platforms.
    pub fn generate_tree(report: &TraversalReport) -> String {
        Self::render(&report.root, report.visible_nodes())
    }

    /// Renders an arbitrary node list; nodes must be in canonical order.
    pub fn render<'a>(root: &Path, nodes: impl IntoIterator<Item = &'a TraversalNode>) -> String {
        let mut tree_map: HashMap<String, TreeNode> = HashMap::new();
        let mut top_level: Vec<String> = Vec::new();

        for node in nodes {
            if node.relative_path.is_empty() {
                continue;
            }
            Self::insert_into_tree(&mut tree_map, &mut top_level, &node.relative_path, node.is_dir);
        }

        let mut result = String::new();
        result.push_str(&format!(
            "{}/\n",
            root.file_name().unwrap_or_default().to_string_lossy()
        ));
        Self::render_children(&tree_map, &top_level, &mut result, "");
        result
    }

    /// Inserts a relative path, synthesizing any missing parent directories.
    fn insert_into_tree(
        tree_map: &mut HashMap<String, TreeNode>,
        top_level: &mut Vec<String>,
        relative_path: &str,
        is_dir: bool,
    ) {
        let mut current = String::new();
        let mut parent: Option<String> = None;
        let segments: Vec<&str> = relative_path.split('/').collect();

        for (i, segment) in segments.iter().enumerate() {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            let is_final = i == segments.len() - 1;

            if !tree_map.contains_key(&current) {
                tree_map.insert(
                    current.clone(),
                    TreeNode {
                        name: segment.to_string(),
                        is_directory: if is_final { is_dir } else { true },
                        children: Vec::new(),
                    },
                );
                match parent.as_ref().and_then(|p| tree_map.get_mut(p)) {
                    Some(parent_node) => parent_node.children.push(current.clone()),
                    None => top_level.push(current.clone()),
                }
            }
            parent = Some(current.clone());
        }
    }

    /// Renders the children of a tree node.
    fn render_children(
        tree_map: &HashMap<String, TreeNode>,
        children: &[String],
        result: &mut String,
        prefix: &str,
    ) {
        for (i, key) in children.iter().enumerate() {
            let Some(node) = tree_map.get(key) else {
                continue;
            };
            let is_last = i == children.len() - 1;

            let connector = if is_last { "└── " } else { "├── " };
            let suffix = if node.is_directory { "/" } else { "" };
            result.push_str(&format!("{prefix}{connector}{}{suffix}\n", node.name));

            if !node.children.is_empty() {
                let new_prefix = if is_last {
                    format!("{prefix}    ")
                } else {
                    format!("{prefix}│   ")
                };
                Self::render_children(tree_map, &node.children, result, &new_prefix);
            }
        }
    }
}

/// A transient node used for building the ASCII tree.
#[derive(Debug, Clone)]
struct TreeNode {
    name: String,
    is_directory: bool,
    children: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::edits::RuleEdit;
    use crate::core::layer::RuleLayerBuilder;
    use crate::core::matcher::GitignoreMatcher;
    use crate::core::resolver::Resolver;
    use crate::core::traversal::TraversalEngine;
    use crate::utils::test_helpers::ProjectFixture;

    #[test]
    fn renders_visible_nodes_with_forced_ancestors() {
        let fx = ProjectFixture::new();
        fx.create_file("README.md", "# hi");
        fx.create_file("src/main.rs", "fn main() {}");
        fx.create_file("vendor/lib/keep.txt", "keep");
        fx.create_file("vendor/lib/drop.txt", "drop");
        let matcher = GitignoreMatcher::new();
        let edits = vec![
            RuleEdit::exclude_tree(0, "vendor/"),
            RuleEdit::include_tree(1, "vendor/lib/keep.txt"),
        ];
        let layer = RuleLayerBuilder::new(fx.root(), &matcher)
            .edits(&edits)
            .build()
            .unwrap();
        let engine = TraversalEngine::new(fx.root(), Resolver::new(&layer, &matcher));
        let report = engine.walk(&[fx.root().to_path_buf()]).unwrap();

        let rendered = TreeGenerator::generate_tree(&report);
        let body: Vec<&str> = rendered.lines().skip(1).collect();
        assert_eq!(
            body,
            vec![
                "├── README.md",
                "├── src/",
                "│   └── main.rs",
                "└── vendor/",
                "    └── lib/",
                "        └── keep.txt",
            ]
        );
        assert!(rendered.starts_with(&format!(
            "{}/\n",
            fx.root().file_name().unwrap().to_string_lossy()
        )));
    }

    #[test]
    fn empty_report_renders_only_the_root() {
        let fx = ProjectFixture::new();
        let matcher = GitignoreMatcher::new();
        let layer = RuleLayerBuilder::new(fx.root(), &matcher).build().unwrap();
        let engine = TraversalEngine::new(fx.root(), Resolver::new(&layer, &matcher));
        let report = engine.walk(&[fx.root().to_path_buf()]).unwrap();

        assert_eq!(TreeGenerator::generate_tree(&report).lines().count(), 1);
    }
}
