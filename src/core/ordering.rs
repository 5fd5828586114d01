//! Canonical, platform-independent ordering of paths.
//!
//! Keys are built per path component from the NFC-normalized, case-folded
//! component text, with the NFC text itself as a tie-breaker. Comparing the
//! component sequences lexicographically places every directory directly
//! before its own descendants, so a single sort yields depth-first order with
//! sorted siblings.

use std::cmp::Ordering;
use std::path::{Component, Path};

use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ComponentKey {
    folded: String,
    normalized: String,
}

impl ComponentKey {
    fn new(raw: &str) -> Self {
        let normalized: String = raw.nfc().collect();
        let folded: String = caseless::default_case_fold_str(&normalized).nfc().collect();
        Self { folded, normalized }
    }
}

/// Sort key for one path relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderingKey {
    components: Vec<ComponentKey>,
}

impl OrderingKey {
    /// Key for `path`, made relative to `root` when it lies beneath it.
    pub fn for_path(root: &Path, path: &Path) -> Self {
        let relative = path.strip_prefix(root).unwrap_or(path);
        Self {
            components: path_segments(relative)
                .iter()
                .map(|s| ComponentKey::new(s))
                .collect(),
        }
    }

    /// Key for an already POSIX-relative path.
    pub fn from_relative(relative: &str) -> Self {
        Self {
            components: relative
                .split('/')
                .filter(|s| !s.is_empty())
                .map(ComponentKey::new)
                .collect(),
        }
    }

    pub fn depth(&self) -> usize {
        self.components.len()
    }
}

impl Ord for OrderingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for OrderingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// POSIX form of `path` relative to `base`, or `None` if `path` is not
/// `base` or one of its descendants. `base` itself maps to `""`.
pub fn relative_posix(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    if relative.components().any(|c| c == Component::ParentDir) {
        return None;
    }
    Some(path_segments(relative).join("/"))
}

/// Sorts paths in place by their [`OrderingKey`] under `root`.
pub fn sort_paths<P: AsRef<Path>>(root: &Path, paths: &mut [P]) {
    paths.sort_by_cached_key(|p| OrderingKey::for_path(root, p.as_ref()));
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}
