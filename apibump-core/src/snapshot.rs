//! Source snapshots and the providers that resolve them.
//!
//! A [`Snapshot`] is the set of files under a domain's paths at one
//! reference. The core never performs I/O itself: it asks a
//! [`SnapshotProvider`] for snapshots and treats them as read-only.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;

use crate::error::{CoreError, CoreResult};

/// File contents of one domain at one reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    reference: String,
    roots: Vec<String>,
    files: BTreeMap<String, Vec<u8>>,
}

impl Snapshot {
    pub fn new(reference: impl Into<String>, roots: &[String]) -> Self {
        Self {
            reference: reference.into(),
            roots: roots.iter().map(|r| normalize_root(r)).collect(),
            files: BTreeMap::new(),
        }
    }

    /// Add a file. Paths use `/` separators and are relative to the
    /// repository root.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Files in path order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The longest requested root containing `path`.
    pub fn root_for(&self, path: &str) -> Option<&str> {
        self.roots
            .iter()
            .filter(|root| is_under(path, root))
            .max_by_key(|root| root.len())
            .map(|r| r.as_str())
    }
}

/// Strip `./` and trailing slashes; `.` becomes the empty root.
pub fn normalize_root(root: &str) -> String {
    let trimmed = root.trim_start_matches("./").trim_end_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Whether `path` equals `root` or lies beneath it.
pub fn is_under(path: &str, root: &str) -> bool {
    root.is_empty()
        || path == root
        || (path.starts_with(root) && path.as_bytes().get(root.len()) == Some(&b'/'))
}

/// Resolves a version reference to file contents.
pub trait SnapshotProvider: Send + Sync {
    /// Collect every file under `paths` at `reference`.
    fn get(&self, reference: &str, paths: &[String]) -> CoreResult<Snapshot>;
}

/// Gitignore-syntax exclusion patterns applied to repository paths.
#[derive(Clone, Debug, Default)]
pub struct PathFilter {
    matcher: Option<Gitignore>,
}

impl PathFilter {
    /// Filter that excludes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(patterns: &[String]) -> CoreResult<Self> {
        if patterns.is_empty() {
            return Ok(Self::none());
        }

        let mut builder = GitignoreBuilder::new(".");
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| CoreError::InvalidPattern {
                    pattern: pattern.clone(),
                    source: Box::new(e),
                })?;
        }
        let matcher = builder.build().map_err(|e| CoreError::InvalidPattern {
            pattern: patterns.join(", "),
            source: Box::new(e),
        })?;

        Ok(Self {
            matcher: Some(matcher),
        })
    }

    /// Check a relative path against the patterns.
    pub fn is_ignored(&self, path: &str) -> bool {
        match &self.matcher {
            Some(matcher) => {
                let path = path.trim_start_matches("./").trim_start_matches('/');
                matcher
                    .matched_path_or_any_parents(Path::new(path), false)
                    .is_ignore()
            }
            None => false,
        }
    }
}

/// Snapshots read from a directory on disk. The reference is the directory.
#[derive(Clone, Debug, Default)]
pub struct DirectorySnapshotProvider {
    filter: PathFilter,
}

impl DirectorySnapshotProvider {
    pub fn new(filter: PathFilter) -> Self {
        Self { filter }
    }
}

impl SnapshotProvider for DirectorySnapshotProvider {
    fn get(&self, reference: &str, paths: &[String]) -> CoreResult<Snapshot> {
        let base = PathBuf::from(reference);
        if !base.is_dir() {
            return Err(CoreError::snapshot(reference, "not a directory"));
        }

        let mut snapshot = Snapshot::new(reference, paths);
        for root in snapshot.roots().to_vec() {
            let start = if root.is_empty() {
                base.clone()
            } else {
                base.join(&root)
            };
            if !start.exists() {
                tracing::debug!("Root '{}' does not exist in {}", root, reference);
                continue;
            }

            for entry in WalkBuilder::new(&start).build() {
                let entry = entry.map_err(|e| CoreError::snapshot(reference, e.to_string()))?;
                if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    continue;
                }

                let Ok(relative) = entry.path().strip_prefix(&base) else {
                    continue;
                };
                let relative = relative.to_string_lossy().replace('\\', "/");
                if self.filter.is_ignored(&relative) {
                    continue;
                }

                let content = std::fs::read(entry.path())?;
                snapshot.insert(relative, content);
            }
        }

        tracing::debug!("Read {} files from {}", snapshot.len(), reference);
        Ok(snapshot)
    }
}

/// Snapshots held in memory, keyed by reference. Used for embedding and tests.
#[derive(Clone, Debug, Default)]
pub struct MemorySnapshotProvider {
    refs: HashMap<String, BTreeMap<String, Vec<u8>>>,
}

impl MemorySnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at a reference.
    pub fn with_file(
        mut self,
        reference: &str,
        path: &str,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.refs
            .entry(reference.to_string())
            .or_default()
            .insert(path.to_string(), content.into());
        self
    }

    /// Register a reference with no files.
    pub fn with_reference(mut self, reference: &str) -> Self {
        self.refs.entry(reference.to_string()).or_default();
        self
    }
}

impl SnapshotProvider for MemorySnapshotProvider {
    fn get(&self, reference: &str, paths: &[String]) -> CoreResult<Snapshot> {
        let files = self
            .refs
            .get(reference)
            .ok_or_else(|| CoreError::snapshot(reference, "unknown reference"))?;

        let mut snapshot = Snapshot::new(reference, paths);
        for (path, content) in files {
            if snapshot.root_for(path).is_some() {
                snapshot.insert(path.clone(), content.clone());
            }
        }
        Ok(snapshot)
    }
}
