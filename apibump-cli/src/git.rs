//! Snapshots read straight from git objects.
//!
//! Files are listed with `git ls-tree` and read with `git show`, so neither
//! reference needs to be checked out.

use std::path::PathBuf;
use std::process::Command;

use apibump_core::snapshot::{is_under, normalize_root};
use apibump_core::{CoreError, CoreResult, PathFilter, Snapshot, SnapshotProvider};

/// Failure to run git or of a git command.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    Command { command: String, stderr: String },
}

/// Snapshot provider backed by a git repository.
pub struct GitSnapshotProvider {
    repo: PathBuf,
    filter: PathFilter,
}

impl GitSnapshotProvider {
    pub fn new(repo: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            repo: repo.into(),
            filter,
        }
    }

    fn git(&self, args: &[&str]) -> Result<Vec<u8>, GitError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .output()?;

        if !output.status.success() {
            return Err(GitError::Command {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Resolve a reference to a commit id.
    pub fn resolve(&self, reference: &str) -> Result<String, GitError> {
        let revision = format!("{}^{{commit}}", reference);
        let stdout = self.git(&["rev-parse", "--verify", "--quiet", &revision])?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    /// Paths tracked at `commit` under any of `roots`.
    fn list_files(&self, commit: &str, roots: &[String]) -> Result<Vec<String>, GitError> {
        let mut args = vec!["ls-tree", "-r", "--name-only", "-z", commit, "--"];
        let pathspecs: Vec<&str> = roots
            .iter()
            .map(|r| if r.is_empty() { "." } else { r.as_str() })
            .collect();
        args.extend(pathspecs);

        let stdout = self.git(&args)?;
        Ok(stdout
            .split(|b| *b == 0)
            .filter(|p| !p.is_empty())
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .filter(|p| roots.iter().any(|root| is_under(p, root)))
            .collect())
    }
}

impl SnapshotProvider for GitSnapshotProvider {
    fn get(&self, reference: &str, paths: &[String]) -> CoreResult<Snapshot> {
        let commit = self
            .resolve(reference)
            .map_err(|_| CoreError::Snapshot {
                reference: reference.to_string(),
                message: "unknown revision".to_string(),
            })?;
        let as_snapshot_error = |e: GitError| CoreError::Snapshot {
            reference: reference.to_string(),
            message: e.to_string(),
        };

        let roots: Vec<String> = paths.iter().map(|p| normalize_root(p)).collect();
        let mut snapshot = Snapshot::new(reference, paths);
        for path in self.list_files(&commit, &roots).map_err(as_snapshot_error)? {
            if self.filter.is_ignored(&path) {
                continue;
            }
            let content = self
                .git(&["show", &format!("{}:{}", commit, path)])
                .map_err(as_snapshot_error)?;
            snapshot.insert(path, content);
        }

        tracing::debug!("Read {} files from {} ({})", snapshot.len(), reference, commit);
        Ok(snapshot)
    }
}
