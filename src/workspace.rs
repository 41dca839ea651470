//! Run directory and scoped intermediate files.
//!
//! Every stage receives the [`Workspace`] explicitly; nothing depends on the
//! process working directory.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Base directory for all files of one run.
#[derive(Debug, Clone)]
pub struct Workspace {
    base: PathBuf,
    keep_temp: bool,
}

impl Workspace {
    /// Creates the directory and resolves it to an absolute path, so paths
    /// handed to tools stay valid whatever their working directory.
    pub fn new(base: impl Into<PathBuf>, keep_temp: bool) -> Result<Self> {
        let base = base.into();
        fs::create_dir_all(&base)
            .with_context(|| format!("Failed to create output directory: {}", base.display()))?;
        let base = fs::canonicalize(&base)
            .with_context(|| format!("Failed to resolve output directory: {}", base.display()))?;
        Ok(Self { base, keep_temp })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolves `name` against the base directory.
    pub fn path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.base.join(name)
    }

    /// Reserves an intermediate file that is removed when the guard drops.
    pub fn artifact(&self, name: impl AsRef<Path>) -> ScopedArtifact {
        ScopedArtifact {
            path: self.path(name),
            keep: self.keep_temp,
        }
    }
}

/// Intermediate file removed on drop unless persisted.
///
/// Cleanup runs on every exit path, including early `?` returns.
#[derive(Debug)]
pub struct ScopedArtifact {
    path: PathBuf,
    keep: bool,
}

impl ScopedArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Promotes the artifact to a regular output file.
    pub fn persist(mut self) -> PathBuf {
        self.keep = true;
        std::mem::take(&mut self.path)
    }

    /// Removes the file now.
    pub fn discard(self) {
        drop(self);
    }
}

impl AsRef<Path> for ScopedArtifact {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedArtifact {
    fn drop(&mut self) {
        if self.keep || self.path.as_os_str().is_empty() {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("removed {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Writes one identifier per line, newline-terminated, no header.
pub fn write_id_list<'a, I>(path: &Path, ids: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a String>,
{
    let file = File::create(path)
        .with_context(|| format!("Failed to create identifier list: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let mut n = 0;
    for id in ids {
        writeln!(out, "{}", id)?;
        n += 1;
    }
    out.flush()?;
    Ok(n)
}
