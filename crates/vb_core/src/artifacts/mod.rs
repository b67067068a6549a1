//! Transient artifact storage with per-run guaranteed cleanup.
//!
//! Every file a pipeline run creates goes through an [`ArtifactScope`], the
//! run's cleanup registry. The scope deletes whatever is still registered
//! when the run terminates, on every exit path; `Drop` covers a panicking
//! run. This is scoped acquisition applied to disk resources instead of
//! memory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::PathSettings;
use crate::models::{Artifact, ArtifactKind};

/// Allocates uniquely named artifact files under the configured roots.
///
/// Two roots: a working root for voice downloads and normalized audio, and
/// a separate extraction root whose files must survive the subprocess that
/// names them.
#[derive(Debug)]
pub struct ArtifactStore {
    work_root: PathBuf,
    extract_root: PathBuf,
}

impl ArtifactStore {
    /// Create a store, ensuring both roots exist.
    pub fn new(work_root: impl Into<PathBuf>, extract_root: impl Into<PathBuf>) -> io::Result<Self> {
        let store = Self {
            work_root: work_root.into(),
            extract_root: extract_root.into(),
        };
        fs::create_dir_all(&store.work_root)?;
        fs::create_dir_all(&store.extract_root)?;
        Ok(store)
    }

    pub fn from_settings(paths: &PathSettings) -> io::Result<Self> {
        Self::new(&paths.work_root, &paths.extract_root)
    }

    fn root_for(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::RawVideoAudio => &self.extract_root,
            ArtifactKind::RawVoice | ArtifactKind::NormalizedAudio => &self.work_root,
        }
    }

    /// Allocate a uniquely named, empty file for the given kind.
    fn allocate(&self, kind: ArtifactKind) -> io::Result<Artifact> {
        let name = format!(
            "{}-{}.{}",
            kind.file_prefix(),
            Uuid::new_v4(),
            kind.extension()
        );
        let path = self.root_for(kind).join(name);
        fs::File::create(&path)?;
        Ok(Artifact::new(path, kind))
    }
}

/// Per-run cleanup registry; the only way a run creates artifacts.
pub struct ArtifactScope {
    store: Arc<ArtifactStore>,
    owned: Mutex<Vec<Artifact>>,
}

impl ArtifactScope {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            store,
            owned: Mutex::new(Vec::new()),
        }
    }

    /// Allocate an empty artifact file and register it for cleanup.
    pub fn create(&self, kind: ArtifactKind) -> io::Result<Artifact> {
        let artifact = self.store.allocate(kind)?;
        tracing::debug!(path = %artifact.path().display(), kind = ?kind, "artifact created");
        self.owned.lock().push(artifact.clone());
        Ok(artifact)
    }

    /// Delete one artifact and unregister it.
    ///
    /// Absence of the file is not an error; releasing an artifact twice is a
    /// no-op.
    pub fn release(&self, artifact: &Artifact) {
        self.owned.lock().retain(|a| a.path() != artifact.path());
        remove_file_quiet(artifact.path());
    }

    /// Delete every artifact still registered and clear the registry.
    pub fn release_all(&self) {
        let drained: Vec<Artifact> = std::mem::take(&mut *self.owned.lock());
        for artifact in &drained {
            remove_file_quiet(artifact.path());
        }
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "released run artifacts");
        }
    }

    /// Number of artifacts still registered.
    pub fn owned_count(&self) -> usize {
        self.owned.lock().len()
    }
}

impl Drop for ArtifactScope {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn remove_file_quiet(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "artifact removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> Arc<ArtifactStore> {
        Arc::new(ArtifactStore::new(dir.join("work"), dir.join("upload")).unwrap())
    }

    #[test]
    fn create_allocates_empty_registered_file() {
        let dir = tempdir().unwrap();
        let scope = ArtifactScope::new(store_in(dir.path()));

        let artifact = scope.create(ArtifactKind::RawVoice).unwrap();

        assert!(artifact.path().exists());
        assert_eq!(fs::metadata(artifact.path()).unwrap().len(), 0);
        assert_eq!(scope.owned_count(), 1);
        assert!(artifact.path().starts_with(dir.path().join("work")));
    }

    #[test]
    fn extractor_outputs_land_in_extract_root() {
        let dir = tempdir().unwrap();
        let scope = ArtifactScope::new(store_in(dir.path()));

        let artifact = scope.create(ArtifactKind::RawVideoAudio).unwrap();

        assert!(artifact.path().starts_with(dir.path().join("upload")));
        assert_eq!(artifact.path().extension().unwrap(), "mp3");
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempdir().unwrap();
        let scope = ArtifactScope::new(store_in(dir.path()));

        let artifact = scope.create(ArtifactKind::NormalizedAudio).unwrap();
        scope.release(&artifact);
        assert!(!artifact.path().exists());
        assert_eq!(scope.owned_count(), 0);

        // Second release of an already-deleted artifact is a no-op.
        scope.release(&artifact);
    }

    #[test]
    fn release_all_clears_every_file() {
        let dir = tempdir().unwrap();
        let scope = ArtifactScope::new(store_in(dir.path()));

        let a = scope.create(ArtifactKind::RawVoice).unwrap();
        let b = scope.create(ArtifactKind::NormalizedAudio).unwrap();

        scope.release_all();

        assert!(!a.path().exists());
        assert!(!b.path().exists());
        assert_eq!(scope.owned_count(), 0);

        // Calling again is harmless.
        scope.release_all();
    }

    #[test]
    fn drop_releases_leftovers() {
        let dir = tempdir().unwrap();
        let path;
        {
            let scope = ArtifactScope::new(store_in(dir.path()));
            path = scope.create(ArtifactKind::RawVoice).unwrap().path().to_path_buf();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn unique_names_for_same_kind() {
        let dir = tempdir().unwrap();
        let scope = ArtifactScope::new(store_in(dir.path()));

        let a = scope.create(ArtifactKind::RawVoice).unwrap();
        let b = scope.create(ArtifactKind::RawVoice).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
