// Artifact delivery: where exported bytes end up

use std::path::{Path, PathBuf};

use tracing::debug;

use super::ExportArtifact;

/// Receives finished exports.
pub trait ArtifactSink {
    /// Deliver `artifact`, returning where it went.
    fn deliver(&mut self, artifact: ExportArtifact) -> crate::error::Result<PathBuf>;
}

/// Writes each artifact to `<dir>/<filename>`, creating the directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&mut self, artifact: ExportArtifact) -> crate::error::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&artifact.filename);
        std::fs::write(&path, &artifact.bytes)?;
        debug!(path = %path.display(), bytes = artifact.bytes.len(), "artifact written");
        Ok(path)
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    artifacts: Vec<ExportArtifact>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> &[ExportArtifact] {
        &self.artifacts
    }

    pub fn into_artifacts(self) -> Vec<ExportArtifact> {
        self.artifacts
    }
}

impl ArtifactSink for MemorySink {
    fn deliver(&mut self, artifact: ExportArtifact) -> crate::error::Result<PathBuf> {
        let path = PathBuf::from(&artifact.filename);
        self.artifacts.push(artifact);
        Ok(path)
    }
}
