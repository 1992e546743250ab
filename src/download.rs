//! Batch download: write every artifact of a run to a directory.
//!
//! Files are written one after another with a short pause in between, so a
//! consumer watching the directory sees them arrive in order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::GeneratedArtifact;
use crate::config::DEFAULT_DOWNLOAD_STAGGER_MS;
use crate::error::MidiatorError;

pub const DEFAULT_STAGGER: Duration = Duration::from_millis(DEFAULT_DOWNLOAD_STAGGER_MS);

/// Write artifacts to `dir` under their file names, sleeping `stagger`
/// between files. Returns the written paths in order.
pub async fn save_all(
    artifacts: &[GeneratedArtifact],
    dir: &Path,
    stagger: Duration,
) -> Result<Vec<PathBuf>, MidiatorError> {
    tokio::fs::create_dir_all(dir).await?;

    let mut written = Vec::with_capacity(artifacts.len());
    for (i, artifact) in artifacts.iter().enumerate() {
        if i > 0 && !stagger.is_zero() {
            tokio::time::sleep(stagger).await;
        }
        let path = dir.join(&artifact.filename);
        tokio::fs::write(&path, artifact.png.as_slice()).await?;
        tracing::debug!(path = %path.display(), bytes = artifact.png.len(), "saved artifact");
        written.push(path);
    }

    tracing::info!(count = written.len(), dir = %dir.display(), "download finished");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{HandleRegistry, artifact_filename};
    use crate::model::Record;
    use std::sync::Arc;

    fn artifact(registry: &HandleRegistry, index: usize, bytes: &[u8]) -> GeneratedArtifact {
        let png = Arc::new(bytes.to_vec());
        GeneratedArtifact {
            index,
            filename: artifact_filename(index),
            handle: registry.register(Arc::clone(&png)),
            record: Record::new(),
            width: 1,
            height: 1,
            png,
        }
    }

    #[tokio::test]
    async fn test_save_all_writes_in_order() {
        let registry = HandleRegistry::new();
        let artifacts = vec![artifact(&registry, 0, b"first"), artifact(&registry, 1, b"second")];
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");

        let paths = save_all(&artifacts, &target, Duration::ZERO).await.unwrap();
        assert_eq!(
            paths,
            vec![target.join("midiator_001.png"), target.join("midiator_002.png")]
        );
        assert_eq!(std::fs::read(&paths[1]).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_stagger_between_files() {
        let registry = HandleRegistry::new();
        let artifacts: Vec<_> = (0..3).map(|i| artifact(&registry, i, b"x")).collect();
        let dir = tempfile::tempdir().unwrap();

        let start = tokio::time::Instant::now();
        save_all(&artifacts, dir.path(), DEFAULT_STAGGER).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
