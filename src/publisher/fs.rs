use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::{Artifact, BlobStore, PutOutput, SUCCESS_STATUS};
use crate::error::PublishError;

/// Stores artifacts as files under `{root}/{bucket}/{key}`.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File path for an artifact. Keys that would leave the bucket
    /// directory are refused like a store would refuse them.
    pub fn path_for(&self, artifact: &Artifact) -> Result<PathBuf, PublishError> {
        for part in [artifact.bucket.as_str(), artifact.key.as_str()] {
            let escapes = Path::new(part)
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            if part.is_empty() || escapes {
                return Err(PublishError::Client {
                    status: 400,
                    code: "InvalidKey".to_string(),
                    message: format!("refusing to write outside the store: {part:?}"),
                });
            }
        }
        Ok(self.root.join(&artifact.bucket).join(&artifact.key))
    }
}

#[async_trait]
impl BlobStore for FsStore {
    async fn put_object(&self, artifact: &Artifact) -> Result<PutOutput, PublishError> {
        let path = self.path_for(artifact)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &artifact.body).await?;
        Ok(PutOutput {
            status: SUCCESS_STATUS,
        })
    }
}
