//! Generic async file-based endpoints source with SHA256 change detection.
//!
//! [`FileSource`] implements [`EndpointSource`] for any file format by
//! accepting a deserialization function at construction time. It reads
//! the file asynchronously via Tokio, validates the result, and computes
//! a SHA256 hash for version tracking.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::sha256_hex;
use crate::broadcast::registry::Endpoint;
use crate::config::model::EndpointsFile;
use crate::config::validation::validate;
use crate::config::{EndpointSource, SourceVersion};
use crate::error::PurgecastError;

type DeserializeFn = fn(&str) -> Result<EndpointsFile, Box<dyn std::error::Error + Send + Sync>>;

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    deserialize: DeserializeFn,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf, name: &'static str, deserialize: DeserializeFn) -> Self {
        Self {
            path,
            name,
            deserialize,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_content(&self) -> Result<String, PurgecastError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PurgecastError::EndpointsFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                PurgecastError::Io(e)
            }
        })
    }
}

#[async_trait]
impl EndpointSource for FileSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn load(&self) -> Result<(Vec<Endpoint>, SourceVersion), PurgecastError> {
        let content = self.read_content().await?;

        let file = (self.deserialize)(&content).map_err(|e| PurgecastError::EndpointsParse {
            path: self.path.display().to_string(),
            source: e,
        })?;

        if let Err(errors) = validate(&file) {
            return Err(PurgecastError::EndpointsValidation { errors });
        }

        let hash = sha256_hex(content.as_bytes());
        Ok((file.endpoints, SourceVersion::Hash(hash)))
    }

    async fn has_changed(&self, current: &SourceVersion) -> Result<bool, PurgecastError> {
        let content = self.read_content().await?;
        let hash = sha256_hex(content.as_bytes());
        Ok(*current != SourceVersion::Hash(hash))
    }
}

#[cfg(all(test, feature = "yaml"))]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("purgecast-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn loads_validates_and_tracks_changes() {
        let path = temp_path("file-source.yaml");
        tokio::fs::write(&path, "endpoints:\n  - host: a\n    port: 80\n")
            .await
            .unwrap();

        let source = super::super::yaml::new(path.clone());
        let (endpoints, version) = source.load().await.unwrap();
        assert_eq!(endpoints, vec![Endpoint::new("a", "80")]);
        assert!(!source.has_changed(&version).await.unwrap());

        tokio::fs::write(&path, "endpoints:\n  - host: b\n    port: 80\n")
            .await
            .unwrap();
        assert!(source.has_changed(&version).await.unwrap());

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn invalid_entries_fail_validation() {
        let path = temp_path("invalid.yaml");
        tokio::fs::write(&path, "endpoints:\n  - host: a\n    port: 0\n")
            .await
            .unwrap();

        let source = super::super::yaml::new(path.clone());
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, PurgecastError::EndpointsValidation { .. }));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = super::super::yaml::new(temp_path("does-not-exist.yaml"));
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, PurgecastError::EndpointsFileNotFound { .. }));
    }
}
