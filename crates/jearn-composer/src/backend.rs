//! Draft storage backends.
//!
//! A backend is a plain key/value store of serialized draft records. It does
//! no ordering of its own; [`crate::store::DraftStore`] serializes access
//! per scope before calling into it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::config::DraftsConfig;
use crate::error::StoreError;

#[trait_variant::make(Send)]
pub trait DraftBackend: Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process backend, for tests and for hosts without durable storage.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl DraftBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// One JSON file per draft inside a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a key. Anything outside `[A-Za-z0-9_-]` is percent-encoded
    /// so keys with `:` are valid file names everywhere.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        name.push_str(".json");
        self.dir.join(name)
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl DraftBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::io_error(&self.dir, e))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value.as_bytes())
            .await
            .map_err(|e| Self::io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::io_error(&path, e))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }
}

/// Backend picked from configuration: files when a directory is set,
/// memory otherwise.
#[derive(Debug)]
pub enum ConfiguredBackend {
    Memory(MemoryBackend),
    File(FileBackend),
}

impl ConfiguredBackend {
    pub fn from_config(config: &DraftsConfig) -> Self {
        match &config.dir {
            Some(dir) => {
                tracing::info!(dir = %dir.display(), "persisting drafts to disk");
                ConfiguredBackend::File(FileBackend::new(dir.clone()))
            }
            None => {
                tracing::info!("keeping drafts in memory");
                ConfiguredBackend::Memory(MemoryBackend::new())
            }
        }
    }
}

impl DraftBackend for ConfiguredBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            ConfiguredBackend::Memory(b) => b.get(key).await,
            ConfiguredBackend::File(b) => b.get(key).await,
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        match self {
            ConfiguredBackend::Memory(b) => b.put(key, value).await,
            ConfiguredBackend::File(b) => b.put(key, value).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            ConfiguredBackend::Memory(b) => b.delete(key).await,
            ConfiguredBackend::File(b) => b.delete(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("k").await.unwrap(), None);
        backend.put("k", "v".into()).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
        backend.delete("k").await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("drafts"));
        let key = "post-draft:u1:Answer:q/9";
        assert_eq!(backend.get(key).await.unwrap(), None);
        backend.put(key, "{}".into()).await.unwrap();
        assert_eq!(backend.get(key).await.unwrap().as_deref(), Some("{}"));
        assert!(
            backend
                .path_for(key)
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n == "post-draft%3Au1%3AAnswer%3Aq%2F9.json")
        );
        backend.delete(key).await.unwrap();
        backend.delete(key).await.unwrap();
        assert_eq!(backend.get(key).await.unwrap(), None);
    }

    #[test]
    fn test_configured_backend_follows_dir() {
        let memory = ConfiguredBackend::from_config(&DraftsConfig::default());
        assert!(matches!(memory, ConfiguredBackend::Memory(_)));
        let file = ConfiguredBackend::from_config(&DraftsConfig {
            dir: Some("/tmp/drafts".into()),
            ..DraftsConfig::default()
        });
        assert!(matches!(file, ConfiguredBackend::File(_)));
    }
}
