//! Loads the object cache from disk at startup and writes it back at the end
//! of a run.

use super::ObjectCache;
use crate::errors::ReconError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// File-backed access to an [`ObjectCache`].
#[derive(Debug, Clone)]
pub struct CacheGateway {
    path: PathBuf,
}

impl CacheGateway {
    /// Creates a gateway for the given cache file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the cache file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cache file.
    ///
    /// A missing file yields an empty cache. An unreadable or corrupt file
    /// is logged and also yields an empty cache; loading never fails.
    pub async fn load(&self) -> ObjectCache {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No cache file found, starting with an empty cache");
                return ObjectCache::new();
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to read cache file, using an empty cache");
                return ObjectCache::new();
            }
        };

        match ObjectCache::load(&bytes) {
            Ok(cache) => {
                info!(path = %self.path.display(), stats = %cache.stats(), "Loaded cache");
                cache
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Error loading cache, using an empty cache");
                ObjectCache::new()
            }
        }
    }

    /// Serializes the cache and overwrites the cache file.
    pub async fn save(&self, cache: &ObjectCache) -> Result<(), ReconError> {
        let bytes = cache.save()?;
        tokio::fs::write(&self.path, bytes).await?;
        info!(path = %self.path.display(), stats = %cache.stats(), "Saved cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty_cache() {
        let dir = tempdir().unwrap();
        let gateway = CacheGateway::new(dir.path().join("absent.bin"));
        assert!(gateway.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_yields_empty_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"{ this is not json").unwrap();

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let gateway = CacheGateway::new(&path);
        assert!(gateway.load().await.is_empty());

        let output = logs.contents();
        assert!(output.contains("ERROR"), "{output}");
        assert!(output.contains("Error loading cache"), "{output}");
        // The corrupt file is left untouched until the next save.
        assert_eq!(std::fs::read(&path).unwrap(), b"{ this is not json");
    }

    #[tokio::test]
    async fn test_save_overwrites_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        std::fs::write(&path, b"stale").unwrap();

        let cache = ObjectCache::new();
        cache.add_machine_sid("DC01", "S-1-5-21-4");
        let gateway = CacheGateway::new(&path);
        gateway.save(&cache).await.unwrap();

        let reloaded = gateway.load().await;
        assert_eq!(reloaded.get_machine_sid("DC01").as_deref(), Some("S-1-5-21-4"));
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let gateway = CacheGateway::new(dir.path().join("nope").join("cache.bin"));
        let err = gateway.save(&ObjectCache::new()).await.unwrap_err();
        assert!(matches!(err, ReconError::Io(_)));
    }
}
