use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::ports::ArtifactStorePort;
use crate::error::{DqError, Result};

const REF_PREFIX: &str = "cas:sha256:";

/// Content-addressed file store: `<root>/sha256/ab/cd/<hex>`
pub struct CasFsStore {
    root: PathBuf,
}

impl CasFsStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, hex: &str) -> PathBuf {
        self.root.join("sha256").join(&hex[0..2]).join(&hex[2..4]).join(hex)
    }

    /// Local path behind a reference, if it is well-formed
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let hex = reference.strip_prefix(REF_PREFIX)?;
        if hex.len() < 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(self.path_for(hex))
    }
}

pub fn write_cas(root: &Path, bytes: &[u8]) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hex = hex::encode(hasher.finalize());
    let dir = root.join("sha256").join(&hex[0..2]).join(&hex[2..4]);
    fs::create_dir_all(&dir)?;
    let path = dir.join(&hex);
    if !path.exists() {
        fs::write(&path, bytes)?;
    }
    Ok(format!("{}{}", REF_PREFIX, hex))
}

#[async_trait]
impl ArtifactStorePort for CasFsStore {
    async fn put(&self, bytes: &[u8]) -> Result<String> {
        write_cas(&self.root, bytes)
    }

    async fn get(&self, reference: &str) -> Result<Vec<u8>> {
        let path = self
            .resolve(reference)
            .ok_or_else(|| DqError::ArtifactNotFound(reference.to_string()))?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DqError::ArtifactNotFound(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn same_bytes_share_one_reference() {
        let dir = TempDir::new().unwrap();
        let store = CasFsStore::new(dir.path());

        let a = store.put(b"name,email\n").await.unwrap();
        let b = store.put(b"name,email\n").await.unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("cas:sha256:"));
        assert_eq!(store.get(&a).await.unwrap(), b"name,email\n");
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = CasFsStore::new(dir.path());

        let missing = format!("cas:sha256:{}", "ab".repeat(32));
        assert!(matches!(store.get(&missing).await, Err(DqError::ArtifactNotFound(_))));
        assert!(matches!(store.get("s3://nope").await, Err(DqError::ArtifactNotFound(_))));
    }
}
