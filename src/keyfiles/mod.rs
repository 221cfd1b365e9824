//! Key-file retrieval behind the path guard.

use std::path::{Path, PathBuf};

use crate::error::KeyFileError;
use crate::security::{DenyReason, path_guard};

/// Serves files out of one restricted directory. Every candidate name goes
/// through the path guard; a deny never touches the filesystem beyond the
/// guard's own canonicalization.
pub struct KeyFileServer {
    base_dir: PathBuf,
}

impl KeyFileServer {
    #[must_use]
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Guard-only evaluation: canonical contained path on allow.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, DenyReason> {
        path_guard::resolve(name, &self.base_dir)
    }

    /// Resolve `name` and read its contents for the send collaborator.
    /// A name that survives the guard but matches no regular file is
    /// NotFound, not a deny.
    pub async fn read(&self, name: &str) -> Result<(PathBuf, Vec<u8>), KeyFileError> {
        let path = self.resolve(name)?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) | Err(_) => return Err(KeyFileError::NotFound),
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| KeyFileError::Io(e.to_string()))?;
        Ok((path, bytes))
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn server_with_key(contents: &[u8]) -> (TempDir, KeyFileServer) {
        let base = TempDir::new().expect("tempdir");
        fs::write(base.path().join("key1.pem"), contents).expect("write key");
        let server = KeyFileServer::new(base.path().to_path_buf());
        (base, server)
    }

    #[tokio::test]
    async fn serves_an_existing_key() {
        let (_base, server) = server_with_key(b"-----BEGIN KEY-----");

        let (path, bytes) = server.read("key1.pem").await.unwrap();
        assert!(path.ends_with("key1.pem"));
        assert_eq!(bytes, b"-----BEGIN KEY-----");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let (_base, server) = server_with_key(b"k");

        assert!(matches!(
            server.read("absent.pem").await,
            Err(KeyFileError::NotFound)
        ));
    }

    #[tokio::test]
    async fn traversal_is_denied_not_missing() {
        let (_base, server) = server_with_key(b"k");

        assert!(matches!(
            server.read("../../etc/passwd").await,
            Err(KeyFileError::Denied(DenyReason::TraversalSequence))
        ));
        assert!(matches!(
            server.read("sub/key1.pem").await,
            Err(KeyFileError::Denied(DenyReason::PathSeparator))
        ));
    }

    #[tokio::test]
    async fn directory_names_are_not_served() {
        let base = TempDir::new().expect("tempdir");
        fs::create_dir(base.path().join("subdir")).expect("mkdir");
        let server = KeyFileServer::new(base.path().to_path_buf());

        assert!(matches!(
            server.read("subdir").await,
            Err(KeyFileError::NotFound)
        ));
    }
}
