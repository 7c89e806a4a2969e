//! File storage for uploaded receipt images.
//!
//! Files live under a root directory that is also served over HTTP at
//! [`ReceiptStore::PUBLIC_PREFIX`], so every stored file has both an
//! on-disk location and a public relative path.

use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ReceiptStore {
    root: PathBuf,
}

impl ReceiptStore {
    /// URL prefix the upload root is served under
    pub const PUBLIC_PREFIX: &'static str = "/uploads";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write `bytes` into `directory` (relative to the root) as `<stem>.<extension>`.
    ///
    /// Intermediate directories are created. An existing file is never
    /// replaced: if the name is taken a numeric suffix is added. Returns the
    /// file name actually used.
    pub async fn write_new(
        &self,
        directory: &Path,
        stem: &str,
        extension: &str,
        bytes: &[u8],
    ) -> io::Result<String> {
        let target_dir = self.root.join(directory);
        tokio::fs::create_dir_all(&target_dir).await?;

        let mut attempt = 0u32;
        loop {
            let file_name = if attempt == 0 {
                format!("{}.{}", stem, extension)
            } else {
                format!("{}_{}.{}", stem, attempt, extension)
            };
            let path = target_dir.join(&file_name);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    debug!("Wrote {} bytes to {:?}", bytes.len(), path);
                    return Ok(file_name);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 100 => {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Public path (`/uploads/...`) of a file stored in `directory`
    pub fn public_path(directory: &Path, file_name: &str) -> String {
        let mut path = String::from(Self::PUBLIC_PREFIX);
        for component in directory.components() {
            if let Component::Normal(part) = component {
                path.push('/');
                path.push_str(&part.to_string_lossy());
            }
        }
        path.push('/');
        path.push_str(file_name);
        path
    }

    /// On-disk location of a public path, `None` if it is not under the prefix
    /// or tries to leave the root
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let relative = public_path
            .strip_prefix(Self::PUBLIC_PREFIX)?
            .trim_start_matches('/');
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Delete a previously stored file by its public path
    pub async fn remove(&self, public_path: &str) -> io::Result<()> {
        match self.resolve(public_path) {
            Some(path) => tokio::fs::remove_file(path).await,
            None => {
                warn!("Refusing to remove file outside the upload root: {}", public_path);
                Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not an upload path: {}", public_path),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_new_creates_directories() {
        let temp = TempDir::new().unwrap();
        let store = ReceiptStore::new(temp.path());
        let dir = Path::new("payments/2025/A1/abc/2025-07_2025-09");

        let name = store.write_new(dir, "receipt_1", "png", b"data").await.unwrap();
        assert_eq!(name, "receipt_1.png");
        let on_disk = temp.path().join(dir).join(&name);
        assert_eq!(std::fs::read(on_disk).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_write_new_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let store = ReceiptStore::new(temp.path());
        let dir = Path::new("payments");

        let first = store.write_new(dir, "receipt_1", "jpg", b"first").await.unwrap();
        let second = store.write_new(dir, "receipt_1", "jpg", b"second").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(second, "receipt_1_1.jpg");
        assert_eq!(std::fs::read(temp.path().join("payments").join(first)).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_public_path_and_remove() {
        let temp = TempDir::new().unwrap();
        let store = ReceiptStore::new(temp.path());
        let dir = Path::new("payments/2025/B2/xyz/2025-08_2025-08");
        let name = store.write_new(dir, "receipt_9", "webp", b"x").await.unwrap();

        let public = ReceiptStore::public_path(dir, &name);
        assert_eq!(public, "/uploads/payments/2025/B2/xyz/2025-08_2025-08/receipt_9.webp");

        store.remove(&public).await.unwrap();
        assert!(!temp.path().join(dir).join(&name).exists());
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let store = ReceiptStore::new("/srv/uploads");
        assert!(store.resolve("/uploads/../etc/passwd").is_none());
        assert!(store.resolve("/static/file.png").is_none());
        assert_eq!(
            store.resolve("/uploads/payments/a.png"),
            Some(PathBuf::from("/srv/uploads/payments/a.png"))
        );
    }
}
