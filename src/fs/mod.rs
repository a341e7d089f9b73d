/// File system operations abstraction for testing
///
/// This module provides a trait-based abstraction over the file system
/// operations the local backend needs, so backend logic can be exercised
/// with the `mockall` generated `MockFileSystemOperations`.
///
/// # Examples
///
/// ```rust,no_run
/// use smooth_tennis::fs::{FileSystemOperations, StandardFileSystem};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let fs_ops: Arc<dyn FileSystemOperations> = Arc::new(StandardFileSystem);
///
///     fs_ops.create_dir_all(".smooth-tennis/records").await?;
///     fs_ops.write(".smooth-tennis/records/a.json", b"{}").await?;
///
///     if let Some(bytes) = fs_ops.read(".smooth-tennis/records/a.json").await? {
///         println!("read {} bytes", bytes.len());
///     }
///
///     Ok(())
/// }
/// ```
use anyhow::Result;

#[cfg(test)]
use mockall::automock;

/// Trait for file system operations that can be mocked in tests
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait FileSystemOperations: Send + Sync {
    /// Create a directory and all its parent directories
    async fn create_dir_all(&self, path: &str) -> Result<()>;

    /// Write data to a file, creating the file if it doesn't exist
    async fn write(&self, path: &str, contents: &[u8]) -> Result<()>;

    /// Read a whole file. `Ok(None)` when it does not exist.
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Remove a file. Removing a missing file is not an error.
    async fn remove_file(&self, path: &str) -> Result<()>;

    /// Rename a file, replacing the destination if it exists
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
}

/// Standard implementation that uses actual file system operations
///
/// Use this in production code and switch to `MockFileSystemOperations`
/// in tests.
pub struct StandardFileSystem;

#[async_trait::async_trait]
impl FileSystemOperations for StandardFileSystem {
    async fn create_dir_all(&self, path: &str) -> Result<()> {
        tokio::fs::create_dir_all(path).await.map_err(Into::into)
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<()> {
        tokio::fs::write(path, contents).await.map_err(Into::into)
    }

    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        tokio::fs::rename(from, to).await.map_err(Into::into)
    }
}
