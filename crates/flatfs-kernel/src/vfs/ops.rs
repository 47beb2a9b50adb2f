//! VFS operations trait.
//!
//! One method per filesystem request. Paths are always `/` or `/name`;
//! the transport turns a returned [`VfsError`](super::VfsError) into an
//! errno with [`VfsError::errno`](super::VfsError::errno).

use super::types::{DirListing, FileAttr, StatFs, TimeUpdate};
use super::VfsResult;

/// Core VFS operations trait.
///
/// All operations are path-based (no inode numbers). Each call runs to
/// completion before returning.
pub trait VfsOps: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Get file attributes.
    fn getattr(&self, path: &str) -> VfsResult<FileAttr>;

    /// List a directory, `.` and `..` first.
    fn readdir(&self, path: &str) -> VfsResult<DirListing>;

    /// Read up to `size` bytes starting at `offset`.
    ///
    /// Returns fewer bytes if EOF is reached.
    fn read(&self, path: &str, offset: u64, size: u32) -> VfsResult<Vec<u8>>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Replace the file's content with `data`.
    ///
    /// Writes never land at an offset: every write overwrites the whole
    /// file. Returns the number of bytes written.
    fn write(&self, path: &str, offset: u64, data: &[u8]) -> VfsResult<u32>;

    /// Create an empty regular file.
    fn mknod(&self, path: &str, mode: u32, rdev: u32) -> VfsResult<FileAttr>;

    /// Create a directory directly below root.
    fn mkdir(&self, path: &str, mode: u32) -> VfsResult<FileAttr>;

    /// Remove a file.
    fn unlink(&self, path: &str) -> VfsResult<()>;

    /// Remove a directory.
    fn rmdir(&self, path: &str) -> VfsResult<()>;

    /// Set access and modification times; `None` means now.
    fn utimens(
        &self,
        path: &str,
        atime: Option<TimeUpdate>,
        mtime: Option<TimeUpdate>,
    ) -> VfsResult<()>;

    /// Truncate or zero-extend a file.
    fn truncate(&self, path: &str, size: u64) -> VfsResult<()>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Get filesystem statistics.
    fn statfs(&self) -> VfsResult<StatFs>;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if a path exists.
    fn exists(&self, path: &str) -> bool {
        self.getattr(path).is_ok()
    }

    /// Read entire file contents.
    fn read_all(&self, path: &str) -> VfsResult<Vec<u8>> {
        self.read(path, 0, u32::MAX)
    }
}
