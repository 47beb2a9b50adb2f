//! VFS error types.

use thiserror::Error;

/// VFS error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    /// Path resolves to neither a directory nor a file.
    #[error("not found: {0}")]
    NotFound(String),

    /// Generic failure: removal of a missing entry, read of a missing file,
    /// unlink of a directory, timestamp update on a missing path.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// Name already taken in either namespace.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Malformed path or entry name.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Entry name longer than the configured limit.
    #[error("file name too long: {0}")]
    NameTooLong(String),

    /// Configured directory or file quota reached.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Content would exceed the configured maximum file size.
    #[error("file too large: {path} ({size} > {max} bytes)")]
    FileTooLarge { path: String, size: u64, max: u64 },
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an OperationFailed error.
    pub fn operation_failed(path: impl Into<String>) -> Self {
        Self::OperationFailed(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a QuotaExceeded error.
    pub fn quota_exceeded(what: impl Into<String>) -> Self {
        Self::QuotaExceeded(what.into())
    }

    /// Positive errno the transport reports back to the calling process.
    ///
    /// `OperationFailed` maps to `EPERM`, the `-1` status the filesystem has
    /// always returned for failed removals and reads.
    #[cfg(unix)]
    pub fn errno(&self) -> i32 {
        use rustix::io::Errno;

        let errno = match self {
            VfsError::NotFound(_) => Errno::NOENT,
            VfsError::OperationFailed(_) => Errno::PERM,
            VfsError::AlreadyExists(_) => Errno::EXIST,
            VfsError::InvalidPath(_) => Errno::INVAL,
            VfsError::NameTooLong(_) => Errno::NAMETOOLONG,
            VfsError::QuotaExceeded(_) => Errno::NOSPC,
            VfsError::FileTooLarge { .. } => Errno::FBIG,
        };
        errno.raw_os_error()
    }

    /// Positive errno the transport reports back to the calling process.
    #[cfg(not(unix))]
    pub fn errno(&self) -> i32 {
        match self {
            VfsError::NotFound(_) => 2,
            VfsError::OperationFailed(_) => 1,
            VfsError::AlreadyExists(_) => 17,
            VfsError::InvalidPath(_) => 22,
            VfsError::NameTooLong(_) => 36,
            VfsError::QuotaExceeded(_) => 28,
            VfsError::FileTooLarge { .. } => 27,
        }
    }

    /// Negative status code, the form a C-style operation table returns.
    pub fn status(&self) -> i32 {
        -self.errno()
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
