//! Core VFS types.
//!
//! Path-based and inode-free; the FUSE adapter owns the inode mapping.

use std::time::SystemTime;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Access, change and modification times of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    pub atime: SystemTime,
    pub ctime: SystemTime,
    pub mtime: SystemTime,
}

impl Timestamps {
    /// All three set to the current time.
    pub fn now() -> Self {
        let now = SystemTime::now();
        Self {
            atime: now,
            ctime: now,
            mtime: now,
        }
    }

    /// Refresh the access time (read).
    pub fn accessed(&mut self) {
        self.atime = SystemTime::now();
    }

    /// Refresh access and modification times (write).
    pub fn written(&mut self) {
        let now = SystemTime::now();
        self.atime = now;
        self.mtime = now;
    }

    /// Refresh modification and change times (namespace or size change).
    pub fn changed(&mut self) {
        let now = SystemTime::now();
        self.mtime = now;
        self.ctime = now;
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::now()
    }
}

/// Requested value for one timestamp in `utimens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUpdate {
    /// Use the current time.
    Now,
    /// Use an explicit point in time.
    At(SystemTime),
}

impl TimeUpdate {
    fn resolve(update: Option<TimeUpdate>, now: SystemTime) -> SystemTime {
        match update {
            Some(TimeUpdate::At(t)) => t,
            Some(TimeUpdate::Now) | None => now,
        }
    }

    /// Apply an `(atime, mtime)` request; ctime always becomes now.
    pub fn apply(atime: Option<TimeUpdate>, mtime: Option<TimeUpdate>, times: &mut Timestamps) {
        let now = SystemTime::now();
        times.atime = Self::resolve(atime, now);
        times.mtime = Self::resolve(mtime, now);
        times.ctime = now;
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o644).
    pub perm: u32,
    /// Entry timestamps.
    pub times: Timestamps,
    /// Number of hard links.
    pub nlink: u32,
    /// Owner: the user who mounted the filesystem.
    pub uid: u32,
    /// Group of the user who mounted the filesystem.
    pub gid: u32,
}

impl FileAttr {
    /// Attributes for a regular file.
    pub fn file(size: u64, times: Timestamps) -> Self {
        Self {
            size,
            kind: FileType::File,
            perm: 0o644,
            times,
            nlink: 1,
            uid: 0,
            gid: 0,
        }
    }

    /// Attributes for a directory.
    pub fn directory(times: Timestamps) -> Self {
        Self {
            size: 0,
            kind: FileType::Directory,
            perm: 0o755,
            times,
            nlink: 2, // . and ..
            uid: 0,
            gid: 0,
        }
    }

    /// Set the reported owner.
    pub fn owned_by(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }
}

/// One-shot listing of a directory.
///
/// Yields `.` and `..` first, then the directory's children. Once consumed
/// it cannot be restarted; call `readdir` again for a fresh listing.
#[derive(Debug)]
pub struct DirListing {
    entries: std::vec::IntoIter<DirEntry>,
}

impl DirListing {
    pub(crate) fn new(children: Vec<DirEntry>) -> Self {
        let mut entries = Vec::with_capacity(children.len() + 2);
        entries.push(DirEntry::directory("."));
        entries.push(DirEntry::directory(".."));
        entries.extend(children);
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl Iterator for DirListing {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for DirListing {}

/// Filesystem statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFs {
    /// Total blocks.
    pub blocks: u64,
    /// Free blocks.
    pub bfree: u64,
    /// Available blocks (to non-root).
    pub bavail: u64,
    /// Entries in use (directories + files).
    pub files: u64,
    /// Entries still available under the configured quotas.
    pub ffree: u64,
    /// Block size.
    pub bsize: u32,
    /// Maximum name length.
    pub namelen: u32,
    /// Fragment size.
    pub frsize: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_file_type() {
        assert!(FileType::File.is_file());
        assert!(!FileType::File.is_dir());
        assert!(FileType::Directory.is_dir());
    }

    #[test]
    fn test_file_attr_constructors() {
        let file = FileAttr::file(1024, Timestamps::now()).owned_by(1000, 100);
        assert!(file.is_file());
        assert_eq!(file.size, 1024);
        assert_eq!(file.perm, 0o644);
        assert_eq!(file.nlink, 1);
        assert_eq!((file.uid, file.gid), (1000, 100));

        let dir = FileAttr::directory(Timestamps::now());
        assert!(dir.is_dir());
        assert_eq!(dir.perm, 0o755);
        assert_eq!(dir.nlink, 2);
    }

    #[test]
    fn test_listing_prefixes_dot_entries() {
        let listing = DirListing::new(vec![DirEntry::directory("d"), DirEntry::file("f")]);
        assert_eq!(listing.len(), 4);
        let names: Vec<_> = listing.map(|e| e.name).collect();
        assert_eq!(names, [".", "..", "d", "f"]);
    }

    #[test]
    fn test_time_update_apply() {
        let epoch = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        let mut times = Timestamps::now();
        TimeUpdate::apply(Some(TimeUpdate::At(epoch)), None, &mut times);
        assert_eq!(times.atime, epoch);
        assert!(times.mtime > epoch);
        assert!(times.ctime >= times.mtime);
    }
}
