//! Operation handlers over a [`NamespaceStore`].
//!
//! Each handler takes the store lock once, resolves the path, and reads or
//! mutates a single entry.

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::error::{VfsError, VfsResult};
use super::ops::VfsOps;
use super::store::{component, is_root, NamespaceStore};
use super::types::{DirEntry, DirListing, FileAttr, StatFs, TimeUpdate};
use crate::config::FsConfig;
use crate::owner::Owner;

/// File-type bits of a mode.
const S_IFMT: u32 = 0o170000;
/// Regular file.
const S_IFREG: u32 = 0o100000;

/// The in-memory flat filesystem.
///
/// Constructed empty at mount and dropped at unmount; every instance is
/// independent.
#[derive(Debug)]
pub struct FlatFs {
    store: Mutex<NamespaceStore>,
    owner: Owner,
}

impl Default for FlatFs {
    fn default() -> Self {
        Self::new(FsConfig::default())
    }
}

impl FlatFs {
    /// Create an empty filesystem owned by the current user.
    pub fn new(config: FsConfig) -> Self {
        Self::with_owner(config, Owner::current())
    }

    /// Create an empty filesystem reporting an explicit owner.
    pub fn with_owner(config: FsConfig, owner: Owner) -> Self {
        Self {
            store: Mutex::new(NamespaceStore::new(config)),
            owner,
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Run `f` with exclusive access to the store.
    pub fn with_store<T>(&self, f: impl FnOnce(&mut NamespaceStore) -> T) -> T {
        f(&mut *self.store.lock())
    }

    fn attr_of(&self, store: &NamespaceStore, path: &str) -> VfsResult<FileAttr> {
        let attr = if is_root(path) {
            FileAttr::directory(store.root_times())
        } else if let Some(dir) = store
            .find_directory_index(path)
            .and_then(|i| store.directory(i))
        {
            FileAttr::directory(dir.times)
        } else if let Some(file) = store.find_file_index(path).and_then(|i| store.file(i)) {
            let size = store
                .config()
                .reported_file_size
                .unwrap_or(file.content.len() as u64);
            FileAttr::file(size, file.times)
        } else {
            return Err(VfsError::not_found(path));
        };
        Ok(attr.owned_by(self.owner.uid, self.owner.gid))
    }

    fn creation_name(path: &str) -> VfsResult<&str> {
        component(path).ok_or_else(|| VfsError::invalid_path(path))
    }
}

impl VfsOps for FlatFs {
    fn getattr(&self, path: &str) -> VfsResult<FileAttr> {
        let store = self.store.lock();
        self.attr_of(&store, path)
    }

    fn readdir(&self, path: &str) -> VfsResult<DirListing> {
        let store = self.store.lock();
        if is_root(path) {
            let children = store
                .directories()
                .map(|d| DirEntry::directory(d.name.as_str()))
                .chain(store.files().map(|f| DirEntry::file(f.name.as_str())))
                .collect();
            return Ok(DirListing::new(children));
        }
        // Nothing lives below a non-root path.
        Ok(DirListing::new(Vec::new()))
    }

    fn read(&self, path: &str, offset: u64, size: u32) -> VfsResult<Vec<u8>> {
        let mut store = self.store.lock();
        let index = store
            .find_file_index(path)
            .ok_or_else(|| VfsError::operation_failed(path))?;
        let data = store
            .read_file(index, offset, size)
            .ok_or_else(|| VfsError::operation_failed(path))?;
        debug!(path, offset, size, copied = data.len(), "read");
        Ok(data)
    }

    fn write(&self, path: &str, offset: u64, data: &[u8]) -> VfsResult<u32> {
        let len = u32::try_from(data.len()).map_err(|_| VfsError::FileTooLarge {
            path: path.to_string(),
            size: data.len() as u64,
            max: u32::MAX as u64,
        })?;
        self.store.lock().write_file(path, data)?;
        debug!(path, offset, len, "write (whole-file replace)");
        Ok(len)
    }

    fn mknod(&self, path: &str, mode: u32, rdev: u32) -> VfsResult<FileAttr> {
        let kind = mode & S_IFMT;
        if kind != 0 && kind != S_IFREG {
            warn!(path, mode = format_args!("{mode:o}"), rdev, "special files are not supported");
            return Err(VfsError::operation_failed(path));
        }

        let name = Self::creation_name(path)?;
        let mut store = self.store.lock();
        store.add_file(name)?;
        debug!(path, "mknod");
        self.attr_of(&store, path)
    }

    fn mkdir(&self, path: &str, mode: u32) -> VfsResult<FileAttr> {
        let name = Self::creation_name(path)?;
        let mut store = self.store.lock();
        store.add_directory(name)?;
        debug!(path, mode = format_args!("{mode:o}"), "mkdir");
        self.attr_of(&store, path)
    }

    fn unlink(&self, path: &str) -> VfsResult<()> {
        let mut store = self.store.lock();
        let index = store
            .find_file_index(path)
            .ok_or_else(|| VfsError::operation_failed(path))?;
        store.remove_file(index);
        debug!(path, "unlink");
        Ok(())
    }

    fn rmdir(&self, path: &str) -> VfsResult<()> {
        let mut store = self.store.lock();
        if !store.is_directory(path) {
            return Err(VfsError::operation_failed(path));
        }
        store.remove_directory(path)?;
        debug!(path, "rmdir");
        Ok(())
    }

    fn utimens(
        &self,
        path: &str,
        atime: Option<TimeUpdate>,
        mtime: Option<TimeUpdate>,
    ) -> VfsResult<()> {
        let mut store = self.store.lock();
        let times = store
            .times_mut(path)
            .ok_or_else(|| VfsError::operation_failed(path))?;
        TimeUpdate::apply(atime, mtime, times);
        debug!(path, ?atime, ?mtime, "utimens");
        Ok(())
    }

    fn truncate(&self, path: &str, size: u64) -> VfsResult<()> {
        self.store.lock().truncate_file(path, size)?;
        debug!(path, size, "truncate");
        Ok(())
    }

    fn statfs(&self) -> VfsResult<StatFs> {
        const BLOCK_SIZE: u32 = 4096;

        let store = self.store.lock();
        let config = store.config();
        let used = (store.directory_count() + store.file_count()) as u64;
        let free = match (config.max_directories, config.max_files) {
            (Some(dirs), Some(files)) => {
                (dirs.saturating_sub(store.directory_count())
                    + files.saturating_sub(store.file_count())) as u64
            }
            _ => u64::MAX - used,
        };
        let bytes: u64 = store.files().map(|f| f.content.len() as u64).sum();
        let blocks = bytes.div_ceil(BLOCK_SIZE as u64);

        Ok(StatFs {
            blocks,
            bfree: 0,
            bavail: 0,
            files: used,
            ffree: free,
            bsize: BLOCK_SIZE,
            namelen: config.max_name_len.min(u32::MAX as usize) as u32,
            frsize: BLOCK_SIZE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn fs() -> FlatFs {
        FlatFs::with_owner(FsConfig::default(), Owner::new(1000, 1000))
    }

    fn listing(fs: &FlatFs, path: &str) -> Vec<String> {
        fs.readdir(path).unwrap().map(|e| e.name).collect()
    }

    #[test]
    fn test_getattr_root() {
        let fs = fs();
        let attr = fs.getattr("/").unwrap();
        assert!(attr.is_dir());
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.perm, 0o755);
        assert_eq!((attr.uid, attr.gid), (1000, 1000));
    }

    #[test]
    fn test_getattr_file_and_directory() {
        let fs = fs();
        fs.mkdir("/docs", 0o755).unwrap();
        fs.mknod("/a.txt", 0o100644, 0).unwrap();
        fs.write("/a.txt", 0, b"hello").unwrap();

        let dir = fs.getattr("/docs").unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir.nlink, 2);

        let file = fs.getattr("/a.txt").unwrap();
        assert!(file.is_file());
        assert_eq!(file.nlink, 1);
        assert_eq!(file.perm, 0o644);
        assert_eq!(file.size, 5);
    }

    #[test]
    fn test_getattr_missing_is_not_found() {
        let fs = fs();
        assert!(matches!(fs.getattr("/nope"), Err(VfsError::NotFound(_))));
        assert!(matches!(fs.getattr("/a/b"), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_reported_file_size_override() {
        let fs = FlatFs::with_owner(FsConfig::classic(), Owner::default());
        fs.mknod("/f", 0, 0).unwrap();
        fs.write("/f", 0, b"hi").unwrap();
        assert_eq!(fs.getattr("/f").unwrap().size, 1024);
    }

    #[test]
    fn test_readdir_root_groups_directories_then_files() {
        let fs = fs();
        fs.mkdir("/d1", 0o755).unwrap();
        fs.mknod("/f1", 0o644, 0).unwrap();
        fs.mkdir("/d2", 0o755).unwrap();

        assert_eq!(listing(&fs, "/"), [".", "..", "d1", "d2", "f1"]);
    }

    #[test]
    fn test_readdir_subdirectory_has_only_dot_entries() {
        let fs = fs();
        fs.mkdir("/docs", 0o755).unwrap();
        fs.mknod("/f", 0o644, 0).unwrap();

        assert_eq!(listing(&fs, "/docs"), [".", ".."]);
        assert_eq!(listing(&fs, "/f"), [".", ".."]);
        assert_eq!(listing(&fs, "/missing"), [".", ".."]);
    }

    #[test]
    fn test_readdir_kinds() {
        let fs = fs();
        fs.mkdir("/d", 0o755).unwrap();
        fs.mknod("/f", 0o644, 0).unwrap();

        let entries: Vec<_> = fs.readdir("/").unwrap().skip(2).collect();
        assert_eq!(entries, [DirEntry::directory("d"), DirEntry::file("f")]);
    }

    #[test]
    fn test_write_then_read() {
        let fs = fs();
        fs.mknod("/f", 0o644, 0).unwrap();
        assert_eq!(fs.write("/f", 0, b"round trip").unwrap(), 10);
        assert_eq!(fs.read("/f", 0, 10).unwrap(), b"round trip");
    }

    #[test]
    fn test_write_ignores_offset_and_overwrites() {
        let fs = fs();
        fs.mknod("/f", 0o644, 0).unwrap();
        fs.write("/f", 0, b"a much longer first write").unwrap();
        fs.write("/f", 7, b"short").unwrap();
        assert_eq!(fs.read_all("/f").unwrap(), b"short");
    }

    #[test]
    fn test_write_missing_file_is_not_found() {
        let fs = fs();
        assert!(matches!(fs.write("/ghost", 0, b"x"), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_read_missing_file_fails() {
        let fs = fs();
        fs.mkdir("/d", 0o755).unwrap();
        assert!(matches!(fs.read("/nope", 0, 1), Err(VfsError::OperationFailed(_))));
        assert!(matches!(fs.read("/d", 0, 1), Err(VfsError::OperationFailed(_))));
    }

    #[test]
    fn test_read_refreshes_atime_only() {
        let fs = fs();
        fs.mknod("/f", 0o644, 0).unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
        fs.utimens("/f", Some(TimeUpdate::At(old)), Some(TimeUpdate::At(old)))
            .unwrap();

        fs.read("/f", 0, 1).unwrap();
        let attr = fs.getattr("/f").unwrap();
        assert!(attr.times.atime > old);
        assert_eq!(attr.times.mtime, old);
    }

    #[test]
    fn test_write_refreshes_atime_and_mtime_only() {
        let fs = fs();
        fs.mknod("/f", 0o644, 0).unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(42);
        fs.utimens("/f", Some(TimeUpdate::At(old)), Some(TimeUpdate::At(old)))
            .unwrap();
        let ctime = fs.getattr("/f").unwrap().times.ctime;

        fs.write("/f", 0, b"fresh").unwrap();
        let times = fs.getattr("/f").unwrap().times;
        assert!(times.atime > old);
        assert!(times.mtime > old);
        assert_eq!(times.ctime, ctime);
    }

    #[test]
    fn test_mknod_rejects_special_files() {
        let fs = fs();
        let fifo = 0o010644;
        assert!(matches!(fs.mknod("/pipe", fifo, 0), Err(VfsError::OperationFailed(_))));
        assert!(!fs.exists("/pipe"));
    }

    #[test]
    fn test_create_below_directory_is_invalid() {
        let fs = fs();
        fs.mkdir("/docs", 0o755).unwrap();
        assert!(matches!(fs.mknod("/docs/a", 0o644, 0), Err(VfsError::InvalidPath(_))));
        assert!(matches!(fs.mkdir("/", 0o755), Err(VfsError::InvalidPath(_))));
    }

    #[test]
    fn test_unlink_directory_fails_and_keeps_it() {
        let fs = fs();
        fs.mkdir("/docs", 0o755).unwrap();
        assert!(matches!(fs.unlink("/docs"), Err(VfsError::OperationFailed(_))));
        assert!(fs.getattr("/docs").unwrap().is_dir());
    }

    #[test]
    fn test_rmdir_file_fails() {
        let fs = fs();
        fs.mknod("/f", 0o644, 0).unwrap();
        assert!(matches!(fs.rmdir("/f"), Err(VfsError::OperationFailed(_))));
        assert!(matches!(fs.rmdir("/none"), Err(VfsError::OperationFailed(_))));
        assert!(fs.exists("/f"));
    }

    #[test]
    fn test_utimens_applies_requested_times() {
        let fs = fs();
        fs.mkdir("/d", 0o755).unwrap();
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        fs.utimens("/d", Some(TimeUpdate::At(at)), Some(TimeUpdate::At(at)))
            .unwrap();

        let times = fs.getattr("/d").unwrap().times;
        assert_eq!(times.atime, at);
        assert_eq!(times.mtime, at);
        assert!(times.ctime > at);
    }

    #[test]
    fn test_utimens_defaults_to_now() {
        let fs = fs();
        fs.mknod("/f", 0o644, 0).unwrap();
        let before = SystemTime::now();
        fs.utimens("/f", None, Some(TimeUpdate::Now)).unwrap();

        let times = fs.getattr("/f").unwrap().times;
        assert!(times.atime >= before);
        assert!(times.mtime >= before);
        assert!(matches!(
            fs.utimens("/missing", None, None),
            Err(VfsError::OperationFailed(_))
        ));
    }

    #[test]
    fn test_truncate() {
        let fs = fs();
        fs.mknod("/f", 0o644, 0).unwrap();
        fs.write("/f", 0, b"hello world").unwrap();
        fs.truncate("/f", 0).unwrap();
        assert!(fs.read_all("/f").unwrap().is_empty());
        assert!(matches!(fs.truncate("/nope", 0), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_statfs_counts_entries() {
        let fs = FlatFs::with_owner(
            FsConfig {
                max_directories: Some(4),
                max_files: Some(4),
                ..FsConfig::default()
            },
            Owner::default(),
        );
        fs.mkdir("/d", 0o755).unwrap();
        fs.mknod("/f", 0o644, 0).unwrap();
        fs.write("/f", 0, &[7u8; 5000]).unwrap();

        let stat = fs.statfs().unwrap();
        assert_eq!(stat.files, 2);
        assert_eq!(stat.ffree, 6);
        assert_eq!(stat.blocks, 2);
        assert_eq!(stat.namelen, 255);
    }

    #[test]
    fn test_instances_are_independent() {
        let a = fs();
        let b = fs();
        a.mknod("/only-in-a", 0o644, 0).unwrap();
        assert!(a.exists("/only-in-a"));
        assert!(!b.exists("/only-in-a"));
    }
}
