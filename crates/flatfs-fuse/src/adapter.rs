//! flatfs FUSE adapter
//!
//! Maps FUSE inode operations onto path-based [`VfsOps`] calls.

use flatfs_kernel::{FileAttr, FileType, TimeUpdate, VfsError, VfsOps};
use fuser::{
    FUSE_ROOT_ID, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use libc::{EINVAL, ENOENT, c_int};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// How long the kernel may cache attributes and entries.
const TTL: Duration = Duration::from_secs(1);

/// Block size reported in attributes.
const BLOCK_SIZE: u32 = 512;

/// Bidirectional inode ↔ path table.
///
/// The root is always inode 1. Other inodes are handed out on first lookup
/// and released when the entry is removed.
#[derive(Debug)]
pub struct InodeTable {
    paths: HashMap<u64, String>,
    inodes: HashMap<String, u64>,
    next_inode: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let mut paths = HashMap::new();
        let mut inodes = HashMap::new();
        paths.insert(FUSE_ROOT_ID, "/".to_string());
        inodes.insert("/".to_string(), FUSE_ROOT_ID);
        Self {
            paths,
            inodes,
            next_inode: FUSE_ROOT_ID + 1,
        }
    }

    pub fn path(&self, ino: u64) -> Option<&str> {
        self.paths.get(&ino).map(String::as_str)
    }

    /// Inode for `path`, allocating one if needed.
    pub fn get_or_alloc(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.inodes.get(path) {
            return ino;
        }
        let ino = self.next_inode;
        self.next_inode += 1;
        self.paths.insert(ino, path.to_string());
        self.inodes.insert(path.to_string(), ino);
        ino
    }

    /// Forget the inode of a removed path.
    pub fn release(&mut self, path: &str) {
        if let Some(ino) = self.inodes.remove(path) {
            self.paths.remove(&ino);
        }
    }

    /// Path of `name` inside the directory `parent`.
    ///
    /// Children of non-root directories produce a two-component path, which
    /// the filesystem never resolves and refuses to create. Fails with
    /// `ENOENT` for an unknown parent and `EINVAL` for a name that is not
    /// UTF-8, so distinct byte names never share a path.
    pub fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, c_int> {
        let parent_path = self.path(parent).ok_or(ENOENT)?;
        let name = name.to_str().ok_or(EINVAL)?;
        if parent_path == "/" {
            Ok(format!("/{name}"))
        } else {
            Ok(format!("{parent_path}/{name}"))
        }
    }
}

/// Convert engine attributes to the FUSE wire form.
pub fn to_fuse_attr(attr: &FileAttr, ino: u64) -> fuser::FileAttr {
    let kind = match attr.kind {
        FileType::Directory => fuser::FileType::Directory,
        FileType::File => fuser::FileType::RegularFile,
    };
    fuser::FileAttr {
        ino,
        size: attr.size,
        blocks: attr.size.div_ceil(BLOCK_SIZE as u64),
        atime: attr.times.atime,
        mtime: attr.times.mtime,
        ctime: attr.times.ctime,
        crtime: attr.times.ctime,
        kind,
        perm: attr.perm as u16,
        nlink: attr.nlink,
        uid: attr.uid,
        gid: attr.gid,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}

/// Convert a FUSE `setattr` time to an engine time request.
pub fn to_time_update(time: TimeOrNow) -> TimeUpdate {
    match time {
        TimeOrNow::SpecificTime(t) => TimeUpdate::At(t),
        TimeOrNow::Now => TimeUpdate::Now,
    }
}

/// FUSE filesystem backed by any [`VfsOps`] implementation.
pub struct FlatFsFuse {
    fs: Arc<dyn VfsOps>,
    inodes: InodeTable,
}

impl std::fmt::Debug for FlatFsFuse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatFsFuse")
            .field("inodes", &self.inodes)
            .finish_non_exhaustive()
    }
}

impl FlatFsFuse {
    pub fn new(fs: Arc<dyn VfsOps>) -> Self {
        Self {
            fs,
            inodes: InodeTable::new(),
        }
    }

    /// getattr for `path`, allocating its inode.
    fn entry_attr(&mut self, path: &str) -> Result<fuser::FileAttr, c_int> {
        let attr = self.fs.getattr(path).map_err(|e| errno(&e))?;
        let ino = self.inodes.get_or_alloc(path);
        Ok(to_fuse_attr(&attr, ino))
    }

    fn resolve(&self, ino: u64) -> Result<String, c_int> {
        self.inodes.path(ino).map(str::to_owned).ok_or(ENOENT)
    }

    fn resolve_child(&self, parent: u64, name: &OsStr) -> Result<String, c_int> {
        self.inodes.child_path(parent, name).inspect_err(|&code| {
            if code == EINVAL {
                warn!(name = ?name, "rejecting non-UTF-8 name");
            }
        })
    }
}

fn errno(e: &VfsError) -> c_int {
    match e {
        VfsError::NotFound(_) => debug!("{e}"),
        _ => warn!("{e}"),
    }
    e.errno()
}

impl fuser::Filesystem for FlatFsFuse {
    fn init(&mut self, _req: &Request<'_>, _config: &mut fuser::KernelConfig) -> Result<(), c_int> {
        info!("flatfs FUSE adapter initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        info!("flatfs FUSE adapter destroyed");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let result = self
            .resolve_child(parent, name)
            .and_then(|path| match self.fs.getattr(&path) {
                Ok(attr) => Ok(to_fuse_attr(&attr, self.inodes.get_or_alloc(&path))),
                Err(e) => Err(e.errno()),
            });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(code) => reply.error(code),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let result = self.resolve(ino).and_then(|path| {
            self.fs
                .getattr(&path)
                .map(|attr| to_fuse_attr(&attr, ino))
                .map_err(|e| errno(&e))
        });
        match result {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(code) => reply.error(code),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.resolve(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        if mode.is_some() {
            debug!(path = %path, "ignoring chmod");
        }

        if let Some(size) = size {
            if let Err(e) = self.fs.truncate(&path, size) {
                return reply.error(errno(&e));
            }
        }
        if atime.is_some() || mtime.is_some() {
            // The engine treats a missing time as "now"; FUSE means "leave it".
            let current = match self.fs.getattr(&path) {
                Ok(attr) => attr.times,
                Err(e) => return reply.error(errno(&e)),
            };
            let atime = atime.map_or(TimeUpdate::At(current.atime), to_time_update);
            let mtime = mtime.map_or(TimeUpdate::At(current.mtime), to_time_update);
            if let Err(e) = self.fs.utimens(&path, Some(atime), Some(mtime)) {
                return reply.error(errno(&e));
            }
        }

        match self.fs.getattr(&path) {
            Ok(attr) => reply.attr(&TTL, &to_fuse_attr(&attr, ino)),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        let result = self.resolve_child(parent, name).and_then(|path| {
            self.fs.mknod(&path, mode, rdev).map_err(|e| errno(&e))?;
            self.entry_attr(&path)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(code) => reply.error(code),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let result = self.resolve_child(parent, name).and_then(|path| {
            self.fs.mkdir(&path, mode).map_err(|e| errno(&e))?;
            self.entry_attr(&path)
        });
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(code) => reply.error(code),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self.resolve_child(parent, name).and_then(|path| {
            self.fs.unlink(&path).map_err(|e| errno(&e))?;
            self.inodes.release(&path);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(code) => reply.error(code),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self.resolve_child(parent, name).and_then(|path| {
            self.fs.rmdir(&path).map_err(|e| errno(&e))?;
            self.inodes.release(&path);
            Ok(())
        });
        match result {
            Ok(()) => reply.ok(),
            Err(code) => reply.error(code),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let result = self.resolve(ino).and_then(|path| {
            self.fs
                .read(&path, offset.max(0) as u64, size)
                .map_err(|e| errno(&e))
        });
        match result {
            Ok(data) => reply.data(&data),
            Err(code) => reply.error(code),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let result = self.resolve(ino).and_then(|path| {
            self.fs
                .write(&path, offset.max(0) as u64, data)
                .map_err(|e| errno(&e))
        });
        match result {
            Ok(written) => reply.written(written),
            Err(code) => reply.error(code),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.resolve(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        let listing = match self.fs.readdir(&path) {
            Ok(listing) => listing,
            Err(e) => return reply.error(errno(&e)),
        };

        for (i, entry) in listing.enumerate().skip(offset.max(0) as usize) {
            let entry_ino = match entry.name.as_str() {
                "." => ino,
                ".." => FUSE_ROOT_ID,
                name => {
                    let child = self.inodes.child_path(ino, OsStr::new(name));
                    match child {
                        Ok(child) => self.inodes.get_or_alloc(&child),
                        Err(_) => continue,
                    }
                }
            };
            let kind = match entry.kind {
                FileType::Directory => fuser::FileType::Directory,
                FileType::File => fuser::FileType::RegularFile,
            };
            // Offset of the *next* entry.
            if reply.add(entry_ino, (i + 1) as i64, kind, &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        match self.fs.statfs() {
            Ok(s) => reply.statfs(
                s.blocks, s.bfree, s.bavail, s.files, s.ffree, s.bsize, s.namelen, s.frsize,
            ),
            Err(e) => reply.error(errno(&e)),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let result = self.resolve_child(parent, name).and_then(|path| {
            self.fs.mknod(&path, mode, 0).map_err(|e| errno(&e))?;
            self.entry_attr(&path)
        });
        match result {
            Ok(attr) => reply.created(&TTL, &attr, 0, 0, 0),
            Err(code) => reply.error(code),
        }
    }
}
