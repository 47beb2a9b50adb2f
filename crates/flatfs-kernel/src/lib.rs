//! # flatfs-kernel
//!
//! The engine behind flatfs: an in-memory filesystem with one level of
//! directories and files below the root, and the request handlers a FUSE
//! transport calls into.
//!
//! ```
//! use flatfs_kernel::{FlatFs, FsConfig, VfsOps};
//!
//! let fs = FlatFs::new(FsConfig::default());
//! fs.mknod("/hello.txt", 0o644, 0).unwrap();
//! fs.write("/hello.txt", 0, b"hi").unwrap();
//! assert_eq!(fs.read("/hello.txt", 0, 2).unwrap(), b"hi");
//! ```

pub mod config;
pub mod owner;
pub mod vfs;

pub use config::{ConfigError, FsConfig};
pub use owner::Owner;
pub use vfs::{
    DirEntry, DirListing, FileAttr, FileType, FlatFs, NamespaceStore, StatFs, TimeUpdate,
    Timestamps, VfsError, VfsOps, VfsResult,
};
