//! Virtual Filesystem.
//!
//! A flat, in-memory namespace: directories and files exist only directly
//! below `/`. Key components:
//!
//! - [`NamespaceStore`] - Ordered directory and file lists with timestamps
//!   and content
//! - [`VfsOps`] - One method per filesystem request
//! - [`FlatFs`] - The handler set, holding one store behind a mutex
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations take `/name` paths. The FUSE
//!   adapter maps inode numbers to paths.
//! - **Whole-file writes**: A write replaces the entire content; the offset
//!   is ignored.
//! - **Name is identity**: Lookup is an exact match on the single path
//!   component. Removal compacts the lists so positions stay dense.

mod error;
mod fs;
mod ops;
pub mod store;
mod types;

pub use error::{VfsError, VfsResult};
pub use fs::FlatFs;
pub use ops::VfsOps;
pub use store::{DirectoryEntry, FileEntry, NamespaceStore};
pub use types::{DirEntry, DirListing, FileAttr, FileType, StatFs, TimeUpdate, Timestamps};
