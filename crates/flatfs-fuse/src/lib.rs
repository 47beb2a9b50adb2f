//! FUSE mount for flatfs.
//!
//! [`FlatFsFuse`] adapts the path-based engine in `flatfs-kernel` to the
//! inode-based `fuser` session; [`mount`] runs it on a mountpoint until the
//! filesystem is unmounted.

pub mod adapter;

use std::path::Path;
use std::sync::Arc;

use flatfs_kernel::VfsOps;
use fuser::MountOption;

pub use adapter::{FlatFsFuse, InodeTable};

/// Mount-time options.
#[derive(Debug, Clone)]
pub struct MountConfig {
    /// Name shown in the mount table.
    pub fs_name: String,
    /// Let other users access the mount.
    pub allow_other: bool,
    /// Unmount automatically when the process exits.
    pub auto_unmount: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            fs_name: "flatfs".to_string(),
            allow_other: false,
            auto_unmount: false,
        }
    }
}

impl MountConfig {
    /// fuser options for this configuration.
    pub fn options(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::RW,
            MountOption::FSName(self.fs_name.clone()),
            MountOption::Subtype("flatfs".to_string()),
        ];
        if self.allow_other {
            options.push(MountOption::AllowOther);
        }
        if self.auto_unmount {
            options.push(MountOption::AutoUnmount);
        }
        options
    }
}

/// Serve `fs` at `mountpoint`, blocking until it is unmounted.
pub fn mount(fs: Arc<dyn VfsOps>, mountpoint: &Path, config: &MountConfig) -> std::io::Result<()> {
    tracing::info!(mountpoint = %mountpoint.display(), fs_name = %config.fs_name, "mounting");
    fuser::mount2(FlatFsFuse::new(fs), mountpoint, &config.options())
}
