//! flatfs binary.
//!
//! Mounts an empty in-memory filesystem and serves it until unmounted.
//!
//! Usage:
//!   flatfs /tmp/mnt
//!   flatfs /tmp/mnt --config flatfs.toml --auto-unmount
//!   RUST_LOG=flatfs_kernel=debug flatfs /tmp/mnt

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use flatfs_fuse::MountConfig;
use flatfs_kernel::{FlatFs, FsConfig};

/// In-memory filesystem with one level of directories.
#[derive(Parser, Debug)]
#[command(name = "flatfs")]
#[command(about = "Mount an in-memory flat filesystem")]
struct Args {
    /// Directory to mount on
    mountpoint: PathBuf,

    /// TOML file with quotas and naming rules
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reproduce the classic behaviour: duplicate names, 1024-byte sizes
    #[arg(long, conflicts_with = "config")]
    classic: bool,

    /// Allow other users to access the mount
    #[arg(long)]
    allow_other: bool,

    /// Unmount when the process exits
    #[arg(long)]
    auto_unmount: bool,

    /// Filesystem name shown in the mount table
    #[arg(long, default_value = "flatfs")]
    fs_name: String,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FsConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if args.classic => FsConfig::classic(),
        None => FsConfig::default(),
    };
    tracing::debug!(?config, "filesystem config");

    let mount = MountConfig {
        fs_name: args.fs_name,
        allow_other: args.allow_other,
        auto_unmount: args.auto_unmount,
    };

    let fs = Arc::new(FlatFs::new(config));
    flatfs_fuse::mount(fs, &args.mountpoint, &mount)
        .with_context(|| format!("mounting at {}", args.mountpoint.display()))?;

    tracing::info!("flatfs unmounted");
    Ok(())
}
