use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "alk",
    about = "Asset Lock Kit: lock and status decorations for editor projects",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository state as JSON (remote, user, changes, locks)
    #[arg(short, long, global = true, default_value = "alk-repo.json")]
    pub snapshot: PathBuf,

    /// Session configuration (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// List decorated assets with their status and lock holder
    Status,
    /// Check whether a lock may be requested for an asset
    CanLock(AssetArgs),
    /// Check whether the lock on an asset may be released
    CanRelease(AssetArgs),
    /// Request a lock on an asset
    Lock(LockArgs),
    /// Release the lock on an asset (and its metadata sidecar)
    Release(LockArgs),
    /// Check which files may be saved
    CheckSave(CheckSaveArgs),
}

#[derive(Args)]
pub struct AssetArgs {
    /// Asset path relative to the project, e.g. Assets/Textures/hero.png
    pub asset: String,
}

#[derive(Args)]
pub struct LockArgs {
    pub asset: String,
    /// Do not write the updated state back to the snapshot file
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct CheckSaveArgs {
    /// Project root on disk
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    pub paths: Vec<String>,
}
