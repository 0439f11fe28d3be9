//! Save and open checks for files checked out read-only.
//!
//! Lock tooling leaves lockable files read-only until their lock is taken,
//! so "read-only on disk" is the signal that an edit would be lost or would
//! collide with someone else's lock.

use std::io;
use std::path::PathBuf;

use alk_types::AssetPath;
use tracing::{error, warn};

/// Read-only state of files in the editor project.
pub trait FileAccess {
    /// `Ok(None)` if the file does not exist.
    fn is_read_only(&self, asset: &AssetPath) -> io::Result<Option<bool>>;
}

/// [`FileAccess`] over the real filesystem, relative to the project root.
#[derive(Clone, Debug)]
pub struct FsAccess {
    root: PathBuf,
}

impl FsAccess {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileAccess for FsAccess {
    fn is_read_only(&self, asset: &AssetPath) -> io::Result<Option<bool>> {
        match std::fs::metadata(self.root.join(asset.as_str())) {
            Ok(meta) => Ok(Some(meta.permissions().readonly())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Which of a batch of assets may be written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveFilter {
    pub allowed: Vec<AssetPath>,
    pub rejected: Vec<AssetPath>,
}

/// Decides whether the editor may write an asset.
#[derive(Clone, Debug)]
pub struct EditGuard<A> {
    access: A,
}

impl<A: FileAccess> EditGuard<A> {
    pub fn new(access: A) -> Self {
        Self { access }
    }

    /// `false` only for an existing, read-only file. A file whose state
    /// cannot be read is treated as editable.
    pub fn can_edit(&self, asset: &AssetPath) -> bool {
        match self.access.is_read_only(asset) {
            Ok(Some(read_only)) => !read_only,
            Ok(None) => true,
            Err(e) => {
                warn!(%asset, error = %e, "cannot read file permissions, allowing edit");
                true
            }
        }
    }

    /// Split a save request into the assets that may be written and those
    /// that must be skipped. Each rejection is logged.
    pub fn filter_saveable(&self, assets: &[AssetPath]) -> SaveFilter {
        let mut filter = SaveFilter::default();
        for asset in assets {
            if self.can_edit(asset) {
                filter.allowed.push(asset.clone());
            } else {
                error!(%asset, "cannot save read-only file; lock it before editing");
                filter.rejected.push(asset.clone());
            }
        }
        filter
    }

    /// Warning to show when a read-only file (typically a scene) is opened,
    /// or `None` if it is editable.
    pub fn check_open(&self, asset: &AssetPath) -> Option<String> {
        if self.can_edit(asset) {
            return None;
        }
        let message = format!(
            "{asset} is read-only and may be locked by someone else; edits to it cannot be saved"
        );
        error!("{message}");
        Some(message)
    }
}
