use alk_types::FileStatus;

/// Picks the badge drawn on an asset. Drawing itself is the host's job.
pub trait IconResolver {
    type Icon;

    /// The icon for this combination, or `None` if the host has none.
    fn icon_for(&self, status: FileStatus, locked: bool) -> Option<Self::Icon>;
}
