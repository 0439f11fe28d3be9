//! Translation between the editor's asset space and the repository.

use alk_types::{AssetGuid, AssetPath, RepoPath};

/// Bidirectional mapping between editor asset paths and repository paths,
/// plus the editor's identifier for an asset.
pub trait PathMapper: Send + Sync {
    /// The repository path of an editor asset.
    fn repository_path_for(&self, asset: &AssetPath) -> RepoPath;

    /// The editor asset path of a repository path, or `None` when the path
    /// lies outside the editor project.
    fn asset_path_for(&self, repo: &RepoPath) -> Option<AssetPath>;

    /// The editor's identifier for an asset, or `None` if the editor does
    /// not know it.
    fn guid_for(&self, asset: &AssetPath) -> Option<AssetGuid>;
}

/// Mapper for an editor project living in a sub-directory of the repository
/// (`project_prefix`, empty when the project is the repository root).
///
/// GUIDs are derived from the asset path, so every asset under the project
/// has one.
#[derive(Clone, Debug, Default)]
pub struct ProjectPathMapper {
    project_prefix: String,
}

impl ProjectPathMapper {
    pub fn new(project_prefix: impl Into<String>) -> Self {
        Self {
            project_prefix: RepoPath::new(project_prefix.into()).into(),
        }
    }

    pub fn project_prefix(&self) -> &str {
        &self.project_prefix
    }
}

impl PathMapper for ProjectPathMapper {
    fn repository_path_for(&self, asset: &AssetPath) -> RepoPath {
        if self.project_prefix.is_empty() {
            RepoPath::new(asset.as_str())
        } else {
            RepoPath::new(format!("{}/{}", self.project_prefix, asset))
        }
    }

    fn asset_path_for(&self, repo: &RepoPath) -> Option<AssetPath> {
        repo.strip_dir(&self.project_prefix)
            .filter(|rest| !rest.is_empty())
            .map(AssetPath::new)
    }

    fn guid_for(&self, asset: &AssetPath) -> Option<AssetGuid> {
        Some(AssetGuid::from_asset_path(asset))
    }
}
