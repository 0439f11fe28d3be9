//! Path and identifier types.
//!
//! Two path spaces exist side by side: the repository's (relative to the
//! repository root) and the editor's (relative to the project root, e.g.
//! `Assets/Textures/x.png`). Both are stored normalized so that equality is a
//! plain string comparison.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Normalize a relative path: `\` becomes `/`, empty and `.` segments are
/// dropped, so `./Assets//x.png/` and `Assets\x.png` compare equal to
/// `Assets/x.png`. Case is preserved.
fn normalize(raw: &str) -> String {
    raw.replace('\\', "/")
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Case-insensitive check that `path` is `root` or lies below it.
fn is_under_ci(path: &str, root: &str) -> bool {
    let root = normalize(root);
    if root.is_empty() {
        return true;
    }
    let (path, root) = (path.to_lowercase(), root.to_lowercase());
    path == root || path.starts_with(&format!("{root}/"))
}

macro_rules! path_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a normalized path.
            pub fn new(raw: impl AsRef<str>) -> Self {
                Self(normalize(raw.as_ref()))
            }

            /// Create a normalized path, rejecting input that normalizes to nothing.
            pub fn parse(raw: impl AsRef<str>) -> Result<Self, TypeError> {
                let path = Self::new(raw);
                if path.0.is_empty() {
                    return Err(TypeError::EmptyPath);
                }
                Ok(path)
            }

            /// The normalized string form.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if this path equals `root` or lies under it,
            /// comparing case-insensitively on segment boundaries.
            pub fn is_under(&self, root: &str) -> bool {
                is_under_ci(&self.0, root)
            }

            /// Returns `true` if the path ends with `suffix`, ignoring case.
            pub fn has_suffix(&self, suffix: &str) -> bool {
                self.0.to_lowercase().ends_with(&suffix.to_lowercase())
            }

            /// This path with `suffix` appended to the final segment.
            pub fn with_suffix(&self, suffix: &str) -> Self {
                Self::new(format!("{}{suffix}", self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:?})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self::new(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::new(raw)
            }
        }

        impl From<$name> for String {
            fn from(path: $name) -> Self {
                path.0
            }
        }
    };
}

path_type! {
    /// A path relative to the repository root.
    RepoPath
}

path_type! {
    /// A path relative to the editor project root (e.g. `Assets/x.png`).
    AssetPath
}

impl RepoPath {
    /// Strip a leading directory prefix, returning `None` if this path is
    /// not under it. An empty prefix returns the path unchanged.
    pub fn strip_dir(&self, prefix: &str) -> Option<String> {
        let prefix = normalize(prefix);
        if prefix.is_empty() {
            return Some(self.0.clone());
        }
        self.0
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string)
    }
}

/// Editor-side identifier of an asset: 16 bytes, rendered as 32 hex chars.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetGuid([u8; 16]);

impl AssetGuid {
    /// Derive a stable identifier from an asset path (BLAKE3, truncated).
    pub fn from_asset_path(path: &AssetPath) -> Self {
        let hash = blake3::hash(path.as_str().as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 32-char hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 16 {
            return Err(TypeError::InvalidLength {
                expected: 16,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for AssetGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetGuid({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for AssetGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators_and_dots() {
        assert_eq!(RepoPath::new("Assets\\Textures\\x.png").as_str(), "Assets/Textures/x.png");
        assert_eq!(RepoPath::new("./Assets//x.png/").as_str(), "Assets/x.png");
        assert_eq!(RepoPath::new("Assets/x.png"), RepoPath::new(".\\Assets\\x.png"));
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(AssetPath::parse("./"), Err(TypeError::EmptyPath));
        assert!(AssetPath::parse("Assets").is_ok());
    }

    #[test]
    fn is_under_is_case_insensitive_on_segment_boundary() {
        let p = AssetPath::new("assets/Models/ship.fbx");
        assert!(p.is_under("Assets"));
        assert!(AssetPath::new("Assets").is_under("Assets"));
        assert!(!AssetPath::new("AssetsExtra/x.png").is_under("Assets"));
        assert!(!AssetPath::new("ProjectSettings/Tags.asset").is_under("Assets"));
    }

    #[test]
    fn suffix_checks_ignore_case() {
        let meta = AssetPath::new("Assets/x.png.META");
        assert!(meta.has_suffix(".meta"));
        let p = AssetPath::new("Assets/x.png");
        assert!(!p.has_suffix(".meta"));
        assert_eq!(p.with_suffix(".meta").as_str(), "Assets/x.png.meta");
    }

    #[test]
    fn strip_dir() {
        let p = RepoPath::new("Game/Assets/x.png");
        assert_eq!(p.strip_dir("Game").as_deref(), Some("Assets/x.png"));
        assert_eq!(p.strip_dir("").as_deref(), Some("Game/Assets/x.png"));
        assert_eq!(p.strip_dir("Other"), None);
        assert_eq!(p.strip_dir("Gam"), None);
    }

    #[test]
    fn guid_is_stable_and_hex() {
        let path = AssetPath::new("Assets/x.png");
        let a = AssetGuid::from_asset_path(&path);
        let b = AssetGuid::from_asset_path(&AssetPath::new("Assets\\x.png"));
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 32);
        assert_eq!(AssetGuid::from_hex(&a.to_hex()).unwrap(), a);
        assert_ne!(a, AssetGuid::from_asset_path(&AssetPath::new("Assets/y.png")));
    }

    #[test]
    fn guid_from_hex_rejects_bad_input() {
        assert!(matches!(AssetGuid::from_hex("zz"), Err(TypeError::InvalidHex(_))));
        assert_eq!(
            AssetGuid::from_hex("abcd"),
            Err(TypeError::InvalidLength { expected: 16, actual: 2 })
        );
    }

    #[test]
    fn serde_uses_plain_strings() {
        let p = RepoPath::new("Assets/x.png");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"Assets/x.png\"");
        let back: RepoPath = serde_json::from_str("\"Assets\\\\x.png\"").unwrap();
        assert_eq!(back, p);
    }

    proptest::proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[a-zA-Z./\\\\]{0,24}") {
            let once = RepoPath::new(&raw);
            let twice = RepoPath::new(once.as_str());
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
