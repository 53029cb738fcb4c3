use super::StorageError;
use crate::models::FileDescriptor;

/// One page of a folder listing.
#[derive(Debug, Clone, Default)]
pub struct FolderPage {
    pub entries: Vec<FileDescriptor>,
    /// Continuation cursor; `None` once the listing is exhausted.
    pub cursor: Option<String>,
}

/// How a content request addresses a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentPath {
    /// Path resolved relative to the shared link root.
    SharedRelative(String),
    /// The shared link itself (a file shared directly).
    LinkTarget,
    /// Path in the account namespace, bypassing the shared link.
    Absolute(String),
}

impl ContentPath {
    pub fn describe(&self) -> String {
        match self {
            Self::SharedRelative(p) => format!("shared link path '{p}'"),
            Self::LinkTarget => "shared link target".to_string(),
            Self::Absolute(p) => format!("direct path '{p}'"),
        }
    }
}

/// Remote storage service abstraction (allows in-memory doubles for tests).
///
/// Authentication is handled by whoever constructs the implementation.
pub trait RemoteStorage {
    /// List one page of `path`. When `cursor` is set, `path` is ignored and the
    /// listing continues from the cursor.
    fn list_folder(&self, path: &str, cursor: Option<&str>) -> Result<FolderPage, StorageError>;

    /// Root path the shared link points at, when the backend knows it.
    fn shared_root(&self) -> Result<Option<String>, StorageError>;

    fn get_content(&self, path: &ContentPath) -> Result<Vec<u8>, StorageError>;

    fn put_content(&self, path: &str, bytes: &[u8], overwrite: bool) -> Result<(), StorageError>;
}
