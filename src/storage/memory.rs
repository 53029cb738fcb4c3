use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use super::types::{ContentPath, FolderPage, RemoteStorage};
use super::StorageError;
use crate::models::FileDescriptor;

/// In-memory storage backend for tests and offline runs.
///
/// Content is only served for the exact [`ContentPath`] shapes registered,
/// so path-fallback behavior can be exercised deterministically.
pub struct InMemoryStorage {
    folders: BTreeMap<String, Vec<FileDescriptor>>,
    contents: Mutex<HashMap<ContentPath, Vec<u8>>>,
    page_size: usize,
    shared_root: Option<String>,
    failing_folders: HashSet<String>,
    fail_uploads: bool,
    uploads: Mutex<Vec<Upload>>,
    calls: Mutex<Vec<String>>,
}

/// A recorded `put_content` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub path: String,
    pub bytes: Vec<u8>,
    pub overwrite: bool,
}

fn folder_key(path: &str) -> String {
    path.trim_end_matches('/').to_lowercase()
}

fn parent_of(path: &str) -> &str {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some((parent, _)) => parent,
        None => "",
    }
}

fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

impl InMemoryStorage {
    pub fn new() -> Self {
        let mut folders = BTreeMap::new();
        folders.insert(String::new(), Vec::new());
        Self {
            folders,
            contents: Mutex::new(HashMap::new()),
            page_size: 100,
            shared_root: None,
            failing_folders: HashSet::new(),
            fail_uploads: false,
            uploads: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Entries returned per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_shared_root(mut self, root: impl Into<String>) -> Self {
        self.shared_root = Some(root.into());
        self
    }

    /// Register a file at `path` (root-relative, leading slash), creating parent
    /// folders, and serve its content under the leading-slash shared path.
    pub fn with_file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let descriptor = FileDescriptor::file(base_name(path), path, bytes.len() as u64);
        self.add_entry(descriptor);
        self.insert_content(ContentPath::SharedRelative(path.to_string()), bytes);
        self
    }

    /// Register a listing entry without content.
    pub fn with_entry(mut self, descriptor: FileDescriptor) -> Self {
        self.add_entry(descriptor);
        self
    }

    /// Serve `bytes` for exactly this request shape.
    pub fn with_content(self, path: ContentPath, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert_content(path, bytes.into());
        self
    }

    fn insert_content(&self, path: ContentPath, bytes: Vec<u8>) {
        if let Ok(mut contents) = self.contents.lock() {
            contents.insert(path, bytes);
        }
    }

    /// Every listing of `path` fails with an API error.
    pub fn with_failing_folder(mut self, path: &str) -> Self {
        self.failing_folders.insert(folder_key(path));
        self
    }

    /// Every `put_content` call fails after being recorded in the call log.
    pub fn with_failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    fn add_entry(&mut self, descriptor: FileDescriptor) {
        let parent = parent_of(&descriptor.path).to_string();
        if !parent.is_empty() {
            self.ensure_folder(&parent);
        }
        let siblings = self.folders.entry(folder_key(&parent)).or_default();
        if !siblings.iter().any(|d| d.path_key() == descriptor.path_key()) {
            siblings.push(descriptor);
        }
    }

    fn ensure_folder(&mut self, path: &str) {
        let parent = parent_of(path).to_string();
        if !parent.is_empty() {
            self.ensure_folder(&parent);
        }
        let siblings = self.folders.entry(folder_key(&parent)).or_default();
        if !siblings.iter().any(|d| d.path_key() == path.to_lowercase()) {
            siblings.push(FileDescriptor::folder(base_name(path), path));
        }
        self.folders.entry(folder_key(path)).or_default();
    }

    /// Calls received so far, in order (`list:<path>@<offset>`, `get:<shape>`, `put:<path>`).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStorage for InMemoryStorage {
    fn list_folder(&self, path: &str, cursor: Option<&str>) -> Result<FolderPage, StorageError> {
        // Cursor format: "<folder key>#<offset>"
        let (key, offset) = match cursor {
            Some(c) => {
                let (key, offset) = c
                    .rsplit_once('#')
                    .ok_or_else(|| StorageError::Api {
                        status: 409,
                        body: format!("reset: bad cursor '{c}'"),
                    })?;
                let offset = offset.parse::<usize>().map_err(|_| StorageError::Api {
                    status: 409,
                    body: format!("reset: bad cursor '{c}'"),
                })?;
                (key.to_string(), offset)
            }
            None => (folder_key(path), 0),
        };

        self.record(format!("list:{key}@{offset}"));

        if self.failing_folders.contains(&key) {
            return Err(StorageError::Api {
                status: 500,
                body: format!("listing '{key}' failed"),
            });
        }

        let entries = self
            .folders
            .get(&key)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;

        let end = (offset + self.page_size).min(entries.len());
        let page = entries.get(offset..end).unwrap_or_default().to_vec();
        let cursor = (end < entries.len()).then(|| format!("{key}#{end}"));

        Ok(FolderPage { entries: page, cursor })
    }

    fn shared_root(&self) -> Result<Option<String>, StorageError> {
        Ok(self.shared_root.clone())
    }

    fn get_content(&self, path: &ContentPath) -> Result<Vec<u8>, StorageError> {
        self.record(format!("get:{}", path.describe()));
        let contents = self
            .contents
            .lock()
            .map_err(|_| StorageError::HttpClient("content store poisoned".into()))?;
        contents
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::Api {
                status: 409,
                body: format!("path/not_found: {}", path.describe()),
            })
    }

    fn put_content(&self, path: &str, bytes: &[u8], overwrite: bool) -> Result<(), StorageError> {
        self.record(format!("put:{path}"));
        if self.fail_uploads {
            return Err(StorageError::Api {
                status: 507,
                body: "insufficient_space".into(),
            });
        }
        let mut uploads = self
            .uploads
            .lock()
            .map_err(|_| StorageError::HttpClient("upload log poisoned".into()))?;
        uploads.push(Upload {
            path: path.to_string(),
            bytes: bytes.to_vec(),
            overwrite,
        });
        // Later downloads of the same file see the new bytes.
        self.insert_content(ContentPath::SharedRelative(path.to_string()), bytes.to_vec());
        Ok(())
    }
}
