//! Recursive listing of a shared folder tree.
//!
//! Folders are visited from an explicit queue, so nesting depth is bounded by
//! memory rather than the call stack. A failed listing call is logged and the
//! walk continues with what it has: the inventory is best effort.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use super::types::RemoteStorage;
use crate::models::FileDescriptor;

/// A listing call that failed during the walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingFailure {
    pub folder: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkOutcome {
    /// Files in discovery order, de-duplicated by path.
    pub files: Vec<FileDescriptor>,
    pub folders_visited: usize,
    pub failed_listings: Vec<ListingFailure>,
}

impl WalkOutcome {
    /// True when every listing call succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed_listings.is_empty()
    }
}

pub struct TreeWalker<'a> {
    storage: &'a dyn RemoteStorage,
}

impl<'a> TreeWalker<'a> {
    pub fn new(storage: &'a dyn RemoteStorage) -> Self {
        Self { storage }
    }

    /// All files under `root`, transitively. Partial on listing failures.
    pub fn list_all(&self, root: &str) -> Vec<FileDescriptor> {
        self.walk(root).files
    }

    pub fn walk(&self, root: &str) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        let mut pending: VecDeque<String> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_files: HashSet<String> = HashSet::new();

        let root = root.trim_end_matches('/').to_string();
        visited.insert(root.to_lowercase());
        pending.push_back(root);

        while let Some(folder) = pending.pop_front() {
            outcome.folders_visited += 1;
            let mut cursor: Option<String> = None;
            let mut page_number = 0usize;

            loop {
                page_number += 1;
                let page = match self.storage.list_folder(&folder, cursor.as_deref()) {
                    Ok(page) => page,
                    Err(e) => {
                        tracing::warn!(
                            folder = %folder,
                            page = page_number,
                            error = %e,
                            "Folder listing failed, keeping partial inventory"
                        );
                        outcome.failed_listings.push(ListingFailure {
                            folder: folder.clone(),
                            error: e.to_string(),
                        });
                        break;
                    }
                };

                tracing::debug!(
                    folder = %folder,
                    page = page_number,
                    entries = page.entries.len(),
                    has_more = page.cursor.is_some(),
                    "Listed folder page"
                );

                for entry in page.entries {
                    if entry.is_folder {
                        if visited.insert(entry.path_key()) {
                            pending.push_back(entry.path);
                        }
                    } else if seen_files.insert(entry.path_key()) {
                        outcome.files.push(entry);
                    }
                }

                match page.cursor {
                    // A cursor that does not advance would loop forever.
                    Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                    Some(_) => {
                        tracing::warn!(folder = %folder, "Listing cursor did not advance, stopping");
                        break;
                    }
                    None => break,
                }
            }
        }

        tracing::info!(
            files = outcome.files.len(),
            folders = outcome.folders_visited,
            failures = outcome.failed_listings.len(),
            "Tree walk complete"
        );

        outcome
    }
}
