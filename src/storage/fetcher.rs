//! Content download with path-shape fallback.
//!
//! Shared-link backends disagree on how a file below the link root must be
//! addressed. The fetcher derives a fixed, ordered list of candidate shapes
//! from the descriptor and the shared-root prefix and tries each exactly once.
//! This is a fallback chain, not a retry loop.

use thiserror::Error;

use super::types::{ContentPath, RemoteStorage};
use crate::models::FileDescriptor;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("Download failed for {path} after {attempts} attempts: {last_error}")]
    Exhausted {
        path: String,
        attempts: usize,
        last_error: String,
    },
}

/// `path` with the shared-root prefix removed (case-insensitive), without a leading slash.
pub fn relative_path(path: &str, shared_root: Option<&str>) -> String {
    let root = shared_root.unwrap_or("").trim_end_matches('/');
    let stripped = if !root.is_empty() && path.to_lowercase().starts_with(&root.to_lowercase()) {
        // Byte offsets only line up when lower-casing preserved the prefix length.
        match path.get(root.len()..) {
            // The root must end on a path segment boundary.
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        }
    } else {
        path
    };
    stripped.trim_start_matches('/').to_string()
}

/// Ordered candidate shapes for downloading `path`. Duplicates are collapsed.
pub fn path_candidates(path: &str, shared_root: Option<&str>) -> Vec<ContentPath> {
    let relative = relative_path(path, shared_root);
    let file_name = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();

    let mut shapes: Vec<ContentPath> = Vec::with_capacity(6);
    if !relative.is_empty() {
        shapes.push(ContentPath::SharedRelative(format!("/{relative}")));
        shapes.push(ContentPath::SharedRelative(relative.clone()));
    }
    if !file_name.is_empty() {
        shapes.push(ContentPath::SharedRelative(format!("/{file_name}")));
        shapes.push(ContentPath::SharedRelative(file_name.to_string()));
    }
    shapes.push(ContentPath::LinkTarget);
    if !path.trim().is_empty() {
        let absolute = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        shapes.push(ContentPath::Absolute(absolute));
    }

    let mut unique: Vec<ContentPath> = Vec::with_capacity(shapes.len());
    for shape in shapes {
        if !unique.contains(&shape) {
            unique.push(shape);
        }
    }
    unique
}

/// Downloads file bytes through the candidate chain, enforcing a size ceiling.
pub struct ContentFetcher<'a> {
    storage: &'a dyn RemoteStorage,
    shared_root: Option<String>,
    max_bytes: u64,
}

impl<'a> ContentFetcher<'a> {
    pub fn new(storage: &'a dyn RemoteStorage, shared_root: Option<String>, max_bytes: u64) -> Self {
        Self {
            storage,
            shared_root,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn fetch(&self, file: &FileDescriptor) -> Result<Vec<u8>, FetchError> {
        if file.size > self.max_bytes {
            tracing::info!(
                path = %file.path,
                size = file.size,
                limit = self.max_bytes,
                "Skipping download: listed size exceeds limit"
            );
            return Err(FetchError::TooLarge {
                size: file.size,
                limit: self.max_bytes,
            });
        }

        let candidates = path_candidates(&file.path, self.shared_root.as_deref());
        let mut last_error = String::from("no candidate paths");

        for (index, candidate) in candidates.iter().enumerate() {
            match self.storage.get_content(candidate) {
                Ok(bytes) => {
                    let size = bytes.len() as u64;
                    if size > self.max_bytes {
                        return Err(FetchError::TooLarge {
                            size,
                            limit: self.max_bytes,
                        });
                    }
                    tracing::info!(
                        path = %file.path,
                        attempt = index + 1,
                        shape = %candidate.describe(),
                        bytes = size,
                        "Download succeeded"
                    );
                    return Ok(bytes);
                }
                Err(e) => {
                    tracing::debug!(
                        path = %file.path,
                        attempt = index + 1,
                        shape = %candidate.describe(),
                        error = %e,
                        "Download attempt failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        tracing::warn!(
            path = %file.path,
            attempts = candidates.len(),
            error = %last_error,
            "All download attempts failed"
        );

        Err(FetchError::Exhausted {
            path: file.path.clone(),
            attempts: candidates.len(),
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStorage;

    fn shared(p: &str) -> ContentPath {
        ContentPath::SharedRelative(p.to_string())
    }

    #[test]
    fn relative_path_strips_root_case_insensitively() {
        assert_eq!(
            relative_path("/Shared/Manifests/2025/m1.pdf", Some("/shared/manifests")),
            "2025/m1.pdf"
        );
        assert_eq!(relative_path("/other/m1.pdf", Some("/shared")), "other/m1.pdf");
        assert_eq!(relative_path("/m1.pdf", None), "m1.pdf");
    }

    #[test]
    fn root_prefix_must_end_on_segment_boundary() {
        assert_eq!(relative_path("/Foobar/x.pdf", Some("/Foo")), "Foobar/x.pdf");
        assert_eq!(relative_path("/foo/x.pdf", Some("/Foo/")), "x.pdf");
        assert_eq!(relative_path("/Foo", Some("/foo")), "");

        let candidates = path_candidates("/Foobar/x.pdf", Some("/Foo"));
        assert_eq!(candidates[0], shared("/Foobar/x.pdf"));
    }

    #[test]
    fn candidates_follow_fixed_order() {
        let candidates = path_candidates("/root/sub/m1.pdf", Some("/root"));
        assert_eq!(
            candidates,
            vec![
                shared("/sub/m1.pdf"),
                shared("sub/m1.pdf"),
                shared("/m1.pdf"),
                shared("m1.pdf"),
                ContentPath::LinkTarget,
                ContentPath::Absolute("/root/sub/m1.pdf".into()),
            ]
        );
    }

    #[test]
    fn candidates_for_file_at_share_root_are_collapsed() {
        let candidates = path_candidates("/m1.pdf", None);
        assert_eq!(
            candidates,
            vec![
                shared("/m1.pdf"),
                shared("m1.pdf"),
                ContentPath::LinkTarget,
                ContentPath::Absolute("/m1.pdf".into()),
            ]
        );
    }

    #[test]
    fn candidates_when_path_equals_root() {
        let candidates = path_candidates("/root", Some("/root"));
        assert_eq!(candidates[0], shared("/root"));
        assert!(candidates.contains(&ContentPath::LinkTarget));
    }

    #[test]
    fn first_successful_shape_wins() {
        let storage = InMemoryStorage::new()
            .with_content(shared("m1.pdf"), "by name")
            .with_content(ContentPath::Absolute("/root/sub/m1.pdf".into()), "direct");
        let fetcher = ContentFetcher::new(&storage, Some("/root".into()), 1024);

        let bytes = fetcher
            .fetch(&FileDescriptor::file("m1.pdf", "/root/sub/m1.pdf", 7))
            .unwrap();
        assert_eq!(bytes, b"by name");

        let calls = storage.calls();
        assert_eq!(calls.len(), 4, "each shape tried once until success: {calls:?}");
    }

    #[test]
    fn exhausted_chain_reports_attempt_count() {
        let storage = InMemoryStorage::new();
        let fetcher = ContentFetcher::new(&storage, None, 1024);
        let err = fetcher
            .fetch(&FileDescriptor::file("x.pdf", "/a/x.pdf", 1))
            .unwrap_err();
        match err {
            FetchError::Exhausted { attempts, .. } => assert_eq!(attempts, 6),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(storage.calls().len(), 6);
    }

    #[test]
    fn listed_size_over_limit_is_not_downloaded() {
        let storage = InMemoryStorage::new().with_file("/big.pdf", vec![0u8; 10]);
        let fetcher = ContentFetcher::new(&storage, None, 4);
        let err = fetcher
            .fetch(&FileDescriptor::file("big.pdf", "/big.pdf", 10))
            .unwrap_err();
        assert_eq!(err, FetchError::TooLarge { size: 10, limit: 4 });
        assert!(storage.calls().is_empty());
    }

    #[test]
    fn downloaded_size_over_limit_is_rejected() {
        let storage = InMemoryStorage::new().with_file("/big.pdf", vec![0u8; 10]);
        let fetcher = ContentFetcher::new(&storage, None, 4);
        // Listing under-reported the size.
        let err = fetcher
            .fetch(&FileDescriptor::file("big.pdf", "/big.pdf", 0))
            .unwrap_err();
        assert_eq!(err, FetchError::TooLarge { size: 10, limit: 4 });
    }
}
