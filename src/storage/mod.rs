//! Remote storage: the storage-service seam, its Dropbox and in-memory
//! implementations, the recursive tree walker and the path-fallback fetcher.

pub mod types;
pub mod dropbox;
pub mod memory;
pub mod walker;
pub mod fetcher;

pub use types::*;
pub use dropbox::DropboxClient;
pub use memory::InMemoryStorage;
pub use walker::{ListingFailure, TreeWalker, WalkOutcome};
pub use fetcher::{path_candidates, relative_path, ContentFetcher, FetchError};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not connect to storage service at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Storage API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Response parsing failed: {0}")]
    ResponseParsing(String),

    #[error("No shared link configured for {0}")]
    MissingSharedLink(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),
}
