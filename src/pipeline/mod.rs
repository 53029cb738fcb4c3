pub mod control;
pub mod extraction;
pub mod fields;
pub mod matcher;
pub mod ledger;
pub mod search; // Search batch: walk, read, classify
pub mod processor; // Ledger update batch: read, reconcile, upload

pub use control::{CancelFlag, ProgressEvent};
pub use processor::{LedgerUpdateError, LedgerUpdateReport, LedgerUpdater};
pub use search::{ScanStatus, SearchEntry, SearchError, SearchPipeline, SearchReport};
