use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Cooperative cancellation shared between a batch and whoever started it.
/// Batches check it between documents, never mid-document.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Emitted during a batch for progress indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    Started {
        run_id: String,
        total: usize,
    },
    Progress {
        completed: usize,
        total: usize,
        current_file: String,
    },
    Completed {
        run_id: String,
        processed: usize,
        duration_ms: u64,
    },
}

/// Fresh batch run id.
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn emit(progress_fn: Option<&dyn Fn(ProgressEvent)>, event: ProgressEvent) {
    if let Some(progress) = progress_fn {
        progress(event);
    }
}
