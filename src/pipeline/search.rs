//! Search batch: walk the shared tree, read every PDF and text file, and
//! classify it against the search criteria.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use super::control::{emit, new_run_id, CancelFlag, ProgressEvent};
use super::extraction::{decode_text, read_document, ExtractionError, PdfExtractor};
use super::fields::extract_record;
use super::matcher::classify;
use crate::config::SyncConfig;
use crate::models::{FileDescriptor, FileKind, MatchResult, OutcomeStatus, SearchCriteria};
use crate::notify::{NotificationEvent, NotificationSink};
use crate::storage::{ContentFetcher, FetchError, ListingFailure, RemoteStorage, TreeWalker};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("At least one search criterion is required")]
    EmptyCriteria,

    #[error("File cannot be previewed as text: {0}")]
    NotPreviewable(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Matched,
    NotMatched,
    DownloadFailed,
    TooLarge,
    Unreadable,
    Cancelled,
}

impl ScanStatus {
    pub fn outcome(&self) -> OutcomeStatus {
        match self {
            Self::Matched => OutcomeStatus::Success,
            Self::NotMatched | Self::TooLarge | Self::Cancelled => OutcomeStatus::Skipped,
            Self::DownloadFailed | Self::Unreadable => OutcomeStatus::Error,
        }
    }
}

/// Result for one searched file.
#[derive(Debug, Clone, Serialize)]
pub struct SearchEntry {
    pub file: FileDescriptor,
    pub status: ScanStatus,
    pub outcome: OutcomeStatus,
    pub message: String,
    /// Present whenever the file could be read.
    pub result: Option<MatchResult>,
}

impl SearchEntry {
    fn new(file: &FileDescriptor, status: ScanStatus, message: impl Into<String>) -> Self {
        Self {
            file: file.clone(),
            status,
            outcome: status.outcome(),
            message: message.into(),
            result: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub run_id: String,
    pub criteria: SearchCriteria,
    /// One entry per PDF or text file, in discovery order.
    pub entries: Vec<SearchEntry>,
    /// Ledger candidates found during the walk.
    pub spreadsheets: Vec<FileDescriptor>,
    pub failed_listings: Vec<ListingFailure>,
    pub duration_ms: u64,
}

impl SearchReport {
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn matching(&self) -> impl Iterator<Item = &SearchEntry> {
        self.entries.iter().filter(|e| e.status == ScanStatus::Matched)
    }

    pub fn matched_count(&self) -> usize {
        self.matching().count()
    }
}

pub struct SearchPipeline<'a> {
    storage: &'a dyn RemoteStorage,
    pdf: &'a dyn PdfExtractor,
    notifier: &'a dyn NotificationSink,
    config: &'a SyncConfig,
    cancel: CancelFlag,
}

impl<'a> SearchPipeline<'a> {
    pub fn new(
        storage: &'a dyn RemoteStorage,
        pdf: &'a dyn PdfExtractor,
        notifier: &'a dyn NotificationSink,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            storage,
            pdf,
            notifier,
            config,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    fn fetcher(&self, max_bytes: u64) -> ContentFetcher<'a> {
        let shared_root = match self.storage.shared_root() {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!(error = %e, "Shared root unknown, using paths as listed");
                None
            }
        };
        ContentFetcher::new(self.storage, shared_root, max_bytes)
    }

    pub fn run(&self, root: &str, criteria: &SearchCriteria) -> Result<SearchReport, SearchError> {
        self.run_with_progress(root, criteria, None)
    }

    pub fn run_with_progress(
        &self,
        root: &str,
        criteria: &SearchCriteria,
        progress_fn: Option<&dyn Fn(ProgressEvent)>,
    ) -> Result<SearchReport, SearchError> {
        if criteria.is_empty() {
            return Err(SearchError::EmptyCriteria);
        }

        let run_id = new_run_id();
        let span = tracing::info_span!("search", run_id = %run_id);
        let _guard = span.enter();
        let start = Instant::now();

        let walk = TreeWalker::new(self.storage).walk(root);
        let (searchable, spreadsheets): (Vec<FileDescriptor>, Vec<FileDescriptor>) = walk
            .files
            .into_iter()
            .filter(|f| f.is_searchable() || f.kind() == FileKind::Spreadsheet)
            .partition(|f| f.is_searchable());

        let total = searchable.len();
        tracing::info!(
            root = %root,
            files = total,
            spreadsheets = spreadsheets.len(),
            criteria = %criteria.describe(),
            "Search started"
        );
        emit(
            progress_fn,
            ProgressEvent::Started {
                run_id: run_id.clone(),
                total,
            },
        );

        let fetcher = self.fetcher(self.config.max_content_bytes);
        let mut entries = Vec::with_capacity(total);

        for (i, file) in searchable.iter().enumerate() {
            if self.cancel.is_cancelled() {
                entries.push(SearchEntry::new(file, ScanStatus::Cancelled, "cancelled"));
                continue;
            }
            emit(
                progress_fn,
                ProgressEvent::Progress {
                    completed: i,
                    total,
                    current_file: file.name.clone(),
                },
            );
            entries.push(self.scan(&fetcher, file, criteria));
        }

        let report = SearchReport {
            run_id: run_id.clone(),
            criteria: criteria.clone(),
            entries,
            spreadsheets,
            failed_listings: walk.failed_listings,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        let matching = report.matched_count();
        tracing::info!(
            matching,
            total,
            duration_ms = report.duration_ms,
            "Search complete"
        );
        emit(
            progress_fn,
            ProgressEvent::Completed {
                run_id,
                processed: total,
                duration_ms: report.duration_ms,
            },
        );

        if matching > 0 {
            self.notifier.notify(&NotificationEvent::SearchCompleted {
                matching,
                total,
                criteria: criteria.describe(),
            });
        }

        Ok(report)
    }

    fn scan(
        &self,
        fetcher: &ContentFetcher<'_>,
        file: &FileDescriptor,
        criteria: &SearchCriteria,
    ) -> SearchEntry {
        let bytes = match fetcher.fetch(file) {
            Ok(bytes) => bytes,
            Err(e @ FetchError::TooLarge { .. }) => {
                return SearchEntry::new(file, ScanStatus::TooLarge, e.to_string());
            }
            Err(e) => {
                return SearchEntry::new(
                    file,
                    ScanStatus::DownloadFailed,
                    format!("Failed to download file: {e}"),
                );
            }
        };

        let text = match read_document(file, &bytes, self.pdf, self.config.min_pdf_text_chars) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %file.path, error = %e, "Document unreadable");
                let message = match e {
                    ExtractionError::NoTextLayer { .. } => {
                        format!("No text layer (scanned document?): {e}")
                    }
                    _ => format!("Failed to parse document: {e}"),
                };
                return SearchEntry::new(file, ScanStatus::Unreadable, message);
            }
        };

        let record = extract_record(&text);
        let result = classify(file, &record, criteria);
        let (status, message) = if result.is_match() {
            (ScanStatus::Matched, "Matches search criteria".to_string())
        } else {
            (ScanStatus::NotMatched, result.missing_reasons.join("; "))
        };

        tracing::debug!(path = %file.path, status = ?status, "File scanned");

        SearchEntry {
            result: Some(result),
            ..SearchEntry::new(file, status, message)
        }
    }

    /// Text content of a previewable file, bounded by the preview size cap.
    pub fn preview(&self, file: &FileDescriptor) -> Result<String, SearchError> {
        if file.kind() != FileKind::Text {
            return Err(SearchError::NotPreviewable(file.name.clone()));
        }
        let bytes = self.fetcher(self.config.preview_max_bytes).fetch(file)?;
        Ok(decode_text(&bytes))
    }
}
