//! Ledger update batch.
//!
//! Downloads the ledger once, reads every selected manifest PDF, reconciles the
//! extracted record into the ledger and uploads the ledger back (overwrite) when
//! at least one row was added. Each selected file gets exactly one outcome.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use super::control::{emit, new_run_id, CancelFlag, ProgressEvent};
use super::extraction::{read_document, PdfExtractor};
use super::fields::extract_record;
use super::ledger::{reconcile_one, Ledger, LedgerCodec, LedgerError, LedgerFormat, LedgerLayout};
use crate::config::SyncConfig;
use crate::models::{DocumentOutcome, FileDescriptor, FileKind, OutcomeStatus};
use crate::notify::{NotificationEvent, NotificationSink};
use crate::storage::{ContentFetcher, FetchError, RemoteStorage, StorageError};

const OPERATION: &str = "ledger update";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures that concern the ledger file itself rather than one manifest.
#[derive(Error, Debug)]
pub enum LedgerUpdateError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Ledger download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Ledger upload failed: {0}")]
    Upload(#[from] StorageError),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LedgerUpdateReport {
    pub run_id: String,
    pub ledger_file: String,
    /// Sheet the rows were reconciled into; `None` when the ledger never loaded.
    pub sheet_name: Option<String>,
    /// One outcome per selected file, in selection order.
    pub outcomes: Vec<DocumentOutcome>,
    /// Rows that made it into the uploaded ledger.
    pub appended_count: usize,
    pub saved: bool,
    /// Ledger-level failure (load or save), if any.
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl LedgerUpdateReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

// ---------------------------------------------------------------------------
// Updater
// ---------------------------------------------------------------------------

pub struct LedgerUpdater<'a> {
    storage: &'a dyn RemoteStorage,
    pdf: &'a dyn PdfExtractor,
    notifier: &'a dyn NotificationSink,
    config: &'a SyncConfig,
    cancel: CancelFlag,
}

impl<'a> LedgerUpdater<'a> {
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

    fn fetcher(&self) -> ContentFetcher<'a> {
        let shared_root = match self.storage.shared_root() {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!(error = %e, "Shared root unknown, using paths as listed");
                None
            }
        };
        ContentFetcher::new(self.storage, shared_root, self.config.max_content_bytes)
    }

    pub fn run(&self, ledger_file: &FileDescriptor, selected: &[FileDescriptor]) -> LedgerUpdateReport {
        self.run_with_progress(ledger_file, selected, None)
    }

    pub fn run_with_progress(
        &self,
        ledger_file: &FileDescriptor,
        selected: &[FileDescriptor],
        progress_fn: Option<&dyn Fn(ProgressEvent)>,
    ) -> LedgerUpdateReport {
        let run_id = new_run_id();
        let span = tracing::info_span!("ledger_update", run_id = %run_id);
        let _guard = span.enter();
        let start = Instant::now();

        let total = selected.len();
        tracing::info!(ledger = %ledger_file.path, files = total, "Ledger update started");
        emit(
            progress_fn,
            ProgressEvent::Started {
                run_id: run_id.clone(),
                total,
            },
        );

        let mut report = LedgerUpdateReport {
            run_id: run_id.clone(),
            ledger_file: ledger_file.path.clone(),
            sheet_name: None,
            outcomes: Vec::with_capacity(total),
            appended_count: 0,
            saved: false,
            error: None,
            duration_ms: 0,
        };

        let fetcher = self.fetcher();
        let (codec, mut ledger) = match self.load_ledger(&fetcher, ledger_file) {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!(ledger = %ledger_file.path, error = %e, "Ledger could not be loaded");
                let message = format!("Ledger unavailable: {e}");
                report.outcomes = selected
                    .iter()
                    .map(|f| DocumentOutcome::new(&f.name, &f.path, OutcomeStatus::Error, message.clone()))
                    .collect();
                report.error = Some(e.to_string());
                self.notifier.notify(&NotificationEvent::Failure {
                    operation: OPERATION.to_string(),
                    error: e.to_string(),
                });
                return self.finish(report, start, 0, progress_fn);
            }
        };
        report.sheet_name = Some(ledger.sheet_name().to_string());

        let layout = LedgerLayout::standard(self.config.min_key_digits);
        let mut processed = 0usize;
        let mut appended = 0usize;

        for (i, file) in selected.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.outcomes.push(DocumentOutcome::new(
                    &file.name,
                    &file.path,
                    OutcomeStatus::Skipped,
                    "cancelled",
                ));
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

            if file.kind() != FileKind::Pdf {
                report.outcomes.push(DocumentOutcome::new(
                    &file.name,
                    &file.path,
                    OutcomeStatus::Skipped,
                    "Not a PDF file",
                ));
                continue;
            }

            processed += 1;
            let outcome = self.process(&fetcher, &mut ledger, &layout, file);
            if outcome.status == OutcomeStatus::Success {
                appended += 1;
            }
            report.outcomes.push(outcome);
        }

        if appended > 0 {
            match self.save_ledger(codec.as_ref(), &ledger, ledger_file) {
                Ok(()) => {
                    report.saved = true;
                    report.appended_count = appended;
                    tracing::info!(ledger = %ledger_file.path, rows = appended, "Ledger uploaded");
                }
                Err(e) => {
                    tracing::error!(ledger = %ledger_file.path, error = %e, "Ledger could not be saved");
                    // Rows that were never persisted are not successes.
                    for outcome in report
                        .outcomes
                        .iter_mut()
                        .filter(|o| o.status == OutcomeStatus::Success)
                    {
                        outcome.status = OutcomeStatus::Error;
                        outcome.message = format!("Ledger not saved: {e}");
                    }
                    report.error = Some(e.to_string());
                    self.notifier.notify(&NotificationEvent::Failure {
                        operation: OPERATION.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        } else {
            tracing::info!(ledger = %ledger_file.path, "No new rows, ledger left untouched");
        }

        self.notifier.notify(&NotificationEvent::LedgerUpdated {
            ledger_file: ledger_file.path.clone(),
            processed,
            updated: report.appended_count,
        });

        self.finish(report, start, processed, progress_fn)
    }

    fn finish(
        &self,
        mut report: LedgerUpdateReport,
        start: Instant,
        processed: usize,
        progress_fn: Option<&dyn Fn(ProgressEvent)>,
    ) -> LedgerUpdateReport {
        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            processed,
            appended = report.appended_count,
            saved = report.saved,
            duration_ms = report.duration_ms,
            "Ledger update complete"
        );
        emit(
            progress_fn,
            ProgressEvent::Completed {
                run_id: report.run_id.clone(),
                processed,
                duration_ms: report.duration_ms,
            },
        );
        report
    }

    fn load_ledger(
        &self,
        fetcher: &ContentFetcher<'_>,
        ledger_file: &FileDescriptor,
    ) -> Result<(Box<dyn LedgerCodec>, Ledger), LedgerUpdateError> {
        let codec = LedgerFormat::from_path(&ledger_file.path)?.codec(&self.config.ledger_sheet)?;
        let bytes = fetcher.fetch(ledger_file)?;
        let ledger = codec.load(&bytes)?;
        tracing::debug!(
            sheet = ledger.sheet_name(),
            rows = ledger.row_count(),
            "Ledger loaded"
        );
        Ok((codec, ledger))
    }

    fn save_ledger(
        &self,
        codec: &dyn LedgerCodec,
        ledger: &Ledger,
        ledger_file: &FileDescriptor,
    ) -> Result<(), LedgerUpdateError> {
        let bytes = codec.save(ledger)?;
        self.storage.put_content(&ledger_file.path, &bytes, true)?;
        Ok(())
    }

    fn process(
        &self,
        fetcher: &ContentFetcher<'_>,
        ledger: &mut Ledger,
        layout: &LedgerLayout,
        file: &FileDescriptor,
    ) -> DocumentOutcome {
        let bytes = match fetcher.fetch(file) {
            Ok(bytes) => bytes,
            Err(e) => {
                return DocumentOutcome::new(
                    &file.name,
                    &file.path,
                    OutcomeStatus::Error,
                    format!("Failed to download PDF: {e}"),
                );
            }
        };

        let text = match read_document(file, &bytes, self.pdf, self.config.min_pdf_text_chars) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %file.path, error = %e, "Manifest unreadable");
                return DocumentOutcome::new(
                    &file.name,
                    &file.path,
                    OutcomeStatus::Error,
                    format!("Failed to read PDF: {e}"),
                );
            }
        };

        let record = extract_record(&text);
        let reconciled = reconcile_one(ledger, layout, &record);
        let outcome = DocumentOutcome::new(&file.name, &file.path, reconciled.status(), reconciled.message());
        match reconciled.manifest_number() {
            Some(key) => outcome.with_manifest(key),
            None => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::pipeline::extraction::{ExtractionError, PageText};
    use crate::storage::InMemoryStorage;

    /// Treats everything after the `%PDF-` header line as the page text.
    struct EchoPdf;

    impl PdfExtractor for EchoPdf {
        fn extract_text(&self, pdf_bytes: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
            let text = String::from_utf8_lossy(pdf_bytes);
            let body = text.split_once('\n').map_or("", |(_, body)| body);
            Ok(vec![PageText {
                page_number: 1,
                text: body.to_string(),
            }])
        }

        fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
            Ok(1)
        }
    }

    const LEDGER_CSV: &str = "Manifest Number,Manifest Date,Waste Description,Quantity,Steel,Concrete,Wood,Paper & CB,Plastic,Location\r\n\
        1234567,01/01/2025,Wood,10,0,0,10,0,0,Dubai\r\n";

    fn manifest_pdf(number: &str, description: &str, quantity: u64) -> String {
        format!(
            "%PDF-1.4\nManifest Number: {number}\nManifest Date: 12/03/2025\n\
             Producer Name: Acme Corp\nWastes Location: Dubai Industrial City\n\
             Part 3\nWaste Description Physical State Quantity\n{description} Solid {quantity}"
        )
    }

    fn storage() -> InMemoryStorage {
        InMemoryStorage::new()
            .with_file("/ledger.csv", LEDGER_CSV)
            .with_file("/in/new.pdf", manifest_pdf("7000001", "Plastic", 250))
            .with_file("/in/old.pdf", manifest_pdf("1234567", "Wood", 10))
            .with_file(
                "/in/blank.pdf",
                "%PDF-1.4\nThis scanned page carries a stamp and a signature but no manifest fields at all.",
            )
    }

    fn selected(names: &[&str]) -> Vec<FileDescriptor> {
        names
            .iter()
            .map(|n| FileDescriptor::file(*n, format!("/in/{n}"), 0))
            .collect()
    }

    fn ledger_file() -> FileDescriptor {
        FileDescriptor::file("ledger.csv", "/ledger.csv", 0)
    }

    fn status_of(report: &LedgerUpdateReport, name: &str) -> OutcomeStatus {
        report
            .outcomes
            .iter()
            .find(|o| o.file_name == name)
            .map(|o| o.status)
            .unwrap()
    }

    #[test]
    fn appends_new_manifest_and_uploads_once() {
        let storage = storage();
        let config = SyncConfig::default();
        let notifier = RecordingNotifier::new();
        let updater = LedgerUpdater::new(&storage, &EchoPdf, &notifier, &config);

        let report = updater.run(&ledger_file(), &selected(&["new.pdf", "old.pdf", "blank.pdf"]));

        assert!(report.is_success());
        assert!(report.saved);
        assert_eq!(report.appended_count, 1);
        assert_eq!(report.outcomes.len(), 3);

        let added = &report.outcomes[0];
        assert_eq!(added.status, OutcomeStatus::Success);
        assert_eq!(added.message, "Added as row 3");
        assert_eq!(added.manifest_number.as_deref(), Some("7000001"));
        assert_eq!(status_of(&report, "old.pdf"), OutcomeStatus::Skipped);
        assert_eq!(status_of(&report, "blank.pdf"), OutcomeStatus::Warning);

        let uploads = storage.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].path, "/ledger.csv");
        assert!(uploads[0].overwrite);
        let written = String::from_utf8(uploads[0].bytes.clone()).unwrap();
        assert!(written.contains("7000001"));
        assert!(written.contains("Dubai Industrial City"));

        assert_eq!(
            notifier.events(),
            vec![NotificationEvent::LedgerUpdated {
                ledger_file: "/ledger.csv".into(),
                processed: 3,
                updated: 1,
            }]
        );
    }

    #[cfg(feature = "workbook")]
    #[test]
    fn workbook_ledger_is_updated_and_reads_back() {
        use crate::pipeline::ledger::{CsvCodec, WorkbookCodec};

        let config = SyncConfig::default();
        let sheet = CsvCodec::new(config.ledger_sheet.as_str())
            .load(LEDGER_CSV.as_bytes())
            .unwrap();
        let workbook = WorkbookCodec::new(config.ledger_sheet.as_str()).save(&sheet).unwrap();
        let storage = storage().with_file("/Reports/ledger.xlsx", workbook);
        let notifier = RecordingNotifier::new();
        let updater = LedgerUpdater::new(&storage, &EchoPdf, &notifier, &config);
        let ledger_file = FileDescriptor::file("ledger.xlsx", "/Reports/ledger.xlsx", 0);

        let report = updater.run(&ledger_file, &selected(&["new.pdf", "old.pdf"]));

        assert!(report.is_success());
        assert!(report.saved);
        assert_eq!(report.sheet_name.as_deref(), Some(config.ledger_sheet.as_str()));
        assert_eq!(status_of(&report, "new.pdf"), OutcomeStatus::Success);
        assert_eq!(status_of(&report, "old.pdf"), OutcomeStatus::Skipped);

        let uploads = storage.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].path, "/Reports/ledger.xlsx");

        let reloaded = WorkbookCodec::new(config.ledger_sheet.as_str())
            .load(&uploads[0].bytes)
            .unwrap();
        let rows = reloaded.data_rows(&LedgerLayout::default());
        let keys: Vec<&str> = rows.iter().map(|r| r.manifest_number.as_str()).collect();
        assert_eq!(keys, vec!["1234567", "7000001"]);
        assert_eq!(rows[1].quantity, 250);
        assert_eq!(rows[1].wastes_location, "Dubai Industrial City");

        let second = updater.run(&ledger_file, &selected(&["new.pdf"]));
        assert_eq!(second.appended_count, 0);
        assert_eq!(status_of(&second, "new.pdf"), OutcomeStatus::Skipped);
    }

    #[test]
    fn second_run_adds_nothing_and_skips_upload() {
        let storage = storage();
        let config = SyncConfig::default();
        let notifier = RecordingNotifier::new();
        let updater = LedgerUpdater::new(&storage, &EchoPdf, &notifier, &config);
        let files = selected(&["new.pdf", "old.pdf"]);

        let first = updater.run(&ledger_file(), &files);
        let second = updater.run(&ledger_file(), &files);

        assert_eq!(first.appended_count, 1);
        assert_eq!(second.appended_count, 0);
        assert!(!second.saved);
        assert!(second.outcomes.iter().all(|o| o.status == OutcomeStatus::Skipped));
        assert_eq!(storage.uploads().len(), 1);
    }

    #[test]
    fn per_file_failures_keep_the_batch_going() {
        let storage = storage()
            .with_file("/in/scan.pdf", "%PDF-1.4\n ")
            .with_file("/in/notes.txt", "Manifest Number: 8000001");
        let config = SyncConfig::default();
        let notifier = RecordingNotifier::new();
        let updater = LedgerUpdater::new(&storage, &EchoPdf, &notifier, &config);

        let report = updater.run(
            &ledger_file(),
            &selected(&["missing.pdf", "scan.pdf", "notes.txt", "new.pdf"]),
        );

        let missing = &report.outcomes[0];
        assert_eq!(missing.status, OutcomeStatus::Error);
        assert!(missing.message.starts_with("Failed to download PDF"));
        assert_eq!(status_of(&report, "scan.pdf"), OutcomeStatus::Error);
        assert_eq!(status_of(&report, "notes.txt"), OutcomeStatus::Skipped);
        assert_eq!(status_of(&report, "new.pdf"), OutcomeStatus::Success);
        assert_eq!(report.appended_count, 1);
    }

    #[test]
    fn failed_upload_downgrades_added_rows() {
        let storage = storage().with_failing_uploads();
        let config = SyncConfig::default();
        let notifier = RecordingNotifier::new();
        let updater = LedgerUpdater::new(&storage, &EchoPdf, &notifier, &config);

        let report = updater.run(&ledger_file(), &selected(&["new.pdf", "old.pdf"]));

        assert!(!report.is_success());
        assert!(!report.saved);
        assert_eq!(report.appended_count, 0);
        assert_eq!(status_of(&report, "new.pdf"), OutcomeStatus::Error);
        assert!(report.outcomes[0].message.starts_with("Ledger not saved"));
        assert_eq!(status_of(&report, "old.pdf"), OutcomeStatus::Skipped);

        let events = notifier.events();
        assert!(matches!(events[0], NotificationEvent::Failure { .. }));
        assert!(matches!(
            events[1],
            NotificationEvent::LedgerUpdated { updated: 0, .. }
        ));
    }

    #[test]
    fn unreadable_ledger_fails_every_file() {
        let storage = InMemoryStorage::new().with_file("/in/new.pdf", manifest_pdf("7000001", "Plastic", 1));
        let config = SyncConfig::default();
        let notifier = RecordingNotifier::new();
        let updater = LedgerUpdater::new(&storage, &EchoPdf, &notifier, &config);

        let report = updater.run(&ledger_file(), &selected(&["new.pdf"]));

        assert!(report.sheet_name.is_none());
        assert!(report.error.is_some());
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].status, OutcomeStatus::Error);
        assert!(report.outcomes[0].message.starts_with("Ledger unavailable"));
        assert!(storage.uploads().is_empty());
        assert_eq!(notifier.events().len(), 1);
    }

    #[test]
    fn unsupported_ledger_extension_is_rejected_before_download() {
        let storage = storage();
        let config = SyncConfig::default();
        let notifier = RecordingNotifier::new();
        let updater = LedgerUpdater::new(&storage, &EchoPdf, &notifier, &config);

        let report = updater.run(
            &FileDescriptor::file("ledger.docx", "/ledger.docx", 0),
            &selected(&["new.pdf"]),
        );

        assert_eq!(report.outcomes[0].status, OutcomeStatus::Error);
        assert!(storage.calls().iter().all(|c| !c.starts_with("get:")));
    }

    #[test]
    fn cancelled_run_touches_nothing() {
        let storage = storage();
        let config = SyncConfig::default();
        let notifier = RecordingNotifier::new();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let updater = LedgerUpdater::new(&storage, &EchoPdf, &notifier, &config).with_cancel(cancel);

        let report = updater.run(&ledger_file(), &selected(&["new.pdf", "old.pdf"]));

        assert!(report
            .outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::Skipped && o.message == "cancelled"));
        assert!(storage.uploads().is_empty());
    }

    #[test]
    fn progress_reports_every_file() {
        let storage = storage();
        let config = SyncConfig::default();
        let notifier = RecordingNotifier::new();
        let updater = LedgerUpdater::new(&storage, &EchoPdf, &notifier, &config);
        let events = std::cell::RefCell::new(Vec::new());
        let record = |e: ProgressEvent| events.borrow_mut().push(e);

        updater.run_with_progress(&ledger_file(), &selected(&["new.pdf", "old.pdf"]), Some(&record));

        let events = events.into_inner();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], ProgressEvent::Started { total: 2, .. }));
        assert!(matches!(events[3], ProgressEvent::Completed { processed: 2, .. }));
    }
}
