//! Tabular ledger: in-memory grid, file codecs and duplicate-safe reconciliation.

pub mod table;
pub mod codec;
pub mod csv;
#[cfg(feature = "workbook")]
pub mod workbook;
pub mod reconciler;

pub use table::*;
pub use codec::*;
pub use self::csv::CsvCodec;
#[cfg(feature = "workbook")]
pub use workbook::WorkbookCodec;
pub use reconciler::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("CSV parse error on line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("Workbook could not be read: {0}")]
    Workbook(String),

    #[error("Workbook could not be written: {0}")]
    WorkbookWrite(String),

    #[error("Workbook has no sheets")]
    NoSheets,

    #[error("Ledger format '{0}' is read-only")]
    ReadOnlyFormat(String),

    #[error("Unsupported ledger format: '{0}'")]
    UnsupportedFormat(String),
}
