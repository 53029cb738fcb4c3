//! Workbook ledgers: read with calamine, `.xlsx` written back with rust_xlsxwriter.
//!
//! Saving re-emits the cell values of every sheet seen at load time, with the
//! ledger sheet replaced by the updated one. Cell formatting and formulas are
//! not carried over; formulas keep their last computed value.

use std::io::Cursor;
use std::sync::Mutex;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use rust_xlsxwriter::{Workbook, XlsxError};

use super::codec::LedgerCodec;
use super::table::{Cell, Ledger};
use super::LedgerError;

pub struct WorkbookCodec {
    preferred_sheet: String,
    writable: bool,
    /// Every sheet of the last loaded workbook, in workbook order.
    loaded: Mutex<Vec<Ledger>>,
}

impl WorkbookCodec {
    /// Codec for `.xlsx` ledgers, which can be saved.
    pub fn new(preferred_sheet: impl Into<String>) -> Self {
        Self {
            preferred_sheet: preferred_sheet.into(),
            writable: true,
            loaded: Mutex::new(Vec::new()),
        }
    }

    /// Codec for formats that can be read but not written back as themselves.
    pub fn read_only(preferred_sheet: impl Into<String>) -> Self {
        Self {
            writable: false,
            ..Self::new(preferred_sheet)
        }
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => Cell::Text(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#ERR:{e:?}")),
    }
}

/// Place a calamine range into a ledger at its absolute sheet position.
pub fn ledger_from_range(sheet_name: &str, range: &Range<Data>) -> Ledger {
    let (row0, col0) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut ledger = Ledger::new(sheet_name);
    for (i, row) in range.rows().enumerate() {
        for (j, data) in row.iter().enumerate() {
            let cell = cell_from_data(data);
            if cell != Cell::Empty {
                ledger.set(row0 + i, col0 + j, cell);
            }
        }
    }
    ledger
}

fn write_error(e: XlsxError) -> LedgerError {
    LedgerError::WorkbookWrite(e.to_string())
}

fn write_sheet(workbook: &mut Workbook, ledger: &Ledger) -> Result<(), LedgerError> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(ledger.sheet_name()).map_err(write_error)?;

    for (r, cells) in ledger.rows().iter().enumerate() {
        let row = u32::try_from(r)
            .map_err(|_| LedgerError::WorkbookWrite(format!("row {r} is out of range")))?;
        for (c, cell) in cells.iter().enumerate() {
            let col = u16::try_from(c)
                .map_err(|_| LedgerError::WorkbookWrite(format!("column {c} is out of range")))?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(row, col, s.as_str()).map_err(write_error)?;
                }
                Cell::Int(n) => {
                    worksheet.write_number(row, col, *n as f64).map_err(write_error)?;
                }
                Cell::Float(f) => {
                    worksheet.write_number(row, col, *f).map_err(write_error)?;
                }
            }
        }
    }
    Ok(())
}

impl LedgerCodec for WorkbookCodec {
    fn load(&self, bytes: &[u8]) -> Result<Ledger, LedgerError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| LedgerError::Workbook(e.to_string()))?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        let sheet = sheet_names
            .iter()
            .find(|n| **n == self.preferred_sheet)
            .or_else(|| sheet_names.first())
            .cloned()
            .ok_or(LedgerError::NoSheets)?;

        if sheet != self.preferred_sheet {
            tracing::info!(
                preferred = %self.preferred_sheet,
                using = %sheet,
                "Preferred ledger sheet missing, using first sheet"
            );
        }

        // A sheet that cannot be read fails the load, so a save never drops it.
        let mut sheets = Vec::with_capacity(sheet_names.len());
        for name in &sheet_names {
            let range = workbook
                .worksheet_range(name)
                .map_err(|e| LedgerError::Workbook(format!("sheet '{name}': {e}")))?;
            sheets.push(ledger_from_range(name, &range));
        }

        let ledger = sheets
            .iter()
            .find(|s| s.sheet_name() == sheet)
            .cloned()
            .ok_or(LedgerError::NoSheets)?;

        if let Ok(mut loaded) = self.loaded.lock() {
            *loaded = sheets;
        }
        Ok(ledger)
    }

    fn save(&self, ledger: &Ledger) -> Result<Vec<u8>, LedgerError> {
        if !self.writable {
            return Err(LedgerError::ReadOnlyFormat("legacy workbook".into()));
        }

        let loaded = self
            .loaded
            .lock()
            .map(|sheets| sheets.clone())
            .unwrap_or_default();

        let mut sheets: Vec<&Ledger> = loaded
            .iter()
            .map(|s| if s.sheet_name() == ledger.sheet_name() { ledger } else { s })
            .collect();
        if !sheets.iter().any(|s| s.sheet_name() == ledger.sheet_name()) {
            sheets.push(ledger);
        }

        let mut workbook = Workbook::new();
        for sheet in sheets {
            write_sheet(&mut workbook, sheet)?;
        }
        tracing::debug!(sheet = %ledger.sheet_name(), rows = ledger.row_count(), "Workbook encoded");
        workbook.save_to_buffer().map_err(write_error)
    }
}
