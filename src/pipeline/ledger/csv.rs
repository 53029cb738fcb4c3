//! CSV ledgers through the `csv` crate: quoted fields, doubled quotes,
//! embedded delimiters and newlines. Rows are written with CRLF terminators.

use super::codec::LedgerCodec;
use super::table::{Cell, Ledger};
use super::LedgerError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct CsvCodec {
    sheet_name: String,
    delimiter: u8,
}

impl CsvCodec {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Plain integers become numbers; everything else stays text.
fn parse_field(raw: &str) -> Cell {
    if raw.is_empty() {
        return Cell::Empty;
    }
    match raw.parse::<i64>() {
        // Only when printing it back gives the same text (keeps leading zeros and '+').
        Ok(n) if n.to_string() == raw => Cell::Int(n),
        _ => Cell::Text(raw.to_string()),
    }
}

fn field_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        other => other.key_text(),
    }
}

fn csv_error(e: &csv::Error) -> LedgerError {
    LedgerError::Csv {
        line: e.position().map_or(0, |p| p.line() as usize),
        message: e.to_string(),
    }
}

impl LedgerCodec for CsvCodec {
    fn load(&self, bytes: &[u8]) -> Result<Ledger, LedgerError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(bytes);

        let mut rows: Vec<Vec<Cell>> = Vec::new();
        let mut next_line = 1u64;

        for result in reader.byte_records() {
            let record = result.map_err(|e| csv_error(&e))?;

            // Blank lines never reach us as records; they are spacer rows in a ledger.
            if let Some(position) = record.position() {
                for _ in next_line..position.line() {
                    rows.push(Vec::new());
                }
                let embedded_newlines: u64 = record
                    .iter()
                    .map(|field| field.iter().filter(|&&b| b == b'\n').count() as u64)
                    .sum();
                next_line = position.line() + embedded_newlines + 1;
            }

            let cells: Vec<Cell> = record
                .iter()
                .map(|field| parse_field(&String::from_utf8_lossy(field)))
                .collect();
            // An empty row is written as a single empty quoted field.
            if cells.len() == 1 && cells[0] == Cell::Empty {
                rows.push(Vec::new());
            } else {
                rows.push(cells);
            }
        }

        Ok(Ledger::from_rows(self.sheet_name.clone(), rows))
    }

    fn save(&self, ledger: &Ledger) -> Result<Vec<u8>, LedgerError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .delimiter(self.delimiter)
            .terminator(csv::Terminator::CRLF)
            .from_writer(Vec::new());

        for cells in ledger.rows() {
            let fields: Vec<String> = cells.iter().map(field_text).collect();
            writer.write_record(&fields).map_err(|e| csv_error(&e))?;
        }

        writer.into_inner().map_err(|e| LedgerError::Csv {
            line: 0,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> CsvCodec {
        CsvCodec::new("ledger")
    }

    #[test]
    fn parses_quoted_fields() {
        let ledger = codec()
            .load(b"Manifest,Description\r\n1234567,\"Wood, pallets \"\"A\"\"\nline 2\"\r\n")
            .unwrap();
        assert_eq!(ledger.row_count(), 2);
        assert_eq!(ledger.get(1, 0), &Cell::Int(1234567));
        assert_eq!(ledger.get(1, 1), &Cell::text("Wood, pallets \"A\"\nline 2"));
    }

    #[test]
    fn leading_zero_keys_stay_text() {
        let ledger = codec().load(b"0012345\n+5\n-7").unwrap();
        assert_eq!(ledger.get(0, 0), &Cell::text("0012345"));
        assert_eq!(ledger.get(1, 0), &Cell::text("+5"));
        assert_eq!(ledger.get(2, 0), &Cell::Int(-7));
    }

    #[test]
    fn blank_lines_are_empty_rows() {
        let ledger = codec().load(b"a,b\n\nc\n").unwrap();
        assert_eq!(ledger.row_count(), 3);
        assert!(ledger.is_row_empty(1));
        assert_eq!(ledger.get(2, 0), &Cell::text("c"));
    }

    #[test]
    fn empty_rows_survive_save_and_load() {
        let mut ledger = Ledger::new("ledger");
        ledger.set(0, 0, Cell::text("Manifest Number"));
        ledger.set(1, 0, Cell::text("1234567"));
        ledger.set(3, 0, Cell::text("TOTAL"));

        let bytes = codec().save(&ledger).unwrap();
        let reloaded = codec().load(&bytes).unwrap();

        assert_eq!(reloaded.row_count(), 4);
        assert!(reloaded.is_row_empty(2));
        assert_eq!(reloaded.get(3, 0), &Cell::text("TOTAL"));
    }

    #[test]
    fn multiline_field_keeps_following_rows_aligned() {
        let ledger = codec().load(b"a,\"x\ny\"\n\nb\n").unwrap();
        assert_eq!(ledger.row_count(), 3);
        assert_eq!(ledger.get(0, 1), &Cell::text("x\ny"));
        assert!(ledger.is_row_empty(1));
        assert_eq!(ledger.get(2, 0), &Cell::text("b"));
    }

    #[test]
    fn save_then_load_preserves_cells() {
        let mut ledger = Ledger::new("ledger");
        ledger.set(0, 0, Cell::text("Manifest Number"));
        ledger.set(1, 0, Cell::text("1234567"));
        ledger.set(1, 2, Cell::text("Mixed \"steel\", wood\nscrap"));
        ledger.set(1, 3, Cell::Int(250));
        ledger.set(1, 4, Cell::Float(1.5));

        let bytes = codec().save(&ledger).unwrap();
        let reloaded = codec().load(&bytes).unwrap();

        assert_eq!(reloaded.row_count(), 2);
        assert_eq!(reloaded.get(1, 0).key_text(), "1234567");
        assert_eq!(reloaded.get(1, 2), &Cell::text("Mixed \"steel\", wood\nscrap"));
        assert_eq!(reloaded.get(1, 3), &Cell::Int(250));
        assert_eq!(reloaded.get(1, 4).key_text(), "1.5");
    }

    #[test]
    fn semicolon_delimiter() {
        let ledger = codec().with_delimiter(b';').load(b"a;b,c").unwrap();
        assert_eq!(ledger.get(0, 1), &Cell::text("b,c"));
    }

    #[test]
    fn bom_is_ignored() {
        let ledger = codec().load("\u{FEFF}Manifest".as_bytes()).unwrap();
        assert_eq!(ledger.get(0, 0), &Cell::text("Manifest"));
    }
}
