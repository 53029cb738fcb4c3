use super::csv::CsvCodec;
use super::table::Ledger;
use super::LedgerError;

/// Logical read/write of a ledger file. The container format stays behind this seam.
pub trait LedgerCodec {
    fn load(&self, bytes: &[u8]) -> Result<Ledger, LedgerError>;

    fn save(&self, ledger: &Ledger) -> Result<Vec<u8>, LedgerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerFormat {
    Csv,
    /// `.xlsx`: read with calamine, written back with rust_xlsxwriter.
    Workbook,
    /// `.xls`, `.xlsm`, `.ods`: readable, but not written back in their own format.
    LegacyWorkbook,
}

impl LedgerFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &str) -> Result<Self, LedgerError> {
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Workbook),
            "xlsm" | "xls" | "ods" => Ok(Self::LegacyWorkbook),
            _ => Err(LedgerError::UnsupportedFormat(path.to_string())),
        }
    }

    /// Codec for this format. `sheet` is the preferred sheet for workbooks.
    pub fn codec(&self, sheet: &str) -> Result<Box<dyn LedgerCodec>, LedgerError> {
        match self {
            Self::Csv => Ok(Box::new(CsvCodec::new(sheet))),
            #[cfg(feature = "workbook")]
            Self::Workbook => Ok(Box::new(super::workbook::WorkbookCodec::new(sheet))),
            #[cfg(feature = "workbook")]
            Self::LegacyWorkbook => Ok(Box::new(super::workbook::WorkbookCodec::read_only(sheet))),
            #[cfg(not(feature = "workbook"))]
            Self::Workbook | Self::LegacyWorkbook => Err(LedgerError::UnsupportedFormat(
                "workbook support is disabled".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(LedgerFormat::from_path("/Reports/Ledger.CSV").unwrap(), LedgerFormat::Csv);
        assert_eq!(LedgerFormat::from_path("/ledger.xlsx").unwrap(), LedgerFormat::Workbook);
        assert_eq!(LedgerFormat::from_path("/old.XLS").unwrap(), LedgerFormat::LegacyWorkbook);
        assert_eq!(LedgerFormat::from_path("/site.ods").unwrap(), LedgerFormat::LegacyWorkbook);
        assert!(matches!(
            LedgerFormat::from_path("/ledger.pdf"),
            Err(LedgerError::UnsupportedFormat(_))
        ));
        assert!(LedgerFormat::from_path("/ledger").is_err());
    }

    #[test]
    fn csv_codec_is_always_available() {
        let codec = LedgerFormat::Csv.codec("ManifestDetails (2)").unwrap();
        let ledger = codec.load(b"A,B\n").unwrap();
        assert_eq!(ledger.row_count(), 1);
    }
}
