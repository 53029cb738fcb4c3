use serde::{Deserialize, Serialize};

use crate::models::{LedgerRow, MaterialQuantities};

/// One ledger cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Int(_) | Self::Float(_) => false,
        }
    }

    /// Trimmed textual form used for key comparison.
    ///
    /// Whole floats print without a fraction, so a numeric `1234567.0` read
    /// from a workbook compares equal to the text `1234567`.
    pub fn key_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.0}"),
            Self::Float(f) => f.to_string(),
        }
    }

    /// Non-negative integer reading, 0 when the cell holds none.
    pub fn as_u64(&self) -> u64 {
        match self {
            Self::Int(n) => u64::try_from(*n).unwrap_or(0),
            Self::Float(f) if f.is_finite() && *f >= 0.0 => f.round() as u64,
            Self::Text(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key_text())
    }
}

/// Column positions of the manifest ledger (0-based: A = 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLayout {
    pub key_col: usize,
    pub date_col: usize,
    pub description_col: usize,
    pub quantity_col: usize,
    pub steel_col: usize,
    pub concrete_col: usize,
    pub wood_col: usize,
    pub paper_col: usize,
    pub plastic_col: usize,
    pub location_col: usize,
    /// Minimum digit count for a key cell to mark a data row.
    pub min_key_digits: usize,
}

impl LedgerLayout {
    /// A manifest, B date, C description, D general quantity, E steel,
    /// F concrete, G wood, H paper & CB, I plastic, J location.
    pub fn standard(min_key_digits: usize) -> Self {
        Self {
            key_col: 0,
            date_col: 1,
            description_col: 2,
            quantity_col: 3,
            steel_col: 4,
            concrete_col: 5,
            wood_col: 6,
            paper_col: 7,
            plastic_col: 8,
            location_col: 9,
            min_key_digits,
        }
    }

    /// Whether `key` looks like a manifest number rather than a header or note.
    pub fn is_data_key(&self, key: &str) -> bool {
        key.len() >= self.min_key_digits && !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn width(&self) -> usize {
        [
            self.key_col,
            self.date_col,
            self.description_col,
            self.quantity_col,
            self.steel_col,
            self.concrete_col,
            self.wood_col,
            self.paper_col,
            self.plastic_col,
            self.location_col,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self::standard(6)
    }
}

/// A single sheet held in memory. Rows and columns are 0-based.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    sheet_name: String,
    rows: Vec<Vec<Cell>>,
}

impl Ledger {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(sheet_name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            rows,
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Write a cell, growing the grid as needed.
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, Cell::Empty);
        }
        cells[col] = cell;
    }

    /// Insert an empty row at `at`, shifting later rows down.
    pub fn insert_row(&mut self, at: usize) {
        if at >= self.rows.len() {
            self.rows.resize_with(at + 1, Vec::new);
        } else {
            self.rows.insert(at, Vec::new());
        }
    }

    pub fn is_row_empty(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .map_or(true, |cells| cells.iter().all(Cell::is_empty))
    }

    /// Index of the last row holding any value.
    pub fn last_populated_row(&self) -> Option<usize> {
        (0..self.rows.len()).rev().find(|&r| !self.is_row_empty(r))
    }

    /// Rows whose key cell is a data key, in sheet order.
    pub fn data_row_indices(&self, layout: &LedgerLayout) -> Vec<usize> {
        (0..self.rows.len())
            .filter(|&r| layout.is_data_key(&self.get(r, layout.key_col).key_text()))
            .collect()
    }

    /// Data rows read back through the column mapping.
    pub fn data_rows(&self, layout: &LedgerLayout) -> Vec<LedgerRow> {
        self.data_row_indices(layout)
            .into_iter()
            .map(|r| LedgerRow {
                manifest_number: self.get(r, layout.key_col).key_text(),
                manifest_date: self.get(r, layout.date_col).key_text(),
                waste_description: self.get(r, layout.description_col).key_text(),
                quantity: self.get(r, layout.quantity_col).as_u64(),
                materials: MaterialQuantities {
                    plastic: self.get(r, layout.plastic_col).as_u64(),
                    paper: self.get(r, layout.paper_col).as_u64(),
                    wood: self.get(r, layout.wood_col).as_u64(),
                    steel: self.get(r, layout.steel_col).as_u64(),
                    concrete: self.get(r, layout.concrete_col).as_u64(),
                },
                wastes_location: self.get(r, layout.location_col).key_text(),
            })
            .collect()
    }
}
