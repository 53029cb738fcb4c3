use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::FileKind;

/// Extensions shown and searched as plain text.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "json", "xml", "html", "css", "js", "php", "py", "java", "c", "cpp", "h", "yml",
    "yaml", "ini", "conf", "log", "sql", "sh", "bat",
];

/// Extensions accepted as ledgers.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "ods", "csv"];

/// One entry of the remote inventory. Identified by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    /// Canonical path as reported by the listing, relative to the shared root.
    pub path: String,
    pub size: u64,
    pub is_folder: bool,
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileDescriptor {
    pub fn file(name: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            is_folder: false,
            modified_at: None,
        }
    }

    pub fn folder(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size: 0,
            is_folder: true,
            modified_at: None,
        }
    }

    /// Lower-cased extension without the dot; empty when there is none.
    pub fn extension(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
            _ => String::new(),
        }
    }

    pub fn kind(&self) -> FileKind {
        if self.is_folder {
            return FileKind::Other;
        }
        let ext = self.extension();
        if ext == "pdf" {
            FileKind::Pdf
        } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
            FileKind::Spreadsheet
        } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            FileKind::Text
        } else {
            FileKind::Other
        }
    }

    /// Whether the file participates in a field search.
    pub fn is_searchable(&self) -> bool {
        matches!(self.kind(), FileKind::Pdf | FileKind::Text)
    }

    /// Path key used for de-duplication (listings may vary in case).
    pub fn path_key(&self) -> String {
        self.path.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_extension() {
        assert_eq!(FileDescriptor::file("M-1.PDF", "/a/M-1.PDF", 1).kind(), FileKind::Pdf);
        assert_eq!(FileDescriptor::file("ledger.xlsx", "/ledger.xlsx", 1).kind(), FileKind::Spreadsheet);
        assert_eq!(FileDescriptor::file("notes.txt", "/notes.txt", 1).kind(), FileKind::Text);
        assert_eq!(FileDescriptor::file("photo.jpg", "/photo.jpg", 1).kind(), FileKind::Other);
    }

    #[test]
    fn folder_is_never_searchable() {
        let folder = FileDescriptor::folder("reports.pdf", "/reports.pdf");
        assert_eq!(folder.kind(), FileKind::Other);
        assert!(!folder.is_searchable());
    }

    #[test]
    fn dotfile_has_no_extension() {
        assert_eq!(FileDescriptor::file(".env", "/.env", 1).extension(), "");
        assert_eq!(FileDescriptor::file("README", "/README", 1).extension(), "");
    }
}
