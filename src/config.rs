use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "wasteledger";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sheet the manifest ledger lives on in the shared workbooks.
pub const DEFAULT_LEDGER_SHEET: &str = "ManifestDetails (2)";

const DROPBOX_API_URL: &str = "https://api.dropboxapi.com/2";
const DROPBOX_CONTENT_URL: &str = "https://content.dropboxapi.com/2";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "wasteledger=info,warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

/// Where batch summaries are posted (Bitrix-style incoming webhook).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
    /// Chat target; takes precedence over `user_id`.
    pub chat_id: Option<String>,
    pub user_id: Option<u64>,
}

/// Tunables for the search and ledger-update batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Files larger than this are never downloaded into memory for parsing.
    pub max_content_bytes: u64,
    /// Upper bound for showing a text file inline.
    pub preview_max_bytes: u64,
    pub request_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    /// PDFs yielding fewer characters than this are treated as scanned.
    pub min_pdf_text_chars: usize,
    /// Minimum digit count for a key cell to count as a data row.
    pub min_key_digits: usize,
    pub ledger_sheet: String,
    pub dropbox_api_url: String,
    pub dropbox_content_url: String,
    pub notify: NotifyConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: 10 * 1024 * 1024,
            preview_max_bytes: 1024 * 1024,
            request_timeout_secs: 60,
            upload_timeout_secs: 120,
            min_pdf_text_chars: 50,
            min_key_digits: 6,
            ledger_sheet: DEFAULT_LEDGER_SHEET.to_string(),
            dropbox_api_url: DROPBOX_API_URL.to_string(),
            dropbox_content_url: DROPBOX_CONTENT_URL.to_string(),
            notify: NotifyConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Defaults overlaid with `WASTELEDGER_*` and `BITRIX_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SyncConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("WASTELEDGER_MAX_CONTENT_BYTES") {
            config.max_content_bytes = parse_number("WASTELEDGER_MAX_CONTENT_BYTES", &v)?;
        }
        if let Some(v) = get("WASTELEDGER_PREVIEW_MAX_BYTES") {
            config.preview_max_bytes = parse_number("WASTELEDGER_PREVIEW_MAX_BYTES", &v)?;
        }
        if let Some(v) = get("WASTELEDGER_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_number("WASTELEDGER_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("WASTELEDGER_UPLOAD_TIMEOUT_SECS") {
            config.upload_timeout_secs = parse_number("WASTELEDGER_UPLOAD_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("WASTELEDGER_MIN_PDF_TEXT_CHARS") {
            config.min_pdf_text_chars = parse_number("WASTELEDGER_MIN_PDF_TEXT_CHARS", &v)?;
        }
        if let Some(v) = get("WASTELEDGER_MIN_KEY_DIGITS") {
            config.min_key_digits = parse_number("WASTELEDGER_MIN_KEY_DIGITS", &v)?;
        }
        if let Some(v) = get("WASTELEDGER_LEDGER_SHEET") {
            config.ledger_sheet = v;
        }
        if let Some(v) = get("WASTELEDGER_DROPBOX_API_URL") {
            config.dropbox_api_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("WASTELEDGER_DROPBOX_CONTENT_URL") {
            config.dropbox_content_url = v.trim_end_matches('/').to_string();
        }

        config.notify.webhook_url = get("BITRIX_WEBHOOK_URL");
        config.notify.chat_id = get("BITRIX_NOTIFY_CHAT_ID");
        if let Some(v) = get("BITRIX_NOTIFY_USER_ID") {
            config.notify.user_id = Some(parse_number("BITRIX_NOTIFY_USER_ID", &v)?);
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_name_is_wasteledger() {
        assert_eq!(APP_NAME, "wasteledger");
    }

    #[test]
    fn defaults_match_manifest_thresholds() {
        let config = SyncConfig::default();
        assert_eq!(config.min_pdf_text_chars, 50);
        assert_eq!(config.min_key_digits, 6);
        assert_eq!(config.ledger_sheet, "ManifestDetails (2)");
        assert_eq!(config.preview_max_bytes, 1_048_576);
        assert!(config.notify.webhook_url.is_none());
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = SyncConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn environment_overrides_are_applied() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("WASTELEDGER_MAX_CONTENT_BYTES", "2048"),
            ("WASTELEDGER_LEDGER_SHEET", "Sheet1"),
            ("WASTELEDGER_DROPBOX_API_URL", "http://localhost:9000/2/"),
            ("BITRIX_WEBHOOK_URL", "https://example.bitrix24.com/rest/1/abc"),
            ("BITRIX_NOTIFY_USER_ID", "42"),
        ]))
        .unwrap();

        assert_eq!(config.max_content_bytes, 2048);
        assert_eq!(config.ledger_sheet, "Sheet1");
        assert_eq!(config.dropbox_api_url, "http://localhost:9000/2");
        assert_eq!(config.notify.user_id, Some(42));
        assert!(config.notify.chat_id.is_none());
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = SyncConfig::from_lookup(lookup(&[("WASTELEDGER_LEDGER_SHEET", "  ")])).unwrap();
        assert_eq!(config.ledger_sheet, DEFAULT_LEDGER_SHEET);
    }

    #[test]
    fn malformed_number_is_rejected() {
        let err = SyncConfig::from_lookup(lookup(&[("WASTELEDGER_REQUEST_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "WASTELEDGER_REQUEST_TIMEOUT_SECS"));
    }
}
