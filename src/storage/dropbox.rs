use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{ContentPath, FolderPage, RemoteStorage};
use super::StorageError;
use crate::config::SyncConfig;
use crate::models::FileDescriptor;

/// Entries requested per listing page (Dropbox maximum).
const LIST_PAGE_LIMIT: u32 = 2000;

/// Dropbox v2 HTTP client bound to one access token and, optionally, one shared link.
pub struct DropboxClient {
    api_url: String,
    content_url: String,
    access_token: String,
    shared_url: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    upload_timeout_secs: u64,
}

impl DropboxClient {
    /// Create a client. The token is opaque and must already be valid.
    pub fn new(
        config: &SyncConfig,
        access_token: impl Into<String>,
        shared_url: Option<String>,
    ) -> Result<Self, StorageError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StorageError::HttpClient(e.to_string()))?;

        Ok(Self {
            api_url: config.dropbox_api_url.trim_end_matches('/').to_string(),
            content_url: config.dropbox_content_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            shared_url: shared_url.filter(|u| !u.trim().is_empty()),
            client,
            timeout_secs: config.request_timeout_secs,
            upload_timeout_secs: config.upload_timeout_secs,
        })
    }

    pub fn shared_url(&self) -> Option<&str> {
        self.shared_url.as_deref()
    }

    fn require_shared_url(&self, operation: &'static str) -> Result<&str, StorageError> {
        self.shared_url
            .as_deref()
            .ok_or(StorageError::MissingSharedLink(operation))
    }

    fn map_send_error(&self, e: reqwest::Error, base: &str) -> StorageError {
        if e.is_connect() {
            StorageError::Connection(base.to_string())
        } else if e.is_timeout() {
            StorageError::Timeout(self.timeout_secs)
        } else {
            StorageError::HttpClient(e.to_string())
        }
    }

    /// POST a JSON RPC call to the API host and decode the JSON reply.
    fn rpc<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, StorageError> {
        let url = format!("{}/{endpoint}", self.api_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .map_err(|e| self.map_send_error(e, &self.api_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| StorageError::ResponseParsing(e.to_string()))
    }

    /// POST a content-host call whose argument travels in the `Dropbox-API-Arg` header.
    fn content_call(
        &self,
        endpoint: &str,
        arg: &serde_json::Value,
        body: Vec<u8>,
        timeout_secs: u64,
    ) -> Result<Vec<u8>, StorageError> {
        let url = format!("{}/{endpoint}", self.content_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", header_safe_json(arg))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .timeout(Duration::from_secs(timeout_secs))
            .body(body)
            .send()
            .map_err(|e| self.map_send_error(e, &self.content_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| StorageError::ResponseParsing(e.to_string()))
    }
}

#[derive(Serialize)]
struct SharedLinkArg<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct ListFolderRequest<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    shared_link: Option<SharedLinkArg<'a>>,
    recursive: bool,
    limit: u32,
}

#[derive(Serialize)]
struct ListFolderContinueRequest<'a> {
    cursor: &'a str,
}

#[derive(Deserialize)]
struct ListFolderResponse {
    #[serde(default)]
    entries: Vec<DropboxEntry>,
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Deserialize)]
struct DropboxEntry {
    #[serde(rename = ".tag")]
    tag: String,
    name: Option<String>,
    path_display: Option<String>,
    path_lower: Option<String>,
    size: Option<u64>,
    server_modified: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct SharedLinkMetadata {
    path_lower: Option<String>,
}

impl DropboxEntry {
    /// Convert a listing entry; deleted entries and entries without any path are dropped.
    fn into_descriptor(self, parent: &str) -> Option<FileDescriptor> {
        let is_folder = match self.tag.as_str() {
            "folder" => true,
            "file" => false,
            _ => return None,
        };

        let path = match (self.path_display, self.path_lower, self.name.as_deref()) {
            (Some(p), _, _) | (None, Some(p), _) => p,
            (None, None, Some(name)) => format!("{}/{name}", parent.trim_end_matches('/')),
            (None, None, None) => return None,
        };

        let name = self
            .name
            .unwrap_or_else(|| path.rsplit('/').next().unwrap_or_default().to_string());

        Some(FileDescriptor {
            name,
            path,
            size: self.size.unwrap_or(0),
            is_folder,
            modified_at: self.server_modified,
        })
    }
}

/// Dropbox addresses the root as "" rather than "/".
fn api_path(path: &str) -> &str {
    if path == "/" {
        ""
    } else {
        path
    }
}

/// Serialize JSON for an HTTP header, escaping every non-ASCII character as `\uXXXX`.
pub(crate) fn header_safe_json(value: &serde_json::Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

impl RemoteStorage for DropboxClient {
    fn list_folder(&self, path: &str, cursor: Option<&str>) -> Result<FolderPage, StorageError> {
        let response: ListFolderResponse = match cursor {
            Some(cursor) => self.rpc("files/list_folder/continue", &ListFolderContinueRequest { cursor })?,
            None => self.rpc(
                "files/list_folder",
                &ListFolderRequest {
                    path: api_path(path),
                    shared_link: self.shared_url.as_deref().map(|url| SharedLinkArg { url }),
                    recursive: false,
                    limit: LIST_PAGE_LIMIT,
                },
            )?,
        };

        let entries = response
            .entries
            .into_iter()
            .filter_map(|e| e.into_descriptor(path))
            .collect();

        Ok(FolderPage {
            entries,
            cursor: if response.has_more { response.cursor } else { None },
        })
    }

    fn shared_root(&self) -> Result<Option<String>, StorageError> {
        let Some(url) = self.shared_url.as_deref() else {
            return Ok(None);
        };
        let metadata: SharedLinkMetadata =
            self.rpc("sharing/get_shared_link_metadata", &SharedLinkArg { url })?;
        Ok(metadata.path_lower.filter(|p| !p.is_empty()))
    }

    fn get_content(&self, path: &ContentPath) -> Result<Vec<u8>, StorageError> {
        match path {
            ContentPath::SharedRelative(p) => {
                let url = self.require_shared_url("shared link download")?;
                self.content_call(
                    "sharing/get_shared_link_file",
                    &serde_json::json!({ "url": url, "path": p }),
                    Vec::new(),
                    self.timeout_secs,
                )
            }
            ContentPath::LinkTarget => {
                let url = self.require_shared_url("shared link download")?;
                self.content_call(
                    "sharing/get_shared_link_file",
                    &serde_json::json!({ "url": url }),
                    Vec::new(),
                    self.timeout_secs,
                )
            }
            ContentPath::Absolute(p) => self.content_call(
                "files/download",
                &serde_json::json!({ "path": p }),
                Vec::new(),
                self.timeout_secs,
            ),
        }
    }

    fn put_content(&self, path: &str, bytes: &[u8], overwrite: bool) -> Result<(), StorageError> {
        let normalized = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        let arg = serde_json::json!({
            "path": normalized,
            "mode": if overwrite { "overwrite" } else { "add" },
            "autorename": !overwrite,
            "mute": false,
        });

        tracing::info!(path = %normalized, bytes = bytes.len(), overwrite, "Uploading file");
        self.content_call("files/upload", &arg, bytes.to_vec(), self.upload_timeout_secs)?;
        Ok(())
    }
}
