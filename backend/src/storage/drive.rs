//! Google Drive client for backup storage.
//!
//! The backup feature only needs a named-object store: locate one file
//! by name, create or overwrite it, and fetch it back. This client
//! speaks the Drive v3 REST surface with a caller-supplied OAuth access
//! token; token acquisition lives with the caller.

use anyhow::{Context, Result};
use log::info;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde_json::Value;

use crate::storage::traits::{RemoteDrive, RemoteFileHandle};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

/// Drive-backed implementation of [`RemoteDrive`].
pub struct GoogleDriveClient {
    http: Client,
    access_token: String,
}

impl GoogleDriveClient {
    /// Create a client around an already-authorized access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            access_token: access_token.into(),
        }
    }
}

impl RemoteDrive for GoogleDriveClient {
    fn find_file(&self, name: &str) -> Result<Option<RemoteFileHandle>> {
        let query = format!(
            "name = '{}' and trashed = false",
            name.replace('\'', "\\'")
        );

        let body: Value = self
            .http
            .get(DRIVE_FILES_URL)
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id, name)"),
                ("spaces", "drive"),
            ])
            .send()
            .context("Drive file search request failed")?
            .error_for_status()
            .context("Drive file search was rejected")?
            .json()
            .context("Drive file search returned invalid JSON")?;

        let handle = body
            .get("files")
            .and_then(|files| files.as_array())
            .and_then(|files| files.first())
            .and_then(|file| {
                let id = file.get("id")?.as_str()?.to_string();
                let name = file.get("name")?.as_str()?.to_string();
                Some(RemoteFileHandle { id, name })
            });

        Ok(handle)
    }

    fn upload_file(
        &self,
        name: &str,
        content: &[u8],
        existing: Option<&RemoteFileHandle>,
    ) -> Result<RemoteFileHandle> {
        let metadata = serde_json::json!({
            "name": name,
            "mimeType": "application/json",
        })
        .to_string();

        let form = Form::new()
            .part("metadata", Part::text(metadata).mime_str("application/json")?)
            .part(
                "file",
                Part::bytes(content.to_vec()).mime_str("application/json")?,
            );

        // Overwrite in place when the file already exists, create otherwise.
        let request = match existing {
            Some(file) => self
                .http
                .patch(format!("{}/{}", DRIVE_UPLOAD_URL, file.id)),
            None => self.http.post(DRIVE_UPLOAD_URL),
        };

        let body: Value = request
            .query(&[("uploadType", "multipart")])
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .context("Drive upload request failed")?
            .error_for_status()
            .context("Drive upload was rejected")?
            .json()
            .context("Drive upload returned invalid JSON")?;

        let id = body
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| existing.map(|file| file.id.clone()))
            .ok_or_else(|| anyhow::anyhow!("Drive upload response missing file id"))?;

        info!("Uploaded {} to Drive ({} bytes)", name, content.len());

        Ok(RemoteFileHandle {
            id,
            name: name.to_string(),
        })
    }

    fn download_file(&self, handle: &RemoteFileHandle) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(format!("{}/{}", DRIVE_FILES_URL, handle.id))
            .bearer_auth(&self.access_token)
            .query(&[("alt", "media")])
            .send()
            .context("Drive download request failed")?
            .error_for_status()
            .context("Drive download was rejected")?
            .bytes()
            .context("Drive download could not be read")?;

        info!(
            "Downloaded {} from Drive ({} bytes)",
            handle.name,
            bytes.len()
        );

        Ok(bytes.to_vec())
    }
}
