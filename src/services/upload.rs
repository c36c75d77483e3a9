use crate::client::ApiClient;
use crate::types::MultipartField;
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    #[serde(default, alias = "filename", alias = "file_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of the "AI analysis" endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content type sent with an uploaded file, picked from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") | Some("md") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

/// File upload and analysis endpoints.
pub struct UploadService {
    client: ApiClient,
}

impl UploadService {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// Multipart `POST /files/upload` with the file under `field`.
    pub async fn upload_file(&self, path: impl AsRef<Path>, field: &str) -> Result<UploadedFile> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::validation_with_context(
                format!("cannot read {}", path.display()),
                ErrorContext::new()
                    .with_field_path(field)
                    .with_details(e.to_string())
                    .with_source("upload_service"),
            )
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let fields = vec![MultipartField::File {
            name: field.to_string(),
            file_name,
            content_type: Some(content_type_for(path).to_string()),
            bytes: Bytes::from(bytes),
        }];
        self.client.upload("/files/upload", fields).await
    }

    /// `POST /analysis/file` for a previously uploaded file.
    pub async fn analyze_file(&self, file_id: &str) -> Result<Analysis> {
        self.client
            .post_json("/analysis/file", &json!({ "file_id": file_id }))
            .await
    }

    /// `POST /analysis/link`. Only http(s) links are accepted.
    pub async fn analyze_link(&self, link: &str) -> Result<Analysis> {
        let parsed = Url::parse(link.trim()).map_err(|e| {
            Error::validation_with_context(
                format!("invalid link: {}", e),
                ErrorContext::new().with_field_path("url"),
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::validation_with_context(
                format!("unsupported link scheme '{}'", parsed.scheme()),
                ErrorContext::new().with_field_path("url"),
            ));
        }
        self.client
            .post_json("/analysis/link", &json!({ "url": parsed.as_str() }))
            .await
    }
}
