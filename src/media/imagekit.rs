use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;

use super::{MediaError, MediaStore, UploadRequest, UploadedMedia};
use crate::config::CdnConfig;

/// ImageKit upload API client.
pub struct ImageKitClient {
    http: reqwest::Client,
    upload_url: String,
    private_key: Option<String>,
    folder: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_id: String,
    name: String,
    url: String,
}

impl ImageKitClient {
    pub fn new(config: &CdnConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            upload_url: config.upload_url.clone(),
            private_key: config.private_key.clone().filter(|k| !k.is_empty()),
            folder: config.folder.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.private_key.is_some()
    }
}

#[async_trait]
impl MediaStore for ImageKitClient {
    async fn upload(&self, request: UploadRequest<'_>) -> Result<UploadedMedia, MediaError> {
        let private_key = self
            .private_key
            .as_deref()
            .ok_or(MediaError::NotConfigured("cdn.private_key"))?;

        let bytes = tokio::fs::read(request.path).await?;
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(request.file_name.to_string())
            .mime_str(request.content_type)?;

        let mut form = Form::new()
            .part("file", part)
            .text("fileName", request.file_name.to_string())
            .text("useUniqueFileName", request.use_unique_file_name.to_string())
            .text("tags", request.tags.join(","));
        if let Some(folder) = &self.folder {
            form = form.text("folder", folder.clone());
        }

        let response = self
            .http
            .post(&self.upload_url)
            .basic_auth(private_key, Some(""))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "CDN rejected upload");
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let uploaded: UploadResponse = response.json().await?;
        tracing::info!(
            file_id = %uploaded.file_id,
            name = %uploaded.name,
            size,
            "Uploaded media to CDN"
        );

        Ok(UploadedMedia {
            file_id: uploaded.file_id,
            name: uploaded.name,
            url: uploaded.url,
        })
    }
}
