//! Asset host client

use crate::config::UploadOptions;
use crate::error::{Error, Result};
use crate::media::{LocalFile, MediaCategory};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// One upload to the asset host
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// The file to upload
    pub file: LocalFile,
    /// Category selecting the host's resource type
    pub category: MediaCategory,
}

/// External service that stores uploaded files and returns a hosted URL
#[async_trait]
pub trait AssetHost: Send + Sync {
    /// Upload a file, returning its stable hosted URL
    async fn upload(&self, request: UploadRequest) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Unsigned-preset uploads to a Cloudinary-compatible endpoint
pub struct CloudinaryHost {
    options: UploadOptions,
    agent: ureq::Agent,
}

impl CloudinaryHost {
    /// Create a client for the configured host
    pub fn new(options: UploadOptions) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(options.timeout_secs.max(1)))
            .build();

        Self { options, agent }
    }

    /// Endpoint for a resource type.
    ///
    /// A missing cloud name is not rejected here; the host answers the
    /// malformed request with an error status.
    pub fn endpoint(&self, resource_type: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.options.api_base.trim_end_matches('/'),
            self.options.cloud_name.as_deref().unwrap_or_default(),
            resource_type
        )
    }
}

#[async_trait]
impl AssetHost for CloudinaryHost {
    async fn upload(&self, request: UploadRequest) -> Result<String> {
        let resource_type = request.category.resource_type();
        let url = self.endpoint(resource_type);
        let boundary = format!("qrstudio-{}", uuid::Uuid::new_v4().simple());
        let preset = self.options.upload_preset.clone().unwrap_or_default();
        let body = multipart_body(&boundary, &request.file, &preset, resource_type);
        let agent = self.agent.clone();

        tracing::debug!(
            %url,
            file = %request.file.name,
            bytes = request.file.bytes.len(),
            "Uploading media to asset host"
        );

        let response = tokio::task::spawn_blocking(move || -> Result<UploadResponse> {
            let response = agent
                .post(&url)
                .set(
                    "Content-Type",
                    &format!("multipart/form-data; boundary={boundary}"),
                )
                .send_bytes(&body)?;

            response
                .into_json::<UploadResponse>()
                .map_err(|e| Error::Upload(format!("Unreadable upload response: {e}")))
        })
        .await
        .map_err(|e| Error::Upload(format!("Upload task failed: {e}")))??;

        Ok(response.secure_url)
    }
}

/// Assemble a `multipart/form-data` body with the `file`, `upload_preset`
/// and `resource_type` parts.
pub fn multipart_body(
    boundary: &str,
    file: &LocalFile,
    upload_preset: &str,
    resource_type: &str,
) -> Vec<u8> {
    let mut body = Vec::with_capacity(file.bytes.len() + 512);

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file.name.replace('"', "%22")
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.mime_type).as_bytes());
    body.extend_from_slice(&file.bytes);
    body.extend_from_slice(b"\r\n");

    for (name, value) in [("upload_preset", upload_preset), ("resource_type", resource_type)] {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_layout() {
        let host = CloudinaryHost::new(UploadOptions {
            cloud_name: Some("demo".into()),
            ..UploadOptions::default()
        });
        assert_eq!(
            host.endpoint("raw"),
            "https://api.cloudinary.com/v1_1/demo/raw/upload"
        );
    }

    #[test]
    fn test_missing_cloud_name_yields_malformed_path() {
        let host = CloudinaryHost::new(UploadOptions::default());
        assert_eq!(
            host.endpoint("image"),
            "https://api.cloudinary.com/v1_1//image/upload"
        );
    }

    #[test]
    fn test_multipart_parts() {
        let file = LocalFile::new("x.png", "image/png", &b"PNGDATA"[..]);
        let body = multipart_body("b0undary", &file, "preset-1", "image");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--b0undary\r\n"));
        assert!(text.contains("name=\"file\"; filename=\"x.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n"));
        assert!(text.contains("name=\"upload_preset\"\r\n\r\npreset-1\r\n"));
        assert!(text.contains("name=\"resource_type\"\r\n\r\nimage\r\n"));
        assert!(text.ends_with("--b0undary--\r\n"));
    }
}
