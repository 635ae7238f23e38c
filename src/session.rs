//! Generator session: text, attachments, style and the render adapter wired together

use crate::config::StudioConfig;
use crate::error::{Error, Result};
use crate::media::{
    CloudinaryHost, LocalFile, MediaCategory, MediaReference, MediaResolver, MediaSlot,
    UploadStatus,
};
use crate::payload::{self, TextContent};
use crate::render::{CommandOutcome, Command, RenderAdapter, Surface};
use crate::style::StyleConfig;
use std::sync::Arc;

/// State of one QR generator session
pub struct QrStudio {
    text: TextContent,
    attachment: MediaSlot,
    logo: MediaSlot,
    style: StyleConfig,
    resolver: MediaResolver,
    adapter: RenderAdapter,
}

impl QrStudio {
    /// Session uploading through `resolver` and rendering through `adapter`
    pub fn new(resolver: MediaResolver, adapter: RenderAdapter) -> Self {
        Self {
            text: TextContent::empty(),
            attachment: MediaSlot::new("attachment"),
            logo: MediaSlot::new("logo"),
            style: StyleConfig::default(),
            resolver,
            adapter,
        }
    }

    /// Session using the configured asset host and render settings
    pub fn from_config(config: &StudioConfig, surface: Box<dyn Surface>) -> Self {
        let host = CloudinaryHost::new(config.upload.clone());
        Self::new(
            MediaResolver::new(Arc::new(host)),
            RenderAdapter::new(config.render.clone(), surface),
        )
    }

    /// Current text
    pub fn text(&self) -> &TextContent {
        &self.text
    }

    /// Replace the text input
    pub fn set_text(&mut self, raw: impl AsRef<str>) {
        self.text = TextContent::new(raw);
    }

    /// Current style
    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    /// Replace the whole style
    pub fn set_style(&mut self, style: StyleConfig) {
        self.style = style;
    }

    /// Uploaded attachment, if any
    pub fn attachment(&self) -> Option<MediaReference> {
        self.attachment.current()
    }

    /// Uploaded logo, if any
    pub fn logo(&self) -> Option<MediaReference> {
        self.logo.current()
    }

    /// The uploading flag shared by attachment and logo uploads
    pub fn upload_status(&self) -> &UploadStatus {
        self.resolver.status()
    }

    /// Render adapter
    pub fn adapter(&self) -> &RenderAdapter {
        &self.adapter
    }

    /// Upload `file` as the attachment.
    ///
    /// Choosing a file drops the previous attachment straight away, even if
    /// the new one is then rejected or fails to upload.
    pub async fn attach_file(&self, file: Option<LocalFile>) -> Result<Option<MediaReference>> {
        self.resolver
            .resolve_into(&self.attachment, file, true)
            .await
    }

    /// Remove the attachment
    pub fn remove_attachment(&self) {
        self.attachment.clear();
    }

    /// Upload `file` as the logo. Only images are accepted.
    pub async fn set_logo(&mut self, file: Option<LocalFile>) -> Result<Option<MediaReference>> {
        if let Some(file) = &file {
            if file.category()? != MediaCategory::Image {
                tracing::error!(mime = %file.mime_type, "Logo must be an image");
                return Err(Error::UnsupportedFileType(file.mime_type.clone()));
            }
        }

        let uploaded = self.resolver.resolve_into(&self.logo, file, false).await?;
        if let Some(reference) = &uploaded {
            self.style = self.style.clone().with_logo(Some(reference.url.clone()));
        }
        Ok(uploaded)
    }

    /// Remove the logo from the slot and the style
    pub fn remove_logo(&mut self) {
        self.logo.clear();
        self.style = self.style.clone().with_logo(None);
    }

    /// Payload for the current text and attachment
    pub fn payload(&self) -> String {
        payload::encode(&self.text, self.attachment().as_ref())
    }

    /// Render the current payload and style
    pub fn render(&mut self) -> Result<()> {
        let payload = self.payload();
        tracing::debug!(%payload, "Rendering QR code");
        self.adapter.apply(&payload, &self.style)
    }

    /// Save the rendered code with the configured name and format
    pub async fn download(&self) -> Result<CommandOutcome> {
        self.adapter.execute(self.adapter.download_command()).await
    }

    /// Share the rendered code
    pub async fn share(&self) -> Result<CommandOutcome> {
        self.adapter.execute(Command::Share).await
    }
}
