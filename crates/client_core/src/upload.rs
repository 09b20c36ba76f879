//! Upload form of the background-removal tool.
//!
//! The form validates locally, hands a [`ProcessImageRequest`] to whoever owns
//! the network, and takes the outcome back. Only one request may be in flight.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::{api::ImageApi, error::ClientError};

pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
pub const DOWNLOAD_FILE_NAME: &str = "imagem_processada.png";
pub const PROCESS_FAILURE_FALLBACK: &str = "Failed to process the image";
pub const SUBMIT_LABEL: &str = "Process Image";
pub const SUBMIT_BUSY_LABEL: &str = "Processing...";
const PREVIEW_MAX_DIMENSION: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Names the upload after the last component of `path`.
    pub fn from_path(path: &Path, bytes: Vec<u8>) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self { file_name, bytes }
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_path(path, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessImageRequest {
    pub image: ImageFile,
    pub remove_background: bool,
    pub background: Option<ImageFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select an image.")]
    MissingImage,
    #[error("The image must be at most 10MB.")]
    ImageTooLarge { size: u64 },
    #[error("The background image must be at most 10MB.")]
    BackgroundTooLarge { size: u64 },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a submission is already in progress")]
    Busy,
    #[error(transparent)]
    Request(#[from] ClientError),
    #[error("processed image could not be decoded: {0}")]
    Decode(String),
    #[error("no processed image to download")]
    NothingToDownload,
    #[error("failed to save processed image: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Request(err) => err.user_message_or(PROCESS_FAILURE_FALLBACK),
            Self::Decode(_) => PROCESS_FAILURE_FALLBACK.to_string(),
            other => other.to_string(),
        }
    }
}

/// Decoded result of `POST /process-image`.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Response body as returned by the service.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// RGBA pixels, downscaled to fit a preview.
    pub preview_rgba: Vec<u8>,
    pub preview_width: u32,
    pub preview_height: u32,
}

impl ProcessedImage {
    pub fn decode(bytes: Vec<u8>) -> Result<Self, UploadError> {
        let decoded =
            image::load_from_memory(&bytes).map_err(|err| UploadError::Decode(err.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        let preview = if width > PREVIEW_MAX_DIMENSION || height > PREVIEW_MAX_DIMENSION {
            decoded
                .thumbnail(PREVIEW_MAX_DIMENSION, PREVIEW_MAX_DIMENSION)
                .to_rgba8()
        } else {
            decoded.to_rgba8()
        };
        Ok(Self {
            bytes,
            width,
            height,
            preview_width: preview.width(),
            preview_height: preview.height(),
            preview_rgba: preview.into_raw(),
        })
    }

    /// Writes the response bytes as [`DOWNLOAD_FILE_NAME`] inside `dir`.
    pub async fn save_to_dir(&self, dir: &Path) -> Result<PathBuf, UploadError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(DOWNLOAD_FILE_NAME);
        tokio::fs::write(&path, &self.bytes).await?;
        info!(path = %path.display(), bytes = self.bytes.len(), "saved processed image");
        Ok(path)
    }
}

/// Sends the request and decodes the reply.
pub async fn process(
    api: &dyn ImageApi,
    request: &ProcessImageRequest,
) -> Result<ProcessedImage, UploadError> {
    let bytes = api.process_image(request).await?;
    ProcessedImage::decode(bytes)
}

pub fn validate(
    image: Option<&ImageFile>,
    background: Option<&ImageFile>,
) -> Result<(), ValidationError> {
    let image = image.ok_or(ValidationError::MissingImage)?;
    if image.size() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::ImageTooLarge { size: image.size() });
    }
    if let Some(background) = background {
        if background.size() > MAX_UPLOAD_BYTES {
            return Err(ValidationError::BackgroundTooLarge {
                size: background.size(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct UploadForm {
    image: Option<ImageFile>,
    background: Option<ImageFile>,
    remove_background: bool,
    busy: bool,
    result: Option<ProcessedImage>,
    error: Option<String>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_image(&mut self, image: Option<ImageFile>) {
        self.image = image;
    }

    pub fn image(&self) -> Option<&ImageFile> {
        self.image.as_ref()
    }

    pub fn set_background(&mut self, background: Option<ImageFile>) {
        self.background = background;
    }

    pub fn background(&self) -> Option<&ImageFile> {
        self.background.as_ref()
    }

    pub fn set_remove_background(&mut self, enabled: bool) {
        self.remove_background = enabled;
    }

    pub fn remove_background(&self) -> bool {
        self.remove_background
    }

    /// The background picker is only offered while removal is enabled. A
    /// background chosen earlier is still validated and sent.
    pub fn background_picker_visible(&self) -> bool {
        self.remove_background
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn submit_enabled(&self) -> bool {
        !self.busy
    }

    pub fn submit_label(&self) -> &'static str {
        if self.busy {
            SUBMIT_BUSY_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    pub fn result(&self) -> Option<&ProcessedImage> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn can_download(&self) -> bool {
        self.result.is_some()
    }

    /// Validates the form and marks it busy. No network access happens here;
    /// on a validation failure the error is shown and the form stays idle.
    pub fn begin_submit(&mut self) -> Result<ProcessImageRequest, UploadError> {
        if self.busy {
            return Err(UploadError::Busy);
        }

        let background = self.background.as_ref();
        if let Err(err) = validate(self.image.as_ref(), background) {
            warn!(error = %err, "upload rejected by local validation");
            self.error = Some(err.to_string());
            return Err(err.into());
        }

        let image = self.image.clone().ok_or(ValidationError::MissingImage)?;
        self.error = None;
        self.busy = true;
        Ok(ProcessImageRequest {
            image,
            remove_background: self.remove_background,
            background: background.cloned(),
        })
    }

    pub fn finish_submit(&mut self, outcome: Result<ProcessedImage, UploadError>) {
        self.busy = false;
        match outcome {
            Ok(processed) => {
                info!(
                    width = processed.width,
                    height = processed.height,
                    "image processed"
                );
                self.error = None;
                self.result = Some(processed);
            }
            Err(err) => self.record_failure(&err),
        }
    }

    fn record_failure(&mut self, err: &UploadError) {
        warn!(error = %err, "image processing failed");
        self.error = Some(err.user_message());
    }

    /// Full submit cycle against `api`.
    pub async fn submit(&mut self, api: &dyn ImageApi) -> Result<&ProcessedImage, UploadError> {
        let request = self.begin_submit()?;
        match process(api, &request).await {
            Ok(processed) => {
                self.finish_submit(Ok(processed));
                self.result.as_ref().ok_or(UploadError::NothingToDownload)
            }
            Err(err) => {
                self.busy = false;
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    pub async fn download_to(&self, dir: &Path) -> Result<PathBuf, UploadError> {
        self.result
            .as_ref()
            .ok_or(UploadError::NothingToDownload)?
            .save_to_dir(dir)
            .await
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
