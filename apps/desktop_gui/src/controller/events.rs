//! UI/backend events and error modeling for desktop GUI controller.

use client_core::{
    catalog::RequestTicket,
    upload::{ProcessedImage, UploadError},
    ClientError,
};
use shared::protocol::{ApplyClothesResponse, AvatarCatalogResponse, ClothingCatalogResponse};

pub enum UiEvent {
    AvatarsLoaded {
        ticket: RequestTicket,
        result: Result<AvatarCatalogResponse, ClientError>,
    },
    ClothesLoaded {
        ticket: RequestTicket,
        result: Result<ClothingCatalogResponse, ClientError>,
    },
    ClothesApplied(Result<ApplyClothesResponse, ClientError>),
    ImageProcessed(Result<ProcessedImage, UploadError>),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Server,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    ApplyClothes,
    ProcessImage,
    General,
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Server => "Server",
        UiErrorCategory::Transport => "Connection",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    /// Classifies free-form worker messages such as startup failures.
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("malformed")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("connect")
            || message_lower.contains("network")
            || message_lower.contains("transport")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn from_client_error(context: UiErrorContext, err: &ClientError) -> Self {
        let category = match err {
            ClientError::Server { .. } => UiErrorCategory::Server,
            ClientError::Transport(_) => UiErrorCategory::Transport,
            ClientError::Unexpected(_) => UiErrorCategory::Unknown,
        };
        Self {
            category,
            context,
            message: err.user_message(),
        }
    }

    pub fn from_upload_error(err: &UploadError) -> Self {
        match err {
            UploadError::Request(inner) => {
                let mut ui_error = Self::from_client_error(UiErrorContext::ProcessImage, inner);
                ui_error.message = err.user_message();
                ui_error
            }
            UploadError::Validation(_) | UploadError::Busy => Self {
                category: UiErrorCategory::Validation,
                context: UiErrorContext::ProcessImage,
                message: err.user_message(),
            },
            _ => Self {
                category: UiErrorCategory::Unknown,
                context: UiErrorContext::ProcessImage,
                message: err.user_message(),
            },
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
