//! Client-side core of the virtual fitting room and the background-removal tool.
//!
//! Everything here is independent of a rendering layer: the API client talks
//! to the external services, while the selection store, catalog views, scene
//! composer and upload form are plain state containers driven by the UI.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod scene;
pub mod selection;
pub mod session;
pub mod upload;

pub use api::{ApiClient, CatalogApi, ImageApi};
pub use catalog::{
    AvatarSelector, CancellationToken, CatalogView, CategoryFilter, ClothingCatalog,
    GarmentClick, GarmentFilter, GenderFilter, LoadState, RequestTicket,
};
pub use config::{load_settings, Settings};
pub use error::ClientError;
pub use scene::{compose_scene, BackdropPreset, CameraPreset, SceneDescription, SceneOptions};
pub use selection::{HistoryAction, HistoryEntry, SelectionAction, SelectionStore};
pub use session::FittingRoom;
pub use upload::{
    ImageFile, ProcessImageRequest, ProcessedImage, UploadError, UploadForm, ValidationError,
};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
