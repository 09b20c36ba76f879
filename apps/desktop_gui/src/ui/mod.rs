//! UI layer for desktop GUI: app shell and the scene viewport.

pub mod app;
pub mod viewport;

pub use app::{FittingRoomApp, PersistedGuiSettings, SETTINGS_STORAGE_KEY};
