//! Top-level fitting-room state: one store plus the two catalog views.

use futures::join;
use shared::domain::Garment;
use tracing::info;

use crate::{
    api::CatalogApi,
    catalog::{AvatarSelector, ClothingCatalog, GarmentClick},
    scene::{compose_from_store, BackdropPreset, CameraPreset, SceneDescription, SceneOptions},
    selection::{Clock, SelectionStore, SystemClock},
};

pub struct FittingRoom<C: Clock = SystemClock> {
    pub store: SelectionStore<C>,
    pub avatars: AvatarSelector,
    pub clothing: ClothingCatalog,
    pub scene_options: SceneOptions,
}

impl Default for FittingRoom<SystemClock> {
    fn default() -> Self {
        Self::new(SelectionStore::new())
    }
}

impl<C: Clock> FittingRoom<C> {
    pub fn new(store: SelectionStore<C>) -> Self {
        Self {
            store,
            avatars: AvatarSelector::new(),
            clothing: ClothingCatalog::new(),
            scene_options: SceneOptions::default(),
        }
    }

    /// First mount: both catalogs are requested together.
    pub async fn mount(&mut self, api: &dyn CatalogApi) {
        let avatar_ticket = self.avatars.begin_load();
        let clothing_ticket = self.clothing.begin_load();

        let (avatars, clothes) = join!(api.list_avatars(), api.list_clothes());

        self.avatars
            .complete(&avatar_ticket, avatars, &mut self.store);
        self.clothing.complete(&clothing_ticket, clothes);
        info!(
            avatars = self.avatars.avatars().len(),
            garments = self.clothing.garments().len(),
            "catalogs mounted"
        );
    }

    pub fn click_garment(&mut self, garment: &Garment) -> GarmentClick {
        self.clothing.click(&mut self.store, garment)
    }

    pub fn set_camera(&mut self, camera: CameraPreset) {
        self.scene_options.camera = camera;
    }

    pub fn set_backdrop(&mut self, backdrop: BackdropPreset) {
        self.scene_options.backdrop = backdrop;
    }

    pub fn scene(&self) -> Option<SceneDescription> {
        compose_from_store(&self.store, self.scene_options)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
