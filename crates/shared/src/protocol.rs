use serde::{Deserialize, Serialize};

use crate::domain::{Avatar, AvatarId, Category, Garment, GarmentId, Gender};

pub const DEFAULT_POSE: &str = "T-pose";
pub const DEFAULT_BACKGROUND: &str = "studio";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvatarCatalogResponse {
    #[serde(default)]
    pub avatars: Vec<Avatar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<AvatarId>,
}

impl AvatarCatalogResponse {
    /// The avatar named by `default`, if the catalog actually lists it.
    pub fn default_avatar(&self) -> Option<&Avatar> {
        let default_id = self.default.as_ref()?;
        self.avatars.iter().find(|avatar| &avatar.id == default_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClothingCatalogResponse {
    #[serde(default)]
    pub clothes: Vec<Garment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genders: Vec<Gender>,
}

fn default_pose() -> String {
    DEFAULT_POSE.to_string()
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

/// Body of `POST /apply-clothes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyClothesRequest {
    pub avatar_id: AvatarId,
    pub clothing_items: Vec<GarmentId>,
    #[serde(default = "default_pose")]
    pub pose: String,
    #[serde(default = "default_background")]
    pub background: String,
}

impl ApplyClothesRequest {
    pub fn new(avatar_id: AvatarId, clothing_items: Vec<GarmentId>) -> Self {
        Self {
            avatar_id,
            clothing_items,
            pose: default_pose(),
            background: default_background(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedAvatarConfig {
    pub avatar_id: AvatarId,
    pub clothing_items: Vec<GarmentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    pub render_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compatibility {
    pub avatar_ready: bool,
    pub clothing_compatible: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyClothesResponse {
    pub avatar_config: AppliedAvatarConfig,
    pub compatibility: Compatibility,
}
