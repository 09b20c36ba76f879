//! Selection store: active avatar, worn garments, favorites and history.
//!
//! Every transition goes through [`SelectionStore::dispatch`]; the named
//! methods are shorthands for the matching [`SelectionAction`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{Avatar, Category, Garment, GarmentId},
    protocol::ApplyClothesRequest,
};
use tracing::debug;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Add,
    Remove,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub garment: Option<Garment>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionAction {
    ToggleGarment(Garment),
    RemoveGarment(GarmentId),
    Clear,
    SetAvatar(Option<Avatar>),
    ToggleFavorite(Garment),
}

/// What a dispatched action actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added,
    Removed,
    Cleared,
    AvatarChanged,
    FavoriteAdded,
    FavoriteRemoved,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct SelectionStore<C: Clock = SystemClock> {
    avatar: Option<Avatar>,
    selected: Vec<Garment>,
    favorites: BTreeSet<GarmentId>,
    history: Vec<HistoryEntry>,
    clock: C,
}

impl Default for SelectionStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> SelectionStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            avatar: None,
            selected: Vec::new(),
            favorites: BTreeSet::new(),
            history: Vec::new(),
            clock,
        }
    }

    pub fn dispatch(&mut self, action: SelectionAction) -> SelectionChange {
        let change = match action {
            SelectionAction::ToggleGarment(garment) => {
                if self.is_selected(&garment.id) {
                    self.remove_by_id(&garment.id)
                } else {
                    self.selected.push(garment.clone());
                    self.record(HistoryAction::Add, Some(garment));
                    SelectionChange::Added
                }
            }
            SelectionAction::RemoveGarment(garment_id) => self.remove_by_id(&garment_id),
            SelectionAction::Clear => {
                self.selected.clear();
                self.record(HistoryAction::Clear, None);
                SelectionChange::Cleared
            }
            SelectionAction::SetAvatar(avatar) => {
                // Garments are scoped to the avatar they were tried on.
                self.selected.clear();
                self.avatar = avatar;
                SelectionChange::AvatarChanged
            }
            SelectionAction::ToggleFavorite(garment) => {
                if self.favorites.remove(&garment.id) {
                    SelectionChange::FavoriteRemoved
                } else {
                    self.favorites.insert(garment.id);
                    SelectionChange::FavoriteAdded
                }
            }
        };
        debug!(?change, selected = self.selected.len(), "selection updated");
        change
    }

    pub fn select_garment(&mut self, garment: Garment) -> SelectionChange {
        self.dispatch(SelectionAction::ToggleGarment(garment))
    }

    pub fn remove_garment(&mut self, garment_id: &GarmentId) -> SelectionChange {
        self.dispatch(SelectionAction::RemoveGarment(garment_id.clone()))
    }

    pub fn clear(&mut self) -> SelectionChange {
        self.dispatch(SelectionAction::Clear)
    }

    pub fn set_avatar(&mut self, avatar: Option<Avatar>) -> SelectionChange {
        self.dispatch(SelectionAction::SetAvatar(avatar))
    }

    pub fn toggle_favorite(&mut self, garment: Garment) -> SelectionChange {
        self.dispatch(SelectionAction::ToggleFavorite(garment))
    }

    fn remove_by_id(&mut self, garment_id: &GarmentId) -> SelectionChange {
        let Some(index) = self
            .selected
            .iter()
            .position(|item| &item.id == garment_id)
        else {
            return SelectionChange::Unchanged;
        };
        let removed = self.selected.remove(index);
        self.record(HistoryAction::Remove, Some(removed));
        SelectionChange::Removed
    }

    fn record(&mut self, action: HistoryAction, garment: Option<Garment>) {
        self.history.push(HistoryEntry {
            action,
            garment,
            timestamp: self.clock.now(),
        });
    }

    pub fn avatar(&self) -> Option<&Avatar> {
        self.avatar.as_ref()
    }

    /// Worn garments in the order they were put on.
    pub fn selected(&self) -> &[Garment] {
        &self.selected
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn favorites(&self) -> &BTreeSet<GarmentId> {
        &self.favorites
    }

    pub fn is_favorite(&self, garment_id: &GarmentId) -> bool {
        self.favorites.contains(garment_id)
    }

    pub fn is_selected(&self, garment_id: &GarmentId) -> bool {
        self.selected.iter().any(|item| &item.id == garment_id)
    }

    pub fn garment_by_id(&self, garment_id: &GarmentId) -> Option<&Garment> {
        self.selected.iter().find(|item| &item.id == garment_id)
    }

    pub fn garments_by_category(&self, category: Category) -> Vec<&Garment> {
        self.selected
            .iter()
            .filter(|item| item.category == category)
            .collect()
    }

    /// Missing prices count as zero.
    pub fn total_price(&self) -> f64 {
        self.selected
            .iter()
            .map(|item| item.price.unwrap_or(0.0))
            .sum()
    }

    /// Body for `POST /apply-clothes`, or `None` while no avatar is active.
    pub fn apply_request(
        &self,
        pose: Option<&str>,
        background: Option<&str>,
    ) -> Option<ApplyClothesRequest> {
        let avatar = self.avatar.as_ref()?;
        let mut request = ApplyClothesRequest::new(
            avatar.id.clone(),
            self.selected.iter().map(|item| item.id.clone()).collect(),
        );
        if let Some(pose) = pose {
            request.pose = pose.to_string();
        }
        if let Some(background) = background {
            request.background = background.to_string();
        }
        Some(request)
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
