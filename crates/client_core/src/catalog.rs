//! Catalog views: fetch state, local filters and late-response handling.

use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use shared::{
    domain::{Avatar, Category, Garment, Gender, UnknownVariant},
    protocol::{AvatarCatalogResponse, ClothingCatalogResponse},
};
use tracing::{debug, error, info};

use crate::{
    api::CatalogApi,
    error::ClientError,
    selection::{Clock, SelectionChange, SelectionStore},
};

pub const AVATARS_LOAD_FAILED: &str = "Failed to load avatars";
pub const CATALOG_LOAD_FAILED: &str = "Failed to load catalog";

/// Shared between the view and whoever runs the request.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RequestTicket {
    id: u64,
    token: CancellationToken,
}

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Error { message: String },
    Ready(T),
}

/// Fetch lifecycle of one catalog list.
///
/// A view starts out loading. Each [`CatalogView::begin_load`] invalidates
/// the previous ticket, so a response that arrives after a retry or after the
/// view was dropped is discarded instead of overwriting newer state.
#[derive(Debug)]
pub struct CatalogView<T> {
    state: LoadState<T>,
    failure_message: &'static str,
    next_request_id: u64,
    in_flight: Option<RequestTicket>,
}

impl<T> CatalogView<T> {
    pub fn new(failure_message: &'static str) -> Self {
        Self {
            state: LoadState::Loading,
            failure_message,
            next_request_id: 0,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Error { message } => Some(message),
            _ => None,
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match &self.state {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn begin_load(&mut self) -> RequestTicket {
        self.cancel();
        self.next_request_id += 1;
        let ticket = RequestTicket {
            id: self.next_request_id,
            token: CancellationToken::new(),
        };
        self.in_flight = Some(ticket.clone());
        self.state = LoadState::Loading;
        ticket
    }

    /// Retry from the error state re-issues the same request.
    pub fn retry(&mut self) -> RequestTicket {
        self.begin_load()
    }

    pub fn cancel(&mut self) {
        if let Some(ticket) = self.in_flight.take() {
            ticket.token.cancel();
        }
    }

    /// Applies a finished request. Returns `false` when the ticket is stale.
    pub fn complete(&mut self, ticket: &RequestTicket, result: Result<T, ClientError>) -> bool {
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.id == ticket.id);
        if !current || ticket.is_cancelled() {
            debug!(request_id = ticket.id, "discarding stale catalog response");
            return false;
        }

        self.in_flight = None;
        self.state = match result {
            Ok(value) => LoadState::Ready(value),
            Err(err) => {
                error!(error = %err, "{}", self.failure_message);
                LoadState::Error {
                    message: self.failure_message.to_string(),
                }
            }
        };
        true
    }
}

impl<T> Drop for CatalogView<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenderFilter {
    #[default]
    All,
    Only(Gender),
}

impl CategoryFilter {
    pub fn options() -> Vec<CategoryFilter> {
        std::iter::once(CategoryFilter::All)
            .chain(Category::ALL.into_iter().map(CategoryFilter::Only))
            .collect()
    }

    pub fn matches(self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }

    pub fn label(self) -> String {
        match self {
            CategoryFilter::All => "All".to_string(),
            CategoryFilter::Only(category) => capitalize(category.as_str()),
        }
    }
}

impl GenderFilter {
    pub fn options() -> Vec<GenderFilter> {
        std::iter::once(GenderFilter::All)
            .chain(Gender::ALL.into_iter().map(GenderFilter::Only))
            .collect()
    }

    /// Unisex garments pass every gender filter.
    pub fn matches(self, gender: Gender) -> bool {
        match self {
            GenderFilter::All => true,
            GenderFilter::Only(wanted) => wanted == gender || gender == Gender::Unisex,
        }
    }

    pub fn label(self) -> String {
        match self {
            GenderFilter::All => "All".to_string(),
            GenderFilter::Only(gender) => capitalize(gender.as_str()),
        }
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

impl FromStr for GenderFilter {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(GenderFilter::All);
        }
        s.parse().map(GenderFilter::Only)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => write!(f, "{category}"),
        }
    }
}

impl fmt::Display for GenderFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenderFilter::All => f.write_str("all"),
            GenderFilter::Only(gender) => write!(f, "{gender}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GarmentFilter {
    pub category: CategoryFilter,
    pub gender: GenderFilter,
}

impl GarmentFilter {
    pub fn new(category: CategoryFilter, gender: GenderFilter) -> Self {
        Self { category, gender }
    }

    pub fn matches(&self, garment: &Garment) -> bool {
        self.category.matches(garment.category) && self.gender.matches(garment.gender)
    }

    pub fn apply<'a, I>(&self, garments: I) -> Vec<&'a Garment>
    where
        I: IntoIterator<Item = &'a Garment>,
    {
        garments
            .into_iter()
            .filter(|garment| self.matches(garment))
            .collect()
    }
}

pub struct AvatarSelector {
    view: CatalogView<AvatarCatalogResponse>,
}

impl Default for AvatarSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl AvatarSelector {
    pub fn new() -> Self {
        Self {
            view: CatalogView::new(AVATARS_LOAD_FAILED),
        }
    }

    pub fn view(&self) -> &CatalogView<AvatarCatalogResponse> {
        &self.view
    }

    pub fn begin_load(&mut self) -> RequestTicket {
        self.view.begin_load()
    }

    pub fn retry(&mut self) -> RequestTicket {
        self.view.retry()
    }

    /// Applies the avatar list. When nothing is selected yet and the catalog
    /// names a default that it actually lists, that avatar becomes active.
    pub fn complete<C: Clock>(
        &mut self,
        ticket: &RequestTicket,
        result: Result<AvatarCatalogResponse, ClientError>,
        store: &mut SelectionStore<C>,
    ) -> bool {
        if !self.view.complete(ticket, result) {
            return false;
        }
        if store.avatar().is_none() {
            if let Some(default_avatar) = self.view.ready().and_then(|c| c.default_avatar()) {
                info!(avatar_id = %default_avatar.id, "selecting default avatar");
                store.set_avatar(Some(default_avatar.clone()));
            }
        }
        true
    }

    pub async fn load<C: Clock>(&mut self, api: &dyn CatalogApi, store: &mut SelectionStore<C>) {
        let ticket = self.begin_load();
        let result = api.list_avatars().await;
        self.complete(&ticket, result, store);
    }

    pub fn avatars(&self) -> &[Avatar] {
        self.view
            .ready()
            .map(|catalog| catalog.avatars.as_slice())
            .unwrap_or_default()
    }

    pub fn select<C: Clock>(&self, store: &mut SelectionStore<C>, avatar: Avatar) {
        info!(avatar_id = %avatar.id, "avatar selected");
        store.set_avatar(Some(avatar));
    }
}

/// Outcome of clicking a garment tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GarmentClick {
    Added,
    Removed,
    /// No avatar is active; nothing changed.
    AvatarRequired,
}

pub struct ClothingCatalog {
    view: CatalogView<ClothingCatalogResponse>,
    filter: GarmentFilter,
}

impl Default for ClothingCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ClothingCatalog {
    pub fn new() -> Self {
        Self {
            view: CatalogView::new(CATALOG_LOAD_FAILED),
            filter: GarmentFilter::default(),
        }
    }

    pub fn view(&self) -> &CatalogView<ClothingCatalogResponse> {
        &self.view
    }

    pub fn begin_load(&mut self) -> RequestTicket {
        self.view.begin_load()
    }

    pub fn retry(&mut self) -> RequestTicket {
        self.view.retry()
    }

    pub fn complete(
        &mut self,
        ticket: &RequestTicket,
        result: Result<ClothingCatalogResponse, ClientError>,
    ) -> bool {
        self.view.complete(ticket, result)
    }

    pub async fn load(&mut self, api: &dyn CatalogApi) {
        let ticket = self.begin_load();
        let result = api.list_clothes().await;
        self.complete(&ticket, result);
    }

    pub fn filter(&self) -> GarmentFilter {
        self.filter
    }

    pub fn set_category_filter(&mut self, category: CategoryFilter) {
        self.filter.category = category;
    }

    pub fn set_gender_filter(&mut self, gender: GenderFilter) {
        self.filter.gender = gender;
    }

    pub fn garments(&self) -> &[Garment] {
        self.view
            .ready()
            .map(|catalog| catalog.clothes.as_slice())
            .unwrap_or_default()
    }

    /// Garments passing the current filter, in catalog order.
    pub fn visible(&self) -> Vec<&Garment> {
        self.filter.apply(self.garments())
    }

    pub fn click<C: Clock>(&self, store: &mut SelectionStore<C>, garment: &Garment) -> GarmentClick {
        if store.avatar().is_none() {
            return GarmentClick::AvatarRequired;
        }
        match store.select_garment(garment.clone()) {
            SelectionChange::Removed => GarmentClick::Removed,
            _ => GarmentClick::Added,
        }
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
