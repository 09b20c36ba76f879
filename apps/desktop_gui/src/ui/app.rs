use std::{fs, path::PathBuf, time::Instant};

use client_core::{
    catalog::{CategoryFilter, GarmentClick, GenderFilter, LoadState},
    config::Settings,
    scene::{sway_angle, BackdropPreset, CameraPreset, CAMERA_FOV_DEGREES},
    upload::{ImageFile, UploadError, UploadForm, DOWNLOAD_FILE_NAME},
    ClientError, FittingRoom,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::domain::{Avatar, Garment};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{err_label, UiError, UiErrorContext, UiEvent},
    orchestration::dispatch_backend_command,
};
use crate::ui::viewport::{paint_scene, OrbitCamera};

pub const SETTINGS_STORAGE_KEY: &str = "desktop_gui.settings";
const AVATAR_REQUIRED_NOTICE: &str = "Select an avatar first";
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "bmp", "gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppTab {
    FittingRoom,
    BackgroundRemoval,
}

/// View choices remembered between launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedGuiSettings {
    tab: AppTab,
    camera: String,
    backdrop: String,
    category: String,
    gender: String,
}

impl Default for PersistedGuiSettings {
    fn default() -> Self {
        Self {
            tab: AppTab::FittingRoom,
            camera: CameraPreset::default().to_string(),
            backdrop: BackdropPreset::default().to_string(),
            category: CategoryFilter::All.to_string(),
            gender: GenderFilter::All.to_string(),
        }
    }
}

impl PersistedGuiSettings {
    fn from_runtime(app: &FittingRoomApp) -> Self {
        let filter = app.room.clothing.filter();
        Self {
            tab: app.tab,
            camera: app.room.scene_options.camera.to_string(),
            backdrop: app.room.scene_options.backdrop.to_string(),
            category: filter.category.to_string(),
            gender: filter.gender.to_string(),
        }
    }

    /// Unknown stored values fall back to defaults.
    fn apply_to(&self, app: &mut FittingRoomApp) {
        app.tab = self.tab;
        app.room.set_camera(self.camera.parse().unwrap_or_default());
        app.room.set_backdrop(self.backdrop.parse().unwrap_or_default());
        app.room
            .clothing
            .set_category_filter(self.category.parse().unwrap_or_default());
        app.room
            .clothing
            .set_gender_filter(self.gender.parse().unwrap_or_default());
    }
}

#[derive(Debug, Clone)]
struct StatusBanner {
    title: &'static str,
    message: String,
}

pub struct FittingRoomApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    room: FittingRoom,
    upload: UploadForm,
    download_dir: PathBuf,
    tab: AppTab,
    camera: OrbitCamera,
    started_at: Instant,
    status: String,
    status_banner: Option<StatusBanner>,
    notice: Option<String>,
    processed_texture: Option<egui::TextureHandle>,
    applying: bool,
}

impl FittingRoomApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        settings: &Settings,
        persisted: Option<PersistedGuiSettings>,
    ) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            room: FittingRoom::default(),
            upload: UploadForm::new(),
            download_dir: settings.download_dir.clone(),
            tab: AppTab::FittingRoom,
            camera: OrbitCamera::from_preset(CameraPreset::default(), CAMERA_FOV_DEGREES),
            started_at: Instant::now(),
            status: "Loading catalogs".to_string(),
            status_banner: None,
            notice: None,
            processed_texture: None,
            applying: false,
        };
        persisted.unwrap_or_default().apply_to(&mut app);
        app.reset_camera();
        app.load_avatars();
        app.load_clothes();
        app
    }

    fn queue(&mut self, cmd: BackendCommand) -> bool {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status)
    }

    fn load_avatars(&mut self) {
        let ticket = self.room.avatars.begin_load();
        if !self.queue(BackendCommand::LoadAvatars {
            ticket: ticket.clone(),
        }) {
            let failure = Err(ClientError::Transport(self.status.clone()));
            self.room
                .avatars
                .complete(&ticket, failure, &mut self.room.store);
        }
    }

    fn load_clothes(&mut self) {
        let ticket = self.room.clothing.begin_load();
        if !self.queue(BackendCommand::LoadClothes {
            ticket: ticket.clone(),
        }) {
            let failure = Err(ClientError::Transport(self.status.clone()));
            self.room.clothing.complete(&ticket, failure);
        }
    }

    fn reset_camera(&mut self) {
        self.camera = OrbitCamera::from_preset(self.room.scene_options.camera, CAMERA_FOV_DEGREES);
    }

    fn show_error(&mut self, err: UiError) {
        tracing::warn!(context = ?err.context(), "{}", err.message());
        self.status_banner = Some(StatusBanner {
            title: err_label(err.category()),
            message: err.message().to_string(),
        });
    }

    fn process_ui_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::AvatarsLoaded { ticket, result } => {
                    self.room
                        .avatars
                        .complete(&ticket, result, &mut self.room.store);
                }
                UiEvent::ClothesLoaded { ticket, result } => {
                    if self.room.clothing.complete(&ticket, result) {
                        self.status = format!("{} garments", self.room.clothing.garments().len());
                    }
                }
                UiEvent::ClothesApplied(result) => {
                    self.applying = false;
                    match result {
                        Ok(response) => {
                            let warnings = &response.compatibility.warnings;
                            self.status = if warnings.is_empty() {
                                format!("Outfit applied: {}", response.avatar_config.render_url)
                            } else {
                                format!("Outfit applied with warnings: {}", warnings.join("; "))
                            };
                        }
                        Err(err) => self
                            .show_error(UiError::from_client_error(UiErrorContext::ApplyClothes, &err)),
                    }
                }
                UiEvent::ImageProcessed(result) => {
                    if let Err(err) = &result {
                        tracing::warn!("image processing failed: {err}");
                    }
                    self.upload.finish_submit(result);
                    self.processed_texture = self.upload.result().map(|processed| {
                        let image = egui::ColorImage::from_rgba_unmultiplied(
                            [
                                processed.preview_width as usize,
                                processed.preview_height as usize,
                            ],
                            &processed.preview_rgba,
                        );
                        ctx.load_texture("processed-image", image, egui::TextureOptions::LINEAR)
                    });
                }
                UiEvent::Error(err) => self.show_error(err),
            }
        }
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.tab, AppTab::FittingRoom, "Fitting room");
                ui.selectable_value(&mut self.tab, AppTab::BackgroundRemoval, "Background removal");
                ui.separator();
                ui.weak(&self.status);
            });
            if let Some(banner) = self.status_banner.clone() {
                ui.horizontal(|ui| {
                    ui.colored_label(
                        ui.visuals().error_fg_color,
                        format!("{}: {}", banner.title, banner.message),
                    );
                    if ui.small_button("Dismiss").clicked() {
                        self.status_banner = None;
                    }
                });
            }
        });
    }

    fn show_avatar_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Avatar");
        let mut retry = false;
        let mut chosen: Option<Avatar> = None;
        match self.room.avatars.view().state() {
            LoadState::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading avatars...");
                });
            }
            LoadState::Error { message } => {
                ui.colored_label(ui.visuals().error_fg_color, message);
                retry = ui.button("Retry").clicked();
            }
            LoadState::Ready(_) => {
                let active = self.room.store.avatar().map(|avatar| avatar.id.clone());
                for avatar in self.room.avatars.avatars() {
                    let selected = active.as_ref() == Some(&avatar.id);
                    let label = format!("{} ({})", avatar.display_name(), avatar.format.as_str());
                    if ui.selectable_label(selected, label).clicked() && !selected {
                        chosen = Some(avatar.clone());
                    }
                }
            }
        }
        if retry {
            self.load_avatars();
        }
        if let Some(avatar) = chosen {
            self.room.avatars.select(&mut self.room.store, avatar);
        }
    }

    fn show_selection_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Wearing");
        let selected: Vec<Garment> = self.room.store.selected().to_vec();
        if selected.is_empty() {
            ui.weak("Nothing selected");
        }
        let mut removed = None;
        for garment in &selected {
            ui.horizontal(|ui| {
                ui.label(&garment.name);
                ui.weak(garment.category.as_str());
                if ui.small_button("Remove").clicked() {
                    removed = Some(garment.id.clone());
                }
            });
        }
        if let Some(garment_id) = removed {
            self.room.store.remove_garment(&garment_id);
        }

        ui.separator();
        ui.strong(format!("Total: {:.2}", self.room.store.total_price()));
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!selected.is_empty(), egui::Button::new("Clear all"))
                .clicked()
            {
                self.room.store.clear();
            }
            let background = self.room.scene_options.backdrop.as_str();
            let request = self.room.store.apply_request(None, Some(background));
            if ui
                .add_enabled(
                    request.is_some() && !self.applying,
                    egui::Button::new("Apply outfit"),
                )
                .clicked()
            {
                if let Some(request) = request {
                    self.applying = self.queue(BackendCommand::ApplyClothes { request });
                }
            }
        });
        ui.weak(format!("{} changes recorded", self.room.store.history().len()));
    }

    fn show_catalog_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Catalog");
        let mut filter = self.room.clothing.filter();
        ui.horizontal(|ui| {
            egui::ComboBox::from_id_salt("category_filter")
                .selected_text(filter.category.label())
                .show_ui(ui, |ui| {
                    for option in CategoryFilter::options() {
                        ui.selectable_value(&mut filter.category, option, option.label());
                    }
                });
            egui::ComboBox::from_id_salt("gender_filter")
                .selected_text(filter.gender.label())
                .show_ui(ui, |ui| {
                    for option in GenderFilter::options() {
                        ui.selectable_value(&mut filter.gender, option, option.label());
                    }
                });
        });
        self.room.clothing.set_category_filter(filter.category);
        self.room.clothing.set_gender_filter(filter.gender);
        ui.separator();

        let mut retry = false;
        let mut clicked: Option<Garment> = None;
        let mut favorite: Option<Garment> = None;
        match self.room.clothing.view().state() {
            LoadState::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading catalog...");
                });
            }
            LoadState::Error { message } => {
                ui.colored_label(ui.visuals().error_fg_color, message);
                retry = ui.button("Retry").clicked();
            }
            LoadState::Ready(_) => {
                let visible = self.room.clothing.visible();
                if visible.is_empty() {
                    ui.weak("No garments match the filters");
                }
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for garment in visible {
                        let worn = self.room.store.is_selected(&garment.id);
                        let starred = self.room.store.is_favorite(&garment.id);
                        egui::Frame::group(ui.style()).show(ui, |ui| {
                            ui.set_width(ui.available_width());
                            ui.horizontal(|ui| {
                                if ui.selectable_label(worn, &garment.name).clicked() {
                                    clicked = Some(garment.clone());
                                }
                                if ui.small_button(if starred { "★" } else { "☆" }).clicked() {
                                    favorite = Some(garment.clone());
                                }
                            });
                            let price = garment
                                .price
                                .map(|price| format!("{price:.2}"))
                                .unwrap_or_else(|| "-".to_string());
                            ui.small(format!(
                                "{} · {} · {price}",
                                garment.category, garment.gender
                            ));
                        });
                    }
                });
            }
        }

        if retry {
            self.load_clothes();
        }
        if let Some(garment) = clicked {
            if self.room.click_garment(&garment) == GarmentClick::AvatarRequired {
                self.notice = Some(AVATAR_REQUIRED_NOTICE.to_string());
            }
        }
        if let Some(garment) = favorite {
            self.room.store.toggle_favorite(garment);
        }
    }

    fn show_scene(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for preset in CameraPreset::ALL {
                if ui
                    .selectable_label(self.room.scene_options.camera == preset, preset.label())
                    .clicked()
                {
                    self.room.set_camera(preset);
                    self.reset_camera();
                }
            }
            ui.separator();
            for preset in BackdropPreset::ALL {
                if ui
                    .selectable_label(self.room.scene_options.backdrop == preset, preset.label())
                    .clicked()
                {
                    self.room.set_backdrop(preset);
                }
            }
        });

        let Some(scene) = self.room.scene() else {
            ui.centered_and_justified(|ui| {
                ui.label("Select an avatar to start");
            });
            return;
        };

        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::drag());
        let delta = response.drag_delta();
        if response.dragged_by(egui::PointerButton::Secondary) {
            self.camera.pan(delta.x, delta.y, &scene.controls);
        } else if scene.controls.enable_rotate {
            self.camera.rotate(delta.x, delta.y);
        }
        if response.hovered() {
            let scroll = ui.input(|input| input.smooth_scroll_delta.y);
            self.camera.zoom(scroll, &scene.controls);
        }
        let sway = sway_angle(self.started_at.elapsed().as_secs_f32());
        paint_scene(&painter, response.rect, &scene, &self.camera, sway);
    }

    fn show_fitting_room(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("avatar_panel")
            .resizable(true)
            .default_width(240.0)
            .show(ctx, |ui| {
                self.show_avatar_panel(ui);
                ui.separator();
                self.show_selection_panel(ui);
            });
        egui::SidePanel::right("catalog_panel")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.show_catalog_panel(ui));
        egui::CentralPanel::default().show(ctx, |ui| self.show_scene(ui));

        if let Some(notice) = self.notice.clone() {
            egui::Window::new("Notice")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(notice);
                    if ui.button("OK").clicked() {
                        self.notice = None;
                    }
                });
        }
    }

    fn pick_image(title: &str) -> Option<Result<ImageFile, String>> {
        let path = rfd::FileDialog::new()
            .set_title(title)
            .add_filter("Images", &IMAGE_EXTENSIONS)
            .pick_file()?;
        Some(read_image_file(&path))
    }

    fn show_background_removal(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Background removal");
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                if ui.button("Choose image").clicked() {
                    match Self::pick_image("Choose image") {
                        Some(Ok(file)) => self.upload.set_image(Some(file)),
                        Some(Err(err)) => self.status = err,
                        None => {}
                    }
                }
                match self.upload.image() {
                    Some(file) => {
                        ui.label(format!(
                            "{} ({})",
                            file.file_name,
                            human_readable_bytes(file.size())
                        ));
                    }
                    None => {
                        ui.weak("No image selected");
                    }
                }
            });

            let mut remove_background = self.upload.remove_background();
            if ui
                .checkbox(&mut remove_background, "Remove background")
                .changed()
            {
                self.upload.set_remove_background(remove_background);
            }

            if self.upload.background_picker_visible() {
                ui.horizontal(|ui| {
                    if ui.button("Choose new background (optional)").clicked() {
                        match Self::pick_image("Choose background") {
                            Some(Ok(file)) => self.upload.set_background(Some(file)),
                            Some(Err(err)) => self.status = err,
                            None => {}
                        }
                    }
                    if let Some(file) = self.upload.background() {
                        ui.label(&file.file_name);
                        if ui.small_button("Remove").clicked() {
                            self.upload.set_background(None);
                        }
                    }
                });
            }

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(
                        self.upload.submit_enabled(),
                        egui::Button::new(self.upload.submit_label()),
                    )
                    .clicked()
                {
                    self.submit_upload();
                }
                if self.upload.is_busy() {
                    ui.spinner();
                }
            });

            if let Some(error) = self.upload.error() {
                ui.colored_label(ui.visuals().error_fg_color, error);
            }

            if let Some(texture) = &self.processed_texture {
                ui.separator();
                ui.add(egui::Image::new(texture).max_size(egui::vec2(512.0, 512.0)));
            }
            if ui
                .add_enabled(self.upload.can_download(), egui::Button::new("Download"))
                .clicked()
            {
                self.download_processed();
            }
        });
    }

    fn submit_upload(&mut self) {
        let Ok(request) = self.upload.begin_submit() else {
            return;
        };
        if !self.queue(BackendCommand::ProcessImage { request }) {
            self.upload.finish_submit(Err(UploadError::Request(ClientError::Transport(
                self.status.clone(),
            ))));
        }
    }

    fn download_processed(&mut self) {
        let Some(processed) = self.upload.result() else {
            return;
        };
        let start_dir = if self.download_dir.is_dir() {
            self.download_dir.clone()
        } else {
            dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
        };
        let Some(path) = rfd::FileDialog::new()
            .set_directory(start_dir)
            .set_file_name(DOWNLOAD_FILE_NAME)
            .save_file()
        else {
            return;
        };
        match fs::write(&path, &processed.bytes) {
            Ok(()) => self.status = format!("Saved image to {}", path.display()),
            Err(err) => self.status = format!("Failed to save image: {err}"),
        }
    }
}

fn read_image_file(path: &std::path::Path) -> Result<ImageFile, String> {
    let bytes =
        fs::read(path).map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
    Ok(ImageFile::from_path(path, bytes))
}

fn human_readable_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes < KB {
        return format!("{bytes} B");
    }
    if bytes < MB {
        return format_scaled_unit(bytes, KB, "KB");
    }
    format_scaled_unit(bytes, MB, "MB")
}

fn format_scaled_unit(bytes: u64, unit_size: u64, unit_label: &str) -> String {
    let value = bytes as f64 / unit_size as f64;
    let value_text = format!("{value:.1}");
    let compact_value = value_text.strip_suffix(".0").unwrap_or(&value_text);
    format!("{compact_value} {unit_label}")
}

impl eframe::App for FittingRoomApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events(ctx);
        self.show_top_bar(ctx);

        match self.tab {
            AppTab::FittingRoom => self.show_fitting_room(ctx),
            AppTab::BackgroundRemoval => self.show_background_removal(ctx),
        }

        // Sway animation needs a steady frame rate while the scene is visible.
        if self.tab == AppTab::FittingRoom && self.room.store.avatar().is_some() {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedGuiSettings::from_runtime(self);
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}
