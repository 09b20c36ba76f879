//! In-process stand-in for the catalog and image services.

use std::{
    io::Cursor,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::Result;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
pub struct UploadPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadPart {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

#[derive(Clone)]
pub struct BackendOptions {
    pub avatars: Value,
    pub clothes: Value,
    pub process_failure: Option<(StatusCode, Value)>,
    pub catalog_failure: Option<(StatusCode, Value)>,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            avatars: json!({
                "avatars": [
                    {"id": "a1", "type": "glb", "filename": "a1.glb",
                     "url": "/static-models/avatars/a1.glb"},
                    {"id": "a2", "type": "gltf", "name": "Male base"}
                ],
                "default": "a1"
            }),
            clothes: json!({
                "clothes": [
                    {"id": "tshirt-001", "name": "Basic T-shirt", "category": "tops",
                     "gender": "unisex", "size": "M", "price": 49.9},
                    {"id": "jeans-001", "name": "Jeans", "category": "bottoms",
                     "gender": "unisex", "size": "M", "price": 89.9},
                    {"id": "dress-001", "name": "Evening dress", "category": "dresses",
                     "gender": "female", "size": "M", "price": 129.9},
                    {"id": "boots-001", "name": "Boots", "category": "shoes",
                     "gender": "male"}
                ],
                "categories": ["tops", "bottoms", "dresses", "shoes", "accessories"],
                "genders": ["male", "female", "unisex"]
            }),
            process_failure: None,
            catalog_failure: None,
        }
    }
}

#[derive(Clone)]
struct BackendState {
    options: BackendOptions,
    requests: Arc<AtomicUsize>,
    uploads: Arc<Mutex<Vec<Vec<UploadPart>>>>,
    applied: Arc<Mutex<Vec<Value>>>,
}

impl BackendState {
    fn hit(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct TestBackend {
    pub url: String,
    state: BackendState,
}

impl TestBackend {
    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub async fn uploads(&self) -> Vec<Vec<UploadPart>> {
        self.state.uploads.lock().await.clone()
    }

    pub async fn applied(&self) -> Vec<Value> {
        self.state.applied.lock().await.clone()
    }
}

pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let pixels = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(pixels)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

async fn health(State(state): State<BackendState>) -> Json<Value> {
    state.hit();
    Json(json!({"status": "ok", "service": "virtual-fitting-room"}))
}

async fn list_avatars(State(state): State<BackendState>) -> Response {
    state.hit();
    if let Some((status, body)) = state.options.catalog_failure.clone() {
        return (status, Json(body)).into_response();
    }
    Json(state.options.avatars.clone()).into_response()
}

async fn avatar_model(State(state): State<BackendState>, Path(id): Path<String>) -> Response {
    state.hit();
    if id == "a1" {
        return b"glTF-a1".to_vec().into_response();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({"detail": "Avatar not found"})),
    )
        .into_response()
}

async fn list_clothes(State(state): State<BackendState>) -> Response {
    state.hit();
    if let Some((status, body)) = state.options.catalog_failure.clone() {
        return (status, Json(body)).into_response();
    }
    Json(state.options.clothes.clone()).into_response()
}

async fn clothing_model(State(state): State<BackendState>, Path(id): Path<String>) -> Response {
    state.hit();
    if id == "tshirt-001" {
        return b"glTF-tshirt".to_vec().into_response();
    }
    (
        StatusCode::NOT_FOUND,
        Json(json!({"detail": "Garment not found"})),
    )
        .into_response()
}

async fn apply_clothes(State(state): State<BackendState>, Json(body): Json<Value>) -> Json<Value> {
    state.hit();
    state.applied.lock().await.push(body.clone());
    let avatar_id = body["avatar_id"].as_str().unwrap_or_default().to_string();
    Json(json!({
        "avatar_config": {
            "avatar_id": avatar_id,
            "clothing_items": body["clothing_items"].clone(),
            "pose": body["pose"].clone(),
            "background": body["background"].clone(),
            "render_url": format!("/static-models/avatars/{avatar_id}.glb")
        },
        "compatibility": {
            "avatar_ready": true,
            "clothing_compatible": true,
            "warnings": []
        }
    }))
}

async fn process_image(State(state): State<BackendState>, mut multipart: Multipart) -> Response {
    state.hit();
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        parts.push(UploadPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
    state.uploads.lock().await.push(parts);

    if let Some((status, body)) = state.options.process_failure.clone() {
        return (status, Json(body)).into_response();
    }
    ([(header::CONTENT_TYPE, "image/png")], sample_png(4, 3)).into_response()
}

pub async fn spawn_backend() -> Result<TestBackend> {
    spawn_backend_with(BackendOptions::default()).await
}

pub async fn spawn_backend_with(options: BackendOptions) -> Result<TestBackend> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = BackendState {
        options,
        requests: Arc::new(AtomicUsize::new(0)),
        uploads: Arc::new(Mutex::new(Vec::new())),
        applied: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/health", get(health))
        .route("/models/avatar", get(list_avatars))
        .route("/models/avatar/:id", get(avatar_model))
        .route("/models/clothes", get(list_clothes))
        .route("/models/clothes/:id", get(clothing_model))
        .route("/apply-clothes", post(apply_clothes))
        .route("/process-image", post(process_image))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(TestBackend {
        url: format!("http://{addr}"),
        state,
    })
}

/// Base URL on which nothing is listening.
pub async fn unreachable_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}
