use std::io::Cursor;

use axum::{
    extract::Multipart,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use client_core::{
    catalog::{GenderFilter, LoadState},
    upload::DOWNLOAD_FILE_NAME,
    ApiClient, CatalogApi, FittingRoom, GarmentClick, ImageFile, SceneOptions, UploadForm,
};
use serde_json::{json, Value};
use shared::domain::Gender;
use tokio::net::TcpListener;

fn png_bytes() -> Vec<u8> {
    let pixels = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(pixels)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

async fn avatars() -> Json<Value> {
    Json(json!({
        "avatars": [
            {"id": "a1", "type": "glb"},
            {"id": "a2", "type": "gltf"}
        ],
        "default": "a1"
    }))
}

async fn clothes() -> Json<Value> {
    Json(json!({
        "clothes": [
            {"id": "u1", "name": "Scarf", "category": "accessories", "gender": "unisex", "price": 20.0},
            {"id": "m1", "name": "Suit", "category": "tops", "gender": "male", "price": 300.0}
        ]
    }))
}

async fn apply(Json(body): Json<Value>) -> impl IntoResponse {
    if body["clothing_items"].as_array().is_some_and(|items| items.is_empty()) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "No clothing items"})),
        )
            .into_response();
    }
    Json(json!({
        "avatar_config": {
            "avatar_id": body["avatar_id"],
            "clothing_items": body["clothing_items"],
            "render_url": "/render/a1"
        },
        "compatibility": {"avatar_ready": true, "clothing_compatible": true, "warnings": []}
    }))
    .into_response()
}

async fn process(mut multipart: Multipart) -> impl IntoResponse {
    while let Ok(Some(_field)) = multipart.next_field().await {}
    png_bytes()
}

async fn spawn_services() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/models/avatar", get(avatars))
        .route("/models/clothes", get(clothes))
        .route("/apply-clothes", post(apply))
        .route("/process-image", post(process));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn browse_select_and_apply_an_outfit() {
    let url = spawn_services().await;
    let api = ApiClient::new(&url).expect("client");
    let mut room = FittingRoom::default();
    room.mount(&api).await;

    assert_eq!(room.store.avatar().map(|a| a.id.as_str()), Some("a1"));
    assert!(matches!(room.clothing.view().state(), LoadState::Ready(_)));

    room.clothing
        .set_gender_filter(GenderFilter::Only(Gender::Female));
    let visible: Vec<_> = room.clothing.visible().into_iter().cloned().collect();
    assert_eq!(visible.len(), 1);
    assert_eq!(room.click_garment(&visible[0]), GarmentClick::Added);
    assert_eq!(room.store.total_price(), 20.0);

    let scene = room.scene().expect("scene");
    assert_eq!(scene.meshes.len(), 2);
    assert_eq!(scene, client_core::compose_scene(
        room.store.avatar().expect("avatar"),
        room.store.selected(),
        SceneOptions::default(),
    ));

    let request = room.store.apply_request(None, None).expect("request");
    let applied = api.apply_clothes(&request).await.expect("applied");
    assert_eq!(applied.avatar_config.render_url, "/render/a1");
    assert_eq!(applied.avatar_config.pose, None);

    room.store.clear();
    let request = room.store.apply_request(None, None).expect("request");
    let err = api.apply_clothes(&request).await.expect_err("rejected");
    assert_eq!(err.user_message(), "No clothing items");
}

#[tokio::test]
async fn upload_and_download_a_processed_image() {
    let url = spawn_services().await;
    let api = ApiClient::new(&url).expect("client");
    let mut form = UploadForm::new();
    form.set_image(Some(ImageFile::new("portrait.jpg", vec![0xff, 0xd8, 0xff])));
    form.set_remove_background(true);

    let processed = form.submit(&api).await.expect("processed");
    assert_eq!((processed.width, processed.height), (2, 2));

    let dir = tempfile::tempdir().expect("tempdir");
    let saved = form.download_to(dir.path()).await.expect("saved");
    assert_eq!(saved.file_name().and_then(|n| n.to_str()), Some(DOWNLOAD_FILE_NAME));
    assert_eq!(std::fs::read(saved).expect("read"), png_bytes());
}
