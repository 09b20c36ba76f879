use super::*;
use crate::test_support::{
    sample_png, spawn_backend, spawn_backend_with, unreachable_url, BackendOptions,
};
use axum::http::StatusCode;
use serde_json::json;
use shared::domain::{Category, Gender, ModelFormat};

fn client(url: &str) -> ApiClient {
    ApiClient::new(url).expect("client")
}

#[test]
fn endpoint_appends_segments_to_base_path() {
    let api = client("http://localhost:8001/api/");
    assert_eq!(
        api.endpoint(&["models", "avatar", "female avatar"])
            .expect("url")
            .as_str(),
        "http://localhost:8001/api/models/avatar/female%20avatar"
    );

    let api = client("http://localhost:8001");
    assert_eq!(
        api.endpoint(&["health"]).expect("url").as_str(),
        "http://localhost:8001/health"
    );
}

#[test]
fn rejects_non_http_base_urls() {
    assert!(ApiClient::new("ftp://catalog.local").is_err());
    assert!(ApiClient::new("not a url").is_err());
    assert!(ApiClient::new("mailto:someone@example.com").is_err());
}

#[tokio::test]
async fn health_reports_service_status() {
    let backend = spawn_backend().await.expect("backend");
    let health = client(&backend.url).health().await.expect("health");
    assert_eq!(health.status, "ok");
    assert_eq!(health.service.as_deref(), Some("virtual-fitting-room"));
}

#[tokio::test]
async fn lists_avatars_with_default() {
    let backend = spawn_backend().await.expect("backend");
    let catalog = client(&backend.url).list_avatars().await.expect("avatars");
    assert_eq!(catalog.avatars.len(), 2);
    assert_eq!(catalog.avatars[0].format, ModelFormat::Glb);
    assert_eq!(catalog.avatars[1].display_name(), "Male base");
    assert_eq!(catalog.default.as_ref().map(|id| id.as_str()), Some("a1"));
}

#[tokio::test]
async fn lists_clothes_with_typed_fields() {
    let backend = spawn_backend().await.expect("backend");
    let catalog = client(&backend.url).list_clothes().await.expect("clothes");
    assert_eq!(catalog.clothes.len(), 4);
    let dress = &catalog.clothes[2];
    assert_eq!(dress.category, Category::Dresses);
    assert_eq!(dress.gender, Gender::Female);
    assert_eq!(catalog.clothes[3].price, None);
}

#[tokio::test]
async fn downloads_model_bytes() {
    let backend = spawn_backend().await.expect("backend");
    let api = client(&backend.url);
    assert_eq!(
        api.avatar_model(&AvatarId::from("a1")).await.expect("avatar"),
        b"glTF-a1".to_vec()
    );
    assert_eq!(
        api.clothing_model(&GarmentId::from("tshirt-001"))
            .await
            .expect("garment"),
        b"glTF-tshirt".to_vec()
    );
}

#[tokio::test]
async fn missing_model_surfaces_server_detail() {
    let backend = spawn_backend().await.expect("backend");
    let err = client(&backend.url)
        .avatar_model(&AvatarId::from("nobody"))
        .await
        .expect_err("must fail");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.user_message(), "Avatar not found");
}

#[tokio::test]
async fn server_error_without_detail_uses_generic_message() {
    let backend = spawn_backend_with(BackendOptions {
        catalog_failure: Some((StatusCode::INTERNAL_SERVER_ERROR, json!({}))),
        ..BackendOptions::default()
    })
    .await
    .expect("backend");
    let err = client(&backend.url)
        .list_clothes()
        .await
        .expect_err("must fail");
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.user_message(), "Server error");
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let url = unreachable_url().await.expect("url");
    let err = client(&url).list_avatars().await.expect_err("must fail");
    assert!(err.is_transport(), "unexpected error: {err:?}");
    assert_eq!(err.user_message(), "Could not connect to the server");
}

#[tokio::test]
async fn malformed_catalog_is_an_unexpected_error() {
    let backend = spawn_backend_with(BackendOptions {
        avatars: json!({"avatars": [{"id": "a1", "type": "fbx"}]}),
        ..BackendOptions::default()
    })
    .await
    .expect("backend");
    let err = client(&backend.url)
        .list_avatars()
        .await
        .expect_err("must fail");
    assert!(matches!(err, ClientError::Unexpected(_)), "got {err:?}");
    assert_eq!(err.user_message(), "Unexpected error");
}

#[tokio::test]
async fn apply_clothes_posts_configuration() {
    let backend = spawn_backend().await.expect("backend");
    let request = ApplyClothesRequest::new(
        AvatarId::from("a1"),
        vec![GarmentId::from("tshirt-001"), GarmentId::from("jeans-001")],
    );
    let response = client(&backend.url)
        .apply_clothes(&request)
        .await
        .expect("apply");

    assert_eq!(response.avatar_config.render_url, "/static-models/avatars/a1.glb");
    assert_eq!(response.avatar_config.clothing_items.len(), 2);
    assert!(response.compatibility.avatar_ready);

    let applied = backend.applied().await;
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0]["pose"], "T-pose");
    assert_eq!(applied[0]["background"], "studio");
}

#[tokio::test]
async fn process_image_sends_multipart_fields() {
    let backend = spawn_backend().await.expect("backend");
    let request = ProcessImageRequest {
        image: ImageFile::new("portrait.jpg", vec![1, 2, 3]),
        remove_background: true,
        background: Some(ImageFile::new("beach.png", vec![4, 5])),
    };
    let bytes = client(&backend.url)
        .process_image(&request)
        .await
        .expect("process");
    assert_eq!(bytes, sample_png(4, 3));

    let uploads = backend.uploads().await;
    assert_eq!(uploads.len(), 1);
    let parts = &uploads[0];
    let file = parts.iter().find(|p| p.name == "file").expect("file part");
    assert_eq!(file.file_name.as_deref(), Some("portrait.jpg"));
    assert_eq!(file.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(file.bytes, vec![1, 2, 3]);
    let flag = parts
        .iter()
        .find(|p| p.name == "remove_background")
        .expect("flag part");
    assert_eq!(flag.text(), "true");
    let background = parts
        .iter()
        .find(|p| p.name == "background")
        .expect("background part");
    assert_eq!(background.content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn process_image_without_background_omits_the_part() {
    let backend = spawn_backend().await.expect("backend");
    let request = ProcessImageRequest {
        image: ImageFile::new("portrait.png", vec![9]),
        remove_background: false,
        background: None,
    };
    client(&backend.url)
        .process_image(&request)
        .await
        .expect("process");

    let uploads = backend.uploads().await;
    assert!(uploads[0].iter().all(|p| p.name != "background"));
    let flag = uploads[0]
        .iter()
        .find(|p| p.name == "remove_background")
        .expect("flag");
    assert_eq!(flag.text(), "false");
}
