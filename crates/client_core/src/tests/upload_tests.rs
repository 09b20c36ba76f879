use super::*;
use crate::{
    api::ApiClient,
    test_support::{sample_png, spawn_backend, spawn_backend_with, BackendOptions},
};
use axum::http::StatusCode;
use serde_json::json;

fn oversized(name: &str) -> ImageFile {
    ImageFile::new(name, vec![0; 11 * 1024 * 1024])
}

#[test]
fn validate_requires_an_image() {
    assert_eq!(validate(None, None), Err(ValidationError::MissingImage));
    assert_eq!(
        ValidationError::MissingImage.to_string(),
        "Please select an image."
    );
}

#[test]
fn validate_accepts_exactly_ten_megabytes() {
    let image = ImageFile::new("photo.png", vec![0; MAX_UPLOAD_BYTES as usize]);
    assert_eq!(validate(Some(&image), None), Ok(()));
}

#[test]
fn content_type_follows_the_file_extension() {
    assert_eq!(ImageFile::new("a.png", vec![]).content_type(), "image/png");
    assert_eq!(ImageFile::new("b.JPG", vec![]).content_type(), "image/jpeg");
    assert_eq!(
        ImageFile::new("noext", vec![]).content_type(),
        "application/octet-stream"
    );
}

#[test]
fn background_picker_tracks_the_toggle() {
    let mut form = UploadForm::new();
    assert!(!form.background_picker_visible());
    form.set_remove_background(true);
    assert!(form.background_picker_visible());
    assert_eq!(form.submit_label(), SUBMIT_LABEL);
}

#[tokio::test]
async fn oversized_image_never_reaches_the_network() {
    let backend = spawn_backend().await.expect("backend");
    let api = ApiClient::new(&backend.url).expect("client");
    let mut form = UploadForm::new();
    form.set_image(Some(oversized("huge.jpg")));

    let err = form.submit(&api).await.expect_err("must be rejected");
    assert!(matches!(
        err,
        UploadError::Validation(ValidationError::ImageTooLarge { .. })
    ));
    assert_eq!(form.error(), Some("The image must be at most 10MB."));
    assert!(!form.is_busy());
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn missing_image_is_rejected_locally() {
    let backend = spawn_backend().await.expect("backend");
    let api = ApiClient::new(&backend.url).expect("client");
    let mut form = UploadForm::new();

    let err = form.submit(&api).await.expect_err("must be rejected");
    assert_eq!(err.user_message(), "Please select an image.");
    assert_eq!(backend.request_count(), 0);
}

#[test]
fn oversized_background_is_rejected_with_or_without_removal() {
    for remove_background in [false, true] {
        let mut form = UploadForm::new();
        form.set_image(Some(ImageFile::new("me.png", vec![1])));
        form.set_background(Some(ImageFile::new(
            "beach.png",
            vec![0; MAX_UPLOAD_BYTES as usize + 1],
        )));
        form.set_remove_background(remove_background);

        let err = form.begin_submit().expect_err("background too large");
        assert!(matches!(
            err,
            UploadError::Validation(ValidationError::BackgroundTooLarge { .. })
        ));
        assert!(!form.is_busy());
        assert_eq!(
            form.error(),
            Some("The background image must be at most 10MB.")
        );
    }
}

#[test]
fn second_submit_while_busy_is_rejected() {
    let mut form = UploadForm::new();
    form.set_image(Some(ImageFile::new("me.png", vec![1])));

    form.begin_submit().expect("first submit");
    assert!(form.is_busy());
    assert!(!form.submit_enabled());
    assert_eq!(form.submit_label(), SUBMIT_BUSY_LABEL);
    assert!(matches!(form.begin_submit(), Err(UploadError::Busy)));

    form.finish_submit(ProcessedImage::decode(sample_png(2, 2)));
    assert!(!form.is_busy());
    assert!(form.can_download());
}

#[tokio::test]
async fn successful_submit_enables_download() {
    let backend = spawn_backend().await.expect("backend");
    let api = ApiClient::new(&backend.url).expect("client");
    let mut form = UploadForm::new();
    form.set_image(Some(ImageFile::new("me.jpg", vec![7; 64])));
    form.set_remove_background(true);
    form.set_background(Some(ImageFile::new("beach.png", vec![8; 16])));

    let processed = form.submit(&api).await.expect("processed");
    assert_eq!((processed.width, processed.height), (4, 3));
    assert_eq!((processed.preview_width, processed.preview_height), (4, 3));
    assert_eq!(processed.preview_rgba.len(), 4 * 3 * 4);
    assert!(form.error().is_none());
    assert!(form.can_download());

    let uploads = backend.uploads().await;
    assert!(uploads[0].iter().any(|part| part.name == "background"));

    let dir = tempfile::tempdir().expect("tempdir");
    let path = form.download_to(dir.path()).await.expect("download");
    assert_eq!(path, dir.path().join(DOWNLOAD_FILE_NAME));
    assert_eq!(std::fs::read(path).expect("saved"), sample_png(4, 3));
}

#[tokio::test]
async fn chosen_background_is_sent_even_when_removal_is_off() {
    let backend = spawn_backend().await.expect("backend");
    let api = ApiClient::new(&backend.url).expect("client");
    let mut form = UploadForm::new();
    form.set_image(Some(ImageFile::new("me.png", vec![1, 2])));
    form.set_background(Some(ImageFile::new("beach.png", vec![3])));

    form.submit(&api).await.expect("processed");

    let uploads = backend.uploads().await;
    let remove = uploads[0]
        .iter()
        .find(|part| part.name == "remove_background")
        .expect("remove_background part");
    assert_eq!(remove.text(), "false");
    assert!(uploads[0].iter().any(|part| part.name == "background"));
}

#[tokio::test]
async fn server_detail_is_shown_on_failure() {
    let backend = spawn_backend_with(BackendOptions {
        process_failure: Some((
            StatusCode::BAD_REQUEST,
            json!({"detail": "Unsupported image format"}),
        )),
        ..BackendOptions::default()
    })
    .await
    .expect("backend");
    let api = ApiClient::new(&backend.url).expect("client");
    let mut form = UploadForm::new();
    form.set_image(Some(ImageFile::new("me.bmp", vec![1])));

    form.submit(&api).await.expect_err("must fail");
    assert_eq!(form.error(), Some("Unsupported image format"));
    assert!(!form.is_busy());
    assert!(!form.can_download());
}

#[tokio::test]
async fn failure_without_detail_uses_the_fallback() {
    let backend = spawn_backend_with(BackendOptions {
        process_failure: Some((StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"}))),
        ..BackendOptions::default()
    })
    .await
    .expect("backend");
    let api = ApiClient::new(&backend.url).expect("client");
    let mut form = UploadForm::new();
    form.set_image(Some(ImageFile::new("me.png", vec![1])));

    form.submit(&api).await.expect_err("must fail");
    assert_eq!(form.error(), Some(PROCESS_FAILURE_FALLBACK));
}

#[tokio::test]
async fn download_without_result_fails() {
    let form = UploadForm::new();
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(matches!(
        form.download_to(dir.path()).await,
        Err(UploadError::NothingToDownload)
    ));
}

#[test]
fn large_results_are_downscaled_for_preview() {
    let processed = ProcessedImage::decode(sample_png(2048, 1024)).expect("decoded");
    assert_eq!((processed.width, processed.height), (2048, 1024));
    assert_eq!((processed.preview_width, processed.preview_height), (1024, 512));
    assert_eq!(processed.preview_rgba.len(), 1024 * 512 * 4);
}

#[test]
fn file_name_comes_from_the_path() {
    let file = ImageFile::from_path(Path::new("/tmp/photos/me.jpeg"), vec![1]);
    assert_eq!(file.file_name, "me.jpeg");
    assert_eq!(file.content_type(), "image/jpeg");
}

#[test]
fn undecodable_reply_reports_the_fallback() {
    let err = ProcessedImage::decode(b"not an image".to_vec()).expect_err("must fail");
    assert_eq!(err.user_message(), PROCESS_FAILURE_FALLBACK);
}
