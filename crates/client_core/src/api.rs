//! HTTP client for the catalog service and the image service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{AvatarId, GarmentId},
    protocol::{
        ApplyClothesRequest, ApplyClothesResponse, AvatarCatalogResponse,
        ClothingCatalogResponse, HealthResponse,
    },
};
use tracing::{debug, error};
use url::Url;

use crate::{
    error::ClientError,
    upload::{ImageFile, ProcessImageRequest},
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_avatars(&self) -> Result<AvatarCatalogResponse, ClientError>;
    /// Raw model file (GLB/GLTF) of one avatar.
    async fn avatar_model(&self, avatar_id: &AvatarId) -> Result<Vec<u8>, ClientError>;
    async fn list_clothes(&self) -> Result<ClothingCatalogResponse, ClientError>;
    async fn clothing_model(&self, garment_id: &GarmentId) -> Result<Vec<u8>, ClientError>;
    async fn apply_clothes(
        &self,
        request: &ApplyClothesRequest,
    ) -> Result<ApplyClothesResponse, ClientError>;
}

#[async_trait]
pub trait ImageApi: Send + Sync {
    /// Posts the multipart form and returns the processed image bytes.
    async fn process_image(&self, request: &ProcessImageRequest) -> Result<Vec<u8>, ClientError>;
}

/// Validates a service base URL. Only http(s) URLs that can carry a path are
/// accepted.
pub fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| ClientError::Unexpected(format!("invalid base url '{raw}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ClientError::Unexpected(format!(
            "unsupported base url '{raw}': expected http or https"
        )));
    }
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = parse_base_url(base_url)?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::from_reqwest)?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends percent-encoded path segments to the base URL.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::Unexpected(format!("base url {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get_json(&["health"]).await
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response, ClientError> {
        debug!(endpoint, "sending request");
        let response = request.send().await.map_err(|err| {
            let err = ClientError::from_reqwest(err);
            error!(endpoint, error = %err, "request failed before a response arrived");
            err
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let err = ClientError::server(status.as_u16(), &body);
        error!(endpoint, status = status.as_u16(), error = %err, "service returned an error");
        Err(err)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        let endpoint = url.path().to_string();
        let response = self.send(&endpoint, self.http.get(url)).await?;
        decode_json(&endpoint, response).await
    }

    async fn get_bytes(&self, segments: &[&str]) -> Result<Vec<u8>, ClientError> {
        let url = self.endpoint(segments)?;
        let endpoint = url.path().to_string();
        let response = self.send(&endpoint, self.http.get(url)).await?;
        read_bytes(&endpoint, response).await
    }
}

async fn decode_json<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T, ClientError> {
    response.json::<T>().await.map_err(|err| {
        error!(endpoint, error = %err, "failed to decode response body");
        ClientError::Unexpected(err.to_string())
    })
}

async fn read_bytes(endpoint: &str, response: Response) -> Result<Vec<u8>, ClientError> {
    let bytes = response.bytes().await.map_err(|err| {
        error!(endpoint, error = %err, "failed to read response body");
        ClientError::from_reqwest(err)
    })?;
    Ok(bytes.to_vec())
}

fn file_part(file: &ImageFile) -> Result<Part, ClientError> {
    Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.content_type())
        .map_err(ClientError::from_reqwest)
}

#[async_trait]
impl CatalogApi for ApiClient {
    async fn list_avatars(&self) -> Result<AvatarCatalogResponse, ClientError> {
        self.get_json(&["models", "avatar"]).await
    }

    async fn avatar_model(&self, avatar_id: &AvatarId) -> Result<Vec<u8>, ClientError> {
        self.get_bytes(&["models", "avatar", avatar_id.as_str()])
            .await
    }

    async fn list_clothes(&self) -> Result<ClothingCatalogResponse, ClientError> {
        self.get_json(&["models", "clothes"]).await
    }

    async fn clothing_model(&self, garment_id: &GarmentId) -> Result<Vec<u8>, ClientError> {
        self.get_bytes(&["models", "clothes", garment_id.as_str()])
            .await
    }

    async fn apply_clothes(
        &self,
        request: &ApplyClothesRequest,
    ) -> Result<ApplyClothesResponse, ClientError> {
        let url = self.endpoint(&["apply-clothes"])?;
        let endpoint = url.path().to_string();
        let response = self
            .send(&endpoint, self.http.post(url).json(request))
            .await?;
        decode_json(&endpoint, response).await
    }
}

#[async_trait]
impl ImageApi for ApiClient {
    async fn process_image(&self, request: &ProcessImageRequest) -> Result<Vec<u8>, ClientError> {
        let url = self.endpoint(&["process-image"])?;
        let endpoint = url.path().to_string();

        let mut form = Form::new()
            .part("file", file_part(&request.image)?)
            .text("remove_background", request.remove_background.to_string());
        if let Some(background) = &request.background {
            form = form.part("background", file_part(background)?);
        }

        let response = self
            .send(&endpoint, self.http.post(url).multipart(form))
            .await?;
        read_bytes(&endpoint, response).await
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
