//! Worker thread owning the tokio runtime and both service clients.

use std::thread;

use client_core::{
    api::{ApiClient, CatalogApi},
    config::Settings,
    upload,
};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, settings: Settings) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let timeout = settings.request_timeout();
            let clients = ApiClient::with_timeout(&settings.catalog_service_url, timeout).and_then(
                |catalog| {
                    ApiClient::with_timeout(&settings.image_service_url, timeout)
                        .map(|images| (catalog, images))
                },
            );
            let (catalog, images) = match clients {
                Ok(clients) => clients,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("backend worker startup failure: {err}"),
                    )));
                    tracing::error!("invalid service configuration: {err}");
                    return;
                }
            };
            tracing::info!(
                catalog = %catalog.base_url(),
                images = %images.base_url(),
                "backend worker ready"
            );

            // Each command runs on its own task so both catalogs load concurrently.
            while let Ok(cmd) = cmd_rx.recv() {
                let ui_tx = ui_tx.clone();
                let catalog = catalog.clone();
                let images = images.clone();
                tokio::spawn(async move {
                    let event = match cmd {
                        BackendCommand::LoadAvatars { ticket } => {
                            if ticket.is_cancelled() {
                                return;
                            }
                            let result = catalog.list_avatars().await;
                            UiEvent::AvatarsLoaded { ticket, result }
                        }
                        BackendCommand::LoadClothes { ticket } => {
                            if ticket.is_cancelled() {
                                return;
                            }
                            let result = catalog.list_clothes().await;
                            UiEvent::ClothesLoaded { ticket, result }
                        }
                        BackendCommand::ApplyClothes { request } => {
                            UiEvent::ClothesApplied(catalog.apply_clothes(&request).await)
                        }
                        BackendCommand::ProcessImage { request } => {
                            UiEvent::ImageProcessed(upload::process(&images, &request).await)
                        }
                    };
                    let _ = ui_tx.try_send(event);
                });
            }
        });
    });
}
