use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    api::{ApiClient, CatalogApi},
    catalog::{CategoryFilter, GarmentFilter, GenderFilter},
    config::{load_settings, Settings},
    scene::{compose_scene, BackdropPreset, CameraPreset, SceneOptions},
    selection::SelectionStore,
    upload::{ImageFile, UploadForm},
    ClientError,
};
use shared::{
    domain::{AvatarId, GarmentId},
    protocol::{DEFAULT_BACKGROUND, DEFAULT_POSE},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Command-line client for the fitting-room services")]
struct Cli {
    /// Overrides the catalog service base URL.
    #[arg(long)]
    catalog_url: Option<String>,
    /// Overrides the image service base URL.
    #[arg(long)]
    image_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Checks that the catalog service is up.
    Health {
        #[arg(long)]
        image_service: bool,
    },
    Avatars,
    AvatarModel {
        avatar_id: String,
        #[arg(long)]
        out: PathBuf,
    },
    Clothes {
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
        #[arg(long, default_value = "all")]
        gender: GenderFilter,
    },
    ClothingModel {
        garment_id: String,
        #[arg(long)]
        out: PathBuf,
    },
    Apply {
        #[arg(long)]
        avatar: String,
        #[arg(long = "item")]
        items: Vec<String>,
        #[arg(long, default_value = DEFAULT_POSE)]
        pose: String,
        #[arg(long, default_value = DEFAULT_BACKGROUND)]
        background: String,
    },
    ProcessImage {
        image: PathBuf,
        #[arg(long)]
        remove_background: bool,
        /// Replacement background image.
        #[arg(long)]
        background: Option<PathBuf>,
        /// Defaults to the configured download directory.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Prints the scene composed for an avatar and a garment selection.
    Scene {
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long = "item")]
        items: Vec<String>,
        #[arg(long, default_value = "front")]
        camera: CameraPreset,
        #[arg(long, default_value = "studio")]
        backdrop: BackdropPreset,
    },
}

fn client_for(url: &str, settings: &Settings) -> Result<ApiClient> {
    ApiClient::with_timeout(url, settings.request_timeout())
        .with_context(|| format!("invalid service url {url}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn write_model(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Shows the same text a UI would.
fn user_facing(err: ClientError) -> anyhow::Error {
    anyhow!("{} ({err})", err.user_message())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = &cli.catalog_url {
        settings.set_catalog_service_url(url);
    }
    if let Some(url) = &cli.image_url {
        settings.set_image_service_url(url);
    }
    info!(
        catalog = %settings.catalog_service_url,
        image = %settings.image_service_url,
        "using services"
    );

    let catalog = client_for(&settings.catalog_service_url, &settings)?;

    match cli.command {
        Command::Health { image_service } => {
            let api = if image_service {
                client_for(&settings.image_service_url, &settings)?
            } else {
                catalog
            };
            let health = api.health().await.map_err(user_facing)?;
            print_json(&health)?;
        }
        Command::Avatars => {
            let avatars = catalog.list_avatars().await.map_err(user_facing)?;
            for avatar in &avatars.avatars {
                let marker = if avatars.default.as_ref() == Some(&avatar.id) {
                    " (default)"
                } else {
                    ""
                };
                println!(
                    "{}\t{}\t{}{marker}",
                    avatar.id,
                    avatar.format.as_str(),
                    avatar.display_name()
                );
            }
        }
        Command::AvatarModel { avatar_id, out } => {
            let bytes = catalog
                .avatar_model(&AvatarId::new(avatar_id))
                .await
                .map_err(user_facing)?;
            write_model(&out, &bytes).await?;
        }
        Command::Clothes { category, gender } => {
            let clothes = catalog.list_clothes().await.map_err(user_facing)?;
            let filter = GarmentFilter::new(category, gender);
            for garment in filter.apply(&clothes.clothes) {
                let price = garment
                    .price
                    .map(|p| format!("{p:.2}"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{}\t{}\t{price}",
                    garment.id, garment.category, garment.gender, garment.name
                );
            }
        }
        Command::ClothingModel { garment_id, out } => {
            let bytes = catalog
                .clothing_model(&GarmentId::new(garment_id))
                .await
                .map_err(user_facing)?;
            write_model(&out, &bytes).await?;
        }
        Command::Apply {
            avatar,
            items,
            pose,
            background,
        } => {
            let mut request = shared::protocol::ApplyClothesRequest::new(
                AvatarId::new(avatar),
                items.into_iter().map(GarmentId::new).collect(),
            );
            request.pose = pose;
            request.background = background;
            let response = catalog.apply_clothes(&request).await.map_err(user_facing)?;
            print_json(&response)?;
        }
        Command::ProcessImage {
            image,
            remove_background,
            background,
            out_dir,
        } => {
            let images = client_for(&settings.image_service_url, &settings)?;
            let mut form = UploadForm::new();
            form.set_image(Some(ImageFile::read(&image).await.with_context(|| {
                format!("failed to read {}", image.display())
            })?));
            form.set_remove_background(remove_background);
            if let Some(path) = background {
                let file = ImageFile::read(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                form.set_background(Some(file));
            }

            if let Err(err) = form.submit(&images).await {
                bail!("{} ({err})", err.user_message());
            }
            let dir = out_dir.unwrap_or_else(|| settings.download_dir.clone());
            let path = form
                .download_to(&dir)
                .await
                .map_err(|err| anyhow!("{}", err.user_message()))?;
            println!("saved {}", path.display());
        }
        Command::Scene {
            avatar,
            items,
            camera,
            backdrop,
        } => {
            let (avatars, clothes) = tokio::join!(catalog.list_avatars(), catalog.list_clothes());
            let avatars = avatars.map_err(user_facing)?;
            let clothes = clothes.map_err(user_facing)?;

            let mut store = SelectionStore::new();
            let chosen = match avatar {
                Some(id) => avatars
                    .avatars
                    .iter()
                    .find(|a| a.id.as_str() == id)
                    .ok_or_else(|| anyhow!("avatar {id} is not in the catalog"))?,
                None => avatars
                    .default_avatar()
                    .ok_or_else(|| anyhow!("catalog has no default avatar; pass --avatar"))?,
            };
            store.set_avatar(Some(chosen.clone()));
            for id in &items {
                let garment = clothes
                    .clothes
                    .iter()
                    .find(|g| g.id.as_str() == id)
                    .ok_or_else(|| anyhow!("garment {id} is not in the catalog"))?;
                store.select_garment(garment.clone());
            }

            let scene = compose_scene(chosen, store.selected(), SceneOptions { camera, backdrop });
            print_json(&scene)?;
            println!("total price: {:.2}", store.total_price());
        }
    }

    Ok(())
}
