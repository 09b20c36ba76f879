//! Backend commands queued from UI to backend worker.

use client_core::{catalog::RequestTicket, upload::ProcessImageRequest};
use shared::protocol::ApplyClothesRequest;

pub enum BackendCommand {
    LoadAvatars { ticket: RequestTicket },
    LoadClothes { ticket: RequestTicket },
    ApplyClothes { request: ApplyClothesRequest },
    ProcessImage { request: ProcessImageRequest },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::LoadAvatars { .. } => "load_avatars",
            BackendCommand::LoadClothes { .. } => "load_clothes",
            BackendCommand::ApplyClothes { .. } => "apply_clothes",
            BackendCommand::ProcessImage { .. } => "process_image",
        }
    }
}
