//! Recording stand-ins for the external services.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{AssetStore, Mailer, OutgoingEmail};
use crate::error::{AppError, AppResult};
use crate::models::{AssetRef, DecodedImage};

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAssetStore {
    pub stored: Mutex<Vec<(String, AssetRef)>>,
    pub deleted: Mutex<Vec<String>>,
    pub deleted_folders: Mutex<Vec<String>>,
    pub fail_uploads: AtomicBool,
    counter: AtomicUsize,
}

impl RecordingAssetStore {
    pub fn stored(&self) -> Vec<(String, AssetRef)> {
        self.stored.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn deleted_folders(&self) -> Vec<String> {
        self.deleted_folders.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for RecordingAssetStore {
    async fn store(&self, folder: &str, _image: &DecodedImage) -> AppResult<AssetRef> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::ExternalApiError("upload refused".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let asset = AssetRef {
            public_id: format!("{folder}/img{n}"),
            url: format!("https://img.test/{folder}/img{n}"),
        };
        self.stored
            .lock()
            .unwrap()
            .push((folder.to_string(), asset.clone()));
        Ok(asset)
    }

    async fn delete(&self, asset: &AssetRef) -> AppResult<()> {
        self.deleted.lock().unwrap().push(asset.public_id.clone());
        Ok(())
    }

    async fn delete_folder(&self, folder: &str) -> AppResult<()> {
        self.deleted_folders.lock().unwrap().push(folder.to_string());
        Ok(())
    }
}
