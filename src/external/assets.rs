use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AssetsConfig;
use crate::error::{AppError, AppResult};
use crate::models::{AssetRef, DecodedImage, Event};

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn store(&self, folder: &str, image: &DecodedImage) -> AppResult<AssetRef>;

    async fn delete(&self, asset: &AssetRef) -> AppResult<()>;

    /// Deletes every asset under `folder`, then the folder itself.
    async fn delete_folder(&self, folder: &str) -> AppResult<()>;
}

/// Folder layout of the image host.
#[derive(Debug, Clone)]
pub struct AssetFolders {
    root: String,
}

impl AssetFolders {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.trim_matches('/').to_string(),
        }
    }

    pub fn gift_list(&self, event_id: Uuid) -> String {
        format!("{}/gift-list/{}", self.root, event_id)
    }

    pub fn wish_list(&self, event_id: Uuid, account_id: i64) -> String {
        format!("{}/wish-list/{}/{}", self.root, event_id, account_id)
    }

    /// Every folder an event may own, nested folders first.
    pub fn for_event(&self, event: &Event) -> Vec<String> {
        let mut folders: Vec<String> = event
            .participants
            .iter()
            .filter_map(|p| p.account_id)
            .map(|account_id| self.wish_list(event.id, account_id))
            .collect();
        folders.push(format!("{}/wish-list/{}", self.root, event.id));
        folders.push(self.gift_list(event.id));
        folders
    }
}

/// Signs Cloudinary parameters: sorted `key=value` pairs joined by `&`,
/// followed by the API secret, hashed with SHA-256.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
}

#[derive(Clone)]
pub struct CloudinaryAssetStore {
    http: Client,
    config: AssetsConfig,
}

impl CloudinaryAssetStore {
    pub fn new(config: AssetsConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            path
        )
    }

    fn ensure_configured(&self) -> AppResult<()> {
        if self.config.cloud_name.is_empty() || self.config.api_key.is_empty() {
            return Err(AppError::ConfigError(
                "Image storage is not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn check(response: reqwest::Response, action: &str) -> AppResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AppError::ExternalApiError(format!(
            "Image {action} failed: HTTP {}: {}",
            status.as_u16(),
            error_text
        )))
    }
}

#[async_trait]
impl AssetStore for CloudinaryAssetStore {
    async fn store(&self, folder: &str, image: &DecodedImage) -> AppResult<AssetRef> {
        self.ensure_configured()?;
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", folder), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );
        let file = format!(
            "data:{};base64,{}",
            image.mime_type,
            STANDARD.encode(&image.bytes)
        );

        let params = [
            ("file", file.as_str()),
            ("folder", folder),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let response = self
            .http
            .post(self.endpoint("image/upload"))
            .form(&params)
            .send()
            .await?;
        let uploaded: UploadResponse = Self::check(response, "upload").await?.json().await?;

        log::info!("Image stored: {}", uploaded.public_id);
        Ok(AssetRef {
            public_id: uploaded.public_id,
            url: uploaded.secure_url,
        })
    }

    async fn delete(&self, asset: &AssetRef) -> AppResult<()> {
        self.ensure_configured()?;
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", asset.public_id.as_str()), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );
        let params = [
            ("public_id", asset.public_id.as_str()),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.config.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let response = self
            .http
            .post(self.endpoint("image/destroy"))
            .form(&params)
            .send()
            .await?;
        Self::check(response, "deletion").await?;
        Ok(())
    }

    async fn delete_folder(&self, folder: &str) -> AppResult<()> {
        self.ensure_configured()?;

        // The folder must be empty before it can go
        let response = self
            .http
            .delete(self.endpoint("resources/image/upload"))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .query(&[("prefix", format!("{folder}/"))])
            .send()
            .await?;
        Self::check(response, "folder cleanup").await?;

        let response = self
            .http
            .delete(self.endpoint(&format!("folders/{folder}")))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .send()
            .await?;
        // 404: the folder was never created
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            Self::check(response, "folder deletion").await?;
        }
        Ok(())
    }
}
