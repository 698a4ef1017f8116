/*!
 * Media Host Client
 * Thin client for the external image host. Uploads happen inside create and
 * update requests; deletes are best-effort and never block a document write.
 */
use bytes::Bytes;
use once_cell::sync::Lazy;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::models::ImageAsset;

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media host credentials are not configured")]
    NotConfigured,

    #[error("media host request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("media host returned {status}: {body}")]
    Upstream { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

impl MediaConfig {
    pub fn from_env() -> Result<Self, MediaError> {
        let cloud_name = std::env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default();
        let api_key = std::env::var("CLOUDINARY_API_KEY").unwrap_or_default();
        let api_secret = std::env::var("CLOUDINARY_API_SECRET").unwrap_or_default();

        if cloud_name.is_empty() || api_key.is_empty() || api_secret.is_empty() {
            return Err(MediaError::NotConfigured);
        }

        Ok(Self {
            cloud_name,
            api_key,
            api_secret,
            folder: std::env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "clubhub".to_string()),
        })
    }
}

/// Request signature: alphabetically ordered `key=value` params joined with
/// `&`, with the API secret appended, hashed SHA-256 and hex encoded.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Upload one image and return its `{url, assetId}` reference.
pub async fn upload(bytes: Bytes, filename: &str) -> Result<ImageAsset, MediaError> {
    let config = MediaConfig::from_env()?;

    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign(
        &[("folder", &config.folder), ("timestamp", &timestamp)],
        &config.api_secret,
    );

    let form = reqwest::multipart::Form::new()
        .text("api_key", config.api_key.clone())
        .text("timestamp", timestamp)
        .text("folder", config.folder.clone())
        .text("signature_algorithm", "sha256")
        .text("signature", signature)
        .part(
            "file",
            reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string()),
        );

    let url = format!("{}/{}/image/upload", API_BASE, config.cloud_name);
    let response = HTTP_CLIENT.post(&url).multipart(form).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "image upload rejected by media host");
        return Err(MediaError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let uploaded: UploadResponse = response.json().await?;
    tracing::info!(asset_id = %uploaded.public_id, "image uploaded");

    Ok(ImageAsset {
        url: uploaded.secure_url,
        asset_id: uploaded.public_id,
    })
}

/// Delete one asset from the media host.
pub async fn destroy(asset_id: &str) -> Result<(), MediaError> {
    let config = MediaConfig::from_env()?;

    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign(
        &[("public_id", asset_id), ("timestamp", &timestamp)],
        &config.api_secret,
    );

    let url = format!("{}/{}/image/destroy", API_BASE, config.cloud_name);
    let response = HTTP_CLIENT
        .post(&url)
        .form(&[
            ("public_id", asset_id),
            ("api_key", &config.api_key),
            ("timestamp", &timestamp),
            ("signature_algorithm", "sha256"),
            ("signature", &signature),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MediaError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let destroyed: DestroyResponse = response.json().await?;
    tracing::info!(asset_id = %asset_id, result = %destroyed.result, "image delete requested");

    Ok(())
}

/// Delete an asset without letting a failure reach the caller. The document
/// write this accompanies must succeed regardless of the media host.
pub async fn destroy_best_effort(asset_id: &str) {
    if let Err(e) = destroy(asset_id).await {
        tracing::warn!(asset_id = %asset_id, error = %e, "failed to delete remote asset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_deterministic() {
        let params = [("folder", "clubhub"), ("timestamp", "1700000000")];
        let a = sign(&params, "secret");
        let b = sign(&params, "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sign_orders_params_alphabetically() {
        let forward = sign(&[("folder", "x"), ("timestamp", "1")], "s");
        let reversed = sign(&[("timestamp", "1"), ("folder", "x")], "s");
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_sign_depends_on_secret() {
        let params = [("public_id", "clubhub/a")];
        assert_ne!(sign(&params, "one"), sign(&params, "two"));
    }
}
