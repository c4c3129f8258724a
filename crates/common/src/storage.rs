//! Storage abstraction for uploaded images.
//!
//! Recipe images and user avatars arrive as base64 data URLs, are decoded
//! here and handed to a [`StorageBackend`]. Only the storage key is kept in
//! the database.

use std::path::PathBuf;

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{AppError, AppResult};

/// Storage configuration.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// Local filesystem storage.
    Local {
        /// Base path for stored files.
        base_path: PathBuf,
        /// Base URL for serving files.
        base_url: String,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            base_path: PathBuf::from("./media"),
            base_url: "/media".to_string(),
        }
    }
}

impl StorageConfig {
    /// Build the backend described by this configuration.
    #[must_use]
    pub fn build(&self) -> LocalStorage {
        match self {
            Self::Local {
                base_path,
                base_url,
            } => LocalStorage::new(base_path.clone(), base_url.clone()),
        }
    }
}

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path relative to the storage root).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile>;

    /// Delete a file.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self {
            base_path,
            base_url,
        }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        tracing::debug!(key = %key, size = data.len(), "Stored uploaded file");

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

/// Image decoded from a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// MIME content type, e.g. `image/png`.
    pub content_type: String,
    /// File extension derived from the content type.
    pub extension: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

/// Decode a `data:image/<kind>;base64,<payload>` URL.
///
/// # Errors
///
/// Returns [`AppError::Validation`] when the value is empty, is not a base64
/// image data URL, or decodes to zero bytes.
pub fn decode_data_url(value: &str) -> AppResult<DecodedImage> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation("Image must not be empty.".to_string()));
    }

    let (header, payload) = value
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .ok_or_else(|| {
            AppError::Validation("Image must be a base64 encoded data URL.".to_string())
        })?;

    let subtype = header
        .strip_prefix("image/")
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+'))
        .ok_or_else(|| AppError::Validation(format!("Unsupported image type: {header}")))?;

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("Invalid base64 image: {e}")))?;
    if data.is_empty() {
        return Err(AppError::Validation("Image must not be empty.".to_string()));
    }

    let extension = match subtype {
        "jpeg" => "jpg",
        "svg+xml" => "svg",
        other => other,
    };

    Ok(DecodedImage {
        content_type: header.to_string(),
        extension: extension.to_string(),
        data,
    })
}

/// Generate a unique storage key under `prefix` with the given extension.
#[must_use]
pub fn generate_storage_key(prefix: &str, extension: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let id = ulid::Ulid::new().to_string().to_lowercase();
    format!("{prefix}/{id}.{extension}")
}
