use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::auth::Resource;
use crate::errors::ServiceError;

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Entities that can carry an image, named as they appear in the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Substances,
    Customers,
    Dealers,
    Providers,
}

impl ImageKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            ImageKind::Substances => "substances",
            ImageKind::Customers => "customers",
            ImageKind::Dealers => "dealers",
            ImageKind::Providers => "providers",
        }
    }

    pub fn resource(self) -> Resource {
        match self {
            ImageKind::Substances => Resource::Substance,
            ImageKind::Customers => Resource::Customer,
            ImageKind::Dealers => Resource::Dealer,
            ImageKind::Providers => Resource::Provider,
        }
    }
}

/// Lowercased extension of an uploaded file name, if it is an accepted image type.
pub fn accepted_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Images on local disk at `{root}/{kind}/{id}.{ext}`, one per entity.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    fn path_for(&self, kind: ImageKind, id: i32, ext: &str) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(format!("{}.{}", id, ext))
    }

    /// Stores `bytes` as the entity's image, removing any earlier image with
    /// a different extension.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(
        &self,
        kind: ImageKind,
        id: i32,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, ServiceError> {
        let ext = accepted_extension(file_name).ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "unsupported image type; expected one of {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;
        if bytes.is_empty() {
            return Err(ServiceError::InvalidInput("uploaded file is empty".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(ServiceError::InvalidInput(format!(
                "image exceeds {} bytes",
                self.max_bytes
            )));
        }

        let dir = self.root.join(kind.dir_name());
        fs::create_dir_all(&dir).await.map_err(storage_error)?;

        for other in ALLOWED_EXTENSIONS.iter().filter(|e| **e != ext) {
            match fs::remove_file(self.path_for(kind, id, other)).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(storage_error(e)),
            }
        }

        let path = self.path_for(kind, id, &ext);
        fs::write(&path, bytes).await.map_err(storage_error)?;
        info!(path = %path.display(), "Image stored");
        Ok(path)
    }

    /// Path of the entity's image, if it has one.
    pub async fn find(&self, kind: ImageKind, id: i32) -> Result<Option<PathBuf>, ServiceError> {
        for ext in ALLOWED_EXTENSIONS {
            let path = self.path_for(kind, id, ext);
            if fs::try_exists(&path).await.map_err(storage_error)? {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    pub async fn exists(&self, kind: ImageKind, id: i32) -> Result<bool, ServiceError> {
        Ok(self.find(kind, id).await?.is_some())
    }
}

fn storage_error(err: std::io::Error) -> ServiceError {
    error!(error = %err, "Image storage failed");
    ServiceError::StorageError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_image_extensions_are_accepted() {
        assert_eq!(accepted_extension("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(accepted_extension("a.b.webp").as_deref(), Some("webp"));
        assert_eq!(accepted_extension("script.svg"), None);
        assert_eq!(accepted_extension("noext"), None);
    }

    #[tokio::test]
    async fn saving_replaces_an_image_with_another_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path(), 1024);

        assert!(!store.exists(ImageKind::Substances, 3).await.unwrap());
        store
            .save(ImageKind::Substances, 3, "first.png", b"png-bytes")
            .await
            .unwrap();
        let second = store
            .save(ImageKind::Substances, 3, "second.jpg", b"jpg-bytes")
            .await
            .unwrap();

        assert_eq!(
            store.find(ImageKind::Substances, 3).await.unwrap(),
            Some(second.clone())
        );
        assert!(!dir.path().join("substances/3.png").exists());
        assert_eq!(std::fs::read(second).unwrap(), b"jpg-bytes");
        assert!(!store.exists(ImageKind::Dealers, 3).await.unwrap());
    }

    #[tokio::test]
    async fn oversized_and_empty_uploads_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path(), 4);

        let too_big = store.save(ImageKind::Customers, 1, "a.png", b"12345").await;
        assert!(matches!(too_big, Err(ServiceError::InvalidInput(_))));
        let empty = store.save(ImageKind::Customers, 1, "a.png", b"").await;
        assert!(matches!(empty, Err(ServiceError::InvalidInput(_))));
        assert!(!store.exists(ImageKind::Customers, 1).await.unwrap());
    }
}
