//! File storage, uploads and image handling

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use elgg_config::Config;
use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::error::{Result, ServiceError};
use crate::events::PluginHooksService;
use crate::http::Request;
use crate::output::Logger;
use crate::tables::EntityTable;

fn relative_path(root: &Path, path: &str) -> Result<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(ServiceError::InvalidArgument(format!(
            "invalid file path: {}",
            path
        )));
    }
    Ok(root.join(relative))
}

/// Files stored below the data directory
pub struct DiskFilestore {
    root: PathBuf,
}

impl DiskFilestore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write(&self, path: &str, contents: &[u8]) -> Result<()> {
        let full = relative_path(&self.root, path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, contents)?;
        Ok(())
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(relative_path(&self.root, path)?)?)
    }

    pub fn exists(&self, path: &str) -> bool {
        relative_path(&self.root, path)
            .map(|full| full.is_file())
            .unwrap_or(false)
    }

    pub fn delete(&self, path: &str) -> Result<bool> {
        let full = relative_path(&self.root, path)?;
        if !full.exists() {
            return Ok(false);
        }
        fs::remove_file(full)?;
        Ok(true)
    }
}

/// Filestore rooted in the system temporary directory
pub struct TempDiskFilestore {
    inner: DiskFilestore,
}

impl TempDiskFilestore {
    pub fn filestore(&self) -> &DiskFilestore {
        &self.inner
    }
}

impl Default for TempDiskFilestore {
    fn default() -> Self {
        Self {
            inner: DiskFilestore::new(std::env::temp_dir().join("elgg-tmp")),
        }
    }
}

/// Image library the image service drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageBackend {
    Gd,
    Imagick,
}

pub struct ImageService {
    pub backend: ImageBackend,
    pub config: Arc<Config>,
}

impl ImageService {
    pub fn new(backend: ImageBackend, config: Arc<Config>) -> Self {
        Self { backend, config }
    }

    /// Size an image of `width` x `height` fits into `max_width` x
    /// `max_height` with its aspect ratio kept. `square` crops to the
    /// shorter side first. Images are never upscaled.
    pub fn fit_dimensions(
        &self,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
        square: bool,
    ) -> Result<(u32, u32)> {
        if width == 0 || height == 0 || max_width == 0 || max_height == 0 {
            return Err(ServiceError::InvalidArgument(
                "image dimensions must be positive".to_string(),
            ));
        }

        let (width, height) = if square {
            let side = width.min(height);
            (side, side)
        } else {
            (width, height)
        };

        let scale = f64::min(
            max_width as f64 / width as f64,
            max_height as f64 / height as f64,
        )
        .min(1.0);
        let fit = |v: u32| ((v as f64 * scale).round() as u32).max(1);
        Ok((fit(width), fit(height)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub contents: Vec<u8>,
}

impl UploadedFile {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Files sent with the current request
pub struct UploadService {
    pub request: Arc<Request>,
    pub images: Arc<ImageService>,
    files: RwLock<HashMap<String, Vec<UploadedFile>>>,
}

impl UploadService {
    pub fn new(request: Arc<Request>, images: Arc<ImageService>) -> Self {
        Self {
            request,
            images,
            files: RwLock::new(HashMap::new()),
        }
    }

    pub fn add(&self, input: &str, file: UploadedFile) {
        self.files
            .write()
            .entry(input.to_string())
            .or_default()
            .push(file);
    }

    pub fn files(&self, input: &str) -> Vec<UploadedFile> {
        self.files.read().get(input).cloned().unwrap_or_default()
    }

    pub fn file(&self, input: &str) -> Option<UploadedFile> {
        self.files.read().get(input).and_then(|files| files.first().cloned())
    }
}

/// Icon sizes and paths of entities
pub struct EntityIconService {
    pub config: Arc<Config>,
    pub hooks: Arc<PluginHooksService>,
    pub request: Arc<Request>,
    pub logger: Arc<Logger>,
    pub entities: Arc<EntityTable>,
    pub uploads: Arc<UploadService>,
}

impl EntityIconService {
    /// Largest edge per icon size, filtered by the `entity:icon:sizes` hook
    pub fn sizes(&self) -> HashMap<String, u32> {
        let defaults = json!({
            "topbar": 16,
            "tiny": 25,
            "small": 40,
            "medium": 100,
            "large": 200,
            "master": 2048,
        });
        let sizes = self
            .hooks
            .trigger("entity:icon:sizes", "all", json!({}), defaults);
        match sizes {
            Value::Object(sizes) => sizes
                .into_iter()
                .filter_map(|(name, edge)| edge.as_u64().map(|edge| (name, edge as u32)))
                .collect(),
            _ => HashMap::new(),
        }
    }

    pub fn icon_path(&self, owner_guid: i64, guid: i64, size: &str) -> Result<String> {
        if !self.sizes().contains_key(size) {
            self.logger
                .warn(&format!("Unknown icon size '{}' requested", size));
            return Err(ServiceError::InvalidArgument(format!(
                "unknown icon size: {}",
                size
            )));
        }
        Ok(format!("{}/icons/icon/{}{}.jpg", owner_guid, guid, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filestore_read_write() {
        let dir = TempDir::new().unwrap();
        let store = DiskFilestore::new(dir.path());

        store.write("1/2/file.txt", b"hello").unwrap();
        assert!(store.exists("1/2/file.txt"));
        assert_eq!(store.read("1/2/file.txt").unwrap(), b"hello");
        assert!(store.delete("1/2/file.txt").unwrap());
        assert!(!store.delete("1/2/file.txt").unwrap());
    }

    #[test]
    fn test_filestore_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let store = DiskFilestore::new(dir.path());
        assert!(store.write("../outside.txt", b"x").is_err());
        assert!(store.read("").is_err());
        assert!(!store.exists("a/../../b"));
    }

    #[test]
    fn test_fit_dimensions() {
        let images = ImageService::new(ImageBackend::Gd, Arc::new(Config::new()));
        assert_eq!(images.fit_dimensions(400, 200, 100, 100, false).unwrap(), (100, 50));
        assert_eq!(images.fit_dimensions(400, 200, 100, 100, true).unwrap(), (100, 100));
        assert_eq!(images.fit_dimensions(50, 20, 100, 100, false).unwrap(), (50, 20));
        assert!(images.fit_dimensions(0, 20, 100, 100, false).is_err());
    }

    #[test]
    fn test_uploads() {
        let images = Arc::new(ImageService::new(ImageBackend::Gd, Arc::new(Config::new())));
        let uploads = UploadService::new(Arc::new(Request::default()), images);
        uploads.add(
            "icon",
            UploadedFile {
                name: "me.png".to_string(),
                mime_type: "image/png".to_string(),
                contents: vec![1, 2, 3],
            },
        );
        assert!(uploads.file("icon").map(|f| f.is_image()).unwrap_or(false));
        assert!(uploads.file("avatar").is_none());
        assert_eq!(uploads.files("icon").len(), 1);
    }
}
