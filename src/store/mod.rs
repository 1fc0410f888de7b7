//! Object-store access for catalog images.
//!
//! Images live under `images/{size}/{key}`, where `size` is a rendition
//! bucket such as `small` and `key` is the image's relative path.

mod http;
mod local;

pub use http::HttpStore;
pub use local::LocalStore;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::DynamicImage;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{Error, Result};

/// Size variant used when the caller does not pick one
pub const DEFAULT_IMAGE_SIZE: &str = "small";

/// Read-only capability for fetching named objects
pub trait ObjectStore: Send + Sync {
    /// Read the full body of the object at `path`
    fn get_object(&self, path: &str) -> Result<Vec<u8>>;

    /// Backend name for logs
    fn store_name(&self) -> &'static str;
}

/// Object path of an image rendition
pub fn image_object_path(size: &str, key: &str) -> String {
    format!("images/{}/{}", size, key)
}

/// Fetch an image and return its bytes as standard base64 text.
pub fn fetch_image_base64(store: &dyn ObjectStore, key: &str, size: &str) -> Result<String> {
    let path = image_object_path(size, key);
    let bytes = store.get_object(&path)?;
    tracing::debug!(
        store = store.store_name(),
        path = %path,
        bytes = bytes.len(),
        "fetched image for encoding"
    );
    Ok(BASE64.encode(bytes))
}

/// Fetch an image and decode it for display.
pub fn fetch_image_decoded(store: &dyn ObjectStore, key: &str, size: &str) -> Result<DynamicImage> {
    let path = image_object_path(size, key);
    let bytes = store.get_object(&path)?;
    tracing::debug!(
        store = store.store_name(),
        path = %path,
        bytes = bytes.len(),
        "fetched image for decoding"
    );
    image::load_from_memory(&bytes).map_err(|source| Error::Decode {
        key: key.to_string(),
        source,
    })
}

/// Create an object store based on configuration
pub fn create_store(config: &StoreConfig) -> Box<dyn ObjectStore> {
    match config.backend {
        StoreBackend::Local => Box::new(LocalStore::new(&config.root)),
        StoreBackend::Http => Box::new(HttpStore::new(
            &config.base_url,
            std::time::Duration::from_secs(config.timeout_secs),
        )),
    }
}
