//! Named image assets.

use crate::image_decoder::{ImageDecoder, ImageFormat};
use crate::raster::RasterImage;
use crate::source::{validate, ImageResolver, ImageSource};
use common::error::{OverlayError, OverlayResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Something registered in memory under a name.
#[derive(Clone)]
enum Asset {
    Encoded(Arc<Vec<u8>>),
    Raster(RasterImage),
}

/// Cached decode.
struct CacheEntry {
    image: RasterImage,
    last_access: Instant,
}

/// Resolves asset names against registered images and search directories.
///
/// A name is looked up first among registered assets, then in each search
/// directory as `<dir>/<name>` and `<dir>/<name>.<ext>` for every decodable
/// extension. Decoded images are cached by name; the least recently used
/// entries are evicted once the cache outgrows its size limit.
///
/// Locks are always taken cache first, then assets.
pub struct AssetCatalog {
    decoder: ImageDecoder,
    search_paths: Vec<PathBuf>,
    /// Images registered in memory.
    assets: RwLock<HashMap<String, Asset>>,
    /// Decoded images by name.
    cache: RwLock<HashMap<String, CacheEntry>>,
    /// Maximum cache size in bytes.
    max_cache_size: usize,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::with_decoder(ImageDecoder::new())
    }

    pub fn with_decoder(decoder: ImageDecoder) -> Self {
        Self {
            decoder,
            search_paths: Vec::new(),
            assets: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            max_cache_size: 100 * 1024 * 1024, // 100MB
        }
    }

    /// Add a directory to search for asset files.
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.add_search_path(path);
        self
    }

    /// Set the maximum size of decoded images kept in the cache.
    pub fn with_cache_size(mut self, bytes: usize) -> Self {
        self.max_cache_size = bytes;
        self
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Register encoded bytes under `name`. Replaces any earlier asset and
    /// drops its cached decode.
    pub fn register(&self, name: impl Into<String>, bytes: Vec<u8>) {
        self.replace(name.into(), Asset::Encoded(Arc::new(bytes)));
    }

    /// Register an already decoded image under `name`.
    ///
    /// Fails with `InvalidImage` if the image has no pixels.
    pub fn register_raster(&self, name: impl Into<String>, image: RasterImage) -> OverlayResult<()> {
        let name = name.into();
        let image = validate(image, Some(&name))?;
        self.replace(name, Asset::Raster(image));
        Ok(())
    }

    fn replace(&self, name: String, asset: Asset) {
        let mut cache = self.cache.write();
        let mut assets = self.assets.write();
        cache.remove(&name);
        assets.insert(name, asset);
    }

    /// Whether `name` is known without touching the filesystem.
    pub fn contains(&self, name: &str) -> bool {
        self.cache.read().contains_key(name) || self.assets.read().contains_key(name)
    }

    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }

    /// Bytes held by cached decodes.
    pub fn cache_size(&self) -> usize {
        self.cache
            .read()
            .values()
            .map(|entry| entry.image.memory_usage())
            .sum()
    }

    /// Drop decoded images. Registrations are kept.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Load a named asset, decoding it on first use.
    pub fn load(&self, name: &str) -> OverlayResult<RasterImage> {
        if let Some(entry) = self.cache.write().get_mut(name) {
            entry.last_access = Instant::now();
            return Ok(entry.image.clone());
        }

        let registered = self.assets.read().get(name).cloned();
        let bytes = match registered {
            Some(Asset::Raster(image)) => return Ok(image),
            Some(Asset::Encoded(bytes)) => Some(bytes),
            None => None,
        };

        let image = match &bytes {
            Some(bytes) => self.decoder.decode(bytes),
            None => self.decoder.decode(&self.read_file(name)?),
        }
        .map_err(|e| OverlayError::from(e).with_name(name))?;
        let image = validate(image, Some(name))?;

        tracing::debug!("Loaded asset {} ({}x{})", name, image.width(), image.height());
        self.store(name, bytes.as_ref(), image.clone());
        Ok(image)
    }

    /// Cache a decode unless the asset it came from was replaced meanwhile.
    fn store(&self, name: &str, decoded_from: Option<&Arc<Vec<u8>>>, image: RasterImage) {
        let size = image.memory_usage();
        if size > self.max_cache_size {
            return;
        }

        let mut cache = self.cache.write();
        let assets = self.assets.read();
        let current = match assets.get(name) {
            Some(Asset::Encoded(bytes)) => Some(bytes),
            _ => None,
        };
        let unchanged = match (decoded_from, current) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => !assets.contains_key(name),
            _ => false,
        };
        if !unchanged {
            tracing::debug!("Asset {} changed while decoding, not caching", name);
            return;
        }

        let mut used: usize = cache.values().map(|e| e.image.memory_usage()).sum();
        while used + size > self.max_cache_size {
            let oldest = cache
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone());
            let Some(key) = oldest else { break };
            if let Some(entry) = cache.remove(&key) {
                tracing::trace!("Evicted cached asset {}", key);
                used -= entry.image.memory_usage();
            }
        }

        cache.insert(
            name.to_string(),
            CacheEntry {
                image,
                last_access: Instant::now(),
            },
        );
    }

    fn read_file(&self, name: &str) -> OverlayResult<Vec<u8>> {
        match self.find_file(name) {
            Some(path) => Ok(std::fs::read(path)?),
            None => Err(OverlayError::not_found(name)),
        }
    }

    fn find_file(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }

        self.search_paths.iter().find_map(|dir| {
            let exact = dir.join(name);
            if exact.is_file() {
                return Some(exact);
            }
            ImageFormat::DECODABLE
                .iter()
                .flat_map(|format| candidate_extensions(*format))
                .map(|ext| dir.join(format!("{name}.{ext}")))
                .find(|path| path.is_file())
        })
    }
}

fn candidate_extensions(format: ImageFormat) -> &'static [&'static str] {
    match format {
        ImageFormat::Jpeg => &["jpg", "jpeg"],
        ImageFormat::Png => &["png"],
        ImageFormat::Gif => &["gif"],
        ImageFormat::WebP => &["webp"],
        ImageFormat::Bmp => &["bmp"],
        ImageFormat::Ico => &["ico"],
        ImageFormat::Svg => &[],
    }
}

impl ImageResolver for AssetCatalog {
    fn resolve(&self, source: &ImageSource) -> OverlayResult<RasterImage> {
        match source {
            ImageSource::Named(name) => self.load(name),
            ImageSource::Raster(image) => validate(image.clone(), None),
            ImageSource::Encoded(bytes) => validate(self.decoder.decode(bytes)?, None),
        }
    }
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AssetCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetCatalog")
            .field("search_paths", &self.search_paths)
            .field("assets", &self.assets.read().len())
            .field("cached", &self.cache.read().len())
            .finish()
    }
}
