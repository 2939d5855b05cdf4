use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::warn;

use crate::asset_keys::resolve_asset_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSprite {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// PNG sprites keyed by asset key, loaded lazily from `asset_root`. Failed
/// loads are cached as `None` and warned about once per key.
#[derive(Debug, Default)]
pub struct SpriteCache {
    asset_root: PathBuf,
    sprites: HashMap<String, Option<LoadedSprite>>,
    warned_missing_sprite_keys: HashSet<String>,
}

impl SpriteCache {
    pub fn new(asset_root: PathBuf) -> Self {
        Self {
            asset_root,
            sprites: HashMap::new(),
            warned_missing_sprite_keys: HashSet::new(),
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    pub fn get(&mut self, key: &str) -> Option<&LoadedSprite> {
        if !self.sprites.contains_key(key) {
            let sprite = self.load(key);
            self.sprites.insert(key.to_string(), sprite);
        }
        self.sprites.get(key).and_then(Option::as_ref)
    }

    pub fn insert(&mut self, key: impl Into<String>, sprite: LoadedSprite) {
        self.sprites.insert(key.into(), Some(sprite));
    }

    pub fn missing_count(&self) -> usize {
        self.sprites.values().filter(|sprite| sprite.is_none()).count()
    }

    fn load(&mut self, key: &str) -> Option<LoadedSprite> {
        let path = match resolve_asset_path(&self.asset_root, key) {
            Ok(path) => path,
            Err(error) => {
                self.warn_once(key, None, &format!("invalid_key:{error}"));
                return None;
            }
        };
        match load_sprite_rgba(&path) {
            Ok(sprite) => Some(sprite),
            Err(reason) => {
                self.warn_once(key, Some(&path), &reason);
                None
            }
        }
    }

    fn warn_once(&mut self, key: &str, resolved_path: Option<&Path>, reason: &str) {
        if !self.warned_missing_sprite_keys.insert(key.to_string()) {
            return;
        }
        let path_display = resolved_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<unresolved>".to_string());
        warn!(
            sprite_key = key,
            path = %path_display,
            reason = reason,
            "sprite_load_failed_using_fallback_color"
        );
    }
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}
