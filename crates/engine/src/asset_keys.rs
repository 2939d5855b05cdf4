use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetKeyError {
    #[error("asset key must not be empty")]
    Empty,
    #[error("asset key must not start with '/'")]
    LeadingSlash,
    #[error("asset key must not contain '\\\\'")]
    Backslash,
    #[error("asset key must not contain '..'")]
    ParentTraversal,
    #[error("asset key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

const ASSETS_PREFIX: &str = "assets/";

pub fn validate_asset_key(key: &str) -> Result<(), AssetKeyError> {
    if key.is_empty() {
        return Err(AssetKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(AssetKeyError::LeadingSlash);
    }
    if key.contains('\\') {
        return Err(AssetKeyError::Backslash);
    }
    if key.contains("..") {
        return Err(AssetKeyError::ParentTraversal);
    }
    for ch in key.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-' | '.') {
            continue;
        }
        return Err(AssetKeyError::InvalidCharacter { character: ch });
    }
    Ok(())
}

/// Map files may reference images either relative to the asset root or with
/// a leading `assets/`; both resolve to the same key.
pub fn normalize_asset_key(raw: &str) -> Result<String, AssetKeyError> {
    let trimmed = raw.trim();
    let key = trimmed.strip_prefix(ASSETS_PREFIX).unwrap_or(trimmed);
    validate_asset_key(key)?;
    Ok(key.to_string())
}

pub fn resolve_asset_path(asset_root: &Path, key: &str) -> Result<PathBuf, AssetKeyError> {
    validate_asset_key(key)?;
    Ok(asset_root.join(key))
}
