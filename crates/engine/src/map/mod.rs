mod generate;
mod grid;
mod source;
mod tiles;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use generate::{
    generate_default_map, generate_scattered_map, ScatterConfig, DEFAULT_MAP_HEIGHT,
    DEFAULT_MAP_LABEL, DEFAULT_MAP_TILE_SIZE, DEFAULT_MAP_WIDTH,
};
pub use grid::{EntityHint, MapData, PLAYER_SPAWN};
pub use source::{
    load_map_file, load_map_or_default, parse_map_source, LoadedMap, MapSource, ObstacleSource,
    TileToken, TilesSource,
};
pub use tiles::{TileInfo, TileKind, DEFAULT_TILE};

pub const MAX_MAP_DIMENSION_TILES: u32 = 1024;
pub const MAX_TILE_SIZE_PX: u32 = 256;

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read map file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("map source is malformed at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid map dimensions {width}x{height} with tile size {tile_size}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        tile_size: u32,
    },
    #[error("map is {width_px}x{height_px}px, larger than the {max}px render surface limit")]
    TooLargeToRender {
        width_px: u64,
        height_px: u64,
        max: u32,
    },
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
}

const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf2_9ce4_8422_2325;
const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01b3;

/// Incremental FNV-1a over little-endian bytes. Used for content fingerprints
/// of maps and obstacle sets.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fnv1a(u64);

impl Fnv1a {
    pub(crate) fn new() -> Self {
        Self(FNV1A_OFFSET_BASIS_64)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= *byte as u64;
            self.0 = self.0.wrapping_mul(FNV1A_PRIME_64);
        }
    }

    pub(crate) fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub(crate) fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub(crate) fn write_str(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.write_bytes(value.as_bytes());
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}
