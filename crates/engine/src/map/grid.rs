use std::collections::BTreeMap;

use crate::geometry::{Rect, TileCoord, Vec2};

use crate::render::MAX_SURFACE_DIMENSION_PX;

use super::tiles::TileKind;
use super::{Fnv1a, MapLoadError, MAX_MAP_DIMENSION_TILES, MAX_TILE_SIZE_PX};

pub const PLAYER_SPAWN: &str = "player";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityHint {
    pub name: String,
    pub tile: TileCoord,
}

/// Immutable tile grid for one loaded map. Tile `(x, y)` covers the world
/// pixels `[x * tile_size, (x + 1) * tile_size)` horizontally and the same
/// range vertically; the world origin is the top-left corner of tile (0,0).
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    width: u32,
    height: u32,
    tile_size: u32,
    tiles: Vec<TileKind>,
    spawn_points: BTreeMap<String, TileCoord>,
    entity_hints: Vec<EntityHint>,
    fingerprint: u64,
}

impl MapData {
    pub fn new(
        width: u32,
        height: u32,
        tile_size: u32,
        tiles: Vec<TileKind>,
    ) -> Result<Self, MapLoadError> {
        validate_dimensions(width, height, tile_size)?;
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(MapLoadError::TileCountMismatch { expected, actual });
        }
        Ok(Self::from_valid_parts(width, height, tile_size, tiles))
    }

    /// Skips validation; callers guarantee in-range dimensions and a tile
    /// count of `width * height`. Short tile data is padded with the default.
    pub(super) fn from_valid_parts(
        width: u32,
        height: u32,
        tile_size: u32,
        mut tiles: Vec<TileKind>,
    ) -> Self {
        tiles.resize(width as usize * height as usize, TileKind::default());
        let fingerprint = compute_fingerprint(width, height, tile_size, &tiles);
        Self {
            width,
            height,
            tile_size,
            tiles,
            spawn_points: BTreeMap::new(),
            entity_hints: Vec::new(),
            fingerprint,
        }
    }

    pub fn filled(
        width: u32,
        height: u32,
        tile_size: u32,
        fill: TileKind,
    ) -> Result<Self, MapLoadError> {
        validate_dimensions(width, height, tile_size)?;
        let count = width as usize * height as usize;
        Self::new(width, height, tile_size, vec![fill; count])
    }

    /// Spawn points outside the grid are dropped with a warning.
    pub fn with_spawn_point(mut self, name: impl Into<String>, tile: TileCoord) -> Self {
        let name = name.into();
        if tile.x >= self.width || tile.y >= self.height {
            tracing::warn!(
                spawn = %name,
                x = tile.x,
                y = tile.y,
                "spawn_point_outside_map_dropped"
            );
            return self;
        }
        self.spawn_points.insert(name, tile);
        self
    }

    pub fn with_entity_hint(mut self, name: impl Into<String>, tile: TileCoord) -> Self {
        if tile.x < self.width && tile.y < self.height {
            self.entity_hints.push(EntityHint {
                name: name.into(),
                tile,
            });
        }
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<TileKind> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }

    pub fn get_tile(&self, world_x: f32, world_y: f32) -> Option<TileKind> {
        let tile = self.world_to_tile(Vec2::new(world_x, world_y))?;
        self.tile_at(tile.x, tile.y)
    }

    pub fn world_to_tile(&self, world: Vec2) -> Option<TileCoord> {
        if !world.is_finite() {
            return None;
        }
        let size = self.tile_size as f32;
        let tile_x = (world.x / size).floor();
        let tile_y = (world.y / size).floor();
        if tile_x < 0.0 || tile_y < 0.0 {
            return None;
        }
        let (tile_x, tile_y) = (tile_x as u32, tile_y as u32);
        if tile_x >= self.width || tile_y >= self.height {
            return None;
        }
        Some(TileCoord::new(tile_x, tile_y))
    }

    pub fn tile_origin_world(&self, tile: TileCoord) -> Vec2 {
        let size = self.tile_size as f32;
        Vec2::new(tile.x as f32 * size, tile.y as f32 * size)
    }

    pub fn tile_center_world(&self, tile: TileCoord) -> Vec2 {
        let size = self.tile_size as f32;
        Vec2::new((tile.x as f32 + 0.5) * size, (tile.y as f32 + 0.5) * size)
    }

    pub fn tile_rect_world(&self, tile: TileCoord) -> Rect {
        let origin = self.tile_origin_world(tile);
        let size = self.tile_size as f32;
        Rect::new(origin.x, origin.y, size, size)
    }

    pub fn get_map_size(&self) -> (u32, u32) {
        (self.width * self.tile_size, self.height * self.tile_size)
    }

    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * self.tile_size as f32
    }

    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * self.tile_size as f32
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.pixel_width(), self.pixel_height())
    }

    pub fn spawn_point(&self, name: &str) -> Option<TileCoord> {
        self.spawn_points.get(name).copied()
    }

    /// Spawn point centred in its tile, in world pixels.
    pub fn spawn_point_world(&self, name: &str) -> Option<Vec2> {
        self.spawn_point(name)
            .map(|tile| self.tile_center_world(tile))
    }

    pub fn spawn_points(&self) -> impl Iterator<Item = (&str, TileCoord)> {
        self.spawn_points
            .iter()
            .map(|(name, tile)| (name.as_str(), *tile))
    }

    pub fn entity_hints(&self) -> &[EntityHint] {
        &self.entity_hints
    }

    /// Row-major iteration over every tile.
    pub fn iter_tiles(&self) -> impl Iterator<Item = (TileCoord, TileKind)> + '_ {
        let width = self.width.max(1);
        self.tiles.iter().enumerate().map(move |(index, kind)| {
            let x = index as u32 % width;
            let y = index as u32 / width;
            (TileCoord::new(x, y), *kind)
        })
    }

    pub fn count_tiles(&self, predicate: impl Fn(TileKind) -> bool) -> usize {
        self.tiles.iter().filter(|kind| predicate(**kind)).count()
    }
}

/// Checks tile counts and tile size, then that the full map in pixels fits a
/// single composited surface. Runs before any tile storage is allocated.
pub(super) fn validate_dimensions(
    width: u32,
    height: u32,
    tile_size: u32,
) -> Result<(), MapLoadError> {
    let dimensions_ok = (1..=MAX_MAP_DIMENSION_TILES).contains(&width)
        && (1..=MAX_MAP_DIMENSION_TILES).contains(&height);
    let tile_size_ok = (1..=MAX_TILE_SIZE_PX).contains(&tile_size);
    if !(dimensions_ok && tile_size_ok) {
        return Err(MapLoadError::InvalidDimensions {
            width,
            height,
            tile_size,
        });
    }
    let width_px = u64::from(width) * u64::from(tile_size);
    let height_px = u64::from(height) * u64::from(tile_size);
    let max = u64::from(MAX_SURFACE_DIMENSION_PX);
    if width_px > max || height_px > max {
        return Err(MapLoadError::TooLargeToRender {
            width_px,
            height_px,
            max: MAX_SURFACE_DIMENSION_PX,
        });
    }
    Ok(())
}

fn compute_fingerprint(width: u32, height: u32, tile_size: u32, tiles: &[TileKind]) -> u64 {
    let mut hash = Fnv1a::new();
    hash.write_u32(width);
    hash.write_u32(height);
    hash.write_u32(tile_size);
    for kind in tiles {
        hash.write_u8(*kind as u8);
    }
    hash.finish()
}
