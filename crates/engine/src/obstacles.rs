use crate::geometry::{Rect, TileCoord, TileRect, Vec2};
use crate::map::Fnv1a;

pub const DEFAULT_OBSTACLE_MARGIN_TILES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleKind {
    Building,
    NaturalFeature,
}

impl ObstacleKind {
    pub fn fallback_color(self) -> [u8; 4] {
        match self {
            ObstacleKind::Building => [150, 75, 50, 255],
            ObstacleKind::NaturalFeature => [60, 110, 60, 255],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: String,
    pub kind: ObstacleKind,
    pub variant: Option<String>,
    pub name: Option<String>,
    pub footprint: TileRect,
    pub margin_tiles: u32,
    pub image_key: Option<String>,
    pub interactable: bool,
}

impl Obstacle {
    pub fn new(id: impl Into<String>, kind: ObstacleKind, footprint: TileRect) -> Self {
        Self {
            id: id.into(),
            kind,
            variant: None,
            name: None,
            footprint,
            margin_tiles: DEFAULT_OBSTACLE_MARGIN_TILES,
            image_key: None,
            interactable: false,
        }
    }

    pub fn building(id: impl Into<String>, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new(
            id,
            ObstacleKind::Building,
            TileRect::new(TileCoord::new(x, y), width, height),
        )
    }

    pub fn natural(id: impl Into<String>, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new(
            id,
            ObstacleKind::NaturalFeature,
            TileRect::new(TileCoord::new(x, y), width, height),
        )
    }

    pub fn with_margin(mut self, margin_tiles: u32) -> Self {
        self.margin_tiles = margin_tiles;
        self
    }

    pub fn with_image(mut self, image_key: impl Into<String>) -> Self {
        self.image_key = Some(image_key.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn interactable(mut self, interactable: bool) -> Self {
        self.interactable = interactable;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Chebyshev distance in tiles from `(tile_x, tile_y)` to the nearest
    /// footprint tile; zero when the tile is inside the footprint.
    pub fn tile_distance(&self, tile_x: i64, tile_y: i64) -> u64 {
        let left = self.footprint.origin.x as i64;
        let top = self.footprint.origin.y as i64;
        let right = left + self.footprint.width as i64 - 1;
        let bottom = top + self.footprint.height as i64 - 1;
        let dx = (left - tile_x).max(tile_x - right).max(0);
        let dy = (top - tile_y).max(tile_y - bottom).max(0);
        dx.max(dy) as u64
    }
}

#[derive(Debug, Clone, Copy)]
struct ObstacleBounds {
    footprint: Rect,
    blocked: Rect,
}

/// Obstacle footprints for the current map. Footprint and margin rectangles
/// are precomputed on `load` so per-frame queries are a linear scan of
/// rect overlaps.
#[derive(Debug, Clone)]
pub struct ObstacleIndex {
    tile_size: u32,
    obstacles: Vec<Obstacle>,
    bounds: Vec<ObstacleBounds>,
    fingerprint: u64,
}

impl ObstacleIndex {
    pub fn new(tile_size: u32) -> Self {
        let mut index = Self {
            tile_size: tile_size.max(1),
            obstacles: Vec::new(),
            bounds: Vec::new(),
            fingerprint: 0,
        };
        index.fingerprint = index.compute_fingerprint();
        index
    }

    pub fn with_obstacles(tile_size: u32, entries: Vec<Obstacle>) -> Self {
        let mut index = Self::new(tile_size);
        index.load(entries);
        index
    }

    /// Replaces the whole obstacle list. Zero-area footprints are dropped.
    pub fn load(&mut self, entries: Vec<Obstacle>) {
        let mut obstacles = Vec::with_capacity(entries.len());
        let mut bounds = Vec::with_capacity(entries.len());
        for obstacle in entries {
            if obstacle.footprint.area() == 0 {
                tracing::warn!(id = %obstacle.id, "obstacle_with_empty_footprint_dropped");
                continue;
            }
            bounds.push(ObstacleBounds {
                footprint: obstacle.footprint.to_world(self.tile_size),
                blocked: obstacle
                    .footprint
                    .to_world_expanded(self.tile_size, obstacle.margin_tiles),
            });
            obstacles.push(obstacle);
        }
        self.obstacles = obstacles;
        self.bounds = bounds;
        self.fingerprint = self.compute_fingerprint();
        tracing::debug!(
            count = self.obstacles.len(),
            fingerprint = self.fingerprint,
            "obstacles_loaded"
        );
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// True when `rect` overlaps any footprint grown by its margin.
    pub fn query(&self, rect: &Rect) -> bool {
        self.first_hit(rect).is_some()
    }

    pub fn first_hit(&self, rect: &Rect) -> Option<&Obstacle> {
        self.bounds
            .iter()
            .position(|bounds| rect.intersects(&bounds.blocked))
            .and_then(|index| self.obstacles.get(index))
    }

    /// Point test against the bare footprints, without margins.
    pub fn contains_point(&self, point: Vec2) -> bool {
        self.bounds
            .iter()
            .any(|bounds| bounds.footprint.contains_point(point))
    }

    pub fn blocks_point(&self, point: Vec2) -> bool {
        self.bounds
            .iter()
            .any(|bounds| bounds.blocked.contains_point(point))
    }

    /// Tile-space test including each obstacle's margin.
    pub fn is_tile_blocked(&self, tile_x: i64, tile_y: i64) -> bool {
        self.obstacles.iter().any(|obstacle| {
            let margin = obstacle.margin_tiles as i64;
            let left = obstacle.footprint.origin.x as i64 - margin;
            let top = obstacle.footprint.origin.y as i64 - margin;
            let right = obstacle.footprint.origin.x as i64 + obstacle.footprint.width as i64 + margin;
            let bottom =
                obstacle.footprint.origin.y as i64 + obstacle.footprint.height as i64 + margin;
            tile_x >= left && tile_x < right && tile_y >= top && tile_y < bottom
        })
    }

    pub fn obstacle_at_tile(&self, tile_x: i64, tile_y: i64) -> Option<&Obstacle> {
        self.obstacles
            .iter()
            .find(|obstacle| obstacle.footprint.contains(tile_x, tile_y))
    }

    pub fn interactable_near(&self, tile_x: i64, tile_y: i64, radius: u32) -> Vec<&Obstacle> {
        self.obstacles
            .iter()
            .filter(|obstacle| obstacle.interactable)
            .filter(|obstacle| obstacle.tile_distance(tile_x, tile_y) <= radius as u64)
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&Obstacle> {
        self.obstacles.iter().find(|obstacle| obstacle.id == id)
    }

    fn compute_fingerprint(&self) -> u64 {
        let mut hash = Fnv1a::new();
        hash.write_u32(self.tile_size);
        hash.write_u32(self.obstacles.len() as u32);
        for obstacle in &self.obstacles {
            hash.write_str(&obstacle.id);
            hash.write_u8(match obstacle.kind {
                ObstacleKind::Building => 0,
                ObstacleKind::NaturalFeature => 1,
            });
            hash.write_u32(obstacle.footprint.origin.x);
            hash.write_u32(obstacle.footprint.origin.y);
            hash.write_u32(obstacle.footprint.width);
            hash.write_u32(obstacle.footprint.height);
            hash.write_u32(obstacle.margin_tiles);
        }
        hash.finish()
    }
}
