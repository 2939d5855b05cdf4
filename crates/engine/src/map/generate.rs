use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::geometry::TileCoord;
use crate::obstacles::Obstacle;

use super::grid::{MapData, PLAYER_SPAWN};
use super::source::LoadedMap;
use super::tiles::TileKind;
use super::MapLoadError;

pub const DEFAULT_MAP_WIDTH: u32 = 25;
pub const DEFAULT_MAP_HEIGHT: u32 = 20;
pub const DEFAULT_MAP_TILE_SIZE: u32 = 32;
pub const DEFAULT_MAP_LABEL: &str = "generated_default";

/// Grid under construction; every write is bounds-checked so layouts can be
/// described without worrying about small map sizes.
struct TileCanvas {
    width: u32,
    height: u32,
    tiles: Vec<TileKind>,
}

impl TileCanvas {
    fn new(width: u32, height: u32, fill: TileKind) -> Self {
        Self {
            width,
            height,
            tiles: vec![fill; width as usize * height as usize],
        }
    }

    fn set(&mut self, x: u32, y: u32, kind: TileKind) {
        if x < self.width && y < self.height {
            self.tiles[y as usize * self.width as usize + x as usize] = kind;
        }
    }

    fn get(&self, x: u32, y: u32) -> Option<TileKind> {
        if x < self.width && y < self.height {
            self.tiles.get(y as usize * self.width as usize + x as usize).copied()
        } else {
            None
        }
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, kind: TileKind) {
        for ty in y..y.saturating_add(height) {
            for tx in x..x.saturating_add(width) {
                self.set(tx, ty, kind);
            }
        }
    }

    fn border(&mut self, kind: TileKind) {
        for x in 0..self.width {
            self.set(x, 0, kind);
            self.set(x, self.height.saturating_sub(1), kind);
        }
        for y in 0..self.height {
            self.set(0, y, kind);
            self.set(self.width.saturating_sub(1), y, kind);
        }
    }
}

/// Built-in town map used when no map file is configured or the configured
/// file is unusable.
pub fn generate_default_map() -> LoadedMap {
    let mut canvas = TileCanvas::new(DEFAULT_MAP_WIDTH, DEFAULT_MAP_HEIGHT, TileKind::Grass);
    canvas.border(TileKind::StoneWall);

    // Main street and the plaza in front of the shops.
    canvas.fill_rect(1, 9, DEFAULT_MAP_WIDTH - 2, 1, TileKind::Ground);
    canvas.fill_rect(10, 6, 5, 3, TileKind::Concrete);

    for (x, y) in [(5, 5), (6, 5), (18, 6), (19, 6), (3, 15), (22, 11)] {
        canvas.set(x, y, TileKind::Tree);
    }
    for (x, y) in [(10, 12), (8, 16), (21, 3)] {
        canvas.set(x, y, TileKind::Rock);
    }
    canvas.fill_rect(16, 13, 3, 2, TileKind::Water);

    let obstacles = vec![
        Obstacle::building("pet_shop", 3, 2, 3, 2)
            .with_name("Pet Shop")
            .with_variant("house_petshop")
            .with_image("buildings/pet_shop.png")
            .interactable(true),
        Obstacle::building("house_1", 12, 2, 3, 2)
            .with_name("Residence")
            .with_variant("house_residential")
            .with_image("buildings/house.png")
            .interactable(true),
        Obstacle::natural("bushes", 20, 15, 2, 2).with_image("nature/bushes.png"),
    ];

    let map = MapData::from_valid_parts(
        DEFAULT_MAP_WIDTH,
        DEFAULT_MAP_HEIGHT,
        DEFAULT_MAP_TILE_SIZE,
        canvas.tiles,
    )
    .with_spawn_point(PLAYER_SPAWN, TileCoord::new(12, 12))
    .with_entity_hint("garden", TileCoord::new(7, 13))
    .with_entity_hint("backyard", TileCoord::new(21, 7));

    tracing::debug!(
        width = map.width(),
        height = map.height(),
        obstacles = obstacles.len(),
        "default_map_generated"
    );

    LoadedMap {
        label: DEFAULT_MAP_LABEL.to_string(),
        map,
        obstacles,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterConfig {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub seed: u64,
    pub tree_density: f64,
    pub rock_density: f64,
    pub feature_count: u32,
    /// Tiles around the player spawn kept free of scattered obstacles.
    pub spawn_clearance: u32,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_MAP_WIDTH,
            height: DEFAULT_MAP_HEIGHT,
            tile_size: DEFAULT_MAP_TILE_SIZE,
            seed: 0,
            tree_density: 0.06,
            rock_density: 0.03,
            feature_count: 3,
            spawn_clearance: 2,
        }
    }
}

/// Walled grass field with trees, rocks and natural-feature obstacles
/// scattered by a seeded RNG. The same config always produces the same map.
pub fn generate_scattered_map(config: ScatterConfig) -> Result<LoadedMap, MapLoadError> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut canvas = TileCanvas::new(config.width, config.height, TileKind::Grass);
    canvas.border(TileKind::StoneWall);

    let spawn = TileCoord::new(config.width / 2, config.height / 2);
    let clearance = config.spawn_clearance;
    let near_spawn = |x: u32, y: u32, pad: u32| {
        x.abs_diff(spawn.x) <= clearance + pad && y.abs_diff(spawn.y) <= clearance + pad
    };

    let tree_density = config.tree_density.clamp(0.0, 1.0);
    let rock_density = config.rock_density.clamp(0.0, 1.0 - tree_density);
    for y in 1..config.height.saturating_sub(1) {
        for x in 1..config.width.saturating_sub(1) {
            if near_spawn(x, y, 0) {
                continue;
            }
            let roll: f64 = rng.gen();
            if roll < tree_density {
                canvas.set(x, y, TileKind::Tree);
            } else if roll < tree_density + rock_density {
                canvas.set(x, y, TileKind::Rock);
            }
        }
    }

    let mut obstacles = Vec::new();
    if config.width > 4 && config.height > 4 {
        for index in 0..config.feature_count {
            let size_w = rng.gen_range(1..=2u32);
            let size_h = rng.gen_range(1..=2u32);
            let max_x = config.width.saturating_sub(1 + size_w).max(1);
            let max_y = config.height.saturating_sub(1 + size_h).max(1);
            let x = rng.gen_range(1..=max_x);
            let y = rng.gen_range(1..=max_y);
            // Margin of one tile plus the footprint itself must stay off the spawn.
            if near_spawn(x, y, 1 + size_w.max(size_h)) {
                continue;
            }
            if canvas.get(x, y) == Some(TileKind::StoneWall) {
                continue;
            }
            obstacles.push(Obstacle::natural(format!("grove_{index}"), x, y, size_w, size_h));
        }
    }

    let map = MapData::new(config.width, config.height, config.tile_size, canvas.tiles)?
        .with_spawn_point(PLAYER_SPAWN, spawn);
    tracing::debug!(
        seed = config.seed,
        trees = map.count_tiles(|kind| kind == TileKind::Tree),
        rocks = map.count_tiles(|kind| kind == TileKind::Rock),
        features = obstacles.len(),
        "scattered_map_generated"
    );
    Ok(LoadedMap {
        label: format!("scattered_{}", config.seed),
        map,
        obstacles,
    })
}
