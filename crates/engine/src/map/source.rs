use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::asset_keys::normalize_asset_key;
use crate::geometry::{TileCoord, TileRect};
use crate::obstacles::{Obstacle, ObstacleKind, DEFAULT_OBSTACLE_MARGIN_TILES};

use super::generate::generate_default_map;
use super::grid::{validate_dimensions, MapData, PLAYER_SPAWN};
use super::tiles::{TileKind, DEFAULT_TILE};
use super::MapLoadError;

const DEFAULT_TILE_SIZE_PX: u32 = 32;

/// A map plus the obstacles that were authored alongside it.
#[derive(Debug, Clone)]
pub struct LoadedMap {
    pub label: String,
    pub map: MapData,
    pub obstacles: Vec<Obstacle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapSource {
    pub dimensions: DimensionsSource,
    #[serde(default)]
    pub tiles: TilesSource,
    #[serde(default, alias = "spawnPoints")]
    pub spawn_points: BTreeMap<String, PointSource>,
    #[serde(default, alias = "spawnPoint")]
    pub spawn_point: Option<PointSource>,
    #[serde(default)]
    pub buildings: Vec<ObstacleSource>,
    #[serde(default, alias = "naturalFeatures")]
    pub natural_features: Vec<ObstacleSource>,
    #[serde(default, alias = "entityHints")]
    pub entity_hints: BTreeMap<String, PointSource>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DimensionsSource {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_tile_size", alias = "tileSize")]
    pub tile_size: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PointSource {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SizeSource {
    pub width: u32,
    pub height: u32,
}

impl Default for SizeSource {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObstacleSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub variant: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub position: PointSource,
    #[serde(default)]
    pub size: SizeSource,
    #[serde(default, alias = "imagePath")]
    pub image_path: Option<String>,
    #[serde(default)]
    pub margin: Option<u32>,
    #[serde(default)]
    pub interactable: Option<bool>,
}

/// One authored tile cell. Anything that is neither a legacy id nor a name
/// (`null`, floats, booleans, objects) lands in `Other` and takes the default.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TileToken {
    Id(i64),
    Name(String),
    Other(IgnoredAny),
}

impl TileToken {
    fn resolve(&self) -> TileKind {
        match self {
            TileToken::Id(id) => TileKind::from_legacy_id(*id).unwrap_or(DEFAULT_TILE),
            TileToken::Name(name) => TileKind::parse_or_default(name),
            TileToken::Other(_) => DEFAULT_TILE,
        }
    }

    fn is_unknown(&self) -> bool {
        match self {
            TileToken::Id(id) => TileKind::from_legacy_id(*id).is_none(),
            TileToken::Name(name) => TileKind::from_token(name).is_none(),
            TileToken::Other(_) => true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TilesSource {
    Rows(Vec<Vec<TileToken>>),
    Flat(Vec<TileToken>),
}

impl Default for TilesSource {
    fn default() -> Self {
        TilesSource::Rows(Vec::new())
    }
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE_PX
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ShapeReport {
    padded_cells: usize,
    dropped_cells: usize,
    substituted_tokens: usize,
}

impl TilesSource {
    /// Reshapes the authored tiles into a `width * height` row-major grid.
    /// Missing cells take the default tile and surplus cells are dropped.
    fn into_grid(self, width: u32, height: u32) -> (Vec<TileKind>, ShapeReport) {
        let width = width as usize;
        let height = height as usize;
        let mut report = ShapeReport::default();
        let mut tiles = Vec::with_capacity(width * height);
        let rows: Vec<Vec<TileToken>> = match self {
            TilesSource::Rows(rows) => rows,
            TilesSource::Flat(flat) => flat.chunks(width.max(1)).map(<[TileToken]>::to_vec).collect(),
        };
        let row_count = rows.len();
        for row in rows.into_iter().take(height) {
            let authored = row.len();
            for token in row.iter().take(width) {
                if token.is_unknown() {
                    report.substituted_tokens += 1;
                }
                tiles.push(token.resolve());
            }
            if authored < width {
                report.padded_cells += width - authored;
                tiles.resize(tiles.len() + width - authored, DEFAULT_TILE);
            } else {
                report.dropped_cells += authored - width;
            }
        }
        if row_count > height {
            report.dropped_cells += (row_count - height) * width;
        }
        let expected = width * height;
        report.padded_cells += expected - tiles.len();
        tiles.resize(expected, DEFAULT_TILE);
        (tiles, report)
    }
}

impl MapSource {
    pub fn into_loaded(self, label: impl Into<String>) -> Result<LoadedMap, MapLoadError> {
        let label = label.into();
        let DimensionsSource {
            width,
            height,
            tile_size,
        } = self.dimensions;
        validate_dimensions(width, height, tile_size)?;
        let (tiles, report) = self.tiles.into_grid(width, height);
        if report != ShapeReport::default() {
            tracing::debug!(
                map = %label,
                padded = report.padded_cells,
                dropped = report.dropped_cells,
                substituted = report.substituted_tokens,
                "map_tiles_normalized"
            );
        }

        let mut map = MapData::new(width, height, tile_size, tiles)?;
        if let Some(point) = self.spawn_point {
            map = map.with_spawn_point(PLAYER_SPAWN, TileCoord::new(point.x, point.y));
        }
        for (name, point) in self.spawn_points {
            map = map.with_spawn_point(name, TileCoord::new(point.x, point.y));
        }
        for (name, point) in self.entity_hints {
            map = map.with_entity_hint(name, TileCoord::new(point.x, point.y));
        }

        let mut obstacles = Vec::with_capacity(self.buildings.len() + self.natural_features.len());
        for (index, entry) in self.buildings.into_iter().enumerate() {
            obstacles.push(entry.into_obstacle(ObstacleKind::Building, index));
        }
        for (index, entry) in self.natural_features.into_iter().enumerate() {
            obstacles.push(entry.into_obstacle(ObstacleKind::NaturalFeature, index));
        }

        Ok(LoadedMap {
            label,
            map,
            obstacles,
        })
    }
}

impl ObstacleSource {
    fn into_obstacle(self, kind: ObstacleKind, index: usize) -> Obstacle {
        let id = self.id.unwrap_or_else(|| match kind {
            ObstacleKind::Building => format!("building_{index}"),
            ObstacleKind::NaturalFeature => format!("feature_{index}"),
        });
        let footprint = TileRect::new(
            TileCoord::new(self.position.x, self.position.y),
            self.size.width,
            self.size.height,
        );
        let mut obstacle = Obstacle::new(id, kind, footprint)
            .with_margin(self.margin.unwrap_or(DEFAULT_OBSTACLE_MARGIN_TILES))
            .interactable(
                self.interactable
                    .unwrap_or(kind == ObstacleKind::Building),
            );
        if let Some(name) = self.name {
            obstacle = obstacle.with_name(name);
        }
        if let Some(variant) = self.variant {
            obstacle = obstacle.with_variant(variant);
        }
        if let Some(raw) = self.image_path {
            match normalize_asset_key(&raw) {
                Ok(key) => obstacle = obstacle.with_image(key),
                Err(error) => {
                    tracing::warn!(id = %obstacle.id, image = %raw, %error, "obstacle_image_key_rejected");
                }
            }
        }
        obstacle
    }
}

pub fn parse_map_source(raw: &str, label: &str) -> Result<LoadedMap, MapLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let source = match serde_path_to_error::deserialize::<_, MapSource>(&mut deserializer) {
        Ok(source) => source,
        Err(error) => {
            let path = error.path().to_string();
            let message = error.into_inner().to_string();
            return Err(MapLoadError::Parse { path, message });
        }
    };
    source.into_loaded(label)
}

pub fn load_map_file(path: &Path) -> Result<LoadedMap, MapLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| MapLoadError::ReadFile {
        path: PathBuf::from(path),
        source,
    })?;
    let label = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("map")
        .to_string();
    parse_map_source(&raw, &label)
}

/// Loads `path`, or the built-in generated map when no path is given or the
/// file cannot be used. Never fails.
pub fn load_map_or_default(path: Option<&Path>) -> LoadedMap {
    let Some(path) = path else {
        return generate_default_map();
    };
    match load_map_file(path) {
        Ok(loaded) => {
            tracing::info!(
                map = %loaded.label,
                path = %path.display(),
                width = loaded.map.width(),
                height = loaded.map.height(),
                tile_size = loaded.map.tile_size(),
                obstacles = loaded.obstacles.len(),
                "map_loaded"
            );
            loaded
        }
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                %error,
                "map_load_failed_using_generated_map"
            );
            generate_default_map()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Result<LoadedMap, MapLoadError> {
        parse_map_source(&value.to_string(), "test")
    }

    #[test]
    fn parses_rows_spawns_and_obstacles() {
        let loaded = parse(json!({
            "dimensions": { "width": 3, "height": 2, "tileSize": 16 },
            "tiles": [["grass", "water", "tree"], ["ground", "concrete", "rock"]],
            "spawnPoints": { "player": { "x": 0, "y": 1 } },
            "buildings": [{
                "id": "shop",
                "name": "Pet Shop",
                "position": { "x": 1, "y": 0 },
                "size": { "width": 2, "height": 1 },
                "imagePath": "assets/buildings/shop.png"
            }],
            "naturalFeatures": [{
                "position": { "x": 0, "y": 0 },
                "margin": 0
            }]
        }))
        .expect("parse");

        assert_eq!(loaded.map.tile_size(), 16);
        assert_eq!(loaded.map.tile_at(1, 0), Some(TileKind::Water));
        assert_eq!(loaded.map.tile_at(2, 1), Some(TileKind::Rock));
        assert_eq!(loaded.map.spawn_point("player"), Some(TileCoord::new(0, 1)));

        let shop = &loaded.obstacles[0];
        assert_eq!(shop.kind, ObstacleKind::Building);
        assert_eq!(shop.image_key.as_deref(), Some("buildings/shop.png"));
        assert_eq!(shop.margin_tiles, 1);
        assert!(shop.interactable);

        let feature = &loaded.obstacles[1];
        assert_eq!(feature.id, "feature_0");
        assert_eq!(feature.margin_tiles, 0);
        assert_eq!(feature.footprint.width, 1);
        assert!(!feature.interactable);
    }

    #[test]
    fn short_matrix_is_padded_with_default_tile() {
        let loaded = parse(json!({
            "dimensions": { "width": 4, "height": 3, "tileSize": 32 },
            "tiles": [["water", "water"], ["stone_wall"]]
        }))
        .expect("parse");

        assert_eq!(loaded.map.tile_at(0, 0), Some(TileKind::Water));
        assert_eq!(loaded.map.tile_at(3, 0), Some(DEFAULT_TILE));
        assert_eq!(loaded.map.tile_at(0, 1), Some(TileKind::StoneWall));
        for x in 0..4 {
            assert_eq!(loaded.map.tile_at(x, 2), Some(DEFAULT_TILE));
        }
    }

    #[test]
    fn unknown_tokens_become_default_tile() {
        let loaded = parse(json!({
            "dimensions": { "width": 2, "height": 1 },
            "tiles": [["lava", 0]]
        }))
        .expect("parse");
        assert_eq!(loaded.map.tile_at(0, 0), Some(DEFAULT_TILE));
        assert_eq!(loaded.map.tile_at(1, 0), Some(DEFAULT_TILE));
    }

    #[test]
    fn non_scalar_tokens_keep_the_authored_map() {
        let loaded = parse(json!({
            "dimensions": { "width": 4, "height": 1 },
            "tiles": [["water", null, 1.5, { "kind": "rock" }]]
        }))
        .expect("parse");
        assert_eq!(loaded.map.tile_at(0, 0), Some(TileKind::Water));
        for x in 1..4 {
            assert_eq!(loaded.map.tile_at(x, 0), Some(DEFAULT_TILE));
        }

        let (_, report) = TilesSource::Flat(vec![
            TileToken::Name("water".to_string()),
            TileToken::Other(IgnoredAny),
        ])
        .into_grid(2, 1);
        assert_eq!(report.substituted_tokens, 1);
    }

    #[test]
    fn flat_legacy_ids_are_reshaped_by_width() {
        let loaded = parse(json!({
            "dimensions": { "width": 3, "height": 2, "tile_size": 32 },
            "tiles": [2, 2, 2, 4, 3, 5, 9, 9]
        }))
        .expect("parse");
        assert_eq!(loaded.map.tile_at(2, 0), Some(TileKind::StoneWall));
        assert_eq!(loaded.map.tile_at(0, 1), Some(TileKind::Grass));
        assert_eq!(loaded.map.tile_at(1, 1), Some(TileKind::Water));
        assert_eq!(loaded.map.tile_at(2, 1), Some(TileKind::Tree));
    }

    #[test]
    fn surplus_rows_and_columns_are_dropped() {
        let loaded = parse(json!({
            "dimensions": { "width": 1, "height": 1 },
            "tiles": [["water", "tree"], ["rock"]]
        }))
        .expect("parse");
        assert_eq!(loaded.map.tile_at(0, 0), Some(TileKind::Water));
        assert_eq!(loaded.map.count_tiles(|_| true), 1);
    }

    #[test]
    fn single_spawn_point_maps_to_player() {
        let loaded = parse(json!({
            "dimensions": { "width": 5, "height": 5 },
            "spawn_point": { "x": 2, "y": 3 },
            "entityHints": { "cat": { "x": 4, "y": 4 } }
        }))
        .expect("parse");
        assert_eq!(loaded.map.spawn_point(PLAYER_SPAWN), Some(TileCoord::new(2, 3)));
        assert_eq!(loaded.map.entity_hints()[0].name, "cat");
    }

    #[test]
    fn malformed_source_reports_json_path() {
        let err = parse(json!({
            "dimensions": { "width": "wide", "height": 5 }
        }))
        .expect_err("malformed");
        match err {
            MapLoadError::Parse { path, .. } => assert_eq!(path, "dimensions.width"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let err = parse(json!({ "dimensions": { "width": 0, "height": 5 } })).expect_err("zero");
        assert!(matches!(err, MapLoadError::InvalidDimensions { .. }));
    }

    #[test]
    fn oversized_dimensions_are_rejected_before_allocating() {
        let err = parse(json!({
            "dimensions": { "width": u32::MAX, "height": u32::MAX, "tileSize": 32 },
            "tiles": []
        }))
        .expect_err("huge");
        assert!(matches!(err, MapLoadError::InvalidDimensions { .. }));

        let err = parse(json!({
            "dimensions": { "width": 600, "height": 600, "tileSize": 32 }
        }))
        .expect_err("unrenderable");
        assert!(matches!(err, MapLoadError::TooLargeToRender { .. }));
    }

    #[test]
    fn oversized_file_falls_back_to_generated_map() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("huge.json");
        let body = json!({ "dimensions": { "width": 100_000, "height": 100_000 } });
        fs::write(&path, body.to_string()).expect("write");

        let loaded = load_map_or_default(Some(&path));
        assert_eq!(loaded.map.fingerprint(), generate_default_map().map.fingerprint());
    }

    #[test]
    fn rejected_image_key_keeps_obstacle() {
        let loaded = parse(json!({
            "dimensions": { "width": 5, "height": 5 },
            "buildings": [{ "position": { "x": 1, "y": 1 }, "imagePath": "../escape.png" }]
        }))
        .expect("parse");
        assert_eq!(loaded.obstacles.len(), 1);
        assert_eq!(loaded.obstacles[0].image_key, None);
    }

    #[test]
    fn load_map_file_reads_from_disk() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("tempfile");
        let body = json!({
            "dimensions": { "width": 2, "height": 2 },
            "tiles": [["water", "grass"], ["grass", "grass"]]
        });
        file.write_all(body.to_string().as_bytes()).expect("write");

        let loaded = load_map_file(file.path()).expect("load");
        assert_eq!(loaded.map.tile_at(0, 0), Some(TileKind::Water));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_map_file(&dir.path().join("absent.json")).expect_err("missing");
        assert!(matches!(err, MapLoadError::ReadFile { .. }));
    }

    #[test]
    fn unusable_file_falls_back_to_generated_map() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").expect("write");

        let loaded = load_map_or_default(Some(&path));
        let fallback = generate_default_map();
        assert_eq!(loaded.map.fingerprint(), fallback.map.fingerprint());
        assert_eq!(loaded.label, fallback.label);
    }

    #[test]
    fn bundled_town_map_parses() {
        let raw = include_str!("../../../../assets/maps/town.json");
        let loaded = parse_map_source(raw, "town").expect("town map");
        assert_eq!((loaded.map.width(), loaded.map.height()), (30, 22));
        assert_eq!(loaded.map.tile_size(), 32);
        assert_eq!(loaded.map.spawn_point(PLAYER_SPAWN), Some(TileCoord::new(14, 12)));
        assert_eq!(loaded.map.entity_hints().len(), 3);
        assert_eq!(loaded.obstacles.len(), 5);

        let pet_shop = &loaded.obstacles[0];
        assert_eq!(pet_shop.image_key.as_deref(), Some("buildings/pet_shop.png"));
        assert!(pet_shop.interactable);
        let oak = loaded
            .obstacles
            .iter()
            .find(|obstacle| obstacle.id == "old_oak")
            .expect("oak");
        assert!(!oak.interactable);
        assert_eq!(
            loaded.obstacles.iter().find(|o| o.id == "house_1").map(|o| o.margin_tiles),
            Some(0)
        );
    }
}
