use std::path::{Path, PathBuf};

use crate::app::Marker;
use crate::camera::{Camera, CameraConfig};
use crate::collision::CollisionQuery;
use crate::geometry::{Rect, Vec2};
use crate::map::{load_map_or_default, LoadedMap, MapData, PLAYER_SPAWN};
use crate::obstacles::{Obstacle, ObstacleIndex};
use crate::placement::{PlacementBatch, PlacementPlanner, PlacementRequest};
use crate::render::{CompositeStats, MapRenderer, SpriteCache, Surface, SurfaceError};

/// Everything the spatial side of a scene needs: the current map, its
/// obstacles, the camera, the placement planner and the pre-composited map
/// image. Built once and handed to scenes by reference.
#[derive(Debug)]
pub struct MapContext {
    label: String,
    map: MapData,
    obstacles: ObstacleIndex,
    camera: Camera,
    planner: PlacementPlanner,
    renderer: MapRenderer,
    sprites: SpriteCache,
}

impl MapContext {
    pub fn new(
        loaded: LoadedMap,
        camera_config: CameraConfig,
        seed: u64,
        asset_root: PathBuf,
    ) -> Self {
        let LoadedMap {
            label,
            map,
            obstacles,
        } = loaded;
        let camera = Camera::for_map(camera_config, &map);
        let mut context = Self {
            label,
            obstacles: ObstacleIndex::with_obstacles(map.tile_size(), obstacles),
            map,
            camera,
            planner: PlacementPlanner::new(seed),
            renderer: MapRenderer::new(),
            sprites: SpriteCache::new(asset_root),
        };
        context.focus_camera_on_spawn();
        tracing::info!(
            map = %context.label,
            width = context.map.width(),
            height = context.map.height(),
            tile_size = context.map.tile_size(),
            obstacles = context.obstacles.len(),
            seed,
            "map_context_ready"
        );
        context
    }

    /// Loads `map_path`, falling back to the generated map when it is absent
    /// or unusable.
    pub fn from_path(
        map_path: Option<&Path>,
        camera_config: CameraConfig,
        seed: u64,
        asset_root: PathBuf,
    ) -> Self {
        Self::new(load_map_or_default(map_path), camera_config, seed, asset_root)
    }

    /// Replaces map and obstacles wholesale. The composited surface is
    /// dropped and the gap cache rebuilds on the next placement.
    pub fn switch_map(&mut self, loaded: LoadedMap) {
        let LoadedMap {
            label,
            map,
            obstacles,
        } = loaded;
        self.obstacles = ObstacleIndex::with_obstacles(map.tile_size(), obstacles);
        self.camera.set_map_size(map.pixel_width(), map.pixel_height());
        self.map = map;
        self.label = label;
        self.renderer = MapRenderer::new();
        self.focus_camera_on_spawn();
        tracing::info!(
            map = %self.label,
            width = self.map.width(),
            height = self.map.height(),
            obstacles = self.obstacles.len(),
            "map_switched"
        );
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    pub fn obstacles(&self) -> &ObstacleIndex {
        &self.obstacles
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn collision(&self) -> CollisionQuery<'_> {
        CollisionQuery::new(&self.map, &self.obstacles)
    }

    pub fn is_walkable(&self, world_x: f32, world_y: f32) -> bool {
        self.collision().is_walkable(world_x, world_y)
    }

    pub fn check_collision(&self, rect: &Rect) -> bool {
        self.collision().check_collision(rect)
    }

    /// Spawn point centred in its tile, in world pixels.
    pub fn get_spawn_point(&self, name: &str) -> Option<Vec2> {
        self.map.spawn_point_world(name)
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.camera.world_to_screen(world)
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        self.camera.screen_to_world(screen)
    }

    pub fn follow(&mut self, focus: Vec2, dt_seconds: f32) {
        self.camera.set_target(focus.x, focus.y);
        self.camera.update(dt_seconds);
    }

    pub fn interactable_near(&self, world: Vec2, radius_tiles: u32) -> Vec<&Obstacle> {
        let size = self.map.tile_size() as f32;
        let tile_x = (world.x / size).floor() as i64;
        let tile_y = (world.y / size).floor() as i64;
        self.obstacles.interactable_near(tile_x, tile_y, radius_tiles)
    }

    /// Request with map-scaled defaults and the map's entity hints as
    /// preferred positions.
    pub fn placement_request(&self, count: usize) -> PlacementRequest {
        let hints = self
            .map
            .entity_hints()
            .iter()
            .map(|hint| self.map.tile_center_world(hint.tile))
            .collect();
        PlacementRequest::for_map(&self.map, count).with_hints(hints)
    }

    pub fn place_entities(&mut self, request: &PlacementRequest) -> PlacementBatch {
        let query = CollisionQuery::new(&self.map, &self.obstacles);
        self.planner.place_entities(&query, request)
    }

    pub fn reseed(&mut self, seed: u64) {
        self.planner.reseed(seed);
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.renderer.surface()
    }

    pub fn ensure_surface(&mut self) -> Result<Option<CompositeStats>, SurfaceError> {
        if self.renderer.is_current(&self.map, &self.obstacles) {
            return Ok(None);
        }
        self.renderer
            .build_surface(&self.map, &self.obstacles, &mut self.sprites)
            .map(Some)
    }

    pub fn draw_map(&self, frame: &mut [u8], frame_width: u32, frame_height: u32) {
        self.renderer
            .draw(frame, frame_width, frame_height, &self.camera);
    }

    /// Full-map copy of the composited surface with `markers` drawn at their
    /// world positions. Surface pixels are world pixels, so no camera applies.
    pub fn snapshot(&mut self, markers: &[Marker]) -> Result<Surface, SurfaceError> {
        self.ensure_surface()?;
        let mut surface = match self.renderer.surface() {
            Some(surface) => surface.clone(),
            None => {
                let (width, height) = self.map.get_map_size();
                Surface::new(width, height)?
            }
        };
        for marker in markers {
            surface.draw_square(
                marker.position.x.round() as i32,
                marker.position.y.round() as i32,
                marker.half_size,
                marker.color,
            );
        }
        Ok(surface)
    }

    fn focus_camera_on_spawn(&mut self) {
        let focus = self
            .map
            .spawn_point_world(PLAYER_SPAWN)
            .unwrap_or_else(|| self.map.bounds().center());
        self.camera.set_target(focus.x, focus.y);
        self.camera.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FollowMode;
    use crate::geometry::TileCoord;
    use crate::map::{generate_default_map, TileKind};

    fn context_for(loaded: LoadedMap) -> MapContext {
        MapContext::new(
            loaded,
            CameraConfig {
                viewport_width: 320,
                viewport_height: 240,
                follow: FollowMode::default(),
            },
            4,
            PathBuf::from("/nonexistent/assets"),
        )
    }

    #[test]
    fn camera_starts_centred_on_player_spawn() {
        let context = context_for(generate_default_map());
        let spawn = context.get_spawn_point(PLAYER_SPAWN).expect("spawn");
        let screen = context.world_to_screen(spawn);
        assert!((screen.x - 160.0).abs() < 1e-3);
        assert!((screen.y - 120.0).abs() < 1e-3);
    }

    #[test]
    fn switch_map_replaces_everything() {
        let mut context = context_for(generate_default_map());
        let small = MapData::filled(5, 5, 32, TileKind::Water)
            .expect("map")
            .with_spawn_point(PLAYER_SPAWN, TileCoord::new(1, 1));
        context.switch_map(LoadedMap {
            label: "flooded".to_string(),
            map: small,
            obstacles: Vec::new(),
        });
        assert_eq!(context.label(), "flooded");
        assert!(context.obstacles().is_empty());
        assert!(!context.is_walkable(40.0, 40.0));
        assert_eq!(context.camera().position(), Vec2::ZERO);
        assert!(context.surface().is_none());
    }

    #[test]
    fn placements_on_default_map_are_valid() {
        let mut context = context_for(generate_default_map());
        let request = context.placement_request(5);
        assert_eq!(request.hints.len(), 2);
        let batch = context.place_entities(&request);
        assert!(batch.placed.len() <= 5);
        for placement in &batch.placed {
            assert!(context.is_walkable(placement.position.x, placement.position.y));
            assert!(!context.check_collision(&request.entity_rect(placement.position)));
        }
    }

    #[test]
    fn surface_is_built_once_per_map() {
        let mut context = context_for(generate_default_map());
        let stats = context.ensure_surface().expect("surface");
        assert!(stats.is_some());
        assert!(context.ensure_surface().expect("surface").is_none());
        let surface = context.surface().expect("surface");
        assert_eq!((surface.width(), surface.height()), (800, 640));
    }

    #[test]
    fn snapshot_draws_markers_in_world_pixels() {
        let mut context = context_for(generate_default_map());
        let marker = Marker::new(Vec2::new(400.0, 300.0), 2, [255, 0, 255, 255]);
        let surface = context.snapshot(&[marker]).expect("snapshot");
        assert_eq!((surface.width(), surface.height()), (800, 640));
        assert_eq!(surface.pixel(400, 300), Some([255, 0, 255, 255]));
        assert_eq!(surface.pixel(402, 302), Some([255, 0, 255, 255]));
        assert_ne!(surface.pixel(404, 300), Some([255, 0, 255, 255]));
        assert!(context.surface().is_some());
    }

    #[test]
    fn interactable_lookup_uses_world_position() {
        let context = context_for(generate_default_map());
        // Pet shop occupies tiles (3..6, 2..4); tile (4, 4) is directly below it.
        let near = context.interactable_near(Vec2::new(4.5 * 32.0, 4.5 * 32.0), 1);
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].id, "pet_shop");
    }

    #[test]
    fn widest_loadable_map_composites() {
        let tile_size = 16;
        let width = crate::render::MAX_SURFACE_DIMENSION_PX / tile_size;
        let strip = MapData::filled(width, 1, tile_size, TileKind::Grass).expect("map");
        let mut context = context_for(LoadedMap {
            label: "strip".to_string(),
            map: strip,
            obstacles: Vec::new(),
        });
        context.ensure_surface().expect("composite");
        let surface = context.surface().expect("surface");
        assert_eq!(
            (surface.width(), surface.height()),
            (crate::render::MAX_SURFACE_DIMENSION_PX, tile_size)
        );

        assert!(MapData::filled(width + 1, 1, tile_size, TileKind::Grass).is_err());
    }
}
