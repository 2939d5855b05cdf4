use crate::camera::Camera;
use crate::map::MapData;
use crate::obstacles::ObstacleIndex;

use super::sprites::SpriteCache;
use super::surface::{fill_rect_clipped, Surface, SurfaceError};

pub const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const OBSTACLE_OUTLINE_COLOR: [u8; 4] = [40, 30, 25, 255];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeStats {
    pub tile_sprites: usize,
    pub tile_fallbacks: usize,
    pub obstacle_sprites: usize,
    pub obstacle_fallbacks: usize,
}

/// Static map imagery composited once per map load into a map-sized surface.
/// Per-frame drawing only copies the camera window out of it.
#[derive(Debug, Default)]
pub struct MapRenderer {
    surface: Option<Surface>,
    map_fingerprint: u64,
    obstacle_fingerprint: u64,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn is_current(&self, map: &MapData, obstacles: &ObstacleIndex) -> bool {
        self.surface.is_some()
            && self.map_fingerprint == map.fingerprint()
            && self.obstacle_fingerprint == obstacles.fingerprint()
    }

    pub fn build_surface(
        &mut self,
        map: &MapData,
        obstacles: &ObstacleIndex,
        sprites: &mut SpriteCache,
    ) -> Result<CompositeStats, SurfaceError> {
        let (width_px, height_px) = map.get_map_size();
        let mut surface = Surface::new(width_px, height_px)?;
        let mut stats = CompositeStats::default();
        let tile_size = map.tile_size();

        for (tile, kind) in map.iter_tiles() {
            let info = kind.info();
            let left = (tile.x * tile_size) as i32;
            let top = (tile.y * tile_size) as i32;
            match sprites.get(info.sprite_key) {
                Some(sprite) => {
                    surface.draw_sprite_stretched(sprite, left, top, tile_size, tile_size);
                    stats.tile_sprites += 1;
                }
                None => {
                    surface.fill_rect(left, top, tile_size, tile_size, info.fallback_color);
                    stats.tile_fallbacks += 1;
                }
            }
        }

        for obstacle in obstacles.obstacles() {
            let rect = obstacle.footprint.to_world(tile_size);
            let left = rect.x as i32;
            let top = rect.y as i32;
            let width = rect.width as u32;
            let height = rect.height as u32;
            let sprite = obstacle
                .image_key
                .as_deref()
                .and_then(|key| sprites.get(key));
            match sprite {
                Some(sprite) => {
                    surface.draw_sprite_stretched(sprite, left, top, width, height);
                    stats.obstacle_sprites += 1;
                }
                None => {
                    surface.fill_rect(left, top, width, height, obstacle.kind.fallback_color());
                    surface.draw_rect_outline(left, top, width, height, OBSTACLE_OUTLINE_COLOR);
                    stats.obstacle_fallbacks += 1;
                }
            }
        }

        tracing::info!(
            width_px,
            height_px,
            tile_sprites = stats.tile_sprites,
            tile_fallbacks = stats.tile_fallbacks,
            obstacle_sprites = stats.obstacle_sprites,
            obstacle_fallbacks = stats.obstacle_fallbacks,
            "map_surface_built"
        );
        self.surface = Some(surface);
        self.map_fingerprint = map.fingerprint();
        self.obstacle_fingerprint = obstacles.fingerprint();
        Ok(stats)
    }

    /// Copies the camera-visible window of the composited map into `frame`.
    /// Frame pixels outside the map are cleared; nothing wraps.
    pub fn draw(&self, frame: &mut [u8], frame_width: u32, frame_height: u32, camera: &Camera) {
        fill_rect_clipped(
            frame,
            frame_width,
            frame_height,
            0,
            0,
            frame_width,
            frame_height,
            CLEAR_COLOR,
        );
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        let origin = camera.position();
        let offset_x = origin.x.floor() as i64;
        let offset_y = origin.y.floor() as i64;

        // Overlap of [offset, offset + frame) with [0, surface) per axis.
        let src_left = offset_x.max(0);
        let src_top = offset_y.max(0);
        let src_right = (offset_x + frame_width as i64).min(surface.width() as i64);
        let src_bottom = (offset_y + frame_height as i64).min(surface.height() as i64);
        if src_left >= src_right || src_top >= src_bottom {
            return;
        }

        let span_bytes = (src_right - src_left) as usize * 4;
        let source = surface.as_rgba();
        let surface_stride = surface.width() as usize * 4;
        let frame_stride = frame_width as usize * 4;
        for src_y in src_top..src_bottom {
            let dst_y = (src_y - offset_y) as usize;
            let dst_x = (src_left - offset_x) as usize;
            let src_start = src_y as usize * surface_stride + src_left as usize * 4;
            let dst_start = dst_y * frame_stride + dst_x * 4;
            let (Some(src), Some(dst)) = (
                source.get(src_start..src_start + span_bytes),
                frame.get_mut(dst_start..dst_start + span_bytes),
            ) else {
                return;
            };
            dst.copy_from_slice(src);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraConfig, FollowMode};
    use crate::map::TileKind;
    use crate::obstacles::{Obstacle, ObstacleKind};
    use crate::render::sprites::LoadedSprite;
    use std::path::PathBuf;

    fn offline_sprites() -> SpriteCache {
        SpriteCache::new(PathBuf::from("/nonexistent/assets"))
    }

    fn small_map() -> MapData {
        let mut tiles = vec![TileKind::Grass; 16];
        tiles[5] = TileKind::Water;
        MapData::new(4, 4, 8, tiles).expect("map")
    }

    fn frame_pixel(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * width as usize + x as usize) * 4;
        [frame[offset], frame[offset + 1], frame[offset + 2], frame[offset + 3]]
    }

    #[test]
    fn composites_tiles_then_obstacles() {
        let map = small_map();
        let obstacles =
            ObstacleIndex::with_obstacles(8, vec![Obstacle::building("hut", 2, 2, 2, 2)]);
        let mut renderer = MapRenderer::new();
        let stats = renderer
            .build_surface(&map, &obstacles, &mut offline_sprites())
            .expect("surface");

        assert_eq!(stats.tile_fallbacks, 16);
        assert_eq!(stats.obstacle_fallbacks, 1);
        let surface = renderer.surface().expect("surface");
        assert_eq!((surface.width(), surface.height()), (32, 32));
        assert_eq!(surface.pixel(0, 0), Some(TileKind::Grass.info().fallback_color));
        assert_eq!(surface.pixel(12, 12), Some(TileKind::Water.info().fallback_color));
        assert_eq!(surface.pixel(20, 20), Some(ObstacleKind::Building.fallback_color()));
        assert!(renderer.is_current(&map, &obstacles));
    }

    #[test]
    fn obstacle_sprite_is_scaled_to_footprint() {
        let map = small_map();
        let obstacles = ObstacleIndex::with_obstacles(
            8,
            vec![Obstacle::building("hut", 1, 1, 2, 1)
                .with_margin(0)
                .with_image("buildings/hut.png")],
        );
        let mut sprites = offline_sprites();
        sprites.insert(
            "buildings/hut.png",
            LoadedSprite {
                width: 1,
                height: 1,
                rgba: vec![200, 100, 50, 255],
            },
        );
        let mut renderer = MapRenderer::new();
        let stats = renderer
            .build_surface(&map, &obstacles, &mut sprites)
            .expect("surface");
        assert_eq!(stats.obstacle_sprites, 1);
        let surface = renderer.surface().expect("surface");
        assert_eq!(surface.pixel(8, 8), Some([200, 100, 50, 255]));
        assert_eq!(surface.pixel(23, 15), Some([200, 100, 50, 255]));
        assert_ne!(surface.pixel(24, 8), Some([200, 100, 50, 255]));
        assert_ne!(surface.pixel(8, 16), Some([200, 100, 50, 255]));
    }

    #[test]
    fn draw_blits_camera_window() {
        let map = small_map();
        let obstacles = ObstacleIndex::new(8);
        let mut renderer = MapRenderer::new();
        renderer
            .build_surface(&map, &obstacles, &mut offline_sprites())
            .expect("surface");
        let mut camera = Camera::for_map(
            CameraConfig {
                viewport_width: 16,
                viewport_height: 16,
                follow: FollowMode::default(),
            },
            &map,
        );
        camera.set_target(12.0, 12.0);
        camera.snap_to_target();
        assert_eq!(camera.position().x, 4.0);

        let mut frame = vec![0u8; 16 * 16 * 4];
        renderer.draw(&mut frame, 16, 16, &camera);
        // Map pixel (12, 12) is water and lands on frame pixel (8, 8).
        assert_eq!(frame_pixel(&frame, 16, 8, 8), TileKind::Water.info().fallback_color);
        assert_eq!(frame_pixel(&frame, 16, 0, 0), TileKind::Grass.info().fallback_color);
    }

    #[test]
    fn draw_clears_outside_small_map() {
        let map = small_map();
        let obstacles = ObstacleIndex::new(8);
        let mut renderer = MapRenderer::new();
        renderer
            .build_surface(&map, &obstacles, &mut offline_sprites())
            .expect("surface");
        let camera = Camera::for_map(CameraConfig::default(), &map);

        let mut frame = vec![0u8; 40 * 40 * 4];
        renderer.draw(&mut frame, 40, 40, &camera);
        assert_eq!(frame_pixel(&frame, 40, 31, 31), TileKind::Grass.info().fallback_color);
        assert_eq!(frame_pixel(&frame, 40, 32, 0), CLEAR_COLOR);
        assert_eq!(frame_pixel(&frame, 40, 0, 39), CLEAR_COLOR);
    }

    #[test]
    fn draw_without_surface_only_clears() {
        let renderer = MapRenderer::new();
        let map = small_map();
        let camera = Camera::for_map(CameraConfig::default(), &map);
        let mut frame = vec![7u8; 4 * 4 * 4];
        renderer.draw(&mut frame, 4, 4, &camera);
        assert_eq!(frame_pixel(&frame, 4, 3, 3), CLEAR_COLOR);
    }
}
