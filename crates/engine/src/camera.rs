use crate::geometry::{Rect, Vec2};
use crate::map::MapData;

pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 720;
pub const DEFAULT_FOLLOW_GAIN: f32 = 0.1;
pub const DEFAULT_FOLLOW_RATE: f32 = 5.0;

/// How the camera closes the distance to its target on each `update`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FollowMode {
    /// Moves a fixed fraction of the remaining distance per update call,
    /// regardless of elapsed time. Feel depends on frame rate.
    PerCall { gain: f32 },
    /// Moves `1 - exp(-rate * dt)` of the remaining distance, giving the same
    /// trajectory at any frame rate.
    TimeScaled { rate: f32 },
}

impl Default for FollowMode {
    fn default() -> Self {
        FollowMode::PerCall {
            gain: DEFAULT_FOLLOW_GAIN,
        }
    }
}

impl FollowMode {
    fn blend_factor(self, dt_seconds: f32) -> f32 {
        match self {
            FollowMode::PerCall { gain } => gain.clamp(0.0, 1.0),
            FollowMode::TimeScaled { rate } => {
                if !dt_seconds.is_finite() || dt_seconds <= 0.0 || !rate.is_finite() {
                    return 0.0;
                }
                (1.0 - (-rate.max(0.0) * dt_seconds).exp()).clamp(0.0, 1.0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub follow: FollowMode,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            follow: FollowMode::default(),
        }
    }
}

/// Inclusive-exclusive tile ranges covered by the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileRange {
    pub fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    pub fn tile_count(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        (self.max_x - self.min_x) as u64 * (self.max_y - self.min_y) as u64
    }
}

/// Top-left anchored camera in world pixels. Position is clamped to
/// `[0, map - viewport]` per axis after every mutation, pinned to 0 on an axis
/// where the map is smaller than the viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec2,
    /// World point the viewport centre follows.
    focus: Vec2,
    viewport: Vec2,
    map_size: Vec2,
    follow: FollowMode,
}

impl Camera {
    pub fn new(config: CameraConfig, map_width_px: f32, map_height_px: f32) -> Self {
        let viewport = Vec2::new(config.viewport_width as f32, config.viewport_height as f32);
        let mut camera = Self {
            position: Vec2::ZERO,
            focus: Vec2::new(viewport.x * 0.5, viewport.y * 0.5),
            viewport,
            map_size: Vec2::new(map_width_px.max(0.0), map_height_px.max(0.0)),
            follow: config.follow,
        };
        camera.clamp();
        camera
    }

    pub fn for_map(config: CameraConfig, map: &MapData) -> Self {
        Self::new(config, map.pixel_width(), map.pixel_height())
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Unclamped top-left position that centres the viewport on the focus.
    pub fn target(&self) -> Vec2 {
        Vec2::new(
            self.focus.x - self.viewport.x * 0.5,
            self.focus.y - self.viewport.y * 0.5,
        )
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn follow_mode(&self) -> FollowMode {
        self.follow
    }

    pub fn set_follow_mode(&mut self, follow: FollowMode) {
        self.follow = follow;
    }

    pub fn max_position(&self) -> Vec2 {
        Vec2::new(
            (self.map_size.x - self.viewport.x).max(0.0),
            (self.map_size.y - self.viewport.y).max(0.0),
        )
    }

    /// Focus the viewport centre on a world point. Takes effect through
    /// `update` or `snap_to_target`.
    pub fn set_target(&mut self, focus_x: f32, focus_y: f32) {
        if !focus_x.is_finite() || !focus_y.is_finite() {
            return;
        }
        self.focus = Vec2::new(focus_x, focus_y);
    }

    pub fn update(&mut self, dt_seconds: f32) {
        let factor = self.follow.blend_factor(dt_seconds);
        let target = self.target();
        self.position.x += (target.x - self.position.x) * factor;
        self.position.y += (target.y - self.position.y) * factor;
        self.clamp();
    }

    pub fn snap_to_target(&mut self) {
        self.position = self.target();
        self.clamp();
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width as f32, height as f32);
        self.clamp();
    }

    /// Used on map switch; the current target is kept and re-clamped.
    pub fn set_map_size(&mut self, map_width_px: f32, map_height_px: f32) {
        self.map_size = Vec2::new(map_width_px.max(0.0), map_height_px.max(0.0));
        self.clamp();
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        Vec2::new(world.x - self.position.x, world.y - self.position.y)
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        Vec2::new(screen.x + self.position.x, screen.y + self.position.y)
    }

    pub fn view_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.viewport.x,
            self.viewport.y,
        )
    }

    pub fn visible_tile_range(&self, map: &MapData) -> TileRange {
        let size = map.tile_size() as f32;
        let view = self.view_rect();
        let min_x = (view.x / size).floor().max(0.0) as u32;
        let min_y = (view.y / size).floor().max(0.0) as u32;
        let max_x = ((view.right() / size).ceil().max(0.0) as u32).min(map.width());
        let max_y = ((view.bottom() / size).ceil().max(0.0) as u32).min(map.height());
        TileRange {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x,
            max_y,
        }
    }

    fn clamp(&mut self) {
        let max = self.max_position();
        if !self.position.is_finite() {
            self.position = Vec2::ZERO;
        }
        self.position.x = self.position.x.clamp(0.0, max.x);
        self.position.y = self.position.y.clamp(0.0, max.y);
    }
}
