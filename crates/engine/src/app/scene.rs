use crate::context::MapContext;
use crate::geometry::Vec2;

use super::InputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// A coloured square drawn over the map at a world position. Scenes use
/// these for the player, pets and anything else that is not baked into the
/// map surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub position: Vec2,
    pub half_size: i32,
    pub color: [u8; 4],
}

impl Marker {
    pub fn new(position: Vec2, half_size: i32, color: [u8; 4]) -> Self {
        Self {
            position,
            half_size,
            color,
        }
    }
}

pub trait Scene {
    fn load(&mut self, context: &mut MapContext);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        context: &mut MapContext,
    ) -> SceneCommand;
    fn markers(&self) -> Vec<Marker>;
    fn unload(&mut self, _context: &mut MapContext) {}
    fn debug_title(&self, _context: &MapContext) -> Option<String> {
        None
    }
}
