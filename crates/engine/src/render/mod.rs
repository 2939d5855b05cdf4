mod map_renderer;
mod sprites;
mod surface;

pub use map_renderer::{CompositeStats, MapRenderer, CLEAR_COLOR};
pub use sprites::{LoadedSprite, SpriteCache};
pub use surface::{Surface, SurfaceError, MAX_SURFACE_DIMENSION_PX};

pub(crate) use surface::draw_square;
