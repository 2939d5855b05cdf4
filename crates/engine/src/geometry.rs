use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle in world pixels. `x`/`y` is the top-left corner and
/// the y axis grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centered_at(center: Vec2, size: Vec2) -> Self {
        Self {
            x: center.x - size.x * 0.5,
            y: center.y - size.y * 0.5,
            width: size.x,
            height: size.y,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.x + self.width * 0.5,
            y: self.y + self.height * 0.5,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Half-open containment: the left/top edges are inside, right/bottom are not.
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// True when the rectangles share interior area. Rectangles that only touch
    /// along an edge do not intersect. A degenerate (zero-size) rect intersects
    /// when it lies strictly inside `other`.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn inset(&self, amount: f32) -> Rect {
        Rect {
            x: self.x + amount,
            y: self.y + amount,
            width: (self.width - 2.0 * amount).max(0.0),
            height: (self.height - 2.0 * amount).max(0.0),
        }
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if left >= right || top >= bottom {
            return None;
        }
        Some(Rect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Rectangle in tile units (origin + size). Used for obstacle footprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRect {
    pub origin: TileCoord,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    pub const fn new(origin: TileCoord, width: u32, height: u32) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        let left = self.origin.x as i64;
        let top = self.origin.y as i64;
        x >= left && x < left + self.width as i64 && y >= top && y < top + self.height as i64
    }

    pub fn to_world(&self, tile_size: u32) -> Rect {
        let size = tile_size as f32;
        Rect {
            x: self.origin.x as f32 * size,
            y: self.origin.y as f32 * size,
            width: self.width as f32 * size,
            height: self.height as f32 * size,
        }
    }

    /// World rect grown by `margin_tiles` on every side.
    pub fn to_world_expanded(&self, tile_size: u32, margin_tiles: u32) -> Rect {
        let size = tile_size as f32;
        let margin = margin_tiles as f32 * size;
        let base = self.to_world(tile_size);
        Rect {
            x: base.x - margin,
            y: base.y - margin,
            width: base.width + 2.0 * margin,
            height: base.height + 2.0 * margin,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(9.5, 9.5, 1.0, 1.0)));
    }

    #[test]
    fn degenerate_rect_inside_intersects() {
        let region = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(Rect::new(5.0, 5.0, 0.0, 0.0).intersects(&region));
        assert!(!Rect::new(10.0, 5.0, 0.0, 0.0).intersects(&region));
    }

    #[test]
    fn contains_point_is_half_open() {
        let rect = Rect::new(0.0, 0.0, 32.0, 32.0);
        assert!(rect.contains_point(Vec2::new(0.0, 0.0)));
        assert!(rect.contains_point(Vec2::new(31.9, 31.9)));
        assert!(!rect.contains_point(Vec2::new(32.0, 0.0)));
    }

    #[test]
    fn expanded_tile_rect_grows_by_margin_on_all_sides() {
        let footprint = TileRect::new(TileCoord::new(2, 3), 4, 2);
        let expanded = footprint.to_world_expanded(32, 1);
        assert_eq!(expanded, Rect::new(32.0, 64.0, 192.0, 128.0));
    }

    #[test]
    fn intersection_clips_to_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(80.0, 20.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(80.0, 20.0, 20.0, 30.0)));
        assert_eq!(a.intersection(&Rect::new(200.0, 0.0, 5.0, 5.0)), None);
    }
}
