use crate::geometry::{Rect, TileCoord, Vec2};
use crate::map::MapData;
use crate::obstacles::ObstacleIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollisionKind {
    OutOfBounds,
    BlockedTile(TileCoord),
    Obstacle(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    pub start: Rect,
    pub rect: Rect,
    pub blocked_x: bool,
    pub blocked_y: bool,
}

impl MoveOutcome {
    pub fn moved(&self) -> bool {
        self.rect != self.start
    }
}

/// Read-only collision view over the current map and its obstacles.
///
/// `check_collision` samples only the four corners of the query rect against
/// the tile grid. A non-walkable tile that fits strictly between two corners
/// (a rect wider than one tile straddling a single blocker) is not detected;
/// obstacle footprints are tested by full overlap and have no such gap.
#[derive(Debug, Clone, Copy)]
pub struct CollisionQuery<'a> {
    map: &'a MapData,
    obstacles: &'a ObstacleIndex,
}

impl<'a> CollisionQuery<'a> {
    pub fn new(map: &'a MapData, obstacles: &'a ObstacleIndex) -> Self {
        Self { map, obstacles }
    }

    pub fn map(&self) -> &'a MapData {
        self.map
    }

    pub fn obstacles(&self) -> &'a ObstacleIndex {
        self.obstacles
    }

    /// False outside the map, on non-walkable tiles and inside obstacle
    /// footprints (margins excluded).
    pub fn is_walkable(&self, world_x: f32, world_y: f32) -> bool {
        let Some(kind) = self.map.get_tile(world_x, world_y) else {
            return false;
        };
        kind.is_walkable() && !self.obstacles.contains_point(Vec2::new(world_x, world_y))
    }

    pub fn is_tile_walkable(&self, tile: TileCoord) -> bool {
        self.map
            .tile_at(tile.x, tile.y)
            .is_some_and(|kind| kind.is_walkable())
    }

    pub fn check_collision(&self, rect: &Rect) -> bool {
        self.collision_kind(rect).is_some()
    }

    pub fn collision_kind(&self, rect: &Rect) -> Option<CollisionKind> {
        if !self.inside_map(rect) {
            return Some(CollisionKind::OutOfBounds);
        }
        for corner in sample_corners(rect) {
            match self.map.world_to_tile(corner) {
                Some(tile) if self.is_tile_walkable(tile) => {}
                Some(tile) => return Some(CollisionKind::BlockedTile(tile)),
                None => return Some(CollisionKind::OutOfBounds),
            }
        }
        self.obstacles
            .first_hit(rect)
            .map(|obstacle| CollisionKind::Obstacle(obstacle.id.clone()))
    }

    /// Applies `dx` then `dy`, dropping each axis whose destination collides.
    /// Lets an entity slide along a wall instead of stopping dead.
    pub fn resolve_move(&self, rect: &Rect, dx: f32, dy: f32) -> MoveOutcome {
        let mut current = *rect;
        let mut blocked_x = false;
        let mut blocked_y = false;
        if dx != 0.0 {
            let candidate = Rect { x: current.x + dx, ..current };
            if self.check_collision(&candidate) {
                blocked_x = true;
            } else {
                current = candidate;
            }
        }
        if dy != 0.0 {
            let candidate = Rect { y: current.y + dy, ..current };
            if self.check_collision(&candidate) {
                blocked_y = true;
            } else {
                current = candidate;
            }
        }
        MoveOutcome {
            start: *rect,
            rect: current,
            blocked_x,
            blocked_y,
        }
    }

    fn inside_map(&self, rect: &Rect) -> bool {
        let finite = rect.x.is_finite()
            && rect.y.is_finite()
            && rect.width.is_finite()
            && rect.height.is_finite();
        finite
            && rect.width >= 0.0
            && rect.height >= 0.0
            && rect.x >= 0.0
            && rect.y >= 0.0
            && rect.right() <= self.map.pixel_width()
            && rect.bottom() <= self.map.pixel_height()
    }
}

/// Corners of `rect` in pixel-inclusive terms: the far edge is sampled one
/// pixel in so a rect exactly one tile wide stays within that tile.
fn sample_corners(rect: &Rect) -> [Vec2; 4] {
    let left = rect.x;
    let top = rect.y;
    let right = rect.x + (rect.width - 1.0).max(0.0);
    let bottom = rect.y + (rect.height - 1.0).max(0.0);
    [
        Vec2::new(left, top),
        Vec2::new(right, top),
        Vec2::new(left, bottom),
        Vec2::new(right, bottom),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TileKind;
    use crate::obstacles::Obstacle;

    fn map_with(blocked: &[(u32, u32, TileKind)]) -> MapData {
        let mut tiles = vec![TileKind::Grass; 100];
        for (x, y, kind) in blocked {
            tiles[(*y * 10 + *x) as usize] = *kind;
        }
        MapData::new(10, 10, 32, tiles).expect("map")
    }

    #[test]
    fn non_walkable_tile_blocks_every_point_inside_it() {
        let map = map_with(&[(2, 2, TileKind::Water), (5, 1, TileKind::StoneWall)]);
        let obstacles = ObstacleIndex::new(32);
        let query = CollisionQuery::new(&map, &obstacles);
        for (tx, ty) in [(2u32, 2u32), (5, 1)] {
            for sy in 0..8 {
                for sx in 0..8 {
                    let x = tx as f32 * 32.0 + sx as f32 * 4.0 + 0.5;
                    let y = ty as f32 * 32.0 + sy as f32 * 4.0 + 0.5;
                    assert!(!query.is_walkable(x, y), "({x}, {y}) should be blocked");
                }
            }
        }
        assert!(query.is_walkable(96.5, 64.5));
    }

    #[test]
    fn outside_map_is_not_walkable() {
        let map = map_with(&[]);
        let obstacles = ObstacleIndex::new(32);
        let query = CollisionQuery::new(&map, &obstacles);
        assert!(!query.is_walkable(-1.0, 10.0));
        assert!(!query.is_walkable(320.0, 10.0));
        assert!(!query.is_walkable(10.0, 320.0));
    }

    #[test]
    fn is_walkable_excludes_obstacle_footprint() {
        let map = map_with(&[]);
        let obstacles =
            ObstacleIndex::with_obstacles(32, vec![Obstacle::building("shed", 4, 4, 2, 2)]);
        let query = CollisionQuery::new(&map, &obstacles);
        assert!(!query.is_walkable(150.0, 150.0));
        assert!(query.is_walkable(110.0, 150.0));
    }

    #[test]
    fn rect_crossing_map_edge_collides() {
        let map = map_with(&[]);
        let obstacles = ObstacleIndex::new(32);
        let query = CollisionQuery::new(&map, &obstacles);
        assert_eq!(
            query.collision_kind(&Rect::new(-1.0, 10.0, 16.0, 16.0)),
            Some(CollisionKind::OutOfBounds)
        );
        assert!(query.check_collision(&Rect::new(310.0, 10.0, 16.0, 16.0)));
        assert!(!query.check_collision(&Rect::new(304.0, 304.0, 16.0, 16.0)));
        assert!(query.check_collision(&Rect::new(f32::NAN, 10.0, 16.0, 16.0)));
    }

    #[test]
    fn corner_on_blocked_tile_collides() {
        let map = map_with(&[(3, 3, TileKind::Tree)]);
        let obstacles = ObstacleIndex::new(32);
        let query = CollisionQuery::new(&map, &obstacles);
        assert_eq!(
            query.collision_kind(&Rect::new(80.0, 80.0, 20.0, 20.0)),
            Some(CollisionKind::BlockedTile(TileCoord::new(3, 3)))
        );
        // Far edge sits on the tile boundary; the inclusive corner stays in tile 2.
        assert!(!query.check_collision(&Rect::new(64.0, 64.0, 32.0, 32.0)));
    }

    #[test]
    fn corner_sampling_misses_blocker_between_corners() {
        let map = map_with(&[(4, 4, TileKind::Rock)]);
        let obstacles = ObstacleIndex::new(32);
        let query = CollisionQuery::new(&map, &obstacles);
        let wide = Rect::new(100.0, 130.0, 90.0, 20.0);
        assert!(!query.check_collision(&wide));
        assert!(!query.is_walkable(wide.center().x, wide.center().y));
    }

    #[test]
    fn rect_inside_obstacle_margin_collides() {
        let map = map_with(&[]);
        let obstacles = ObstacleIndex::with_obstacles(
            32,
            vec![Obstacle::natural("pond", 4, 4, 2, 2)],
        );
        let query = CollisionQuery::new(&map, &obstacles);
        // Margin region spans 96..224 on both axes.
        for offset in [0.0, 40.0, 80.0, 110.0] {
            let rect = Rect::new(96.0 + offset, 96.0 + offset, 16.0, 16.0);
            assert_eq!(
                query.collision_kind(&rect),
                Some(CollisionKind::Obstacle("pond".to_string()))
            );
        }
        assert!(!query.check_collision(&Rect::new(224.0, 224.0, 16.0, 16.0)));
    }

    #[test]
    fn resolve_move_slides_along_wall() {
        let map = map_with(&[(5, 2, TileKind::StoneWall), (5, 3, TileKind::StoneWall)]);
        let obstacles = ObstacleIndex::new(32);
        let query = CollisionQuery::new(&map, &obstacles);
        let start = Rect::new(140.0, 80.0, 16.0, 16.0);

        let outcome = query.resolve_move(&start, 10.0, 6.0);
        assert!(outcome.blocked_x);
        assert!(!outcome.blocked_y);
        assert_eq!(outcome.rect, Rect::new(140.0, 86.0, 16.0, 16.0));
        assert!(outcome.moved());

        let free = query.resolve_move(&start, -10.0, 0.0);
        assert!(!free.blocked_x);
        assert_eq!(free.rect.x, 130.0);
    }

    #[test]
    fn blocked_single_axis_move_reports_no_movement() {
        let map = map_with(&[]);
        let obstacles = ObstacleIndex::new(32);
        let query = CollisionQuery::new(&map, &obstacles);
        let start = Rect::new(40.0, 2.0, 16.0, 16.0);

        let outcome = query.resolve_move(&start, 0.0, -5.0);
        assert!(!outcome.blocked_x);
        assert!(outcome.blocked_y);
        assert_eq!(outcome.rect, start);
        assert!(!outcome.moved());

        assert!(!query.resolve_move(&start, 0.0, 0.0).moved());
    }
}
