use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::collision::CollisionQuery;
use crate::geometry::{Rect, Vec2};
use crate::map::{MapData, PLAYER_SPAWN};

pub const DEFAULT_STRICT_ATTEMPTS: u32 = 500;
pub const DEFAULT_FALLBACK_ATTEMPTS: u32 = 200;
pub const DEFAULT_MIN_PLAYER_DISTANCE_TILES: f32 = 5.0;
pub const DEFAULT_MIN_ENTITY_DISTANCE_TILES: f32 = 3.0;
pub const DEFAULT_FALLBACK_ENTITY_DISTANCE_TILES: f32 = 1.0;
pub const DEFAULT_ENTITY_SIZE_TILES: f32 = 0.75;
pub const DEFAULT_PLACEMENT_MARGIN_TILES: f32 = 1.0;

const GAP_CELL_TILES: u32 = 3;
const GAP_MIN_OPEN_SAMPLES: usize = 4;
const GAP_BIAS: f64 = 0.7;

/// Constraints for one `place_entities` call. Distances and sizes are in
/// world pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRequest {
    pub count: usize,
    pub player_position: Option<Vec2>,
    pub min_player_distance: f32,
    pub min_entity_distance: f32,
    pub fallback_entity_distance: f32,
    pub entity_size: Vec2,
    pub margin: f32,
    pub strict_attempts: u32,
    pub fallback_attempts: u32,
    /// Entities already in the world; treated like accepted batch members.
    pub occupied: Vec<Vec2>,
    /// Preferred positions tried before random sampling in each phase.
    pub hints: Vec<Vec2>,
}

impl PlacementRequest {
    /// Defaults scaled to the map's tile size, anchored on the player spawn
    /// when the map defines one.
    pub fn for_map(map: &MapData, count: usize) -> Self {
        let tile = map.tile_size() as f32;
        let entity_extent = tile * DEFAULT_ENTITY_SIZE_TILES;
        Self {
            count,
            player_position: map.spawn_point_world(PLAYER_SPAWN),
            min_player_distance: tile * DEFAULT_MIN_PLAYER_DISTANCE_TILES,
            min_entity_distance: tile * DEFAULT_MIN_ENTITY_DISTANCE_TILES,
            fallback_entity_distance: tile * DEFAULT_FALLBACK_ENTITY_DISTANCE_TILES,
            entity_size: Vec2::new(entity_extent, entity_extent),
            margin: tile * DEFAULT_PLACEMENT_MARGIN_TILES,
            strict_attempts: DEFAULT_STRICT_ATTEMPTS,
            fallback_attempts: DEFAULT_FALLBACK_ATTEMPTS,
            occupied: Vec::new(),
            hints: Vec::new(),
        }
    }

    pub fn with_player(mut self, player_position: Option<Vec2>) -> Self {
        self.player_position = player_position;
        self
    }

    pub fn with_min_player_distance(mut self, distance: f32) -> Self {
        self.min_player_distance = distance;
        self
    }

    pub fn with_min_entity_distance(mut self, distance: f32) -> Self {
        self.min_entity_distance = distance;
        self
    }

    pub fn with_entity_size(mut self, width: f32, height: f32) -> Self {
        self.entity_size = Vec2::new(width, height);
        self
    }

    pub fn with_occupied(mut self, occupied: Vec<Vec2>) -> Self {
        self.occupied = occupied;
        self
    }

    pub fn with_hints(mut self, hints: Vec<Vec2>) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_budgets(mut self, strict_attempts: u32, fallback_attempts: u32) -> Self {
        self.strict_attempts = strict_attempts;
        self.fallback_attempts = fallback_attempts;
        self
    }

    /// Bounding box of an entity centred on `center`.
    pub fn entity_rect(&self, center: Vec2) -> Rect {
        Rect::centered_at(center, self.entity_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementPhase {
    Strict,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec2,
    pub phase: PlacementPhase,
    pub from_hint: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementStats {
    pub strict_attempts: u32,
    pub fallback_attempts: u32,
    pub fallback_triggered: bool,
    pub exhausted: usize,
    pub gap_cells: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementBatch {
    pub requested: usize,
    pub placed: Vec<Placement>,
    pub stats: PlacementStats,
}

impl PlacementBatch {
    pub fn positions(&self) -> Vec<Vec2> {
        self.placed.iter().map(|placement| placement.position).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.placed.len() == self.requested
    }
}

#[derive(Debug, Clone, PartialEq)]
struct GapCache {
    map_fingerprint: u64,
    obstacle_fingerprint: u64,
    cells: Vec<Rect>,
}

#[derive(Debug, Clone, Copy)]
struct PhaseRules {
    phase: PlacementPhase,
    attempts: u32,
    player_distance: f32,
    entity_distance: f32,
    halve_after_midpoint: bool,
}

impl PhaseRules {
    fn strict(request: &PlacementRequest) -> Self {
        Self {
            phase: PlacementPhase::Strict,
            attempts: request.strict_attempts,
            player_distance: request.min_player_distance.max(0.0),
            entity_distance: request.min_entity_distance.max(0.0),
            halve_after_midpoint: true,
        }
    }

    fn fallback(request: &PlacementRequest) -> Self {
        Self {
            phase: PlacementPhase::Fallback,
            attempts: request.fallback_attempts,
            player_distance: 0.0,
            entity_distance: request.fallback_entity_distance.max(0.0),
            halve_after_midpoint: false,
        }
    }

    fn thresholds(&self, attempt: u32) -> (f32, f32) {
        if self.halve_after_midpoint && attempt >= self.attempts / 2 {
            (self.player_distance * 0.5, self.entity_distance * 0.5)
        } else {
            (self.player_distance, self.entity_distance)
        }
    }
}

/// Randomised scatter of entities over walkable, obstacle-free ground.
///
/// Each entity gets a strict pass that honours the requested distances
/// (halved past the midpoint of its budget) and, only if that pass runs dry,
/// a fallback pass that drops the player distance and uses a small fixed
/// spacing. Walkability and obstacle clearance are never relaxed. An entity
/// that exhausts both passes is skipped.
#[derive(Debug, Clone)]
pub struct PlacementPlanner {
    rng: ChaCha8Rng,
    gap_cache: Option<GapCache>,
    gap_rebuilds: u64,
}

impl PlacementPlanner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            gap_cache: None,
            gap_rebuilds: 0,
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn gap_rebuilds(&self) -> u64 {
        self.gap_rebuilds
    }

    pub fn invalidate_gaps(&mut self) {
        self.gap_cache = None;
    }

    /// Coarse cells with mostly open ground, rebuilt only when the map or
    /// obstacle fingerprint changes.
    pub fn gap_cells(&mut self, query: &CollisionQuery<'_>) -> &[Rect] {
        self.ensure_gap_cache(query);
        self.gap_cache
            .as_ref()
            .map(|cache| cache.cells.as_slice())
            .unwrap_or(&[])
    }

    pub fn place_entities(
        &mut self,
        query: &CollisionQuery<'_>,
        request: &PlacementRequest,
    ) -> PlacementBatch {
        self.ensure_gap_cache(query);
        let mut batch = PlacementBatch {
            requested: request.count,
            ..PlacementBatch::default()
        };
        let Self { rng, gap_cache, .. } = self;
        let gaps = gap_cache
            .as_ref()
            .map(|cache| cache.cells.as_slice())
            .unwrap_or(&[]);
        batch.stats.gap_cells = gaps.len();

        let sample_area = sampling_area(query.map(), request);
        let mut accepted: Vec<Vec2> = request.occupied.clone();
        let mut hints: Vec<Vec2> = request.hints.clone();
        let strict = PhaseRules::strict(request);
        let fallback = PhaseRules::fallback(request);

        for entity in 0..request.count {
            let mut sampler = CandidateSampler {
                rng: &mut *rng,
                gaps,
                area: sample_area,
            };
            let strict_result = run_phase(
                &mut sampler,
                query,
                request,
                &strict,
                &accepted,
                &mut hints,
            );
            batch.stats.strict_attempts += strict_result.attempts;
            let placement = match strict_result.placement {
                Some(placement) => Some(placement),
                None => {
                    batch.stats.fallback_triggered = true;
                    tracing::debug!(
                        entity,
                        attempts = strict_result.attempts,
                        "placement_strict_phase_exhausted"
                    );
                    let fallback_result = run_phase(
                        &mut sampler,
                        query,
                        request,
                        &fallback,
                        &accepted,
                        &mut hints,
                    );
                    batch.stats.fallback_attempts += fallback_result.attempts;
                    fallback_result.placement
                }
            };
            match placement {
                Some(placement) => {
                    accepted.push(placement.position);
                    batch.placed.push(placement);
                }
                None => {
                    batch.stats.exhausted += 1;
                    tracing::warn!(entity, requested = request.count, "placement_exhausted");
                }
            }
        }

        tracing::info!(
            requested = request.count,
            placed = batch.placed.len(),
            strict_attempts = batch.stats.strict_attempts,
            fallback_attempts = batch.stats.fallback_attempts,
            fallback_triggered = batch.stats.fallback_triggered,
            gap_cells = batch.stats.gap_cells,
            "placement_batch_finished"
        );
        batch
    }

    fn ensure_gap_cache(&mut self, query: &CollisionQuery<'_>) {
        let map_fingerprint = query.map().fingerprint();
        let obstacle_fingerprint = query.obstacles().fingerprint();
        let fresh = self.gap_cache.as_ref().is_some_and(|cache| {
            cache.map_fingerprint == map_fingerprint
                && cache.obstacle_fingerprint == obstacle_fingerprint
        });
        if fresh {
            return;
        }
        let cells = scan_gaps(query);
        self.gap_rebuilds += 1;
        tracing::debug!(
            cells = cells.len(),
            map_fingerprint,
            obstacle_fingerprint,
            "gap_scan_rebuilt"
        );
        self.gap_cache = Some(GapCache {
            map_fingerprint,
            obstacle_fingerprint,
            cells,
        });
    }
}

struct CandidateSampler<'a> {
    rng: &'a mut ChaCha8Rng,
    gaps: &'a [Rect],
    area: Option<Rect>,
}

impl CandidateSampler<'_> {
    fn next(&mut self) -> Option<Vec2> {
        let area = self.area?;
        if !self.gaps.is_empty() && self.rng.gen_bool(GAP_BIAS) {
            let cell = self.gaps[self.rng.gen_range(0..self.gaps.len())];
            if let Some(region) = cell.intersection(&area) {
                return Some(self.uniform_in(region));
            }
        }
        Some(self.uniform_in(area))
    }

    fn uniform_in(&mut self, region: Rect) -> Vec2 {
        let x = if region.right() > region.x {
            self.rng.gen_range(region.x..region.right())
        } else {
            region.x
        };
        let y = if region.bottom() > region.y {
            self.rng.gen_range(region.y..region.bottom())
        } else {
            region.y
        };
        Vec2::new(x, y)
    }
}

struct PhaseResult {
    placement: Option<Placement>,
    attempts: u32,
}

fn run_phase(
    sampler: &mut CandidateSampler<'_>,
    query: &CollisionQuery<'_>,
    request: &PlacementRequest,
    rules: &PhaseRules,
    accepted: &[Vec2],
    hints: &mut Vec<Vec2>,
) -> PhaseResult {
    let (player_distance, entity_distance) = rules.thresholds(0);
    if let Some(index) = hints.iter().position(|hint| {
        candidate_fits(*hint, query, request, player_distance, entity_distance, accepted)
    }) {
        let position = hints.remove(index);
        return PhaseResult {
            placement: Some(Placement {
                position,
                phase: rules.phase,
                from_hint: true,
            }),
            attempts: 0,
        };
    }

    for attempt in 0..rules.attempts {
        let Some(candidate) = sampler.next() else {
            return PhaseResult {
                placement: None,
                attempts: attempt,
            };
        };
        let (player_distance, entity_distance) = rules.thresholds(attempt);
        if candidate_fits(candidate, query, request, player_distance, entity_distance, accepted) {
            return PhaseResult {
                placement: Some(Placement {
                    position: candidate,
                    phase: rules.phase,
                    from_hint: false,
                }),
                attempts: attempt + 1,
            };
        }
    }
    PhaseResult {
        placement: None,
        attempts: rules.attempts,
    }
}

fn candidate_fits(
    candidate: Vec2,
    query: &CollisionQuery<'_>,
    request: &PlacementRequest,
    player_distance: f32,
    entity_distance: f32,
    accepted: &[Vec2],
) -> bool {
    if !query.is_walkable(candidate.x, candidate.y) {
        return false;
    }
    if query.check_collision(&request.entity_rect(candidate)) {
        return false;
    }
    if let Some(player) = request.player_position {
        if candidate.distance(player) < player_distance {
            return false;
        }
    }
    accepted
        .iter()
        .all(|other| candidate.distance(*other) >= entity_distance)
}

/// Area candidate centres are drawn from: the map inset by the request margin
/// and half the entity extent. `None` when nothing is left.
fn sampling_area(map: &MapData, request: &PlacementRequest) -> Option<Rect> {
    let half_extent = request.entity_size.x.max(request.entity_size.y).max(0.0) * 0.5;
    let inset = request.margin.max(0.0) + half_extent;
    let area = map.bounds().inset(inset);
    if area.width <= 0.0 && area.height <= 0.0 {
        return None;
    }
    Some(area)
}

fn scan_gaps(query: &CollisionQuery<'_>) -> Vec<Rect> {
    let map = query.map();
    let obstacles = query.obstacles();
    let cell_px = (GAP_CELL_TILES * map.tile_size()) as f32;
    let offset = cell_px * 0.25;
    let columns = map.width() / GAP_CELL_TILES;
    let rows = map.height() / GAP_CELL_TILES;
    let mut cells = Vec::new();
    for row in 0..rows {
        for column in 0..columns {
            let cell = Rect::new(column as f32 * cell_px, row as f32 * cell_px, cell_px, cell_px);
            let center = cell.center();
            let samples = [
                center,
                Vec2::new(center.x - offset, center.y - offset),
                Vec2::new(center.x + offset, center.y - offset),
                Vec2::new(center.x - offset, center.y + offset),
                Vec2::new(center.x + offset, center.y + offset),
            ];
            let open = samples
                .iter()
                .filter(|point| {
                    query.is_walkable(point.x, point.y) && !obstacles.blocks_point(**point)
                })
                .count();
            if open >= GAP_MIN_OPEN_SAMPLES {
                cells.push(cell);
            }
        }
    }
    cells
}
