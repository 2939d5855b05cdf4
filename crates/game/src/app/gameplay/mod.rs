use rescue_engine::{
    InputSnapshot, MapContext, Marker, Rect, Scene, SceneCommand, Vec2, PLAYER_SPAWN,
};
use tracing::{debug, info, warn};

const PLAYER_SPEED_TILES_PER_SECOND: f32 = 5.0;
const PLAYER_SIZE_TILES: f32 = 0.6;
const RESCUE_RADIUS_TILES: f32 = 0.75;
const INTERACT_RADIUS_TILES: u32 = 1;
const PLAYER_COLOR: [u8; 4] = [80, 170, 255, 255];
const PLAYER_HALF_SIZE_PX: i32 = 7;
const PET_COLOR: [u8; 4] = [255, 170, 60, 255];
const PET_HALF_SIZE_PX: i32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RescueTarget {
    pub(crate) id: usize,
    pub(crate) position: Vec2,
    pub(crate) rescued: bool,
}

/// Walk the player around the map and rescue every placed pet by stepping
/// within reach of it.
#[derive(Debug)]
pub(crate) struct RescueScene {
    target_count: usize,
    player: Rect,
    tile_size: f32,
    targets: Vec<RescueTarget>,
    elapsed_seconds: f32,
    completed: bool,
    last_visited: Option<String>,
}

impl RescueScene {
    pub(crate) fn new(target_count: usize) -> Self {
        Self {
            target_count,
            player: Rect::new(0.0, 0.0, 0.0, 0.0),
            tile_size: 0.0,
            targets: Vec::new(),
            elapsed_seconds: 0.0,
            completed: false,
            last_visited: None,
        }
    }

    pub(crate) fn player_center(&self) -> Vec2 {
        self.player.center()
    }

    pub(crate) fn targets(&self) -> &[RescueTarget] {
        &self.targets
    }

    pub(crate) fn rescued_count(&self) -> usize {
        self.targets.iter().filter(|target| target.rescued).count()
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.completed
    }

    pub(crate) fn last_visited(&self) -> Option<&str> {
        self.last_visited.as_deref()
    }

    fn place_targets(&mut self, context: &mut MapContext) {
        let request = context
            .placement_request(self.target_count)
            .with_player(Some(self.player_center()));
        let batch = context.place_entities(&request);
        if !batch.is_complete() {
            warn!(
                requested = batch.requested,
                placed = batch.placed.len(),
                map = context.label(),
                "rescue_targets_short"
            );
        }
        self.targets = batch
            .positions()
            .into_iter()
            .enumerate()
            .map(|(id, position)| RescueTarget {
                id,
                position,
                rescued: false,
            })
            .collect();
        info!(
            targets = self.targets.len(),
            fallback = batch.stats.fallback_triggered,
            "rescue_targets_placed"
        );
    }

    fn move_player(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot, context: &MapContext) {
        let (axis_x, axis_y) = input.move_axis();
        if axis_x == 0.0 && axis_y == 0.0 {
            return;
        }
        let length = (axis_x * axis_x + axis_y * axis_y).sqrt();
        let step = PLAYER_SPEED_TILES_PER_SECOND * self.tile_size * fixed_dt_seconds / length;
        let outcome = context
            .collision()
            .resolve_move(&self.player, axis_x * step, axis_y * step);
        if outcome.blocked_x || outcome.blocked_y {
            debug!(
                blocked_x = outcome.blocked_x,
                blocked_y = outcome.blocked_y,
                "player_move_blocked"
            );
        }
        self.player = outcome.rect;
    }

    fn rescue_nearby(&mut self) {
        let reach = RESCUE_RADIUS_TILES * self.tile_size;
        let center = self.player_center();
        let mut remaining = self.targets.iter().filter(|target| !target.rescued).count();
        for target in self.targets.iter_mut().filter(|target| !target.rescued) {
            if target.position.distance(center) <= reach {
                target.rescued = true;
                remaining -= 1;
                info!(
                    target = target.id,
                    x = target.position.x,
                    y = target.position.y,
                    remaining,
                    "pet_rescued"
                );
            }
        }
        if remaining == 0 && !self.targets.is_empty() && !self.completed {
            self.completed = true;
            info!(
                rescued = self.targets.len(),
                elapsed_seconds = self.elapsed_seconds,
                "rescue_complete"
            );
        }
    }

    fn interact(&mut self, context: &MapContext) {
        let nearby = context.interactable_near(self.player_center(), INTERACT_RADIUS_TILES);
        match nearby.first() {
            Some(obstacle) => {
                info!(
                    obstacle = %obstacle.id,
                    name = obstacle.display_name(),
                    "building_visited"
                );
                self.last_visited = Some(obstacle.id.clone());
            }
            None => debug!("nothing_to_interact"),
        }
    }
}

impl Scene for RescueScene {
    fn load(&mut self, context: &mut MapContext) {
        self.tile_size = context.map().tile_size() as f32;
        let spawn = context
            .get_spawn_point(PLAYER_SPAWN)
            .unwrap_or_else(|| context.map().bounds().center());
        let side = PLAYER_SIZE_TILES * self.tile_size;
        self.player = Rect::centered_at(spawn, Vec2::new(side, side));
        if context.check_collision(&self.player) {
            warn!(x = spawn.x, y = spawn.y, "player_spawn_blocked");
        }
        self.elapsed_seconds = 0.0;
        self.completed = false;
        self.last_visited = None;
        self.place_targets(context);
        info!(
            map = context.label(),
            x = spawn.x,
            y = spawn.y,
            "player_spawned"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        context: &mut MapContext,
    ) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        self.elapsed_seconds += fixed_dt_seconds;
        self.move_player(fixed_dt_seconds, input, context);
        context.follow(self.player_center(), fixed_dt_seconds);
        self.rescue_nearby();
        if input.interact_pressed() {
            self.interact(context);
        }
        SceneCommand::None
    }

    fn markers(&self) -> Vec<Marker> {
        let mut markers: Vec<Marker> = self
            .targets
            .iter()
            .filter(|target| !target.rescued)
            .map(|target| Marker::new(target.position, PET_HALF_SIZE_PX, PET_COLOR))
            .collect();
        markers.push(Marker::new(
            self.player_center(),
            PLAYER_HALF_SIZE_PX,
            PLAYER_COLOR,
        ));
        markers
    }

    fn unload(&mut self, _context: &mut MapContext) {
        info!(
            rescued = self.rescued_count(),
            total = self.targets().len(),
            last_visited = self.last_visited().unwrap_or("none"),
            "scene_unloaded"
        );
    }

    fn debug_title(&self, context: &MapContext) -> Option<String> {
        let status = if self.is_complete() {
            " - all pets safe"
        } else {
            ""
        };
        Some(format!(
            "Pet Rescue | {} | rescued {}/{}{}",
            context.label(),
            self.rescued_count(),
            self.targets.len(),
            status
        ))
    }
}
