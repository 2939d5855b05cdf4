use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use rescue_engine::{resolve_app_paths, AppError, CameraConfig, LoopConfig, MapContext, Scene};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::RescueScene;

pub(crate) const MAP_ENV_VAR: &str = "RESCUE_MAP";
pub(crate) const SEED_ENV_VAR: &str = "RESCUE_SEED";
pub(crate) const TARGETS_ENV_VAR: &str = "RESCUE_TARGETS";
pub(crate) const SNAPSHOT_ENV_VAR: &str = "RESCUE_SNAPSHOT";

pub(crate) const DEFAULT_TARGET_COUNT: usize = 5;
pub(crate) const MAX_TARGET_COUNT: usize = 64;
const DEFAULT_MAP_FILE: &str = "town.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GameConfig {
    pub(crate) map_path: Option<PathBuf>,
    pub(crate) seed: Option<u64>,
    pub(crate) target_count: usize,
    pub(crate) snapshot_path: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map_path: None,
            seed: None,
            target_count: DEFAULT_TARGET_COUNT,
            snapshot_path: None,
        }
    }
}

impl GameConfig {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads each setting through `lookup`. Unparseable values are logged and
    /// replaced by the default; empty values count as unset.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let target_count = match parse_setting::<usize>(TARGETS_ENV_VAR, read(TARGETS_ENV_VAR)) {
            Some(count) if (1..=MAX_TARGET_COUNT).contains(&count) => count,
            Some(count) => {
                warn!(
                    env_var = TARGETS_ENV_VAR,
                    value = count,
                    max = MAX_TARGET_COUNT,
                    "target count out of range; falling back to default"
                );
                DEFAULT_TARGET_COUNT
            }
            None => DEFAULT_TARGET_COUNT,
        };

        Self {
            map_path: read(MAP_ENV_VAR).map(PathBuf::from),
            seed: parse_setting::<u64>(SEED_ENV_VAR, read(SEED_ENV_VAR)),
            target_count,
            snapshot_path: read(SNAPSHOT_ENV_VAR).map(PathBuf::from),
        }
    }

    /// Map file to load: the configured path (relative paths resolve against
    /// the project root), else the bundled town map when it exists, else
    /// none so the generated map is used.
    pub(crate) fn resolve_map_path(&self, root: &Path, maps_dir: &Path) -> Option<PathBuf> {
        match &self.map_path {
            Some(path) if path.is_absolute() => Some(path.clone()),
            Some(path) => Some(root.join(path)),
            None => {
                let bundled = maps_dir.join(DEFAULT_MAP_FILE);
                bundled.is_file().then_some(bundled)
            }
        }
    }
}

fn parse_setting<T: FromStr>(env_var: &'static str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(
                env_var,
                value = raw.as_str(),
                "invalid env var value; falling back to default"
            );
            None
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) context: MapContext,
    pub(crate) snapshot_path: Option<PathBuf>,
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    init_tracing();
    info!("=== Pet Rescue Startup ===");

    let app_paths = resolve_app_paths()?;
    let game_config = GameConfig::from_env();
    let seed = game_config.seed.unwrap_or_else(seed_from_clock);
    let map_path = game_config.resolve_map_path(&app_paths.root, &app_paths.maps_dir);
    let map_source = match &map_path {
        Some(path) => path.display().to_string(),
        None => "generated".to_string(),
    };
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        map = %map_source,
        seed,
        targets = game_config.target_count,
        "startup"
    );

    let config = LoopConfig::default();
    let camera_config = CameraConfig {
        viewport_width: config.window_width,
        viewport_height: config.window_height,
        ..CameraConfig::default()
    };
    let context = MapContext::from_path(
        map_path.as_deref(),
        camera_config,
        seed,
        app_paths.assets_dir.clone(),
    );

    Ok(AppWiring {
        config,
        scene: Box::new(RescueScene::new(game_config.target_count)),
        context,
        snapshot_path: game_config.snapshot_path,
    })
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
