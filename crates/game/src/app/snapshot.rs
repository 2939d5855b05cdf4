use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rescue_engine::{MapContext, Scene, SurfaceError};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub(crate) enum SnapshotError {
    #[error("failed to compose map surface: {0}")]
    Surface(#[from] SurfaceError),
    #[error("failed to create snapshot directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode snapshot {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("snapshot buffer does not match its {width}x{height} size")]
    BufferMismatch { width: u32, height: u32 },
}

/// Loads `scene` into `context` without opening a window and writes the full
/// composited map, with the scene's markers on top, to a PNG at `path`.
pub(crate) fn write_snapshot(
    scene: &mut dyn Scene,
    context: &mut MapContext,
    path: &Path,
) -> Result<(u32, u32), SnapshotError> {
    scene.load(context);
    let markers = scene.markers();
    let surface = context.snapshot(&markers)?;
    let (width, height) = (surface.width(), surface.height());
    let image = surface
        .to_image()
        .ok_or(SnapshotError::BufferMismatch { width, height })?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| SnapshotError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    image.save(path).map_err(|source| SnapshotError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    scene.unload(context);

    info!(
        path = %path.display(),
        width,
        height,
        markers = markers.len(),
        "snapshot_written"
    );
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gameplay::RescueScene;
    use rescue_engine::{generate_default_map, CameraConfig};

    #[test]
    fn snapshot_writes_full_map_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out").join("town.png");
        let mut context = MapContext::new(
            generate_default_map(),
            CameraConfig::default(),
            21,
            dir.path().join("assets"),
        );
        let mut scene = RescueScene::new(3);

        let size = write_snapshot(&mut scene, &mut context, &path).expect("snapshot");

        assert_eq!(size, (800, 640));
        let decoded = image::open(&path).expect("decode").to_rgba8();
        assert_eq!(decoded.dimensions(), (800, 640));
        let spawn = scene.player_center();
        assert_eq!(
            decoded.get_pixel(spawn.x as u32, spawn.y as u32).0,
            [80, 170, 255, 255]
        );
    }
}
