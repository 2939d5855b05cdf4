use std::process::ExitCode;

use rescue_engine::run_app;
use tracing::error;

use super::bootstrap::AppWiring;
use super::snapshot::write_snapshot;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut scene,
        mut context,
        snapshot_path,
    } = app;

    if let Some(path) = snapshot_path {
        if let Err(err) = write_snapshot(scene.as_mut(), &mut context, &path) {
            error!(error = %err, path = %path.display(), "snapshot_failed");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    if let Err(err) = run_app(config, scene, context) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
