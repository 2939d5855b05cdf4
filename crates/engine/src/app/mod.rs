mod input;
mod loop_runner;
mod renderer;
mod scene;

pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use renderer::Renderer;
pub use scene::{Marker, Scene, SceneCommand};
