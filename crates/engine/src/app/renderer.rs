use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::context::MapContext;
use crate::render::draw_square;

use super::Marker;

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
    failed_map_fingerprint: Option<u64>,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            width: size.width,
            height: size.height,
            failed_map_fingerprint: None,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Rebuilds the frame buffer at the new size. Zero-sized windows
    /// (minimised) keep the previous buffer.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn render(&mut self, context: &mut MapContext, markers: &[Marker]) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        // A map whose surface failed to build renders as clear colour until
        // the map changes.
        let fingerprint = context.map().fingerprint();
        if self.failed_map_fingerprint != Some(fingerprint) {
            if let Err(error) = context.ensure_surface() {
                warn!(error = %error, map = context.label(), "map_surface_build_failed");
                self.failed_map_fingerprint = Some(fingerprint);
            }
        }

        let (width, height) = (self.width, self.height);
        let frame = self.pixels.frame_mut();
        context.draw_map(frame, width, height);
        for marker in markers {
            let screen = context.world_to_screen(marker.position);
            draw_square(
                frame,
                width,
                height,
                screen.x.round() as i32,
                screen.y.round() as i32,
                marker.half_size,
                marker.color,
            );
        }
        self.pixels.render()
    }
}
