use image::RgbaImage;
use thiserror::Error;

use super::sprites::LoadedSprite;

pub const MAX_SURFACE_DIMENSION_PX: u32 = 16_384;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("surface size {width}x{height} has no pixels")]
    Empty { width: u32, height: u32 },
    #[error("surface size {width}x{height} exceeds the {max}px limit")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// Owned RGBA8 pixel buffer, row-major with no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::Empty { width, height });
        }
        if width > MAX_SURFACE_DIMENSION_PX || height > MAX_SURFACE_DIMENSION_PX {
            return Err(SurfaceError::TooLarge {
                width,
                height,
                max: MAX_SURFACE_DIMENSION_PX,
            });
        }
        Ok(Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut color = [0; 4];
        color.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(color)
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        for pixel in self.rgba.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    pub fn fill_rect(&mut self, left: i32, top: i32, width: u32, height: u32, color: [u8; 4]) {
        fill_rect_clipped(
            &mut self.rgba,
            self.width,
            self.height,
            left,
            top,
            width,
            height,
            color,
        );
    }

    pub fn draw_rect_outline(&mut self, left: i32, top: i32, width: u32, height: u32, color: [u8; 4]) {
        if width == 0 || height == 0 {
            return;
        }
        let right = left + width as i32 - 1;
        let bottom = top + height as i32 - 1;
        let frame_width = self.width as usize;
        for x in left..=right {
            write_pixel_rgba_clipped(&mut self.rgba, frame_width, x, top, color);
            write_pixel_rgba_clipped(&mut self.rgba, frame_width, x, bottom, color);
        }
        for y in top..=bottom {
            write_pixel_rgba_clipped(&mut self.rgba, frame_width, left, y, color);
            write_pixel_rgba_clipped(&mut self.rgba, frame_width, right, y, color);
        }
    }

    pub fn draw_square(&mut self, cx: i32, cy: i32, half_size: i32, color: [u8; 4]) {
        draw_square(&mut self.rgba, self.width, self.height, cx, cy, half_size, color);
    }

    /// Nearest-neighbour scale of `sprite` onto the destination rect. Fully
    /// transparent source pixels are skipped.
    pub fn draw_sprite_stretched(
        &mut self,
        sprite: &LoadedSprite,
        left: i32,
        top: i32,
        dst_width: u32,
        dst_height: u32,
    ) {
        if sprite.width == 0 || sprite.height == 0 || dst_width == 0 || dst_height == 0 {
            return;
        }
        let expected_rgba_len = sprite.width as usize * sprite.height as usize * 4;
        if sprite.rgba.len() < expected_rgba_len {
            return;
        }

        let right = left + dst_width as i32;
        let bottom = top + dst_height as i32;
        let draw_left = left.max(0);
        let draw_top = top.max(0);
        let draw_right = right.min(self.width as i32);
        let draw_bottom = bottom.min(self.height as i32);
        if draw_left >= draw_right || draw_top >= draw_bottom {
            return;
        }

        let x_ratio = sprite.width as f32 / dst_width as f32;
        let y_ratio = sprite.height as f32 / dst_height as f32;
        let frame_width = self.width as usize;
        let sprite_width = sprite.width as usize;

        for out_y in draw_top..draw_bottom {
            let dy = out_y - top;
            let src_y = ((dy as f32) * y_ratio).floor() as u32;
            let src_y = src_y.min(sprite.height - 1) as usize;
            let src_row_offset = src_y * sprite_width * 4;
            let dst_row_offset = out_y as usize * frame_width * 4;

            for out_x in draw_left..draw_right {
                let dx = out_x - left;
                let src_x = ((dx as f32) * x_ratio).floor() as u32;
                let src_x = src_x.min(sprite.width - 1) as usize;
                let src_offset = src_row_offset + src_x * 4;
                let alpha = sprite.rgba[src_offset + 3];
                if alpha == 0 {
                    continue;
                }
                let dst_offset = dst_row_offset + out_x as usize * 4;
                self.rgba[dst_offset] = sprite.rgba[src_offset];
                self.rgba[dst_offset + 1] = sprite.rgba[src_offset + 1];
                self.rgba[dst_offset + 2] = sprite.rgba[src_offset + 2];
                self.rgba[dst_offset + 3] = alpha;
            }
        }
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
    }
}

pub(crate) fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let x = x as usize;
    let y = y as usize;
    if x >= width {
        return;
    }
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

pub(crate) fn draw_square(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for y in (cy - half_size)..=(cy + half_size) {
        for x in (cx - half_size)..=(cx + half_size) {
            if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                continue;
            }
            write_pixel_rgba_clipped(frame, width as usize, x, y, color);
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn fill_rect_clipped(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    left: i32,
    top: i32,
    width: u32,
    height: u32,
    color: [u8; 4],
) {
    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = left.saturating_add(width as i32).min(frame_width as i32);
    let draw_bottom = top.saturating_add(height as i32).min(frame_height as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }
    for y in draw_top..draw_bottom {
        let row = y as usize * frame_width as usize * 4;
        let start = row + draw_left as usize * 4;
        let end = row + draw_right as usize * 4;
        let Some(span) = frame.get_mut(start..end) else {
            return;
        };
        for pixel in span.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];

    #[test]
    fn rejects_empty_and_oversized_surfaces() {
        assert_eq!(
            Surface::new(0, 10),
            Err(SurfaceError::Empty {
                width: 0,
                height: 10
            })
        );
        assert!(matches!(
            Surface::new(MAX_SURFACE_DIMENSION_PX + 1, 1),
            Err(SurfaceError::TooLarge { .. })
        ));
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut surface = Surface::new(4, 4).expect("surface");
        surface.fill_rect(-2, 2, 4, 10, RED);
        assert_eq!(surface.pixel(0, 2), Some(RED));
        assert_eq!(surface.pixel(1, 3), Some(RED));
        assert_eq!(surface.pixel(2, 2), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixel(0, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn stretched_sprite_covers_destination_exactly() {
        let sprite = LoadedSprite {
            width: 2,
            height: 1,
            rgba: vec![10, 20, 30, 255, 40, 50, 60, 255],
        };
        let mut surface = Surface::new(8, 4).expect("surface");
        surface.draw_sprite_stretched(&sprite, 2, 1, 4, 2);
        assert_eq!(surface.pixel(2, 1), Some([10, 20, 30, 255]));
        assert_eq!(surface.pixel(3, 2), Some([10, 20, 30, 255]));
        assert_eq!(surface.pixel(4, 1), Some([40, 50, 60, 255]));
        assert_eq!(surface.pixel(5, 2), Some([40, 50, 60, 255]));
        assert_eq!(surface.pixel(6, 1), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixel(2, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn transparent_sprite_pixels_are_skipped() {
        let sprite = LoadedSprite {
            width: 1,
            height: 1,
            rgba: vec![1, 2, 3, 0],
        };
        let mut surface = Surface::new(2, 2).expect("surface");
        surface.fill(RED);
        surface.draw_sprite_stretched(&sprite, 0, 0, 2, 2);
        assert_eq!(surface.pixel(1, 1), Some(RED));
    }

    #[test]
    fn to_image_preserves_dimensions() {
        let mut surface = Surface::new(3, 2).expect("surface");
        surface.fill(RED);
        let image = surface.to_image().expect("image");
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, RED);
    }
}
