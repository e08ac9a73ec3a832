//! # Frozen canvas
//!
//! The persistent raster that finished strokes are composited into. It lives at device
//! resolution and owns the display-to-device transform. Only finalized strokes and stamped
//! text ever write to it, and all writes take `&mut self`, so there is a single writer.

use crate::color::Color;
use crate::stroke::Stroke;

/// Largest accepted surface edge, in device pixels.
pub const MAX_DIMENSION: u32 = 16 * 1024;
/// Edge of the exported snapshot, in pixels.
pub const DEFAULT_SNAPSHOT_SIZE: u32 = 128;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum CanvasError {
    #[error("surface has no area")]
    Empty,
    #[error("surface of {0}x{1} device pixels is too large")]
    TooLarge(u32, u32),
    #[error("scale factor {0} is not positive and finite")]
    BadScale(f32),
}

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot of size {0}x{1} is not allowed")]
    BadSize(u32, u32),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// The ability to be written to and read back from bytes.
pub trait Persist: Sized {
    type Error;
    fn serialize(&self) -> Result<Vec<u8>, Self::Error>;
    fn deserialize(bytes: &[u8]) -> Result<Self, Self::Error>;
}

pub struct FrozenCanvas {
    pixmap: tiny_skia::Pixmap,
    /// Device pixels per logical (display) unit.
    scale: f32,
    /// Has anything ever been composited since creation or the last clear?
    touched: bool,
}
impl FrozenCanvas {
    /// Create a transparent canvas covering `logical_width` by `logical_height` display units.
    pub fn new(logical_width: f32, logical_height: f32, scale: f32) -> Result<Self, CanvasError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(CanvasError::BadScale(scale));
        }
        // Negatives saturate to zero, NaN has no area either.
        let device = |logical: f32| -> u32 {
            let device = (logical * scale).ceil();
            if device.is_nan() {
                0
            } else {
                az::saturating_cast(device)
            }
        };
        let (width, height) = (device(logical_width), device(logical_height));
        if width == 0 || height == 0 {
            return Err(CanvasError::Empty);
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(CanvasError::TooLarge(width, height));
        }
        let pixmap = tiny_skia::Pixmap::new(width, height).ok_or(CanvasError::Empty)?;
        Ok(Self {
            pixmap,
            scale,
            touched: false,
        })
    }
    #[must_use]
    pub fn transform(&self) -> tiny_skia::Transform {
        tiny_skia::Transform::from_scale(self.scale, self.scale)
    }
    /// Size in logical units.
    #[must_use]
    pub fn logical_size(&self) -> (f32, f32) {
        (
            self.pixmap.width() as f32 / self.scale,
            self.pixmap.height() as f32 / self.scale,
        )
    }
    #[must_use]
    pub fn pixmap(&self) -> &tiny_skia::Pixmap {
        &self.pixmap
    }
    #[must_use]
    pub fn is_touched(&self) -> bool {
        self.touched
    }
    /// Rasterize the committed points of a finalized stroke.
    pub fn composite(&mut self, stroke: &Stroke) {
        let transform = self.transform();
        stroke.draw_frozen(&mut self.pixmap.as_mut(), transform);
        self.touched = true;
        log::debug!(
            "composited stroke of {} points",
            stroke.committed_points().len()
        );
    }
    /// Draw arbitrary content in display space. Marks the canvas as touched.
    pub(crate) fn with_surface(
        &mut self,
        draw: impl FnOnce(&mut tiny_skia::PixmapMut, tiny_skia::Transform),
    ) {
        let transform = self.transform();
        draw(&mut self.pixmap.as_mut(), transform);
        self.touched = true;
    }
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT.to_skia());
        self.touched = false;
        log::debug!("cleared frozen canvas");
    }
    /// Draw the canvas underneath whatever `target` will show. `target` is in device space.
    pub fn draw_into(&self, target: &mut tiny_skia::PixmapMut) {
        target.draw_pixmap(
            0,
            0,
            self.pixmap.as_ref(),
            &tiny_skia::PixmapPaint::default(),
            tiny_skia::Transform::identity(),
            None,
        );
    }
    /// Export at `width`x`height` onto opaque white. `None` if nothing was ever committed.
    pub fn snapshot(&self, width: u32, height: u32) -> Option<Result<Snapshot, SnapshotError>> {
        self.touched.then(|| self.snapshot_always(width, height))
    }
    /// Export at `width`x`height` onto opaque white, even when empty.
    pub fn snapshot_always(&self, width: u32, height: u32) -> Result<Snapshot, SnapshotError> {
        let oversized = width > MAX_DIMENSION || height > MAX_DIMENSION;
        let mut target = tiny_skia::Pixmap::new(width, height)
            .filter(|_| !oversized)
            .ok_or(SnapshotError::BadSize(width, height))?;
        target.fill(Color::WHITE.to_skia());

        let scale_x = width as f32 / self.pixmap.width() as f32;
        let scale_y = height as f32 / self.pixmap.height() as f32;
        target.draw_pixmap(
            0,
            0,
            self.pixmap.as_ref(),
            &tiny_skia::PixmapPaint {
                quality: tiny_skia::FilterQuality::Bilinear,
                ..tiny_skia::PixmapPaint::default()
            },
            tiny_skia::Transform::from_scale(scale_x, scale_y),
            None,
        );

        let mut rgba = Vec::with_capacity(target.data().len());
        for pixel in target.pixels() {
            let pixel = pixel.demultiply();
            rgba.extend_from_slice(&[pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()]);
        }
        let image = image::RgbaImage::from_raw(width, height, rgba)
            .ok_or(SnapshotError::BadSize(width, height))?;
        Ok(Snapshot { image })
    }
}

/// A fixed-size, opaque export of the frozen canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    image: image::RgbaImage,
}
impl Snapshot {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
    /// Straight RGBA at the given pixel, `None` if out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width() && y < self.height()).then(|| self.image.get_pixel(x, y).0)
    }
}
impl Persist for Snapshot {
    type Error = SnapshotError;
    /// Encode as PNG.
    fn serialize(&self) -> Result<Vec<u8>, Self::Error> {
        let mut bytes = std::io::Cursor::new(Vec::new());
        self.image.write_to(&mut bytes, image::ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }
    /// Decode from PNG.
    fn deserialize(bytes: &[u8]) -> Result<Self, Self::Error> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)?;
        Ok(Self {
            image: image.to_rgba8(),
        })
    }
}
