//! # Curve rasterization
//!
//! Turns a stroke's point sequence into pixels. Two mutually exclusive modes:
//! * [`uniform`]: round-capped cubic segments, each stroked with its own width.
//! * [`shaded`]: a tilt-shaped nib stamped per segment, plus a silhouette joining the nib
//!   extremes along the whole stroke.
//!
//! Either way, the stroke is drawn opaque into a transparency layer which is then
//! composited with the pen's alpha, so self-overlaps of one stroke don't double-darken.

pub mod shaded;
pub mod uniform;

use crate::color::Color;
use crate::point::SamplePoint;
use crate::rect::DirtyRect;
use crate::stroke::StrokeStyle;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum RenderMode {
    Uniform,
    TiltShaded,
}
impl RenderMode {
    /// Shading applies only to stylus-sourced strokes.
    #[must_use]
    pub fn select(style: &StrokeStyle, points: &[SamplePoint]) -> Self {
        if style.use_shading && points.first().is_some_and(SamplePoint::is_stylus) {
            Self::TiltShaded
        } else {
            Self::Uniform
        }
    }
}

/// The device pixels `points` can ink under `transform`, clipped to a `width`x`height`
/// target. `None` if nothing lands on the target.
#[must_use]
pub fn layer_bounds(
    width: u32,
    height: u32,
    transform: tiny_skia::Transform,
    style: &StrokeStyle,
    points: &[SamplePoint],
) -> Option<tiny_skia::IntRect> {
    // Filtered magnitudes never exceed the peak. A nib reaches 2.5 line widths from its point.
    let peak = points
        .iter()
        .map(SamplePoint::magnitude)
        .fold(0.0, f32::max);
    let margin = 3.0 * style.line_width(peak) + 2.0;
    let display: DirtyRect = points
        .iter()
        .map(|point| DirtyRect::from_point(point.precise_location))
        .collect();
    let device = display
        .outset(margin)
        .to_skia()?
        .transform(transform)?
        .round_out()?;

    let left = device.left().max(0);
    let top = device.top().max(0);
    let right = device.right().min(i32::try_from(width).ok()?);
    let bottom = device.bottom().min(i32::try_from(height).ok()?);
    if right <= left || bottom <= top {
        return None;
    }
    tiny_skia::IntRect::from_ltrb(left, top, right, bottom)
}

/// Draw `points` with `style` into `target`, under `transform` from display to device space.
pub fn draw_points(
    target: &mut tiny_skia::PixmapMut,
    transform: tiny_skia::Transform,
    style: &StrokeStyle,
    points: &[SamplePoint],
) {
    // A single point has no segments.
    if points.len() < 2 {
        return;
    }
    let Some(bounds) = layer_bounds(target.width(), target.height(), transform, style, points)
    else {
        return;
    };
    let Some(mut layer) = tiny_skia::Pixmap::new(bounds.width(), bounds.height()) else {
        return;
    };
    let (left, top) = (bounds.left(), bounds.top());
    // Layer pixel (0, 0) sits at the bounds' corner.
    let local = transform.post_translate(-(left as f32), -(top as f32));
    {
        let mut layer = layer.as_mut();
        match RenderMode::select(style, points) {
            RenderMode::Uniform => uniform::draw(&mut layer, local, style, points),
            RenderMode::TiltShaded => shaded::draw(&mut layer, local, style, points),
        }
    }
    target.draw_pixmap(
        left,
        top,
        layer.as_ref(),
        &tiny_skia::PixmapPaint {
            opacity: style.color.alpha(),
            ..tiny_skia::PixmapPaint::default()
        },
        tiny_skia::Transform::identity(),
        None,
    );
}

/// Solid, anti-aliased paint of `color` with its alpha dropped.
fn opaque_paint(color: Color) -> tiny_skia::Paint<'static> {
    let mut paint = tiny_skia::Paint::default();
    paint.set_color(color.opaque().to_skia());
    paint.anti_alias = true;
    paint
}
