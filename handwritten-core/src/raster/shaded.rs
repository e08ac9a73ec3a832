//! Tilt-shaded mode: a calligraphic nib whose footprint follows stylus tilt and azimuth.
//!
//! The nib is a closed cubic wedge in nib-local space, rotated to the stylus' azimuth and
//! scaled by how far the stylus leans over. Every segment stamps one nib. In addition, the two
//! extremes of each nib across the direction of travel are collected into two boundary
//! curves, which are joined into one silhouette for the whole stroke.

use std::f32::consts::FRAC_PI_2;

use ultraviolet::Vec2;

use crate::point::SamplePoint;
use crate::stroke::StrokeStyle;
use crate::util::rotate;

/// Parametric steps when searching the nib outline for its extremes.
const OUTLINE_STEPS: u32 = 100;

/// Zero when the stylus is perpendicular to the surface, one when lying flat.
#[must_use]
pub fn tilt_factor(altitude: f32) -> f32 {
    (FRAC_PI_2 - altitude) / FRAC_PI_2
}

/// The nib wedge in nib-local space, for a nib of width `w`.
/// The outline is the cubic `b0 -> b0` through controls `b1`, `b2`.
#[must_use]
pub fn nib_local(w: f32) -> [Vec2; 3] {
    [
        Vec2::new(0.0, w),
        Vec2::new(-2.0 * w, -2.5 * w),
        Vec2::new(2.0 * w, -2.5 * w),
    ]
}

fn cubic(p: [Vec2; 4], t: f32) -> Vec2 {
    let u = 1.0 - t;
    p[0] * (u * u * u) + p[1] * (3.0 * u * u * t) + p[2] * (3.0 * u * t * t) + p[3] * (t * t * t)
}

/// Sample the cubic `p` and find the points with the least and greatest projection onto the x-axis
/// after rotating by `angle`. Returns `(least, greatest)`, in the cubic's own space.
#[must_use]
pub fn nib_extremes(p: [Vec2; 4], angle: f32) -> (Vec2, Vec2) {
    let (sin, cos) = angle.sin_cos();
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut least = Vec2::zero();
    let mut greatest = Vec2::zero();

    for step in 0..OUTLINE_STEPS {
        let at = cubic(p, step as f32 / OUTLINE_STEPS as f32);
        let projected = at.x * cos - at.y * sin;
        if projected < min {
            min = projected;
            least = at;
        }
        if projected > max {
            max = projected;
            greatest = at;
        }
    }
    (least, greatest)
}

/// One stamped nib, in display space. The outline starts and ends at `start`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Nib {
    pub start: Vec2,
    pub control1: Vec2,
    pub control2: Vec2,
    /// Width of the nib before placement.
    pub width: f32,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Geometry {
    pub nibs: Vec<Nib>,
    /// Greatest extremes, walked forwards when building the silhouette.
    pub outline_a: Vec<Vec2>,
    /// Least extremes, walked backwards when building the silhouette.
    pub outline_b: Vec<Vec2>,
}

#[must_use]
pub fn geometry(style: &StrokeStyle, points: &[SamplePoint]) -> Geometry {
    let Some((first, rest)) = points.split_first() else {
        return Geometry::default();
    };
    let mut geometry = Geometry {
        nibs: Vec::with_capacity(rest.len()),
        outline_a: vec![first.precise_location],
        outline_b: vec![first.precise_location],
    };
    let mut prior = first;
    let mut prior_magnitude = first.magnitude();

    for point in rest {
        // Heavier smoothing than uniform mode, the nib shape is more sensitive to jitter.
        let magnitude = (prior_magnitude * 4.0 + point.magnitude()) / 5.0;
        prior_magnitude = magnitude;
        let line_width = style.line_width(magnitude);

        let location = point.precise_location;
        let direction = location - prior.precise_location;
        let travel_angle = direction.y.atan2(direction.x);
        let deviation = point.azimuth - travel_angle;
        let placement = point.azimuth + FRAC_PI_2;

        let w = line_width * tilt_factor(point.altitude);
        let [b0, b1, b2] = nib_local(w);
        let place = |local: Vec2| rotate(local, placement) + location;

        geometry.nibs.push(Nib {
            start: place(b0),
            control1: place(b1),
            control2: place(b2),
            width: w,
        });

        let (least, greatest) = nib_extremes([b0, b1, b2, b0], deviation);
        geometry.outline_a.push(place(greatest));
        geometry.outline_b.push(place(least));

        prior = point;
    }
    geometry
}

/// The closed silhouette: forwards along `outline_a`, then backwards along `outline_b`.
#[must_use]
pub fn silhouette(geometry: &Geometry) -> Option<tiny_skia::Path> {
    let (first, rest) = geometry.outline_a.split_first()?;
    let mut builder = tiny_skia::PathBuilder::new();
    builder.move_to(first.x, first.y);
    for point in rest {
        builder.line_to(point.x, point.y);
    }
    for point in geometry.outline_b.iter().rev() {
        builder.line_to(point.x, point.y);
    }
    builder.close();
    builder.finish()
}

fn nib_path(nib: &Nib) -> Option<tiny_skia::Path> {
    let mut builder = tiny_skia::PathBuilder::new();
    builder.move_to(nib.start.x, nib.start.y);
    builder.cubic_to(
        nib.control1.x,
        nib.control1.y,
        nib.control2.x,
        nib.control2.y,
        nib.start.x,
        nib.start.y,
    );
    builder.close();
    builder.finish()
}

pub(super) fn draw(
    layer: &mut tiny_skia::PixmapMut,
    transform: tiny_skia::Transform,
    style: &StrokeStyle,
    points: &[SamplePoint],
) {
    let paint = super::opaque_paint(style.color);
    let geometry = geometry(style, points);

    // Zero-width nibs (upright stylus) have no area.
    for path in geometry.nibs.iter().filter(|nib| nib.width > 0.0).filter_map(nib_path) {
        layer.fill_path(&path, &paint, tiny_skia::FillRule::Winding, transform, None);
    }
    if let Some(path) = silhouette(&geometry) {
        layer.fill_path(&path, &paint, tiny_skia::FillRule::Winding, transform, None);
    }
}
