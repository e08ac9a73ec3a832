//! Uniform mode: each segment is a round-capped cubic with its own width.

use ultraviolet::Vec2;

use crate::point::SamplePoint;
use crate::stroke::StrokeStyle;

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Segment {
    pub from: Vec2,
    pub control1: Vec2,
    pub control2: Vec2,
    pub to: Vec2,
    pub width: f32,
}

/// Segments between consecutive points. Width follows the running average of magnitudes.
#[must_use]
pub fn segments(style: &StrokeStyle, points: &[SamplePoint]) -> Vec<Segment> {
    let Some((first, rest)) = points.split_first() else {
        return Vec::new();
    };
    let mut prior = first;
    let mut prior_magnitude = first.magnitude();
    let mut segments = Vec::with_capacity(rest.len());

    for point in rest {
        let magnitude = (prior_magnitude + point.magnitude()) / 2.0;
        prior_magnitude = magnitude;

        let from = prior.precise_location;
        let to = point.precise_location;
        let middle = (from + to) / 2.0;
        segments.push(Segment {
            from,
            control1: (middle + from) / 2.0,
            control2: (middle + to) / 2.0,
            to,
            width: style.line_width(magnitude),
        });
        prior = point;
    }
    segments
}

pub(super) fn draw(
    layer: &mut tiny_skia::PixmapMut,
    transform: tiny_skia::Transform,
    style: &StrokeStyle,
    points: &[SamplePoint],
) {
    let paint = super::opaque_paint(style.color);
    for segment in segments(style, points) {
        let mut builder = tiny_skia::PathBuilder::new();
        builder.move_to(segment.from.x, segment.from.y);
        builder.cubic_to(
            segment.control1.x,
            segment.control1.y,
            segment.control2.x,
            segment.control2.y,
            segment.to.x,
            segment.to.y,
        );
        // Coincident points make an empty path, nothing to draw.
        let Some(path) = builder.finish() else {
            continue;
        };
        let stroke = tiny_skia::Stroke {
            width: segment.width,
            line_cap: tiny_skia::LineCap::Round,
            line_join: tiny_skia::LineJoin::Round,
            ..tiny_skia::Stroke::default()
        };
        layer.stroke_path(&path, &paint, &stroke, transform, None);
    }
}
