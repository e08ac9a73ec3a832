//! # Strokes
//!
//! A stroke is one contact's trajectory. Points arrive live, may be revised by estimation
//! updates, and are finally committed, at which point they're rasterized into the
//! [frozen canvas](crate::canvas::FrozenCanvas) and never drawn live again.

pub mod batch;
pub use batch::BatchKind;

use crate::color::Color;
use crate::point::{
    EstimationKey, EstimationTracker, EstimationUpdate, PointFlags, RawSample, SamplePoint,
};
use crate::rect::DirtyRect;
use crate::util::{FiniteF32Error, PositiveF32};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleError {
    #[error("invalid pen width: {0}")]
    Width(FiniteF32Error),
    #[error("invalid pen color: {0}")]
    Color(FiniteF32Error),
}

/// Pen settings, fixed for the lifetime of a stroke.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct StrokeStyle {
    pub color: Color,
    width: PositiveF32,
    /// Modulate width by pressure.
    pub use_force: bool,
    /// Render stylus strokes with the tilt-shaped nib.
    pub use_shading: bool,
}
impl StrokeStyle {
    pub fn new(
        color: Color,
        width: f32,
        use_force: bool,
        use_shading: bool,
    ) -> Result<Self, StyleError> {
        Ok(Self {
            color,
            width: PositiveF32::new(width).map_err(StyleError::Width)?,
            use_force,
            use_shading,
        })
    }
    #[must_use]
    pub fn width(&self) -> f32 {
        self.width.get()
    }
    /// Width of a segment drawn with the given filtered magnitude.
    #[must_use]
    pub fn line_width(&self, magnitude: f32) -> f32 {
        if self.use_force {
            magnitude * self.width() * 2.0
        } else {
            self.width()
        }
    }
}
impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: PositiveF32::trusted(3.0),
            use_force: true,
            use_shading: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Stroke {
    style: StrokeStyle,
    /// Invariant: strictly increasing `sequence_number`.
    live: Vec<SamplePoint>,
    committed: Vec<SamplePoint>,
    /// Every entry refers to a point in `live`.
    pending: EstimationTracker,
}
impl Stroke {
    #[must_use]
    pub fn new(style: StrokeStyle) -> Self {
        Self {
            style,
            live: Vec::new(),
            committed: Vec::new(),
            pending: EstimationTracker::default(),
        }
    }
    #[must_use]
    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }
    #[must_use]
    pub fn live_points(&self) -> &[SamplePoint] {
        &self.live
    }
    #[must_use]
    pub fn committed_points(&self) -> &[SamplePoint] {
        &self.committed
    }
    /// No live point awaits an estimation update.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
    /// Number of live points awaiting an update.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
    #[must_use]
    pub fn is_tracking(&self, key: EstimationKey) -> bool {
        self.pending.get(key).is_some()
    }
    /// Append a new live point. Returns the region covering it and the segment to its predecessor.
    pub fn append(&mut self, sample: &RawSample, flags: PointFlags) -> DirtyRect {
        let previous = self.live.last();
        let sequence_number = previous.map_or(0, |prev| prev.sequence_number + 1);
        let point = SamplePoint::new(sample, sequence_number, flags);
        let rect = self.rect_for_segment(&point, previous);

        self.pending.track(&point);
        self.live.push(point);
        rect
    }
    /// Drop every live point carrying all of `flags`, returning the region their segments covered.
    pub fn remove_points_with_type(&mut self, flags: PointFlags) -> DirtyRect {
        let mut rect = DirtyRect::NULL;
        let old = std::mem::take(&mut self.live);
        let mut prior: Option<&SamplePoint> = None;
        let mut kept = Vec::with_capacity(old.len());

        for point in &old {
            if point.flags.contains(flags) {
                let mut stale = self.rect_for_point(point);
                if let Some(prior) = prior {
                    stale.union_assign(self.rect_for_point(prior));
                }
                rect.union_assign(stale);
                if let Some(key) = point.estimation_key {
                    // Never to be reconciled.
                    self.pending.forget(key);
                }
            } else {
                kept.push(point.clone());
            }
            prior = Some(point);
        }
        self.live = kept;
        rect
    }
    /// Apply an estimation update to the live point it belongs to.
    ///
    /// Returns whether anything was applied, and the region covering the point's
    /// neighborhood both before and after the change.
    pub fn reconcile_touch(&mut self, update: &EstimationUpdate) -> (bool, DirtyRect) {
        let Some(sequence_number) = self.pending.get(update.key) else {
            return (false, DirtyRect::NULL);
        };
        let Some(idx) = self.index_of(sequence_number) else {
            log::trace!("estimation key {:?} refers to a vanished point", update.key);
            self.pending.forget(update.key);
            return (false, DirtyRect::NULL);
        };

        let before = self.rect_for_existing(idx);
        let changed = self.live[idx].reconcile(update);
        let after = self.rect_for_existing(idx);

        if self.live[idx].pending_update.is_empty() {
            self.pending.forget(update.key);
        }
        (changed, before.union(after))
    }
    /// Flag every live point as cancelled. Points are kept, to be finalized by the caller.
    pub fn cancel(&mut self) -> DirtyRect {
        // Cancelled points will never be reconciled.
        self.pending.clear();
        let mut rect = DirtyRect::NULL;
        for idx in 0..self.live.len() {
            self.live[idx].flags.insert(PointFlags::CANCELLED);
            rect.union_assign(self.rect_for_point(&self.live[idx]));
        }
        rect
    }
    /// Discard all outstanding estimates, committing whatever values are present.
    pub fn abandon_estimates(&mut self) {
        self.pending.clear();
    }
    /// Move every live point into the committed history. Returns the region they covered.
    ///
    /// The stroke must be complete, as points still awaiting updates would be committed stale.
    pub fn finalize(&mut self) -> DirtyRect {
        debug_assert!(
            self.is_complete(),
            "finalized a stroke with {} points awaiting updates",
            self.pending.len()
        );
        let rect = self.live_bounds();
        self.committed.append(&mut self.live);
        rect
    }
    /// The region covered by every live segment.
    #[must_use]
    pub fn live_bounds(&self) -> DirtyRect {
        let mut prior = None;
        self.live
            .iter()
            .map(|point| {
                let rect = self.rect_for_segment(point, prior);
                prior = Some(point);
                rect
            })
            .collect()
    }
    /// Draw the live points into `target`.
    pub fn draw_live(&self, target: &mut tiny_skia::PixmapMut, transform: tiny_skia::Transform) {
        crate::raster::draw_points(target, transform, &self.style, &self.live);
    }
    /// Draw only the committed points into `target`.
    pub fn draw_frozen(&self, target: &mut tiny_skia::PixmapMut, transform: tiny_skia::Transform) {
        crate::raster::draw_points(target, transform, &self.style, &self.committed);
    }

    fn index_of(&self, sequence_number: u64) -> Option<usize> {
        self.live
            .binary_search_by_key(&sequence_number, |point| point.sequence_number)
            .ok()
    }
    /// Halo around a lone point.
    fn rect_for_point(&self, point: &SamplePoint) -> DirtyRect {
        DirtyRect::from_point(point.location).outset(3.0 * self.style.width() + 2.0)
    }
    /// Halo around a point and the segment joining it to `previous`.
    fn rect_for_segment(&self, point: &SamplePoint, previous: Option<&SamplePoint>) -> DirtyRect {
        let mut rect = DirtyRect::from_point(point.location);
        let mut magnitude = self.style.width();
        if let Some(previous) = previous {
            magnitude = magnitude.max(previous.magnitude());
            rect.union_assign(DirtyRect::from_point(previous.location));
        }
        rect.outset(3.0 * magnitude + 2.0)
    }
    /// Halo around a live point and both segments touching it.
    fn rect_for_existing(&self, idx: usize) -> DirtyRect {
        let point = &self.live[idx];
        let mut rect = self.rect_for_point(point);
        if let Some(previous) = idx.checked_sub(1).and_then(|prev| self.live.get(prev)) {
            rect.union_assign(self.rect_for_segment(point, Some(previous)));
        }
        if let Some(next) = self.live.get(idx + 1) {
            rect.union_assign(self.rect_for_segment(point, Some(next)));
        }
        rect
    }
}
