//! # Invalidation rectangles
//!
//! Every mutation of a stroke reports the smallest axis-aligned region that must be
//! repainted. Rectangles combine by union, with [`DirtyRect::NULL`] as the identity.

use ultraviolet::Vec2;

/// Closed axis-aligned bounds. Zero-size bounds are allowed and represent a single point.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}
impl Bounds {
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

/// An invalidation rectangle, or the null rectangle which covers nothing.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct DirtyRect(Option<Bounds>);
impl DirtyRect {
    pub const NULL: Self = Self(None);
    /// A zero-size rectangle at `point`.
    #[must_use]
    pub fn from_point(point: Vec2) -> Self {
        Self(Some(Bounds {
            min: point,
            max: point,
        }))
    }
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.0
    }
    #[must_use = "returns a new rect and does not modify `self`"]
    pub fn union(self, other: Self) -> Self {
        match (self.0, other.0) {
            (None, other) | (other, None) => Self(other),
            (Some(a), Some(b)) => Self(Some(Bounds {
                min: a.min.min_by_component(b.min),
                max: a.max.max_by_component(b.max),
            })),
        }
    }
    pub fn union_assign(&mut self, other: Self) {
        *self = self.union(other);
    }
    /// Grow the rectangle by `margin` in every direction. The null rect stays null.
    #[must_use = "returns a new rect and does not modify `self`"]
    pub fn outset(self, margin: f32) -> Self {
        Self(self.0.map(|bounds| Bounds {
            min: bounds.min - Vec2::broadcast(margin),
            max: bounds.max + Vec2::broadcast(margin),
        }))
    }
    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        self.0.is_some_and(|bounds| {
            point.x >= bounds.min.x
                && point.x <= bounds.max.x
                && point.y >= bounds.min.y
                && point.y <= bounds.max.y
        })
    }
    /// Does `self` cover every part of `other`? Everything contains the null rect.
    #[must_use]
    pub fn contains_rect(&self, other: &Self) -> bool {
        match other.0 {
            None => true,
            Some(other) => self.contains(other.min) && self.contains(other.max),
        }
    }
    /// Convert to a skia rect, `None` if null or degenerate.
    #[must_use]
    pub fn to_skia(&self) -> Option<tiny_skia::Rect> {
        let bounds = self.0?;
        tiny_skia::Rect::from_ltrb(bounds.min.x, bounds.min.y, bounds.max.x, bounds.max.y)
    }
}
impl FromIterator<DirtyRect> for DirtyRect {
    fn from_iter<T: IntoIterator<Item = DirtyRect>>(iter: T) -> Self {
        iter.into_iter().fold(Self::NULL, Self::union)
    }
}

/// What the host should repaint.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Redraw {
    Nothing,
    Region(Bounds),
    /// The whole surface changed, such as after a clear.
    Full,
}

/// Accumulates invalidation across many mutations until the host takes it.
#[derive(Clone, Debug, Default)]
pub struct DirtyRegion {
    rect: DirtyRect,
    everything: bool,
}
impl DirtyRegion {
    pub fn invalidate(&mut self, rect: DirtyRect) {
        self.rect.union_assign(rect);
    }
    pub fn invalidate_all(&mut self) {
        self.everything = true;
    }
    /// The rectangle accumulated so far, ignoring full invalidation.
    #[must_use]
    pub fn rect(&self) -> DirtyRect {
        self.rect
    }
    /// Yield the pending redraw and reset to nothing.
    pub fn take(&mut self) -> Redraw {
        let taken = std::mem::take(self);
        if taken.everything {
            Redraw::Full
        } else {
            taken
                .rect
                .bounds()
                .map_or(Redraw::Nothing, Redraw::Region)
        }
    }
}

#[cfg(test)]
mod test {
    use super::{DirtyRect, DirtyRegion, Redraw};
    use ultraviolet::Vec2;
    #[test]
    fn null_is_identity() {
        let rect = DirtyRect::from_point(Vec2::new(1.0, 2.0)).outset(3.0);
        assert_eq!(rect.union(DirtyRect::NULL), rect);
        assert_eq!(DirtyRect::NULL.union(rect), rect);
        assert!(DirtyRect::NULL.outset(10.0).is_null());
    }
    #[test]
    fn union_covers_both() {
        let a = DirtyRect::from_point(Vec2::new(0.0, 0.0));
        let b = DirtyRect::from_point(Vec2::new(10.0, -5.0));
        let both = a.union(b);
        let bounds = both.bounds().unwrap();
        assert_eq!(bounds.min, Vec2::new(0.0, -5.0));
        assert_eq!(bounds.max, Vec2::new(10.0, 0.0));
        assert!(both.contains_rect(&a));
        assert!(both.contains_rect(&b));
        assert!(both.contains(Vec2::new(5.0, -2.5)));
    }
    #[test]
    fn outset_grows_every_side() {
        let rect = DirtyRect::from_point(Vec2::new(10.0, 10.0)).outset(20.0);
        let bounds = rect.bounds().unwrap();
        assert_eq!(bounds.width(), 40.0);
        assert_eq!(bounds.height(), 40.0);
        assert!(rect.contains(Vec2::new(-10.0, 30.0)));
        assert!(!rect.contains(Vec2::new(-10.1, 30.0)));
    }
    #[test]
    fn collect_unions() {
        let rect: DirtyRect = [1.0, 4.0, -2.0]
            .into_iter()
            .map(|x| DirtyRect::from_point(Vec2::new(x, x)))
            .collect();
        let bounds = rect.bounds().unwrap();
        assert_eq!(bounds.min, Vec2::new(-2.0, -2.0));
        assert_eq!(bounds.max, Vec2::new(4.0, 4.0));
    }
    #[test]
    fn region_take_resets() {
        let mut region = DirtyRegion::default();
        assert_eq!(region.take(), Redraw::Nothing);

        region.invalidate(DirtyRect::from_point(Vec2::new(3.0, 3.0)));
        assert!(matches!(region.take(), Redraw::Region(_)));
        assert_eq!(region.take(), Redraw::Nothing);

        region.invalidate(DirtyRect::from_point(Vec2::new(3.0, 3.0)));
        region.invalidate_all();
        assert_eq!(region.take(), Redraw::Full);
        assert_eq!(region.take(), Redraw::Nothing);
    }
}
