//! Small numeric helpers shared by styles, samples, and rasterization.

/// A float which is neither NaN nor infinite.
#[derive(Copy, Clone, PartialEq, PartialOrd, bytemuck::NoUninit, bytemuck::Zeroable, Debug)]
#[repr(transparent)]
pub struct FiniteF32(f32);
impl FiniteF32 {
    pub const ZERO: Self = Self(0.0);
    pub const ONE: Self = Self(1.0);
    pub fn new(val: f32) -> Result<Self, FiniteF32Error> {
        if val.is_finite() {
            Ok(Self(val))
        } else {
            Err(FiniteF32Error::NotFinite)
        }
    }
    #[must_use]
    pub fn get(self) -> f32 {
        self.0
    }
}
impl Default for FiniteF32 {
    fn default() -> Self {
        Self::ZERO
    }
}
impl TryFrom<f32> for FiniteF32 {
    type Error = FiniteF32Error;
    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
impl From<FiniteF32> for f32 {
    fn from(value: FiniteF32) -> Self {
        value.get()
    }
}

/// A finite float strictly greater than zero. Used for pen widths.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug)]
#[repr(transparent)]
pub struct PositiveF32(FiniteF32);
impl PositiveF32 {
    pub fn new(val: f32) -> Result<Self, FiniteF32Error> {
        let finite = FiniteF32::new(val)?;
        if finite.get() > 0.0 {
            Ok(Self(finite))
        } else {
            Err(FiniteF32Error::NotPositive)
        }
    }
    /// For compile-time constants. `val` must be a positive, finite literal.
    pub(crate) const fn trusted(val: f32) -> Self {
        Self(FiniteF32(val))
    }
    #[must_use]
    pub fn get(self) -> f32 {
        self.0.get()
    }
}
impl TryFrom<f32> for PositiveF32 {
    type Error = FiniteF32Error;
    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiniteF32Error {
    #[error("not finite")]
    NotFinite,
    #[error("not greater than zero")]
    NotPositive,
}

/// Rotate `v` counter-clockwise (in a y-up frame) by `angle` radians.
/// In the y-down display frame this reads as clockwise, matching affine rotation of the surface.
#[must_use]
pub fn rotate(v: ultraviolet::Vec2, angle: f32) -> ultraviolet::Vec2 {
    let (sin, cos) = angle.sin_cos();
    ultraviolet::Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}
