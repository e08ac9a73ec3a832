use crate::util::{FiniteF32, FiniteF32Error};

/// A straight (non-premultiplied) sRGB pen color, each channel in `[0, 1]`.
///
/// Strokes are rasterized opaque and the alpha is applied once for the
/// whole stroke, see [`crate::raster`].
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, bytemuck::Zeroable, Debug)]
pub struct Color([FiniteF32; 4]);
impl Color {
    pub const TRANSPARENT: Self = Self([FiniteF32::ZERO; 4]);
    pub const WHITE: Self = Self([FiniteF32::ONE; 4]);
    pub const BLACK: Self = Self([
        FiniteF32::ZERO,
        FiniteF32::ZERO,
        FiniteF32::ZERO,
        FiniteF32::ONE,
    ]);
    /// Create a color from straight channels. Channels are clamped into `[0, 1]`.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Result<Self, FiniteF32Error> {
        let channel = |c: f32| FiniteF32::new(c).map(|c| c.get().clamp(0.0, 1.0));
        Ok(Self([
            FiniteF32::new(channel(r)?)?,
            FiniteF32::new(channel(g)?)?,
            FiniteF32::new(channel(b)?)?,
            FiniteF32::new(channel(a)?)?,
        ]))
    }
    pub fn from_array([r, g, b, a]: [f32; 4]) -> Result<Self, FiniteF32Error> {
        Self::new(r, g, b, a)
    }
    #[must_use]
    pub fn as_array(&self) -> [f32; 4] {
        [
            self.0[0].get(),
            self.0[1].get(),
            self.0[2].get(),
            self.0[3].get(),
        ]
    }
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.0[3].get()
    }
    /// The same color with alpha forced to one.
    #[must_use = "returns a new color and does not modify `self`"]
    pub fn opaque(self) -> Self {
        let mut channels = self.0;
        channels[3] = FiniteF32::ONE;
        Self(channels)
    }
    #[must_use]
    pub fn to_skia(self) -> tiny_skia::Color {
        let [r, g, b, a] = self.as_array();
        // Channels are clamped on construction, so this always succeeds.
        tiny_skia::Color::from_rgba(r, g, b, a).unwrap_or(tiny_skia::Color::BLACK)
    }
}
impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}
