#![warn(clippy::pedantic)]

pub mod canvas;
pub mod color;
pub mod point;
pub mod raster;
pub mod rect;
pub mod router;
pub mod stroke;
pub mod text;
pub mod util;

pub use canvas::{FrozenCanvas, Persist, Snapshot};
pub use router::{ContactFrame, ContactId, StrokeSessionRouter};
pub use stroke::{Stroke, StrokeStyle};
