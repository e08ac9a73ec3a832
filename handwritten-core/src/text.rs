//! # Text stamping
//!
//! Rasterizes a string straight into the frozen canvas, horizontally centered and hanging
//! from the top edge. This is a convenience for showing a reference glyph, not part of
//! the stroke pipeline.

use rustybuzz::ttf_parser;

use crate::canvas::FrozenCanvas;

/// Logical size of stamped text.
pub const STAMP_FONT_SIZE: f32 = 200.0;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextError {
    #[error("no usable font face")]
    NoFace,
    #[error("font face failed to parse")]
    BadFace,
}

/// Location of fonts bundled by the user for this application, loaded alongside system fonts.
#[must_use]
pub fn local_fonts() -> Option<std::path::PathBuf> {
    let mut data = dirs::data_dir()?;
    data.push("handwritten");
    data.push("fonts");
    Some(data)
}

/// The set of font faces text can be stamped with.
pub struct Faces {
    db: fontdb::Database,
}
impl Faces {
    /// Faces from the system font folders, plus [`local_fonts`].
    #[must_use]
    pub fn new_system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        if let Some(locals) = local_fonts() {
            // May not exist, that's fine.
            db.load_fonts_dir(locals);
        }
        if db.is_empty() {
            log::warn!("no font faces found, text stamping is unavailable");
        }
        Self { db }
    }
    /// No faces at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            db: fontdb::Database::new(),
        }
    }
    /// Add a face from raw font file data.
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
    /// A sans-serif face, or any face at all.
    fn pick(&self) -> Option<fontdb::ID> {
        let query = fontdb::Query {
            families: &[fontdb::Family::SansSerif],
            weight: fontdb::Weight::NORMAL,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };
        self.db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|face| face.id))
    }
}

/// Adapts glyph outlines in font units into a display-space path.
struct GlyphPath {
    builder: tiny_skia::PathBuilder,
    scale: f32,
    /// Display-space position of the glyph origin.
    origin: (f32, f32),
}
impl GlyphPath {
    // Font space is y-up, display space is y-down.
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin.0 + x * self.scale, self.origin.1 - y * self.scale)
    }
}
impl ttf_parser::OutlineBuilder for GlyphPath {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }
    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }
    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }
    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }
    fn close(&mut self) {
        self.builder.close();
    }
}

/// Shape `text` with the face in `data` and lay it out centered across `width` logical units.
fn layout(data: &[u8], index: u32, text: &str, width: f32) -> Result<Option<tiny_skia::Path>, TextError> {
    let face = rustybuzz::Face::from_slice(data, index).ok_or(TextError::BadFace)?;
    let mut buffer = rustybuzz::UnicodeBuffer::new();
    buffer.push_str(text);
    let glyphs = rustybuzz::shape(&face, &[], buffer);

    let scale = STAMP_FONT_SIZE / face.units_per_em() as f32;
    let advance: i32 = glyphs.glyph_positions().iter().map(|pos| pos.x_advance).sum();
    let left = (width - advance as f32 * scale) / 2.0;
    let baseline = f32::from(face.ascender()) * scale;

    let mut path = GlyphPath {
        builder: tiny_skia::PathBuilder::new(),
        scale,
        origin: (left, baseline),
    };
    let mut pen = 0i32;
    for (info, pos) in glyphs.glyph_infos().iter().zip(glyphs.glyph_positions()) {
        path.origin = (
            left + (pen + pos.x_offset) as f32 * scale,
            baseline - pos.y_offset as f32 * scale,
        );
        if let Ok(glyph) = u16::try_from(info.glyph_id) {
            // Glyphs without outlines (spaces) just advance.
            let _ = face.outline_glyph(ttf_parser::GlyphId(glyph), &mut path);
        }
        pen += pos.x_advance;
    }
    Ok(path.builder.finish())
}

/// Stamp `text` in opaque black into the canvas.
pub fn stamp_text(canvas: &mut FrozenCanvas, text: &str, faces: &Faces) -> Result<(), TextError> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let id = faces.pick().ok_or(TextError::NoFace)?;
    let (width, _) = canvas.logical_size();
    let path = faces
        .db
        .with_face_data(id, |data, index| layout(data, index, text, width))
        .ok_or(TextError::NoFace)??;

    let Some(path) = path else {
        log::trace!("{text:?} has no outlines to stamp");
        return Ok(());
    };
    let mut paint = tiny_skia::Paint::default();
    paint.set_color(tiny_skia::Color::BLACK);
    paint.anti_alias = true;
    canvas.with_surface(|surface, transform| {
        surface.fill_path(&path, &paint, tiny_skia::FillRule::Winding, transform, None);
    });
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{stamp_text, Faces, TextError};
    use crate::canvas::FrozenCanvas;

    #[test]
    fn no_faces() {
        let mut canvas = FrozenCanvas::new(64.0, 64.0, 1.0).unwrap();
        let faces = Faces::empty();
        assert!(faces.is_empty());
        assert_eq!(stamp_text(&mut canvas, "あ", &faces), Err(TextError::NoFace));
        assert!(!canvas.is_touched());
    }
    #[test]
    fn blank_text_is_noop() {
        let mut canvas = FrozenCanvas::new(64.0, 64.0, 1.0).unwrap();
        assert_eq!(stamp_text(&mut canvas, "  \n", &Faces::empty()), Ok(()));
        assert!(!canvas.is_touched());
    }
    /// A common outline font, if this machine has one.
    fn any_font() -> Option<Vec<u8>> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ]
        .iter()
        .find_map(|path| std::fs::read(path).ok())
    }
    #[test]
    fn stamp_is_centered_and_hangs_from_top() {
        let Some(data) = any_font() else {
            return;
        };
        let mut faces = Faces::empty();
        faces.load_font_data(data);
        let mut canvas = FrozenCanvas::new(400.0, 300.0, 1.0).unwrap();
        assert_eq!(stamp_text(&mut canvas, "H", &faces), Ok(()));
        assert!(canvas.is_touched());

        let pixmap = canvas.pixmap();
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (u32::MAX, 0, u32::MAX, 0);
        for y in 0..pixmap.height() {
            for x in 0..pixmap.width() {
                if pixmap.pixel(x, y).is_some_and(|px| px.alpha() > 128) {
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                    min_y = min_y.min(y);
                    max_y = max_y.max(y);
                }
            }
        }
        assert!(min_x <= max_x, "nothing inked");
        let center = (min_x + max_x) as f32 / 2.0;
        assert!((center - 200.0).abs() < 12.0, "centered at {center}");
        // Cap height of a 200 unit face, below the ascender line.
        assert!(max_x - min_x > 60);
        assert!(min_y > 5 && min_y < 90, "top at {min_y}");
        assert!(max_y < 250, "bottom at {max_y}");
    }
    #[test]
    fn garbage_font_is_no_face() {
        let mut faces = Faces::empty();
        faces.load_font_data(vec![0; 64]);
        // fontdb refuses to index it, so there is nothing to choose.
        let mut canvas = FrozenCanvas::new(64.0, 64.0, 1.0).unwrap();
        assert!(stamp_text(&mut canvas, "a", &faces).is_err());
    }
}
