use crate::color::Rgb;
use crate::font::{drawable_chars, TextBounds};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use ttf_parser::{Face, GlyphId};

/// Average advance, in ems, used when glyph metrics are unavailable.
const APPROX_ADVANCE_EM: f32 = 0.6;
/// Approximate cap height, in ems, for the same case.
const APPROX_HEIGHT_EM: f32 = 0.7;

/// Raw font file contents, validated to parse as a face.
pub struct FaceData {
    pub path: PathBuf,
    pub data: Vec<u8>,
    pub index: u32,
}

impl FaceData {
    /// Read and validate a font file. Returns `None` if it cannot be read or
    /// is not a usable face.
    pub fn load(path: &Path) -> Option<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read font file");
                return None;
            }
        };
        match Face::parse(&data, 0) {
            Ok(face) if face.units_per_em() > 0 => {}
            Ok(_) => {
                tracing::debug!(path = %path.display(), "Font has zero units per em");
                return None;
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Not a usable font file");
                return None;
            }
        }
        Some(Self {
            path: path.to_path_buf(),
            data,
            index: 0,
        })
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.index).ok()
    }
}

impl fmt::Debug for FaceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceData")
            .field("path", &self.path)
            .field("bytes", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

struct PlacedGlyph {
    id: GlyphId,
    pen_x: f32,
}

/// A scalable face at a fixed pixel size.
#[derive(Debug, Clone)]
pub struct OutlineFont {
    face: Arc<FaceData>,
    size: f32,
}

impl OutlineFont {
    pub fn new(face: Arc<FaceData>, size: f32) -> Self {
        Self { face, size }
    }

    pub fn path(&self) -> &Path {
        &self.face.path
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    fn scale(&self, face: &Face<'_>) -> f32 {
        self.size / f32::from(face.units_per_em())
    }

    /// Left-to-right layout with horizontal advances, no kerning.
    fn layout(&self, face: &Face<'_>, text: &str) -> Vec<PlacedGlyph> {
        let scale = self.scale(face);
        let mut pen_x = 0.0;
        let mut glyphs = Vec::with_capacity(text.len());
        for c in drawable_chars(text) {
            let id = face.glyph_index(c).unwrap_or(GlyphId(0));
            glyphs.push(PlacedGlyph { id, pen_x });
            pen_x += f32::from(face.glyph_hor_advance(id).unwrap_or(0)) * scale;
        }
        glyphs
    }

    /// Exact ink box relative to the pen start on the baseline.
    pub fn measure(&self, text: &str) -> TextBounds {
        let Some(face) = self.face.face() else {
            return self.approximate(text);
        };
        let scale = self.scale(&face);

        let mut ink: Option<(f32, f32, f32, f32)> = None;
        for glyph in self.layout(&face, text) {
            let Some(bbox) = face.glyph_bounding_box(glyph.id) else {
                continue;
            };
            let left = glyph.pen_x + f32::from(bbox.x_min) * scale;
            let right = glyph.pen_x + f32::from(bbox.x_max) * scale;
            let top = -f32::from(bbox.y_max) * scale;
            let bottom = -f32::from(bbox.y_min) * scale;
            ink = Some(match ink {
                None => (left, top, right, bottom),
                Some((l, t, r, b)) => (l.min(left), t.min(top), r.max(right), b.max(bottom)),
            });
        }

        match ink {
            Some((left, top, right, bottom)) => TextBounds {
                left,
                top,
                width: right - left,
                height: bottom - top,
                exact: true,
            },
            None => TextBounds::EMPTY,
        }
    }

    fn approximate(&self, text: &str) -> TextBounds {
        let count = drawable_chars(text).count();
        if count == 0 {
            return TextBounds::EMPTY;
        }
        let height = self.size * APPROX_HEIGHT_EM;
        TextBounds {
            left: 0.0,
            top: -height,
            width: count as f32 * self.size * APPROX_ADVANCE_EM,
            height,
            exact: false,
        }
    }

    /// Fill the glyph outlines with the pen starting at `(x, y)` on the baseline.
    pub fn draw(&self, pixmap: &mut Pixmap, text: &str, x: f32, y: f32, color: Rgb) {
        let Some(face) = self.face.face() else {
            tracing::warn!(path = %self.face.path.display(), "Font face no longer parses, text skipped");
            return;
        };
        let scale = self.scale(&face);

        let mut builder = GlyphOutlineBuilder::new(scale, x, y);
        for glyph in self.layout(&face, text) {
            builder.x_offset = x + glyph.pen_x;
            face.outline_glyph(glyph.id, &mut builder);
        }
        let Some(path) = builder.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, 255);
        paint.anti_alias = true;
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

/// Maps font units (y up) into pixmap space (y down).
struct GlyphOutlineBuilder {
    builder: PathBuilder,
    scale: f32,
    x_offset: f32,
    y_offset: f32,
}

impl GlyphOutlineBuilder {
    fn new(scale: f32, x_offset: f32, y_offset: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            scale,
            x_offset,
            y_offset,
        }
    }

    #[inline]
    fn tx(&self, x: f32) -> f32 {
        x * self.scale + self.x_offset
    }

    #[inline]
    fn ty(&self, y: f32) -> f32 {
        self.y_offset - y * self.scale
    }

    fn finish(self) -> Option<tiny_skia::Path> {
        self.builder.finish()
    }
}

impl ttf_parser::OutlineBuilder for GlyphOutlineBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(self.tx(x), self.ty(y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(self.tx(x), self.ty(y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder
            .quad_to(self.tx(x1), self.ty(y1), self.tx(x), self.ty(y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.tx(x1),
            self.ty(y1),
            self.tx(x2),
            self.ty(y2),
            self.tx(x),
            self.ty(y),
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
