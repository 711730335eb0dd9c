//! Font handles, measurement and glyph drawing.
//!
//! A [`FontHandle`] is what the [`FontResolver`] hands out: either a
//! TrueType/OpenType face loaded from disk, or the built-in bitmap font when no
//! candidate file could be found. Both variants measure text with the same
//! layout they use for drawing, so placement and rasterization always agree.

mod bitmap;
mod outline;
mod resolver;

pub use bitmap::BitmapFont;
pub use outline::{FaceData, OutlineFont};
pub use resolver::{system_font_dirs, FontResolver};

use crate::color::Rgb;
use std::fmt;
use std::path::PathBuf;
use tiny_skia::Pixmap;

/// Ink bounding box of a laid-out string.
///
/// `left`/`top` are offsets of the box relative to the drawing origin passed
/// to [`FontHandle::draw`]. For outline fonts the drawing origin is the pen
/// position on the baseline, so `top` is usually negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBounds {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// False when the box was estimated from character count instead of glyph metrics.
    pub exact: bool,
}

impl TextBounds {
    /// Bounds of a string that produces no ink.
    pub const EMPTY: TextBounds = TextBounds {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
        exact: true,
    };

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Where a font handle's glyphs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    File(PathBuf),
    Builtin,
}

impl fmt::Display for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::File(path) => write!(f, "{}", path.display()),
            FontSource::Builtin => f.write_str("built-in bitmap font"),
        }
    }
}

/// A font ready for measuring and drawing at a fixed size.
#[derive(Debug, Clone)]
pub enum FontHandle {
    Outline(OutlineFont),
    Bitmap(BitmapFont),
}

impl FontHandle {
    /// Measure the ink box of `text`.
    pub fn measure(&self, text: &str) -> TextBounds {
        match self {
            FontHandle::Outline(font) => font.measure(text),
            FontHandle::Bitmap(font) => font.measure(text),
        }
    }

    /// Draw `text` with its drawing origin at `(x, y)`.
    pub fn draw(&self, pixmap: &mut Pixmap, text: &str, x: f32, y: f32, color: Rgb) {
        match self {
            FontHandle::Outline(font) => font.draw(pixmap, text, x, y, color),
            FontHandle::Bitmap(font) => font.draw(pixmap, text, x, y, color),
        }
    }

    /// True for the built-in bitmap font.
    pub fn is_fallback(&self) -> bool {
        matches!(self, FontHandle::Bitmap(_))
    }

    pub fn source(&self) -> FontSource {
        match self {
            FontHandle::Outline(font) => FontSource::File(font.path().to_path_buf()),
            FontHandle::Bitmap(_) => FontSource::Builtin,
        }
    }

    /// Effective pixel size. The bitmap font ignores the requested size.
    pub fn size(&self) -> f32 {
        match self {
            FontHandle::Outline(font) => font.size(),
            FontHandle::Bitmap(font) => font.cell_height() as f32,
        }
    }
}

/// Characters that take part in layout. Control characters (including
/// newlines) are dropped; names are drawn on a single line.
pub(crate) fn drawable_chars(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().filter(|c| !c.is_control())
}
