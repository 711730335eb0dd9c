//! Placement: turn percentage coordinates into a pixel origin for the text.

use crate::font::{FontHandle, TextBounds};

/// Top-left corner of the text's ink box, in template pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Origin {
    pub x: f32,
    pub y: f32,
    /// The measurement the origin was computed from.
    pub bounds: TextBounds,
}

/// Clamp a percentage into `[0, 100]`. NaN and infinities become 50.
pub fn clamp_percent(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        50.0
    }
}

/// The anchor point `(x%, y%)` resolves to on a `width` x `height` template.
pub fn anchor(x_percent: f32, y_percent: f32, width: u32, height: u32) -> (f32, f32) {
    (
        clamp_percent(x_percent) / 100.0 * width as f32,
        clamp_percent(y_percent) / 100.0 * height as f32,
    )
}

/// Compute where the ink box of `text` starts so that it is centred on the anchor.
///
/// Empty or whitespace-only text has no ink, so the origin is the anchor itself.
pub fn compute_origin(
    text: &str,
    font: &FontHandle,
    x_percent: f32,
    y_percent: f32,
    width: u32,
    height: u32,
) -> Origin {
    let (ax, ay) = anchor(x_percent, y_percent, width, height);
    let bounds = font.measure(text);
    if !bounds.exact {
        tracing::debug!(text, "Using approximate text measurement");
    }
    Origin {
        x: ax - bounds.width / 2.0,
        y: ay - bounds.height / 2.0,
        bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{BitmapFont, FontResolver};
    use std::path::PathBuf;

    fn bundled() -> FontResolver {
        FontResolver::with_search_dirs(vec![PathBuf::from(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../fonts"
        ))])
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-5.0), 0.0);
        assert_eq!(clamp_percent(150.0), 100.0);
        assert_eq!(clamp_percent(33.5), 33.5);
        assert_eq!(clamp_percent(f32::NAN), 50.0);
        assert_eq!(clamp_percent(f32::INFINITY), 50.0);
    }

    #[test]
    fn test_anchor() {
        assert_eq!(anchor(50.0, 50.0, 1000, 600), (500.0, 300.0));
        assert_eq!(anchor(0.0, 100.0, 1000, 600), (0.0, 600.0));
        assert_eq!(anchor(200.0, -1.0, 1000, 600), (1000.0, 0.0));
    }

    #[test]
    fn test_origin_centres_ink_box() {
        let font = bundled().resolve("times", 36.0);
        let origin = compute_origin("Jane Doe", &font, 50.0, 50.0, 1000, 600);
        let cx = origin.x + origin.bounds.width / 2.0;
        let cy = origin.y + origin.bounds.height / 2.0;
        assert!((cx - 500.0).abs() <= 1.0);
        assert!((cy - 300.0).abs() <= 1.0);
        assert!(origin.bounds.exact);
    }

    #[test]
    fn test_empty_text_collapses_to_anchor() {
        let font = FontHandle::Bitmap(BitmapFont::default());
        let origin = compute_origin("", &font, 25.0, 75.0, 400, 200);
        assert_eq!((origin.x, origin.y), (100.0, 150.0));
    }

    #[test]
    fn test_bitmap_origin() {
        let font = FontHandle::Bitmap(BitmapFont::default());
        let origin = compute_origin("AB", &font, 50.0, 50.0, 100, 100);
        // "AB" is 22x14 at scale 2
        assert_eq!((origin.x, origin.y), (39.0, 43.0));
    }
}
