//! Compositor: template decoding, text drawing and PNG encoding.

use crate::color::Rgb;
use crate::error::RenderFailure;
use crate::font::FontHandle;
use crate::placement::Origin;
use std::io::Cursor;
use tiny_skia::{Color, ColorU8, IntSize, Pixmap, PixmapPaint, Transform};

/// A decoded template being drawn on.
pub struct Canvas {
    pixmap: Pixmap,
    has_alpha: bool,
}

impl Canvas {
    /// Decode PNG or JPEG bytes into a premultiplied RGBA canvas.
    pub fn from_template_bytes(bytes: &[u8]) -> Result<Self, RenderFailure> {
        let image =
            image::load_from_memory(bytes).map_err(|e| RenderFailure::Decode(e.to_string()))?;
        let has_alpha = image.color().has_alpha();
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut data = rgba.into_raw();
        for px in data.chunks_exact_mut(4) {
            let c = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
            px.copy_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }

        let pixmap = IntSize::from_wh(width, height)
            .and_then(|size| Pixmap::from_vec(data, size))
            .ok_or(RenderFailure::Canvas { width, height })?;

        Ok(Self { pixmap, has_alpha })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Whether the template had an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Draw `text` so its ink box starts at `origin`.
    pub fn draw_text(&mut self, text: &str, origin: &Origin, color: Rgb, font: &FontHandle) {
        let x = origin.x - origin.bounds.left;
        let y = origin.y - origin.bounds.top;
        font.draw(&mut self.pixmap, text, x, y, color);
    }

    /// Flatten onto white if needed and encode as an 8-bit RGB PNG.
    pub fn into_png(self) -> Result<Vec<u8>, RenderFailure> {
        let (width, height) = (self.width(), self.height());
        let pixmap = if self.has_alpha {
            flatten_on_white(&self.pixmap)?
        } else {
            self.pixmap
        };

        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for px in pixmap.pixels() {
            let c = px.demultiply();
            rgb.extend_from_slice(&[c.red(), c.green(), c.blue()]);
        }

        encode_rgb_png(width, height, &rgb)
    }
}

fn flatten_on_white(layer: &Pixmap) -> Result<Pixmap, RenderFailure> {
    let mut background =
        Pixmap::new(layer.width(), layer.height()).ok_or(RenderFailure::Canvas {
            width: layer.width(),
            height: layer.height(),
        })?;
    background.fill(Color::WHITE);
    background.draw_pixmap(
        0,
        0,
        layer.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(background)
}

fn encode_rgb_png(width: u32, height: u32, rgb: &[u8]) -> Result<Vec<u8>, RenderFailure> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| RenderFailure::Encode(e.to_string()))?;
        writer
            .write_image_data(rgb)
            .map_err(|e| RenderFailure::Encode(e.to_string()))?;
    }
    Ok(buf.into_inner())
}
