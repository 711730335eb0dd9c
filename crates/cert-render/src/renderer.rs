use crate::catalog;
use crate::color::parse_hex_color;
use crate::compositor::Canvas;
use crate::error::RenderFailure;
use crate::font::FontResolver;
use crate::placement::{clamp_percent, compute_origin};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

pub const MIN_FONT_SIZE: u32 = 8;
pub const MAX_FONT_SIZE: u32 = 200;

/// Where and how the name is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementSpec {
    /// Horizontal centre of the name, percent of template width.
    pub x_percent: f32,
    /// Vertical centre of the name, percent of template height.
    pub y_percent: f32,
    /// Pixel size, clamped to `MIN_FONT_SIZE..=MAX_FONT_SIZE` at render time.
    pub font_size: u32,
    /// `#RRGGBB`; malformed values draw black.
    pub font_color: String,
    /// Catalog key or alias; unknown keys use the default font.
    pub font_key: String,
}

impl Default for PlacementSpec {
    fn default() -> Self {
        Self {
            x_percent: 50.0,
            y_percent: 50.0,
            font_size: 36,
            font_color: "#000000".to_string(),
            font_key: catalog::DEFAULT_FONT_KEY.to_string(),
        }
    }
}

impl PlacementSpec {
    /// Copy with every field forced into its valid range.
    pub fn sanitized(&self) -> Self {
        Self {
            x_percent: clamp_percent(self.x_percent),
            y_percent: clamp_percent(self.y_percent),
            font_size: self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
            font_color: parse_hex_color(&self.font_color).to_hex(),
            font_key: catalog::canonical_key(&self.font_key).to_string(),
        }
    }
}

/// Template input for a render.
#[derive(Debug, Clone, Copy)]
pub enum TemplateSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

/// A finished certificate: PNG bytes plus dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCertificate {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl RenderedCertificate {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn content_type(&self) -> &'static str {
        "image/png"
    }
}

pub type RenderOutcome = Result<RenderedCertificate, RenderFailure>;

/// Renders names onto certificate templates.
///
/// Cheap to clone and safe to share between threads; the only shared state
/// is the resolver's font cache.
#[derive(Debug, Clone)]
pub struct CertificateRenderer {
    fonts: Arc<FontResolver>,
}

impl CertificateRenderer {
    pub fn new(fonts: FontResolver) -> Self {
        Self {
            fonts: Arc::new(fonts),
        }
    }

    pub fn with_shared_fonts(fonts: Arc<FontResolver>) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontResolver {
        &self.fonts
    }

    /// Render `name` onto `template`.
    ///
    /// Never panics: any panic inside the pipeline is caught and returned as
    /// [`RenderFailure::Internal`]. Failures are logged at error level.
    pub fn render(
        &self,
        template: TemplateSource<'_>,
        name: &str,
        placement: &PlacementSpec,
    ) -> RenderOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.render_inner(template, name, placement)
        }))
        .unwrap_or_else(|payload| Err(RenderFailure::Internal(panic_message(&*payload))));

        if let Err(failure) = &result {
            tracing::error!(
                error = %failure,
                template = %template_label(template),
                font = %placement.font_key,
                "Certificate render failed"
            );
        }
        result
    }

    /// Render and write the PNG to `output`.
    ///
    /// Nothing is written unless rendering succeeded.
    pub fn render_file(
        &self,
        template: &Path,
        name: &str,
        placement: &PlacementSpec,
        output: &Path,
    ) -> Result<RenderedCertificate, RenderFailure> {
        let certificate = self.render(TemplateSource::Path(template), name, placement)?;
        std::fs::write(output, certificate.as_bytes()).map_err(|source| {
            tracing::error!(path = %output.display(), error = %source, "Failed to write certificate");
            RenderFailure::Output {
                path: output.to_path_buf(),
                source,
            }
        })?;
        Ok(certificate)
    }

    fn render_inner(
        &self,
        template: TemplateSource<'_>,
        name: &str,
        placement: &PlacementSpec,
    ) -> RenderOutcome {
        let owned;
        let bytes = match template {
            TemplateSource::Path(path) => {
                owned = read_template(path)?;
                owned.as_slice()
            }
            TemplateSource::Bytes(bytes) => bytes,
        };

        let mut canvas = Canvas::from_template_bytes(bytes)?;
        let (width, height) = (canvas.width(), canvas.height());

        let size = placement.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        let font = self.fonts.resolve(&placement.font_key, size as f32);
        let color = parse_hex_color(&placement.font_color);
        let origin = compute_origin(
            name,
            &font,
            placement.x_percent,
            placement.y_percent,
            width,
            height,
        );

        tracing::debug!(
            width,
            height,
            x = origin.x,
            y = origin.y,
            font = %font.source(),
            size,
            "Drawing name"
        );
        canvas.draw_text(name, &origin, color, &font);

        let bytes = canvas.into_png()?;
        Ok(RenderedCertificate {
            bytes,
            width,
            height,
        })
    }
}

fn read_template(path: &Path) -> Result<Vec<u8>, RenderFailure> {
    std::fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            RenderFailure::TemplateMissing {
                path: path.to_path_buf(),
            }
        } else {
            RenderFailure::TemplateUnreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn template_label(template: TemplateSource<'_>) -> String {
    match template {
        TemplateSource::Path(path) => path.display().to_string(),
        TemplateSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic during rendering".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_defaults() {
        let spec = PlacementSpec::default();
        assert_eq!((spec.x_percent, spec.y_percent), (50.0, 50.0));
        assert_eq!(spec.font_size, 36);
        assert_eq!(spec.font_color, "#000000");
        assert_eq!(spec.font_key, "arial");
    }

    #[test]
    fn test_sanitized() {
        let spec = PlacementSpec {
            x_percent: -3.0,
            y_percent: f32::NAN,
            font_size: 500,
            font_color: "nope".to_string(),
            font_key: "TIRO".to_string(),
        }
        .sanitized();
        assert_eq!((spec.x_percent, spec.y_percent), (0.0, 50.0));
        assert_eq!(spec.font_size, MAX_FONT_SIZE);
        assert_eq!(spec.font_color, "#000000");
        assert_eq!(spec.font_key, "times");

        let small = PlacementSpec {
            font_size: 1,
            ..PlacementSpec::default()
        };
        assert_eq!(small.sanitized().font_size, MIN_FONT_SIZE);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*payload), "panic during rendering");
    }

    #[test]
    fn test_missing_template_is_reported() {
        let renderer = CertificateRenderer::new(FontResolver::with_search_dirs(vec![]));
        let err = renderer
            .render(
                TemplateSource::Path(Path::new("/nonexistent/template.png")),
                "Jane",
                &PlacementSpec::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RenderFailure::TemplateMissing { .. }));
    }
}
