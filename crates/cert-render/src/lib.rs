//! cert-render: personalized certificate rendering
//!
//! Draws a participant name onto a certificate template image and returns
//! the result as an opaque RGB PNG.
//!
//! # Quick Start
//!
//! ```no_run
//! use cert_render::{CertificateRenderer, FontResolver, PlacementSpec, TemplateSource};
//! use std::path::Path;
//!
//! let renderer = CertificateRenderer::new(FontResolver::new("./fonts"));
//! let placement = PlacementSpec {
//!     font_key: "times".to_string(),
//!     font_color: "#FF0000".to_string(),
//!     ..PlacementSpec::default()
//! };
//!
//! match renderer.render(TemplateSource::Path(Path::new("template.png")), "Jane Doe", &placement) {
//!     Ok(certificate) => std::fs::write("out.png", certificate.as_bytes()).unwrap(),
//!     Err(failure) => eprintln!("no certificate: {failure}"),
//! }
//! ```
//!
//! # Pipeline
//!
//! ```text
//! template file/bytes
//!     |
//!     v
//! Canvas (RGBA, premultiplied)     <- compositor
//!     |
//!     +-- FontResolver::resolve     <- catalog key -> candidate files -> search dirs
//!     +-- compute_origin            <- percent anchor, exact ink bounds
//!     +-- draw_text                 <- glyph outlines (or built-in bitmap font)
//!     |
//!     v
//! flatten onto white (if alpha) -> RGB PNG bytes
//! ```
//!
//! # Failure policy
//!
//! [`CertificateRenderer::render`] never panics and never returns a partial
//! image. Expected misconfiguration degrades instead of failing:
//!
//! - unknown font key: the default catalog entry is used
//! - no font file found anywhere: the built-in bitmap font is used
//! - malformed colour: black
//!
//! Anything that prevents producing an image (missing template, undecodable
//! data, encoder errors) is reported as a [`RenderFailure`].

pub mod catalog;
pub mod color;
pub mod compositor;
pub mod error;
pub mod font;
pub mod placement;
pub mod renderer;

pub use catalog::{FontEntry, DEFAULT_FONT_KEY, FONT_CATALOG};
pub use color::{parse_hex_color, Rgb};
pub use compositor::Canvas;
pub use error::RenderFailure;
pub use font::{FontHandle, FontResolver, FontSource, TextBounds};
pub use placement::{compute_origin, Origin};
pub use renderer::{
    CertificateRenderer, PlacementSpec, RenderOutcome, RenderedCertificate, TemplateSource,
    MAX_FONT_SIZE, MIN_FONT_SIZE,
};
