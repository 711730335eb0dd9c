use std::path::PathBuf;
use thiserror::Error;

/// Reason a certificate could not be rendered.
///
/// This is the renderer's failure value: every expected problem ends up here
/// instead of unwinding out of [`CertificateRenderer::render`](crate::CertificateRenderer::render).
#[derive(Debug, Error)]
pub enum RenderFailure {
    #[error("Template not found: {}", path.display())]
    TemplateMissing { path: PathBuf },

    #[error("Template unreadable: {}: {source}", path.display())]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template decode error: {0}")]
    Decode(String),

    #[error("Failed to allocate {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("PNG encode error: {0}")]
    Encode(String),

    #[error("Failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Render aborted: {0}")]
    Internal(String),
}

impl RenderFailure {
    /// True when the template itself is absent or unreadable, as opposed to a
    /// failure while processing it.
    pub fn is_missing_template(&self) -> bool {
        matches!(
            self,
            RenderFailure::TemplateMissing { .. } | RenderFailure::TemplateUnreadable { .. }
        )
    }
}
