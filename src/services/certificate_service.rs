use crate::error::{
    ApiError, CERTIFICATE_FILE_NOT_FOUND, TEMPLATE_NOT_CONFIGURED, TEMPLATE_NOT_FOUND,
};
use crate::models::{Event, Participant};
use crate::services::FileStorage;
use cert_render::{CertificateRenderer, FontResolver, PlacementSpec, RenderFailure, TemplateSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// What a participant's certificate is made from
#[derive(Debug, Clone, PartialEq)]
pub enum CertificateSource {
    /// Pre-rendered file uploaded for this participant
    Custom(PathBuf),
    /// Event template with the name drawn on it
    Template {
        path: PathBuf,
        placement: PlacementSpec,
    },
}

/// Produces certificate PNGs for the delivery layer.
///
/// Rendering is CPU-bound and runs on the blocking pool.
pub struct CertificateService {
    renderer: CertificateRenderer,
    storage: Arc<FileStorage>,
}

impl CertificateService {
    pub fn new(fonts: Arc<FontResolver>, storage: Arc<FileStorage>) -> Self {
        Self {
            renderer: CertificateRenderer::with_shared_fonts(fonts),
            storage,
        }
    }

    pub fn renderer(&self) -> &CertificateRenderer {
        &self.renderer
    }

    /// Decide what to serve, or why nothing can be served.
    ///
    /// A participant with a custom certificate is served that file and
    /// nothing else; without one the event needs a template on disk and a
    /// configured name position.
    pub fn source_for(
        &self,
        event: &Event,
        participant: &Participant,
    ) -> Result<CertificateSource, ApiError> {
        let Some(filename) = &participant.certificate_filename else {
            return self.template_source(event);
        };
        match self.storage.certificate_path(filename) {
            Ok(path) if path.is_file() => Ok(CertificateSource::Custom(path)),
            _ => {
                tracing::warn!(
                    participant_id = %participant.id,
                    %filename,
                    "Custom certificate file missing"
                );
                Err(ApiError::CertificateUnavailable(CERTIFICATE_FILE_NOT_FOUND))
            }
        }
    }

    fn template_source(&self, event: &Event) -> Result<CertificateSource, ApiError> {
        let filename = event
            .template_filename
            .as_deref()
            .ok_or(ApiError::CertificateUnavailable(TEMPLATE_NOT_FOUND))?;
        let placement = event
            .placement
            .to_spec()
            .ok_or(ApiError::CertificateUnavailable(TEMPLATE_NOT_CONFIGURED))?;
        let path = self
            .storage
            .template_path(filename)
            .map_err(|_| ApiError::CertificateUnavailable(TEMPLATE_NOT_FOUND))?;
        if !path.is_file() {
            tracing::warn!(event_id = %event.id, path = %path.display(), "Template file missing");
            return Err(ApiError::CertificateUnavailable(TEMPLATE_NOT_FOUND));
        }
        Ok(CertificateSource::Template { path, placement })
    }

    /// PNG bytes of a participant's certificate
    pub async fn produce(
        &self,
        event: &Event,
        participant: &Participant,
    ) -> Result<Vec<u8>, ApiError> {
        match self.source_for(event, participant)? {
            CertificateSource::Custom(path) => tokio::fs::read(&path).await.map_err(|e| {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read custom certificate"
                );
                ApiError::CertificateFailed
            }),
            CertificateSource::Template { path, placement } => {
                self.render(path, participant.name.clone(), placement).await
            }
        }
    }

    /// Render a sample name with the event's current placement
    pub async fn preview(&self, event: &Event, sample_name: &str) -> Result<Vec<u8>, ApiError> {
        match self.template_source(event)? {
            CertificateSource::Template { path, placement } => {
                self.render(path, sample_name.to_string(), placement).await
            }
            CertificateSource::Custom(_) => Err(ApiError::CertificateFailed),
        }
    }

    async fn render(
        &self,
        template: PathBuf,
        name: String,
        placement: PlacementSpec,
    ) -> Result<Vec<u8>, ApiError> {
        let renderer = self.renderer.clone();
        let start = Instant::now();

        let outcome = tokio::task::spawn_blocking(move || {
            renderer.render(TemplateSource::Path(&template), &name, &placement)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Render task failed: {e}")))?;

        match outcome {
            Ok(certificate) => {
                tracing::debug!(
                    width = certificate.width(),
                    height = certificate.height(),
                    bytes = certificate.as_bytes().len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Rendered certificate"
                );
                Ok(certificate.into_bytes())
            }
            Err(failure) => Err(user_facing(&failure)),
        }
    }
}

fn user_facing(failure: &RenderFailure) -> ApiError {
    if failure.is_missing_template() {
        ApiError::CertificateUnavailable(TEMPLATE_NOT_FOUND)
    } else {
        ApiError::CertificateFailed
    }
}
