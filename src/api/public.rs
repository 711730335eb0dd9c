//! Participant-facing endpoints: event listing, email verification and
//! certificate delivery.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::delivery::{certificate_filename, png_response, Disposition};
use super::headers::ClientIp;
use crate::error::ApiError;
use crate::models::{Email, Event, EventId, ParticipantId};
use crate::server::AppState;
use crate::services::EventStore;

/// Public view of an event
#[derive(Debug, Serialize, ToSchema)]
pub struct EventSummary {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,
    /// Whether certificates can be generated from a template
    pub has_template: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.0,
            name: event.name.clone(),
            description: event.description.clone(),
            event_date: event.event_date,
            has_template: event.has_template(),
            archived_at: event.archived_at,
        }
    }
}

/// Access token for protected events
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccessQuery {
    /// Token from the event's private link
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CaptchaResponse {
    /// Pass back with the answer
    pub captcha_id: String,
    /// e.g. `7 + 5 = ?`
    pub question: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    pub captcha_id: String,
    pub captcha_answer: String,
    /// Required for protected events
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    pub participant_name: String,
    pub event_name: String,
    /// Signed URL showing the certificate inline
    pub preview_url: String,
    /// Signed URL downloading the certificate
    pub download_url: String,
    /// Unix timestamp after which both URLs stop working
    pub expires_at: i64,
}

/// Signature of a certificate link
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SignedQuery {
    /// Expiry as a unix timestamp
    pub exp: i64,
    /// Hex HMAC-SHA256 of path and expiry
    pub sig: String,
}

pub fn certificate_path(participant_id: ParticipantId, kind: &str) -> String {
    format!("/api/certificates/{participant_id}/{kind}")
}

/// Event as seen by a visitor: hidden events do not exist, protected ones need the token
async fn accessible_event(
    state: &AppState,
    id: u64,
    token: Option<&str>,
) -> Result<Event, ApiError> {
    let event = state
        .store
        .get_event(EventId(id))
        .await?
        .filter(|e| e.is_visible)
        .ok_or(ApiError::EventNotFound)?;

    if !event.allows_access(token) {
        tracing::info!(event_id = %event.id, "Protected event requested without valid token");
        return Err(ApiError::Forbidden(
            "This event requires a valid access link.".to_string(),
        ));
    }
    Ok(event)
}

/// List open events
#[utoipa::path(
    get,
    path = "/api/events",
    responses(
        (status = 200, description = "Visible, non-archived, public events", body = [EventSummary]),
    ),
    tag = "Events"
)]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventSummary>>, ApiError> {
    let events = state.store.list_events().await?;
    Ok(Json(
        events
            .iter()
            .filter(|e| e.is_publicly_listed())
            .map(EventSummary::from)
            .collect(),
    ))
}

/// List archived events
#[utoipa::path(
    get,
    path = "/api/archive",
    responses(
        (status = 200, description = "Archived events shown in the public archive", body = [EventSummary]),
    ),
    tag = "Events"
)]
pub async fn list_archive(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventSummary>>, ApiError> {
    let mut events: Vec<Event> = state
        .store
        .list_events()
        .await?
        .into_iter()
        .filter(Event::is_in_public_archive)
        .collect();
    events.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
    Ok(Json(events.iter().map(EventSummary::from).collect()))
}

/// Event details
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(
        ("id" = u64, Path, description = "Event id"),
        AccessQuery,
    ),
    responses(
        (status = 200, description = "Event details", body = EventSummary),
        (status = 403, description = "Protected event, token missing or wrong"),
        (status = 404, description = "Unknown or hidden event"),
    ),
    tag = "Events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<AccessQuery>,
) -> Result<Json<EventSummary>, ApiError> {
    let event = accessible_event(&state, id, query.token.as_deref()).await?;
    Ok(Json(EventSummary::from(&event)))
}

/// Issue a CAPTCHA for the verification form
#[utoipa::path(
    get,
    path = "/api/events/{id}/captcha",
    params(
        ("id" = u64, Path, description = "Event id"),
        AccessQuery,
    ),
    responses(
        (status = 200, description = "New challenge", body = CaptchaResponse),
        (status = 403, description = "Protected event, token missing or wrong"),
        (status = 404, description = "Unknown or hidden event"),
    ),
    tag = "Certificates"
)]
pub async fn issue_captcha(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<AccessQuery>,
) -> Result<Json<CaptchaResponse>, ApiError> {
    accessible_event(&state, id, query.token.as_deref()).await?;
    let (captcha_id, question) = state.captcha.issue().await;
    Ok(Json(CaptchaResponse {
        captcha_id,
        question,
    }))
}

/// Prove registration and receive certificate links
///
/// The CAPTCHA is checked (and consumed) before anything else.
#[utoipa::path(
    post,
    path = "/api/events/{id}/verify",
    params(("id" = u64, Path, description = "Event id")),
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Signed certificate links", body = VerifyResponse),
        (status = 400, description = "Wrong CAPTCHA or malformed email"),
        (status = 403, description = "Protected event, token missing or wrong"),
        (status = 404, description = "Unknown event, unregistered email or no certificate available"),
    ),
    tag = "Certificates"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    if !state
        .captcha
        .verify(&request.captcha_id, &request.captcha_answer)
        .await
    {
        return Err(ApiError::CaptchaFailed);
    }

    let event = accessible_event(&state, id, request.token.as_deref()).await?;
    let email = Email::parse(&request.email)?;

    let participant = state
        .store
        .find_participant(event.id, &email)
        .await?
        .ok_or_else(|| {
            tracing::info!(event_id = %event.id, "Verification for unregistered email");
            ApiError::EmailNotRegistered
        })?;

    state.certificates.source_for(&event, &participant)?;

    let preview = state
        .signer
        .sign(&certificate_path(participant.id, "preview"));
    let download = state
        .signer
        .sign(&certificate_path(participant.id, "download"));

    tracing::info!(
        event_id = %event.id,
        participant_id = %participant.id,
        "Participant verified"
    );

    Ok(Json(VerifyResponse {
        participant_name: participant.name,
        event_name: event.name,
        preview_url: preview.to_url(),
        expires_at: download.expires,
        download_url: download.to_url(),
    }))
}

/// Show a certificate inline
#[utoipa::path(
    get,
    path = "/api/certificates/{participant_id}/preview",
    params(
        ("participant_id" = u64, Path, description = "Participant id"),
        SignedQuery,
    ),
    responses(
        (status = 200, description = "Certificate PNG", content_type = "image/png"),
        (status = 403, description = "Invalid or expired link, or hidden event"),
        (status = 404, description = "No certificate available"),
    ),
    tag = "Certificates"
)]
pub async fn preview_certificate(
    State(state): State<AppState>,
    Path(participant_id): Path<u64>,
    Query(query): Query<SignedQuery>,
) -> Result<Response, ApiError> {
    deliver(&state, ParticipantId(participant_id), &query, None).await
}

/// Download a certificate and count the download
#[utoipa::path(
    get,
    path = "/api/certificates/{participant_id}/download",
    params(
        ("participant_id" = u64, Path, description = "Participant id"),
        SignedQuery,
    ),
    responses(
        (status = 200, description = "Certificate PNG as attachment", content_type = "image/png"),
        (status = 403, description = "Invalid or expired link, or hidden event"),
        (status = 404, description = "No certificate available"),
    ),
    tag = "Certificates"
)]
pub async fn download_certificate(
    State(state): State<AppState>,
    Path(participant_id): Path<u64>,
    Query(query): Query<SignedQuery>,
    ClientIp(ip): ClientIp,
) -> Result<Response, ApiError> {
    deliver(&state, ParticipantId(participant_id), &query, Some(ip)).await
}

/// Shared preview/download path; `download_ip` is set for downloads.
async fn deliver(
    state: &AppState,
    participant_id: ParticipantId,
    query: &SignedQuery,
    download_ip: Option<String>,
) -> Result<Response, ApiError> {
    let kind = if download_ip.is_some() {
        "download"
    } else {
        "preview"
    };
    if !state
        .signer
        .verify(&certificate_path(participant_id, kind), &query.sig, query.exp)
    {
        return Err(ApiError::InvalidSignature);
    }

    let participant = state
        .store
        .get_participant(participant_id)
        .await?
        .ok_or(ApiError::ParticipantNotFound)?;
    let event = state
        .store
        .get_event(participant.event_id)
        .await?
        .ok_or(ApiError::EventNotFound)?;
    if !event.is_visible {
        return Err(ApiError::Forbidden(
            "This event is not available.".to_string(),
        ));
    }

    let bytes = state.certificates.produce(&event, &participant).await?;
    let filename = certificate_filename(&participant.name, &event.name);

    let disposition = match download_ip {
        Some(ip) => {
            let updated = state.store.record_download(participant.id, ip).await?;
            tracing::info!(
                participant_id = %participant.id,
                event_id = %event.id,
                downloads = updated.download_count,
                "Certificate downloaded"
            );
            Disposition::Attachment
        }
        None => Disposition::Inline,
    };

    Ok(png_response(bytes, &filename, disposition).into_response())
}
