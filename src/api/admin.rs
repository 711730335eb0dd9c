//! Admin endpoints. Every handler requires an [`AdminSession`]; every
//! mutating handler appends an admin log entry.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
};
use cert_render::{PlacementSpec, FONT_CATALOG, MAX_FONT_SIZE, MIN_FONT_SIZE};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::delivery::{png_response, Disposition};
use super::headers::AdminSession;
use crate::error::ApiError;
use crate::models::{
    AdminLogEntry, DownloadLog, Email, Event, EventId, NewEvent, Participant, ParticipantId,
    Placement,
};
use crate::server::AppState;
use crate::services::{
    plan_import, EventStore, FileStorage, ImportRow, RowError, StorageError, StoreStats,
};

const RECENT_DOWNLOADS: usize = 10;
const DEFAULT_LOG_LIMIT: usize = 100;
const SAMPLE_NAME: &str = "Sample Name";

async fn log_action(
    state: &AppState,
    session: &AdminSession,
    action: &str,
    details: String,
) -> Result<(), ApiError> {
    state
        .store
        .log_admin_action(AdminLogEntry::new(
            &session.username,
            action,
            details,
            &session.ip,
        ))
        .await
}

async fn load_event(state: &AppState, id: u64) -> Result<Event, ApiError> {
    state
        .store
        .get_event(EventId(id))
        .await?
        .ok_or(ApiError::EventNotFound)
}

async fn load_participant(state: &AppState, id: u64) -> Result<Participant, ApiError> {
    state
        .store
        .get_participant(ParticipantId(id))
        .await?
        .ok_or(ApiError::ParticipantNotFound)
}

/// Run a storage operation on the blocking pool; uploads are decoded and
/// written synchronously.
async fn with_storage<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&FileStorage) -> Result<T, StorageError> + Send + 'static,
{
    let storage = state.storage.clone();
    let result = tokio::task::spawn_blocking(move || op(&storage))
        .await
        .map_err(|e| ApiError::Internal(format!("Storage task failed: {e}")))?;
    Ok(result?)
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::BadRequest("Invalid date format. Use YYYY-MM-DD.".to_string())),
    }
}

fn required_name(raw: &str, what: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest(format!("{what} is required")));
    }
    Ok(name.to_string())
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub stats: StoreStats,
    pub recent_downloads: Vec<DownloadLog>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<DashboardResponse>, ApiError> {
    Ok(Json(DashboardResponse {
        stats: state.store.stats().await?,
        recent_downloads: state.store.recent_downloads(RECENT_DOWNLOADS).await?,
    }))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AdminEventSummary {
    #[serde(flatten)]
    pub event: Event,
    pub participant_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EventDetail {
    pub event: Event,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub is_visible: Option<bool>,
}

/// Absent fields are left alone; empty strings clear description and date
#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
}

pub async fn list_events(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<Vec<AdminEventSummary>>, ApiError> {
    let events = state.store.list_events().await?;
    let mut summaries = Vec::with_capacity(events.len());
    for event in events {
        let participant_count = state.store.count_participants(event.id).await?;
        summaries.push(AdminEventSummary {
            event,
            participant_count,
        });
    }
    Ok(Json(summaries))
}

pub async fn create_event(
    State(state): State<AppState>,
    session: AdminSession,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let name = required_name(&request.name, "Event name")?;
    let event_date = parse_date(request.event_date.as_deref())?;

    let event = state
        .store
        .create_event(NewEvent {
            name,
            description: non_empty(request.description),
            event_date,
            is_visible: request.is_visible.unwrap_or(true),
        })
        .await?;

    log_action(
        &state,
        &session,
        "create_event",
        format!("Created event '{}' (id {})", event.name, event.id),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn get_event(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<EventDetail>, ApiError> {
    let event = load_event(&state, id).await?;
    let participants = state.store.list_participants(event.id).await?;
    Ok(Json(EventDetail {
        event,
        participants,
    }))
}

pub async fn update_event(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<Event>, ApiError> {
    let name = request
        .name
        .as_deref()
        .map(|name| required_name(name, "Event name"))
        .transpose()?;
    let event_date = request
        .event_date
        .as_deref()
        .map(|date| parse_date(Some(date)))
        .transpose()?;

    let event = state
        .store
        .update_event(EventId(id), move |event| {
            if let Some(name) = name {
                event.name = name;
            }
            if let Some(description) = request.description {
                event.description = non_empty(Some(description));
            }
            if let Some(date) = event_date {
                event.event_date = date;
            }
            Ok(event.clone())
        })
        .await?;

    log_action(
        &state,
        &session,
        "edit_event",
        format!("Edited event '{}' (id {})", event.name, event.id),
    )
    .await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let (event, participants) = state.store.delete_event(EventId(id)).await?;

    if let Some(template) = &event.template_filename {
        if let Err(e) = state.storage.delete_template(template) {
            tracing::warn!(%template, error = %e, "Failed to remove template of deleted event");
        }
    }
    for participant in &participants {
        if let Some(file) = &participant.certificate_filename {
            if let Err(e) = state.storage.delete_certificate(file) {
                tracing::warn!(%file, error = %e, "Failed to remove custom certificate");
            }
        }
    }

    log_action(
        &state,
        &session,
        "delete_event",
        format!(
            "Deleted event '{}' (id {}) with {} participants",
            event.name,
            event.id,
            participants.len()
        ),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct VisibilityResponse {
    pub is_visible: bool,
}

pub async fn toggle_visibility(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<VisibilityResponse>, ApiError> {
    let event = state
        .store
        .update_event(EventId(id), |event| {
            event.is_visible = !event.is_visible;
            Ok(event.clone())
        })
        .await?;

    let status = if event.is_visible { "visible" } else { "hidden" };
    log_action(
        &state,
        &session,
        "toggle_visibility",
        format!("Event '{}' (id {}) is now {status}", event.name, event.id),
    )
    .await?;
    Ok(Json(VisibilityResponse {
        is_visible: event.is_visible,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub archived: bool,
    #[serde(default)]
    pub show_in_archive: bool,
}

pub async fn set_archive(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Json(request): Json<ArchiveRequest>,
) -> Result<Json<Event>, ApiError> {
    let event = state
        .store
        .update_event(EventId(id), |event| {
            event.set_archived(request.archived, request.show_in_archive, Utc::now());
            Ok(event.clone())
        })
        .await?;

    let (action, details) = if event.is_archived {
        (
            "archive_event",
            format!(
                "Archived event '{}' (id {}), shown in archive: {}",
                event.name, event.id, event.show_in_archive
            ),
        )
    } else {
        (
            "unarchive_event",
            format!("Restored event '{}' (id {})", event.name, event.id),
        )
    };
    log_action(&state, &session, action, details).await?;
    Ok(Json(event))
}

#[derive(Debug, Deserialize)]
pub struct ProtectionRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ProtectionResponse {
    pub is_protected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Private link to share with participants
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_url: Option<String>,
}

/// Enabling always issues a fresh token, invalidating the previous link.
pub async fn set_protection(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Json(request): Json<ProtectionRequest>,
) -> Result<Json<ProtectionResponse>, ApiError> {
    let event = state
        .store
        .update_event(EventId(id), |event| {
            if request.enabled {
                event.enable_protection();
            } else {
                event.disable_protection();
            }
            Ok(event.clone())
        })
        .await?;

    let response = match event.access_token.clone() {
        Some(token) if request.enabled => ProtectionResponse {
            is_protected: true,
            event_url: Some(format!("/api/events/{}?token={token}", event.id)),
            access_token: Some(token),
        },
        _ => ProtectionResponse {
            is_protected: event.is_protected,
            access_token: None,
            event_url: None,
        },
    };

    let action = if request.enabled {
        "enable_protection"
    } else {
        "disable_protection"
    };
    log_action(
        &state,
        &session,
        action,
        format!("Event '{}' (id {})", event.name, event.id),
    )
    .await?;
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Template and placement
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    /// Original file name; its extension must match the content
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub placement: Placement,
}

pub async fn upload_template(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<TemplateResponse>, ApiError> {
    let label = load_event(&state, id).await?.name;
    let stored = with_storage(&state, move |storage| {
        storage.save_template(&label, &query.filename, &body)
    })
    .await?;

    let filename = stored.filename.clone();
    let updated = state
        .store
        .update_event(EventId(id), move |event| {
            let replaced = event.set_template(filename);
            Ok((event.clone(), replaced))
        })
        .await;
    let (event, replaced) = match updated {
        Ok(updated) => updated,
        Err(e) => {
            // the event vanished meanwhile; do not leave an orphan file
            let _ = state.storage.delete_template(&stored.filename);
            return Err(e);
        }
    };
    if let Some(old) = &replaced {
        if let Err(e) = state.storage.delete_template(old) {
            tracing::warn!(file = %old, error = %e, "Failed to remove replaced template");
        }
    }

    log_action(
        &state,
        &session,
        "upload_template",
        format!(
            "Template {} ({}x{}) for event '{}' (id {})",
            stored.filename, stored.width, stored.height, event.name, event.id
        ),
    )
    .await?;
    Ok(Json(TemplateResponse {
        filename: stored.filename,
        width: stored.width,
        height: stored.height,
        placement: event.placement,
    }))
}

pub async fn get_template(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let event = load_event(&state, id).await?;
    let filename = event.template_filename.ok_or(ApiError::NotFound)?;
    let bytes = state.storage.read_template(&filename).map_err(|e| {
        tracing::warn!(%filename, error = %e, "Template file unreadable");
        ApiError::NotFound
    })?;

    let content_type = match image::guess_format(&bytes) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        _ => "image/png",
    };
    Ok(([(CONTENT_TYPE, content_type)], bytes).into_response())
}

pub async fn delete_template(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let (event, removed) = state
        .store
        .update_event(EventId(id), |event| {
            let removed = event.clear_template().ok_or(ApiError::NotFound)?;
            Ok((event.clone(), removed))
        })
        .await?;
    state.storage.delete_template(&removed)?;

    log_action(
        &state,
        &session,
        "delete_template",
        format!("Removed template from event '{}' (id {})", event.name, event.id),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PlacementRequest {
    pub x_percent: f32,
    pub y_percent: f32,
    #[serde(default)]
    pub font_size: Option<i64>,
    #[serde(default)]
    pub font_color: Option<String>,
    #[serde(default)]
    pub font_key: Option<String>,
}

pub async fn update_placement(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Json(request): Json<PlacementRequest>,
) -> Result<Json<Placement>, ApiError> {
    let event = state
        .store
        .update_event(EventId(id), move |event| {
            if !event.has_template() {
                return Err(ApiError::BadRequest(
                    "Upload a template before positioning the name.".to_string(),
                ));
            }

            let current = &event.placement;
            let spec = PlacementSpec {
                x_percent: request.x_percent,
                y_percent: request.y_percent,
                font_size: request.font_size.map_or(current.font_size, |size| {
                    size.clamp(MIN_FONT_SIZE as i64, MAX_FONT_SIZE as i64) as u32
                }),
                font_color: request
                    .font_color
                    .unwrap_or_else(|| current.font_color.clone()),
                font_key: request
                    .font_key
                    .unwrap_or_else(|| current.font_key.clone()),
            };
            event.placement.apply(&spec);
            Ok(event.clone())
        })
        .await?;

    let placement = &event.placement;
    log_action(
        &state,
        &session,
        "update_placement",
        format!(
            "Event '{}' (id {}): x={:.1}% y={:.1}% size={} color={} font={}",
            event.name,
            event.id,
            placement.x_percent.unwrap_or_default(),
            placement.y_percent.unwrap_or_default(),
            placement.font_size,
            placement.font_color,
            placement.font_key
        ),
    )
    .await?;
    Ok(Json(event.placement))
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub name: Option<String>,
}

pub async fn preview(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<u64>,
    Query(query): Query<PreviewQuery>,
) -> Result<Response, ApiError> {
    let event = load_event(&state, id).await?;
    let name = non_empty(query.name).unwrap_or_else(|| SAMPLE_NAME.to_string());
    let bytes = state.certificates.preview(&event, &name).await?;
    Ok(png_response(bytes, "preview.png", Disposition::Inline))
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ParticipantRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateParticipantRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

pub async fn list_participants(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<u64>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    let event = load_event(&state, id).await?;
    Ok(Json(state.store.list_participants(event.id).await?))
}

pub async fn add_participant(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Json(request): Json<ParticipantRequest>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let event = load_event(&state, id).await?;
    let name = required_name(&request.name, "Name")?;
    let email = Email::parse(&request.email)?;

    let participant = state.store.add_participant(event.id, name, email).await?;
    log_action(
        &state,
        &session,
        "add_participant",
        format!(
            "Added {} <{}> to event '{}' (id {})",
            participant.name, participant.email, event.name, event.id
        ),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub dry_run: bool,
    pub imported: usize,
    pub valid: Vec<ImportRow>,
    pub errors: Vec<RowError>,
}

/// CSV body with `name` and `email` columns
pub async fn import_participants(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Result<Json<ImportResponse>, ApiError> {
    let event = load_event(&state, id).await?;
    let existing = state.store.list_participants(event.id).await?;
    let plan = plan_import(&body, &existing)?;

    let mut imported = 0;
    let mut errors = plan.errors;
    if !query.dry_run {
        for row in &plan.valid {
            match state
                .store
                .add_participant(event.id, row.name.clone(), row.email.clone())
                .await
            {
                Ok(_) => imported += 1,
                // someone else added the same email since planning
                Err(ApiError::DuplicateParticipant) => errors.push(RowError {
                    line: row.line,
                    message: "Duplicate email".to_string(),
                }),
                Err(e) => return Err(e),
            }
        }
        errors.sort_by_key(|e| e.line);

        log_action(
            &state,
            &session,
            "import_participants",
            format!(
                "Imported {imported} participants into event '{}' (id {}), {} rows rejected",
                event.name,
                event.id,
                errors.len()
            ),
        )
        .await?;
    }

    Ok(Json(ImportResponse {
        dry_run: query.dry_run,
        imported,
        valid: plan.valid,
        errors,
    }))
}

pub async fn update_participant(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Json(request): Json<UpdateParticipantRequest>,
) -> Result<Json<Participant>, ApiError> {
    let name = request
        .name
        .as_deref()
        .map(|name| required_name(name, "Name"))
        .transpose()?;
    let email = request.email.as_deref().map(Email::parse).transpose()?;

    let participant = state
        .store
        .update_participant(ParticipantId(id), move |participant| {
            if let Some(name) = name {
                participant.name = name;
            }
            if let Some(email) = email {
                participant.email = email;
            }
            Ok(participant.clone())
        })
        .await?;
    log_action(
        &state,
        &session,
        "edit_participant",
        format!(
            "Edited participant {} <{}> (id {})",
            participant.name, participant.email, participant.id
        ),
    )
    .await?;
    Ok(Json(participant))
}

pub async fn delete_participant(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let participant = state.store.delete_participant(ParticipantId(id)).await?;
    if let Some(file) = &participant.certificate_filename {
        if let Err(e) = state.storage.delete_certificate(file) {
            tracing::warn!(%file, error = %e, "Failed to remove custom certificate");
        }
    }

    log_action(
        &state,
        &session,
        "delete_participant",
        format!(
            "Deleted participant {} <{}> (id {})",
            participant.name, participant.email, participant.id
        ),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_certificate(
    State(state): State<AppState>,
    session: AdminSession,
    Path(id): Path<u64>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<Participant>, ApiError> {
    let label = load_participant(&state, id).await?.name;
    let stored = with_storage(&state, move |storage| {
        storage.save_certificate(&label, &query.filename, &body)
    })
    .await?;

    let filename = stored.filename.clone();
    let updated = state
        .store
        .update_participant(ParticipantId(id), move |participant| {
            let replaced = participant.certificate_filename.replace(filename);
            Ok((participant.clone(), replaced))
        })
        .await;
    let (participant, replaced) = match updated {
        Ok(updated) => updated,
        Err(e) => {
            let _ = state.storage.delete_certificate(&stored.filename);
            return Err(e);
        }
    };
    if let Some(old) = &replaced {
        if let Err(e) = state.storage.delete_certificate(old) {
            tracing::warn!(file = %old, error = %e, "Failed to remove replaced certificate");
        }
    }

    log_action(
        &state,
        &session,
        "upload_certificate",
        format!(
            "Custom certificate {} for {} (id {})",
            stored.filename, participant.name, participant.id
        ),
    )
    .await?;
    Ok(Json(participant))
}

// ---------------------------------------------------------------------------
// Fonts and logs
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FontInfo {
    pub key: &'static str,
    pub label: &'static str,
    pub aliases: &'static [&'static str],
    /// Font file the key resolves to, if any
    pub resolved: Option<String>,
    /// True when rendering would use the built-in bitmap font
    pub fallback: bool,
}

pub async fn list_fonts(
    State(state): State<AppState>,
    _session: AdminSession,
) -> Result<Json<Vec<FontInfo>>, ApiError> {
    let fonts = state.fonts.clone();
    let infos = tokio::task::spawn_blocking(move || {
        FONT_CATALOG
            .iter()
            .map(|entry| {
                let resolved = fonts.locate(entry.key);
                FontInfo {
                    key: entry.key,
                    label: entry.label,
                    aliases: entry.aliases,
                    fallback: resolved.is_none(),
                    resolved: resolved.map(|p| p.display().to_string()),
                }
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Font lookup failed: {e}")))?;
    Ok(Json(infos))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

pub async fn admin_logs(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<AdminLogEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    Ok(Json(state.store.admin_logs(limit).await?))
}

pub async fn download_logs(
    State(state): State<AppState>,
    _session: AdminSession,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<DownloadLog>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    Ok(Json(state.store.recent_downloads(limit).await?))
}
