use crate::error::ApiError;
use crate::models::{
    AdminLogEntry, AppConfig, DownloadLog, Email, Event, EventId, EventSeed, NewEvent,
    Participant, ParticipantId,
};
use async_trait::async_trait;
use cert_render::PlacementSpec;
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::RwLock;

/// Entries kept in each activity log before the oldest are dropped
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// Totals shown on the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_events: usize,
    pub visible_events: usize,
    pub total_participants: usize,
    pub total_downloads: usize,
}

/// Trait for event, participant and activity storage
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events, newest first
    async fn list_events(&self) -> Result<Vec<Event>, ApiError>;

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, ApiError>;

    async fn create_event(&self, new: NewEvent) -> Result<Event, ApiError>;

    /// Change an event in place under the write lock.
    ///
    /// `apply` works on a copy that is stored only when it returns `Ok`, so a
    /// failed update leaves the event untouched.
    async fn update_event<T, F>(&self, id: EventId, apply: F) -> Result<T, ApiError>
    where
        T: Send,
        F: FnOnce(&mut Event) -> Result<T, ApiError> + Send;

    /// Delete an event with its participants and download history.
    ///
    /// Returns the removed event and participants so their files can be cleaned up.
    async fn delete_event(&self, id: EventId) -> Result<(Event, Vec<Participant>), ApiError>;

    /// Participants of an event, ordered by name
    async fn list_participants(&self, event_id: EventId) -> Result<Vec<Participant>, ApiError>;

    async fn count_participants(&self, event_id: EventId) -> Result<usize, ApiError>;

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>, ApiError>;

    async fn find_participant(
        &self,
        event_id: EventId,
        email: &Email,
    ) -> Result<Option<Participant>, ApiError>;

    /// Register a participant; the email must be new for the event
    async fn add_participant(
        &self,
        event_id: EventId,
        name: String,
        email: Email,
    ) -> Result<Participant, ApiError>;

    /// Change a participant in place under the write lock, keeping emails
    /// unique per event. Nothing is stored unless `apply` returns `Ok`.
    async fn update_participant<T, F>(&self, id: ParticipantId, apply: F) -> Result<T, ApiError>
    where
        T: Send,
        F: FnOnce(&mut Participant) -> Result<T, ApiError> + Send;

    async fn delete_participant(&self, id: ParticipantId) -> Result<Participant, ApiError>;

    /// Count a download and append it to the download log.
    ///
    /// The log keeps the most recent entries only; download counts are exact.
    async fn record_download(
        &self,
        participant_id: ParticipantId,
        ip_address: String,
    ) -> Result<Participant, ApiError>;

    /// Newest first
    async fn recent_downloads(&self, limit: usize) -> Result<Vec<DownloadLog>, ApiError>;

    async fn log_admin_action(&self, entry: AdminLogEntry) -> Result<(), ApiError>;

    /// Newest first
    async fn admin_logs(&self, limit: usize) -> Result<Vec<AdminLogEntry>, ApiError>;

    async fn stats(&self) -> Result<StoreStats, ApiError>;
}

struct StoreData {
    events: BTreeMap<EventId, Event>,
    participants: BTreeMap<ParticipantId, Participant>,
    downloads: VecDeque<DownloadLog>,
    admin_logs: VecDeque<AdminLogEntry>,
    log_capacity: usize,
    next_event_id: u64,
    next_participant_id: u64,
}

/// Append to a bounded log, dropping the oldest entries past `capacity`
fn push_bounded<T>(log: &mut VecDeque<T>, entry: T, capacity: usize) {
    while log.len() >= capacity.max(1) {
        log.pop_front();
    }
    log.push_back(entry);
}

impl StoreData {
    fn new(log_capacity: usize) -> Self {
        Self {
            events: BTreeMap::new(),
            participants: BTreeMap::new(),
            downloads: VecDeque::new(),
            admin_logs: VecDeque::new(),
            log_capacity,
            next_event_id: 0,
            next_participant_id: 0,
        }
    }

    fn insert_event(&mut self, new: NewEvent) -> Event {
        self.next_event_id += 1;
        let event = Event::new(EventId(self.next_event_id), new, Utc::now());
        self.events.insert(event.id, event.clone());
        event
    }

    fn email_taken(&self, event_id: EventId, email: &Email, except: Option<ParticipantId>) -> bool {
        self.participants.values().any(|p| {
            p.event_id == event_id && &p.email == email && Some(p.id) != except
        })
    }

    fn insert_participant(
        &mut self,
        event_id: EventId,
        name: String,
        email: Email,
    ) -> Result<Participant, ApiError> {
        if !self.events.contains_key(&event_id) {
            return Err(ApiError::EventNotFound);
        }
        if self.email_taken(event_id, &email, None) {
            return Err(ApiError::DuplicateParticipant);
        }
        self.next_participant_id += 1;
        let participant = Participant {
            id: ParticipantId(self.next_participant_id),
            event_id,
            name,
            email,
            certificate_filename: None,
            download_count: 0,
            created_at: Utc::now(),
        };
        self.participants.insert(participant.id, participant.clone());
        Ok(participant)
    }

    fn seed_event(&mut self, seed: &EventSeed) {
        let mut event = self.insert_event(NewEvent {
            name: seed.name.clone(),
            description: seed.description.clone(),
            event_date: seed.date,
            is_visible: seed.visible,
        });

        if let Some(template) = &seed.template {
            event.set_template(template.clone());
        }
        if let Some(placement) = &seed.placement {
            let current = &event.placement;
            let spec = PlacementSpec {
                x_percent: placement.x_percent.or(current.x_percent).unwrap_or(50.0),
                y_percent: placement.y_percent.or(current.y_percent).unwrap_or(50.0),
                font_size: placement.font_size.unwrap_or(current.font_size),
                font_color: placement
                    .font_color
                    .clone()
                    .unwrap_or_else(|| current.font_color.clone()),
                font_key: placement
                    .font_key
                    .clone()
                    .unwrap_or_else(|| current.font_key.clone()),
            };
            let positioned = event.has_template();
            event.placement.apply(&spec);
            if !positioned {
                event.placement.x_percent = None;
                event.placement.y_percent = None;
            }
        }
        if seed.protected {
            event.enable_protection();
        }
        self.events.insert(event.id, event.clone());

        for participant in &seed.participants {
            let email = match Email::parse(&participant.email) {
                Ok(email) => email,
                Err(e) => {
                    tracing::warn!(event = %seed.name, email = %participant.email, error = %e, "Skipping seeded participant");
                    continue;
                }
            };
            if let Err(e) = self.insert_participant(event.id, participant.name.trim().to_string(), email) {
                tracing::warn!(event = %seed.name, email = %participant.email, error = %e, "Skipping seeded participant");
            }
        }

        tracing::info!(
            event_id = %event.id,
            name = %event.name,
            template = event.template_filename.as_deref().unwrap_or("-"),
            "Seeded event"
        );
    }
}

/// In-memory storage
pub struct InMemoryStore {
    data: RwLock<StoreData>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_log_capacity(DEFAULT_LOG_CAPACITY)
    }

    /// Empty store whose download and admin logs hold at most `capacity` entries
    pub fn with_log_capacity(capacity: usize) -> Self {
        Self {
            data: RwLock::new(StoreData::new(capacity)),
        }
    }

    /// Store pre-filled with the events from config.yaml
    pub fn seeded(config: &AppConfig) -> Self {
        let mut data = StoreData::new(DEFAULT_LOG_CAPACITY);
        for seed in &config.events {
            if seed.name.trim().is_empty() {
                tracing::warn!("Skipping seeded event without a name");
                continue;
            }
            data.seed_event(seed);
        }
        Self {
            data: RwLock::new(data),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn list_events(&self) -> Result<Vec<Event>, ApiError> {
        let data = self.data.read().await;
        let mut events: Vec<Event> = data.events.values().cloned().collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(events)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, ApiError> {
        Ok(self.data.read().await.events.get(&id).cloned())
    }

    async fn create_event(&self, new: NewEvent) -> Result<Event, ApiError> {
        Ok(self.data.write().await.insert_event(new))
    }

    async fn update_event<T, F>(&self, id: EventId, apply: F) -> Result<T, ApiError>
    where
        T: Send,
        F: FnOnce(&mut Event) -> Result<T, ApiError> + Send,
    {
        let mut data = self.data.write().await;
        let slot = data.events.get_mut(&id).ok_or(ApiError::EventNotFound)?;
        let mut event = slot.clone();
        let result = apply(&mut event)?;
        event.id = id;
        *slot = event;
        Ok(result)
    }

    async fn delete_event(&self, id: EventId) -> Result<(Event, Vec<Participant>), ApiError> {
        let mut data = self.data.write().await;
        let event = data.events.remove(&id).ok_or(ApiError::EventNotFound)?;

        let removed_ids: Vec<ParticipantId> = data
            .participants
            .values()
            .filter(|p| p.event_id == id)
            .map(|p| p.id)
            .collect();
        let removed = removed_ids
            .iter()
            .filter_map(|pid| data.participants.remove(pid))
            .collect();
        data.downloads.retain(|d| d.event_id != id);

        Ok((event, removed))
    }

    async fn list_participants(&self, event_id: EventId) -> Result<Vec<Participant>, ApiError> {
        let data = self.data.read().await;
        let mut participants: Vec<Participant> = data
            .participants
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect();
        participants.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(participants)
    }

    async fn count_participants(&self, event_id: EventId) -> Result<usize, ApiError> {
        let data = self.data.read().await;
        Ok(data
            .participants
            .values()
            .filter(|p| p.event_id == event_id)
            .count())
    }

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>, ApiError> {
        Ok(self.data.read().await.participants.get(&id).cloned())
    }

    async fn find_participant(
        &self,
        event_id: EventId,
        email: &Email,
    ) -> Result<Option<Participant>, ApiError> {
        let data = self.data.read().await;
        Ok(data
            .participants
            .values()
            .find(|p| p.event_id == event_id && &p.email == email)
            .cloned())
    }

    async fn add_participant(
        &self,
        event_id: EventId,
        name: String,
        email: Email,
    ) -> Result<Participant, ApiError> {
        self.data
            .write()
            .await
            .insert_participant(event_id, name, email)
    }

    async fn update_participant<T, F>(&self, id: ParticipantId, apply: F) -> Result<T, ApiError>
    where
        T: Send,
        F: FnOnce(&mut Participant) -> Result<T, ApiError> + Send,
    {
        let mut data = self.data.write().await;
        let mut participant = data
            .participants
            .get(&id)
            .cloned()
            .ok_or(ApiError::ParticipantNotFound)?;
        let result = apply(&mut participant)?;

        // identity and ownership are not editable
        participant.id = id;
        if let Some(current) = data.participants.get(&id) {
            participant.event_id = current.event_id;
        }
        if data.email_taken(participant.event_id, &participant.email, Some(id)) {
            return Err(ApiError::DuplicateParticipant);
        }
        data.participants.insert(id, participant);
        Ok(result)
    }

    async fn delete_participant(&self, id: ParticipantId) -> Result<Participant, ApiError> {
        let mut data = self.data.write().await;
        let participant = data
            .participants
            .remove(&id)
            .ok_or(ApiError::ParticipantNotFound)?;
        data.downloads.retain(|d| d.participant_id != id);
        Ok(participant)
    }

    async fn record_download(
        &self,
        participant_id: ParticipantId,
        ip_address: String,
    ) -> Result<Participant, ApiError> {
        let mut data = self.data.write().await;
        let participant = data
            .participants
            .get_mut(&participant_id)
            .ok_or(ApiError::ParticipantNotFound)?;
        participant.download_count += 1;
        let participant = participant.clone();

        let capacity = data.log_capacity;
        let entry = DownloadLog {
            participant_id,
            event_id: participant.event_id,
            timestamp: Utc::now(),
            ip_address,
        };
        push_bounded(&mut data.downloads, entry, capacity);
        Ok(participant)
    }

    async fn recent_downloads(&self, limit: usize) -> Result<Vec<DownloadLog>, ApiError> {
        let data = self.data.read().await;
        Ok(data.downloads.iter().rev().take(limit).cloned().collect())
    }

    async fn log_admin_action(&self, entry: AdminLogEntry) -> Result<(), ApiError> {
        tracing::info!(
            admin = %entry.admin,
            action = %entry.action,
            details = %entry.details,
            ip = %entry.ip_address,
            "Admin action"
        );
        let mut data = self.data.write().await;
        let capacity = data.log_capacity;
        push_bounded(&mut data.admin_logs, entry, capacity);
        Ok(())
    }

    async fn admin_logs(&self, limit: usize) -> Result<Vec<AdminLogEntry>, ApiError> {
        let data = self.data.read().await;
        Ok(data.admin_logs.iter().rev().take(limit).cloned().collect())
    }

    async fn stats(&self) -> Result<StoreStats, ApiError> {
        let data = self.data.read().await;
        Ok(StoreStats {
            total_events: data.events.len(),
            visible_events: data.events.values().filter(|e| e.is_visible).count(),
            total_participants: data.participants.len(),
            total_downloads: data
                .participants
                .values()
                .map(|p| p.download_count as usize)
                .sum(),
        })
    }
}
