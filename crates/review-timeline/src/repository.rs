//! The update repository collaborator and an in-memory implementation.
//!
//! Persistence and transport live behind [`UpdateRepository`]. The
//! [`InMemoryRepository`] serves tests and the command-line shell from a JSON
//! snapshot.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, Result};
use crate::model::{
    AuthorUpdate, EntryId, ManuscriptEntry, Participant, RefereeUpdate, UpdateId, UpdateKind,
    UserId,
};
use crate::names::NameResolver;

/// Source of entries and update streams, and sink for deletions.
#[async_trait]
pub trait UpdateRepository: NameResolver {
    async fn fetch_entry(&self, id: EntryId) -> std::result::Result<ManuscriptEntry, RepositoryError>;

    async fn fetch_author_updates(
        &self,
        entry: EntryId,
    ) -> std::result::Result<Vec<AuthorUpdate>, RepositoryError>;

    async fn fetch_referee_updates(
        &self,
        entry: EntryId,
    ) -> std::result::Result<Vec<RefereeUpdate>, RepositoryError>;

    async fn delete_author_update(&self, id: UpdateId) -> std::result::Result<(), RepositoryError>;

    async fn delete_referee_update(&self, id: UpdateId)
        -> std::result::Result<(), RepositoryError>;

    /// Route a deletion to the right stream.
    async fn delete_update(
        &self,
        kind: UpdateKind,
        id: UpdateId,
    ) -> std::result::Result<(), RepositoryError> {
        match kind {
            UpdateKind::Author => self.delete_author_update(id).await,
            UpdateKind::Referee => self.delete_referee_update(id).await,
        }
    }
}

/// One entry with both of its update streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub entry: ManuscriptEntry,
    #[serde(default)]
    pub author_updates: Vec<AuthorUpdate>,
    #[serde(default)]
    pub referee_updates: Vec<RefereeUpdate>,
}

impl EntryRecord {
    pub fn new(entry: ManuscriptEntry) -> Self {
        Self {
            entry,
            author_updates: Vec::new(),
            referee_updates: Vec::new(),
        }
    }
}

/// Serializable contents of an [`InMemoryRepository`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    #[serde(default)]
    pub entries: Vec<EntryRecord>,
    /// Directory used for name lookups
    #[serde(default)]
    pub users: Vec<Participant>,
}

impl RepositorySnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    fn record(&self, id: EntryId) -> Option<&EntryRecord> {
        self.entries.iter().find(|r| r.entry.id == id)
    }
}

/// Repository held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    state: Mutex<RepositorySnapshot>,
    unreachable_users: HashSet<UserId>,
    offline: AtomicBool,
}

impl InMemoryRepository {
    pub fn new(snapshot: RepositorySnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            unreachable_users: HashSet::new(),
            offline: AtomicBool::new(false),
        }
    }

    /// Lookups for this user fail as if the directory timed out.
    pub fn with_unreachable_user(mut self, id: impl Into<UserId>) -> Self {
        self.unreachable_users.insert(id.into());
        self
    }

    /// While offline every call fails with [`RepositoryError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Result<RepositorySnapshot> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, RepositorySnapshot>, RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("repository offline".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository state poisoned".to_string()))
    }

    fn entry_not_found(id: EntryId) -> RepositoryError {
        RepositoryError::NotFound(format!("entry {}", id))
    }
}

#[async_trait]
impl NameResolver for InMemoryRepository {
    async fn resolve_user_name(&self, id: UserId) -> std::result::Result<String, RepositoryError> {
        if self.unreachable_users.contains(&id) {
            return Err(RepositoryError::Unavailable(format!("lookup of user {} timed out", id)));
        }
        let state = self.lock()?;
        state
            .users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.display_name.clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))
    }
}

#[async_trait]
impl UpdateRepository for InMemoryRepository {
    async fn fetch_entry(&self, id: EntryId) -> std::result::Result<ManuscriptEntry, RepositoryError> {
        let state = self.lock()?;
        state
            .record(id)
            .map(|r| r.entry.clone())
            .ok_or_else(|| Self::entry_not_found(id))
    }

    async fn fetch_author_updates(
        &self,
        entry: EntryId,
    ) -> std::result::Result<Vec<AuthorUpdate>, RepositoryError> {
        let state = self.lock()?;
        state
            .record(entry)
            .map(|r| r.author_updates.clone())
            .ok_or_else(|| Self::entry_not_found(entry))
    }

    async fn fetch_referee_updates(
        &self,
        entry: EntryId,
    ) -> std::result::Result<Vec<RefereeUpdate>, RepositoryError> {
        let state = self.lock()?;
        state
            .record(entry)
            .map(|r| r.referee_updates.clone())
            .ok_or_else(|| Self::entry_not_found(entry))
    }

    async fn delete_author_update(&self, id: UpdateId) -> std::result::Result<(), RepositoryError> {
        let mut state = self.lock()?;
        for record in state.entries.iter_mut() {
            if let Some(pos) = record.author_updates.iter().position(|u| u.id == id) {
                record.author_updates.remove(pos);
                return Ok(());
            }
        }
        Err(RepositoryError::NotFound(format!("author update {}", id)))
    }

    async fn delete_referee_update(
        &self,
        id: UpdateId,
    ) -> std::result::Result<(), RepositoryError> {
        let mut state = self.lock()?;
        for record in state.entries.iter_mut() {
            if let Some(pos) = record.referee_updates.iter().position(|u| u.id == id) {
                record.referee_updates.remove(pos);
                return Ok(());
            }
        }
        Err(RepositoryError::NotFound(format!("referee update {}", id)))
    }
}
