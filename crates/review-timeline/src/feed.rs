//! A viewer's session over one entry's timeline.
//!
//! [`TimelineFeed`] owns the raw streams fetched from the repository and
//! rebuilds the ordered view on demand, so capabilities always reflect the
//! current viewer and clock. Repository failures are turned into local state
//! here and never propagate past the feed.

use chrono::{DateTime, Utc};
use futures::future::join;
use serde::Serialize;

use crate::clipboard::{ClipboardChain, CopyOutcome};
use crate::config::TimelineConfig;
use crate::error::DeleteError;
use crate::export::Exporter;
use crate::model::{
    AuthorUpdate, EntryId, ManuscriptEntry, RefereeUpdate, TimelineUpdate, UpdateId, UpdateKind,
    Viewer,
};
use crate::names::{NameCache, ResolutionReport};
use crate::permissions::{entry_actions, AccessPolicy, EntryActions};
use crate::presentation::{ExpansionState, UpdateKey};
use crate::repository::UpdateRepository;
use crate::timeline::{merge_timeline, CombinedUpdate};

/// Result of opening a feed.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Box<TimelineFeed>),
    EntryNotFound(EntryId),
    Failed(String),
}

impl LoadOutcome {
    pub fn into_feed(self) -> Option<TimelineFeed> {
        match self {
            LoadOutcome::Loaded(feed) => Some(*feed),
            _ => None,
        }
    }
}

/// Transient, dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    DeleteFailed {
        kind: UpdateKind,
        id: UpdateId,
        reason: String,
    },
}

/// A feed item as a shell would render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub key: UpdateKey,
    pub expanded: bool,
    #[serde(flatten)]
    pub update: CombinedUpdate,
}

#[derive(Debug)]
pub struct TimelineFeed {
    entry: ManuscriptEntry,
    author_updates: Vec<AuthorUpdate>,
    referee_updates: Vec<RefereeUpdate>,
    viewer: Viewer,
    names: NameCache,
    policy: AccessPolicy,
    exporter: Exporter,
    expansion: ExpansionState,
    notice: Option<Notice>,
}

impl TimelineFeed {
    /// Assemble a feed from already-fetched parts. Names are not resolved.
    pub fn new(
        entry: ManuscriptEntry,
        author_updates: Vec<AuthorUpdate>,
        referee_updates: Vec<RefereeUpdate>,
        viewer: Viewer,
        config: &TimelineConfig,
    ) -> Self {
        Self {
            entry: entry.normalized(),
            author_updates,
            referee_updates,
            viewer,
            names: NameCache::new(config.names.clone()),
            policy: AccessPolicy::from_config(&config.policy),
            exporter: Exporter::from_config(&config.export),
            expansion: ExpansionState::new(),
            notice: None,
        }
    }

    /// Fetch the entry and both streams, then resolve off-roster names.
    pub async fn load<R>(
        repo: &R,
        entry_id: EntryId,
        viewer: Viewer,
        config: &TimelineConfig,
    ) -> LoadOutcome
    where
        R: UpdateRepository + ?Sized,
    {
        let entry = match repo.fetch_entry(entry_id).await {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Entry {} not found", entry_id);
                return LoadOutcome::EntryNotFound(entry_id);
            }
            Err(e) => {
                tracing::warn!("Failed to load entry {}: {}", entry_id, e);
                return LoadOutcome::Failed(format!("Failed to load entry {}: {}", entry_id, e));
            }
        };

        let (authors, referees) = join(
            repo.fetch_author_updates(entry_id),
            repo.fetch_referee_updates(entry_id),
        )
        .await;

        let (author_updates, referee_updates) = match (authors, referees) {
            (Ok(a), Ok(r)) => (a, r),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Failed to load updates for entry {}: {}", entry_id, e);
                return LoadOutcome::Failed(format!(
                    "Failed to load updates for entry {}: {}",
                    entry_id, e
                ));
            }
        };

        let mut feed = Self::new(entry, author_updates, referee_updates, viewer, config);
        feed.refresh_names(repo).await;
        tracing::debug!(
            "Loaded entry {} with {} author and {} referee updates",
            entry_id,
            feed.author_updates.len(),
            feed.referee_updates.len()
        );
        LoadOutcome::Loaded(Box::new(feed))
    }

    pub fn entry(&self) -> &ManuscriptEntry {
        &self.entry
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Switch viewer; capabilities are recomputed on the next read.
    pub fn set_viewer(&mut self, viewer: Viewer) {
        self.viewer = viewer;
    }

    pub fn len(&self) -> usize {
        self.author_updates.len() + self.referee_updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up names for actors missing from the rosters.
    pub async fn refresh_names<R>(&mut self, repo: &R) -> ResolutionReport
    where
        R: UpdateRepository + ?Sized,
    {
        self.names
            .resolve_missing(repo, &self.entry, &self.author_updates, &self.referee_updates)
            .await
    }

    /// The ordered feed as of `now`.
    pub fn updates(&self, now: DateTime<Utc>) -> Vec<CombinedUpdate> {
        merge_timeline(
            &self.entry,
            &self.author_updates,
            &self.referee_updates,
            &self.viewer,
            &self.names,
            &self.policy,
            now,
        )
    }

    /// The ordered feed with keys and expansion state attached.
    pub fn items(&self, now: DateTime<Utc>) -> Vec<FeedItem> {
        self.updates(now)
            .into_iter()
            .enumerate()
            .map(|(position, update)| {
                let key = UpdateKey::for_item(&update, position);
                FeedItem {
                    key,
                    expanded: self.expansion.is_expanded(key, &update),
                    update,
                }
            })
            .collect()
    }

    pub fn get(&self, kind: UpdateKind, id: UpdateId, now: DateTime<Utc>) -> Option<CombinedUpdate> {
        self.updates(now)
            .into_iter()
            .find(|u| u.kind() == kind && u.id() == id)
    }

    pub fn actions(&self) -> EntryActions {
        entry_actions(&self.viewer, &self.entry)
    }

    /// Flip an item's expansion. `None` if the key no longer matches an item.
    pub fn toggle_expanded(&mut self, key: UpdateKey, now: DateTime<Utc>) -> Option<bool> {
        let item = self
            .updates(now)
            .into_iter()
            .nth(key.position)
            .filter(|item| item.kind() == key.kind && item.id() == key.id)?;
        Some(self.expansion.toggle(key, &item))
    }

    pub fn set_expanded(&mut self, key: UpdateKey, expanded: bool) {
        self.expansion.set_expanded(key, expanded);
    }

    pub fn is_expanded(&self, key: UpdateKey, now: DateTime<Utc>) -> bool {
        self.items(now)
            .into_iter()
            .find(|item| item.key == key)
            .is_some_and(|item| item.expanded)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Canonical text for one item, as this viewer may see it.
    pub fn export(&self, kind: UpdateKind, id: UpdateId, now: DateTime<Utc>) -> Option<String> {
        self.get(kind, id, now).map(|item| self.exporter.render(&item))
    }

    /// Export one item and hand it to the clipboard chain.
    pub fn copy(
        &self,
        kind: UpdateKind,
        id: UpdateId,
        now: DateTime<Utc>,
        chain: &ClipboardChain,
    ) -> Option<CopyOutcome> {
        self.export(kind, id, now).map(|text| chain.copy(&text))
    }

    /// Delete an update through the repository.
    ///
    /// The item leaves the feed only once the repository confirms. Every
    /// failure leaves the feed as it was and sets a notice.
    pub async fn delete<R>(
        &mut self,
        repo: &R,
        kind: UpdateKind,
        id: UpdateId,
        now: DateTime<Utc>,
    ) -> Result<(), DeleteError>
    where
        R: UpdateRepository + ?Sized,
    {
        let result = self.try_delete(repo, kind, id, now).await;
        match &result {
            Ok(()) => {
                tracing::info!("Deleted {} update {}", kind, id);
                self.notice = None;
            }
            Err(e) => {
                tracing::warn!("Failed to delete {} update {}: {}", kind, id, e);
                self.notice = Some(Notice::DeleteFailed {
                    kind,
                    id,
                    reason: e.to_string(),
                });
            }
        }
        result
    }

    async fn try_delete<R>(
        &mut self,
        repo: &R,
        kind: UpdateKind,
        id: UpdateId,
        now: DateTime<Utc>,
    ) -> Result<(), DeleteError>
    where
        R: UpdateRepository + ?Sized,
    {
        let update = self.find(kind, id).ok_or(DeleteError::NotInFeed { kind, id })?;

        if update.created_date() > now {
            tracing::debug!(
                "{} update {} is dated {} ahead of the local clock",
                kind,
                id,
                update.created_date() - now
            );
        }
        if !self.policy.can_delete(&update, &self.viewer, now) {
            return Err(DeleteError::NotPermitted { kind, id });
        }

        repo.delete_update(kind, id).await?;
        self.remove(kind, id);
        self.expansion.forget(kind, id);
        Ok(())
    }

    fn find(&self, kind: UpdateKind, id: UpdateId) -> Option<TimelineUpdate> {
        match kind {
            UpdateKind::Author => self
                .author_updates
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .map(TimelineUpdate::Author),
            UpdateKind::Referee => self
                .referee_updates
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .map(TimelineUpdate::Referee),
        }
    }

    fn remove(&mut self, kind: UpdateKind, id: UpdateId) {
        match kind {
            UpdateKind::Author => self.author_updates.retain(|u| u.id != id),
            UpdateKind::Referee => self.referee_updates.retain(|u| u.id != id),
        }
    }
}
