//! Merging author and referee streams into one ordered feed.
//!
//! Ordering is newest first. Updates sharing a timestamp are ordered by
//! `(kind, id)` ascending, authors before referees, so identical inputs always
//! give identical output.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    AuthorUpdate, ManuscriptEntry, RefereeUpdate, TimelineUpdate, UpdateId, UpdateKind, UserId,
    Viewer,
};
use crate::names::{NameCache, NameResolver, ResolutionReport};
use crate::permissions::{AccessPolicy, Authorization};

/// One feed item: a source update with its resolved actor name and the
/// viewer's capabilities over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedUpdate {
    pub update: TimelineUpdate,
    pub actor_name: String,
    pub authorization: Authorization,
}

impl CombinedUpdate {
    pub fn kind(&self) -> UpdateKind {
        self.update.kind()
    }

    pub fn id(&self) -> UpdateId {
        self.update.id()
    }

    pub fn actor_id(&self) -> UserId {
        self.update.actor_id()
    }

    pub fn created_date(&self) -> DateTime<Utc> {
        self.update.created_date()
    }

    pub fn can_view_notes(&self) -> bool {
        self.authorization.can_view_notes()
    }

    pub fn can_view_file(&self) -> bool {
        self.authorization.can_view_file()
    }

    pub fn can_delete(&self) -> bool {
        self.authorization.can_delete()
    }

    /// Notes the viewer may read.
    pub fn visible_notes(&self) -> Option<&str> {
        self.update.notes().filter(|_| self.can_view_notes())
    }

    /// File reference the viewer may open.
    pub fn visible_file(&self) -> Option<&str> {
        self.update.file_path().filter(|_| self.can_view_file())
    }

    /// Notes exist but are withheld from this viewer.
    pub fn has_hidden_notes(&self) -> bool {
        self.update.notes().is_some() && !self.can_view_notes()
    }

    /// A file exists but is withheld from this viewer.
    pub fn has_hidden_file(&self) -> bool {
        self.update.file_path().is_some() && !self.can_view_file()
    }

    /// Content the viewer could reveal by expanding the item: revised
    /// metadata for author updates, plus any visible file.
    pub fn has_expandable_content(&self) -> bool {
        let metadata = match &self.update {
            TimelineUpdate::Author(u) => u.has_metadata(),
            TimelineUpdate::Referee(_) => false,
        };
        metadata || self.visible_file().is_some()
    }
}

/// Feed order: newest first, then `(kind, id)` ascending.
pub fn feed_order(a: &TimelineUpdate, b: &TimelineUpdate) -> Ordering {
    b.created_date()
        .cmp(&a.created_date())
        .then_with(|| a.kind().cmp(&b.kind()))
        .then_with(|| a.id().cmp(&b.id()))
}

/// Merge both streams into feed order using names already in `names`.
///
/// Each source update yields exactly one item; nothing is merged or dropped.
pub fn merge_timeline(
    entry: &ManuscriptEntry,
    author_updates: &[AuthorUpdate],
    referee_updates: &[RefereeUpdate],
    viewer: &Viewer,
    names: &NameCache,
    policy: &AccessPolicy,
    now: DateTime<Utc>,
) -> Vec<CombinedUpdate> {
    let mut updates: Vec<TimelineUpdate> = author_updates
        .iter()
        .cloned()
        .map(TimelineUpdate::Author)
        .chain(referee_updates.iter().cloned().map(TimelineUpdate::Referee))
        .collect();
    updates.sort_by(feed_order);

    updates
        .into_iter()
        .map(|update| CombinedUpdate {
            actor_name: names.display_name(&update, entry),
            authorization: policy.authorize(&update, viewer, entry, now),
            update,
        })
        .collect()
}

/// Builds feeds, resolving off-roster actor names on the way.
pub struct TimelineBuilder<'a, R: NameResolver + ?Sized> {
    resolver: &'a R,
    names: &'a mut NameCache,
    policy: AccessPolicy,
}

impl<'a, R: NameResolver + ?Sized> TimelineBuilder<'a, R> {
    pub fn new(resolver: &'a R, names: &'a mut NameCache) -> Self {
        Self {
            resolver,
            names,
            policy: AccessPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve missing names, then merge. Lookup failures never fail the build.
    pub async fn build(
        &mut self,
        entry: &ManuscriptEntry,
        author_updates: &[AuthorUpdate],
        referee_updates: &[RefereeUpdate],
        viewer: &Viewer,
        now: DateTime<Utc>,
    ) -> Vec<CombinedUpdate> {
        self.resolve_names(entry, author_updates, referee_updates)
            .await;
        merge_timeline(
            entry,
            author_updates,
            referee_updates,
            viewer,
            &*self.names,
            &self.policy,
            now,
        )
    }

    pub async fn resolve_names(
        &mut self,
        entry: &ManuscriptEntry,
        author_updates: &[AuthorUpdate],
        referee_updates: &[RefereeUpdate],
    ) -> ResolutionReport {
        self.names
            .resolve_missing(self.resolver, entry, author_updates, referee_updates)
            .await
    }
}

/// One-shot build with a fresh cache and the default policy.
pub async fn build_timeline<R>(
    resolver: &R,
    entry: &ManuscriptEntry,
    author_updates: &[AuthorUpdate],
    referee_updates: &[RefereeUpdate],
    viewer: &Viewer,
    now: DateTime<Utc>,
) -> Vec<CombinedUpdate>
where
    R: NameResolver + ?Sized,
{
    let mut names = NameCache::default();
    TimelineBuilder::new(resolver, &mut names)
        .build(entry, author_updates, referee_updates, viewer, now)
        .await
}
