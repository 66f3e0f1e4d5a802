//! Per-viewer capabilities over timeline updates, using bitflags.
//!
//! Every visibility and deletion decision for the timeline is made here, from
//! three explicit inputs: the update, the [`Viewer`] and the entry's rosters,
//! plus the wall-clock instant the decision is made for. Nothing is read from
//! ambient session state. Results depend on `now` through the deletion window
//! and must be recomputed rather than cached.

use bitflags::bitflags;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::model::{ManuscriptEntry, TimelineUpdate, UserId, Viewer};

bitflags! {
    /// Capabilities one viewer holds over one update.
    ///
    /// A missing flag is a denial; denials are never raised as errors.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Authorization: u8 {
        /// The update's notes may be shown
        const VIEW_NOTES = 0b001;
        /// The update's file reference may be shown
        const VIEW_FILE = 0b010;
        /// The viewer may delete the update
        const DELETE = 0b100;
    }
}

#[derive(Serialize, Deserialize)]
struct AuthorizationFields {
    can_view_notes: bool,
    can_view_file: bool,
    can_delete: bool,
}

impl Serialize for Authorization {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        AuthorizationFields {
            can_view_notes: self.can_view_notes(),
            can_view_file: self.can_view_file(),
            can_delete: self.can_delete(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Authorization {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let fields = AuthorizationFields::deserialize(deserializer)?;
        let mut auth = Authorization::empty();
        auth.set(Authorization::VIEW_NOTES, fields.can_view_notes);
        auth.set(Authorization::VIEW_FILE, fields.can_view_file);
        auth.set(Authorization::DELETE, fields.can_delete);
        Ok(auth)
    }
}

impl Authorization {
    /// Both content flags, no deletion right.
    pub const READ_ALL: Authorization = Authorization::VIEW_NOTES.union(Authorization::VIEW_FILE);

    #[inline]
    pub fn can_view_notes(&self) -> bool {
        self.contains(Authorization::VIEW_NOTES)
    }

    #[inline]
    pub fn can_view_file(&self) -> bool {
        self.contains(Authorization::VIEW_FILE)
    }

    #[inline]
    pub fn can_delete(&self) -> bool {
        self.contains(Authorization::DELETE)
    }
}

/// Access rules with a configurable deletion window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    deletion_window: Duration,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default())
    }
}

impl AccessPolicy {
    pub fn new(deletion_window: Duration) -> Self {
        Self { deletion_window }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(config.deletion_window())
    }

    pub fn deletion_window(&self) -> Duration {
        self.deletion_window
    }

    /// Compute what `viewer` may do with `update` at instant `now`.
    pub fn authorize(
        &self,
        update: &TimelineUpdate,
        viewer: &Viewer,
        entry: &ManuscriptEntry,
        now: DateTime<Utc>,
    ) -> Authorization {
        let mut auth = match update {
            TimelineUpdate::Author(_) => Authorization::READ_ALL,
            TimelineUpdate::Referee(review) => {
                if can_read_review(viewer, entry, review.referee_id) {
                    Authorization::READ_ALL
                } else {
                    Authorization::empty()
                }
            }
        };

        if self.can_delete(update, viewer, now) {
            auth.insert(Authorization::DELETE);
        }

        auth
    }

    /// Deletion right: privileged role, or own update inside the window.
    ///
    /// Ownership is decided by id only; display names play no part.
    pub fn can_delete(&self, update: &TimelineUpdate, viewer: &Viewer, now: DateTime<Utc>) -> bool {
        if viewer.is_privileged() {
            return true;
        }
        viewer.is(update.actor_id()) && self.within_window(update.created_date(), now)
    }

    /// Whether `now` is at most one window past `created`.
    ///
    /// Compares the stored UTC timestamp with the local clock as-is. A creation
    /// time in the future (clock skew) counts as inside the window.
    pub fn within_window(&self, created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(created) <= self.deletion_window
    }

    /// Time left to delete an own update, if any.
    pub fn remaining_window(
        &self,
        created: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let remaining = self.deletion_window - now.signed_duration_since(created);
        (remaining >= Duration::zero()).then_some(remaining)
    }
}

/// Referee reports are readable by signed-in editor-equivalent roles, any
/// author of the entry and the referee who wrote them. Journal editors get
/// entry actions only.
fn can_read_review(viewer: &Viewer, entry: &ManuscriptEntry, referee: UserId) -> bool {
    viewer.is_editor_equivalent() || entry.has_author(viewer) || viewer.is(referee)
}

/// [`AccessPolicy::authorize`] with the default fifteen-minute window.
pub fn authorize(
    update: &TimelineUpdate,
    viewer: &Viewer,
    entry: &ManuscriptEntry,
    now: DateTime<Utc>,
) -> Authorization {
    AccessPolicy::default().authorize(update, viewer, entry, now)
}

/// Entry-level actions a viewer may start from the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryActions {
    pub can_add_author_update: bool,
    pub can_add_referee_update: bool,
    pub can_edit_entry: bool,
}

pub fn entry_actions(viewer: &Viewer, entry: &ManuscriptEntry) -> EntryActions {
    let privileged = viewer.is_privileged();
    let journal_editor = entry.has_editor(viewer);

    EntryActions {
        can_add_author_update: privileged || journal_editor || entry.has_author(viewer),
        can_add_referee_update: privileged || journal_editor || entry.has_referee(viewer),
        can_edit_entry: viewer.is_editor_equivalent() || journal_editor,
    }
}
