//! Data model for manuscript entries and their update streams.
//!
//! Author revisions and referee reviews arrive as two independent lists. They
//! are carried here as plain records and joined under [`TimelineUpdate`], an
//! explicit tagged variant, so every consumer matches on the stream exhaustively.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(i64::from(value))
            }
        }
    };
}

id_newtype!(
    /// Identifier of a platform user (author, referee, editor, ...).
    UserId
);
id_newtype!(
    /// Identifier of a manuscript entry.
    EntryId
);
id_newtype!(
    /// Identifier of an author or referee update, unique within its stream.
    UpdateId
);

/// Global role of a platform user, independent of any single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalRole {
    Admin,
    Owner,
    Editor,
    Author,
    Referee,
    User,
    #[default]
    None,
}

impl GlobalRole {
    /// Admin and owner roles bypass the deletion window.
    pub fn is_privileged(&self) -> bool {
        matches!(self, GlobalRole::Admin | GlobalRole::Owner)
    }

    /// Roles that may read every referee report on every entry.
    pub fn is_editor_equivalent(&self) -> bool {
        self.is_privileged() || matches!(self, GlobalRole::Editor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalRole::Admin => "admin",
            GlobalRole::Owner => "owner",
            GlobalRole::Editor => "editor",
            GlobalRole::Author => "author",
            GlobalRole::Referee => "referee",
            GlobalRole::User => "user",
            GlobalRole::None => "none",
        }
    }
}

impl fmt::Display for GlobalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlobalRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(GlobalRole::Admin),
            "owner" => Ok(GlobalRole::Owner),
            "editor" => Ok(GlobalRole::Editor),
            "author" => Ok(GlobalRole::Author),
            "referee" => Ok(GlobalRole::Referee),
            "user" => Ok(GlobalRole::User),
            "none" | "" => Ok(GlobalRole::None),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The principal currently looking at a timeline.
///
/// Supplied by the identity layer and threaded explicitly into every
/// permission check. An anonymous viewer has no id and never matches an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: Option<UserId>,
    pub role: GlobalRole,
}

impl Viewer {
    pub fn new(id: impl Into<UserId>, role: GlobalRole) -> Self {
        Self {
            id: Some(id.into()),
            role,
        }
    }

    /// An unauthenticated, role-less viewer.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            role: GlobalRole::None,
        }
    }

    /// Identity comparison against a user id. Anonymous viewers match nobody.
    pub fn is(&self, user: UserId) -> bool {
        self.id == Some(user)
    }

    /// Whether the viewer has signed in. Roles only count for signed-in viewers.
    pub fn is_authenticated(&self) -> bool {
        self.id.is_some()
    }

    /// Signed-in admin or owner.
    pub fn is_privileged(&self) -> bool {
        self.is_authenticated() && self.role.is_privileged()
    }

    /// Signed-in admin, owner or global editor.
    pub fn is_editor_equivalent(&self) -> bool {
        self.is_authenticated() && self.role.is_editor_equivalent()
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// A user attached to one entry as author, referee or journal editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: UserId,
    #[serde(alias = "name")]
    pub display_name: String,
}

impl Participant {
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// A submitted manuscript together with its participant rosters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptEntry {
    pub id: EntryId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<Participant>,
    #[serde(default)]
    pub referees: Vec<Participant>,
    /// Editors of the journal the entry belongs to.
    #[serde(default)]
    pub editors: Vec<Participant>,
}

impl ManuscriptEntry {
    pub fn new(id: impl Into<EntryId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            authors: Vec::new(),
            referees: Vec::new(),
            editors: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: Participant) -> Self {
        self.authors.push(author);
        self
    }

    pub fn with_referee(mut self, referee: Participant) -> Self {
        self.referees.push(referee);
        self
    }

    pub fn with_editor(mut self, editor: Participant) -> Self {
        self.editors.push(editor);
        self
    }

    pub fn author(&self, id: UserId) -> Option<&Participant> {
        self.authors.iter().find(|p| p.id == id)
    }

    pub fn referee(&self, id: UserId) -> Option<&Participant> {
        self.referees.iter().find(|p| p.id == id)
    }

    pub fn has_author(&self, viewer: &Viewer) -> bool {
        viewer.id.is_some_and(|id| self.author(id).is_some())
    }

    pub fn has_referee(&self, viewer: &Viewer) -> bool {
        viewer.id.is_some_and(|id| self.referee(id).is_some())
    }

    pub fn has_editor(&self, viewer: &Viewer) -> bool {
        viewer
            .id
            .is_some_and(|id| self.editors.iter().any(|p| p.id == id))
    }

    /// Rosters with duplicate ids collapsed; the last record for an id wins
    /// while first-seen order is kept.
    pub fn normalized(mut self) -> Self {
        dedup_roster(&mut self.authors);
        dedup_roster(&mut self.referees);
        dedup_roster(&mut self.editors);
        self
    }
}

fn dedup_roster(roster: &mut Vec<Participant>) {
    let mut unique: Vec<Participant> = Vec::with_capacity(roster.len());
    for participant in roster.drain(..) {
        match unique.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant,
            None => unique.push(participant),
        }
    }
    *roster = unique;
}

/// A revision submitted by one of the entry's authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorUpdate {
    pub id: UpdateId,
    pub author_id: UserId,
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub abstract_tr: Option<String>,
    #[serde(default)]
    pub abstract_en: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub keywords_en: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AuthorUpdate {
    pub fn new(
        id: impl Into<UpdateId>,
        author_id: impl Into<UserId>,
        created_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            created_date,
            title: None,
            abstract_tr: None,
            abstract_en: None,
            keywords: None,
            keywords_en: None,
            file_path: None,
            notes: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_abstracts(mut self, tr: impl Into<String>, en: impl Into<String>) -> Self {
        self.abstract_tr = Some(tr.into());
        self.abstract_en = Some(en.into());
        self
    }

    pub fn with_keywords(mut self, tr: impl Into<String>, en: impl Into<String>) -> Self {
        self.keywords = Some(tr.into());
        self.keywords_en = Some(en.into());
        self
    }

    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Whether the revision changes any manuscript metadata.
    pub fn has_metadata(&self) -> bool {
        [
            &self.title,
            &self.abstract_tr,
            &self.abstract_en,
            &self.keywords,
            &self.keywords_en,
        ]
        .iter()
        .any(|field| non_blank(field.as_deref()).is_some())
    }
}

/// A review submitted by one of the entry's referees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefereeUpdate {
    pub id: UpdateId,
    pub referee_id: UserId,
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RefereeUpdate {
    pub fn new(
        id: impl Into<UpdateId>,
        referee_id: impl Into<UserId>,
        created_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            referee_id: referee_id.into(),
            created_date,
            file_path: None,
            notes: None,
        }
    }

    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Which stream an update came from.
///
/// The derived ordering (`Author < Referee`) is the tie-break used by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Author,
    Referee,
}

impl UpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::Author => "author",
            UpdateKind::Referee => "referee",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "author" => Ok(UpdateKind::Author),
            "referee" => Ok(UpdateKind::Referee),
            other => Err(format!("unknown update kind: {}", other)),
        }
    }
}

/// One update from either stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TimelineUpdate {
    Author(AuthorUpdate),
    Referee(RefereeUpdate),
}

impl TimelineUpdate {
    pub fn kind(&self) -> UpdateKind {
        match self {
            TimelineUpdate::Author(_) => UpdateKind::Author,
            TimelineUpdate::Referee(_) => UpdateKind::Referee,
        }
    }

    pub fn id(&self) -> UpdateId {
        match self {
            TimelineUpdate::Author(u) => u.id,
            TimelineUpdate::Referee(u) => u.id,
        }
    }

    /// The user who authored this update.
    pub fn actor_id(&self) -> UserId {
        match self {
            TimelineUpdate::Author(u) => u.author_id,
            TimelineUpdate::Referee(u) => u.referee_id,
        }
    }

    pub fn created_date(&self) -> DateTime<Utc> {
        match self {
            TimelineUpdate::Author(u) => u.created_date,
            TimelineUpdate::Referee(u) => u.created_date,
        }
    }

    /// Notes, unless missing or blank.
    pub fn notes(&self) -> Option<&str> {
        let notes = match self {
            TimelineUpdate::Author(u) => u.notes.as_deref(),
            TimelineUpdate::Referee(u) => u.notes.as_deref(),
        };
        non_blank(notes)
    }

    /// File reference, unless missing or blank.
    pub fn file_path(&self) -> Option<&str> {
        let path = match self {
            TimelineUpdate::Author(u) => u.file_path.as_deref(),
            TimelineUpdate::Referee(u) => u.file_path.as_deref(),
        };
        non_blank(path)
    }
}

/// Treats whitespace-only text as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<AuthorUpdate> for TimelineUpdate {
    fn from(update: AuthorUpdate) -> Self {
        TimelineUpdate::Author(update)
    }
}

impl From<RefereeUpdate> for TimelineUpdate {
    fn from(update: RefereeUpdate) -> Self {
        TimelineUpdate::Referee(update)
    }
}
