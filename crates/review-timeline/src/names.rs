//! Display-name resolution for update actors.
//!
//! Names come from the entry's rosters first. Actors no longer on a roster are
//! looked up through a [`NameResolver`], once per id, with all lookups in
//! flight together. A failed lookup only affects its own id and falls back to
//! a sentinel name.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use futures::future::join_all;

use crate::config::NameConfig;
use crate::error::RepositoryError;
use crate::model::{
    AuthorUpdate, ManuscriptEntry, RefereeUpdate, TimelineUpdate, UpdateKind, UserId,
};

/// Looks up a user's display name by id.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve_user_name(&self, id: UserId) -> Result<String, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CachedName {
    Found(String),
    NotFound,
}

/// Outcome of one round of lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub resolved: Vec<UserId>,
    pub not_found: Vec<UserId>,
    /// Ids whose lookup failed transiently; retried on the next round
    pub failed: Vec<UserId>,
}

impl ResolutionReport {
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.not_found.is_empty() && self.failed.is_empty()
    }
}

/// Per-id cache of resolved names, with sentinel fallbacks.
#[derive(Debug, Clone, Default)]
pub struct NameCache {
    entries: HashMap<UserId, CachedName>,
    sentinels: NameConfig,
}

impl NameCache {
    pub fn new(sentinels: NameConfig) -> Self {
        Self {
            entries: HashMap::new(),
            sentinels,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Seed a known name, e.g. from an earlier session.
    pub fn insert(&mut self, id: UserId, name: impl Into<String>) {
        self.entries.insert(id, CachedName::Found(name.into()));
    }

    pub fn sentinel(&self, kind: UpdateKind) -> &str {
        match kind {
            UpdateKind::Author => &self.sentinels.unknown_author,
            UpdateKind::Referee => &self.sentinels.unknown_referee,
        }
    }

    /// Actor ids that are on neither their roster nor in the cache.
    pub fn missing_ids(
        &self,
        entry: &ManuscriptEntry,
        author_updates: &[AuthorUpdate],
        referee_updates: &[RefereeUpdate],
    ) -> BTreeSet<UserId> {
        let authors = author_updates
            .iter()
            .map(|u| u.author_id)
            .filter(|id| entry.author(*id).is_none());
        let referees = referee_updates
            .iter()
            .map(|u| u.referee_id)
            .filter(|id| entry.referee(*id).is_none());

        authors
            .chain(referees)
            .filter(|id| !self.contains(*id))
            .collect()
    }

    /// Look up every id concurrently and record the results.
    ///
    /// Ids already cached are skipped. Not-found answers are cached; transient
    /// failures are not, so the next round asks again.
    pub async fn resolve<R>(&mut self, resolver: &R, ids: BTreeSet<UserId>) -> ResolutionReport
    where
        R: NameResolver + ?Sized,
    {
        let requested = ids.len();
        let pending: Vec<UserId> = ids.into_iter().filter(|id| !self.contains(*id)).collect();
        if pending.len() < requested {
            tracing::debug!("{} actor names served from cache", requested - pending.len());
        }
        let mut report = ResolutionReport::default();
        if pending.is_empty() {
            return report;
        }

        tracing::debug!("Resolving {} missing actor names", pending.len());
        let lookups = pending.iter().map(|id| resolver.resolve_user_name(*id));
        let results = join_all(lookups).await;

        for (id, result) in pending.into_iter().zip(results) {
            match result {
                Ok(name) => {
                    self.entries.insert(id, CachedName::Found(name));
                    report.resolved.push(id);
                }
                Err(e) if e.is_not_found() => {
                    tracing::warn!("No user found for actor {}: {}", id, e);
                    self.entries.insert(id, CachedName::NotFound);
                    report.not_found.push(id);
                }
                Err(e) => {
                    tracing::warn!("Failed to resolve name for actor {}: {}", id, e);
                    report.failed.push(id);
                }
            }
        }

        report
    }

    /// Resolve whatever `missing_ids` reports for these streams.
    pub async fn resolve_missing<R>(
        &mut self,
        resolver: &R,
        entry: &ManuscriptEntry,
        author_updates: &[AuthorUpdate],
        referee_updates: &[RefereeUpdate],
    ) -> ResolutionReport
    where
        R: NameResolver + ?Sized,
    {
        let ids = self.missing_ids(entry, author_updates, referee_updates);
        self.resolve(resolver, ids).await
    }

    /// Display name for an update's actor: roster, then cache, then sentinel.
    pub fn display_name(&self, update: &TimelineUpdate, entry: &ManuscriptEntry) -> String {
        let actor = update.actor_id();
        let on_roster = match update.kind() {
            UpdateKind::Author => entry.author(actor),
            UpdateKind::Referee => entry.referee(actor),
        };

        if let Some(participant) = on_roster {
            return participant.display_name.clone();
        }

        match self.entries.get(&actor) {
            Some(CachedName::Found(name)) => name.clone(),
            _ => self.sentinel(update.kind()).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Participant;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;

    struct ScriptedResolver {
        calls: Mutex<Vec<UserId>>,
    }

    impl ScriptedResolver {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<UserId> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NameResolver for ScriptedResolver {
        async fn resolve_user_name(&self, id: UserId) -> Result<String, RepositoryError> {
            self.calls.lock().unwrap().push(id);
            match id.0 {
                40 => Ok("Former Author".to_string()),
                41 => Ok("Former Referee".to_string()),
                50 => Err(RepositoryError::NotFound(format!("user {}", id))),
                _ => Err(RepositoryError::Unavailable("timeout".to_string())),
            }
        }
    }

    fn t0() -> DateTime<Utc> {
        "2024-03-01T10:00:00Z".parse().unwrap()
    }

    fn entry() -> ManuscriptEntry {
        ManuscriptEntry::new(1)
            .with_author(Participant::new(10, "Ayse"))
            .with_referee(Participant::new(20, "Bora"))
    }

    #[test]
    fn test_missing_ids_excludes_roster_members() {
        let cache = NameCache::default();
        let authors = vec![
            AuthorUpdate::new(1, 10, t0()),
            AuthorUpdate::new(2, 40, t0()),
            AuthorUpdate::new(3, 40, t0()),
        ];
        let referees = vec![RefereeUpdate::new(5, 20, t0()), RefereeUpdate::new(6, 41, t0())];

        let missing = cache.missing_ids(&entry(), &authors, &referees);
        assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec![UserId(40), UserId(41)]);
    }

    #[test]
    fn test_author_on_referee_roster_is_still_missing() {
        let cache = NameCache::default();
        let authors = vec![AuthorUpdate::new(1, 20, t0())];
        let missing = cache.missing_ids(&entry(), &authors, &[]);
        assert!(missing.contains(&UserId(20)));
    }

    #[tokio::test]
    async fn test_resolve_isolates_failures() {
        let resolver = ScriptedResolver::new();
        let mut cache = NameCache::default();
        let ids: BTreeSet<UserId> = [40, 50, 60].into_iter().map(UserId).collect();

        let report = cache.resolve(&resolver, ids).await;

        assert_eq!(report.resolved, vec![UserId(40)]);
        assert_eq!(report.not_found, vec![UserId(50)]);
        assert_eq!(report.failed, vec![UserId(60)]);
        assert!(cache.contains(UserId(40)));
        assert!(cache.contains(UserId(50)));
        assert!(!cache.contains(UserId(60)));
    }

    #[tokio::test]
    async fn test_resolve_skips_cached_ids() {
        let resolver = ScriptedResolver::new();
        let mut cache = NameCache::default();
        cache.insert(UserId(40), "Seeded");

        let ids: BTreeSet<UserId> = [40, 41].into_iter().map(UserId).collect();
        cache.resolve(&resolver, ids.clone()).await;
        cache.resolve(&resolver, ids).await;

        assert_eq!(resolver.calls(), vec![UserId(41)]);
    }

    #[tokio::test]
    async fn test_transient_failure_retried() {
        let resolver = ScriptedResolver::new();
        let mut cache = NameCache::default();
        let ids: BTreeSet<UserId> = [60].into_iter().map(UserId).collect();

        cache.resolve(&resolver, ids.clone()).await;
        cache.resolve(&resolver, ids).await;

        assert_eq!(resolver.calls(), vec![UserId(60), UserId(60)]);
    }

    #[tokio::test]
    async fn test_display_name_fallbacks() {
        let resolver = ScriptedResolver::new();
        let mut cache = NameCache::default();
        let authors = vec![
            AuthorUpdate::new(1, 10, t0()),
            AuthorUpdate::new(2, 40, t0()),
            AuthorUpdate::new(3, 50, t0()),
        ];
        let referees = vec![RefereeUpdate::new(5, 60, t0())];
        cache
            .resolve_missing(&resolver, &entry(), &authors, &referees)
            .await;

        let name = |u: TimelineUpdate| cache.display_name(&u, &entry());
        assert_eq!(name(authors[0].clone().into()), "Ayse");
        assert_eq!(name(authors[1].clone().into()), "Former Author");
        assert_eq!(name(authors[2].clone().into()), "Unknown Author");
        assert_eq!(name(referees[0].clone().into()), "Unknown Referee");
    }

    #[test]
    fn test_custom_sentinels() {
        let cache = NameCache::new(NameConfig {
            unknown_author: "Bilinmeyen Yazar".to_string(),
            unknown_referee: "Bilinmeyen Hakem".to_string(),
        });
        let update: TimelineUpdate = RefereeUpdate::new(5, 99, t0()).into();
        assert_eq!(cache.display_name(&update, &entry()), "Bilinmeyen Hakem");
    }
}
