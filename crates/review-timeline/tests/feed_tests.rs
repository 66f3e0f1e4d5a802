//! Feed integration tests
//!
//! Loading through the repository and delete semantics: local removal only
//! after the repository confirms, and repeated deletes failing cleanly.

mod common;

use common::{minutes, scenario_repository};
use review_timeline::{
    DeleteError, EntryId, GlobalRole, LoadOutcome, Notice, RepositoryError, TimelineConfig,
    TimelineFeed, UpdateId, UpdateKind, UpdateRepository, Viewer,
};

async fn open(repo: &review_timeline::InMemoryRepository, viewer: Viewer) -> TimelineFeed {
    match TimelineFeed::load(repo, EntryId(1), viewer, &TimelineConfig::default()).await {
        LoadOutcome::Loaded(feed) => *feed,
        other => panic!("expected a loaded feed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_twice() {
    let repo = scenario_repository();
    let mut feed = open(&repo, Viewer::new(10, GlobalRole::Author)).await;

    feed.delete(&repo, UpdateKind::Author, UpdateId(1), minutes(5))
        .await
        .unwrap();
    let after_first = feed.updates(minutes(5));
    assert_eq!(after_first.len(), 1);
    assert_eq!(after_first[0].id(), UpdateId(5));

    let second = feed
        .delete(&repo, UpdateKind::Author, UpdateId(1), minutes(6))
        .await;
    assert_eq!(
        second,
        Err(DeleteError::NotInFeed {
            kind: UpdateKind::Author,
            id: UpdateId(1)
        })
    );
    assert_eq!(feed.updates(minutes(5)), after_first);
    assert!(matches!(
        feed.notice(),
        Some(Notice::DeleteFailed {
            kind: UpdateKind::Author,
            ..
        })
    ));
}

#[tokio::test]
async fn test_delete_already_removed_in_repository() {
    let repo = scenario_repository();
    let mut feed = open(&repo, Viewer::new(1, GlobalRole::Owner)).await;

    repo.delete_update(UpdateKind::Referee, UpdateId(5))
        .await
        .unwrap();
    let result = feed
        .delete(&repo, UpdateKind::Referee, UpdateId(5), minutes(2))
        .await;

    assert!(matches!(
        result,
        Err(DeleteError::Repository(RepositoryError::NotFound(_)))
    ));
    assert_eq!(feed.len(), 2);
}

#[tokio::test]
async fn test_other_referee_cannot_delete() {
    let repo = scenario_repository();
    let mut feed = open(&repo, Viewer::new(21, GlobalRole::Referee)).await;

    let result = feed
        .delete(&repo, UpdateKind::Referee, UpdateId(5), minutes(2))
        .await;

    assert!(matches!(result, Err(DeleteError::NotPermitted { .. })));
    assert_eq!(repo.snapshot().unwrap().entries[0].referee_updates.len(), 1);
}

#[tokio::test]
async fn test_deleting_referee_in_window() {
    let repo = scenario_repository();
    let mut feed = open(&repo, Viewer::new(20, GlobalRole::Referee)).await;

    assert!(feed
        .get(UpdateKind::Referee, UpdateId(5), minutes(10))
        .unwrap()
        .can_delete());
    feed.delete(&repo, UpdateKind::Referee, UpdateId(5), minutes(10))
        .await
        .unwrap();

    assert!(feed
        .get(UpdateKind::Referee, UpdateId(5), minutes(10))
        .is_none());
    assert!(feed.notice().is_none());
}

#[tokio::test]
async fn test_capabilities_follow_the_clock() {
    let repo = scenario_repository();
    let feed = open(&repo, Viewer::new(10, GlobalRole::Author)).await;

    let early = feed.get(UpdateKind::Author, UpdateId(1), minutes(10)).unwrap();
    let late = feed.get(UpdateKind::Author, UpdateId(1), minutes(20)).unwrap();

    assert!(early.can_delete());
    assert!(!late.can_delete());
}

#[tokio::test]
async fn test_load_failure_is_contained() {
    let repo = scenario_repository();
    repo.set_offline(true);

    let outcome = TimelineFeed::load(
        &repo,
        EntryId(1),
        Viewer::anonymous(),
        &TimelineConfig::default(),
    )
    .await;

    match outcome {
        LoadOutcome::Failed(message) => assert!(message.contains("unavailable")),
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_entry() {
    let repo = scenario_repository();
    let outcome = TimelineFeed::load(
        &repo,
        EntryId(404),
        Viewer::anonymous(),
        &TimelineConfig::default(),
    )
    .await;

    assert!(matches!(outcome, LoadOutcome::EntryNotFound(EntryId(404))));
}
