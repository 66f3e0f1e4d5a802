//! Subcommand handlers.

use std::path::Path;

use review_timeline::{
    ClipboardChain, CopyOutcome, EntryId, InMemoryRepository, LoadOutcome, RepositorySnapshot,
    TimelineConfig, TimelineFeed, UpdateId,
};

use crate::{Target, UpdateRef};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

async fn open(
    repo: &InMemoryRepository,
    config: &TimelineConfig,
    target: &Target,
) -> Result<TimelineFeed, Box<dyn std::error::Error>> {
    let entry = EntryId(target.entry);
    match TimelineFeed::load(repo, entry, target.viewer(), config).await {
        LoadOutcome::Loaded(feed) => Ok(*feed),
        LoadOutcome::EntryNotFound(id) => Err(format!("entry {} not found", id).into()),
        LoadOutcome::Failed(message) => Err(message.into()),
    }
}

fn load_repository(snapshot: &Path) -> Result<InMemoryRepository, Box<dyn std::error::Error>> {
    Ok(InMemoryRepository::new(RepositorySnapshot::load(snapshot)?))
}

pub(crate) async fn timeline(
    snapshot: &Path,
    config: &TimelineConfig,
    target: &Target,
    json: bool,
) -> CommandResult {
    let repo = load_repository(snapshot)?;
    let feed = open(&repo, config, target).await?;
    let now = target.now();
    let items = feed.items(now);

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No updates for entry {}", feed.entry().id);
        return Ok(());
    }

    for item in &items {
        let marker = if item.expanded { "-" } else { "+" };
        let deletable = if item.update.can_delete() {
            "  [deletable]"
        } else {
            ""
        };
        println!(
            "{} {} {}  {}  {}{}",
            marker,
            item.key,
            item.update.created_date().format("%Y-%m-%d %H:%M"),
            item.update.kind(),
            item.update.actor_name,
            deletable
        );
        if item.expanded {
            if let Some(text) = feed.export(item.update.kind(), item.update.id(), now) {
                for line in text.lines().skip(3) {
                    println!("    {}", line);
                }
            }
        }
    }
    Ok(())
}

pub(crate) async fn export(
    snapshot: &Path,
    config: &TimelineConfig,
    target: &Target,
    update: &UpdateRef,
    copy: bool,
) -> CommandResult {
    let repo = load_repository(snapshot)?;
    let feed = open(&repo, config, target).await?;
    let now = target.now();
    let id = UpdateId(update.update);

    if !copy {
        let text = feed
            .export(update.kind, id, now)
            .ok_or_else(|| format!("{} update {} is not in the timeline", update.kind, id))?;
        println!("{}", text);
        return Ok(());
    }

    let outcome = feed
        .copy(update.kind, id, now, &ClipboardChain::system())
        .ok_or_else(|| format!("{} update {} is not in the timeline", update.kind, id))?;

    match outcome {
        CopyOutcome::Copied { strategy } => eprintln!("Copied via {}", strategy),
        CopyOutcome::Degraded { strategy, failures } => {
            eprintln!(
                "Copied via {} after {} layer(s) failed",
                strategy,
                failures.len()
            );
        }
        CopyOutcome::Failed { text, failures } => {
            for failure in &failures {
                eprintln!("  {}: {}", failure.strategy, failure.error);
            }
            eprintln!("Clipboard unavailable. Select the text below to copy it:");
            println!("{}", text);
        }
    }
    Ok(())
}

pub(crate) async fn delete(
    snapshot: &Path,
    config: &TimelineConfig,
    target: &Target,
    update: &UpdateRef,
) -> CommandResult {
    let repo = load_repository(snapshot)?;
    let mut feed = open(&repo, config, target).await?;
    let id = UpdateId(update.update);

    feed.delete(&repo, update.kind, id, target.now()).await?;
    repo.snapshot()?.save(snapshot)?;
    println!("Deleted {} update {}", update.kind, id);
    Ok(())
}

pub(crate) async fn actions(
    snapshot: &Path,
    config: &TimelineConfig,
    target: &Target,
) -> CommandResult {
    let repo = load_repository(snapshot)?;
    let feed = open(&repo, config, target).await?;
    println!("{}", serde_json::to_string_pretty(&feed.actions())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use review_timeline::{
        AuthorUpdate, EntryRecord, GlobalRole, ManuscriptEntry, Participant, UpdateKind,
    };

    fn t0() -> DateTime<Utc> {
        "2024-03-01T10:00:00Z".parse().unwrap()
    }

    fn write_snapshot(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let mut record =
            EntryRecord::new(ManuscriptEntry::new(1).with_author(Participant::new(10, "Ayse")));
        record.author_updates = vec![AuthorUpdate::new(1, 10, t0()).with_notes("v1")];
        let snapshot = RepositorySnapshot {
            entries: vec![record],
            users: Vec::new(),
        };

        let path = dir.path().join("snapshot.json");
        snapshot.save(&path).unwrap();
        path
    }

    fn target(viewer: i64, role: GlobalRole, minutes: i64) -> Target {
        Target {
            entry: 1,
            viewer: Some(viewer),
            role,
            now: Some(t0() + Duration::minutes(minutes)),
        }
    }

    fn author_update(id: i64) -> UpdateRef {
        UpdateRef {
            kind: UpdateKind::Author,
            update: id,
        }
    }

    #[tokio::test]
    async fn test_delete_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(&dir);
        let config = TimelineConfig::default();

        delete(&path, &config, &target(10, GlobalRole::Author, 5), &author_update(1))
            .await
            .unwrap();

        let saved = RepositorySnapshot::load(&path).unwrap();
        assert!(saved.entries[0].author_updates.is_empty());
    }

    #[tokio::test]
    async fn test_delete_late_leaves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(&dir);
        let config = TimelineConfig::default();

        let late = target(10, GlobalRole::Author, 30);
        let result = delete(&path, &config, &late, &author_update(1)).await;

        assert!(result.is_err());
        let saved = RepositorySnapshot::load(&path).unwrap();
        assert_eq!(saved.entries[0].author_updates.len(), 1);
    }

    #[test]
    fn test_role_without_viewer_is_anonymous() {
        let target = Target {
            entry: 1,
            viewer: None,
            role: GlobalRole::Admin,
            now: None,
        };
        assert_eq!(target.viewer(), review_timeline::Viewer::anonymous());
    }

    #[tokio::test]
    async fn test_missing_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(&dir);
        let mut missing = target(10, GlobalRole::Author, 0);
        missing.entry = 9;

        let result = actions(&path, &TimelineConfig::default(), &missing).await;
        assert!(result.is_err());
    }
}
