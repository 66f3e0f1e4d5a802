//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use review_timeline::{
    AuthorUpdate, EntryRecord, InMemoryRepository, ManuscriptEntry, Participant, RefereeUpdate,
    RepositorySnapshot,
};

/// Reference instant used as `T0` across scenarios
pub fn t0() -> DateTime<Utc> {
    "2024-03-01T10:00:00Z".parse().unwrap()
}

pub fn minutes(n: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(n)
}

/// Entry 1: author 10, referees 20 and 21, journal editor 30
pub fn entry() -> ManuscriptEntry {
    ManuscriptEntry::new(1)
        .with_author(Participant::new(10, "Ayse Yilmaz"))
        .with_referee(Participant::new(20, "Bora Kaya"))
        .with_referee(Participant::new(21, "Deniz Aksoy"))
        .with_editor(Participant::new(30, "Elif Demir"))
}

/// The two-update scenario: author update 1 at T0, referee review 5 at T0+1min
pub fn scenario_updates() -> (Vec<AuthorUpdate>, Vec<RefereeUpdate>) {
    (
        vec![AuthorUpdate::new(1, 10, t0()).with_notes("v1")],
        vec![RefereeUpdate::new(5, 20, minutes(1))
            .with_notes("looks good")
            .with_file("/files/review-5.pdf")],
    )
}

/// Repository holding entry 1 with the scenario updates
pub fn scenario_repository() -> InMemoryRepository {
    let (author_updates, referee_updates) = scenario_updates();
    let mut record = EntryRecord::new(entry());
    record.author_updates = author_updates;
    record.referee_updates = referee_updates;

    InMemoryRepository::new(RepositorySnapshot {
        entries: vec![record],
        users: vec![Participant::new(40, "Former Co-author")],
    })
}
