//! Property-based tests for merge order, capabilities and export

mod common;

use chrono::Duration;
use common::{entry, t0};
use proptest::prelude::*;
use review_timeline::{
    feed_order, merge_timeline, serialize, AccessPolicy, AuthorUpdate, GlobalRole, NameCache,
    RefereeUpdate, TimelineUpdate, UpdateKind, Viewer,
};

fn role() -> impl Strategy<Value = GlobalRole> {
    prop_oneof![
        Just(GlobalRole::Admin),
        Just(GlobalRole::Owner),
        Just(GlobalRole::Editor),
        Just(GlobalRole::Author),
        Just(GlobalRole::Referee),
        Just(GlobalRole::User),
        Just(GlobalRole::None),
    ]
}

fn viewer() -> impl Strategy<Value = Viewer> {
    (proptest::option::of(5i64..45), role()).prop_map(|(id, role)| Viewer {
        id: id.map(Into::into),
        role,
    })
}

fn author_updates() -> impl Strategy<Value = Vec<AuthorUpdate>> {
    prop::collection::vec((0i64..30, 8i64..12, proptest::bool::ANY), 0..8).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (minute, author, noted))| {
                let created = t0() + Duration::minutes(minute);
                let update = AuthorUpdate::new(i as i64 + 1, author, created)
                    .with_file(format!("/files/revision-{}.pdf", i));
                if noted {
                    update.with_notes(format!("author note {}", i))
                } else {
                    update
                }
            })
            .collect()
    })
}

fn referee_updates() -> impl Strategy<Value = Vec<RefereeUpdate>> {
    prop::collection::vec((0i64..30, 19i64..24), 0..8).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (minute, referee))| {
                RefereeUpdate::new(i as i64 + 1, referee, t0() + Duration::minutes(minute))
                    .with_notes(format!("secret review {}", i))
                    .with_file(format!("/files/secret-{}.pdf", i))
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn test_merge_keeps_every_update_in_order(
        authors in author_updates(),
        referees in referee_updates(),
        viewer in viewer(),
        offset in 0i64..60,
    ) {
        let now = t0() + Duration::minutes(offset);
        let feed = merge_timeline(
            &entry(), &authors, &referees, &viewer,
            &NameCache::default(), &AccessPolicy::default(), now,
        );

        prop_assert_eq!(feed.len(), authors.len() + referees.len());
        for pair in feed.windows(2) {
            prop_assert_ne!(
                feed_order(&pair[0].update, &pair[1].update),
                std::cmp::Ordering::Greater
            );
            prop_assert!(pair[0].created_date() >= pair[1].created_date());
        }
    }

    #[test]
    fn test_delete_implies_privilege_or_fresh_ownership(
        authors in author_updates(),
        referees in referee_updates(),
        viewer in viewer(),
        offset in 0i64..60,
    ) {
        let now = t0() + Duration::minutes(offset);
        let feed = merge_timeline(
            &entry(), &authors, &referees, &viewer,
            &NameCache::default(), &AccessPolicy::default(), now,
        );

        for item in feed.iter().filter(|u| u.can_delete()) {
            let privileged = viewer.id.is_some()
                && matches!(viewer.role, GlobalRole::Admin | GlobalRole::Owner);
            let own_and_fresh = viewer.id == Some(item.actor_id())
                && now - item.created_date() <= Duration::minutes(15);
            prop_assert!(privileged || own_and_fresh);
        }
    }

    #[test]
    fn test_signed_out_viewers_hold_no_privileges(
        authors in author_updates(),
        referees in referee_updates(),
        role in role(),
        offset in 0i64..600,
    ) {
        let viewer = Viewer { id: None, role };
        let now = t0() + Duration::minutes(offset);
        let feed = merge_timeline(
            &entry(), &authors, &referees, &viewer,
            &NameCache::default(), &AccessPolicy::default(), now,
        );

        for item in &feed {
            prop_assert!(!item.can_delete());
            if item.kind() == UpdateKind::Referee {
                prop_assert!(!item.can_view_notes());
                prop_assert!(!item.can_view_file());
            }
        }
    }

    #[test]
    fn test_author_updates_always_readable(
        authors in author_updates(),
        viewer in viewer(),
    ) {
        for update in authors {
            let auth = AccessPolicy::default().authorize(
                &TimelineUpdate::Author(update), &viewer, &entry(), t0(),
            );
            prop_assert!(auth.can_view_notes());
            prop_assert!(auth.can_view_file());
        }
    }

    #[test]
    fn test_other_referees_never_read_reviews(
        referees in referee_updates(),
        other in 19i64..24,
    ) {
        let viewer = Viewer::new(other, GlobalRole::Referee);
        for update in referees.into_iter().filter(|u| u.referee_id.0 != other) {
            let auth = AccessPolicy::default().authorize(
                &TimelineUpdate::Referee(update), &viewer, &entry(), t0(),
            );
            prop_assert!(!auth.can_view_notes());
            prop_assert!(!auth.can_view_file());
        }
    }

    #[test]
    fn test_export_never_contains_hidden_content(
        authors in author_updates(),
        referees in referee_updates(),
        viewer in viewer(),
    ) {
        let feed = merge_timeline(
            &entry(), &authors, &referees, &viewer,
            &NameCache::default(), &AccessPolicy::default(), t0(),
        );

        for item in feed.iter().filter(|u| u.kind() == UpdateKind::Referee) {
            let text = serialize(item, item.authorization);
            if !item.can_view_notes() {
                prop_assert!(!text.contains("secret review"));
            }
            if !item.can_view_file() {
                prop_assert!(!text.contains("secret-"));
            }
        }
    }
}
