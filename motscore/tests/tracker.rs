mod common;

use motscore::prelude::*;
use motscore::store::{create_user, populate_volumes, reviews};
use rusqlite::Connection;

fn setup() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let root = common::bids_dataset(dir.path(), "bids_sub_ses", 3);
    let mut conn = open_db(dir.path().join("test.sqlite")).unwrap();
    create_user(&conn, "fake@email.com", Some("test")).unwrap();
    assert_eq!(populate_volumes(&mut conn, &root, "T1w").unwrap(), 3);
    (dir, conn)
}

fn decision(vol_id: i64, score: u8) -> Decision {
    Decision {
        vol_id,
        score,
        blur: false,
        lines: false,
    }
}

fn tuple(p: Progress) -> (u64, u64, u64) {
    (p.total, p.done, p.kept)
}

#[test]
fn kept_review_then_undo() {
    let (_dir, conn) = setup();
    let tracker = ReviewTracker::new(&conn).with_selection(Selection::Sequential);

    let volume = tracker.next_volume("test").unwrap();
    assert_eq!(volume.id, 1);

    tracker.record_review("test", &decision(1, 0)).unwrap();
    assert_eq!(tuple(tracker.progress("test").unwrap()), (3, 1, 1));

    tracker.undo_last("test").unwrap();
    assert_eq!(tuple(tracker.progress("test").unwrap()), (3, 0, 0));
}

#[test]
fn rejected_review_is_not_kept() {
    let (_dir, conn) = setup();
    let tracker = ReviewTracker::new(&conn);
    tracker.record_review("test", &decision(1, 4)).unwrap();
    assert_eq!(tuple(tracker.progress("test").unwrap()), (3, 1, 0));
}

#[test]
fn progress_is_idempotent() {
    let (_dir, conn) = setup();
    let tracker = ReviewTracker::new(&conn);
    tracker.record_review("test", &decision(2, 1)).unwrap();
    assert_eq!(tracker.progress("test").unwrap(), tracker.progress("test").unwrap());
}

#[test]
fn record_then_undo_round_trip() {
    let (_dir, conn) = setup();
    let tracker = ReviewTracker::new(&conn).with_selection(Selection::Sequential);
    tracker.record_review("test", &decision(1, 7)).unwrap();

    let before = tracker.progress("test").unwrap();
    let next = tracker.next_volume("test").unwrap();
    tracker.record_review("test", &decision(next.id, 0)).unwrap();
    let restored = tracker.undo_last("test").unwrap();

    assert_eq!(restored, next);
    assert_eq!(tracker.progress("test").unwrap(), before);
    assert_eq!(tracker.next_volume("test").unwrap(), next);
}

#[test]
fn exclusion_and_counts_invariants() {
    let (_dir, conn) = setup();
    create_user(&conn, "other@email.com", Some("other")).unwrap();
    let tracker = ReviewTracker::new(&conn);

    for (step, score) in [3u8, 0, 10].into_iter().enumerate() {
        let v = tracker.next_volume("test").unwrap();
        let reviewed: Vec<_> = reviews::reviews_by(&conn, "test")
            .unwrap()
            .into_iter()
            .map(|r| r.vol_id)
            .collect();
        assert!(!reviewed.contains(&v.id), "step {step}");
        tracker.record_review("test", &decision(v.id, score)).unwrap();

        let p = tracker.progress("test").unwrap();
        assert!(p.kept <= p.done && p.done <= p.total);
    }
    assert!(tracker.next_volume("test").unwrap_err().is_not_found());
    assert_eq!(tracker.progress("test").unwrap().remaining(), 0);

    // 其他评审者不受影响.
    assert_eq!(tuple(tracker.progress("other").unwrap()), (3, 0, 0));
    assert!(tracker.next_volume("other").is_ok());
}

#[test]
fn undo_without_review_is_not_found() {
    let (_dir, conn) = setup();
    let tracker = ReviewTracker::new(&conn);
    assert!(tracker.last_reviewed("test").unwrap_err().is_not_found());
    assert!(tracker.undo_last("test").unwrap_err().is_not_found());
    assert_eq!(tuple(tracker.progress("test").unwrap()), (3, 0, 0));
}
