//! End-to-end history scenarios driven through [`Document`].

use cardtrail_core::clock::ManualClock;
use cardtrail_core::config::HistoryConfig;
use cardtrail_core::model::PromotionReason;
use cardtrail_core::{Document, HistoryError};

fn document() -> (Document, ManualClock) {
    let clock = ManualClock::new(1_700_000_000_000_000);
    (Document::new(HistoryConfig::default(), clock.clone()), clock)
}

fn contents(cards: &[cardtrail_core::model::CardSnapshot]) -> Vec<&str> {
    cards.iter().map(|c| c.content.as_str()).collect()
}

#[test]
fn edit_add_and_name_produce_expected_entries() {
    let (mut doc, clock) = document();
    let a = doc.add_card("A", None, "", None).expect("add A");

    let r0 = doc.take_snapshot(false, None, None);
    assert_eq!(r0.appended.len(), 1);
    let e0 = &doc.history().entries()[0];
    assert!(e0.is_full());
    assert_eq!(e0.promotion, Some(PromotionReason::Initial));

    clock.advance_secs(5);
    doc.edit_content(&a, "AB").expect("edit");
    doc.take_snapshot(false, None, None);
    let e1 = &doc.history().entries()[1];
    assert!(e1.is_delta);
    assert!(!e1.promoted);
    assert_eq!(contents(&e1.cards), vec!["AB"]);

    clock.advance_secs(5);
    doc.add_card("B", Some(a.clone()), "", None).expect("add B");
    doc.take_snapshot(false, None, None);
    let e2 = &doc.history().entries()[2];
    assert!(e2.is_delta);
    assert_eq!(contents(&e2.cards), vec!["B"]);
    assert_eq!(e2.promotion, Some(PromotionReason::StructureAddDelete));

    clock.advance_secs(5);
    let named = doc.take_snapshot(false, Some("Draft 1"), None);
    assert_eq!(named.appended.len(), 2);
    let e3 = &doc.history().entries()[3];
    assert!(e3.is_full());
    assert_eq!(e3.name.as_deref(), Some("Draft 1"));
    assert_eq!(e3.promotion, Some(PromotionReason::Named));

    let at_edit = doc.resolve_state(1).expect("index 1");
    assert_eq!(contents(&at_edit), vec!["AB"]);
    let at_add = doc.resolve_state(2).expect("index 2");
    assert_eq!(contents(&at_add), vec!["AB", "B"]);
    assert_eq!(at_add[1].parent.as_ref(), Some(&a));
}

#[test]
fn forty_small_edits_checkpoint_every_thirty() {
    let (mut doc, clock) = document();
    let a = doc.add_card("x", None, "", None).expect("add");
    doc.take_snapshot(false, None, None);

    let mut text = String::from("x");
    for _ in 0..40 {
        clock.advance_secs(1);
        text.push('y');
        doc.edit_content(&a, text.clone()).expect("edit");
        doc.take_snapshot(false, None, None);
    }

    let entries = doc.history().entries();
    assert_eq!(entries.len(), 41);
    for (index, entry) in entries.iter().enumerate() {
        let expect_full = index == 0 || index == 31;
        assert_eq!(entry.is_full(), expect_full, "entry {index}");
    }
    assert!(doc.history().validate(doc.config()).is_empty());
    assert_eq!(
        doc.resolve_state(40).map(|cards| cards[0].content.clone()),
        Some(text)
    );
}

#[test]
fn long_pause_promotes_small_edit() {
    let (mut doc, clock) = document();
    let a = doc.add_card("draft", None, "", None).expect("add");
    doc.take_snapshot(false, None, None);

    clock.advance_secs(20 * 60);
    doc.edit_content(&a, "drafts").expect("edit");
    doc.take_snapshot(false, None, None);

    let later = &doc.history().entries()[1];
    assert_eq!(later.promotion, Some(PromotionReason::SessionGap));
}

#[test]
fn unchanged_snapshot_is_a_noop() {
    let (mut doc, clock) = document();
    doc.add_card("A", None, "", None).expect("add");
    doc.take_snapshot(false, None, None);
    clock.advance_secs(1);
    assert!(doc.take_snapshot(false, None, None).is_noop());
    assert_eq!(doc.history().len(), 1);

    let forced = doc.take_snapshot(true, None, None);
    assert_eq!(forced.appended.len(), 1);
    assert!(doc.history().entries()[1].is_full());
}

#[test]
fn same_tick_snapshots_stay_strictly_ordered() {
    let (mut doc, _clock) = document();
    let a = doc.add_card("A", None, "", None).expect("add");
    for i in 0..5 {
        doc.edit_content(&a, format!("A{i}")).expect("edit");
        doc.take_snapshot(false, None, None);
    }
    let stamps: Vec<i64> = doc.history().entries().iter().map(|e| e.timestamp_us).collect();
    assert!(stamps.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn out_of_range_index_is_absent() {
    let (mut doc, _clock) = document();
    assert!(doc.resolve_state(0).is_none());
    doc.add_card("A", None, "", None).expect("add");
    doc.take_snapshot(false, None, None);
    assert!(doc.resolve_state(1).is_none());
    assert_eq!(
        doc.resolve_state_checked(3),
        Err(HistoryError::SnapshotNotFound { index: 3, len: 1 })
    );
}

#[test]
fn restore_round_trip_keeps_history_intact() {
    let (mut doc, clock) = document();
    let a = doc.add_card("first", None, "", None).expect("add");
    doc.take_snapshot(false, None, None);

    clock.advance_secs(10);
    doc.edit_content(&a, "second").expect("edit");
    let b = doc.add_card("extra", Some(a.clone()), "", None).expect("add");
    doc.take_snapshot(false, None, None);
    let before_restore = doc.history().len();

    clock.advance_secs(10);
    let receipt = doc.restore_to_state(0).expect("restore");
    assert_eq!(receipt.cards, 1);
    assert!(doc.card(&b).is_none());
    assert_eq!(doc.card(&a).map(|c| c.content.as_str()), Some("first"));

    // Safety snapshot (named + companion) plus the post-restore entry.
    assert_eq!(doc.history().len(), before_restore + 3);
    let safety = doc
        .history()
        .position(&receipt.safety.appended[0])
        .expect("safety entry retained");
    let saved = doc.resolve_state(safety).expect("safety state");
    assert_eq!(contents(&saved), vec!["second", "extra"]);

    let last = doc.history().len() - 1;
    assert_eq!(contents(&doc.resolve_state(last).expect("latest")), vec!["first"]);
}
