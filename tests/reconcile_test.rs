mod helpers;

use helpers::{at, day, journal, people, schedule, test_store, StubParser, SESSION};
use me_journal::journal::conflict::diff_conflicts;
use me_journal::journal::keys::relationship_key;
use me_journal::journal::merge::{dedup_relationships, dedup_schedule, merge_additive};
use me_journal::journal::{
    Decisions, EntryStore, MissingFields, Relationship, RelationshipDecision, ScheduleDecision,
    ScheduleItem, SubmitOutcome,
};
use std::collections::HashSet;
use std::sync::Arc;

fn pending_of(outcome: SubmitOutcome) -> me_journal::journal::PendingClarification {
    match outcome {
        SubmitOutcome::NeedsClarification(p) => p,
        SubmitOutcome::Saved(s) => panic!("expected clarification, entry {} was saved", s.entry_id),
    }
}

fn saved(outcome: SubmitOutcome) -> me_journal::journal::Saved {
    match outcome {
        SubmitOutcome::Saved(s) => s,
        SubmitOutcome::NeedsClarification(p) => {
            panic!("expected a save, got {} flagged item(s)", p.assessment.flagged())
        }
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn normalised_name_match_merges_without_asking() {
    let store = test_store();
    store
        .append("met John", &people(vec![Relationship::new("John").with_role("Friend")]), day(2))
        .unwrap();

    let parser = StubParser::new().on(
        "john again",
        people(vec![Relationship::new("john ")
            .with_role("Friend")
            .with_note("Lent me a book")]),
    );
    let j = journal(store, Arc::new(parser));

    saved(j.submit(SESSION, "john again", day(2), day(2)).unwrap());

    let view = j.view(day(2), day(2)).unwrap();
    assert_eq!(view.relationships.len(), 1);
    assert_eq!(view.relationships[0].name, "John");
    assert_eq!(view.relationships[0].notes, vec!["Lent me a book"]);
}

#[test]
fn role_conflict_requires_clarification_and_update_applies() {
    let store = test_store();
    store
        .append("met John", &people(vec![Relationship::new("John").with_role("Friend")]), day(2))
        .unwrap();

    let parser = StubParser::new().on(
        "john at work",
        people(vec![Relationship::new("John").with_role("Colleague")]),
    );
    let j = journal(store, Arc::new(parser));

    let pending = pending_of(j.submit(SESSION, "john at work", day(2), day(2)).unwrap());
    let conflict = &pending.assessment.relationship_conflicts[0];
    assert_eq!(conflict.labels, vec!["role"]);
    assert_eq!(conflict.candidates[0].role(), Some("Friend"));

    let mut d = Decisions::default();
    d.relationships.insert(0, RelationshipDecision::Update { candidate: 0 });
    j.confirm(SESSION, Some(d)).unwrap();

    let view = j.view(day(2), day(2)).unwrap();
    assert_eq!(view.relationships.len(), 1);
    assert_eq!(view.relationships[0].role(), Some("Colleague"));
    assert!(j.pending(SESSION).unwrap().is_none());
}

#[test]
fn schedule_conflict_replace_purges_old_item() {
    let store = test_store();
    let meeting = schedule(vec![ScheduleItem::new("Team Meeting", at(11, 0), None)]);
    store.append("standup", &meeting, day(2)).unwrap();

    let parser = StubParser::new().on(
        "meeting moved",
        schedule(vec![ScheduleItem::new("team meeting", at(14, 0), None)]),
    );
    let j = journal(store.clone(), Arc::new(parser));

    let pending = pending_of(j.submit(SESSION, "meeting moved", day(2), day(2)).unwrap());
    assert_eq!(pending.assessment.schedule_conflicts.len(), 1);
    assert_eq!(pending.assessment.schedule_conflicts[0].existing.time, at(11, 0));
    // no date either, so it is also missing a field
    assert_eq!(pending.assessment.missing, vec![0]);

    let mut d = Decisions::default();
    d.schedule.insert(0, ScheduleDecision::Replace);
    d.missing.insert(
        0,
        MissingFields {
            event_date: Some(day(2)),
            time: None,
        },
    );
    j.confirm(SESSION, Some(d)).unwrap();

    let items: Vec<(String, _)> = store
        .query_all()
        .unwrap()
        .into_iter()
        .flat_map(|e| e.structured.schedule)
        .map(|s| (s.task, s.time))
        .collect();
    assert_eq!(items, vec![("team meeting".to_string(), at(14, 0))]);
}

#[test]
fn blank_missing_fields_drop_only_that_item() {
    let store = test_store();
    let parser = StubParser::new().on(
        "busy day",
        schedule(vec![
            ScheduleItem::new("Call Alice", None, None),
            ScheduleItem::new("Lunch", at(12, 30), Some(day(2))),
        ]),
    );
    let j = journal(store, Arc::new(parser));

    let pending = pending_of(j.submit(SESSION, "busy day", day(2), day(2)).unwrap());
    assert_eq!(pending.assessment.missing, vec![0]);
    assert!(pending.assessment.schedule_conflicts.is_empty());

    // no answer for the missing item counts as blank
    let saved = j.confirm(SESSION, Some(Decisions::default())).unwrap();
    assert_eq!(saved.journal_date, day(2));

    let view = j.view(day(2), day(2)).unwrap();
    let tasks: Vec<&str> = view
        .sections
        .iter()
        .flat_map(|s| s.items.iter().map(|i| i.task.as_str()))
        .collect();
    assert_eq!(tasks, vec!["Lunch"]);
}

#[test]
fn first_time_relationship_commits_directly_twice() {
    let store = test_store();
    let priya = people(vec![Relationship::new("Priya").with_role("Mentor")]);
    let parser = Arc::new(
        StubParser::new()
            .on("coffee with Priya", priya.clone())
            .on("call with Priya", priya),
    );
    let j = journal(store, parser.clone());

    saved(j.submit(SESSION, "coffee with Priya", day(2), day(2)).unwrap());
    saved(j.submit(SESSION, "call with Priya", day(2), day(2)).unwrap());

    assert_eq!(parser.calls(), 2);
    let view = j.view(day(2), day(2)).unwrap();
    assert_eq!(view.relationships.len(), 1);
    assert_eq!(view.relationships[0].role(), Some("Mentor"));
}

// ── Properties ───────────────────────────────────────────────────────────────

fn sample_people() -> Vec<Relationship> {
    vec![
        Relationship::new("John").with_role("Friend").with_note("school"),
        Relationship::new("alice").with_detail("city", "Berlin"),
        Relationship::new(" JOHN").with_note("work").with_note("school "),
        Relationship::new("Alice").with_role("Sister").with_note("birthday soon"),
        Relationship::new("Priya"),
    ]
}

#[test]
fn dedup_relationships_yields_unique_keys_and_is_idempotent() {
    let once = dedup_relationships(sample_people());
    let keys: HashSet<String> = once.iter().map(relationship_key).collect();
    assert_eq!(keys.len(), once.len());

    let twice = dedup_relationships(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn merge_never_drops_notes() {
    let all = sample_people();
    let merged = dedup_relationships(all.clone());
    for r in &all {
        let target = merged
            .iter()
            .find(|m| relationship_key(m) == relationship_key(r))
            .unwrap();
        for note in &r.notes {
            assert!(
                target.notes.iter().any(|n| n.trim() == note.trim()),
                "note {note:?} of {} was lost",
                r.name
            );
        }
    }
}

#[test]
fn empty_incoming_fields_never_conflict() {
    for existing in dedup_relationships(sample_people()) {
        let bare = Relationship::new(existing.name.clone());
        assert_eq!(diff_conflicts(&existing, &bare), (false, vec![]));
        // merging an empty mention changes nothing
        assert_eq!(merge_additive(&existing, &bare), existing);
    }
}

#[test]
fn dedup_schedule_is_sorted_and_unique() {
    let items = vec![
        ScheduleItem::new("Gym", at(18, 0), Some(day(2))),
        ScheduleItem::new("Dentist", at(9, 0), Some(day(4))),
        ScheduleItem::new("gym", at(7, 0), Some(day(3))),
        ScheduleItem::new("Standup", at(9, 30), None),
        ScheduleItem::new("Lunch", None, Some(day(2))),
    ];
    let out = dedup_schedule(items, day(2));

    let keys: HashSet<String> = out.iter().map(|s| s.task.to_lowercase()).collect();
    assert_eq!(keys.len(), out.len());

    let order: Vec<_> = out
        .iter()
        .map(|s| (s.event_date.unwrap_or(day(2)), s.time))
        .collect();
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);

    assert_eq!(out.first().map(|s| s.task.as_str()), Some("Lunch"));
    assert_eq!(dedup_schedule(out.clone(), day(2)), out);
}
