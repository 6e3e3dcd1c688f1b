// exits.rs — Administrative exits, notifications, and audit events.

mod common;

use std::fs;
use std::sync::Arc;

use common::{approve, harness, reject, review_def, RecordingSink};
use rl_engine::{EngineError, JsonlEventSink};
use rl_grants::{Capability, GrantTarget};
use rl_roles::{InMemoryIdentity, Principal};
use tempfile::tempdir;

#[test]
fn abort_requires_an_administrator() {
    let mut identity = InMemoryIdentity::new();
    let submitter = identity.add_user("sam");
    let alice = identity.add_user("alice");
    let admin = identity.add_user("root");
    identity.add_admin(admin);
    let group = identity.add_group("reviewers", &[alice]);
    let h = harness(identity, vec![review_def("default", 1)], "default");
    h.collection_roles.bind(h.collection, "reviewer", group);

    let item = h.content.add_item(Some(submitter), Some("Thesis"));
    let wfi = h.engine.start(item, h.collection).unwrap();
    h.engine.claim(wfi.id, alice).unwrap();

    assert!(matches!(
        h.engine.abort(wfi.id, alice),
        Err(EngineError::NotAuthorized { .. })
    ));
    // The failed attempt changed nothing.
    assert!(h.ledger.claimed_task_for(&wfi, alice).is_some());

    h.engine.abort(wfi.id, admin).unwrap();
    assert!(h.content.is_in_workspace(item));
    assert!(!h.items.contains(wfi.id));
    assert!(h.ledger.claimed_tasks(&wfi).is_empty());
    assert_eq!(
        h.acl
            .capabilities(Principal::User(submitter), GrantTarget::Item(item))
            .len(),
        5
    );
    assert!(h
        .acl
        .capabilities(Principal::User(alice), GrantTarget::Item(item))
        .is_empty());
}

#[test]
fn delete_workflow_item_removes_everything() {
    let mut identity = InMemoryIdentity::new();
    let alice = identity.add_user("alice");
    let admin = identity.add_user("root");
    identity.add_admin(admin);
    let group = identity.add_group("reviewers", &[alice]);
    let h = harness(identity, vec![review_def("default", 1)], "default");
    h.collection_roles.bind(h.collection, "reviewer", group);

    let item = h.content.add_item(None, None);
    let wfi = h.engine.start(item, h.collection).unwrap();
    h.engine.claim(wfi.id, alice).unwrap();

    h.engine.delete_workflow_item(wfi.id, admin).unwrap();
    assert!(!h.items.contains(wfi.id));
    assert!(h.ledger.claimed_tasks(&wfi).is_empty());
    assert!(!h.content.is_archived(item));
    assert!(!h.content.is_in_workspace(item));
}

#[test]
fn lifecycle_notifications_reach_the_right_people() {
    let mut identity = InMemoryIdentity::new();
    let submitter = identity.add_user("sam");
    let alice = identity.add_user("alice");
    let group = identity.add_group("reviewers", &[alice]);
    let mut h = harness(identity, vec![review_def("default", 1)], "default");
    let sink = Arc::new(RecordingSink::default());
    h.engine.set_notification_sink(sink.clone());
    h.collection_roles.bind(h.collection, "reviewer", group);

    let item = h.content.add_item(Some(submitter), Some("Thesis"));
    let wfi = h.engine.start(item, h.collection).unwrap();
    assert_eq!(sink.templates(), vec!["task_activated"]);
    {
        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(delivered[0].recipients, vec![alice]);
        assert!(delivered[0].arguments.contains(&"Thesis".to_string()));
    }

    h.engine.claim(wfi.id, alice).unwrap();
    h.engine.perform(wfi.id, alice, &approve()).unwrap();
    assert_eq!(sink.templates(), vec!["task_activated", "item_archived"]);
    assert_eq!(sink.delivered.lock().unwrap()[1].recipients, vec![submitter]);
}

#[test]
fn rejection_notifies_the_submitter_with_the_reason() {
    let mut identity = InMemoryIdentity::new();
    let submitter = identity.add_user("sam");
    let alice = identity.add_user("alice");
    let group = identity.add_group("reviewers", &[alice]);
    let mut h = harness(identity, vec![review_def("default", 1)], "default");
    let sink = Arc::new(RecordingSink::default());
    h.engine.set_notification_sink(sink.clone());
    h.collection_roles.bind(h.collection, "reviewer", group);

    let item = h.content.add_item(Some(submitter), Some("Thesis"));
    let wfi = h.engine.start(item, h.collection).unwrap();
    h.engine.claim(wfi.id, alice).unwrap();
    h.engine
        .perform(wfi.id, alice, &reject("incomplete data"))
        .unwrap();

    let delivered = sink.delivered.lock().unwrap();
    let returned = delivered
        .iter()
        .find(|n| n.template == "item_returned")
        .expect("return notification");
    assert_eq!(returned.recipients, vec![submitter]);
    assert!(returned.arguments.contains(&"incomplete data".to_string()));
}

#[test]
fn quiet_start_suppresses_task_activation_mail() {
    let mut identity = InMemoryIdentity::new();
    let submitter = identity.add_user("sam");
    let alice = identity.add_user("alice");
    let group = identity.add_group("reviewers", &[alice]);
    let mut h = harness(identity, vec![review_def("default", 1)], "default");
    let sink = Arc::new(RecordingSink::default());
    h.engine.set_notification_sink(sink.clone());
    h.collection_roles.bind(h.collection, "reviewer", group);

    let item = h.content.add_item(Some(submitter), Some("Bulk import"));
    let wfi = h.engine.start_without_notify(item, h.collection).unwrap();
    assert!(sink.templates().is_empty());

    // Later transitions notify normally again.
    h.engine.claim(wfi.id, alice).unwrap();
    h.engine.perform(wfi.id, alice, &approve()).unwrap();
    assert_eq!(sink.templates(), vec!["item_archived"]);
}

#[test]
fn transitions_are_journaled_to_the_event_sink() {
    let mut identity = InMemoryIdentity::new();
    let alice = identity.add_user("alice");
    let group = identity.add_group("reviewers", &[alice]);
    let mut h = harness(identity, vec![review_def("default", 1)], "default");
    let dir = tempdir().unwrap();
    let path = dir.path().join("workflow.jsonl");
    h.engine.add_event_sink(Box::new(JsonlEventSink::new(&path)));
    h.collection_roles.bind(h.collection, "reviewer", group);

    let item = h.content.add_item(None, Some("Thesis"));
    let wfi = h.engine.start(item, h.collection).unwrap();
    h.engine.claim(wfi.id, alice).unwrap();
    h.engine.perform(wfi.id, alice, &approve()).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);

    // Entry: no previous point, the review step is current.
    let entry: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert!(entry["previous"].is_null());
    assert_eq!(entry["current"]["step"], "review");

    // Approval: review is previous, the item left the workflow.
    let approval: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(approval["previous"]["step"], "review");
    assert!(approval["current"].is_null());
    assert_eq!(approval["actor"], serde_json::json!(alice));
}

#[test]
fn submitter_read_floor_survives_every_exit() {
    let mut identity = InMemoryIdentity::new();
    let submitter = identity.add_user("sam");
    let alice = identity.add_user("alice");
    let group = identity.add_group("reviewers", &[alice]);
    let h = harness(identity, vec![review_def("default", 1)], "default");
    h.collection_roles.bind(h.collection, "reviewer", group);

    let item = h.content.add_item(Some(submitter), None);
    let wfi = h.engine.start(item, h.collection).unwrap();
    assert_eq!(
        h.acl
            .capabilities(Principal::User(submitter), GrantTarget::Item(item)),
        vec![Capability::Read]
    );

    h.engine.claim(wfi.id, alice).unwrap();
    h.engine.perform(wfi.id, alice, &approve()).unwrap();
    let caps = h
        .acl
        .capabilities(Principal::User(submitter), GrantTarget::Item(item));
    assert!(caps.contains(&Capability::Read));
}
