use std::time::Duration;

use shared::domain::RegistrationStatus::{Approved, Pending, Rejected};

use super::*;
use crate::{
    error::InvalidTransition,
    test_support::{registration, StubStore},
};

fn manager_with(store: Arc<StubStore>) -> WorkflowManager {
    WorkflowManager::new(store)
}

fn ids(projection: &Projection) -> Vec<&str> {
    projection.items.iter().map(|r| r.id.as_str()).collect()
}

async fn all_tabs(manager: &WorkflowManager) -> Vec<Projection> {
    let mut projections = Vec::new();
    for tab in RegistrationStatus::ALL {
        projections.push(manager.projection(tab).await);
    }
    projections
}

#[tokio::test]
async fn approve_moves_registration_into_approved_tab() {
    let store = Arc::new(StubStore::new(vec![registration("A", Pending)]));
    let manager = manager_with(store.clone());
    manager.refresh().await;

    let outcome = manager.approve(&RegistrationId::from("A")).await;

    assert!(outcome.is_committed());
    assert!(manager.projection(Pending).await.items.is_empty());
    let approved = manager.projection(Approved).await;
    assert_eq!(ids(&approved), vec!["A"]);
    assert_eq!(approved.items[0].status, Approved);
    assert_eq!(approved.counts.pending, 0);
    // initial refresh plus the one triggered by the transition
    assert_eq!(store.list_calls().await.len(), 6);
}

#[tokio::test]
async fn reject_with_empty_reason_is_local_only() {
    let store = Arc::new(StubStore::new(vec![registration("B", Pending)]));
    let manager = manager_with(store.clone());
    manager.refresh().await;
    let calls_before = store.list_calls().await.len();

    let outcome = manager.reject(&RegistrationId::from("B"), "").await;

    assert_eq!(
        outcome.error().map(WorkflowError::kind),
        Some(ErrorKind::InvalidTransition)
    );
    assert!(store.set_status_calls().await.is_empty());
    assert_eq!(store.list_calls().await.len(), calls_before);
}

#[tokio::test]
async fn not_found_leaves_cached_view_untouched_until_refresh() {
    let store = Arc::new(StubStore::new(vec![registration("B", Pending)]));
    let manager = manager_with(store.clone());
    manager.refresh().await;
    store
        .fail_set_status(WorkflowError::NotFound(RegistrationId::from("B")))
        .await;
    let before = manager.snapshot().await;

    let outcome = manager
        .reject(&RegistrationId::from("B"), "incomplete documents")
        .await;

    assert_eq!(
        outcome.error(),
        Some(&WorkflowError::NotFound(RegistrationId::from("B")))
    );
    assert!(outcome.requires_refresh());
    assert_eq!(manager.snapshot().await, before);
    let pending = manager.projection(Pending).await;
    assert_eq!(ids(&pending), vec!["B"]);
    assert!(pending.stale);

    manager.refresh().await;
    assert!(!manager.projection(Pending).await.stale);
}

#[tokio::test]
async fn unknown_registration_fails_without_remote_calls() {
    let store = Arc::new(StubStore::new(Vec::new()));
    let manager = manager_with(store.clone());
    manager.refresh().await;

    let outcome = manager.approve(&RegistrationId::from("ghost")).await;

    let TransitionOutcome::Failed(failed) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(failed.original, None);
    assert_eq!(
        failed.error,
        WorkflowError::InvalidTransition(InvalidTransition::NotLoaded {
            id: RegistrationId::from("ghost"),
            failed: Vec::new(),
        })
    );
    assert!(!TransitionOutcome::Failed(failed).requires_refresh());
    assert!(store.set_status_calls().await.is_empty());
}

#[tokio::test]
async fn registration_in_failed_bucket_is_reported_as_not_loaded() {
    let store = Arc::new(StubStore::new(vec![registration("A", Pending)]));
    store
        .fail_list(Pending, WorkflowError::Remote("Failed to fetch data".into()))
        .await;
    let manager = manager_with(store.clone());
    manager.refresh().await;

    let outcome = manager.approve(&RegistrationId::from("A")).await;

    assert_eq!(
        outcome.error(),
        Some(&WorkflowError::InvalidTransition(
            InvalidTransition::NotLoaded {
                id: RegistrationId::from("A"),
                failed: vec![Pending],
            }
        ))
    );
    assert!(!outcome.requires_refresh());
    assert!(!manager.projection(Pending).await.stale);
    assert!(store.set_status_calls().await.is_empty());
    assert_eq!(
        outcome.error().map(ToString::to_string).as_deref(),
        Some("invalid transition: registration A is not in the loaded lists (could not load: pending)")
    );
}

#[tokio::test]
async fn empty_reason_is_refused_before_the_registration_is_looked_up() {
    let store = Arc::new(StubStore::new(vec![registration("A", Pending)]));
    store
        .fail_list(Pending, WorkflowError::Transport("connection refused".into()))
        .await;
    let manager = manager_with(store.clone());
    manager.refresh().await;

    let outcome = manager.reject(&RegistrationId::from("A"), "  ").await;

    let TransitionOutcome::Failed(failed) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(
        failed.error,
        WorkflowError::InvalidTransition(InvalidTransition::MissingReason {
            id: RegistrationId::from("A"),
        })
    );
    assert_eq!(failed.original, None);
    assert!(store.set_status_calls().await.is_empty());
}

#[tokio::test]
async fn partial_failure_is_exposed_and_retry_recovers() {
    let store = Arc::new(StubStore::new(vec![
        registration("A", Pending),
        registration("B", Approved),
        registration("C", Rejected),
    ]));
    store
        .fail_list(Pending, WorkflowError::Remote("Failed to fetch data".into()))
        .await;
    let manager = manager_with(store.clone());

    let outcome = manager.refresh().await;
    assert_eq!(outcome.failed_statuses(), vec![Pending]);
    let failed = manager.failed_buckets().await;
    assert_eq!(failed.keys().copied().collect::<Vec<_>>(), vec![Pending]);
    let projection = manager.projection(Pending).await;
    assert!(projection.items.is_empty());
    assert_eq!(projection.counts.approved, 1);
    assert_eq!(projection.counts.rejected, 1);

    store.heal_lists().await;
    let retried = manager.retry_failed_buckets().await;
    assert!(retried.is_complete());
    assert!(manager.failed_buckets().await.is_empty());
    assert_eq!(ids(&manager.projection(Pending).await), vec!["A"]);
}

#[tokio::test]
async fn refresh_twice_yields_identical_projections() {
    let store = Arc::new(StubStore::new(vec![
        registration("A", Pending),
        registration("B", Approved),
    ]));
    let manager = manager_with(store);

    manager.refresh().await;
    let first = all_tabs(&manager).await;
    manager.refresh().await;
    let second = all_tabs(&manager).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn selection_is_cleared_after_transitioning_selected_registration() {
    let store = Arc::new(StubStore::new(vec![
        registration("A", Pending),
        registration("B", Pending),
    ]));
    let manager = manager_with(store);
    manager.refresh().await;
    let mut events = manager.subscribe_events();

    let selected = manager.select(&RegistrationId::from("A")).await.expect("select");
    assert_eq!(selected.status, Pending);
    assert_eq!(
        manager.selected_detail().await.map(|r| r.id),
        Some(RegistrationId::from("A"))
    );

    let outcome = manager.approve(&RegistrationId::from("A")).await;
    assert!(outcome.is_committed());
    assert_eq!(manager.selected_detail().await, None);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen.contains(&WorkflowEvent::SelectionCleared {
        id: RegistrationId::from("A")
    }));
    assert!(seen.contains(&WorkflowEvent::TransitionCommitted {
        id: RegistrationId::from("A"),
        status: Approved,
    }));
}

#[tokio::test]
async fn selection_survives_transition_of_another_registration() {
    let store = Arc::new(StubStore::new(vec![
        registration("A", Pending),
        registration("B", Pending),
    ]));
    let manager = manager_with(store);
    manager.refresh().await;
    manager.select(&RegistrationId::from("B")).await.expect("select");

    manager.approve(&RegistrationId::from("A")).await;

    assert_eq!(
        manager.selected_detail().await.map(|r| r.id),
        Some(RegistrationId::from("B"))
    );
}

#[tokio::test]
async fn selection_is_cleared_when_registration_vanishes_from_refresh() {
    let store = Arc::new(StubStore::new(vec![registration("A", Pending)]));
    let manager = manager_with(store.clone());
    manager.refresh().await;
    manager.select(&RegistrationId::from("A")).await.expect("select");

    store
        .fail_list(Pending, WorkflowError::Transport("connection refused".into()))
        .await;
    manager.refresh().await;

    assert_eq!(manager.selected_detail().await, None);
}

#[tokio::test]
async fn selecting_unknown_registration_fails() {
    let manager = manager_with(Arc::new(StubStore::new(Vec::new())));
    manager.refresh().await;

    let err = manager
        .select(&RegistrationId::from("nope"))
        .await
        .expect_err("unknown id");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    manager.clear_selection().await;
    assert_eq!(manager.selected_detail().await, None);
}

#[tokio::test]
async fn older_refresh_cannot_overwrite_newer_one() {
    let store = Arc::new(StubStore::new(vec![registration("A", Pending)]));
    let manager = Arc::new(manager_with(store.clone()));

    // first refresh reads "A pending" and then parks
    let hold = store.hold_lists().await;
    let first = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    store.release_lists().await;
    store
        .inner
        .set_status(&RegistrationId::from("A"), Approved, None)
        .await
        .expect("remote change");
    let second = tokio::spawn({
        let manager = Arc::clone(&manager);
        async move { manager.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished(), "second refresh must queue behind the first");

    hold.add_permits(RegistrationStatus::ALL.len());
    first.await.expect("first refresh");
    second.await.expect("second refresh");

    assert!(manager.projection(Pending).await.items.is_empty());
    assert_eq!(ids(&manager.projection(Approved).await), vec!["A"]);
}

#[tokio::test]
async fn local_profile_runs_without_network() {
    let manager = WorkflowManager::local(vec![
        registration("L1", Pending),
        registration("L2", Pending),
    ]);
    manager.refresh().await;

    let rejected = manager
        .reject(&RegistrationId::from("L2"), "duplicate listing")
        .await;
    assert!(rejected.is_committed());

    let projection = manager.projection(Rejected).await;
    assert_eq!(ids(&projection), vec!["L2"]);
    assert_eq!(
        projection.items[0].rejection_reason.as_deref(),
        Some("duplicate listing")
    );
    assert_eq!(projection.counts.pending, 1);
}
