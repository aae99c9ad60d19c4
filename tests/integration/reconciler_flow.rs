//! Integration tests for the reconciliation tick and loop
//!
//! Tests cover:
//! - Clean store makes no remote calls
//! - Full publish sequence and flush
//! - Suppression while a proposal is already open
//! - Failures at each stage leave the store dirty
//! - Cancellation of a tick and of the loop

use crate::integration::test_utils::{Call, RecordingRemote, REGISTRY_DOC, REGISTRY_PATH};
use status_collector::error::ReconcileError;
use status_collector::reconciler::{Reconciler, ReconcilerSettings, TickOutcome};
use status_collector::registry::RegistryFile;
use status_collector::remote::RemoteRepository;
use status_collector::store::StatusStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn setup(document: &str) -> (Arc<StatusStore>, Arc<RecordingRemote>, Reconciler) {
    setup_with(document, ReconcilerSettings::new(REGISTRY_PATH, "main"))
}

fn setup_with(
    document: &str,
    settings: ReconcilerSettings,
) -> (Arc<StatusStore>, Arc<RecordingRemote>, Reconciler) {
    let store = Arc::new(StatusStore::new());
    let remote = Arc::new(RecordingRemote::with_document(document));
    let dyn_remote: Arc<dyn RemoteRepository> = remote.clone();
    let reconciler = Reconciler::new(Arc::clone(&store), dyn_remote, settings);
    (store, remote, reconciler)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_clean_store_makes_no_remote_calls() {
    let (store, remote, reconciler) = setup(REGISTRY_DOC);

    let outcome = reconciler
        .reconcile_once(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, TickOutcome::Clean);
    assert!(remote.calls().is_empty());
    assert!(!store.is_dirty());
}

#[tokio::test]
async fn test_dirty_store_publishes_one_proposal_and_flushes() {
    let (store, remote, reconciler) = setup(REGISTRY_DOC);
    store.put("cluster-a", "team-a/db", "Ready");

    let outcome = reconciler
        .reconcile_once(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        remote.call_names(),
        vec![
            "fetch_file",
            "list_open_proposals",
            "resolve_ref",
            "create_branch",
            "update_file",
            "create_change_proposal",
        ]
    );
    assert!(!store.is_dirty());
    assert_eq!(store.len(), 1, "flushing keeps entries");

    let branch = match outcome {
        TickOutcome::Published {
            proposal_id,
            branch,
            updated,
            untracked,
        } => {
            assert_eq!(proposal_id, 100);
            assert_eq!(updated, 1);
            assert_eq!(untracked, 0);
            branch
        }
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert!(branch.starts_with("status-update-"));

    let calls = remote.calls();
    assert_eq!(
        calls[0],
        Call::FetchFile {
            path: REGISTRY_PATH.to_string(),
            git_ref: "main".to_string(),
        }
    );
    assert_eq!(
        calls[1],
        Call::ListOpen {
            head: branch.clone()
        }
    );
    assert_eq!(
        calls[2],
        Call::ResolveRef {
            branch: "main".to_string()
        }
    );
    assert_eq!(
        calls[3],
        Call::CreateBranch {
            from_commit: "commit-main".to_string(),
            branch: branch.clone(),
        }
    );
    match &calls[4] {
        Call::UpdateFile {
            path,
            branch: update_branch,
            message,
            expected_version,
            ..
        } => {
            assert_eq!(path, REGISTRY_PATH);
            assert_eq!(update_branch, &branch);
            assert_eq!(message, "chore: update claim statuses");
            assert_eq!(expected_version, "blob-1");
        }
        other => panic!("unexpected call: {:?}", other),
    }
    match &calls[5] {
        Call::CreateProposal {
            title, head, base, ..
        } => {
            assert_eq!(title, "chore: update claim statuses");
            assert_eq!(head, &branch);
            assert_eq!(base, "main");
        }
        other => panic!("unexpected call: {:?}", other),
    }
}

#[tokio::test]
async fn test_committed_document_carries_merged_statuses() {
    let (store, remote, reconciler) = setup(REGISTRY_DOC);
    store.put("cluster-a", "team-a/db", "Ready");
    store.put("cluster-b", "team-b/queue", "Degraded: 1/3 replicas");

    reconciler
        .reconcile_once(&CancellationToken::new())
        .await
        .unwrap();

    let committed = RegistryFile::parse(&remote.committed().unwrap()).unwrap();
    let db = committed.claim("cluster-a", "team-a/db").unwrap();
    assert_eq!(db.status_message, "Ready");
    assert!(db.last_checked_at.ends_with('Z'));

    let queue = committed.claim("cluster-b", "team-b/queue").unwrap();
    assert_eq!(queue.status_message, "Degraded: 1/3 replicas");
    assert_eq!(queue.last_checked_at, db.last_checked_at);

    let cache = committed.claim("cluster-a", "team-a/cache").unwrap();
    assert_eq!(cache.status_message, "pending");
    assert_eq!(cache.last_checked_at, "");

    let order: Vec<&str> = committed.clusters["cluster-a"]
        .iter()
        .map(|claim| claim.claim_ref.as_str())
        .collect();
    assert_eq!(order, vec!["team-a/db", "team-a/cache"]);
}

#[tokio::test]
async fn test_untracked_claims_are_counted_not_added() {
    let (store, remote, reconciler) = setup(REGISTRY_DOC);
    store.put("cluster-a", "team-a/db", "Ready");
    store.put("cluster-a", "team-a/ghost", "Ready");
    store.put("cluster-z", "team-z/anything", "Ready");

    let outcome = reconciler
        .reconcile_once(&CancellationToken::new())
        .await
        .unwrap();

    match outcome {
        TickOutcome::Published {
            updated, untracked, ..
        } => {
            assert_eq!(updated, 1);
            assert_eq!(untracked, 2);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let committed = RegistryFile::parse(&remote.committed().unwrap()).unwrap();
    assert_eq!(committed.cluster_count(), 2);
    assert_eq!(committed.claim_count(), 3);
    assert!(committed.claim("cluster-a", "team-a/ghost").is_none());
}

#[tokio::test]
async fn test_open_proposal_suppresses_publish_and_keeps_store_dirty() {
    let (store, remote, reconciler) = setup(REGISTRY_DOC);
    remote.set_open_proposals(vec![42]);
    store.put("cluster-a", "team-a/db", "Ready");

    let outcome = reconciler
        .reconcile_once(&CancellationToken::new())
        .await
        .unwrap();

    match outcome {
        TickOutcome::AlreadyConverging { branch, open } => {
            assert!(branch.starts_with("status-update-"));
            assert_eq!(open, vec![42]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(remote.call_names(), vec!["fetch_file", "list_open_proposals"]);
    assert!(store.is_dirty());
}

#[tokio::test]
async fn test_fetch_failure_leaves_store_dirty() {
    let (store, remote, reconciler) = setup(REGISTRY_DOC);
    remote.fail_on("fetch_file");
    store.put("cluster-a", "team-a/db", "Ready");

    let err = reconciler
        .reconcile_once(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Remote { .. }));
    assert_eq!(err.operation(), Some("fetch registry"));
    assert!(err.to_string().contains("fetch registry"));
    assert_eq!(remote.call_names(), vec!["fetch_file"]);
    assert!(store.is_dirty());
}

#[tokio::test]
async fn test_malformed_document_aborts_before_any_write() {
    let (store, remote, reconciler) = setup("cluster-a: [unclosed\n");
    store.put("cluster-a", "team-a/db", "Ready");

    let err = reconciler
        .reconcile_once(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Registry(_)));
    assert_eq!(remote.call_names(), vec!["fetch_file"]);
    assert!(store.is_dirty());
}

#[tokio::test]
async fn test_failure_at_each_write_stage_is_named_and_keeps_store_dirty() {
    let stages = [
        ("list_open_proposals", "list open PRs"),
        ("resolve_ref", "get ref"),
        ("create_branch", "create branch"),
        ("update_file", "update file"),
        ("create_change_proposal", "create PR"),
    ];

    for (method, operation) in stages {
        let (store, remote, reconciler) = setup(REGISTRY_DOC);
        remote.fail_on(method);
        store.put("cluster-a", "team-a/db", "Ready");

        let err = reconciler
            .reconcile_once(&CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(operation), "failing {}", method);
        assert!(store.is_dirty(), "failing {}", method);
        assert_eq!(remote.call_names().last(), Some(&method));
        let proposals = usize::from(method == "create_change_proposal");
        assert_eq!(remote.count("create_change_proposal"), proposals);
    }
}

#[tokio::test]
async fn test_stale_version_is_rejected_and_retried_next_tick() {
    let (store, remote, reconciler) = setup(REGISTRY_DOC);
    store.put("cluster-a", "team-a/db", "Ready");
    remote.commit_after_fetch("blob-2");
    let cancel = CancellationToken::new();

    let err = reconciler.reconcile_once(&cancel).await.unwrap_err();
    assert_eq!(err.operation(), Some("update file"));
    assert_eq!(remote.count("create_change_proposal"), 0);
    assert!(store.is_dirty());

    let outcome = reconciler.reconcile_once(&cancel).await;
    if let Err(ReconcileError::Remote { operation, .. }) = &outcome {
        // Both ticks can land in the same second and reuse the branch name.
        assert_eq!(*operation, "create branch");
        return;
    }
    assert!(matches!(outcome, Ok(TickOutcome::Published { .. })));
    match remote.calls().last() {
        Some(Call::CreateProposal { .. }) => {}
        other => panic!("unexpected call: {:?}", other),
    }
    let versions: Vec<String> = remote
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::UpdateFile {
                expected_version, ..
            } => Some(expected_version),
            _ => None,
        })
        .collect();
    assert_eq!(versions, vec!["blob-1".to_string(), "blob-2".to_string()]);
    assert!(!store.is_dirty());
}

#[tokio::test]
async fn test_cancel_during_remote_call_aborts_tick() {
    let (store, remote, reconciler) = setup(REGISTRY_DOC);
    remote.hang_on("fetch_file");
    store.put("cluster-a", "team-a/db", "Ready");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(2), reconciler.reconcile_once(&cancel))
        .await
        .expect("tick did not observe cancellation");

    assert!(matches!(result, Err(ReconcileError::Cancelled)));
    assert!(store.is_dirty());
    assert_eq!(remote.count("update_file"), 0);
}

#[tokio::test]
async fn test_already_cancelled_tick_makes_no_calls() {
    let (store, remote, reconciler) = setup(REGISTRY_DOC);
    store.put("cluster-a", "team-a/db", "Ready");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = reconciler.reconcile_once(&cancel).await;

    assert!(matches!(result, Err(ReconcileError::Cancelled)));
    assert!(remote.calls().is_empty());
    assert!(store.is_dirty());
}

#[tokio::test]
async fn test_second_tick_after_publish_is_clean() {
    let (store, remote, reconciler) = setup(REGISTRY_DOC);
    store.put("cluster-a", "team-a/db", "Ready");
    let cancel = CancellationToken::new();

    reconciler.reconcile_once(&cancel).await.unwrap();
    let calls_after_first = remote.calls().len();
    let second = reconciler.reconcile_once(&cancel).await.unwrap();

    assert_eq!(second, TickOutcome::Clean);
    assert_eq!(remote.calls().len(), calls_after_first);
}

#[tokio::test]
async fn test_run_publishes_on_interval_and_stops_on_cancel() {
    let settings =
        ReconcilerSettings::new(REGISTRY_PATH, "main").with_interval(Duration::from_millis(20));
    let (store, remote, reconciler) = setup_with(REGISTRY_DOC, settings);
    store.put("cluster-a", "team-a/db", "Ready");

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { reconciler.run(cancel).await }
    });

    wait_until(|| remote.count("create_change_proposal") == 1).await;
    assert!(!store.is_dirty());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
    assert_eq!(remote.count("create_change_proposal"), 1);
}

#[tokio::test]
async fn test_run_keeps_going_after_failed_ticks() {
    let settings =
        ReconcilerSettings::new(REGISTRY_PATH, "main").with_interval(Duration::from_millis(10));
    let (store, remote, reconciler) = setup_with(REGISTRY_DOC, settings);
    remote.fail_on("fetch_file");
    store.put("cluster-a", "team-a/db", "Ready");

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { reconciler.run(cancel).await }
    });

    wait_until(|| remote.count("fetch_file") >= 3).await;
    assert!(store.is_dirty());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_run_stops_promptly_while_waiting_for_first_tick() {
    let settings =
        ReconcilerSettings::new(REGISTRY_PATH, "main").with_interval(Duration::from_secs(3600));
    let (store, remote, reconciler) = setup_with(REGISTRY_DOC, settings);
    store.put("cluster-a", "team-a/db", "Ready");

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { reconciler.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop did not stop")
        .unwrap();

    assert!(remote.calls().is_empty(), "first tick waits a full interval");
    assert!(store.is_dirty());
}

#[tokio::test]
async fn test_run_cancels_a_tick_in_flight() {
    let settings =
        ReconcilerSettings::new(REGISTRY_PATH, "main").with_interval(Duration::from_millis(10));
    let (store, remote, reconciler) = setup_with(REGISTRY_DOC, settings);
    remote.hang_on("update_file");
    store.put("cluster-a", "team-a/db", "Ready");

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { reconciler.run(cancel).await }
    });

    wait_until(|| remote.count("update_file") == 1).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop did not stop")
        .unwrap();

    assert_eq!(remote.count("create_change_proposal"), 0);
    assert!(store.is_dirty());
}
