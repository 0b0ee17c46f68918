//! Integration tests for parameter server scale-up.
//!
//! These run the PS manager against the in-memory store with injected
//! failures:
//! 1. Converged groups are left alone
//! 2. Missing tasks get contiguous indices after every existing task
//! 3. New tasks receive the live peer roster in TF_CONFIG
//! 4. Persist failures stop the pass and leave a retryable state

use std::sync::Arc;

use elasticjob_events::EventReason;
use elasticjob_id::{JobName, ReplicaType, TaskIndex};
use elasticjob_operator::objects::{Pod, LABEL_REPLICA_INDEX};
use elasticjob_operator::replica::{PsManager, TaskGroup};
use elasticjob_operator::{
    ElasticJob, MemoryRecorder, MemoryStore, ReconcileContext, ReconcileError, ReplicaManager,
    ReplicaResourceSpec,
};
use elasticjob_reconcile::{PodPhase, ReplicaStatus, RosterMode, TfConfig, TF_CONFIG_ENV};
use rstest::rstest;

struct Harness {
    store: Arc<MemoryStore>,
    recorder: Arc<MemoryRecorder>,
    ctx: ReconcileContext,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let recorder = Arc::new(MemoryRecorder::new());
    let ctx = ReconcileContext::new(store.clone(), recorder.clone());
    Harness {
        store,
        recorder,
        ctx,
    }
}

fn spec(replicas: u32) -> ReplicaResourceSpec {
    ReplicaResourceSpec {
        replicas,
        image: "trainer:v1".to_string(),
        command: vec!["python".to_string(), "-m".to_string(), "ps".to_string()],
        env: vec![],
    }
}

fn job(status: ReplicaStatus, replicas: u32) -> ElasticJob {
    ElasticJob::new(JobName::parse("train-a").unwrap())
        .with_replicas(ReplicaType::Ps, spec(replicas))
        .with_status(ReplicaType::Ps, status)
}

fn status(pending: u32, active: u32, succeeded: u32, failed: u32) -> ReplicaStatus {
    ReplicaStatus {
        pending,
        active,
        succeeded,
        failed,
        unknown: 0,
    }
}

/// Store an existing PS task (and its service) in `phase`.
async fn seed_ps(h: &Harness, manager: &PsManager, index: u32, phase: PodPhase) {
    let job = job(ReplicaStatus::default(), 0);
    let mut pod = manager
        .tasks()
        .new_task(&job, &spec(0), TaskIndex::new(index));
    pod.phase = phase;
    h.store.seed_pod(pod).await;
    h.store
        .seed_service(manager.tasks().new_task_service(&job, TaskIndex::new(index)))
        .await;
}

fn tf_config(pod: &Pod) -> TfConfig {
    let raw = pod.containers[0].env_value(TF_CONFIG_ENV).unwrap();
    serde_json::from_str(raw).unwrap()
}

fn ps_roster(config: &TfConfig) -> Vec<String> {
    config.cluster[&ReplicaType::Ps].as_slice().to_vec()
}

#[rstest]
#[case(status(0, 2, 0, 0), 2)]
#[case(status(1, 1, 0, 0), 1)]
#[case(status(0, 0, 3, 1), 0)]
#[case(status(2, 3, 0, 4), 4)]
#[tokio::test]
async fn test_no_creations_when_converged(#[case] s: ReplicaStatus, #[case] desired: u32) {
    let h = harness();
    let manager = PsManager::new(RosterMode::Snapshot);

    manager
        .reconcile_pods(&h.ctx, &job(s, desired), &spec(desired))
        .await
        .unwrap();

    assert!(h.store.pod_attempts().await.is_empty());
    assert!(h.store.service_attempts().await.is_empty());
    assert!(h.recorder.warnings().is_empty());
}

#[tokio::test]
async fn test_scale_up_from_two_running_to_four() {
    let h = harness();
    let manager = PsManager::new(RosterMode::Snapshot);
    seed_ps(&h, &manager, 0, PodPhase::Running).await;
    seed_ps(&h, &manager, 1, PodPhase::Running).await;

    manager
        .reconcile_pods(&h.ctx, &job(status(0, 2, 0, 0), 4), &spec(4))
        .await
        .unwrap();

    assert_eq!(
        h.store.pod_attempts().await,
        vec!["train-a-ps-2".to_string(), "train-a-ps-3".to_string()]
    );
    assert_eq!(h.store.pod_count().await, 4);
    assert_eq!(h.store.service_count().await, 4);

    for (name, index) in [("train-a-ps-2", 2), ("train-a-ps-3", 3)] {
        let pod = h.store.pod(name).await.unwrap();
        assert_eq!(pod.labels[LABEL_REPLICA_INDEX], index.to_string());
        assert_eq!(pod.phase, PodPhase::Pending);

        let config = tf_config(&pod);
        assert_eq!(config.task.task_type, ReplicaType::Ps);
        assert_eq!(config.task.index, TaskIndex::new(index));
        assert_eq!(
            ps_roster(&config),
            vec!["train-a-ps-0:3333".to_string(), "train-a-ps-1:3333".to_string()]
        );

        let service = h.store.service(name).await.unwrap();
        assert_eq!(service.port, 3333);
    }
}

#[tokio::test]
async fn test_incremental_roster_includes_earlier_siblings() {
    let h = harness();
    let manager = PsManager::new(RosterMode::Incremental);
    seed_ps(&h, &manager, 0, PodPhase::Running).await;
    seed_ps(&h, &manager, 1, PodPhase::Running).await;

    manager
        .reconcile_pods(&h.ctx, &job(status(0, 2, 0, 0), 4), &spec(4))
        .await
        .unwrap();

    let second = tf_config(&h.store.pod("train-a-ps-2").await.unwrap());
    let third = tf_config(&h.store.pod("train-a-ps-3").await.unwrap());
    assert_eq!(ps_roster(&second).len(), 2);
    assert_eq!(
        ps_roster(&third),
        vec![
            "train-a-ps-0:3333".to_string(),
            "train-a-ps-1:3333".to_string(),
            "train-a-ps-2:3333".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_indices_skip_terminal_tasks_and_roster_excludes_them() {
    let h = harness();
    let manager = PsManager::new(RosterMode::Snapshot);
    seed_ps(&h, &manager, 0, PodPhase::Succeeded).await;
    seed_ps(&h, &manager, 1, PodPhase::Failed).await;
    seed_ps(&h, &manager, 2, PodPhase::Running).await;

    manager
        .reconcile_pods(&h.ctx, &job(status(0, 1, 1, 1), 3), &spec(3))
        .await
        .unwrap();

    assert_eq!(
        h.store.pod_attempts().await,
        vec!["train-a-ps-3".to_string(), "train-a-ps-4".to_string()]
    );
    let config = tf_config(&h.store.pod("train-a-ps-4").await.unwrap());
    assert_eq!(ps_roster(&config), vec!["train-a-ps-2:3333".to_string()]);
}

#[tokio::test]
async fn test_malformed_index_label_is_skipped() {
    let h = harness();
    let manager = PsManager::new(RosterMode::Snapshot);
    seed_ps(&h, &manager, 0, PodPhase::Running).await;

    let mut broken = manager.tasks().new_task(
        &job(ReplicaStatus::default(), 0),
        &spec(0),
        TaskIndex::new(9),
    );
    broken.name = "train-a-ps-broken".to_string();
    broken.phase = PodPhase::Running;
    broken
        .labels
        .insert(LABEL_REPLICA_INDEX.to_string(), "nine".to_string());
    h.store.seed_pod(broken).await;

    manager
        .reconcile_pods(&h.ctx, &job(status(0, 2, 0, 0), 3), &spec(3))
        .await
        .unwrap();

    let config = tf_config(&h.store.pod("train-a-ps-2").await.unwrap());
    assert_eq!(ps_roster(&config), vec!["train-a-ps-0:3333".to_string()]);
}

#[tokio::test]
async fn test_pod_create_failure_stops_the_pass() {
    let h = harness();
    let manager = PsManager::new(RosterMode::Snapshot);
    h.store.fail_pod_create("train-a-ps-1").await;

    let err = manager
        .reconcile_pods(&h.ctx, &job(ReplicaStatus::default(), 3), &spec(3))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::CreatePod { ref name, .. } if name == "train-a-ps-1"));
    assert_eq!(
        h.store.pod_attempts().await,
        vec!["train-a-ps-0".to_string(), "train-a-ps-1".to_string()]
    );
    assert_eq!(h.store.service_attempts().await, vec!["train-a-ps-0".to_string()]);

    let warnings = h.recorder.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].reason, EventReason::PodFailed);
    assert!(warnings[0].message.contains("train-a-ps-1"));
    assert_eq!(warnings[0].subject.as_str(), "train-a");
}

#[tokio::test]
async fn test_service_failure_leaves_task_and_retry_does_not_duplicate() {
    let h = harness();
    let manager = PsManager::new(RosterMode::Snapshot);
    h.store.fail_service_create("train-a-ps-0").await;

    let stale = job(ReplicaStatus::default(), 2);
    let err = manager
        .reconcile_pods(&h.ctx, &stale, &spec(2))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::CreateService { .. }));
    assert!(h.store.pod("train-a-ps-0").await.is_some());
    assert!(h.store.service("train-a-ps-0").await.is_none());
    assert!(h.store.pod("train-a-ps-1").await.is_none());

    let warnings = h.recorder.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].reason, EventReason::ServiceFailed);

    // Retry with the same (stale) counts: the task at index 0 is adopted.
    h.store.clear_failures().await;
    manager
        .reconcile_pods(&h.ctx, &stale, &spec(2))
        .await
        .unwrap();

    assert_eq!(h.store.pod_count().await, 2);
    assert_eq!(h.store.service_count().await, 2);
    assert!(h.store.service("train-a-ps-0").await.is_some());
    assert_eq!(h.recorder.warnings().len(), 1);
}

#[tokio::test]
async fn test_service_failure_repaired_with_fresh_status() {
    let h = harness();
    let manager = PsManager::new(RosterMode::Snapshot);
    h.store.fail_service_create("train-a-ps-0").await;

    manager
        .reconcile_pods(&h.ctx, &job(ReplicaStatus::default(), 1), &spec(1))
        .await
        .unwrap_err();

    // The dangling task now counts as alive.
    h.store.clear_failures().await;
    manager
        .reconcile_pods(&h.ctx, &job(status(1, 0, 0, 0), 1), &spec(1))
        .await
        .unwrap();

    assert_eq!(h.store.pod_attempts().await, vec!["train-a-ps-0".to_string()]);
    assert!(h.store.service("train-a-ps-0").await.is_some());
}

#[tokio::test]
async fn test_unknown_task_keeps_its_index() {
    let h = harness();
    let manager = PsManager::new(RosterMode::Snapshot);
    seed_ps(&h, &manager, 0, PodPhase::Running).await;
    seed_ps(&h, &manager, 1, PodPhase::Unknown).await;

    let observed = ReplicaStatus::from_phases([PodPhase::Running, PodPhase::Unknown]);
    manager
        .reconcile_pods(&h.ctx, &job(observed, 2), &spec(2))
        .await
        .unwrap();

    assert_eq!(h.store.pod_attempts().await, vec!["train-a-ps-2".to_string()]);
    let config = tf_config(&h.store.pod("train-a-ps-2").await.unwrap());
    assert_eq!(ps_roster(&config), vec!["train-a-ps-0:3333".to_string()]);

    let created: Vec<_> = h
        .recorder
        .events()
        .into_iter()
        .filter(|e| e.reason == EventReason::Created)
        .collect();
    assert_eq!(created.len(), 1);
    assert!(created[0].message.contains("train-a-ps-2"));
}

#[tokio::test]
async fn test_stale_plan_does_not_adopt_dead_task() {
    let h = harness();
    let manager = PsManager::new(RosterMode::Snapshot);
    seed_ps(&h, &manager, 0, PodPhase::Failed).await;

    // The status predates ps-0, so the plan hands out its index again.
    manager
        .reconcile_pods(&h.ctx, &job(ReplicaStatus::default(), 1), &spec(1))
        .await
        .unwrap();

    assert_eq!(h.store.pod_attempts().await, vec!["train-a-ps-0".to_string()]);
    assert!(h.store.service_attempts().await.is_empty());
    assert!(h.recorder.events().is_empty());
    assert_eq!(h.store.pod("train-a-ps-0").await.unwrap().phase, PodPhase::Failed);
}

#[tokio::test]
async fn test_adopted_live_task_is_not_announced() {
    let h = harness();
    let manager = PsManager::new(RosterMode::Snapshot);
    seed_ps(&h, &manager, 0, PodPhase::Pending).await;

    manager
        .reconcile_pods(&h.ctx, &job(ReplicaStatus::default(), 1), &spec(1))
        .await
        .unwrap();

    assert_eq!(h.store.pod_count().await, 1);
    assert_eq!(h.store.service_attempts().await, vec!["train-a-ps-0".to_string()]);
    assert!(h.recorder.events().is_empty());
}
