//! Integration tests for the job controller.
//!
//! The controller refreshes status from the store before dispatching each
//! task group to its registered manager.

use std::sync::Arc;

use elasticjob_events::EventReason;
use elasticjob_id::{JobName, ReplicaType, TaskIndex};
use elasticjob_operator::{
    ElasticJob, JobController, MemoryRecorder, MemoryStore, ObjectStore, ReconcileContext,
    ReplicaManagers, ReplicaResourceSpec,
};
use elasticjob_reconcile::{PodPhase, ReplicaStatus, RosterMode, TfConfig, TF_CONFIG_ENV};

fn controller(store: &Arc<MemoryStore>) -> JobController {
    controller_with(store, Arc::new(MemoryRecorder::new()))
}

fn controller_with(store: &Arc<MemoryStore>, recorder: Arc<MemoryRecorder>) -> JobController {
    let ctx = ReconcileContext::new(store.clone(), recorder);
    JobController::new(ctx, ReplicaManagers::with_defaults(RosterMode::Snapshot))
}

fn replicas(n: u32) -> ReplicaResourceSpec {
    ReplicaResourceSpec {
        replicas: n,
        image: "trainer:v1".to_string(),
        ..Default::default()
    }
}

fn train_a() -> JobName {
    JobName::parse("train-a").unwrap()
}

async fn tf_config(store: &MemoryStore, name: &str) -> TfConfig {
    let pod = store.pod(name).await.unwrap();
    serde_json::from_str(pod.containers[0].env_value(TF_CONFIG_ENV).unwrap()).unwrap()
}

#[tokio::test]
async fn test_reconcile_job_writes_status() {
    let store = Arc::new(MemoryStore::new());
    let job = ElasticJob::new(train_a()).with_replicas(ReplicaType::Ps, replicas(2));
    store.put_job(job.clone()).await;

    let stats = controller(&store).reconcile_job(&job).await.unwrap();
    assert_eq!(stats.groups_reconciled, 1);
    assert_eq!(store.pod_count().await, 2);

    // Second pass sees the two pending tasks and does nothing.
    let job = store.job(&train_a()).await.unwrap();
    controller(&store).reconcile_job(&job).await.unwrap();
    assert_eq!(store.pod_count().await, 2);

    let job = store.job(&train_a()).await.unwrap();
    assert_eq!(
        job.status.replica(ReplicaType::Ps),
        ReplicaStatus {
            pending: 2,
            ..Default::default()
        }
    );
}

#[tokio::test]
async fn test_status_refresh_counts_existing_tasks() {
    let store = Arc::new(MemoryStore::new());
    let job = ElasticJob::new(train_a()).with_replicas(ReplicaType::Ps, replicas(2));
    store.put_job(job.clone()).await;
    controller(&store).reconcile_all().await.unwrap();

    store.set_pod_phase("train-a-ps-0", PodPhase::Running).await.unwrap();
    store.set_pod_phase("train-a-ps-1", PodPhase::Failed).await.unwrap();

    let mut job = store.job(&train_a()).await.unwrap();
    job.replica_specs.insert(ReplicaType::Ps, replicas(3));
    store.put_job(job).await;
    controller(&store).reconcile_all().await.unwrap();

    // One alive, three desired: indices 2 and 3.
    assert_eq!(
        store.pod_attempts().await,
        vec![
            "train-a-ps-0".to_string(),
            "train-a-ps-1".to_string(),
            "train-a-ps-2".to_string(),
            "train-a-ps-3".to_string(),
        ]
    );
    let config = tf_config(&store, "train-a-ps-3").await;
    assert_eq!(
        config.cluster[&ReplicaType::Ps].as_slice(),
        &["train-a-ps-0:3333".to_string()]
    );
}

#[tokio::test]
async fn test_worker_roster_includes_parameter_servers() {
    let store = Arc::new(MemoryStore::new());
    let job = ElasticJob::new(train_a())
        .with_replicas(ReplicaType::Ps, replicas(2))
        .with_replicas(ReplicaType::Worker, replicas(1));
    store.put_job(job).await;

    let stats = controller(&store).reconcile_all().await.unwrap();
    assert_eq!(stats.groups_reconciled, 2);

    let config = tf_config(&store, "train-a-worker-0").await;
    assert_eq!(config.task.task_type, ReplicaType::Worker);
    assert_eq!(config.task.index, TaskIndex::new(0));
    assert_eq!(
        config.cluster[&ReplicaType::Ps].as_slice(),
        &[
            "train-a-ps-0:3333".to_string(),
            "train-a-ps-1:3333".to_string(),
        ]
    );
    assert!(config.cluster[&ReplicaType::Worker].is_empty());
}

#[tokio::test]
async fn test_unregistered_group_is_skipped() {
    let store = Arc::new(MemoryStore::new());
    let job = ElasticJob::new(train_a())
        .with_replicas(ReplicaType::Ps, replicas(1))
        .with_replicas(ReplicaType::Chief, replicas(1));
    store.put_job(job.clone()).await;

    let stats = controller(&store).reconcile_job(&job).await.unwrap();
    assert_eq!(stats.groups_reconciled, 1);
    assert_eq!(stats.groups_skipped, 1);
    assert_eq!(store.pod_count().await, 1);
}

#[tokio::test]
async fn test_failing_group_does_not_block_others() {
    let store = Arc::new(MemoryStore::new());
    store.fail_pod_create("train-a-ps-0").await;
    let job = ElasticJob::new(train_a())
        .with_replicas(ReplicaType::Ps, replicas(1))
        .with_replicas(ReplicaType::Worker, replicas(1));
    store.put_job(job).await;

    let stats = controller(&store).reconcile_all().await.unwrap();
    assert_eq!(stats.jobs_processed, 1);
    assert_eq!(stats.groups_failed, 1);
    assert_eq!(stats.groups_reconciled, 1);
    assert!(store.pod("train-a-worker-0").await.is_some());

    let jobs = store.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
}

#[tokio::test]
async fn test_group_with_unknown_task_converges() {
    let store = Arc::new(MemoryStore::new());
    let recorder = Arc::new(MemoryRecorder::new());
    let job = ElasticJob::new(train_a()).with_replicas(ReplicaType::Ps, replicas(2));
    store.put_job(job).await;
    let controller = controller_with(&store, recorder.clone());

    controller.reconcile_all().await.unwrap();
    store.set_pod_phase("train-a-ps-0", PodPhase::Running).await.unwrap();
    store.set_pod_phase("train-a-ps-1", PodPhase::Unknown).await.unwrap();

    for _ in 0..3 {
        controller.reconcile_all().await.unwrap();
    }

    assert_eq!(
        store.pod_attempts().await,
        vec![
            "train-a-ps-0".to_string(),
            "train-a-ps-1".to_string(),
            "train-a-ps-2".to_string(),
        ]
    );
    let created = recorder
        .events()
        .iter()
        .filter(|e| e.reason == EventReason::Created)
        .count();
    assert_eq!(created, 3);
    assert!(recorder.warnings().is_empty());

    let job = store.job(&train_a()).await.unwrap();
    let status = job.status.replica(ReplicaType::Ps);
    assert_eq!(status.alive(), 2);
    assert_eq!(status.unknown, 1);
}
