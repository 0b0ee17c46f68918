//! In-memory object store.
//!
//! Backs the operator binary and the tests. Failures can be injected per
//! object name to exercise partial scale-up passes.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use elasticjob_id::JobName;
use elasticjob_reconcile::PodPhase;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ObjectKind, ObjectStore, StoreError};
use crate::job::{ElasticJob, JobStatus};
use crate::objects::{LabelSelector, Pod, Service};

#[derive(Debug, Default)]
struct Objects {
    jobs: BTreeMap<JobName, ElasticJob>,
    pods: BTreeMap<String, Pod>,
    services: BTreeMap<String, Service>,
}

#[derive(Debug, Default)]
struct Failures {
    pods: HashSet<String>,
    services: HashSet<String>,
}

/// In-memory store keyed by object name.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<Objects>,
    failures: RwLock<Failures>,
    /// Names passed to `create_pod`, in call order, including failed calls.
    pod_attempts: RwLock<Vec<String>>,
    /// Names passed to `create_service`, in call order, including failed calls.
    service_attempts: RwLock<Vec<String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a job.
    pub async fn put_job(&self, job: ElasticJob) {
        let mut objects = self.objects.write().await;
        objects.jobs.insert(job.name.clone(), job);
    }

    /// Fetch a job by name.
    pub async fn job(&self, name: &JobName) -> Option<ElasticJob> {
        self.objects.read().await.jobs.get(name).cloned()
    }

    /// Fetch a task by name.
    pub async fn pod(&self, name: &str) -> Option<Pod> {
        self.objects.read().await.pods.get(name).cloned()
    }

    /// Fetch a service by name.
    pub async fn service(&self, name: &str) -> Option<Service> {
        self.objects.read().await.services.get(name).cloned()
    }

    /// Number of stored tasks.
    pub async fn pod_count(&self) -> usize {
        self.objects.read().await.pods.len()
    }

    /// Number of stored services.
    pub async fn service_count(&self) -> usize {
        self.objects.read().await.services.len()
    }

    /// Move a task to a new phase, as the cluster would.
    pub async fn set_pod_phase(&self, name: &str, phase: PodPhase) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        let pod = objects.pods.get_mut(name).ok_or_else(|| StoreError::NotFound {
            kind: ObjectKind::Pod,
            name: name.to_string(),
        })?;
        pod.phase = phase;
        Ok(())
    }

    /// Store a task directly, bypassing creation checks.
    pub async fn seed_pod(&self, pod: Pod) {
        let mut objects = self.objects.write().await;
        objects.pods.insert(pod.name.clone(), pod);
    }

    /// Store a service directly, bypassing creation checks.
    pub async fn seed_service(&self, service: Service) {
        let mut objects = self.objects.write().await;
        objects.services.insert(service.name.clone(), service);
    }

    /// Make every `create_pod` call for `name` fail until cleared.
    pub async fn fail_pod_create(&self, name: &str) {
        self.failures.write().await.pods.insert(name.to_string());
    }

    /// Make every `create_service` call for `name` fail until cleared.
    pub async fn fail_service_create(&self, name: &str) {
        self.failures.write().await.services.insert(name.to_string());
    }

    /// Remove all injected failures.
    pub async fn clear_failures(&self) {
        let mut failures = self.failures.write().await;
        failures.pods.clear();
        failures.services.clear();
    }

    /// Names passed to `create_pod` so far.
    pub async fn pod_attempts(&self) -> Vec<String> {
        self.pod_attempts.read().await.clone()
    }

    /// Names passed to `create_service` so far.
    pub async fn service_attempts(&self) -> Vec<String> {
        self.service_attempts.read().await.clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_jobs(&self) -> Result<Vec<ElasticJob>, StoreError> {
        Ok(self.objects.read().await.jobs.values().cloned().collect())
    }

    async fn update_job_status(
        &self,
        job: &JobName,
        status: JobStatus,
    ) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        let stored = objects.jobs.get_mut(job).ok_or_else(|| StoreError::NotFound {
            kind: ObjectKind::Job,
            name: job.to_string(),
        })?;
        stored.status = status;
        Ok(())
    }

    async fn create_pod(&self, pod: Pod) -> Result<(), StoreError> {
        self.pod_attempts.write().await.push(pod.name.clone());

        if self.failures.read().await.pods.contains(&pod.name) {
            return Err(StoreError::Unavailable(format!(
                "injected failure creating pod {}",
                pod.name
            )));
        }

        let mut objects = self.objects.write().await;
        if objects.pods.contains_key(&pod.name) {
            return Err(StoreError::AlreadyExists {
                kind: ObjectKind::Pod,
                name: pod.name,
            });
        }

        debug!(pod = %pod.name, "Stored pod");
        objects.pods.insert(pod.name.clone(), pod);
        Ok(())
    }

    async fn list_pods(&self, selector: &LabelSelector) -> Result<Vec<Pod>, StoreError> {
        Ok(self
            .objects
            .read()
            .await
            .pods
            .values()
            .filter(|p| selector.matches(&p.labels))
            .cloned()
            .collect())
    }

    async fn create_service(&self, service: Service) -> Result<(), StoreError> {
        self.service_attempts.write().await.push(service.name.clone());

        if self.failures.read().await.services.contains(&service.name) {
            return Err(StoreError::Unavailable(format!(
                "injected failure creating service {}",
                service.name
            )));
        }

        let mut objects = self.objects.write().await;
        if objects.services.contains_key(&service.name) {
            return Err(StoreError::AlreadyExists {
                kind: ObjectKind::Service,
                name: service.name,
            });
        }

        debug!(service = %service.name, "Stored service");
        objects.services.insert(service.name.clone(), service);
        Ok(())
    }

    async fn list_services(&self, selector: &LabelSelector) -> Result<Vec<Service>, StoreError> {
        Ok(self
            .objects
            .read()
            .await
            .services
            .values()
            .filter(|s| selector.matches(&s.labels))
            .cloned()
            .collect())
    }
}
