//! Reconciliation primitives for elasticjob task groups.
//!
//! This library holds the pure parts of a scale-up pass:
//!
//! - **Delta**: how many tasks are missing and which indices they get.
//! - **Roster**: the live peer addresses of a task group.
//! - **Payload**: the `TF_CONFIG` document a task reads at process start.
//!
//! # Invariants
//!
//! - Decisions are deterministic given the same status snapshot
//! - New indices start at the total task count, terminal and unknown tasks
//!   included, so an index is never handed out twice
//! - A malformed member never aborts a roster build

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use elasticjob_id::{JobName, ReplicaType, TaskIndex};
use elasticjob_networking::{parse_service_addr, service_addr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable carrying the runtime configuration payload.
pub const TF_CONFIG_ENV: &str = "TF_CONFIG";

/// Payload errors.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload could not be serialized.
    #[error("failed to serialize TF_CONFIG: {0}")]
    Serialize(#[from] serde_json::Error),
}

// =============================================================================
// Status and Delta
// =============================================================================

/// Lifecycle phase of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PodPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Returns true if a task in this phase is advertised to peers.
    pub fn is_alive(&self) -> bool {
        matches!(self, PodPhase::Pending | PodPhase::Running)
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PodPhase::Pending => "Pending",
            PodPhase::Running => "Running",
            PodPhase::Succeeded => "Succeeded",
            PodPhase::Failed => "Failed",
            PodPhase::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// Per-phase task counts of one task group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicaStatus {
    pub pending: u32,
    pub active: u32,
    pub succeeded: u32,
    pub failed: u32,

    /// Tasks whose phase could not be determined. They still hold their
    /// index but are not advertised to peers.
    pub unknown: u32,
}

impl ReplicaStatus {
    /// Tasks that count toward the desired replica count.
    pub fn alive(&self) -> u32 {
        self.active + self.pending
    }

    /// Every task ever created for the group, terminal and unknown phases
    /// included.
    pub fn total(&self) -> u32 {
        self.pending + self.active + self.succeeded + self.failed + self.unknown
    }

    /// Count one task in `phase`.
    pub fn observe(&mut self, phase: PodPhase) {
        match phase {
            PodPhase::Pending => self.pending += 1,
            PodPhase::Running => self.active += 1,
            PodPhase::Succeeded => self.succeeded += 1,
            PodPhase::Failed => self.failed += 1,
            PodPhase::Unknown => self.unknown += 1,
        }
    }

    /// Build a status from a set of task phases.
    pub fn from_phases<I>(phases: I) -> Self
    where
        I: IntoIterator<Item = PodPhase>,
    {
        let mut status = Self::default();
        for phase in phases {
            status.observe(phase);
        }
        status
    }
}

/// The tasks one scale-up pass must create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleUpPlan {
    /// First index to assign.
    pub start: TaskIndex,

    /// Number of tasks to create.
    pub count: u32,
}

impl ScaleUpPlan {
    /// Compute the scale-up delta for a group.
    ///
    /// Returns `None` when the group already has at least `desired` alive
    /// tasks.
    pub fn compute(status: &ReplicaStatus, desired: u32) -> Option<Self> {
        let alive = status.alive();
        if desired <= alive {
            return None;
        }

        Some(Self {
            start: TaskIndex::new(status.total()),
            count: desired - alive,
        })
    }

    /// Indices to create, in order.
    pub fn indices(&self) -> impl Iterator<Item = TaskIndex> {
        let start = self.start.value();
        (start..start.saturating_add(self.count)).map(TaskIndex::new)
    }
}

// =============================================================================
// Roster
// =============================================================================

/// How a scale-up pass shares its own new tasks with their siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterMode {
    /// Every new task sees only the peers alive before the pass started.
    #[default]
    Snapshot,

    /// Each new task is appended to the roster once it is created, so later
    /// siblings in the same pass see it.
    Incremental,
}

impl fmt::Display for RosterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RosterMode::Snapshot => write!(f, "snapshot"),
            RosterMode::Incremental => write!(f, "incremental"),
        }
    }
}

impl FromStr for RosterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "snapshot" => Ok(RosterMode::Snapshot),
            "incremental" => Ok(RosterMode::Incremental),
            other => Err(format!(
                "unknown roster mode '{}', expected 'snapshot' or 'incremental'",
                other
            )),
        }
    }
}

/// A member of a task group as seen by the roster builder.
pub trait RosterMember {
    /// Raw value of the index label, if present.
    fn index_label(&self) -> Option<&str>;

    /// Current lifecycle phase.
    fn phase(&self) -> PodPhase;
}

/// Ordered peer addresses of a task group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(Vec<String>);

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, addr: String) {
        self.0.push(addr);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.0.iter().any(|a| a == addr)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Sort addresses by the index they encode.
    ///
    /// Addresses that do not parse for this job and type keep their relative
    /// order after all parsed ones.
    pub fn sort_by_index(&mut self, job: &JobName, replica_type: ReplicaType) {
        self.0.sort_by_key(|addr| {
            parse_service_addr(addr, job, replica_type)
                .map(|(index, _)| (0u8, index.value()))
                .unwrap_or((1, 0))
        });
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for Roster {
    fn from(addrs: Vec<String>) -> Self {
        Self(addrs)
    }
}

/// Build the roster of live peers for a task group.
///
/// Members that are not Pending or Running are left out, as are members
/// whose index label is missing or not numeric. Output follows input order.
pub fn build_hosts<'a, M, I>(
    members: I,
    job: &JobName,
    replica_type: ReplicaType,
    port: u16,
) -> Roster
where
    M: RosterMember + 'a,
    I: IntoIterator<Item = &'a M>,
{
    let mut roster = Roster::new();
    for member in members {
        let Some(index) = member
            .index_label()
            .and_then(|label| TaskIndex::parse(label).ok())
        else {
            continue;
        };
        if member.phase().is_alive() {
            roster.push(service_addr(job, replica_type, index, port));
        }
    }
    roster
}

// =============================================================================
// TF_CONFIG Payload
// =============================================================================

/// Role and index of the task reading the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TfTask {
    #[serde(rename = "type")]
    pub task_type: ReplicaType,
    pub index: TaskIndex,
}

/// Runtime configuration handed to every task at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TfConfig {
    /// Peer addresses keyed by replica type.
    pub cluster: BTreeMap<ReplicaType, Roster>,

    /// The task's own identity.
    pub task: TfTask,
}

impl TfConfig {
    /// Payload for a task whose cluster consists of a single group.
    pub fn new(replica_type: ReplicaType, roster: Roster, index: TaskIndex) -> Self {
        let mut cluster = BTreeMap::new();
        cluster.insert(replica_type, roster);
        Self {
            cluster,
            task: TfTask {
                task_type: replica_type,
                index,
            },
        }
    }

    /// Add another group's roster to the cluster.
    pub fn with_group(mut self, replica_type: ReplicaType, roster: Roster) -> Self {
        self.cluster.insert(replica_type, roster);
        self
    }

    /// Serialize to the environment value.
    pub fn to_env_value(&self) -> Result<String, PayloadError> {
        Ok(serde_json::to_string(self)?)
    }
}
