//! Networking helpers for elasticjob task groups.
//!
//! Every task gets a companion service whose DNS name is derived from
//! `(job name, replica type, index)`. The same derivation is used when a
//! task's own service is created and when a peer's address is put into a
//! roster, so both call sites must go through this crate.
//!
//! - Task/service name: `{job}-{type}-{index}`
//! - Service address: `{job}-{type}-{index}:{port}`

use elasticjob_id::{JobName, ReplicaType, TaskIndex};
use thiserror::Error;

/// Port exposed by parameter server services.
pub const PS_SERVICE_PORT: u16 = 3333;

/// Port exposed by worker services.
pub const WORKER_SERVICE_PORT: u16 = 3333;

/// Networking errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The address is missing the `:port` suffix.
    #[error("missing port in address: {0}")]
    MissingPort(String),

    /// The port is not a valid u16.
    #[error("invalid port in address: {0}")]
    InvalidPort(String),

    /// The host does not belong to the expected job and replica type.
    #[error("address {addr} does not belong to {expected_prefix}*")]
    ForeignHost {
        addr: String,
        expected_prefix: String,
    },

    /// The index suffix is not numeric.
    #[error("invalid index in address: {0}")]
    InvalidIndex(String),
}

/// Derive the name of the task (and its service) at `index`.
pub fn task_name(job: &JobName, replica_type: ReplicaType, index: TaskIndex) -> String {
    format!("{}-{}-{}", job, replica_type, index)
}

/// Derive the stable service address of the task at `index`.
///
/// Deterministic, and injective in `index` for a fixed job and type.
pub fn service_addr(
    job: &JobName,
    replica_type: ReplicaType,
    index: TaskIndex,
    port: u16,
) -> String {
    format!("{}:{}", task_name(job, replica_type, index), port)
}

/// Recover the task index and port from an address built by [`service_addr`].
pub fn parse_service_addr(
    addr: &str,
    job: &JobName,
    replica_type: ReplicaType,
) -> Result<(TaskIndex, u16), NetworkError> {
    let Some((host, port_str)) = addr.rsplit_once(':') else {
        return Err(NetworkError::MissingPort(addr.to_string()));
    };

    let port = port_str
        .parse::<u16>()
        .map_err(|_| NetworkError::InvalidPort(addr.to_string()))?;

    let prefix = format!("{}-{}-", job, replica_type);
    let Some(index_str) = host.strip_prefix(&prefix) else {
        return Err(NetworkError::ForeignHost {
            addr: addr.to_string(),
            expected_prefix: prefix,
        });
    };

    let index =
        TaskIndex::parse(index_str).map_err(|_| NetworkError::InvalidIndex(addr.to_string()))?;

    Ok((index, port))
}
