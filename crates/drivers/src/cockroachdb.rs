//! `CockroachDB` driver (distributed SQL, `PostgreSQL` wire-compatible).

use adya_core::anomaly::IsolationLevel;
use adya_core::History;
use adya_testgen::generator::Workload;

use crate::{ClusterConfig, DbDriver};

/// Driver for `CockroachDB`.
pub struct CockroachDbDriver {
    _config: ClusterConfig,
}

impl DbDriver for CockroachDbDriver {
    type Error = CockroachDbError;

    fn connect(_config: &ClusterConfig) -> Result<Self, Self::Error> {
        todo!("CockroachDB driver connection not yet implemented")
    }

    fn execute(
        &self,
        _workload: &Workload,
        _isolation: IsolationLevel,
    ) -> Result<History<u64, u64>, Self::Error> {
        todo!("CockroachDB driver execution not yet implemented")
    }
}

/// Errors from the `CockroachDB` driver.
#[derive(Debug)]
pub enum CockroachDbError {
    /// Failed to connect to the cluster.
    Connection(String),
    /// Query execution failed.
    Execution(String),
}
