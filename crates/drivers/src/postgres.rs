//! `PostgreSQL` driver.

use adya_core::anomaly::IsolationLevel;
use adya_core::History;
use adya_testgen::generator::Workload;

use crate::{ClusterConfig, DbDriver};

/// Driver for `PostgreSQL`.
pub struct PostgresDriver {
    _config: ClusterConfig,
}

impl DbDriver for PostgresDriver {
    type Error = PostgresError;

    fn connect(_config: &ClusterConfig) -> Result<Self, Self::Error> {
        todo!("PostgreSQL driver connection not yet implemented")
    }

    fn execute(
        &self,
        _workload: &Workload,
        _isolation: IsolationLevel,
    ) -> Result<History<u64, u64>, Self::Error> {
        todo!("PostgreSQL driver execution not yet implemented")
    }
}

/// Errors from the `PostgreSQL` driver.
#[derive(Debug)]
pub enum PostgresError {
    /// Failed to connect to the cluster.
    Connection(String),
    /// Query execution failed.
    Execution(String),
}
