//! Database adapters and fault injection for workload execution.
//!
//! A driver connects to a cluster, executes a planned workload session by
//! session, and records the observed history truthfully: every read result,
//! every outcome, and per-transaction wall-clock stamps. The analysis core
//! never touches a driver; it only ever sees the history the driver
//! recorded.

pub mod cockroachdb;
pub mod mem;
pub mod postgres;

use adya_core::anomaly::IsolationLevel;
use adya_core::History;
use adya_testgen::generator::Workload;

/// Connection endpoints for a database cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterConfig {
    pub nodes: Vec<String>,
}

impl ClusterConfig {
    /// Parses a `host:port[,host:port...]` list.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        Self {
            nodes: spec
                .split(',')
                .map(str::trim)
                .filter(|node| !node.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

/// A database adapter.
///
/// `execute` runs the workload's sessions concurrently at the requested
/// isolation level and returns the recorded history. Outcomes must be
/// reported truthfully: a commit whose fate the driver could not determine
/// is `Unknown`, never guessed.
pub trait DbDriver: Sized {
    type Error;

    /// Connects to the cluster.
    ///
    /// # Errors
    ///
    /// Returns the driver's error when the cluster is unreachable.
    fn connect(config: &ClusterConfig) -> Result<Self, Self::Error>;

    /// Executes the workload and records what actually happened.
    ///
    /// # Errors
    ///
    /// Returns the driver's error on operational failure; observed
    /// anomalies are never an error.
    fn execute(
        &self,
        workload: &Workload,
        isolation: IsolationLevel,
    ) -> Result<History<u64, u64>, Self::Error>;
}

/// Fault injection hook, invoked by the generator on a schedule.
///
/// Implementations are plugged in at generator construction; their effects
/// are observed only through the history the driver records.
pub trait Nemesis {
    fn inject(&mut self);
    fn heal(&mut self);
}

/// A nemesis that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNemesis;

impl Nemesis for NoopNemesis {
    fn inject(&mut self) {}
    fn heal(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_config_parse() {
        let config = ClusterConfig::parse("db1:5432, db2:5432");
        assert_eq!(config.nodes, vec!["db1:5432", "db2:5432"]);
        assert_eq!(ClusterConfig::parse(""), ClusterConfig::default());
    }

    #[test]
    fn test_noop_nemesis() {
        let mut nemesis = NoopNemesis;
        nemesis.inject();
        nemesis.heal();
    }
}
