//! adya CLI -- generate workloads, record histories, and check them for
//! isolation anomalies.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "adya",
    about = "Black-box isolation checking for transactional databases"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a workload against a database and record the history
    Generate(GenerateArgs),
    /// Check a recorded history for isolation anomalies
    Check(CheckArgs),
    /// Generate, record, and check in one invocation
    TestIsolation(TestIsolationArgs),
}

#[derive(Debug, Parser)]
pub struct GenerateArgs {
    /// Number of transactions
    #[arg(short = 't', long)]
    pub tx_count: u64,
    /// Number of objects
    #[arg(short = 'n', long)]
    pub object_count: u64,
    /// Cluster nodes as host:port[,host:port...]
    #[arg(long)]
    pub nodes: String,
    /// Database driver
    #[arg(long, value_enum, default_value_t = DriverKind::Mem)]
    pub driver: DriverKind,
    /// Number of concurrent sessions
    #[arg(long, default_value_t = 4)]
    pub sessions: u64,
    /// Operations per transaction
    #[arg(long, default_value_t = 4)]
    pub ops_per_tx: u64,
    /// Isolation level to request from the database (case-insensitive)
    pub isolation: String,
    /// Output file for the recorded history (JSON)
    pub output: PathBuf,
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// Exit non-zero when anomalies are found
    #[arg(short = 't', long)]
    pub treat_anomalies_as_failure: bool,
    /// Isolation level to check against (case-insensitive)
    #[arg(short = 'i', long, default_value = "serializable")]
    pub isolation: String,
    /// Stop after this many anomalies
    #[arg(short = 'l', long)]
    pub max_anomalies: Option<usize>,
    /// Write the serialization graph as DOT to this file
    #[arg(short = 'g', long)]
    pub graph_out: Option<PathBuf>,
    /// Recorded history to check (JSON)
    pub history_in: PathBuf,
}

#[derive(Debug, Parser)]
pub struct TestIsolationArgs {
    /// Number of transactions
    #[arg(short = 't', long)]
    pub tx_count: u64,
    /// Number of objects
    #[arg(short = 'n', long)]
    pub object_count: u64,
    /// Cluster nodes as host:port[,host:port...]
    #[arg(long)]
    pub nodes: String,
    /// Database driver
    #[arg(long, value_enum, default_value_t = DriverKind::Mem)]
    pub driver: DriverKind,
    /// Number of concurrent sessions
    #[arg(long, default_value_t = 4)]
    pub sessions: u64,
    /// Operations per transaction
    #[arg(long, default_value_t = 4)]
    pub ops_per_tx: u64,
    /// Stop after this many anomalies
    #[arg(short = 'l', long)]
    pub max_anomalies: Option<usize>,
    /// Isolation level to request and check against (case-insensitive)
    pub isolation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DriverKind {
    /// In-memory reference engine (always serializable)
    Mem,
    /// PostgreSQL
    Postgres,
    /// CockroachDB
    Cockroachdb,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_declaration_is_consistent() {
        App::command().debug_assert();
    }

    #[test]
    fn test_check_args_parse() {
        let app = App::parse_from([
            "adya",
            "check",
            "-t",
            "-i",
            "snapshot-isolation",
            "-l",
            "5",
            "-g",
            "graph.dot",
            "history.json",
        ]);
        let Command::Check(args) = app.command else {
            panic!("expected check");
        };
        assert!(args.treat_anomalies_as_failure);
        assert_eq!(args.isolation, "snapshot-isolation");
        assert_eq!(args.max_anomalies, Some(5));
        assert_eq!(args.graph_out, Some(PathBuf::from("graph.dot")));
        assert_eq!(args.history_in, PathBuf::from("history.json"));
    }

    #[test]
    fn test_generate_args_parse() {
        let app = App::parse_from([
            "adya",
            "generate",
            "-t",
            "100",
            "-n",
            "10",
            "--nodes",
            "db1:5432,db2:5432",
            "SERIALIZABLE",
            "out.json",
        ]);
        let Command::Generate(args) = app.command else {
            panic!("expected generate");
        };
        assert_eq!(args.tx_count, 100);
        assert_eq!(args.object_count, 10);
        assert_eq!(args.nodes, "db1:5432,db2:5432");
        assert_eq!(args.driver, DriverKind::Mem);
        assert_eq!(args.isolation, "SERIALIZABLE");
    }
}
