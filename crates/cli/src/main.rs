use std::path::Path;
use std::{fs, process};

use chrono::Local;
use clap::Parser;

use adya_cli::{App, CheckArgs, Command, DriverKind, GenerateArgs, TestIsolationArgs};
use adya_core::anomaly::Anomaly;
use adya_core::history::types::TransactionId;
use adya_core::render::render_dot;
use adya_core::{check, History, IsolationLevel};
use adya_drivers::cockroachdb::CockroachDbDriver;
use adya_drivers::mem::MemDriver;
use adya_drivers::postgres::PostgresDriver;
use adya_drivers::{ClusterConfig, DbDriver};
use adya_testgen::generator::{generate_workload, Run, Workload, WorkloadParams};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let app = App::parse();
    match &app.command {
        Command::Generate(args) => generate(args),
        Command::Check(args) => check_history(args),
        Command::TestIsolation(args) => test_isolation(args),
    }
}

fn generate(args: &GenerateArgs) {
    let level = parse_level(&args.isolation);
    let workload = plan(args.tx_count, args.object_count, args.sessions, args.ops_per_tx);

    let start = Local::now();
    let history = execute(args.driver, &args.nodes, &workload, level);
    let end = Local::now();

    let run = Run::new(
        workload.params.clone(),
        format!("driver={:?} isolation={level}", args.driver),
        start,
        end,
        history,
    );

    let file = fs::File::create(&args.output).unwrap_or_else(|e| {
        eprintln!("Failed to create {}: {e}", args.output.display());
        process::exit(1);
    });
    serde_json::to_writer_pretty(file, &run).unwrap_or_else(|e| {
        eprintln!("Failed to write {}: {e}", args.output.display());
        process::exit(1);
    });

    println!(
        "Recorded {} transactions to {}",
        run.get_history().transactions.len(),
        args.output.display()
    );
}

fn check_history(args: &CheckArgs) {
    let level = parse_level(&args.isolation);

    let file = fs::File::open(&args.history_in).unwrap_or_else(|e| {
        eprintln!("Failed to open {}: {e}", args.history_in.display());
        process::exit(1);
    });
    let run: Run = serde_json::from_reader(file).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {e}", args.history_in.display());
        process::exit(1);
    });

    let found = summarize(
        run.get_history(),
        level,
        args.max_anomalies,
        args.graph_out.as_deref(),
    );

    if args.treat_anomalies_as_failure && found > 0 {
        process::exit(1);
    }
}

fn test_isolation(args: &TestIsolationArgs) {
    let level = parse_level(&args.isolation);
    let workload = plan(args.tx_count, args.object_count, args.sessions, args.ops_per_tx);
    let history = execute(args.driver, &args.nodes, &workload, level);
    summarize(&history, level, args.max_anomalies, None);
}

fn parse_level(input: &str) -> IsolationLevel {
    input.parse().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(2);
    })
}

fn plan(tx_count: u64, object_count: u64, sessions: u64, ops_per_tx: u64) -> Workload {
    let params = WorkloadParams::builder()
        .id(0)
        .n_transaction(tx_count)
        .n_object(object_count)
        .n_session(sessions)
        .n_op(ops_per_tx)
        .build();
    generate_workload(&params)
}

fn execute(
    driver: DriverKind,
    nodes: &str,
    workload: &Workload,
    level: IsolationLevel,
) -> History<u64, u64> {
    let config = ClusterConfig::parse(nodes);
    let result = match driver {
        DriverKind::Mem => MemDriver::connect(&config)
            .and_then(|d| d.execute(workload, level))
            .map_err(|e| format!("{e:?}")),
        DriverKind::Postgres => PostgresDriver::connect(&config)
            .and_then(|d| d.execute(workload, level))
            .map_err(|e| format!("{e:?}")),
        DriverKind::Cockroachdb => CockroachDbDriver::connect(&config)
            .and_then(|d| d.execute(workload, level))
            .map_err(|e| format!("{e:?}")),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Driver failure: {e}");
        process::exit(1);
    })
}

/// Prints one summary line per anomaly plus warnings, optionally writes the
/// DOT graph, and returns the number of anomalies found.
fn summarize(
    history: &History<u64, u64>,
    level: IsolationLevel,
    max_anomalies: Option<usize>,
    graph_out: Option<&Path>,
) -> usize {
    let report = check(history, level, max_anomalies).unwrap_or_else(|e| {
        eprintln!("Malformed history: {e:?}");
        process::exit(1);
    });

    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
    if !report.is_complete() {
        eprintln!("warning: analysis incomplete, affected objects were excluded");
    }

    for anomaly in &report.anomalies {
        println!("{anomaly}");
    }
    if report.anomalies.is_empty() {
        println!("No anomalies forbidden at {level} found.");
    } else {
        println!("{} anomalies forbidden at {level}.", report.anomalies.len());
    }

    if let Some(path) = graph_out {
        let mut highlight: Vec<TransactionId> = report
            .anomalies
            .iter()
            .filter_map(|anomaly| match anomaly {
                Anomaly::Cycle { transactions, .. } => Some(transactions.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        highlight.sort_unstable();
        highlight.dedup();
        let dot = render_dot(
            history,
            &report.dsg,
            (!highlight.is_empty()).then_some(highlight.as_slice()),
        );
        fs::write(path, dot).unwrap_or_else(|e| {
            eprintln!("Failed to write {}: {e}", path.display());
            process::exit(1);
        });
    }

    report.anomalies.len()
}
