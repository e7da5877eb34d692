//! Isolation-anomaly checking for transactional histories.
//!
//! `adya_core` analyzes a recorded database history and reports the concrete
//! isolation anomalies it contains, following Adya's framework of direct
//! serialization graphs. It knows five isolation levels, ordered from weakest
//! to strongest:
//!
//! 1. **Read Uncommitted** -- forbids dirty writes (G0).
//! 2. **Read Committed** -- additionally forbids aborted reads (G1a),
//!    intermediate reads (G1b), and dependency cycles (G1c).
//! 3. **Repeatable Read** -- additionally forbids item antidependency cycles
//!    (G2-item).
//! 4. **Snapshot Isolation** -- forbids G0, G1a, G1b, G1c, and
//!    single-antidependency cycles (G-single).
//! 5. **Serializable** -- forbids all of the above plus predicate
//!    antidependency cycles (G2).
//!
//! Analysis proceeds in stages: every read is resolved to the write that
//! produced its value; aborted and intermediate reads are flagged directly;
//! the remaining resolved reads, together with inferred per-object version
//! orders, yield the direct serialization graph (DSG) over committed
//! transactions; simple cycles of the DSG are enumerated and classified by
//! the kinds of edges they contain; finally the requested level's forbidden
//! set filters the findings.
//!
//! # Entry point
//!
//! The main entry point is [`check()`], which takes a [`History`] and an
//! [`IsolationLevel`] and returns a [`Report`] of the anomalies the level
//! forbids.
//!
//! ```rust,ignore
//! use adya_core::{check, IsolationLevel};
//!
//! let report = check(&history, IsolationLevel::Serializable, None)?;
//! for anomaly in &report.anomalies {
//!     println!("{anomaly}");
//! }
//! ```
//!
//! Finding anomalies is the success path; [`check()`] fails only on
//! structurally malformed input. The whole pipeline is deterministic: the
//! same history and level always produce the same report, byte for byte.
//!
//! # Crate features
//!
//! - **`serde`** -- enables `Serialize`/`Deserialize` derives on the history
//!   types so recorded runs round-trip losslessly through disk.
//!
//! This crate is `no_std` compatible (requires `alloc`).

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod anomaly;
pub mod graph;
pub mod history;
pub mod render;

pub use anomaly::{check, IsolationLevel};
pub use history::History;
