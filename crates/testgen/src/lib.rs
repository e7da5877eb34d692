//! Workload planning for isolation testing.
//!
//! A [`generator::Workload`] is the client-side plan: sessions of
//! transactions whose reads have no results yet. A driver executes the plan
//! against a database and records the observed
//! [`History`](adya_core::History); the [`generator::Run`] wrapper is the
//! serialized on-disk artifact tying parameters, timing, and the recorded
//! history together.

pub mod generator;
