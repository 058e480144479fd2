//! Delegation authorization and audit core for governance platforms.
//!
//! This crate decides whether a delegated actor may perform a bounded
//! action (spend, validate, approve) on behalf of a principal, and keeps
//! a tamper-evident, hash-chained audit ledger of every state change for
//! legal defensibility.
//!
//! # Architecture
//!
//! - [`policy`] and [`risk`] are pure functions over the data model:
//!   callers run both against the same inputs to simulate an action
//!   before committing it.
//! - [`ledger`] seals one immutable, hash-chained [`ledger::AuditEvent`]
//!   per state transition and can replay a chain to detect tampering.
//! - [`lifecycle`] holds the delegation management actions and the
//!   blocked-dossier escalation/resolution state machines.
//! - [`store`] and [`notify`] are the ports the host provides;
//!   [`service`] ties everything into the operation surface with
//!   optimistic-concurrency commits.
//!
//! Transport, UI, report generation, and notification delivery mechanics
//! live outside this crate.

pub mod config;
pub mod crypto;
pub mod ledger;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod policy;
pub mod risk;
pub mod service;
pub mod store;
