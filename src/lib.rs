//! taskflow: configurable task-status workflow engine
//!
//! The core of a task-tracking service, in three parts:
//!
//! - [`workflow`] - a graph-shaped, role-gated status state machine with an
//!   orchestrating façade for validated, atomically persisted transitions
//! - [`schedule`] - recurrence schedules and their pure projection into
//!   concrete calendar occurrences
//! - [`timelog`] - exact time-in-status accounting over an append-only
//!   ledger of status intervals
//!
//! Transport, identity, and notification delivery are external collaborators;
//! the crate exposes typed operations and domain events, not wire formats.

pub mod config;
pub mod database;
pub mod error;
pub mod migrations;
pub mod schedule;
pub mod testing;
pub mod timelog;
pub mod workflow;

pub use database::{DatabaseConfig, DbConnection};
pub use error::{EngineError, Rejection, RejectionCode};
pub use schedule::{occurrences, Occurrence, ScheduleForm, TaskSchedule, TimeWindow, WeekdaySlot};
pub use workflow::{
    Actor, Probe, StatusChanged, WorkflowDefinition, WorkflowGraph, WorkflowOrchestrator,
};
