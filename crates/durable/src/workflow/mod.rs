//! Workflow abstractions and types
//!
//! This module contains the core workflow primitives:
//! - [`Workflow`] trait for defining workflow state machines
//! - [`WorkflowAction`] enum for workflow commands
//! - [`WorkflowContext`] passed to every callback
//! - [`WorkflowEvent`] enum for instance history

mod action;
mod context;
mod definition;
mod event;

pub use action::{ActivityOptions, WorkflowAction};
pub use context::WorkflowContext;
pub use definition::{Workflow, WorkflowError};
pub use event::{HistoryEntry, WorkflowEvent};
