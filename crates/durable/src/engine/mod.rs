//! Workflow execution engine
//!
//! The engine module provides the [`WorkflowEngine`], which drives registered
//! workflow state machines in-process and implements
//! [`WorkflowClient`](crate::WorkflowClient).

mod executor;
mod registry;

pub use executor::{EngineConfig, WorkflowEngine};
pub use registry::{AnyActivity, AnyWorkflow, RegistryError, WorkflowFactory, WorkflowRegistry};
