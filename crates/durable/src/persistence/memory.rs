//! In-memory instance store

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::watch;

use super::store::{InstanceRecord, RuntimeStatus, StoreError};
use crate::workflow::{HistoryEntry, WorkflowError, WorkflowEvent};

/// Internal instance state
struct InstanceState {
    record: InstanceRecord,
    history: Vec<HistoryEntry>,
    status_tx: watch::Sender<RuntimeStatus>,
}

impl InstanceState {
    fn set_status(&mut self, status: RuntimeStatus) {
        self.record.status = status;
        self.record.last_updated_at = Utc::now();
        self.status_tx.send_replace(status);
    }

    fn ensure_not_terminal(&self) -> Result<(), StoreError> {
        if self.record.status.is_terminal() {
            return Err(StoreError::InstanceTerminal(
                self.record.instance_id.clone(),
                self.record.status,
            ));
        }
        Ok(())
    }
}

/// In-memory store of workflow instances
///
/// Holds the status, input, output and history of every instance the engine
/// has run. Status changes are broadcast to watchers, so waiting for
/// completion never polls.
///
/// # Example
///
/// ```
/// use testapps_durable::InMemoryInstanceStore;
///
/// let store = InMemoryInstanceStore::new();
/// assert_eq!(store.instance_count(), 0);
/// ```
pub struct InMemoryInstanceStore {
    instances: RwLock<HashMap<String, InstanceState>>,
}

impl InMemoryInstanceStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of instances
    pub fn instance_count(&self) -> usize {
        self.instances.read().len()
    }

    /// Create a running instance
    pub fn create_instance(
        &self,
        instance_id: &str,
        name: &str,
        input: serde_json::Value,
        parent_instance_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut instances = self.instances.write();
        if instances.contains_key(instance_id) {
            return Err(StoreError::InstanceExists(instance_id.to_string()));
        }

        let now = Utc::now();
        let (status_tx, _) = watch::channel(RuntimeStatus::Running);
        instances.insert(
            instance_id.to_string(),
            InstanceState {
                record: InstanceRecord {
                    instance_id: instance_id.to_string(),
                    name: name.to_string(),
                    status: RuntimeStatus::Running,
                    input,
                    output: None,
                    failure: None,
                    parent_instance_id: parent_instance_id.map(str::to_string),
                    generation: 0,
                    created_at: now,
                    last_updated_at: now,
                },
                history: Vec::new(),
                status_tx,
            },
        );
        Ok(())
    }

    /// Append an event to the instance history, returning its sequence
    pub fn record_event(
        &self,
        instance_id: &str,
        event: WorkflowEvent,
    ) -> Result<HistoryEntry, StoreError> {
        let mut instances = self.instances.write();
        let state = instances
            .get_mut(instance_id)
            .ok_or_else(|| StoreError::InstanceNotFound(instance_id.to_string()))?;

        let entry = HistoryEntry {
            sequence: state.history.len() as u64,
            timestamp: Utc::now(),
            event,
        };
        state.history.push(entry.clone());
        state.record.last_updated_at = entry.timestamp;
        Ok(entry)
    }

    /// Mark the instance completed with its output
    pub fn complete(
        &self,
        instance_id: &str,
        output: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.finish(instance_id, RuntimeStatus::Completed, |record| {
            record.output = Some(output);
        })
    }

    /// Mark the instance failed
    pub fn fail(&self, instance_id: &str, error: WorkflowError) -> Result<(), StoreError> {
        self.finish(instance_id, RuntimeStatus::Failed, |record| {
            record.failure = Some(error);
        })
    }

    /// Mark the instance terminated, optionally with an output
    pub fn terminate(
        &self,
        instance_id: &str,
        output: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        self.finish(instance_id, RuntimeStatus::Terminated, |record| {
            record.output = output;
        })
    }

    /// Start the next generation of an instance with a new input
    ///
    /// Watchers observe `CONTINUED_AS_NEW` followed by `RUNNING`.
    pub fn continue_as_new(
        &self,
        instance_id: &str,
        input: serde_json::Value,
    ) -> Result<u32, StoreError> {
        let mut instances = self.instances.write();
        let state = instances
            .get_mut(instance_id)
            .ok_or_else(|| StoreError::InstanceNotFound(instance_id.to_string()))?;
        state.ensure_not_terminal()?;

        state.set_status(RuntimeStatus::ContinuedAsNew);
        state.record.input = input;
        state.record.generation += 1;
        state.set_status(RuntimeStatus::Running);
        Ok(state.record.generation)
    }

    /// Get a snapshot of an instance
    pub fn get(&self, instance_id: &str) -> Result<InstanceRecord, StoreError> {
        self.instances
            .read()
            .get(instance_id)
            .map(|state| state.record.clone())
            .ok_or_else(|| StoreError::InstanceNotFound(instance_id.to_string()))
    }

    /// Get the full history of an instance
    pub fn history(&self, instance_id: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        self.instances
            .read()
            .get(instance_id)
            .map(|state| state.history.clone())
            .ok_or_else(|| StoreError::InstanceNotFound(instance_id.to_string()))
    }

    /// Subscribe to status changes of an instance
    pub fn subscribe(
        &self,
        instance_id: &str,
    ) -> Result<watch::Receiver<RuntimeStatus>, StoreError> {
        self.instances
            .read()
            .get(instance_id)
            .map(|state| state.status_tx.subscribe())
            .ok_or_else(|| StoreError::InstanceNotFound(instance_id.to_string()))
    }

    /// Remove a terminal instance and its history
    pub fn purge(&self, instance_id: &str) -> Result<(), StoreError> {
        let mut instances = self.instances.write();
        let state = instances
            .get(instance_id)
            .ok_or_else(|| StoreError::InstanceNotFound(instance_id.to_string()))?;
        if !state.record.status.is_terminal() {
            return Err(StoreError::InstanceNotTerminal(
                instance_id.to_string(),
                state.record.status,
            ));
        }
        instances.remove(instance_id);
        Ok(())
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        self.instances.write().clear();
    }

    fn finish(
        &self,
        instance_id: &str,
        status: RuntimeStatus,
        update: impl FnOnce(&mut InstanceRecord),
    ) -> Result<(), StoreError> {
        let mut instances = self.instances.write();
        let state = instances
            .get_mut(instance_id)
            .ok_or_else(|| StoreError::InstanceNotFound(instance_id.to_string()))?;
        state.ensure_not_terminal()?;

        update(&mut state.record);
        state.set_status(status);
        Ok(())
    }
}

impl Default for InMemoryInstanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_and_get() {
        let store = InMemoryInstanceStore::new();
        store
            .create_instance("wf-1", "TestWorkflow", json!("input"), None)
            .unwrap();

        let record = store.get("wf-1").unwrap();
        assert_eq!(record.name, "TestWorkflow");
        assert_eq!(record.status, RuntimeStatus::Running);
        assert_eq!(record.input, json!("input"));
        assert_eq!(store.instance_count(), 1);
    }

    #[test]
    fn test_duplicate_instance_rejected() {
        let store = InMemoryInstanceStore::new();
        store.create_instance("wf-1", "A", json!(null), None).unwrap();

        let result = store.create_instance("wf-1", "A", json!(null), None);
        assert_eq!(result, Err(StoreError::InstanceExists("wf-1".to_string())));
    }

    #[test]
    fn test_complete_sets_output() {
        let store = InMemoryInstanceStore::new();
        store.create_instance("wf-1", "A", json!(null), None).unwrap();
        store.complete("wf-1", json!(42)).unwrap();

        let record = store.get("wf-1").unwrap();
        assert_eq!(record.status, RuntimeStatus::Completed);
        assert_eq!(record.output, Some(json!(42)));
    }

    #[test]
    fn test_terminal_instance_cannot_change() {
        let store = InMemoryInstanceStore::new();
        store.create_instance("wf-1", "A", json!(null), None).unwrap();
        store.fail("wf-1", WorkflowError::new("boom")).unwrap();

        let result = store.complete("wf-1", json!(1));
        assert_eq!(
            result,
            Err(StoreError::InstanceTerminal(
                "wf-1".to_string(),
                RuntimeStatus::Failed
            ))
        );
    }

    #[test]
    fn test_history_sequence() {
        let store = InMemoryInstanceStore::new();
        store.create_instance("wf-1", "A", json!(null), None).unwrap();

        let first = store
            .record_event(
                "wf-1",
                WorkflowEvent::WorkflowStarted {
                    input: json!(null),
                    generation: 0,
                },
            )
            .unwrap();
        let second = store
            .record_event("wf-1", WorkflowEvent::WorkflowCompleted { result: json!(1) })
            .unwrap();

        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(store.history("wf-1").unwrap().len(), 2);
    }

    #[test]
    fn test_continue_as_new_bumps_generation() {
        let store = InMemoryInstanceStore::new();
        store.create_instance("wf-1", "A", json!(1), None).unwrap();

        let generation = store.continue_as_new("wf-1", json!(2)).unwrap();

        let record = store.get("wf-1").unwrap();
        assert_eq!(generation, 1);
        assert_eq!(record.input, json!(2));
        assert_eq!(record.status, RuntimeStatus::Running);
    }

    #[tokio::test]
    async fn test_subscribe_sees_terminal_status() {
        let store = InMemoryInstanceStore::new();
        store.create_instance("wf-1", "A", json!(null), None).unwrap();
        let mut rx = store.subscribe("wf-1").unwrap();

        store.terminate("wf-1", None).unwrap();

        let status = *rx.wait_for(|s| s.is_terminal()).await.unwrap();
        assert_eq!(status, RuntimeStatus::Terminated);
    }

    #[test]
    fn test_purge_only_terminal() {
        let store = InMemoryInstanceStore::new();
        store.create_instance("wf-1", "A", json!(null), None).unwrap();

        assert_eq!(
            store.purge("wf-1"),
            Err(StoreError::InstanceNotTerminal(
                "wf-1".to_string(),
                RuntimeStatus::Running
            ))
        );

        store.complete("wf-1", json!(null)).unwrap();
        store.purge("wf-1").unwrap();
        assert!(matches!(
            store.get("wf-1"),
            Err(StoreError::InstanceNotFound(_))
        ));
    }
}
