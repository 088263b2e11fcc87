//! In-memory registry of live assessment runs.
//!
//! Runs are working state, not records: the durable artifact is the saved
//! result, so losing this map on restart only costs in-flight progress.
//! Each run sits behind its own mutex so slow upstream calls on one run
//! never block another.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::assessment::flow::FlowState;

#[derive(Clone, Default)]
pub struct RunRegistry {
    runs: Arc<RwLock<HashMap<Uuid, Arc<Mutex<FlowState>>>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, flow: FlowState) -> Uuid {
        let run_id = flow.run_id();
        self.runs
            .write()
            .await
            .insert(run_id, Arc::new(Mutex::new(flow)));
        run_id
    }

    pub async fn get(&self, run_id: Uuid) -> Option<Arc<Mutex<FlowState>>> {
        self.runs.read().await.get(&run_id).cloned()
    }

    /// Drops a run. An in-flight handler holding the run's mutex finishes
    /// its current call on its own clone of the `Arc`; afterwards the run is
    /// unreachable.
    pub async fn remove(&self, run_id: Uuid) -> bool {
        self.runs.write().await.remove(&run_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::flow::FlowConfig;

    #[tokio::test]
    async fn insert_then_get_returns_the_same_run() {
        let registry = RunRegistry::new();
        let user_id = Uuid::new_v4();
        let run_id = registry.insert(FlowState::new(user_id, FlowConfig::default())).await;

        let run = registry.get(run_id).await.unwrap();
        assert_eq!(run.lock().await.user_id(), user_id);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn remove_forgets_the_run() {
        let registry = RunRegistry::new();
        let run_id = registry
            .insert(FlowState::new(Uuid::new_v4(), FlowConfig::default()))
            .await;

        assert!(registry.remove(run_id).await);
        assert!(registry.get(run_id).await.is_none());
        assert!(!registry.remove(run_id).await);
    }

    #[tokio::test]
    async fn unknown_ids_return_nothing() {
        let registry = RunRegistry::new();
        assert!(registry.get(Uuid::new_v4()).await.is_none());
    }
}
