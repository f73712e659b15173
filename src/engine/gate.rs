//! Per-thread mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per thread id, created on demand.
///
/// Idle entries (no holder, no waiter) are pruned on the next acquire.
#[derive(Debug, Default)]
pub(crate) struct ThreadGates {
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ThreadGates {
    pub(crate) async fn acquire(&self, thread_id: &str) -> OwnedMutexGuard<()> {
        let gate = {
            let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
            gates.retain(|_, gate| Arc::strong_count(gate) > 1);
            gates
                .entry(thread_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        gate.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.gates.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
