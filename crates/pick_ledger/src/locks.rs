use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per destination column. Serializes writers to the same
/// column inside this process only; other processes are not covered.
#[derive(Default)]
pub struct ColumnLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ColumnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, column: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(column.to_ascii_uppercase()).or_default().clone()
        };
        slot.lock_owned().await
    }
}
