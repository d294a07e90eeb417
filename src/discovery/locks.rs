// Per-server mutual exclusion for discovery passes and ingests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// One async mutex per server id, created on first use.
#[derive(Clone, Default)]
pub struct ServerLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ServerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder has `server_id`; released when the guard drops.
    pub async fn lock(&self, server_id: i64) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            map.entry(server_id).or_default().clone()
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_server_is_exclusive() {
        let locks = ServerLocks::new();
        let guard = locks.lock(1).await;
        let pending = tokio::time::timeout(Duration::from_millis(50), locks.lock(1)).await;
        assert!(pending.is_err(), "second lock on the same id should wait");
        drop(guard);
        let again = tokio::time::timeout(Duration::from_millis(50), locks.lock(1)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn different_servers_do_not_block() {
        let locks = ServerLocks::new();
        let _a = locks.lock(1).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock(2)).await;
        assert!(b.is_ok());
    }
}
