// src/transaction/mod.rs

// 写入闸门：把 load → 修改 → save 串行化，避免并发写入互相覆盖

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::storage::RecordStore;
use crate::structs::Collection;

#[derive(Debug, Clone, Default)]
pub struct WriteGate {
    lock: Arc<Mutex<()>>,
}

impl WriteGate {
    pub fn new() -> Self {
        WriteGate::default()
    }

    /// Runs one read-modify-write cycle while holding the gate.
    ///
    /// The mutation only sees the freshly loaded collection; the result is
    /// saved before the guard drops. Any error releases the gate and leaves
    /// the file untouched.
    pub async fn run<F, T>(&self, store: &RecordStore, mutate: F) -> Result<(Collection, T)>
    where
        F: FnOnce(&mut Collection) -> T,
    {
        let _guard = self.lock.lock().await;
        let mut collection = store.load()?;
        let outcome = mutate(&mut collection);
        store.save(&collection)?;
        Ok((collection, outcome))
    }

    /// True while some cycle holds the gate.
    #[cfg(test)]
    fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("data.json"));
        store.init_if_missing().unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_run_saves_mutation() {
        let (_dir, store) = setup();
        let gate = WriteGate::new();

        let (collection, len) = gate
            .run(&store, |c| {
                c.push(json!({"id": 1}).as_object().cloned().unwrap());
                c.len()
            })
            .await
            .unwrap();

        assert_eq!(len, 1);
        assert_eq!(collection, store.load().unwrap());
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn test_run_releases_gate_on_error() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("missing.json"));
        let gate = WriteGate::new();

        let result = gate.run(&store, |c| c.clear()).await;
        assert!(result.is_err());
        assert!(!gate.is_busy());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_clones_share_one_lock() {
        let gate = WriteGate::new();
        let other = gate.clone();
        let _held = gate.lock.lock().await;
        assert!(other.is_busy());
    }
}
