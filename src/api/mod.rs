// src/api/mod.rs

// API 模块：四个集合操作，HTTP 服务与离线 CLI 共用
use crate::error::Result;
use crate::storage::RecordStore;
use crate::structs::{Collection, Record, RecordId};
use crate::transaction::WriteGate;

#[derive(Debug, Clone)]
pub struct RecordService {
    store: RecordStore,
    gate: WriteGate,
}

impl RecordService {
    pub fn new(store: RecordStore) -> Self {
        RecordService {
            store,
            gate: WriteGate::new(),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// 读操作不经过写入闸门；rename 保证读到的总是完整文档
    pub fn list(&self) -> Result<Collection> {
        self.store.load()
    }

    pub async fn create(&self, record: Record) -> Result<Collection> {
        let (collection, _) = self
            .gate
            .run(&self.store, |c| append_record(c, record))
            .await?;
        Ok(collection)
    }

    /// 没有匹配的记录不算错误，集合原样写回
    pub async fn update(&self, id: RecordId, patch: Record) -> Result<Collection> {
        let (collection, touched) = self
            .gate
            .run(&self.store, |c| merge_record(c, id, &patch))
            .await?;
        if touched == 0 {
            tracing::debug!(%id, "update matched no record");
        }
        Ok(collection)
    }

    pub async fn delete(&self, id: RecordId) -> Result<Collection> {
        let (collection, removed) = self
            .gate
            .run(&self.store, |c| remove_record(c, id))
            .await?;
        if removed == 0 {
            tracing::debug!(%id, "delete matched no record");
        }
        Ok(collection)
    }
}

/// Appends `record` to the end; returns the new length.
pub fn append_record(collection: &mut Collection, record: Record) -> usize {
    collection.push(record);
    collection.len()
}

/// Shallow-merges `patch` over every record whose `id` matches.
/// Returns how many records were touched.
pub fn merge_record(collection: &mut Collection, id: RecordId, patch: &Record) -> usize {
    let mut touched = 0;
    for record in collection.iter_mut().filter(|r| id.matches(r)) {
        for (key, value) in patch {
            record.insert(key.clone(), value.clone());
        }
        touched += 1;
    }
    touched
}

/// Removes every record whose `id` matches; returns how many were removed.
pub fn remove_record(collection: &mut Collection, id: RecordId) -> usize {
    let before = collection.len();
    collection.retain(|r| !id.matches(r));
    before - collection.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn sample() -> Collection {
        vec![
            record(json!({"id": 1, "name": "Ada", "contact": "ada@example.com"})),
            record(json!({"id": 2, "name": "Grace"})),
            record(json!({"id": 3, "name": "Linus"})),
        ]
    }

    #[test]
    fn test_append_record_keeps_order() {
        let mut c = sample();
        let len = append_record(&mut c, record(json!({"id": 4, "name": "Ken"})));
        assert_eq!(len, 4);
        assert_eq!(c[3], record(json!({"id": 4, "name": "Ken"})));
        assert_eq!(&c[..3], &sample()[..]);
    }

    #[test]
    fn test_merge_record_only_touches_target() {
        let mut c = sample();
        let touched = merge_record(
            &mut c,
            RecordId::parse("1"),
            &record(json!({"name": "Ada L.", "age": 36})),
        );

        assert_eq!(touched, 1);
        assert_eq!(
            c[0],
            record(json!({"id": 1, "name": "Ada L.", "contact": "ada@example.com", "age": 36}))
        );
        assert_eq!(&c[1..], &sample()[1..]);
    }

    #[test]
    fn test_merge_record_can_overwrite_id() {
        let mut c = sample();
        merge_record(&mut c, RecordId::parse("2"), &record(json!({"id": 20})));
        assert_eq!(c[1], record(json!({"id": 20, "name": "Grace"})));
    }

    #[test]
    fn test_merge_record_no_match_is_noop() {
        let mut c = sample();
        assert_eq!(merge_record(&mut c, RecordId::parse("99"), &record(json!({"x": 1}))), 0);
        assert_eq!(merge_record(&mut c, RecordId::parse("abc"), &record(json!({"x": 1}))), 0);
        assert_eq!(c, sample());
    }

    #[test]
    fn test_remove_record() {
        let mut c = sample();
        assert_eq!(remove_record(&mut c, RecordId::parse("2")), 1);
        assert_eq!(c.len(), 2);
        assert!(c.iter().all(|r| r["id"] != json!(2)));
    }

    #[test]
    fn test_remove_record_duplicates_and_no_match() {
        let mut c = sample();
        c.push(record(json!({"id": 2, "name": "Grace again"})));
        assert_eq!(remove_record(&mut c, RecordId::parse("2")), 2);
        assert_eq!(remove_record(&mut c, RecordId::parse("2")), 0);
        assert_eq!(c.len(), 2);
    }
}
