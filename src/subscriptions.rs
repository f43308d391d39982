//! Push subscription records and their on-disk store.
//!
//! Records are keyed by delivery endpoint: re-registering an endpoint
//! replaces the existing record instead of duplicating it. The collection is
//! one JSON document; the read-modify-write cycle holds the store mutex so
//! concurrent mutations cannot clobber each other.

use crate::storage::{self, StoreError};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const SUBSCRIPTIONS_FILE: &str = "push-subscriptions.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Admin,
    Customer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
    pub audience: Audience,
    #[serde(with = "time::serde::rfc3339")]
    pub subscribed_at: OffsetDateTime,
}

pub struct SubscriptionStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl SubscriptionStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SUBSCRIPTIONS_FILE),
            guard: Mutex::new(()),
        }
    }

    /// Inserts the record, replacing any existing record for the same
    /// endpoint.
    pub fn upsert(&self, record: SubscriptionRecord) -> Result<(), StoreError> {
        let _guard = self.guard.lock().expect("subscription store lock");
        let mut records: Vec<SubscriptionRecord> = storage::load_or_default(&self.path)?;
        match records
            .iter_mut()
            .find(|existing| existing.endpoint == record.endpoint)
        {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        storage::persist(&self.path, &records)
    }

    /// Removes the record for the endpoint. Returns whether a record was
    /// present; removing an unknown endpoint is not an error.
    pub fn remove(&self, endpoint: &str) -> Result<bool, StoreError> {
        let _guard = self.guard.lock().expect("subscription store lock");
        let mut records: Vec<SubscriptionRecord> = storage::load_or_default(&self.path)?;
        let before = records.len();
        records.retain(|record| record.endpoint != endpoint);
        if records.len() == before {
            return Ok(false);
        }
        storage::persist(&self.path, &records)?;
        Ok(true)
    }

    /// Removes every listed endpoint in one write. Used by the dispatcher to
    /// reap endpoints the push service reported as gone.
    pub fn remove_many(&self, endpoints: &[String]) -> Result<usize, StoreError> {
        let _guard = self.guard.lock().expect("subscription store lock");
        let mut records: Vec<SubscriptionRecord> = storage::load_or_default(&self.path)?;
        let before = records.len();
        records.retain(|record| !endpoints.contains(&record.endpoint));
        let removed = before - records.len();
        if removed > 0 {
            storage::persist(&self.path, &records)?;
        }
        Ok(removed)
    }

    pub fn list_all(&self) -> Result<Vec<SubscriptionRecord>, StoreError> {
        let _guard = self.guard.lock().expect("subscription store lock");
        storage::load_or_default(&self.path)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use time::format_description::well_known::Rfc3339;

    fn record(endpoint: &str, audience: Audience) -> SubscriptionRecord {
        SubscriptionRecord {
            endpoint: endpoint.to_string(),
            keys: SubscriptionKeys {
                p256dh: "p256".to_string(),
                auth: "auth".to_string(),
            },
            audience,
            subscribed_at: OffsetDateTime::parse("2025-06-01T08:00:00Z", &Rfc3339)
                .expect("parse timestamp"),
        }
    }

    #[test]
    fn list_all__should_return_empty_when_no_file_exists() {
        // Given
        let root = create_temp_root("subs-empty");
        let store = SubscriptionStore::open(&root);

        // When
        let records = store.list_all().expect("list");

        // Then
        assert!(records.is_empty());

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn upsert__should_keep_one_record_per_endpoint() {
        // Given
        let root = create_temp_root("subs-upsert");
        let store = SubscriptionStore::open(&root);
        store
            .upsert(record("https://push.example/a", Audience::Customer))
            .expect("first upsert");

        // When
        let mut updated = record("https://push.example/a", Audience::Admin);
        updated.keys.auth = "rotated".to_string();
        store.upsert(updated).expect("second upsert");

        // Then
        let records = store.list_all().expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].audience, Audience::Admin);
        assert_eq!(records[0].keys.auth, "rotated");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn remove__should_delete_only_the_named_endpoint() {
        // Given
        let root = create_temp_root("subs-remove");
        let store = SubscriptionStore::open(&root);
        store
            .upsert(record("https://push.example/a", Audience::Customer))
            .expect("upsert a");
        store
            .upsert(record("https://push.example/b", Audience::Admin))
            .expect("upsert b");

        // When
        let removed = store.remove("https://push.example/a").expect("remove");

        // Then
        assert!(removed);
        let records = store.list_all().expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].endpoint, "https://push.example/b");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn remove__should_report_unknown_endpoint_without_error() {
        // Given
        let root = create_temp_root("subs-remove-unknown");
        let store = SubscriptionStore::open(&root);

        // When
        let removed = store.remove("https://push.example/ghost").expect("remove");

        // Then
        assert!(!removed);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn remove_many__should_reap_listed_endpoints() {
        // Given
        let root = create_temp_root("subs-remove-many");
        let store = SubscriptionStore::open(&root);
        for endpoint in ["https://push.example/a", "https://push.example/b"] {
            store
                .upsert(record(endpoint, Audience::Customer))
                .expect("upsert");
        }

        // When
        let removed = store
            .remove_many(&[
                "https://push.example/a".to_string(),
                "https://push.example/missing".to_string(),
            ])
            .expect("remove many");

        // Then
        assert_eq!(removed, 1);
        let records = store.list_all().expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].endpoint, "https://push.example/b");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    fn create_temp_root(test_name: &str) -> PathBuf {
        let mut root = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        root.push(format!("bakeshop-{}-{}", test_name, nanos));
        std::fs::create_dir_all(&root).expect("create temp dir");
        root
    }
}
