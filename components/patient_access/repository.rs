use std::{collections::HashMap, sync::Arc};

use parking_lot::{Mutex, RwLock};

use crate::record::PatientRecord;

/// A record behind its own lock; holding the guard serializes every change to it.
pub type SharedRecord = Arc<Mutex<PatientRecord>>;

/// Storage of patient records.
pub trait PatientRepository: Send + Sync {
    /// Returns the lockable record, if it exists.
    fn get(&self, id: &str) -> Option<SharedRecord>;

    /// Inserts or replaces a record.
    fn insert(&self, record: PatientRecord);

    /// Identifiers of every stored record, sorted.
    fn ids(&self) -> Vec<String>;
}

/// Thread-safe in-memory record store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPatientRepository {
    records: Arc<RwLock<HashMap<String, SharedRecord>>>,
}

impl InMemoryPatientRepository {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy of a record's current state.
    #[must_use]
    pub fn snapshot(&self, id: &str) -> Option<PatientRecord> {
        self.get(id).map(|record| record.lock().clone())
    }
}

impl PatientRepository for InMemoryPatientRepository {
    fn get(&self, id: &str) -> Option<SharedRecord> {
        self.records.read().get(id).cloned()
    }

    fn insert(&self, record: PatientRecord) {
        let mut records = self.records.write();
        match records.get(&record.id) {
            Some(existing) => *existing.lock() = record,
            None => {
                records.insert(record.id.clone(), Arc::new(Mutex::new(record)));
            }
        }
    }

    fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
