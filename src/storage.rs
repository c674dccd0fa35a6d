//!
//! clinic storage module
//! ---------------------
//! In-process patient record store keyed by numeric id. This is the persistence
//! collaborator the resource handlers talk to; the session gate never touches it.
//!
//! The public API centers around the `Store` type, which is wrapped in a
//! thread-safe `SharedStore` (`Arc<Mutex<Store>>`) and shared through `AppState`.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub age: i32,
    pub gender: String,
    #[serde(default)]
    pub notes: String,
}

/// Fields a receptionist supplies on create and full update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PatientInput {
    pub name: String,
    pub age: i32,
    pub gender: String,
    #[serde(default)]
    pub notes: String,
}

impl PatientInput {
    fn validate(&self) -> Result<(), StoreError> {
        if self.name.is_empty() { return Err(StoreError::Validation("name must not be empty".into())); }
        if self.age <= 0 { return Err(StoreError::Validation("age must be positive".into())); }
        if self.gender.is_empty() { return Err(StoreError::Validation("gender must not be empty".into())); }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid patient: {0}")]
    Validation(String),
    #[error("patient {0} not found")]
    NotFound(i64),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Patient table. Ids are assigned from 1 and never reused.
#[derive(Debug)]
pub struct Store {
    rows: BTreeMap<i64, Patient>,
    next_id: i64,
}

impl Store {
    pub fn new() -> Self { Self { rows: BTreeMap::new(), next_id: 1 } }

    pub fn create(&mut self, input: PatientInput) -> Result<Patient, StoreError> {
        input.validate()?;
        let id = self.next_id;
        self.next_id += 1;
        let p = Patient { id, name: input.name, age: input.age, gender: input.gender, notes: input.notes };
        self.rows.insert(id, p.clone());
        debug!(target: "clinic::storage", id, "patient.create");
        Ok(p)
    }

    /// All patients in id order.
    pub fn list(&self) -> Vec<Patient> { self.rows.values().cloned().collect() }

    pub fn get(&self, id: i64) -> Result<Patient, StoreError> {
        self.rows.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    pub fn update(&mut self, id: i64, input: PatientInput) -> Result<Patient, StoreError> {
        input.validate()?;
        let row = self.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        row.name = input.name;
        row.age = input.age;
        row.gender = input.gender;
        row.notes = input.notes;
        debug!(target: "clinic::storage", id, "patient.update");
        Ok(row.clone())
    }

    pub fn update_notes(&mut self, id: i64, notes: &str) -> Result<Patient, StoreError> {
        let row = self.rows.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        row.notes = notes.to_string();
        debug!(target: "clinic::storage", id, "patient.update_notes");
        Ok(row.clone())
    }

    pub fn delete(&mut self, id: i64) -> Result<(), StoreError> {
        self.rows.remove(&id).map(|_| ()).ok_or(StoreError::NotFound(id))
    }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

impl Default for Store {
    fn default() -> Self { Self::new() }
}

#[derive(Clone, Default)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new() -> Self { Self(Arc::new(Mutex::new(Store::new()))) }
}
