//! Current-serving patient slot.
//!
//! One patient at a time, normalized on the way in and persisted as a
//! JSON snapshot under `current_serving_patient` so a restart resumes
//! with the same patient on screen.

use std::sync::Arc;

use serde_json::Value;

use crate::config::keys;
use crate::models::Patient;
use crate::storage::{LocalStorage, StorageError};

/// Errors from persisting the current patient.
///
/// These mean "failed to persist", never "failed to fetch": the caller
/// already holds a valid server response when one of these surfaces.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to serialize patient: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to persist patient: {0}")]
    Storage(#[from] StorageError),
}

pub struct PatientStore {
    current: Option<Patient>,
    storage: Arc<dyn LocalStorage>,
}

impl PatientStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            current: None,
            storage,
        }
    }

    pub fn current_patient(&self) -> Option<&Patient> {
        self.current.as_ref()
    }

    /// Replace the current patient.
    ///
    /// Absent or falsy input clears the slot and the snapshot. Anything
    /// else is normalized, becomes current, and is written to storage.
    /// A serialization or write failure is logged and returned.
    pub fn set_current_patient(&mut self, data: Option<&Value>) -> Result<(), StoreError> {
        let result = match data.filter(|v| !is_falsy(v)) {
            None => {
                self.current = None;
                self.storage
                    .remove(keys::CURRENT_PATIENT)
                    .map_err(StoreError::from)
            }
            Some(data) => {
                let normalized = Patient::normalize(data);
                tracing::debug!(patient_id = normalized.id, "Current patient set");
                self.current = Some(normalized);
                self.persist()
            }
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, "Failed to set current patient");
        }
        result
    }

    /// Restore the snapshot written by a previous session.
    ///
    /// The stored JSON is trusted as-is. A snapshot that does not parse is
    /// deleted and the slot stays as it was. Valid JSON whose field types
    /// drifted (a `null` id from another writer, say) is normalized rather
    /// than discarded.
    pub fn load_from_storage(&mut self) {
        let raw = match self.storage.get(keys::CURRENT_PATIENT) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read patient from storage");
                return;
            }
        };

        let value = match serde_json::from_str::<Value>(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load patient from storage, discarding snapshot");
                if let Err(e) = self.storage.remove(keys::CURRENT_PATIENT) {
                    tracing::warn!(error = %e, "Failed to remove corrupted patient snapshot");
                }
                return;
            }
        };

        let patient = match serde_json::from_value::<Patient>(value.clone()) {
            Ok(patient) => patient,
            Err(e) => {
                tracing::debug!(error = %e, "Patient snapshot has unexpected field types, normalizing");
                Patient::normalize(&value)
            }
        };
        self.current = Some(patient);
    }

    /// Drop the current patient and its snapshot.
    pub fn clear_current_patient(&mut self) {
        self.current = None;
        if let Err(e) = self.storage.remove(keys::CURRENT_PATIENT) {
            tracing::warn!(error = %e, "Failed to remove patient snapshot");
        }
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(patient) = &self.current else {
            return Ok(());
        };
        let json = serde_json::to_string(patient)?;
        self.storage.set(keys::CURRENT_PATIENT, &json)?;
        Ok(())
    }
}

/// Mirrors what a caller would treat as "no data".
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}
