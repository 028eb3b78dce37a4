use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A loosely-typed row returned by a list endpoint.
///
/// List rows (queue entries, notifications, schedules, inventory, doctors)
/// are display data only. They are kept as the server sent them and read
/// through lenient accessors instead of being forced into a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerRecord(pub Value);

impl ServerRecord {
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<i64> {
        super::patient::row_id(&self.0)
    }

    /// Display name: `full_name`, then `name`, then `patient_name`.
    pub fn display_name(&self) -> Option<&str> {
        self.str_field("full_name")
            .or_else(|| self.str_field("name"))
            .or_else(|| self.str_field("patient_name"))
    }
}

/// Read a list payload. Accepts a bare array, or an object carrying the
/// array under one of `keys`. Anything else is an empty list.
pub fn records_from_value(value: Value, keys: &[&str]) -> Vec<ServerRecord> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => keys
            .iter()
            .find_map(|k| match obj.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    items.into_iter().map(ServerRecord).collect()
}

// ═══════════════════════════════════════════════════════════
// Queue snapshot
// ═══════════════════════════════════════════════════════════

/// Which list a queued patient sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    Normal,
    Priority,
}

/// Authoritative queue lists for one department. Always replaced whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub normal_queue: Vec<ServerRecord>,
    pub priority_queue: Vec<ServerRecord>,
    pub all_patients: Vec<ServerRecord>,
}

impl QueueSnapshot {
    /// Parse `/operations/nurse/queue/patients/`.
    ///
    /// The object form carries the three lists directly. A bare array is
    /// treated as the merged list and split on each row's `queue_type`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(_) => {
                let all = records_from_value(value, &[]);
                let (priority, normal): (Vec<_>, Vec<_>) = all
                    .iter()
                    .cloned()
                    .partition(|r| r.str_field("queue_type") == Some("priority"));
                Self {
                    normal_queue: normal,
                    priority_queue: priority,
                    all_patients: all,
                }
            }
            Value::Object(mut obj) => {
                let mut take = |key: &str| {
                    obj.remove(key)
                        .map(|v| records_from_value(v, &[]))
                        .unwrap_or_default()
                };
                let normal_queue = take("normal_queue");
                let priority_queue = take("priority_queue");
                let mut all_patients = take("all_patients");
                if all_patients.is_empty() {
                    all_patients = priority_queue
                        .iter()
                        .chain(normal_queue.iter())
                        .cloned()
                        .collect();
                }
                Self {
                    normal_queue,
                    priority_queue,
                    all_patients,
                }
            }
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normal_queue.is_empty() && self.priority_queue.is_empty() && self.all_patients.is_empty()
    }

    pub fn waiting_count(&self) -> usize {
        self.all_patients
            .len()
            .max(self.normal_queue.len() + self.priority_queue.len())
    }

    pub fn len_of(&self, kind: QueueKind) -> usize {
        match kind {
            QueueKind::Normal => self.normal_queue.len(),
            QueueKind::Priority => self.priority_queue.len(),
        }
    }
}

/// `/operations/queue/status/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub status_message: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Call next
// ═══════════════════════════════════════════════════════════

/// Body of `POST /operations/queue/start-processing/`.
#[derive(Debug, Clone, Serialize)]
pub struct CallNextRequest<'a> {
    pub department: &'a str,
}

/// Response of the call-next mutation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CallNextResponse {
    pub department: Option<String>,
    /// Queue number now being served; the server sends a number or a
    /// zero-padded string.
    pub current_serving: Option<Value>,
    pub patient: Option<Value>,
    pub patient_profile: Option<Value>,
    pub success: Option<bool>,
    pub message: Option<String>,
}

impl CallNextResponse {
    /// The record to hand to the patient store: the profile when present,
    /// otherwise the bare patient.
    pub fn patient_payload(&self) -> Option<&Value> {
        self.patient_profile
            .as_ref()
            .filter(|v| !v.is_null())
            .or_else(|| self.patient.as_ref().filter(|v| !v.is_null()))
    }

    /// The server answered but had nobody to dequeue.
    pub fn is_queue_empty(&self) -> bool {
        self.success == Some(false) && self.patient_payload().is_none()
    }

    pub fn current_serving_label(&self) -> Option<String> {
        match self.current_serving.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
