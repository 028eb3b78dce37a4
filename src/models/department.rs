use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A selectable department: display label plus the value sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentOption {
    pub label: String,
    pub value: String,
}

impl DepartmentOption {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// Departments that run a walk-in queue.
pub const QUEUE_DEPARTMENTS: &[(&str, &str)] = &[
    ("Out Patient Department", "OPD"),
    ("Pharmacy", "Pharmacy"),
    ("Appointment", "Appointment"),
];

/// Clinical departments shared by appointments and doctor settings.
/// `other` keeps existing values that match no known department selectable.
pub const CLINICAL_DEPARTMENTS: &[(&str, &str)] = &[
    ("General Medicine", "general-medicine"),
    ("Cardiology", "cardiology"),
    ("Dermatology", "dermatology"),
    ("Orthopedics", "orthopedics"),
    ("Pediatrics", "pediatrics"),
    ("Gynecology", "gynecology"),
    ("Neurology", "neurology"),
    ("Oncology", "oncology"),
    ("Optometrist", "optometrist"),
    ("Emergency Medicine", "emergency-medicine"),
    ("Other", "other"),
];

pub fn queue_department_options() -> Vec<DepartmentOption> {
    to_options(QUEUE_DEPARTMENTS)
}

pub fn clinical_department_options() -> Vec<DepartmentOption> {
    to_options(CLINICAL_DEPARTMENTS)
}

fn to_options(pairs: &[(&str, &str)]) -> Vec<DepartmentOption> {
    pairs
        .iter()
        .map(|(label, value)| DepartmentOption::new(label, value))
        .collect()
}

/// Interpret one backend department entry.
///
/// Strings become `{label: s, value: s}`. Objects use `value`, falling
/// back to `label`; the label falls back to the value. Anything without
/// a usable value is dropped.
fn backend_option(item: &Value) -> Option<DepartmentOption> {
    match item {
        Value::String(s) => Some(DepartmentOption::new(s, s)),
        Value::Object(obj) => {
            let label = obj.get("label").and_then(Value::as_str);
            let value = obj
                .get("value")
                .and_then(Value::as_str)
                .or(label)
                .unwrap_or("");
            if value.is_empty() {
                return None;
            }
            Some(DepartmentOption::new(label.unwrap_or(value), value))
        }
        _ => None,
    }
}

/// Merge local defaults with backend departments, deduplicating by value.
///
/// Defaults come first and win collisions; backend entries keep their
/// order and labels. An empty backend list returns the defaults unchanged.
pub fn unify_department_options(
    defaults: &[DepartmentOption],
    raw_backend: &[Value],
) -> Vec<DepartmentOption> {
    let mut union: Vec<DepartmentOption> = defaults.to_vec();
    let mut seen: std::collections::HashSet<String> =
        defaults.iter().map(|d| d.value.clone()).collect();

    for opt in raw_backend.iter().filter_map(backend_option) {
        if seen.insert(opt.value.clone()) {
            union.push(opt);
        }
    }
    union
}
