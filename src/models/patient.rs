use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The patient currently being served at this station.
///
/// Every field has a concrete default so a normalized record never has
/// holes. `Deserialize` uses the same defaults, which lets a trusted
/// snapshot written by an older build load without re-normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patient {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    pub age: Option<f64>,
    pub gender: String,
    pub blood_type: String,
    pub medical_condition: String,
    pub hospital: String,
    pub insurance_provider: String,
    pub billing_amount: Option<f64>,
    pub room_number: String,
    pub admission_type: String,
    pub date_of_admission: Option<String>,
    pub discharge_date: Option<String>,
    pub medication: String,
    pub test_results: String,
    pub assigned_doctor: Option<String>,
    pub profile_picture: Option<String>,
    pub is_dummy: bool,
}

impl Patient {
    /// Coerce a loosely-typed server payload into a fully-defaulted record.
    ///
    /// Fields keep their value only when the JSON type matches; anything
    /// else maps to the field default. A non-object payload yields the
    /// all-default record.
    pub fn normalize(data: &Value) -> Self {
        let empty = Map::new();
        let obj = data.as_object().unwrap_or(&empty);

        let id_raw = present(obj, "id").or_else(|| present(obj, "user_id"));
        let user_id_raw = present(obj, "user_id").or_else(|| present(obj, "id"));

        let full_name = string_field(obj, "full_name")
            .or_else(|| string_field(obj, "name"))
            .unwrap_or_default();

        Self {
            id: id_raw.map(coerce_id).unwrap_or(0),
            user_id: user_id_raw.map(coerce_id).unwrap_or(0),
            full_name,
            email: string_or_empty(obj, "email"),
            age: number_field(obj, "age"),
            gender: string_or_empty(obj, "gender"),
            blood_type: string_or_empty(obj, "blood_type"),
            medical_condition: string_or_empty(obj, "medical_condition"),
            hospital: string_or_empty(obj, "hospital"),
            insurance_provider: string_or_empty(obj, "insurance_provider"),
            billing_amount: number_field(obj, "billing_amount"),
            room_number: string_or_empty(obj, "room_number"),
            admission_type: string_or_empty(obj, "admission_type"),
            date_of_admission: string_field(obj, "date_of_admission"),
            discharge_date: string_field(obj, "discharge_date"),
            medication: string_or_empty(obj, "medication"),
            test_results: string_or_empty(obj, "test_results"),
            assigned_doctor: string_field(obj, "assigned_doctor"),
            profile_picture: string_field(obj, "profile_picture"),
            is_dummy: false,
        }
    }
}

/// A key that exists and is not JSON `null`.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_or_empty(obj: &Map<String, Value>, key: &str) -> String {
    string_field(obj, key).unwrap_or_default()
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64)
}

/// Identity of a loosely-typed row: `id` coerced like a patient id.
/// Missing, `null` and non-numeric ids all read as no id.
pub(crate) fn row_id(row: &Value) -> Option<i64> {
    row.get("id")
        .filter(|v| !v.is_null())
        .map(coerce_id)
        .filter(|id| *id != 0)
}

/// Numeric identity coercion. Numeric strings parse; everything
/// non-numeric becomes 0.
fn coerce_id(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .unwrap_or(0)
        }
        Value::Bool(b) => i64::from(*b),
        _ => 0,
    }
}
