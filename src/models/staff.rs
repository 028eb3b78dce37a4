use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Department the backend assumes when a staff profile names none.
pub const DEFAULT_DEPARTMENT: &str = "OPD";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NurseProfile {
    pub department: Option<String>,
    pub hospital_name: Option<String>,
    pub specialization: Option<String>,
}

/// The signed-in staff member, as returned by `/users/profile/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffProfile {
    pub full_name: String,
    pub role: String,
    pub verification_status: Option<String>,
    pub hospital_name: Option<String>,
    pub nurse_profile: Option<NurseProfile>,
}

impl StaffProfile {
    /// Parse the profile endpoint, which wraps the user as `{user: {...}}`.
    /// An unwrapped user object is accepted too.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Object(mut obj) if obj.get("user").is_some_and(Value::is_object) => {
                let user = obj.remove("user").unwrap_or(Value::Null);
                serde_json::from_value(user)
            }
            other => serde_json::from_value(other),
        }
    }

    /// Queue department this staff member calls for.
    pub fn department(&self) -> &str {
        self.nurse_profile
            .as_ref()
            .and_then(|n| n.department.as_deref())
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DEPARTMENT)
    }

    pub fn hospital(&self) -> Option<&str> {
        self.hospital_name.as_deref().or_else(|| {
            self.nurse_profile
                .as_ref()
                .and_then(|n| n.hospital_name.as_deref())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapped_profile_parses() {
        let profile = StaffProfile::from_value(json!({
            "user": {
                "full_name": "Nurse Joy",
                "role": "nurse",
                "nurse_profile": {"department": "Pharmacy", "hospital_name": "Test Hospital"}
            }
        }))
        .unwrap();
        assert_eq!(profile.full_name, "Nurse Joy");
        assert_eq!(profile.department(), "Pharmacy");
        assert_eq!(profile.hospital(), Some("Test Hospital"));
    }

    #[test]
    fn missing_department_defaults_to_opd() {
        let profile = StaffProfile::from_value(json!({"full_name": "Nurse", "role": "nurse"})).unwrap();
        assert_eq!(profile.department(), DEFAULT_DEPARTMENT);
    }

    #[test]
    fn root_hospital_name_wins() {
        let profile = StaffProfile::from_value(json!({
            "hospital_name": "Root",
            "nurse_profile": {"hospital_name": "Nested"}
        }))
        .unwrap();
        assert_eq!(profile.hospital(), Some("Root"));
    }
}
