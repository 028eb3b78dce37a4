use serde::{Deserialize, Serialize};

/// A hospital record as returned by the onboarding endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hospital {
    pub id: Option<i64>,
    pub official_name: String,
    pub address: String,
    pub license_id: String,
    pub status: String,
    pub logo: Option<String>,
}

/// `POST /hospital/register/` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationResponse {
    pub hospital: Option<Hospital>,
}

/// `POST /hospital/activate/` body.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ActivationRequest {
    pub terms_accepted: bool,
    pub data_verified: bool,
}

/// Review rows shown before activation, in display order.
pub fn review_rows(hospital: &Hospital) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Official Name", hospital.official_name.clone()),
        ("Address", hospital.address.clone()),
    ];
    if let Some(logo) = hospital.logo.as_deref().filter(|l| !l.is_empty()) {
        rows.push(("Logo", logo.to_string()));
    }
    rows.push(("License ID", hospital.license_id.clone()));
    rows.push(("Status", hospital.status.clone()));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_rows_skip_missing_logo() {
        let hospital = Hospital {
            official_name: "St. Luke".into(),
            address: "1 Main".into(),
            license_id: "LIC-1".into(),
            status: "pending".into(),
            ..Hospital::default()
        };
        let labels: Vec<_> = review_rows(&hospital).into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["Official Name", "Address", "License ID", "Status"]);
    }

    #[test]
    fn review_rows_include_logo() {
        let hospital = Hospital {
            logo: Some("/media/logo.png".into()),
            ..Hospital::default()
        };
        let rows = review_rows(&hospital);
        assert_eq!(rows[2], ("Logo", "/media/logo.png".to_string()));
    }
}
