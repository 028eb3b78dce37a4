//! Admin API client for hospital onboarding.

use std::future::Future;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::client::RestClient;
use super::error::ApiError;
use super::paths;
use crate::models::hospital::{ActivationRequest, RegistrationResponse};
use crate::models::Hospital;

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    fn into_part(self) -> Result<Part, ApiError> {
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.mime)
            .map_err(|e| ApiError::Transport(e.to_string()))
    }
}

/// Fields of the hospital registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalRegistrationForm {
    pub official_name: String,
    pub address: String,
    pub license_id: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub logo: Option<UploadFile>,
    pub license_document: Option<UploadFile>,
}

impl HospitalRegistrationForm {
    pub fn into_multipart(self) -> Result<Form, ApiError> {
        let mut form = Form::new()
            .text("official_name", self.official_name)
            .text("address", self.address)
            .text("license_id", self.license_id)
            .text("contact_email", self.contact_email)
            .text("contact_phone", self.contact_phone);
        if let Some(logo) = self.logo {
            form = form.part("logo", logo.into_part()?);
        }
        if let Some(doc) = self.license_document {
            form = form.part("license_document", doc.into_part()?);
        }
        Ok(form)
    }
}

pub trait OnboardingService: Send + Sync + 'static {
    /// Register a hospital. The response must carry the created record.
    fn register(
        &self,
        form: HospitalRegistrationForm,
    ) -> impl Future<Output = Result<Hospital, ApiError>> + Send;

    fn activate(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
}

#[derive(Clone)]
pub struct HttpOnboardingService {
    rest: RestClient,
}

impl HttpOnboardingService {
    pub fn new(admin_base_url: &str, admin_token: Option<String>) -> Result<Self, ApiError> {
        Ok(Self {
            rest: RestClient::new(admin_base_url, admin_token)?,
        })
    }
}

impl OnboardingService for HttpOnboardingService {
    async fn register(&self, form: HospitalRegistrationForm) -> Result<Hospital, ApiError> {
        let value = self
            .rest
            .send_multipart(paths::HOSPITAL_REGISTER, form.into_multipart()?)
            .await?;
        let parsed: RegistrationResponse = if value.is_null() {
            RegistrationResponse::default()
        } else {
            serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?
        };
        parsed
            .hospital
            .ok_or_else(|| ApiError::Rejected("Registration failed".into()))
    }

    async fn activate(&self) -> Result<(), ApiError> {
        self.rest
            .send_json(
                Method::POST,
                paths::HOSPITAL_ACTIVATE,
                &ActivationRequest {
                    terms_accepted: true,
                    data_verified: true,
                },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Multipart, State};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct Seen {
        fields: Arc<Mutex<Vec<(String, Option<String>, usize)>>>,
        activation: Arc<Mutex<Option<Value>>>,
    }

    async fn start_server(seen: Seen, register_body: Value) -> String {
        let app = Router::new()
            .route(
                "/api/admin/hospital/register/",
                post(move |State(seen): State<Seen>, mut multipart: Multipart| {
                    let body = register_body.clone();
                    async move {
                        while let Some(field) = multipart.next_field().await.unwrap() {
                            let name = field.name().unwrap_or_default().to_string();
                            let file_name = field.file_name().map(str::to_string);
                            let len = field.bytes().await.unwrap().len();
                            seen.fields.lock().unwrap().push((name, file_name, len));
                        }
                        Json(body)
                    }
                }),
            )
            .route(
                "/api/admin/hospital/activate/",
                post(|State(seen): State<Seen>, Json(body): Json<Value>| async move {
                    *seen.activation.lock().unwrap() = Some(body);
                    Json(json!({"status": "active"}))
                }),
            )
            .with_state(seen);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{}/api/admin", addr.port())
    }

    fn form() -> HospitalRegistrationForm {
        HospitalRegistrationForm {
            official_name: "St. Luke Medical Center".into(),
            address: "1 Main St".into(),
            license_id: "LIC-001".into(),
            logo: Some(UploadFile {
                file_name: "logo.png".into(),
                mime: "image/png".into(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            }),
            ..HospitalRegistrationForm::default()
        }
    }

    #[tokio::test]
    async fn register_sends_multipart_and_returns_hospital() {
        let seen = Seen::default();
        let base = start_server(
            seen.clone(),
            json!({"hospital": {"official_name": "St. Luke Medical Center", "status": "pending"}}),
        )
        .await;
        let service = HttpOnboardingService::new(&base, Some("admin-tok".into())).unwrap();

        let hospital = service.register(form()).await.unwrap();
        assert_eq!(hospital.status, "pending");

        let fields = seen.fields.lock().unwrap();
        assert!(fields.iter().any(|(n, _, _)| n == "official_name"));
        let logo = fields.iter().find(|(n, _, _)| n == "logo").unwrap();
        assert_eq!(logo.1.as_deref(), Some("logo.png"));
        assert_eq!(logo.2, 4);
    }

    #[tokio::test]
    async fn register_without_hospital_fails() {
        let base = start_server(Seen::default(), json!({"ok": true})).await;
        let service = HttpOnboardingService::new(&base, None).unwrap();

        let err = service.register(form()).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(_)));
        assert_eq!(err.to_string(), "Registration failed");
    }

    #[tokio::test]
    async fn activate_posts_confirmation_flags() {
        let seen = Seen::default();
        let base = start_server(seen.clone(), json!({})).await;
        let service = HttpOnboardingService::new(&base, None).unwrap();

        service.activate().await.unwrap();
        assert_eq!(
            seen.activation.lock().unwrap().clone().unwrap(),
            json!({"terms_accepted": true, "data_verified": true})
        );
    }
}
