//! Hospital onboarding: Register → Verify → Success.

use thiserror::Error;

use crate::api::{ApiError, HospitalRegistrationForm, HttpOnboardingService, OnboardingService, UploadFile};
use crate::config::{keys, ClientConfig};
use crate::models::hospital::review_rows;
use crate::models::Hospital;
use crate::notify::Notifier;
use crate::storage::{LocalStorage, StorageError};

pub const LOGO_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/svg+xml"];
pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    Register,
    Verify,
    Success,
}

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("Please login first")]
    MissingAdminToken,

    #[error("Invalid file type. Please upload PNG, JPG, or SVG.")]
    InvalidLogoType,

    #[error("File too large. Maximum size is 2MB.")]
    LogoTooLarge,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Please accept the terms before activation.")]
    TermsNotAccepted,

    #[error("Not available on the {0:?} step")]
    WrongStep(OnboardingStep),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Accept only jpeg/png/svg logos up to 2 MiB.
pub fn validate_logo(file: &UploadFile) -> Result<(), OnboardingError> {
    if !LOGO_MIME_TYPES.contains(&file.mime.as_str()) {
        return Err(OnboardingError::InvalidLogoType);
    }
    if file.size() > MAX_LOGO_BYTES {
        return Err(OnboardingError::LogoTooLarge);
    }
    Ok(())
}

pub struct OnboardingFlow<O: OnboardingService> {
    service: O,
    notifier: Notifier,
    step: OnboardingStep,
    form: HospitalRegistrationForm,
    hospital: Option<Hospital>,
    terms_accepted: bool,
}

impl OnboardingFlow<HttpOnboardingService> {
    /// Start against the admin API with the stored admin token.
    pub fn open(
        config: &ClientConfig,
        storage: &dyn LocalStorage,
        notifier: Notifier,
    ) -> Result<Self, OnboardingError> {
        let token = storage
            .get(keys::ADMIN_ACCESS_TOKEN)?
            .filter(|t| !t.trim().is_empty());
        let Some(token) = token else {
            notifier.info(OnboardingError::MissingAdminToken.to_string());
            return Err(OnboardingError::MissingAdminToken);
        };
        let service = HttpOnboardingService::new(&config.admin_api_base_url, Some(token))?;
        Ok(Self::new(service, notifier))
    }
}

impl<O: OnboardingService> OnboardingFlow<O> {
    pub fn new(service: O, notifier: Notifier) -> Self {
        Self {
            service,
            notifier,
            step: OnboardingStep::Register,
            form: HospitalRegistrationForm::default(),
            hospital: None,
            terms_accepted: false,
        }
    }

    pub fn step(&self) -> OnboardingStep {
        self.step
    }

    pub fn form_mut(&mut self) -> &mut HospitalRegistrationForm {
        &mut self.form
    }

    pub fn hospital(&self) -> Option<&Hospital> {
        self.hospital.as_ref()
    }

    pub fn review(&self) -> Vec<(&'static str, String)> {
        self.hospital.as_ref().map(review_rows).unwrap_or_default()
    }

    /// Attach a logo. A rejected file clears any previous logo.
    pub fn set_logo(&mut self, file: UploadFile) -> Result<(), OnboardingError> {
        if let Err(e) = validate_logo(&file) {
            self.form.logo = None;
            self.notifier.negative(e.to_string());
            return Err(e);
        }
        self.form.logo = Some(file);
        Ok(())
    }

    pub fn clear_logo(&mut self) {
        self.form.logo = None;
    }

    pub fn set_terms_accepted(&mut self, accepted: bool) {
        self.terms_accepted = accepted;
    }

    pub fn can_activate(&self) -> bool {
        self.step == OnboardingStep::Verify && self.terms_accepted
    }

    pub async fn register(&mut self) -> Result<&Hospital, OnboardingError> {
        self.expect_step(OnboardingStep::Register)?;
        for (label, value) in [
            ("Official name", &self.form.official_name),
            ("Address", &self.form.address),
            ("License ID", &self.form.license_id),
        ] {
            if value.trim().is_empty() {
                return Err(OnboardingError::MissingField(label));
            }
        }
        if let Some(logo) = &self.form.logo {
            validate_logo(logo)?;
        }

        match self.service.register(self.form.clone()).await {
            Ok(hospital) => {
                tracing::info!(hospital = %hospital.official_name, status = %hospital.status, "Hospital registered");
                self.notifier
                    .positive("Registration successful. Review details.");
                self.step = OnboardingStep::Verify;
                self.terms_accepted = false;
                Ok(&*self.hospital.insert(hospital))
            }
            Err(e) => {
                tracing::error!(error = %e, "Hospital registration failed");
                self.notifier.negative(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Return from review to the (still filled) registration form.
    pub fn back_to_form(&mut self) -> Result<(), OnboardingError> {
        self.expect_step(OnboardingStep::Verify)?;
        self.step = OnboardingStep::Register;
        Ok(())
    }

    pub async fn activate(&mut self) -> Result<(), OnboardingError> {
        self.expect_step(OnboardingStep::Verify)?;
        if !self.terms_accepted {
            self.notifier.info(OnboardingError::TermsNotAccepted.to_string());
            return Err(OnboardingError::TermsNotAccepted);
        }

        if let Err(e) = self.service.activate().await {
            tracing::error!(error = %e, "Hospital activation failed");
            self.notifier.negative(e.to_string());
            return Err(e.into());
        }

        tracing::info!("Hospital activated");
        self.notifier.positive("Hospital activated successfully!");
        self.step = OnboardingStep::Success;
        Ok(())
    }

    fn expect_step(&self, expected: OnboardingStep) -> Result<(), OnboardingError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(OnboardingError::WrongStep(self.step))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::notify::ToastKind;
    use crate::storage::MemoryStorage;

    #[derive(Default)]
    struct MockOnboarding {
        register_results: Mutex<VecDeque<Result<Hospital, ApiError>>>,
        registered: Mutex<Vec<HospitalRegistrationForm>>,
        activations: AtomicUsize,
    }

    impl OnboardingService for MockOnboarding {
        async fn register(&self, form: HospitalRegistrationForm) -> Result<Hospital, ApiError> {
            self.registered.lock().unwrap().push(form.clone());
            self.register_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Ok(Hospital {
                        official_name: form.official_name,
                        address: form.address,
                        license_id: form.license_id,
                        status: "pending".into(),
                        ..Hospital::default()
                    })
                })
        }

        async fn activate(&self) -> Result<(), ApiError> {
            self.activations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn logo(mime: &str, size: usize) -> UploadFile {
        UploadFile {
            file_name: "logo".into(),
            mime: mime.into(),
            bytes: vec![0; size],
        }
    }

    fn filled_flow() -> OnboardingFlow<MockOnboarding> {
        let mut flow = OnboardingFlow::new(MockOnboarding::default(), Notifier::new());
        let form = flow.form_mut();
        form.official_name = "St. Luke Medical Center".into();
        form.address = "1 Main St".into();
        form.license_id = "LIC-001".into();
        flow
    }

    #[test]
    fn logo_rules() {
        assert!(validate_logo(&logo("image/png", 10)).is_ok());
        assert!(validate_logo(&logo("image/svg+xml", MAX_LOGO_BYTES)).is_ok());
        assert!(matches!(
            validate_logo(&logo("image/gif", 10)),
            Err(OnboardingError::InvalidLogoType)
        ));
        let err = validate_logo(&logo("image/jpeg", MAX_LOGO_BYTES + 1)).unwrap_err();
        assert_eq!(err.to_string(), "File too large. Maximum size is 2MB.");
    }

    #[test]
    fn rejected_logo_clears_previous() {
        let mut flow = filled_flow();
        let mut toasts = flow.notifier.subscribe();
        flow.set_logo(logo("image/png", 4)).unwrap();
        assert!(flow.set_logo(logo("application/pdf", 4)).is_err());
        assert!(flow.form_mut().logo.is_none());

        let toast = toasts.try_recv().unwrap();
        assert_eq!(toast.kind, ToastKind::Negative);
        assert_eq!(toast.message, "Invalid file type. Please upload PNG, JPG, or SVG.");
    }

    #[test]
    fn open_requires_admin_token() {
        let storage = MemoryStorage::new();
        let config = ClientConfig::for_server("http://localhost:8000");
        assert!(matches!(
            OnboardingFlow::open(&config, &storage, Notifier::new()),
            Err(OnboardingError::MissingAdminToken)
        ));

        storage.set(keys::ADMIN_ACCESS_TOKEN, "admin-tok").unwrap();
        let flow = OnboardingFlow::open(&config, &storage, Notifier::new()).unwrap();
        assert_eq!(flow.step(), OnboardingStep::Register);
    }

    #[tokio::test]
    async fn register_verify_activate() {
        let mut flow = filled_flow();
        flow.set_logo(logo("image/png", 4)).unwrap();

        let hospital = flow.register().await.unwrap();
        assert_eq!(hospital.status, "pending");
        assert_eq!(flow.step(), OnboardingStep::Verify);
        assert_eq!(flow.review()[0], ("Official Name", "St. Luke Medical Center".to_string()));

        // Terms not accepted: no request
        let err = flow.activate().await.unwrap_err();
        assert_eq!(err.to_string(), "Please accept the terms before activation.");
        assert_eq!(flow.service.activations.load(Ordering::SeqCst), 0);

        flow.set_terms_accepted(true);
        assert!(flow.can_activate());
        flow.activate().await.unwrap();
        assert_eq!(flow.step(), OnboardingStep::Success);
        assert_eq!(flow.service.activations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn back_to_form_keeps_fields() {
        let mut flow = filled_flow();
        flow.register().await.unwrap();

        flow.back_to_form().unwrap();
        assert_eq!(flow.step(), OnboardingStep::Register);
        assert_eq!(flow.form_mut().license_id, "LIC-001");
        assert!(matches!(
            flow.back_to_form(),
            Err(OnboardingError::WrongStep(OnboardingStep::Register))
        ));
    }

    #[tokio::test]
    async fn registration_failure_stays_on_form() {
        let mut flow = filled_flow();
        flow.service
            .register_results
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Rejected("Registration failed".into())));
        let mut toasts = flow.notifier.subscribe();

        assert!(matches!(flow.register().await, Err(OnboardingError::Api(_))));
        assert_eq!(flow.step(), OnboardingStep::Register);
        assert!(flow.hospital().is_none());

        let toast = toasts.recv().await.unwrap();
        assert_eq!(toast.kind, ToastKind::Negative);
        assert_eq!(toast.message, "Registration failed");
    }

    #[tokio::test]
    async fn register_requires_core_fields() {
        let mut flow = OnboardingFlow::new(MockOnboarding::default(), Notifier::new());
        let err = flow.register().await.unwrap_err();
        assert_eq!(err.to_string(), "Official name is required");
        assert!(flow.service.registered.lock().unwrap().is_empty());
    }
}
