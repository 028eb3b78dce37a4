//! Remote service access.
//!
//! `QueueService` is the seam between the workflows and the hospital
//! backend: the controller and forms only ever talk to the trait, so tests
//! swap in a scripted implementation and production uses reqwest.

pub mod admin;
pub mod client;
pub mod error;
#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;

use serde_json::Value;

pub use admin::{HospitalRegistrationForm, HttpOnboardingService, OnboardingService, UploadFile};
pub use client::HttpQueueService;
pub use error::ApiError;

use crate::models::{CallNextResponse, QueueSnapshot, QueueStatus, ServerRecord, StaffProfile};

/// Endpoint paths, relative to the resolved base URL.
pub mod paths {
    pub const PROFILE: &str = "/users/profile/";
    pub const NURSE_QUEUE: &str = "/operations/nurse/queue/patients/";
    pub const QUEUE_SCHEDULES: &str = "/operations/queue/schedules/";
    pub const MEDICINE_INVENTORY: &str = "/operations/medicine-inventory/";
    pub const NOTIFICATIONS: &str = "/operations/messaging/notifications/";
    pub const QUEUE_STATUS: &str = "/operations/queue/status/";
    pub const FREE_DOCTORS: &str = "/operations/availability/doctors/free/";
    pub const START_PROCESSING: &str = "/operations/queue/start-processing/";
    pub const NURSE_PATIENTS: &str = "/users/nurse/patients/";
    pub const HOSPITAL_REGISTER: &str = "/hospital/register/";
    pub const HOSPITAL_ACTIVATE: &str = "/hospital/activate/";

    pub fn nurse_patient(id: i64) -> String {
        format!("{NURSE_PATIENTS}{id}/")
    }

    pub fn queue_channel(department: &str) -> String {
        format!("/ws/queue/{department}/")
    }
}

/// The hospital backend as the staff dashboard sees it.
pub trait QueueService: Send + Sync + 'static {
    fn fetch_profile(&self) -> impl Future<Output = Result<StaffProfile, ApiError>> + Send;

    fn fetch_queue(&self) -> impl Future<Output = Result<QueueSnapshot, ApiError>> + Send;

    fn fetch_schedules(&self) -> impl Future<Output = Result<Vec<ServerRecord>, ApiError>> + Send;

    fn fetch_inventory(&self) -> impl Future<Output = Result<Vec<ServerRecord>, ApiError>> + Send;

    fn fetch_notifications(
        &self,
    ) -> impl Future<Output = Result<Vec<ServerRecord>, ApiError>> + Send;

    fn fetch_queue_status(&self) -> impl Future<Output = Result<QueueStatus, ApiError>> + Send;

    fn fetch_free_doctors(&self)
        -> impl Future<Output = Result<Vec<ServerRecord>, ApiError>> + Send;

    /// Dequeue the next patient of `department` and mark them in progress.
    fn start_processing(
        &self,
        department: &str,
    ) -> impl Future<Output = Result<CallNextResponse, ApiError>> + Send;

    fn fetch_nurse_patients(
        &self,
    ) -> impl Future<Output = Result<Vec<ServerRecord>, ApiError>> + Send;

    fn create_assessment(
        &self,
        payload: &Value,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    fn update_assessment(
        &self,
        patient_id: i64,
        payload: &Value,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}
