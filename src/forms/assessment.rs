//! Patient registration & assessment wizard.
//!
//! Five linear steps. Each step has a validity predicate; `continue_step`
//! only advances past a valid step and `back` always works. The final
//! submit combines every step into one payload and creates or updates the
//! patient depending on how the wizard was opened.

use std::fmt;
use std::sync::{Arc, LazyLock};

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{require, FieldProblem, FormError};
use crate::api::{ApiError, QueueService};
use crate::models::patient::row_id;
use crate::models::ServerRecord;
use crate::notify::Notifier;

/// Consultation location that requires an attending physician.
pub const IN_HOSPITAL: &str = "In the hospital";

pub const CONSULTATION_LOCATIONS: &[&str] = &[IN_HOSPITAL, "Outside the hospital"];

pub const SAVED_MESSAGE: &str = "Patient registration & assessment saved";

static PHYSICIAN_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z ]+$").unwrap());

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const DATE_FORMAT: &str = "%Y-%m-%d";
const MAX_AGE: u32 = 150;

// ═══════════════════════════════════════════════════════════
// Steps
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    HospitalContact,
    PatientInfo,
    EmergencyContact,
    MedicalInfo,
    Authorization,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::HospitalContact,
        Step::PatientInfo,
        Step::EmergencyContact,
        Step::MedicalInfo,
        Step::Authorization,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Step> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Step> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::HospitalContact => "Hospital & Basic Contact Details",
            Step::PatientInfo => "Patient Information",
            Step::EmergencyContact => "Emergency Contact",
            Step::MedicalInfo => "Medical Information",
            Step::Authorization => "Authorization",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

// ═══════════════════════════════════════════════════════════
// Form data
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalContact {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: String,
    pub age: String,
    pub gender: String,
    pub marital_status: String,
    pub phone_number: String,
    pub home_address: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalInfo {
    pub reason_for_visit: String,
    pub consultation_location: String,
    pub attending_physician: String,
}

impl MedicalInfo {
    pub fn physician_required(&self) -> bool {
        self.consultation_location == IN_HOSPITAL
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub signature: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentForm {
    pub hospital: HospitalContact,
    pub patient: PatientInfo,
    pub emergency: EmergencyContact,
    pub medical: MedicalInfo,
    pub authorization: Authorization,
}

impl AssessmentForm {
    /// Prefill from a patient list row.
    pub fn from_patient_row(row: &Value) -> Self {
        let text = |key: &str| row.get(key).and_then(Value::as_str).unwrap_or_default();
        let (first_name, last_name) = split_full_name(text("full_name"));
        let age = match row.get("age") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };

        Self {
            patient: PatientInfo {
                first_name,
                last_name,
                age,
                gender: text("gender").to_string(),
                email: text("email").to_string(),
                ..PatientInfo::default()
            },
            ..Self::default()
        }
    }

    /// Problems on one step; empty when the step is valid.
    pub fn problems(&self, step: Step) -> Vec<FieldProblem> {
        let mut problems = Vec::new();
        match step {
            Step::HospitalContact => {
                let h = &self.hospital;
                require(&mut problems, "hospital_name", "Hospital Name", &h.name);
                require(&mut problems, "hospital_address", "Hospital Address", &h.address);
                require(&mut problems, "hospital_phone", "Hospital Phone", &h.phone);
                if require(&mut problems, "hospital_email", "Hospital Email", &h.email)
                    && !EMAIL.is_match(h.email.trim())
                {
                    problems.push(FieldProblem::new("hospital_email", "Enter a valid email"));
                }
            }
            Step::PatientInfo => {
                let p = &self.patient;
                require(&mut problems, "mrn", "Patient ID / MRN", &p.mrn);
                require(&mut problems, "first_name", "First Name", &p.first_name);
                require(&mut problems, "last_name", "Last Name", &p.last_name);
                if require(&mut problems, "date_of_birth", "Date of Birth", &p.date_of_birth) {
                    if let Err(message) = check_date_of_birth(&p.date_of_birth) {
                        problems.push(FieldProblem::new("date_of_birth", message));
                    }
                }
                if require(&mut problems, "age", "Age", &p.age) && parse_age(&p.age).is_none() {
                    problems.push(FieldProblem::new("age", "Enter a valid age"));
                }
                require(&mut problems, "gender", "Gender", &p.gender);
                require(&mut problems, "marital_status", "Marital Status", &p.marital_status);
                require(&mut problems, "phone_number", "Phone Number", &p.phone_number);
                require(&mut problems, "home_address", "Home Address", &p.home_address);
            }
            Step::EmergencyContact => {
                let e = &self.emergency;
                require(&mut problems, "emergency_contact_name", "Emergency Contact Name", &e.name);
                require(
                    &mut problems,
                    "emergency_contact_relationship",
                    "Emergency Relationship",
                    &e.relationship,
                );
                require(&mut problems, "emergency_contact_number", "Emergency Phone", &e.phone);
            }
            Step::MedicalInfo => {
                let m = &self.medical;
                require(&mut problems, "reason_for_visit", "Reason for Visit", &m.reason_for_visit);
                require(
                    &mut problems,
                    "consultation_location",
                    "Consultation Location",
                    &m.consultation_location,
                );
                if m.physician_required() {
                    if let Err(message) = check_physician_name(&m.attending_physician) {
                        problems.push(FieldProblem::new("attending_physician", message));
                    }
                }
            }
            Step::Authorization => {
                require(
                    &mut problems,
                    "patient_signature",
                    "Patient/Guardian Signature",
                    &self.authorization.signature,
                );
            }
        }
        problems
    }

    pub fn is_step_valid(&self, step: Step) -> bool {
        self.problems(step).is_empty()
    }

    /// All steps combined into the body sent to the patients endpoint.
    pub fn to_payload(&self) -> Value {
        let p = &self.patient;
        let full_name = format!("{} {}", p.first_name.trim(), p.last_name.trim());
        let physician = self
            .medical
            .physician_required()
            .then(|| self.medical.attending_physician.trim().to_string());

        json!({
            "hospital_name": self.hospital.name,
            "hospital_address": self.hospital.address,
            "hospital_phone": self.hospital.phone,
            "hospital_email": self.hospital.email,
            "mrn": p.mrn,
            "first_name": p.first_name,
            "last_name": p.last_name,
            "full_name": full_name.trim(),
            "email": p.email,
            "date_of_birth": p.date_of_birth,
            "age": parse_age(&p.age),
            "gender": p.gender,
            "marital_status": p.marital_status,
            "phone_number": p.phone_number,
            "home_address": p.home_address,
            "emergency_contact_name": self.emergency.name,
            "emergency_contact_relationship": self.emergency.relationship,
            "emergency_contact_number": self.emergency.phone,
            "reason_for_visit": self.medical.reason_for_visit,
            "consultation_location": self.medical.consultation_location,
            "attending_physician": physician,
            "patient_signature": self.authorization.signature,
        })
    }
}

/// Attending physician rule: letters and spaces only.
pub fn check_physician_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name of Attending Physician is required");
    }
    if PHYSICIAN_NAME.is_match(name) {
        Ok(())
    } else {
        Err("Only letters and spaces allowed")
    }
}

fn check_date_of_birth(raw: &str) -> Result<NaiveDate, &'static str> {
    let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| "Enter a valid date (YYYY-MM-DD)")?;
    if date > Local::now().date_naive() {
        return Err("Date of birth cannot be in the future");
    }
    Ok(date)
}

fn parse_age(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|age| *age <= MAX_AGE)
}

fn split_full_name(full: &str) -> (String, String) {
    let full = full.trim();
    match full.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (full.to_string(), String::new()),
    }
}

// ═══════════════════════════════════════════════════════════
// Wizard
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardMode {
    /// Patient list shown, no form open.
    List,
    /// Form open. `patient_id` is set when editing an existing patient.
    Editing { patient_id: Option<i64> },
}

pub struct AssessmentWizard<S: QueueService> {
    service: Arc<S>,
    notifier: Notifier,
    mode: WizardMode,
    step: Step,
    form: AssessmentForm,
    patients: Vec<ServerRecord>,
}

impl<S: QueueService> AssessmentWizard<S> {
    pub fn new(service: Arc<S>, notifier: Notifier) -> Self {
        Self {
            service,
            notifier,
            mode: WizardMode::List,
            step: Step::HospitalContact,
            form: AssessmentForm::default(),
            patients: Vec::new(),
        }
    }

    pub fn mode(&self) -> WizardMode {
        self.mode
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn form(&self) -> &AssessmentForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut AssessmentForm {
        &mut self.form
    }

    pub fn patients(&self) -> &[ServerRecord] {
        &self.patients
    }

    /// Whether the attending physician field is shown.
    pub fn physician_visible(&self) -> bool {
        self.form.medical.physician_required()
    }

    pub fn is_step_valid(&self) -> bool {
        self.form.is_step_valid(self.step)
    }

    pub async fn load_patients(&mut self) -> Result<(), ApiError> {
        match self.service.fetch_nurse_patients().await {
            Ok(rows) => {
                tracing::debug!(count = rows.len(), "Nurse patient list loaded");
                self.patients = rows;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load patients");
                self.notifier.negative(format!("Failed to load patients: {e}"));
                Err(e)
            }
        }
    }

    pub fn new_patient(&mut self) {
        self.open(None, AssessmentForm::default());
    }

    /// Open the wizard on an existing patient row.
    pub fn edit_patient(&mut self, row: &Value) {
        let patient_id = row_id(row);
        self.open(patient_id, AssessmentForm::from_patient_row(row));
    }

    fn open(&mut self, patient_id: Option<i64>, form: AssessmentForm) {
        self.mode = WizardMode::Editing { patient_id };
        self.step = Step::HospitalContact;
        self.form = form;
    }

    pub fn cancel(&mut self) {
        self.mode = WizardMode::List;
        self.step = Step::HospitalContact;
        self.form = AssessmentForm::default();
    }

    /// Advance past the current step if it is valid.
    pub fn continue_step(&mut self) -> Result<Step, FormError> {
        self.ensure_open()?;
        let problems = self.form.problems(self.step);
        if !problems.is_empty() {
            return Err(FormError::Invalid {
                step: self.step,
                problems,
            });
        }
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> Step {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Validate everything and save. On success the wizard closes back to
    /// the list; on failure it stays on the final step.
    pub async fn finish_and_submit(&mut self) -> Result<Value, FormError> {
        let WizardMode::Editing { patient_id } = self.mode else {
            return Err(FormError::NotOpen);
        };
        if self.step != Step::Authorization {
            return Err(FormError::NotOnFinalStep(Step::Authorization));
        }
        if let Some((step, problems)) = Step::ALL
            .into_iter()
            .map(|step| (step, self.form.problems(step)))
            .find(|(_, problems)| !problems.is_empty())
        {
            return Err(FormError::Invalid { step, problems });
        }

        let payload = self.form.to_payload();
        let result = match patient_id {
            Some(id) => self.service.update_assessment(id, &payload).await,
            None => self.service.create_assessment(&payload).await,
        };

        match result {
            Ok(saved) => {
                tracing::info!(patient_id = ?patient_id, "Patient assessment saved");
                self.notifier.positive(SAVED_MESSAGE);
                self.cancel();
                // Failure is already logged and surfaced
                let _ = self.load_patients().await;
                Ok(saved)
            }
            Err(e) => {
                tracing::error!(error = %e, patient_id = ?patient_id, "Failed to save patient assessment");
                self.notifier
                    .negative(format!("Failed to save assessment: {e}"));
                Err(FormError::Api(e))
            }
        }
    }

    fn ensure_open(&self) -> Result<(), FormError> {
        match self.mode {
            WizardMode::Editing { .. } => Ok(()),
            WizardMode::List => Err(FormError::NotOpen),
        }
    }
}
