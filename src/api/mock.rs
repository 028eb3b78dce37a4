//! Scripted `QueueService` for workflow tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};
use tokio::sync::oneshot;

use super::error::ApiError;
use super::QueueService;
use crate::models::{CallNextResponse, QueueSnapshot, QueueStatus, ServerRecord, StaffProfile};

pub(crate) struct MockQueueService {
    pub department: String,
    pub queue: Mutex<QueueSnapshot>,
    pub status: Mutex<QueueStatus>,
    pub fail_queue: AtomicBool,
    call_next: Mutex<VecDeque<Result<CallNextResponse, ApiError>>>,
    call_gate: Mutex<Option<oneshot::Receiver<()>>>,
    save_results: Mutex<VecDeque<Result<Value, ApiError>>>,
    pub departments_called: Mutex<Vec<String>>,
    pub saved: Mutex<Vec<(Option<i64>, Value)>>,
    pub profile_pulls: AtomicUsize,
    pub queue_pulls: AtomicUsize,
    pub status_pulls: AtomicUsize,
    pub notification_pulls: AtomicUsize,
    pub doctor_pulls: AtomicUsize,
    pub call_next_calls: AtomicUsize,
}

impl MockQueueService {
    pub fn new() -> Self {
        Self {
            department: "OPD".into(),
            queue: Mutex::new(QueueSnapshot::default()),
            status: Mutex::new(QueueStatus {
                is_open: true,
                status_message: None,
            }),
            fail_queue: AtomicBool::new(false),
            call_next: Mutex::new(VecDeque::new()),
            call_gate: Mutex::new(None),
            save_results: Mutex::new(VecDeque::new()),
            departments_called: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
            profile_pulls: AtomicUsize::new(0),
            queue_pulls: AtomicUsize::new(0),
            status_pulls: AtomicUsize::new(0),
            notification_pulls: AtomicUsize::new(0),
            doctor_pulls: AtomicUsize::new(0),
            call_next_calls: AtomicUsize::new(0),
        }
    }

    /// One waiting patient in the normal queue.
    pub fn with_waiting_patient(self) -> Self {
        *self.queue.lock().unwrap() = QueueSnapshot::from_value(json!({
            "normal_queue": [{"id": 1, "name": "Waiting Patient"}],
            "priority_queue": [],
            "all_patients": [{"id": 1, "name": "Waiting Patient", "queue_type": "normal"}]
        }));
        self
    }

    pub fn push_call_next(&self, result: Result<CallNextResponse, ApiError>) {
        self.call_next.lock().unwrap().push_back(result);
    }

    pub fn push_save_result(&self, result: Result<Value, ApiError>) {
        self.save_results.lock().unwrap().push_back(result);
    }

    /// Hold the next call-next request until the returned sender fires.
    pub fn gate_call_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.call_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn next_save(&self) -> Result<Value, ApiError> {
        self.save_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"success": true})))
    }
}

pub(crate) fn sample_call_next() -> CallNextResponse {
    serde_json::from_value(json!({
        "department": "OPD",
        "current_serving": "001",
        "patient": {"name": "John Doe"},
        "patient_profile": {"id": 123, "full_name": "John Doe", "age": 30, "gender": "Male"}
    }))
    .unwrap()
}

impl QueueService for MockQueueService {
    async fn fetch_profile(&self) -> Result<StaffProfile, ApiError> {
        self.profile_pulls.fetch_add(1, Ordering::SeqCst);
        StaffProfile::from_value(json!({
            "user": {"full_name": "Nurse Joy", "role": "nurse",
                     "nurse_profile": {"department": self.department}}
        }))
        .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn fetch_queue(&self) -> Result<QueueSnapshot, ApiError> {
        self.queue_pulls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queue.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("Network Error".into()));
        }
        Ok(self.queue.lock().unwrap().clone())
    }

    async fn fetch_schedules(&self) -> Result<Vec<ServerRecord>, ApiError> {
        Ok(Vec::new())
    }

    async fn fetch_inventory(&self) -> Result<Vec<ServerRecord>, ApiError> {
        Ok(Vec::new())
    }

    async fn fetch_notifications(&self) -> Result<Vec<ServerRecord>, ApiError> {
        self.notification_pulls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ServerRecord(json!({"id": 1, "message": "Queue updated"}))])
    }

    async fn fetch_queue_status(&self) -> Result<QueueStatus, ApiError> {
        self.status_pulls.fetch_add(1, Ordering::SeqCst);
        Ok(self.status.lock().unwrap().clone())
    }

    async fn fetch_free_doctors(&self) -> Result<Vec<ServerRecord>, ApiError> {
        self.doctor_pulls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn start_processing(&self, department: &str) -> Result<CallNextResponse, ApiError> {
        self.call_next_calls.fetch_add(1, Ordering::SeqCst);
        self.departments_called
            .lock()
            .unwrap()
            .push(department.to_string());

        let gate = self.call_gate.lock().unwrap().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }

        let scripted = self.call_next.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(sample_call_next()))
    }

    async fn fetch_nurse_patients(&self) -> Result<Vec<ServerRecord>, ApiError> {
        Ok(vec![ServerRecord(json!({
            "id": 1, "full_name": "John Doe", "email": "john@example.com",
            "age": 30, "gender": "Male", "discharge_date": null
        }))])
    }

    async fn create_assessment(&self, payload: &Value) -> Result<Value, ApiError> {
        self.saved.lock().unwrap().push((None, payload.clone()));
        self.next_save()
    }

    async fn update_assessment(&self, patient_id: i64, payload: &Value) -> Result<Value, ApiError> {
        self.saved
            .lock()
            .unwrap()
            .push((Some(patient_id), payload.clone()));
        self.next_save()
    }
}
