//! Nurse queue view controller.
//!
//! Owns the dashboard's view of the queue and the "call next patient"
//! state machine:
//!
//! ```text
//! Idle ──call_next (queue not empty, not busy)──▶ Calling
//! Calling ──response──▶ store updated, busy cleared ──▶ Idle
//! Calling ──error────▶ logged + toast, busy cleared ──▶ Idle
//! ```
//!
//! The store is only touched after the response arrives. Queue lists are
//! always replaced whole from the server, so a push-triggered refresh and
//! a user-triggered one may interleave and the last to land wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::{ApiError, QueueService};
use crate::models::staff::DEFAULT_DEPARTMENT;
use crate::models::{Patient, QueueSnapshot, QueueStatus, ServerRecord, StaffProfile};
use crate::notify::Notifier;
use crate::patient_store::{PatientStore, StoreError};

/// Logged when the call-next request fails.
pub const CALL_NEXT_FAILED: &str = "Failed to start queue processing:";

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Everything the dashboard displays besides the current patient.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub profile: Option<StaffProfile>,
    pub department: String,
    pub queue: QueueSnapshot,
    pub queue_status: QueueStatus,
    pub schedules: Vec<ServerRecord>,
    pub inventory: Vec<ServerRecord>,
    pub notifications: Vec<ServerRecord>,
    pub doctors: Vec<ServerRecord>,
    /// Queue number announced by the last successful call.
    pub current_serving: Option<String>,
}

/// Why a call-next action was refused before any request went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRejection {
    /// A call is already in flight from this client.
    Busy,
    /// Nobody is waiting.
    EmptyQueue,
}

/// Result of one call-next action.
#[derive(Debug)]
pub enum CallOutcome {
    Called {
        patient: Option<Patient>,
        current_serving: Option<String>,
    },
    /// The server answered but had nobody to dequeue.
    NobodyWaiting { message: String },
    Rejected(CallRejection),
    Failed(ApiError),
    /// The call succeeded but the patient could not be persisted locally.
    PersistFailed(StoreError),
}

// ═══════════════════════════════════════════════════════════
// CallGuard: RAII busy flag
// ═══════════════════════════════════════════════════════════

/// Holds the busy flag for one call-next action. Dropping it clears the
/// flag, whatever path the action took.
struct CallGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CallGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ═══════════════════════════════════════════════════════════
// QueueController
// ═══════════════════════════════════════════════════════════

pub struct QueueController<S: QueueService> {
    service: Arc<S>,
    store: Arc<Mutex<PatientStore>>,
    state: Mutex<DashboardState>,
    calling: AtomicBool,
    detached: AtomicBool,
    notifier: Notifier,
}

/// Lock, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: QueueService> QueueController<S> {
    pub fn new(service: Arc<S>, store: Arc<Mutex<PatientStore>>, notifier: Notifier) -> Self {
        Self {
            service,
            store,
            state: Mutex::new(DashboardState {
                department: DEFAULT_DEPARTMENT.to_string(),
                ..DashboardState::default()
            }),
            calling: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            notifier,
        }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    // ── Read side ───────────────────────────────────────────

    pub fn snapshot(&self) -> DashboardState {
        lock(&self.state).clone()
    }

    pub fn department(&self) -> String {
        lock(&self.state).department.clone()
    }

    pub fn current_patient(&self) -> Option<Patient> {
        lock(&self.store).current_patient().cloned()
    }

    /// Busy flag: true while a call-next request is outstanding.
    pub fn is_calling(&self) -> bool {
        self.calling.load(Ordering::Acquire)
    }

    /// Whether the call-next action is enabled.
    pub fn can_call_next(&self) -> bool {
        !self.is_calling() && !lock(&self.state).queue.is_empty()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    // ── Loading ─────────────────────────────────────────────

    /// First load after mount: restore the persisted patient, learn the
    /// department from the staff profile, then pull everything.
    pub async fn initial_load(&self) {
        lock(&self.store).load_from_storage();

        match self.service.fetch_profile().await {
            Ok(profile) => {
                let department = profile.department().to_string();
                tracing::info!(%department, staff = %profile.full_name, "Staff profile loaded");
                self.update(|state| {
                    state.department = department;
                    state.profile = Some(profile);
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load staff profile");
                self.notifier.negative(format!("Failed to load profile: {e}"));
            }
        }

        let (schedules, inventory) = tokio::join!(
            self.service.fetch_schedules(),
            self.service.fetch_inventory()
        );
        match schedules {
            Ok(rows) => self.update(|state| state.schedules = rows),
            Err(e) => tracing::warn!(error = %e, "Failed to load queue schedules"),
        }
        match inventory {
            Ok(rows) => self.update(|state| state.inventory = rows),
            Err(e) => tracing::warn!(error = %e, "Failed to load medicine inventory"),
        }

        self.refresh_all().await;
    }

    /// Re-pull the queue lists only.
    pub async fn refresh_queue(&self) {
        match self.service.fetch_queue().await {
            Ok(queue) => {
                tracing::debug!(waiting = queue.waiting_count(), "Queue refreshed");
                self.update(|state| state.queue = queue);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load queue");
                self.notifier.negative(format!("Failed to load queue: {e}"));
            }
        }
    }

    /// Re-pull queue lists, doctors, notifications and queue status.
    ///
    /// Each list replaces its predecessor whole; nothing is merged.
    pub async fn refresh_all(&self) {
        let ((), doctors, notifications, status) = tokio::join!(
            self.refresh_queue(),
            self.service.fetch_free_doctors(),
            self.service.fetch_notifications(),
            self.service.fetch_queue_status()
        );

        match doctors {
            Ok(rows) => self.update(|state| state.doctors = rows),
            Err(e) => tracing::warn!(error = %e, "Failed to load available doctors"),
        }
        match notifications {
            Ok(rows) => self.update(|state| state.notifications = rows),
            Err(e) => tracing::warn!(error = %e, "Failed to load notifications"),
        }
        match status {
            Ok(status) => self.update(|state| state.queue_status = status),
            Err(e) => tracing::warn!(error = %e, "Failed to load queue status"),
        }
    }

    // ── Call next ───────────────────────────────────────────

    /// Dequeue the next patient for this station's department.
    ///
    /// Rejected without a request when the queue is empty or a call is
    /// already in flight. The patient store changes only on success.
    pub async fn call_next_patient(&self) -> CallOutcome {
        if lock(&self.state).queue.is_empty() {
            return CallOutcome::Rejected(CallRejection::EmptyQueue);
        }
        let Some(guard) = CallGuard::try_acquire(&self.calling) else {
            tracing::debug!("Call next ignored, a call is already in flight");
            return CallOutcome::Rejected(CallRejection::Busy);
        };

        let department = self.department();
        let response = match self.service.start_processing(&department).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, %department, "{}", CALL_NEXT_FAILED);
                self.notifier
                    .negative(format!("Failed to call next patient: {e}"));
                return CallOutcome::Failed(e);
            }
        };

        if response.is_queue_empty() {
            let message = response
                .message
                .clone()
                .unwrap_or_else(|| "Queue is empty".to_string());
            drop(guard);
            self.notifier.info(message.clone());
            self.refresh_queue().await;
            return CallOutcome::NobodyWaiting { message };
        }

        let current_serving = response.current_serving_label();
        let stored = {
            let mut store = lock(&self.store);
            store
                .set_current_patient(response.patient_payload())
                .map(|()| store.current_patient().cloned())
        };
        self.update(|state| state.current_serving = current_serving.clone());
        drop(guard);

        let outcome = match stored {
            Ok(patient) => {
                tracing::info!(
                    %department,
                    current_serving = current_serving.as_deref().unwrap_or("-"),
                    "Now serving"
                );
                let label = current_serving
                    .as_deref()
                    .map(|n| format!("Now serving #{n}"))
                    .unwrap_or_else(|| "Next patient called".to_string());
                self.notifier.positive(label);
                CallOutcome::Called {
                    patient,
                    current_serving,
                }
            }
            Err(e) => {
                self.notifier
                    .negative(format!("Patient called but could not be saved locally: {e}"));
                CallOutcome::PersistFailed(e)
            }
        };

        self.refresh_queue().await;
        outcome
    }

    // ── Teardown ────────────────────────────────────────────

    /// Stop applying pulled lists. In-flight requests are not aborted;
    /// their list results are dropped when they land.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
        tracing::debug!("Queue controller detached");
    }

    /// Apply a change to the view state unless the view is gone.
    fn update(&self, f: impl FnOnce(&mut DashboardState)) {
        if self.is_detached() {
            tracing::debug!("Dropping late update after teardown");
            return;
        }
        f(&mut lock(&self.state));
    }
}
