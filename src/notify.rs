//! Transient user notifications (toasts).
//!
//! Workflows publish; whatever renders the UI subscribes. Publishing with
//! no subscriber is fine: a toast nobody sees is simply dropped.

use serde::Serialize;
use tokio::sync::broadcast;

const TOAST_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Positive,
    Negative,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Toast>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(TOAST_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }

    pub fn notify(&self, kind: ToastKind, message: impl Into<String>) {
        let toast = Toast {
            kind,
            message: message.into(),
        };
        tracing::debug!(kind = ?toast.kind, message = %toast.message, "Toast");
        let _ = self.tx.send(toast);
    }

    pub fn positive(&self, message: impl Into<String>) {
        self.notify(ToastKind::Positive, message);
    }

    pub fn negative(&self, message: impl Into<String>) {
        self.notify(ToastKind::Negative, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(ToastKind::Info, message);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
