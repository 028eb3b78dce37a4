//! Nurse dashboard: queue controller plus its push channel.

pub mod controller;
pub mod push;

use std::sync::Arc;

pub use controller::{CallOutcome, CallRejection, DashboardState, QueueController};
pub use push::{channel_url, ChangeListener, ChangeSignal, PushChannel, PushError};

use crate::api::QueueService;
use crate::config::ClientConfig;

/// A mounted dashboard. Lives from mount to unmount.
pub struct NurseDashboard<S: QueueService> {
    controller: Arc<QueueController<S>>,
    push: Option<PushChannel>,
}

impl<S: QueueService> NurseDashboard<S> {
    /// Load everything, then subscribe to the department's queue channel.
    ///
    /// The dashboard works without the channel (lists only refresh on
    /// user action), so a failed subscription is logged, not returned.
    pub async fn mount(
        controller: Arc<QueueController<S>>,
        config: &ClientConfig,
        token: Option<&str>,
    ) -> Self {
        controller.initial_load().await;

        let department = controller.department();
        let push = match channel_url(config, &department, token) {
            Ok(url) => match PushChannel::open(&url, controller.clone()).await {
                Ok(channel) => Some(channel),
                Err(e) => {
                    tracing::warn!(error = %e, %department, "Queue updates unavailable");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Cannot build queue channel URL");
                None
            }
        };

        Self { controller, push }
    }

    pub fn controller(&self) -> &Arc<QueueController<S>> {
        &self.controller
    }

    pub fn has_push(&self) -> bool {
        self.push.as_ref().is_some_and(PushChannel::is_open)
    }

    /// Close the channel and stop applying late results.
    pub async fn unmount(mut self) {
        self.controller.detach();
        if let Some(push) = self.push.take() {
            push.close().await;
        }
    }
}
