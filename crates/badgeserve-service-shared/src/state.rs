//! Application state shared by the axum handlers.

use std::sync::Arc;

use badgeserve_lib::{Dispatcher, InstanceMetadata, ValidatedConfig};
use chrono::{DateTime, Utc};

/// Shared application state for all axum handlers.
///
/// Cheaply cloneable; everything behind it is immutable once the server is
/// built.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    dispatcher: Dispatcher,
    instance: InstanceMetadata,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, instance: InstanceMetadata) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                dispatcher,
                instance,
                started_at: Utc::now(),
            }),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn config(&self) -> &ValidatedConfig {
        self.inner.dispatcher.config()
    }

    pub fn instance(&self) -> &InstanceMetadata {
        &self.inner.instance
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("instance_id", &self.inner.instance.id)
            .field("renderers", &self.inner.dispatcher.registry().len())
            .field("started_at", &self.inner.started_at)
            .finish()
    }
}
