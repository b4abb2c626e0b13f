use std::sync::Arc;

use axum::http::HeaderMap;
use phenotips_patient_access::{PatientAccessRuntime, UserRef};

/// Header carrying the already authenticated caller's username.
pub const CALLER_HEADER: &str = "x-remote-user";

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    access: Arc<PatientAccessRuntime>,
}

impl AppState {
    /// Wraps the access runtime.
    #[must_use]
    pub fn new(access: PatientAccessRuntime) -> Self {
        Self {
            access: Arc::new(access),
        }
    }

    /// The access runtime.
    #[must_use]
    pub fn access(&self) -> &PatientAccessRuntime {
        &self.access
    }

    /// Caller named by [`CALLER_HEADER`]; absent, unreadable or unknown names are anonymous.
    #[must_use]
    pub fn caller(&self, headers: &HeaderMap) -> Option<UserRef> {
        let raw = headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok());
        self.access.identify(raw)
    }
}
