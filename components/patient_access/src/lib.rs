#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Patient record ownership and consent management with per-record access checks.

/// Error taxonomy shared by every operation.
#[path = "../error.rs"]
pub mod error;

/// User identities and the directory of known users.
#[path = "../user.rs"]
pub mod user;

/// Access levels and their resolution.
#[path = "../rights.rs"]
pub mod rights;

/// Consent definitions and per-record consent state.
#[path = "../consent.rs"]
pub mod consent;

/// Patient record model.
#[path = "../record.rs"]
pub mod record;

/// Record storage.
#[path = "../repository.rs"]
pub mod repository;

/// Telemetry helpers.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Owner read and replacement.
#[path = "../owner.rs"]
pub mod owner;

/// Consent listing, granting and revoking.
#[path = "../consents.rs"]
pub mod consents;

/// High-level runtime wiring the services together.
#[path = "../main.rs"]
pub mod orchestration_entry;

pub use consent::{ConsentDefinition, ConsentRegistry, ConsentStatus, ConsentView};
pub use consents::ConsentService;
pub use error::AccessError;
pub use orchestration_entry::{AccessOptions, PatientAccessRuntime};
pub use owner::{OwnerService, OwnerSummary};
pub use record::{PatientRecord, Visibility};
pub use repository::{InMemoryPatientRepository, PatientRepository, SharedRecord};
pub use rights::{access_level, AccessLevel};
pub use telemetry::{PatientAccessTelemetry, PatientAccessTelemetryBuilder};
pub use user::{UserDirectory, UserProfile, UserRef};
