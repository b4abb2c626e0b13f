#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! REST endpoints for record ownership and consents, and the server bootstrap around them.

/// TOML server configuration.
#[path = "../config.rs"]
pub mod config;

/// Initial users and patient records.
#[path = "../seed.rs"]
pub mod seed;

/// HTTP error mapping.
#[path = "../error.rs"]
pub mod error;

/// Shared handler state.
#[path = "../state.rs"]
pub mod state;

/// Request handlers.
#[path = "../handlers.rs"]
pub mod handlers;

/// Route registration table.
#[path = "../routes.rs"]
pub mod routes;

/// Assembly of runtimes from configuration.
#[path = "../bootstrap.rs"]
pub mod bootstrap;

pub use bootstrap::{load_access_runtime, load_diagnosis_service, serve};
pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::{router, ROUTES};
pub use seed::SeedDocument;
pub use state::{AppState, CALLER_HEADER};
