//! ABOUTME: axum HTTP API over the job `Repository` (§6.1) plus the binary's wiring helpers
//! ABOUTME: Split out as a library so integration tests can drive `build_app` directly via `tower::ServiceExt::oneshot`

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod wiring;

pub use server::build_app;
pub use state::AppState;
