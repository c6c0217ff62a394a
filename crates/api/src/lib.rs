//! HTTP API layer for the session billing service.

pub mod extractors;
pub mod requests;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
