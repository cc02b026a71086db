//! Optional HTTP surface for the extraction pipeline (feature "api")

pub mod server;

pub use server::{start_http_server, AppState};
