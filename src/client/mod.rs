//! HTTP client module for the management API.

pub mod api;

pub use api::ManagerClient;
