//! Access to the Wind terminal SDK through the Windows-side bridge process.

pub mod api;
pub mod client;
pub mod error;
pub mod models;

pub use api::WindApi;
pub use client::WindBridgeClient;
pub use error::WindError;
pub use models::{WindCall, WindData};
