//! facematch-client: face service adapter.
//!
//! Submits images for detection by URL or as an uploaded byte stream and
//! answers similarity queries, all through the Face API v1.0 REST surface.

pub mod client;
mod wire;

pub use client::{normalize_endpoint, ClientConfig, FaceClient, ServiceError};
