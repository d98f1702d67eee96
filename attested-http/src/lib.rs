//! HTTP transport for the attested login request.
//!
//! ## Wire Contract
//! 1. Send GET (or POST) to the configured server URL
//! 2. Attach the attestation token as `ApproovToken: <token>`
//! 3. HTTP 200 with a text body: the body is the shape name
//! 4. Anything else, including transport errors: authorisation failure

pub mod client;
pub mod config;
pub mod response;

pub use client::{HttpDispatcher, HttpError};
pub use config::{DispatcherConfig, LoginMethod};
pub use response::classify;
