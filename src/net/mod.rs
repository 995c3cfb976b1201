//! Network-facing types and the backend HTTP client.
//!
//! DESIGN
//! ======
//! `types` mirrors the backend's JSON payloads, `error` turns the backend's
//! loosely shaped error bodies into a closed set of variants, and `api`
//! performs the requests behind the [`api::AuthApi`] trait so the session
//! coordinator can be exercised without a server.

pub mod api;
pub mod error;
pub mod types;
