//! Client-side session state.
//!
//! DESIGN
//! ======
//! `auth` defines the persisted session record and the published snapshot,
//! `channel` the replaying broadcast primitive, `session` the coordinator
//! that ties them to durable storage, and `guard` the route decisions that
//! consume the published state.

pub mod auth;
pub mod channel;
pub mod guard;
pub mod session;
