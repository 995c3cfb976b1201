//! # wellness-session
//!
//! Client-side session layer for the wellness tracker: login, registration,
//! token persistence and reactive broadcast of auth status to the UI
//! fragments (header, route guards) that depend on it.
//!
//! The crate is split the same way the UI consumes it: `state` holds the
//! session coordinator and its published channels, `net` the backend DTOs,
//! error shapes and HTTP client, `util` the durable key-value stores, and
//! `services` the user-facing auth flows built on top of both.

pub mod config;
pub mod context;
pub mod net;
pub mod services;
pub mod state;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
