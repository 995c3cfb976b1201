//! User-facing flows built on the session coordinator and backend client.

pub mod auth;
