//! Utility helpers shared across the session layer.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate platform concerns (browser storage, files on disk)
//! from the coordinator logic so the latter stays testable natively.

pub mod storage;
