//! Core primitives shared by every granary subsystem.
//!
//! The store handle, the broker (serialized DB access + audit log), the
//! consolidated schema, and the money/time helpers all live here.

pub mod broker;
pub mod db;
pub mod error;
pub mod money;
pub mod schemas;
pub mod store;
pub mod time;
