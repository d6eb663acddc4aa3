//! Userspace control plane of the krim kernel runtime-integrity monitor.
//!
//! Kernel-side programs report events as binary records through a perf event array. This crate
//! picks which programs to attach for the requested event kinds ([`probes`]), decodes the
//! records into typed [`events::Event`] values and hands them to a handler, by default a
//! line-delimited JSON [`sink::JsonSink`].

// region:    --- Modules

pub mod config;
pub mod controller;
mod error;
pub mod events;
pub mod handler;
pub mod probes;
pub mod runtime;
pub mod sink;
pub mod trx;

pub use self::error::{Error, Result};

// endregion: --- Modules
