//! Core library for the permit-application portal backend.
//!
//! The interesting machinery lives under [`workflows`]: the document
//! acceptance lifecycle engine with its working-day deadline arithmetic, and
//! the geospatial pipeline that validates submitted lot boundaries and
//! detects overlaps with previously approved ones.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
