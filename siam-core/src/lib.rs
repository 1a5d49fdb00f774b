//! Core plumbing for simple integrated assessment models.
//!
//! This crate provides the shared building blocks that every model in the
//! damage-pricing and welfare-valuation chain is built on:
//!
//! - [`timeseries`]: a validated integer year axis and year-indexed series.
//!   All model inputs and outputs are aligned by year label, never by
//!   positional offset, and misaligned series are rejected before any
//!   numeric work happens.
//! - [`jacobian`]: dense derivative matrices and the three structures the
//!   chain needs (diagonal, lower-triangular prefix sum, chained
//!   composition).
//! - [`config`]: flat TOML parameter tables deserialized into strongly
//!   typed parameter structs, failing fast on unknown or missing keys.
//! - [`errors`]: the error taxonomy shared across the workspace.
//! - [`utils`]: numerical helpers, including the central-difference
//!   verification kernel used to cross-check analytic Jacobians.

pub mod config;
pub mod errors;
pub mod jacobian;
pub mod timeseries;
pub mod utils;
