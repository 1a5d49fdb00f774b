//! Damage-pricing and welfare-valuation components.
//!
//! This crate implements the model chain that turns a temperature path into
//! a carbon price signal and an intertemporal welfare objective:
//!
//! - `damage`: atmospheric temperature → fraction of output destroyed
//!   (tipping-point or polynomial regime, plus a tabular alternative)
//! - `carbon_price`: monetized damages and excess greenhouse-gas stock →
//!   marginal price per excess ton, integrated into a cumulative CO2 damage
//!   price and a tax-compliance constraint
//! - `utility`: net output, population and energy availability → per-capita
//!   consumption, discounted utility and the scalar welfare objectives
//!   driven by an outer optimizer
//!
//! Every model follows a strict two-phase protocol: a forward `compute`
//! call stores its inputs and intermediates, and the analytic-gradient
//! accessors reuse those intermediates. Gradients are hand-derived and are
//! kept consistent with the forward math to finite-difference precision;
//! the integration tests in `tests/` verify this on every exposed partial.
//!
//! # Parameters
//!
//! Each model has an associated parameters struct in the `parameters`
//! module with defaults matching the standard policy-scenario
//! configuration. Regime selectors (damage function, welfare objective) are
//! closed enums and must be configured explicitly.

pub mod carbon_price;
pub mod damage;
pub mod parameters;
pub mod utility;
