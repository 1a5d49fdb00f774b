//! Model parameters.
//!
//! This module contains the parameter structures for all components. Each
//! struct provides defaults matching the standard policy-scenario
//! configuration and deserializes from a flat TOML table via
//! `siam_core::config`, rejecting unknown keys. Regime selectors are
//! required fields with no default: an absent or out-of-set selector fails
//! configuration loading instead of silently picking a regime.

mod damage;
mod utility;

pub use damage::{
    CarbonPriceParameters, DamageFunction, DamageParameters, DamageTable,
    PolynomialParameters, TippingPointParameters,
};
pub use utility::{UtilityParameters, WelfareObjective};
