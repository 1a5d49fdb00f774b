//! CO2 damage pricing.
//!
//! Converts monetized climate damages into a carbon price signal in two
//! steps:
//!
//! 1. [`ExtraTonPriceModel`] prices one excess ton of CO2-equivalent:
//!    the year's damages divided by the excess greenhouse-gas stock above
//!    the pre-industrial baseline,
//!    $$ p_t = 10^3 \cdot \frac{D_t}{G_t} $$
//!    with damages in T\$ and the stock in Gt, giving \$/tCO2Eq
//!    (the 10³ is 10¹² \$/T\$ over 10⁹ t/Gt).
//! 2. [`Co2DamagePriceModel`] integrates that flow into a cumulative
//!    price anchored at an initial value, and derives the policy
//!    constraint `tax - factor * cumulative price` whose sign bounds the
//!    optimizer's tax path.
//!
//! The per-ton relation is year-local (diagonal Jacobians); the prefix
//! sum is the one genuinely inter-year coupling in this chain, with a
//! lower-triangular-of-ones derivative.

use crate::parameters::CarbonPriceParameters;
use ndarray::Array1;
use siam_core::errors::{SiamError, SiamResult};
use siam_core::jacobian::{self, Jacobian};
use siam_core::timeseries::{FloatValue, TimeAxis, Timeseries};
use std::sync::Arc;

/// T$ of damages per Gt of excess stock expressed as $/tCO2Eq.
const PRICE_UNIT_FACTOR: FloatValue = 1e12 * 1e-9;

/// Marginal damage price per excess ton of CO2-equivalent.
///
/// Two-phase protocol: `compute` stores damages and excess stock, the
/// Jacobian accessors reuse them.
#[derive(Debug, Clone)]
pub struct ExtraTonPriceModel {
    time_axis: Arc<TimeAxis>,
    damages: Option<Array1<FloatValue>>,
    excess_ghg: Option<Array1<FloatValue>>,
}

impl ExtraTonPriceModel {
    pub fn new(time_axis: Arc<TimeAxis>) -> Self {
        Self {
            time_axis,
            damages: None,
            excess_ghg: None,
        }
    }

    pub fn time_axis(&self) -> &Arc<TimeAxis> {
        &self.time_axis
    }

    /// Price per excess ton from damages (T$) and the excess CO2-equivalent
    /// stock since pre-industrial (Gt).
    ///
    /// The stock must be strictly positive everywhere: a zero or negative
    /// excess makes the price undefined, and this fails loudly instead of
    /// propagating an infinity into the fixed-point solve.
    pub fn compute(
        &mut self,
        damages: &Timeseries,
        excess_ghg: &Timeseries,
    ) -> SiamResult<Timeseries> {
        damages.ensure_aligned(&self.time_axis, "damages")?;
        excess_ghg.ensure_aligned(&self.time_axis, "excess_ghg")?;

        for (index, &stock) in excess_ghg.values().iter().enumerate() {
            if stock <= 0.0 {
                return Err(SiamError::NumericalDomain {
                    context: "extra-ton damage price".to_string(),
                    message: format!(
                        "excess CO2eq stock must be strictly positive, got {} Gt in year {}",
                        stock,
                        self.time_axis.years()[index]
                    ),
                });
            }
        }

        let price = damages.values() / excess_ghg.values() * PRICE_UNIT_FACTOR;
        self.damages = Some(damages.values().clone());
        self.excess_ghg = Some(excess_ghg.values().clone());
        Timeseries::new(price, Arc::clone(&self.time_axis), "$/tCO2Eq")
    }

    /// Diagonal Jacobian d(price)/d(damages) = diag(1e3 / excess).
    pub fn damages_jacobian(&self) -> SiamResult<Jacobian> {
        let excess = self.excess_ghg.as_ref().ok_or_else(|| self.missing_state())?;
        Ok(jacobian::diagonal(&excess.mapv(|g| PRICE_UNIT_FACTOR / g)))
    }

    /// Diagonal Jacobian d(price)/d(excess) = diag(-1e3 · damages / excess²).
    pub fn excess_ghg_jacobian(&self) -> SiamResult<Jacobian> {
        let damages = self.damages.as_ref().ok_or_else(|| self.missing_state())?;
        let excess = self.excess_ghg.as_ref().ok_or_else(|| self.missing_state())?;
        let slopes = damages
            .iter()
            .zip(excess.iter())
            .map(|(&d, &g)| -PRICE_UNIT_FACTOR * d / (g * g))
            .collect();
        Ok(jacobian::diagonal(&slopes))
    }

    fn missing_state(&self) -> SiamError {
        SiamError::GradientBeforeCompute {
            component: "ExtraTonPriceModel".to_string(),
        }
    }
}

/// Cumulative CO2 damage price and the tax-compliance constraint.
///
/// The cumulative price is the running integral of the extra-ton flow,
/// anchored at the configured initial value. Both Jacobians here are
/// constant in the inputs, so this model is stateless and its accessors
/// are valid at any time.
#[derive(Debug, Clone)]
pub struct Co2DamagePriceModel {
    parameters: CarbonPriceParameters,
    time_axis: Arc<TimeAxis>,
}

impl Co2DamagePriceModel {
    pub fn from_parameters(
        parameters: CarbonPriceParameters,
        time_axis: Arc<TimeAxis>,
    ) -> Self {
        Self {
            parameters,
            time_axis,
        }
    }

    pub fn parameters(&self) -> &CarbonPriceParameters {
        &self.parameters
    }

    /// Cumulative price: anchor + running sum of the extra-ton price.
    pub fn compute(&self, extra_ton_price: &Timeseries) -> SiamResult<Timeseries> {
        extra_ton_price.ensure_aligned(&self.time_axis, "extra_ton_price")?;
        let cumulative = extra_ton_price.cumsum();
        cumulative
            .with_values(cumulative.values() + self.parameters.init_co2_damage_price)
    }

    /// d(cumulative price)/d(extra-ton price): lower triangular, all ones.
    pub fn extra_ton_price_jacobian(&self) -> Jacobian {
        jacobian::lower_triangular_ones(self.time_axis.len())
    }

    /// Chain an upstream derivative of the extra-ton price through the
    /// prefix sum: tril(1) · upstream.
    pub fn chain_to_user_input(&self, upstream: &Jacobian) -> SiamResult<Jacobian> {
        if upstream.nrows() != self.time_axis.len() {
            return Err(SiamError::TimeAxisMismatch {
                name: "d(extra_ton_price)/d(user input)".to_string(),
                expected: self.time_axis.describe(),
                found: format!("{} rows", upstream.nrows()),
            });
        }
        Ok(jacobian::chain(&self.extra_ton_price_jacobian(), upstream))
    }

    /// Policy constraint `tax - factor * cumulative price`; compliance
    /// requires it to stay non-negative.
    pub fn compute_tax_constraint(
        &self,
        co2_tax: &Timeseries,
        co2_damage_price: &Timeseries,
    ) -> SiamResult<Timeseries> {
        co2_tax.ensure_aligned(&self.time_axis, "co2_tax")?;
        co2_damage_price.ensure_aligned(&self.time_axis, "co2_damage_price")?;
        let factor = self.parameters.damage_constraint_factor;
        let constraint = co2_tax.values() - &(co2_damage_price.values() * factor);
        Timeseries::new(constraint, Arc::clone(&self.time_axis), "$/tCO2Eq")
    }

    /// d(constraint)/d(tax) = identity.
    pub fn tax_jacobian(&self) -> Jacobian {
        jacobian::identity(self.time_axis.len())
    }

    /// d(constraint)/d(cumulative price) = diag(-factor).
    pub fn co2_damage_price_jacobian(&self) -> Jacobian {
        let factor = self.parameters.damage_constraint_factor;
        jacobian::diagonal(&Array1::from_elem(self.time_axis.len(), -factor))
    }
}
