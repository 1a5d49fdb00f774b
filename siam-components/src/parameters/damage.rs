//! Damage and carbon-price parameters.
//!
//! The damage-function regime is a closed set: each variant carries its own
//! coefficient record and its own forward/derivative pair, dispatched by
//! pattern match. The two regimes share nothing beyond the common
//! temperature-in, fraction-out shape.

use serde::{Deserialize, Serialize};
use siam_core::errors::{SiamError, SiamResult};
use siam_core::timeseries::FloatValue;

/// Coefficients of the tipping-point damage function.
///
/// Two power-law terms produce a soft response at moderate warming and an
/// accelerating, catastrophic response beyond a threshold:
///
/// $$ d(T) = (T / a_1)^{a_2} + (T / a_3)^{a_4}, \qquad
///    f(T) = 1 - \frac{1}{1 + d(T)} $$
///
/// The fraction is monotonically increasing in T and asymptotic to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TippingPointParameters {
    /// Temperature scale of the slow power term
    /// unit: degC
    /// default: 20.46
    #[serde(default = "defaults::tp_a1")]
    pub a1: FloatValue,
    /// Exponent of the slow power term
    /// unit: dimensionless
    /// default: 2.0
    #[serde(default = "defaults::tp_a2")]
    pub a2: FloatValue,
    /// Temperature scale of the steep power term
    /// unit: degC
    /// default: 6.081
    #[serde(default = "defaults::tp_a3")]
    pub a3: FloatValue,
    /// Exponent of the steep power term
    /// unit: dimensionless
    /// default: 6.754
    #[serde(default = "defaults::tp_a4")]
    pub a4: FloatValue,
}

impl Default for TippingPointParameters {
    fn default() -> Self {
        Self {
            a1: defaults::tp_a1(),
            a2: defaults::tp_a2(),
            a3: defaults::tp_a3(),
            a4: defaults::tp_a4(),
        }
    }
}

/// Coefficients of the polynomial damage function.
///
/// A smooth, typically near-quadratic response used when tipping dynamics
/// are not desired:
///
/// $$ f(T) = c_{int} \cdot T + c_{quad} \cdot T^{c_{expo}} $$
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolynomialParameters {
    /// Linear coefficient
    /// unit: 1/degC
    /// default: 0.0
    #[serde(default = "defaults::damag_int")]
    pub intercept: FloatValue,
    /// Coefficient of the power term
    /// unit: degC^-exponent
    /// default: 0.0022
    #[serde(default = "defaults::damag_quad")]
    pub quadratic: FloatValue,
    /// Exponent of the power term
    /// unit: dimensionless
    /// default: 2.0
    #[serde(default = "defaults::damag_expo")]
    pub exponent: FloatValue,
}

impl Default for PolynomialParameters {
    fn default() -> Self {
        Self {
            intercept: defaults::damag_int(),
            quadratic: defaults::damag_quad(),
            exponent: defaults::damag_expo(),
        }
    }
}

/// Damage-function regime.
///
/// Serialized with the variant as the tag, so a configuration selects the
/// regime explicitly; an out-of-set regime name fails deserialization with
/// the accepted variants listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageFunction {
    /// Accelerating two-power-term response modelling catastrophic risk.
    TippingPoint(TippingPointParameters),
    /// Smooth polynomial response.
    Polynomial(PolynomialParameters),
}

impl DamageFunction {
    pub fn validate(&self) -> SiamResult<()> {
        match self {
            DamageFunction::TippingPoint(p) => {
                if p.a1 <= 0.0 || p.a3 <= 0.0 {
                    return Err(SiamError::InvalidParameter {
                        parameter: "damage_function.tipping_point".to_string(),
                        message: format!(
                            "temperature scales a1 and a3 must be strictly positive, got a1={} a3={}",
                            p.a1, p.a3
                        ),
                    });
                }
                if p.a2 < 1.0 || p.a4 < 1.0 {
                    return Err(SiamError::InvalidParameter {
                        parameter: "damage_function.tipping_point".to_string(),
                        message: format!(
                            "exponents a2 and a4 must be >= 1 so the slope stays finite at T=0, got a2={} a4={}",
                            p.a2, p.a4
                        ),
                    });
                }
                Ok(())
            }
            DamageFunction::Polynomial(p) => {
                if p.exponent < 1.0 {
                    return Err(SiamError::InvalidParameter {
                        parameter: "damage_function.polynomial".to_string(),
                        message: format!(
                            "exponent must be >= 1 so the slope stays finite at T=0, got {}",
                            p.exponent
                        ),
                    });
                }
                Ok(())
            }
        }
    }

    /// Damage fraction of output at a single (clipped, non-negative)
    /// temperature.
    pub fn fraction(&self, temperature: FloatValue) -> FloatValue {
        match self {
            DamageFunction::TippingPoint(p) => {
                let damage =
                    (temperature / p.a1).powf(p.a2) + (temperature / p.a3).powf(p.a4);
                1.0 - 1.0 / (1.0 + damage)
            }
            DamageFunction::Polynomial(p) => {
                p.intercept * temperature + p.quadratic * temperature.powf(p.exponent)
            }
        }
    }

    /// Slope d(fraction)/d(temperature) at a single temperature.
    ///
    /// The tipping-point slope is guarded on the *unclipped* temperature:
    /// below zero the forward clip makes the fraction constant, so the
    /// slope is exactly zero. For T >= 0 the quotient-rule derivative is
    /// evaluated in the non-singular form
    /// g'(T) = (a2/a1)(T/a1)^(a2-1) + (a4/a3)(T/a3)^(a4-1),
    /// d(fraction)/dT = g'(T) / (1 + g(T))^2,
    /// which agrees with the T-divided form everywhere it is defined and
    /// takes the correct limit at T = 0.
    pub fn slope(&self, temperature: FloatValue) -> FloatValue {
        match self {
            DamageFunction::TippingPoint(p) => {
                if temperature < 0.0 {
                    return 0.0;
                }
                let damage =
                    (temperature / p.a1).powf(p.a2) + (temperature / p.a3).powf(p.a4);
                let damage_slope = p.a2 / p.a1 * (temperature / p.a1).powf(p.a2 - 1.0)
                    + p.a4 / p.a3 * (temperature / p.a3).powf(p.a4 - 1.0);
                damage_slope / (1.0 + damage).powi(2)
            }
            DamageFunction::Polynomial(p) => {
                p.intercept
                    + p.quadratic * p.exponent * temperature.powf(p.exponent - 1.0)
            }
        }
    }
}

/// Parameters of the damage-fraction model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DamageParameters {
    /// Damage-function regime and coefficients; required, never defaulted.
    pub damage_function: DamageFunction,
    /// Fraction of the damage applied to productivity rather than output
    /// unit: dimensionless
    /// default: 0.3
    #[serde(default = "defaults::frac_damage_prod")]
    pub frac_damage_prod: FloatValue,
}

impl DamageParameters {
    pub fn validate(&self) -> SiamResult<()> {
        self.damage_function.validate()?;
        if !(0.0..=1.0).contains(&self.frac_damage_prod) {
            return Err(SiamError::InvalidParameter {
                parameter: "frac_damage_prod".to_string(),
                message: format!("must lie in [0, 1], got {}", self.frac_damage_prod),
            });
        }
        Ok(())
    }
}

/// Parameters of the cumulative CO2-damage-price model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CarbonPriceParameters {
    /// CO2 damage price at the start of the horizon, anchoring the
    /// cumulative price series
    /// unit: $/tCO2Eq
    /// default: 0.0
    #[serde(default)]
    pub init_co2_damage_price: FloatValue,
    /// Scale applied to the damage price inside the tax constraint
    /// (compliance requires tax >= factor * damage price)
    /// unit: dimensionless
    /// default: 1.0
    #[serde(default = "defaults::damage_constraint_factor")]
    pub damage_constraint_factor: FloatValue,
}

impl Default for CarbonPriceParameters {
    fn default() -> Self {
        Self {
            init_co2_damage_price: 0.0,
            damage_constraint_factor: defaults::damage_constraint_factor(),
        }
    }
}

/// A (temperature, fraction) interpolation table for the tabular damage
/// alternative.
///
/// Nodes must be strictly ascending in temperature and there must be at
/// least two of them. Between nodes the fraction is linear; outside the
/// table it is clamped to the end values (slope zero).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<(FloatValue, FloatValue)>",
    into = "Vec<(FloatValue, FloatValue)>"
)]
pub struct DamageTable {
    nodes: Vec<(FloatValue, FloatValue)>,
}

impl DamageTable {
    pub fn new(nodes: Vec<(FloatValue, FloatValue)>) -> SiamResult<Self> {
        if nodes.len() < 2 {
            return Err(SiamError::InvalidParameter {
                parameter: "damage_table".to_string(),
                message: format!("needs at least two nodes, got {}", nodes.len()),
            });
        }
        for window in nodes.windows(2) {
            if window[1].0 <= window[0].0 {
                return Err(SiamError::InvalidParameter {
                    parameter: "damage_table".to_string(),
                    message: format!(
                        "temperatures must be strictly ascending, got {} after {}",
                        window[1].0, window[0].0
                    ),
                });
            }
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[(FloatValue, FloatValue)] {
        &self.nodes
    }

    /// Index of the segment [t_i, t_{i+1}) containing `temperature`, if it
    /// lies inside the table.
    fn segment(&self, temperature: FloatValue) -> Option<usize> {
        let first = self.nodes[0].0;
        let last = self.nodes[self.nodes.len() - 1].0;
        if temperature < first || temperature >= last {
            return None;
        }
        Some(
            self.nodes
                .partition_point(|node| node.0 <= temperature)
                .saturating_sub(1),
        )
    }

    /// Interpolated damage fraction, clamped to the end values outside the
    /// table.
    pub fn fraction(&self, temperature: FloatValue) -> FloatValue {
        match self.segment(temperature) {
            Some(i) => {
                let (t0, f0) = self.nodes[i];
                let (t1, f1) = self.nodes[i + 1];
                f0 + (temperature - t0) * (f1 - f0) / (t1 - t0)
            }
            None => {
                if temperature < self.nodes[0].0 {
                    self.nodes[0].1
                } else {
                    self.nodes[self.nodes.len() - 1].1
                }
            }
        }
    }

    /// Slope of the segment containing `temperature`; exactly zero in the
    /// clamped regions outside the table.
    pub fn slope(&self, temperature: FloatValue) -> FloatValue {
        match self.segment(temperature) {
            Some(i) => {
                let (t0, f0) = self.nodes[i];
                let (t1, f1) = self.nodes[i + 1];
                (f1 - f0) / (t1 - t0)
            }
            None => 0.0,
        }
    }
}

impl TryFrom<Vec<(FloatValue, FloatValue)>> for DamageTable {
    type Error = SiamError;

    fn try_from(nodes: Vec<(FloatValue, FloatValue)>) -> Result<Self, Self::Error> {
        Self::new(nodes)
    }
}

impl From<DamageTable> for Vec<(FloatValue, FloatValue)> {
    fn from(table: DamageTable) -> Self {
        table.nodes
    }
}

mod defaults {
    use siam_core::timeseries::FloatValue;

    pub fn tp_a1() -> FloatValue {
        20.46
    }
    pub fn tp_a2() -> FloatValue {
        2.0
    }
    pub fn tp_a3() -> FloatValue {
        6.081
    }
    pub fn tp_a4() -> FloatValue {
        6.754
    }
    pub fn damag_int() -> FloatValue {
        0.0
    }
    pub fn damag_quad() -> FloatValue {
        0.0022
    }
    pub fn damag_expo() -> FloatValue {
        2.0
    }
    pub fn frac_damage_prod() -> FloatValue {
        0.3
    }
    pub fn damage_constraint_factor() -> FloatValue {
        1.0
    }
}
