//! Climate damage fraction of economic output.
//!
//! Maps an atmospheric temperature path onto the fraction of gross output
//! destroyed each year. Two regimes are available (see
//! [`DamageFunction`]): a tipping-point formulation with two power-law
//! terms, and a smooth polynomial. A tabular alternative interpolates a
//! user-supplied (temperature, fraction) table instead.
//!
//! # Inputs
//!
//! - temperature (degC above pre-industrial), defined on exactly the
//!   configured year axis; negative excursions are clipped to zero before
//!   the damage function is applied.
//!
//! # Outputs
//!
//! - damage fraction (dimensionless share of output, not clipped to
//!   \[0, 1\] by construction)
//!
//! # Gradient
//!
//! The relation is year-local, so d(fraction)/d(temperature) is diagonal.
//! The tipping-point slope is guarded on the *unclipped* temperature:
//! strictly negative input years contribute a zero slope, matching the
//! forward clip.

use crate::parameters::{DamageParameters, DamageTable};
use log::warn;
use siam_core::errors::{SiamError, SiamResult};
use siam_core::jacobian::{self, Jacobian};
use siam_core::timeseries::{TimeAxis, Timeseries};
use std::sync::Arc;

/// Damage-fraction model with a two-phase forward/gradient protocol.
///
/// `compute` stores the (unclipped) temperature path it was given; the
/// gradient accessor reuses it. Calling the accessor before any forward
/// pass is a sequencing error.
#[derive(Debug, Clone)]
pub struct DamageFractionModel {
    parameters: DamageParameters,
    time_axis: Arc<TimeAxis>,
    temperature: Option<Timeseries>,
    damage_fraction: Option<Timeseries>,
}

impl DamageFractionModel {
    pub fn from_parameters(
        parameters: DamageParameters,
        time_axis: Arc<TimeAxis>,
    ) -> SiamResult<Self> {
        parameters.validate()?;
        Ok(Self {
            parameters,
            time_axis,
            temperature: None,
            damage_fraction: None,
        })
    }

    pub fn parameters(&self) -> &DamageParameters {
        &self.parameters
    }

    pub fn time_axis(&self) -> &Arc<TimeAxis> {
        &self.time_axis
    }

    /// Compute the damage fraction of output for a temperature path.
    ///
    /// Temperatures are clipped to zero from below first: a cooling
    /// excursion contributes no damage.
    pub fn compute(&mut self, temperature: &Timeseries) -> SiamResult<Timeseries> {
        temperature.ensure_aligned(&self.time_axis, "temperature")?;

        let clipped_years = temperature.values().iter().filter(|&&t| t < 0.0).count();
        if clipped_years > 0 {
            warn!(
                "damage fraction: clipping {} negative temperature value(s) to zero",
                clipped_years
            );
        }

        let function = &self.parameters.damage_function;
        let fraction = temperature
            .clip_min(0.0)
            .values()
            .mapv(|t| function.fraction(t));
        let fraction = Timeseries::new(fraction, Arc::clone(&self.time_axis), "-")?;

        self.temperature = Some(temperature.clone());
        self.damage_fraction = Some(fraction.clone());
        Ok(fraction)
    }

    /// Share of the damage fraction applied to productivity, as configured
    /// by `frac_damage_prod`.
    pub fn productivity_damage_fraction(&self) -> SiamResult<Timeseries> {
        let fraction = self
            .damage_fraction
            .as_ref()
            .ok_or_else(|| self.missing_state())?;
        fraction.with_values(fraction.values() * self.parameters.frac_damage_prod)
    }

    /// Diagonal Jacobian d(damage fraction)/d(temperature).
    pub fn temperature_jacobian(&self) -> SiamResult<Jacobian> {
        let temperature = self.temperature.as_ref().ok_or_else(|| self.missing_state())?;
        let function = &self.parameters.damage_function;
        let slopes = temperature.values().mapv(|t| function.slope(t));
        Ok(jacobian::diagonal(&slopes))
    }

    fn missing_state(&self) -> SiamError {
        SiamError::GradientBeforeCompute {
            component: "DamageFractionModel".to_string(),
        }
    }
}

/// Damage fraction interpolated from a (temperature, fraction) table.
///
/// A general alternative to the closed-form regimes: piecewise-linear
/// interpolation between strictly ascending table nodes, clamped to the
/// end values outside the table. The Jacobian is diagonal with the slope
/// of the segment containing each year's temperature, and exactly zero
/// beyond the table ends.
#[derive(Debug, Clone)]
pub struct TabularDamageModel {
    table: DamageTable,
    time_axis: Arc<TimeAxis>,
    temperature: Option<Timeseries>,
}

impl TabularDamageModel {
    pub fn from_table(table: DamageTable, time_axis: Arc<TimeAxis>) -> Self {
        Self {
            table,
            time_axis,
            temperature: None,
        }
    }

    pub fn table(&self) -> &DamageTable {
        &self.table
    }

    pub fn compute(&mut self, temperature: &Timeseries) -> SiamResult<Timeseries> {
        temperature.ensure_aligned(&self.time_axis, "temperature")?;
        let fraction = temperature.values().mapv(|t| self.table.fraction(t));
        self.temperature = Some(temperature.clone());
        Timeseries::new(fraction, Arc::clone(&self.time_axis), "-")
    }

    pub fn temperature_jacobian(&self) -> SiamResult<Jacobian> {
        let temperature = self.temperature.as_ref().ok_or_else(|| {
            SiamError::GradientBeforeCompute {
                component: "TabularDamageModel".to_string(),
            }
        })?;
        let slopes = temperature.values().mapv(|t| self.table.slope(t));
        Ok(jacobian::diagonal(&slopes))
    }
}
