//! Consumption, utility and welfare valuation.
//!
//! Turns net economic output, population and energy availability into the
//! discounted intertemporal welfare objective driven by an outer
//! optimizer.
//!
//! # Forward chain
//!
//! With years indexed by t (Δt years after the start year):
//!
//! ```text
//! investment_t   = net_output_t * share_t / 100
//! consumption_t  = max(net_output_t - investment_t, lo_conso)            (T$)
//! pc_conso_t     = max(1000 * consumption_t / population_t,
//!                      lo_per_capita_conso)                              (k$)
//! discount_t     = (1 + init_rate_time_pref)^-Δt
//! energy_ratio_t = initial_raw_energy_price / energy_price_t
//! resid_ratio_t  = residential_energy_t / residential_energy_conso_ref
//! base_utility_t = (pc_conso_t^(1-ε) - 1) / (1 - ε)
//! period_utility_t = base_utility_t * energy_ratio_t * resid_ratio_t
//! discounted_utility_t = period_utility_t * discount_t * population_t / 1000
//! welfare        = Σ_t discounted_utility_t
//! ```
//!
//! The energy ratios penalize utility when energy is expensive or
//! residential consumption is below its reference; the floors keep the
//! CRRA transform defined.
//!
//! # Gradients
//!
//! Discounting is year-local, so every base partial is diagonal; only the
//! scalar objectives collapse the series into a 1×N row. Years where a
//! floor clamp engages contribute exactly-zero rows on the clamped path.

use crate::parameters::{UtilityParameters, WelfareObjective};
use log::debug;
use ndarray::{Array1, Zip};
use siam_core::errors::{SiamError, SiamResult};
use siam_core::jacobian::{self, Jacobian};
use siam_core::timeseries::{FloatValue, TimeAxis, Timeseries};
use std::sync::Arc;

/// The five coupling inputs of the consumption/utility model.
#[derive(Debug, Clone)]
pub struct UtilityInputs {
    /// Output net of damages
    /// unit: T$
    pub net_output: Timeseries,
    /// Population
    /// unit: millions
    pub population: Timeseries,
    /// Share of output invested rather than consumed
    /// unit: %
    pub investment_share: Timeseries,
    /// Mean energy price
    /// unit: $/MWh
    pub energy_price: Timeseries,
    /// Per-capita residential energy consumption
    /// unit: MWh
    pub residential_energy: Timeseries,
}

impl UtilityInputs {
    fn ensure_aligned(&self, axis: &TimeAxis) -> SiamResult<()> {
        self.net_output.ensure_aligned(axis, "net_output")?;
        self.population.ensure_aligned(axis, "population")?;
        self.investment_share
            .ensure_aligned(axis, "investment_share")?;
        self.energy_price.ensure_aligned(axis, "energy_price")?;
        self.residential_energy
            .ensure_aligned(axis, "residential_energy")?;
        Ok(())
    }
}

/// Input dimension keying a requested Jacobian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtilityInputVariable {
    NetOutput,
    InvestmentShare,
    Population,
    EnergyPrice,
    ResidentialEnergy,
}

impl UtilityInputVariable {
    pub const ALL: [UtilityInputVariable; 5] = [
        UtilityInputVariable::NetOutput,
        UtilityInputVariable::InvestmentShare,
        UtilityInputVariable::Population,
        UtilityInputVariable::EnergyPrice,
        UtilityInputVariable::ResidentialEnergy,
    ];
}

/// Per-year detail plus the scalar welfare aggregate.
#[derive(Debug, Clone)]
pub struct UtilityOutput {
    pub consumption: Timeseries,
    pub per_capita_consumption: Timeseries,
    pub discount_factor: Timeseries,
    pub period_utility: Timeseries,
    pub discounted_utility: Timeseries,
    /// Running sum of discounted utility; reporting detail, not a
    /// differentiable output.
    pub welfare_cumulant: Timeseries,
    pub welfare: FloatValue,
}

/// Intermediates stored by the forward pass for the gradient accessors.
#[derive(Debug, Clone)]
struct UtilityState {
    net_output: Array1<FloatValue>,
    population: Array1<FloatValue>,
    investment_share: Array1<FloatValue>,
    energy_price: Array1<FloatValue>,
    consumption: Array1<FloatValue>,
    pc_consumption: Array1<FloatValue>,
    /// 1.0 where the consumption floor did not engage, 0.0 where it did.
    conso_free: Array1<FloatValue>,
    /// 1.0 where the per-capita floor did not engage, 0.0 where it did.
    pc_free: Array1<FloatValue>,
    base_utility: Array1<FloatValue>,
    energy_ratio: Array1<FloatValue>,
    resid_ratio: Array1<FloatValue>,
    period_utility: Array1<FloatValue>,
    discount_factor: Array1<FloatValue>,
    discounted_utility: Array1<FloatValue>,
    welfare: FloatValue,
}

/// Consumption/utility model with a two-phase forward/gradient protocol.
#[derive(Debug, Clone)]
pub struct ConsumptionUtilityModel {
    parameters: UtilityParameters,
    time_axis: Arc<TimeAxis>,
    state: Option<UtilityState>,
}

impl ConsumptionUtilityModel {
    pub fn from_parameters(
        parameters: UtilityParameters,
        time_axis: Arc<TimeAxis>,
    ) -> SiamResult<Self> {
        parameters.validate()?;
        Ok(Self {
            parameters,
            time_axis,
            state: None,
        })
    }

    pub fn parameters(&self) -> &UtilityParameters {
        &self.parameters
    }

    pub fn time_axis(&self) -> &Arc<TimeAxis> {
        &self.time_axis
    }

    /// Forward pass: consumption, utility, discounting and welfare.
    pub fn compute(&mut self, inputs: &UtilityInputs) -> SiamResult<UtilityOutput> {
        inputs.ensure_aligned(&self.time_axis)?;
        let p = &self.parameters;
        let years = self.time_axis.years();

        let net_output = inputs.net_output.values();
        let population = inputs.population.values();
        let share = inputs.investment_share.values();
        let energy_price = inputs.energy_price.values();
        let residential_energy = inputs.residential_energy.values();

        for (index, &pop) in population.iter().enumerate() {
            if pop <= 0.0 {
                return Err(SiamError::NumericalDomain {
                    context: "per-capita consumption".to_string(),
                    message: format!(
                        "population must be strictly positive, got {} million in year {}",
                        pop, years[index]
                    ),
                });
            }
        }
        for (index, &price) in energy_price.iter().enumerate() {
            if price <= 0.0 {
                return Err(SiamError::NumericalDomain {
                    context: "energy price ratio".to_string(),
                    message: format!(
                        "energy price must be strictly positive, got {} $/MWh in year {}",
                        price, years[index]
                    ),
                });
            }
        }

        let raw_consumption =
            Zip::from(net_output)
                .and(share)
                .map_collect(|&output, &s| output * (1.0 - s / 100.0));
        let conso_free = raw_consumption.mapv(|c| if c > p.lo_conso { 1.0 } else { 0.0 });
        let consumption = raw_consumption.mapv(|c| c.max(p.lo_conso));

        let raw_pc = Zip::from(&consumption)
            .and(population)
            .map_collect(|&c, &pop| 1000.0 * c / pop);
        let pc_free = raw_pc.mapv(|c| if c > p.lo_per_capita_conso { 1.0 } else { 0.0 });
        let pc_consumption = raw_pc.mapv(|c| c.max(p.lo_per_capita_conso));

        let floored =
            conso_free.iter().filter(|&&m| m == 0.0).count()
                + pc_free.iter().filter(|&&m| m == 0.0).count();
        if floored > 0 {
            debug!(
                "consumption floors engaged in {} year-path combination(s)",
                floored
            );
        }

        let elasticity = p.conso_elasticity;
        let base_utility = pc_consumption
            .mapv(|c| (c.powf(1.0 - elasticity) - 1.0) / (1.0 - elasticity));
        let energy_ratio = energy_price.mapv(|price| p.initial_raw_energy_price / price);
        let resid_ratio =
            residential_energy.mapv(|e| e / p.residential_energy_conso_ref);
        let period_utility = Zip::from(&base_utility)
            .and(&energy_ratio)
            .and(&resid_ratio)
            .map_collect(|&u, &er, &rr| u * er * rr);

        let rate = p.init_rate_time_pref;
        let discount_factor = Array1::from_shape_fn(self.time_axis.len(), |i| {
            (1.0 + rate).powf(-(self.time_axis.offset_from_start(i) as FloatValue))
        });
        let discounted_utility = Zip::from(&period_utility)
            .and(&discount_factor)
            .and(population)
            .map_collect(|&u, &f, &pop| u * f * pop / 1000.0);

        let mut total = 0.0;
        let welfare_cumulant = discounted_utility.mapv(|d| {
            total += d;
            total
        });
        let welfare = total;

        self.state = Some(UtilityState {
            net_output: net_output.clone(),
            population: population.clone(),
            investment_share: share.clone(),
            energy_price: energy_price.clone(),
            consumption: consumption.clone(),
            pc_consumption: pc_consumption.clone(),
            conso_free,
            pc_free,
            base_utility,
            energy_ratio: energy_ratio.clone(),
            resid_ratio: resid_ratio.clone(),
            period_utility: period_utility.clone(),
            discount_factor: discount_factor.clone(),
            discounted_utility: discounted_utility.clone(),
            welfare,
        });

        let axis = &self.time_axis;
        Ok(UtilityOutput {
            consumption: Timeseries::new(consumption, Arc::clone(axis), "T$")?,
            per_capita_consumption: Timeseries::new(pc_consumption, Arc::clone(axis), "k$")?,
            discount_factor: Timeseries::new(discount_factor, Arc::clone(axis), "-")?,
            period_utility: Timeseries::new(period_utility, Arc::clone(axis), "-")?,
            discounted_utility: Timeseries::new(discounted_utility, Arc::clone(axis), "-")?,
            welfare_cumulant: Timeseries::new(welfare_cumulant, Arc::clone(axis), "-")?,
            welfare,
        })
    }

    fn state(&self) -> SiamResult<&UtilityState> {
        self.state.as_ref().ok_or_else(|| {
            SiamError::GradientBeforeCompute {
                component: "ConsumptionUtilityModel".to_string(),
            }
        })
    }

    /// Per-year slopes d(per-capita consumption)/d(input).
    fn pc_consumption_slopes(
        &self,
        state: &UtilityState,
        wrt: UtilityInputVariable,
    ) -> Array1<FloatValue> {
        let n = self.time_axis.len();
        match wrt {
            UtilityInputVariable::NetOutput => Zip::from(&state.pc_free)
                .and(&state.conso_free)
                .and(&state.investment_share)
                .and(&state.population)
                .map_collect(|&pc_m, &c_m, &s, &pop| {
                    pc_m * c_m * (1.0 - s / 100.0) * 1000.0 / pop
                }),
            UtilityInputVariable::InvestmentShare => Zip::from(&state.pc_free)
                .and(&state.conso_free)
                .and(&state.net_output)
                .and(&state.population)
                .map_collect(|&pc_m, &c_m, &output, &pop| {
                    pc_m * c_m * (-output / 100.0) * 1000.0 / pop
                }),
            UtilityInputVariable::Population => Zip::from(&state.pc_free)
                .and(&state.consumption)
                .and(&state.population)
                .map_collect(|&pc_m, &consumption, &pop| {
                    pc_m * (-1000.0 * consumption / (pop * pop))
                }),
            UtilityInputVariable::EnergyPrice | UtilityInputVariable::ResidentialEnergy => {
                Array1::zeros(n)
            }
        }
    }

    /// Per-year slopes d(period utility)/d(input).
    fn period_utility_slopes(
        &self,
        state: &UtilityState,
        wrt: UtilityInputVariable,
    ) -> Array1<FloatValue> {
        let p = &self.parameters;
        match wrt {
            UtilityInputVariable::EnergyPrice => Zip::from(&state.base_utility)
                .and(&state.resid_ratio)
                .and(&state.energy_price)
                .map_collect(|&u, &rr, &price| {
                    -u * rr * p.initial_raw_energy_price / (price * price)
                }),
            UtilityInputVariable::ResidentialEnergy => Zip::from(&state.base_utility)
                .and(&state.energy_ratio)
                .map_collect(|&u, &er| u * er / p.residential_energy_conso_ref),
            consumption_path => {
                let marginal_utility =
                    state.pc_consumption.mapv(|c| c.powf(-p.conso_elasticity));
                let pc_slopes = self.pc_consumption_slopes(state, consumption_path);
                Zip::from(&state.energy_ratio)
                    .and(&state.resid_ratio)
                    .and(&marginal_utility)
                    .and(&pc_slopes)
                    .map_collect(|&er, &rr, &mu, &slope| er * rr * mu * slope)
            }
        }
    }

    /// Per-year slopes d(discounted utility)/d(input).
    fn discounted_utility_slopes(
        &self,
        state: &UtilityState,
        wrt: UtilityInputVariable,
    ) -> Array1<FloatValue> {
        let period_slopes = self.period_utility_slopes(state, wrt);
        match wrt {
            UtilityInputVariable::Population => Zip::from(&state.discount_factor)
                .and(&state.period_utility)
                .and(&state.population)
                .and(&period_slopes)
                .map_collect(|&f, &u, &pop, &slope| f * (u / 1000.0 + pop / 1000.0 * slope)),
            _ => Zip::from(&state.discount_factor)
                .and(&state.population)
                .and(&period_slopes)
                .map_collect(|&f, &pop, &slope| f * pop / 1000.0 * slope),
        }
    }

    /// Diagonal Jacobian d(per-capita consumption)/d(input).
    pub fn d_per_capita_consumption(&self, wrt: UtilityInputVariable) -> SiamResult<Jacobian> {
        let state = self.state()?;
        Ok(jacobian::diagonal(&self.pc_consumption_slopes(state, wrt)))
    }

    /// Diagonal Jacobian d(period utility)/d(input).
    pub fn d_period_utility(&self, wrt: UtilityInputVariable) -> SiamResult<Jacobian> {
        let state = self.state()?;
        Ok(jacobian::diagonal(&self.period_utility_slopes(state, wrt)))
    }

    /// Diagonal Jacobian d(discounted utility)/d(input).
    pub fn d_discounted_utility(&self, wrt: UtilityInputVariable) -> SiamResult<Jacobian> {
        let state = self.state()?;
        Ok(jacobian::diagonal(
            &self.discounted_utility_slopes(state, wrt),
        ))
    }

    /// Row gradient d(welfare)/d(input): the column sums of the diagonal
    /// discounted-utility Jacobian.
    pub fn d_welfare(&self, wrt: UtilityInputVariable) -> SiamResult<Array1<FloatValue>> {
        let state = self.state()?;
        Ok(self.discounted_utility_slopes(state, wrt))
    }

    /// The configured scalar welfare objective.
    pub fn welfare_objective(&self) -> SiamResult<FloatValue> {
        let state = self.state()?;
        let p = &self.parameters;
        let n = self.time_axis.len() as FloatValue;
        match p.welfare_obj_option {
            WelfareObjective::Welfare => {
                self.ensure_nonzero(state.welfare, "welfare")?;
                Ok(p.alpha * p.gamma * p.init_discounted_utility * n / state.welfare)
            }
            WelfareObjective::LastUtility => {
                let last = state.period_utility[state.period_utility.len() - 1];
                self.ensure_nonzero(last, "final-year period utility")?;
                Ok(p.alpha * p.init_period_utility_pc / last)
            }
        }
    }

    /// Negated, normalized welfare for minimization-oriented optimizers.
    pub fn negative_welfare_objective(&self) -> SiamResult<FloatValue> {
        let state = self.state()?;
        let p = &self.parameters;
        let n = self.time_axis.len() as FloatValue;
        Ok(-state.welfare / (p.discounted_utility_ref * n))
    }

    /// Floor-clamped minimum-utility objective: guards against a single bad
    /// year disappearing into an averaged objective.
    pub fn min_utility_objective(&self) -> SiamResult<FloatValue> {
        let state = self.state()?;
        let p = &self.parameters;
        let clamped_min = self.clamped_min_utility(state);
        Ok(p.alpha * (1.0 - p.gamma) * p.init_discounted_utility / clamped_min)
    }

    /// d(welfare objective)/d(welfare); zero under the `last_utility`
    /// option, which does not read the welfare aggregate.
    pub fn d_welfare_objective_d_welfare(&self) -> SiamResult<FloatValue> {
        let state = self.state()?;
        let p = &self.parameters;
        let n = self.time_axis.len() as FloatValue;
        match p.welfare_obj_option {
            WelfareObjective::Welfare => {
                self.ensure_nonzero(state.welfare, "welfare")?;
                Ok(-p.alpha * p.gamma * p.init_discounted_utility * n
                    / (state.welfare * state.welfare))
            }
            WelfareObjective::LastUtility => Ok(0.0),
        }
    }

    /// Row gradient d(welfare objective)/d(period utility); only the final
    /// year is non-zero, and only under the `last_utility` option.
    pub fn d_welfare_objective_d_period_utility(&self) -> SiamResult<Array1<FloatValue>> {
        let state = self.state()?;
        let p = &self.parameters;
        let n = self.time_axis.len();
        let mut row = Array1::zeros(n);
        if p.welfare_obj_option == WelfareObjective::LastUtility {
            let last = state.period_utility[n - 1];
            self.ensure_nonzero(last, "final-year period utility")?;
            row[n - 1] = -p.alpha * p.init_period_utility_pc / (last * last);
        }
        Ok(row)
    }

    /// d(negative welfare objective)/d(welfare): a constant scale.
    pub fn d_negative_welfare_objective_d_welfare(&self) -> SiamResult<FloatValue> {
        self.state()?;
        let p = &self.parameters;
        let n = self.time_axis.len() as FloatValue;
        Ok(-1.0 / (p.discounted_utility_ref * n))
    }

    /// Row gradient d(min-utility objective)/d(discounted utility): zero
    /// everywhere except the minimum year, and all-zero when the floor
    /// clamp is active.
    pub fn d_min_utility_objective_d_discounted_utility(
        &self,
    ) -> SiamResult<Array1<FloatValue>> {
        let state = self.state()?;
        let p = &self.parameters;
        let mut row = Array1::zeros(self.time_axis.len());
        let (argmin, min_utility) = self.min_utility(state);
        if min_utility > p.lo_discounted_utility {
            row[argmin] = -p.alpha * (1.0 - p.gamma) * p.init_discounted_utility
                / (min_utility * min_utility);
        }
        Ok(row)
    }

    /// Composed row gradient d(welfare objective)/d(input).
    pub fn d_welfare_objective(
        &self,
        wrt: UtilityInputVariable,
    ) -> SiamResult<Array1<FloatValue>> {
        match self.parameters.welfare_obj_option {
            WelfareObjective::Welfare => {
                let scale = self.d_welfare_objective_d_welfare()?;
                Ok(self.d_welfare(wrt)? * scale)
            }
            WelfareObjective::LastUtility => {
                let row = self.d_welfare_objective_d_period_utility()?;
                Ok(row.dot(&self.d_period_utility(wrt)?))
            }
        }
    }

    /// Composed row gradient d(negative welfare objective)/d(input).
    pub fn d_negative_welfare_objective(
        &self,
        wrt: UtilityInputVariable,
    ) -> SiamResult<Array1<FloatValue>> {
        let scale = self.d_negative_welfare_objective_d_welfare()?;
        Ok(self.d_welfare(wrt)? * scale)
    }

    /// Composed row gradient d(min-utility objective)/d(input).
    pub fn d_min_utility_objective(
        &self,
        wrt: UtilityInputVariable,
    ) -> SiamResult<Array1<FloatValue>> {
        let row = self.d_min_utility_objective_d_discounted_utility()?;
        Ok(row.dot(&self.d_discounted_utility(wrt)?))
    }

    fn min_utility(&self, state: &UtilityState) -> (usize, FloatValue) {
        let mut argmin = 0;
        let mut min_utility = state.discounted_utility[0];
        for (index, &value) in state.discounted_utility.iter().enumerate() {
            if value < min_utility {
                argmin = index;
                min_utility = value;
            }
        }
        (argmin, min_utility)
    }

    fn clamped_min_utility(&self, state: &UtilityState) -> FloatValue {
        let (_, min_utility) = self.min_utility(state);
        min_utility.max(self.parameters.lo_discounted_utility)
    }

    fn ensure_nonzero(&self, value: FloatValue, what: &str) -> SiamResult<()> {
        if value == 0.0 {
            return Err(SiamError::NumericalDomain {
                context: "welfare objective".to_string(),
                message: format!("{} is exactly zero, objective undefined", what),
            });
        }
        Ok(())
    }
}
