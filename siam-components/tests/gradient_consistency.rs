//! Gradient-consistency tests for the damage-pricing and welfare chain.
//!
//! Every analytic Jacobian exposed by the models is checked against a
//! central finite difference on physically plausible series, and the
//! structural guarantees (exact diagonals, exact lower-triangular prefix
//! sum) are verified entry by entry.

use approx::assert_relative_eq;
use ndarray::Array1;
use siam_components::carbon_price::{Co2DamagePriceModel, ExtraTonPriceModel};
use siam_components::damage::DamageFractionModel;
use siam_components::parameters::{
    CarbonPriceParameters, DamageFunction, DamageParameters, PolynomialParameters,
    TippingPointParameters, UtilityParameters, WelfareObjective,
};
use siam_components::utility::{ConsumptionUtilityModel, UtilityInputVariable, UtilityInputs};
use siam_core::jacobian;
use siam_core::timeseries::{FloatValue, TimeAxis, Timeseries};
use siam_core::utils::finite_difference::{
    central_difference_gradient, central_difference_jacobian, gradients_close, jacobians_close,
};
use std::sync::Arc;

const REL_TOL: FloatValue = 1e-6;
const ABS_TOL: FloatValue = 1e-9;

fn axis31() -> Arc<TimeAxis> {
    Arc::new(TimeAxis::from_range(2020, 2050, 1).unwrap())
}

/// Smoothly varying, strictly positive warming path between ~0.5 and ~4.5
/// degC.
fn temperature_path(axis: &Arc<TimeAxis>) -> Array1<FloatValue> {
    Array1::from_shape_fn(axis.len(), |i| {
        let t = i as FloatValue;
        0.5 + 0.12 * t + 0.2 * (0.8 * t).sin()
    })
}

fn series(axis: &Arc<TimeAxis>, values: Array1<FloatValue>, unit: &str) -> Timeseries {
    Timeseries::new(values, Arc::clone(axis), unit).unwrap()
}

mod damage_gradients {
    use super::*;

    fn check_regime(function: DamageFunction) {
        let axis = axis31();
        let parameters = DamageParameters {
            damage_function: function,
            frac_damage_prod: 0.3,
        };

        let forward = {
            let axis = Arc::clone(&axis);
            let parameters = parameters.clone();
            move |temperature: &Array1<FloatValue>| {
                let mut model =
                    DamageFractionModel::from_parameters(parameters.clone(), Arc::clone(&axis))
                        .unwrap();
                model
                    .compute(&series(&axis, temperature.clone(), "degC"))
                    .unwrap()
                    .values()
                    .clone()
            }
        };

        let temperature = temperature_path(&axis);
        let mut model =
            DamageFractionModel::from_parameters(parameters, Arc::clone(&axis)).unwrap();
        model
            .compute(&series(&axis, temperature.clone(), "degC"))
            .unwrap();

        let analytic = model.temperature_jacobian().unwrap();
        let numeric = central_difference_jacobian(&forward, &temperature, 1e-4);
        assert!(
            jacobians_close(&analytic, &numeric, REL_TOL, ABS_TOL),
            "damage-fraction Jacobian disagrees with finite differences"
        );
    }

    #[test]
    fn tipping_point_jacobian_matches_finite_differences() {
        check_regime(DamageFunction::TippingPoint(TippingPointParameters::default()));
    }

    #[test]
    fn polynomial_jacobian_matches_finite_differences() {
        check_regime(DamageFunction::Polynomial(PolynomialParameters {
            intercept: 0.01,
            quadratic: 0.002,
            exponent: 2.0,
        }));
    }

    #[test]
    fn tipping_point_fraction_is_monotone_on_a_dense_grid() {
        let function = DamageFunction::TippingPoint(TippingPointParameters::default());
        let mut previous = 0.0;
        for i in 0..500 {
            let fraction = function.fraction(i as FloatValue * 0.02);
            assert!(
                fraction >= previous,
                "fraction decreased at T = {}",
                i as FloatValue * 0.02
            );
            previous = fraction;
        }
    }
}

mod carbon_price_chain {
    use super::*;

    fn damages_path(axis: &Arc<TimeAxis>) -> Array1<FloatValue> {
        Array1::from_shape_fn(axis.len(), |i| {
            let t = i as FloatValue;
            0.8 + 0.15 * t + 0.3 * (0.5 * t).sin()
        })
    }

    fn excess_path(axis: &Arc<TimeAxis>) -> Array1<FloatValue> {
        Array1::from_shape_fn(axis.len(), |i| {
            let t = i as FloatValue;
            900.0 + 18.0 * t + 25.0 * (0.3 * t).cos()
        })
    }

    #[test]
    fn extra_ton_price_jacobians_match_finite_differences() {
        let axis = axis31();
        let damages = damages_path(&axis);
        let excess = excess_path(&axis);

        let mut model = ExtraTonPriceModel::new(Arc::clone(&axis));
        model
            .compute(
                &series(&axis, damages.clone(), "T$"),
                &series(&axis, excess.clone(), "Gt"),
            )
            .unwrap();

        let forward_damages = {
            let axis = Arc::clone(&axis);
            let excess = excess.clone();
            move |x: &Array1<FloatValue>| {
                let mut model = ExtraTonPriceModel::new(Arc::clone(&axis));
                model
                    .compute(
                        &series(&axis, x.clone(), "T$"),
                        &series(&axis, excess.clone(), "Gt"),
                    )
                    .unwrap()
                    .values()
                    .clone()
            }
        };
        let numeric = central_difference_jacobian(&forward_damages, &damages, 1e-5);
        assert!(jacobians_close(
            &model.damages_jacobian().unwrap(),
            &numeric,
            REL_TOL,
            ABS_TOL
        ));

        let forward_excess = {
            let axis = Arc::clone(&axis);
            let damages = damages.clone();
            move |x: &Array1<FloatValue>| {
                let mut model = ExtraTonPriceModel::new(Arc::clone(&axis));
                model
                    .compute(
                        &series(&axis, damages.clone(), "T$"),
                        &series(&axis, x.clone(), "Gt"),
                    )
                    .unwrap()
                    .values()
                    .clone()
            }
        };
        let numeric = central_difference_jacobian(&forward_excess, &excess, 1e-3);
        assert!(jacobians_close(
            &model.excess_ghg_jacobian().unwrap(),
            &numeric,
            REL_TOL,
            ABS_TOL
        ));
    }

    #[test]
    fn cumulative_price_jacobian_matches_finite_differences() {
        let axis = axis31();
        let model =
            Co2DamagePriceModel::from_parameters(CarbonPriceParameters::default(), axis.clone());
        let price = damages_path(&axis);

        let forward = {
            let axis = Arc::clone(&axis);
            let model = model.clone();
            move |x: &Array1<FloatValue>| {
                model
                    .compute(&series(&axis, x.clone(), "$/tCO2Eq"))
                    .unwrap()
                    .values()
                    .clone()
            }
        };
        let numeric = central_difference_jacobian(&forward, &price, 1e-5);
        assert!(jacobians_close(
            &model.extra_ton_price_jacobian(),
            &numeric,
            REL_TOL,
            ABS_TOL
        ));
    }

    /// Chain the whole temperature -> fraction -> damages -> price ->
    /// cumulative path and compare against a finite difference of the full
    /// pipeline.
    #[test]
    fn multi_hop_chain_matches_finite_differences_of_the_pipeline() {
        let axis = axis31();
        let gross_output = 120.0;
        let damage_parameters = DamageParameters {
            damage_function: DamageFunction::Polynomial(PolynomialParameters {
                intercept: 0.005,
                quadratic: 0.0022,
                exponent: 2.0,
            }),
            frac_damage_prod: 0.3,
        };
        let excess = excess_path(&axis);
        let temperature = temperature_path(&axis);

        let pipeline = {
            let axis = Arc::clone(&axis);
            let damage_parameters = damage_parameters.clone();
            let excess = excess.clone();
            move |t: &Array1<FloatValue>| {
                let mut damage_model = DamageFractionModel::from_parameters(
                    damage_parameters.clone(),
                    Arc::clone(&axis),
                )
                .unwrap();
                let fraction = damage_model
                    .compute(&series(&axis, t.clone(), "degC"))
                    .unwrap();
                let damages = series(&axis, fraction.values() * gross_output, "T$");
                let mut price_model = ExtraTonPriceModel::new(Arc::clone(&axis));
                let price = price_model
                    .compute(&damages, &series(&axis, excess.clone(), "Gt"))
                    .unwrap();
                let cumulative_model = Co2DamagePriceModel::from_parameters(
                    CarbonPriceParameters::default(),
                    Arc::clone(&axis),
                );
                cumulative_model.compute(&price).unwrap().values().clone()
            }
        };

        // analytic: tril(1) . diag(1e3/excess) . (gross_output * dfrac/dT)
        let mut damage_model =
            DamageFractionModel::from_parameters(damage_parameters, Arc::clone(&axis)).unwrap();
        let fraction = damage_model
            .compute(&series(&axis, temperature.clone(), "degC"))
            .unwrap();
        let mut price_model = ExtraTonPriceModel::new(Arc::clone(&axis));
        price_model
            .compute(
                &series(&axis, fraction.values() * gross_output, "T$"),
                &series(&axis, excess.clone(), "Gt"),
            )
            .unwrap();
        let cumulative_model = Co2DamagePriceModel::from_parameters(
            CarbonPriceParameters::default(),
            Arc::clone(&axis),
        );

        let d_damages_d_temperature =
            damage_model.temperature_jacobian().unwrap() * gross_output;
        let d_price_d_temperature = jacobian::chain(
            &price_model.damages_jacobian().unwrap(),
            &d_damages_d_temperature,
        );
        let analytic = cumulative_model
            .chain_to_user_input(&d_price_d_temperature)
            .unwrap();

        let numeric = central_difference_jacobian(&pipeline, &temperature, 1e-4);
        assert!(
            jacobians_close(&analytic, &numeric, REL_TOL, 1e-7),
            "chained pipeline Jacobian disagrees with finite differences"
        );
    }
}

mod utility_gradients {
    use super::*;

    fn base_inputs(axis: &Arc<TimeAxis>) -> UtilityInputs {
        let n = axis.len();
        let path = |f: &dyn Fn(FloatValue) -> FloatValue| {
            Array1::from_shape_fn(n, |i| f(i as FloatValue))
        };
        UtilityInputs {
            net_output: series(axis, path(&|t| 120.0 + 2.4 * t + 5.0 * (0.7 * t).sin()), "T$"),
            population: series(
                axis,
                path(&|t| 7800.0 + 32.0 * t + 40.0 * (0.3 * t).sin()),
                "millions",
            ),
            investment_share: series(axis, path(&|t| 25.0 + 3.0 * (0.5 * t).sin()), "%"),
            energy_price: series(
                axis,
                path(&|t| 110.0 + 2.5 * t + 8.0 * (0.9 * t).sin()),
                "$/MWh",
            ),
            residential_energy: series(
                axis,
                path(&|t| 21.0 + 0.2 * t + 1.5 * (0.4 * t).sin()),
                "MWh",
            ),
        }
    }

    fn replace_input(
        inputs: &UtilityInputs,
        axis: &Arc<TimeAxis>,
        wrt: UtilityInputVariable,
        values: &Array1<FloatValue>,
    ) -> UtilityInputs {
        let mut inputs = inputs.clone();
        match wrt {
            UtilityInputVariable::NetOutput => {
                inputs.net_output = series(axis, values.clone(), "T$")
            }
            UtilityInputVariable::InvestmentShare => {
                inputs.investment_share = series(axis, values.clone(), "%")
            }
            UtilityInputVariable::Population => {
                inputs.population = series(axis, values.clone(), "millions")
            }
            UtilityInputVariable::EnergyPrice => {
                inputs.energy_price = series(axis, values.clone(), "$/MWh")
            }
            UtilityInputVariable::ResidentialEnergy => {
                inputs.residential_energy = series(axis, values.clone(), "MWh")
            }
        }
        inputs
    }

    fn input_values(inputs: &UtilityInputs, wrt: UtilityInputVariable) -> Array1<FloatValue> {
        match wrt {
            UtilityInputVariable::NetOutput => inputs.net_output.values().clone(),
            UtilityInputVariable::InvestmentShare => inputs.investment_share.values().clone(),
            UtilityInputVariable::Population => inputs.population.values().clone(),
            UtilityInputVariable::EnergyPrice => inputs.energy_price.values().clone(),
            UtilityInputVariable::ResidentialEnergy => {
                inputs.residential_energy.values().clone()
            }
        }
    }

    fn step_for(wrt: UtilityInputVariable) -> FloatValue {
        match wrt {
            UtilityInputVariable::NetOutput => 1e-3,
            UtilityInputVariable::InvestmentShare => 1e-4,
            UtilityInputVariable::Population => 1e-2,
            UtilityInputVariable::EnergyPrice => 1e-3,
            UtilityInputVariable::ResidentialEnergy => 1e-4,
        }
    }

    fn fresh_model(objective: WelfareObjective, axis: &Arc<TimeAxis>) -> ConsumptionUtilityModel {
        ConsumptionUtilityModel::from_parameters(
            UtilityParameters::with_objective(objective),
            Arc::clone(axis),
        )
        .unwrap()
    }

    #[test]
    fn discounted_utility_jacobians_match_finite_differences() {
        let axis = axis31();
        let inputs = base_inputs(&axis);
        let mut model = fresh_model(WelfareObjective::Welfare, &axis);
        model.compute(&inputs).unwrap();

        for wrt in UtilityInputVariable::ALL {
            let forward = {
                let axis = Arc::clone(&axis);
                let inputs = inputs.clone();
                move |x: &Array1<FloatValue>| {
                    let mut model = fresh_model(WelfareObjective::Welfare, &axis);
                    model
                        .compute(&replace_input(&inputs, &axis, wrt, x))
                        .unwrap()
                        .discounted_utility
                        .values()
                        .clone()
                }
            };
            let numeric = central_difference_jacobian(
                &forward,
                &input_values(&inputs, wrt),
                step_for(wrt),
            );
            let analytic = model.d_discounted_utility(wrt).unwrap();
            assert!(
                jacobians_close(&analytic, &numeric, REL_TOL, ABS_TOL),
                "d(discounted utility)/d({:?}) disagrees with finite differences",
                wrt
            );
        }
    }

    #[test]
    fn period_utility_and_consumption_jacobians_match_finite_differences() {
        let axis = axis31();
        let inputs = base_inputs(&axis);
        let mut model = fresh_model(WelfareObjective::Welfare, &axis);
        model.compute(&inputs).unwrap();

        for wrt in UtilityInputVariable::ALL {
            let forward_period = {
                let axis = Arc::clone(&axis);
                let inputs = inputs.clone();
                move |x: &Array1<FloatValue>| {
                    let mut model = fresh_model(WelfareObjective::Welfare, &axis);
                    model
                        .compute(&replace_input(&inputs, &axis, wrt, x))
                        .unwrap()
                        .period_utility
                        .values()
                        .clone()
                }
            };
            let numeric = central_difference_jacobian(
                &forward_period,
                &input_values(&inputs, wrt),
                step_for(wrt),
            );
            assert!(
                jacobians_close(&model.d_period_utility(wrt).unwrap(), &numeric, REL_TOL, ABS_TOL),
                "d(period utility)/d({:?}) disagrees with finite differences",
                wrt
            );

            let forward_pc = {
                let axis = Arc::clone(&axis);
                let inputs = inputs.clone();
                move |x: &Array1<FloatValue>| {
                    let mut model = fresh_model(WelfareObjective::Welfare, &axis);
                    model
                        .compute(&replace_input(&inputs, &axis, wrt, x))
                        .unwrap()
                        .per_capita_consumption
                        .values()
                        .clone()
                }
            };
            let numeric = central_difference_jacobian(
                &forward_pc,
                &input_values(&inputs, wrt),
                step_for(wrt),
            );
            assert!(
                jacobians_close(
                    &model.d_per_capita_consumption(wrt).unwrap(),
                    &numeric,
                    REL_TOL,
                    ABS_TOL
                ),
                "d(per-capita consumption)/d({:?}) disagrees with finite differences",
                wrt
            );
        }
    }

    #[test]
    fn welfare_gradient_matches_finite_differences() {
        let axis = axis31();
        let inputs = base_inputs(&axis);
        let mut model = fresh_model(WelfareObjective::Welfare, &axis);
        model.compute(&inputs).unwrap();

        for wrt in UtilityInputVariable::ALL {
            let forward = {
                let axis = Arc::clone(&axis);
                let inputs = inputs.clone();
                move |x: &Array1<FloatValue>| {
                    let mut model = fresh_model(WelfareObjective::Welfare, &axis);
                    model
                        .compute(&replace_input(&inputs, &axis, wrt, x))
                        .unwrap()
                        .welfare
                }
            };
            let numeric =
                central_difference_gradient(&forward, &input_values(&inputs, wrt), step_for(wrt));
            assert!(
                gradients_close(&model.d_welfare(wrt).unwrap(), &numeric, REL_TOL, ABS_TOL),
                "d(welfare)/d({:?}) disagrees with finite differences",
                wrt
            );
        }
    }

    #[test]
    fn objective_gradients_match_finite_differences() {
        let axis = axis31();
        let inputs = base_inputs(&axis);

        for objective in [WelfareObjective::Welfare, WelfareObjective::LastUtility] {
            let mut model = fresh_model(objective, &axis);
            model.compute(&inputs).unwrap();

            for wrt in UtilityInputVariable::ALL {
                let forward = {
                    let axis = Arc::clone(&axis);
                    let inputs = inputs.clone();
                    move |x: &Array1<FloatValue>| {
                        let mut model = fresh_model(objective, &axis);
                        model.compute(&replace_input(&inputs, &axis, wrt, x)).unwrap();
                        model.welfare_objective().unwrap()
                    }
                };
                let numeric = central_difference_gradient(
                    &forward,
                    &input_values(&inputs, wrt),
                    step_for(wrt),
                );
                assert!(
                    gradients_close(
                        &model.d_welfare_objective(wrt).unwrap(),
                        &numeric,
                        REL_TOL,
                        ABS_TOL
                    ),
                    "d({:?} objective)/d({:?}) disagrees with finite differences",
                    objective,
                    wrt
                );
            }
        }
    }

    #[test]
    fn negative_and_min_objective_gradients_match_finite_differences() {
        let axis = axis31();
        let inputs = base_inputs(&axis);
        let mut model = fresh_model(WelfareObjective::Welfare, &axis);
        model.compute(&inputs).unwrap();

        for wrt in UtilityInputVariable::ALL {
            let forward_negative = {
                let axis = Arc::clone(&axis);
                let inputs = inputs.clone();
                move |x: &Array1<FloatValue>| {
                    let mut model = fresh_model(WelfareObjective::Welfare, &axis);
                    model.compute(&replace_input(&inputs, &axis, wrt, x)).unwrap();
                    model.negative_welfare_objective().unwrap()
                }
            };
            let numeric = central_difference_gradient(
                &forward_negative,
                &input_values(&inputs, wrt),
                step_for(wrt),
            );
            assert!(
                gradients_close(
                    &model.d_negative_welfare_objective(wrt).unwrap(),
                    &numeric,
                    REL_TOL,
                    ABS_TOL
                ),
                "d(negative welfare objective)/d({:?}) disagrees",
                wrt
            );

            let forward_min = {
                let axis = Arc::clone(&axis);
                let inputs = inputs.clone();
                move |x: &Array1<FloatValue>| {
                    let mut model = fresh_model(WelfareObjective::Welfare, &axis);
                    model.compute(&replace_input(&inputs, &axis, wrt, x)).unwrap();
                    model.min_utility_objective().unwrap()
                }
            };
            let numeric = central_difference_gradient(
                &forward_min,
                &input_values(&inputs, wrt),
                step_for(wrt),
            );
            assert!(
                gradients_close(
                    &model.d_min_utility_objective(wrt).unwrap(),
                    &numeric,
                    REL_TOL,
                    ABS_TOL
                ),
                "d(min-utility objective)/d({:?}) disagrees",
                wrt
            );
        }
    }
}

mod end_to_end {
    use super::*;

    /// Five-year scenario: polynomial damages feed the price chain.
    #[test]
    fn five_year_damage_to_price_scenario() {
        let axis = Arc::new(TimeAxis::from_range(1, 5, 1).unwrap());
        let mut damage_model = DamageFractionModel::from_parameters(
            DamageParameters {
                damage_function: DamageFunction::Polynomial(PolynomialParameters {
                    intercept: 0.01,
                    quadratic: 0.001,
                    exponent: 2.0,
                }),
                frac_damage_prod: 0.3,
            },
            Arc::clone(&axis),
        )
        .unwrap();

        let temperature = series(
            &axis,
            Array1::from(vec![0.0, 0.5, 1.0, 1.5, 2.0]),
            "degC",
        );
        let fraction = damage_model.compute(&temperature).unwrap();
        let expected_fraction = [0.0, 0.00525, 0.011, 0.01725, 0.024];
        for (t, &want) in expected_fraction.iter().enumerate() {
            assert_relative_eq!(fraction.get(t).unwrap(), want, max_relative = 1e-12);
        }

        // damages = fraction * fixed gross output of 100 T$
        let damages = series(&axis, fraction.values() * 100.0, "T$");
        let excess = series(&axis, Array1::from_elem(5, 10.0), "Gt");
        let mut price_model = ExtraTonPriceModel::new(Arc::clone(&axis));
        let price = price_model.compute(&damages, &excess).unwrap();
        for t in 0..5 {
            assert_relative_eq!(
                price.get(t).unwrap(),
                1e3 * damages.get(t).unwrap() / 10.0,
                max_relative = 1e-12
            );
        }

        let cumulative_model = Co2DamagePriceModel::from_parameters(
            CarbonPriceParameters {
                init_co2_damage_price: 0.0,
                damage_constraint_factor: 1.0,
            },
            Arc::clone(&axis),
        );
        let cumulative = cumulative_model.compute(&price).unwrap();
        let mut running = 0.0;
        for t in 0..5 {
            running += price.get(t).unwrap();
            assert_relative_eq!(cumulative.get(t).unwrap(), running, max_relative = 1e-12);
        }
    }
}
