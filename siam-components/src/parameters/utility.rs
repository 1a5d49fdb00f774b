//! Consumption/utility parameters.

use serde::{Deserialize, Serialize};
use siam_core::errors::{SiamError, SiamResult};
use siam_core::timeseries::FloatValue;
use std::str::FromStr;

/// Scalar welfare objective handed to the outer optimizer.
///
/// A closed set; anything else is a configuration error naming the
/// accepted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WelfareObjective {
    /// Normalized inverse of the summed discounted utility.
    Welfare,
    /// Normalized inverse of the final-year period utility.
    LastUtility,
}

impl WelfareObjective {
    pub const ACCEPTED: [&'static str; 2] = ["welfare", "last_utility"];

    pub fn as_str(&self) -> &'static str {
        match self {
            WelfareObjective::Welfare => "welfare",
            WelfareObjective::LastUtility => "last_utility",
        }
    }
}

impl FromStr for WelfareObjective {
    type Err = SiamError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "welfare" => Ok(WelfareObjective::Welfare),
            "last_utility" => Ok(WelfareObjective::LastUtility),
            other => Err(SiamError::UnsupportedOption {
                parameter: "welfare_obj_option".to_string(),
                value: other.to_string(),
                accepted: Self::ACCEPTED.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

/// Parameters of the consumption/utility model.
///
/// Monetary quantities are in trillion dollars (T$), population in
/// millions, per-capita consumption in thousand dollars (k$).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UtilityParameters {
    /// Scalar objective served to the optimizer; required, never defaulted.
    pub welfare_obj_option: WelfareObjective,
    /// Weight of the welfare terms in the composite objective
    /// unit: dimensionless
    /// default: 0.5
    #[serde(default = "defaults::alpha")]
    pub alpha: FloatValue,
    /// Split between summed-welfare and minimum-utility objectives
    /// unit: dimensionless
    /// default: 0.5
    #[serde(default = "defaults::gamma")]
    pub gamma: FloatValue,
    /// Elasticity of marginal utility of consumption (CRRA exponent)
    /// unit: dimensionless
    /// default: 1.45
    #[serde(default = "defaults::conso_elasticity")]
    pub conso_elasticity: FloatValue,
    /// Pure rate of social time preference, compounded annually from the
    /// start year
    /// unit: 1/yr
    /// default: 0.015
    #[serde(default = "defaults::init_rate_time_pref")]
    pub init_rate_time_pref: FloatValue,
    /// Reference raw energy price; the energy-availability penalty is the
    /// ratio of this to the current mean energy price
    /// unit: $/MWh
    /// default: 110.0
    #[serde(default = "defaults::initial_raw_energy_price")]
    pub initial_raw_energy_price: FloatValue,
    /// Reference per-capita residential energy consumption
    /// unit: MWh
    /// default: 21.0
    #[serde(default = "defaults::residential_energy_conso_ref")]
    pub residential_energy_conso_ref: FloatValue,
    /// Reference discounted utility normalizing the welfare and
    /// minimum-utility objectives
    /// unit: dimensionless
    /// default: 3400.0
    #[serde(default = "defaults::init_discounted_utility")]
    pub init_discounted_utility: FloatValue,
    /// Reference period utility normalizing the last-utility objective
    /// unit: dimensionless
    /// default: 0.5
    #[serde(default = "defaults::init_period_utility_pc")]
    pub init_period_utility_pc: FloatValue,
    /// Reference discounted utility normalizing the negated welfare
    /// objective
    /// unit: dimensionless
    /// default: 1700.0
    #[serde(default = "defaults::discounted_utility_ref")]
    pub discounted_utility_ref: FloatValue,
    /// Lower floor on total consumption
    /// unit: T$
    /// default: 2.0
    #[serde(default = "defaults::lo_conso")]
    pub lo_conso: FloatValue,
    /// Lower floor on per-capita consumption, keeping the CRRA transform
    /// defined
    /// unit: k$
    /// default: 0.01
    #[serde(default = "defaults::lo_per_capita_conso")]
    pub lo_per_capita_conso: FloatValue,
    /// Lower clamp on the minimum discounted utility inside the
    /// minimum-utility objective
    /// unit: dimensionless
    /// default: 0.01
    #[serde(default = "defaults::lo_discounted_utility")]
    pub lo_discounted_utility: FloatValue,
}

impl UtilityParameters {
    /// Parameters with everything at its default except the objective,
    /// which has no default.
    pub fn with_objective(welfare_obj_option: WelfareObjective) -> Self {
        Self {
            welfare_obj_option,
            alpha: defaults::alpha(),
            gamma: defaults::gamma(),
            conso_elasticity: defaults::conso_elasticity(),
            init_rate_time_pref: defaults::init_rate_time_pref(),
            initial_raw_energy_price: defaults::initial_raw_energy_price(),
            residential_energy_conso_ref: defaults::residential_energy_conso_ref(),
            init_discounted_utility: defaults::init_discounted_utility(),
            init_period_utility_pc: defaults::init_period_utility_pc(),
            discounted_utility_ref: defaults::discounted_utility_ref(),
            lo_conso: defaults::lo_conso(),
            lo_per_capita_conso: defaults::lo_per_capita_conso(),
            lo_discounted_utility: defaults::lo_discounted_utility(),
        }
    }

    pub fn validate(&self) -> SiamResult<()> {
        if (self.conso_elasticity - 1.0).abs() < 1e-12 {
            return Err(SiamError::InvalidParameter {
                parameter: "conso_elasticity".to_string(),
                message: "the CRRA transform is singular at elasticity = 1".to_string(),
            });
        }
        if self.init_rate_time_pref <= -1.0 {
            return Err(SiamError::InvalidParameter {
                parameter: "init_rate_time_pref".to_string(),
                message: format!("must be > -1, got {}", self.init_rate_time_pref),
            });
        }
        for (name, value) in [
            ("initial_raw_energy_price", self.initial_raw_energy_price),
            (
                "residential_energy_conso_ref",
                self.residential_energy_conso_ref,
            ),
            ("discounted_utility_ref", self.discounted_utility_ref),
            ("lo_conso", self.lo_conso),
            ("lo_per_capita_conso", self.lo_per_capita_conso),
            ("lo_discounted_utility", self.lo_discounted_utility),
        ] {
            if value <= 0.0 {
                return Err(SiamError::InvalidParameter {
                    parameter: name.to_string(),
                    message: format!("must be strictly positive, got {}", value),
                });
            }
        }
        Ok(())
    }
}

mod defaults {
    use siam_core::timeseries::FloatValue;

    pub fn alpha() -> FloatValue {
        0.5
    }
    pub fn gamma() -> FloatValue {
        0.5
    }
    pub fn conso_elasticity() -> FloatValue {
        1.45
    }
    pub fn init_rate_time_pref() -> FloatValue {
        0.015
    }
    pub fn initial_raw_energy_price() -> FloatValue {
        110.0
    }
    pub fn residential_energy_conso_ref() -> FloatValue {
        21.0
    }
    pub fn init_discounted_utility() -> FloatValue {
        3400.0
    }
    pub fn init_period_utility_pc() -> FloatValue {
        0.5
    }
    pub fn discounted_utility_ref() -> FloatValue {
        1700.0
    }
    pub fn lo_conso() -> FloatValue {
        2.0
    }
    pub fn lo_per_capita_conso() -> FloatValue {
        0.01
    }
    pub fn lo_discounted_utility() -> FloatValue {
        0.01
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objective_from_str_accepts_known_options() {
        assert_eq!(
            "welfare".parse::<WelfareObjective>().unwrap(),
            WelfareObjective::Welfare
        );
        assert_eq!(
            "last_utility".parse::<WelfareObjective>().unwrap(),
            WelfareObjective::LastUtility
        );
    }

    #[test]
    fn objective_from_str_rejects_unknown_options_naming_the_set() {
        let err = "average_utility".parse::<WelfareObjective>().unwrap_err();
        match err {
            SiamError::UnsupportedOption {
                parameter,
                value,
                accepted,
            } => {
                assert_eq!(parameter, "welfare_obj_option");
                assert_eq!(value, "average_utility");
                assert_eq!(accepted, vec!["welfare", "last_utility"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn loads_from_toml_with_defaults() {
        let parameters: UtilityParameters =
            siam_core::config::from_toml_str("welfare_obj_option = \"welfare\"").unwrap();
        assert_eq!(parameters.welfare_obj_option, WelfareObjective::Welfare);
        assert!((parameters.conso_elasticity - 1.45).abs() < 1e-12);
        assert!((parameters.init_discounted_utility - 3400.0).abs() < 1e-12);
    }

    #[test]
    fn missing_objective_fails_configuration() {
        let result: SiamResult<UtilityParameters> =
            siam_core::config::from_toml_str("alpha = 0.4");
        assert!(matches!(result, Err(SiamError::Configuration(_))));
    }

    #[test]
    fn unknown_objective_fails_configuration_naming_the_set() {
        let result: SiamResult<UtilityParameters> =
            siam_core::config::from_toml_str("welfare_obj_option = \"median_utility\"");
        match result {
            Err(SiamError::Configuration(message)) => assert!(
                message.contains("welfare") && message.contains("last_utility"),
                "message was: {}",
                message
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unit_elasticity_is_rejected() {
        let parameters = UtilityParameters {
            conso_elasticity: 1.0,
            ..UtilityParameters::with_objective(WelfareObjective::Welfare)
        };
        assert!(matches!(
            parameters.validate(),
            Err(SiamError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn non_positive_references_are_rejected() {
        let parameters = UtilityParameters {
            lo_per_capita_conso: 0.0,
            ..UtilityParameters::with_objective(WelfareObjective::Welfare)
        };
        assert!(matches!(
            parameters.validate(),
            Err(SiamError::InvalidParameter { .. })
        ));
    }
}
