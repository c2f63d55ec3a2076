//! Investment, operation and fixed-emission cost functions.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Dependant value that refers to the result of the preceding term.
pub const RUNNING_COST: &str = "cost";

/// A single term or an ordered chain of terms.
///
/// In a chain every term may refer to the previous term's result through
/// the `cost` name; the last term's result is the function's value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CostFunction {
    Single(CostTerm),
    Chain(Vec<CostTerm>),
}

/// One cost term, selected by its `key`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "key", rename_all = "lowercase", deny_unknown_fields)]
pub enum CostTerm {
    /// `sum(c_i * x^i)` over the fitting values.
    Poly {
        fitting_value: Vec<f64>,
        dependant_value: String,
    },
    /// `factor * x`.
    Spec {
        fitting_value: SpecFactor,
        dependant_value: String,
    },
    Fix { fitting_value: f64 },
}

/// Factor of a `spec` term: a literal, or `"cost"` for the running result.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SpecFactor {
    Value(f64),
    Named(String),
}

impl CostFunction {
    pub fn terms(&self) -> &[CostTerm] {
        match self {
            Self::Single(term) => std::slice::from_ref(term),
            Self::Chain(terms) => terms,
        }
    }

    /// Evaluates the function.
    ///
    /// # Arguments
    ///
    /// * `field` - Config path used in error messages
    /// * `lookup` - Resolves a dependant value name to its current value
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a dependant value cannot be resolved or a
    /// `spec` factor names something other than `cost`.
    pub fn evaluate(
        &self,
        field: &str,
        lookup: impl Fn(&str) -> Option<f64>,
    ) -> Result<f64, ConfigError> {
        let mut cost = 0.0;
        for term in self.terms() {
            let value = |name: &str| -> Result<f64, ConfigError> {
                if name == RUNNING_COST {
                    return Ok(cost);
                }
                lookup(name).ok_or_else(|| {
                    ConfigError::new(field, format!("unknown dependant value \"{name}\""))
                })
            };
            cost = match term {
                CostTerm::Poly {
                    fitting_value,
                    dependant_value,
                } => {
                    let x = value(dependant_value)?;
                    polynomial(fitting_value, x)
                }
                CostTerm::Spec {
                    fitting_value,
                    dependant_value,
                } => {
                    let factor = match fitting_value {
                        SpecFactor::Value(v) => *v,
                        SpecFactor::Named(name) if name == RUNNING_COST => cost,
                        SpecFactor::Named(name) => {
                            return Err(ConfigError::new(
                                field,
                                format!("spec factor must be a number or \"cost\", got \"{name}\""),
                            ));
                        }
                    };
                    factor * value(dependant_value)?
                }
                CostTerm::Fix { fitting_value } => *fitting_value,
            };
        }
        Ok(cost)
    }
}

fn polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Annuity of an investment.
///
/// `capex * q^n (q - 1) / (q^n - 1)` with `q = 1 + interest_rate`;
/// `capex / n` for a zero rate. A non-positive life time yields 0.
pub fn annuity(capex: f64, interest_rate: f64, life_time: f64) -> f64 {
    if life_time <= 0.0 {
        return 0.0;
    }
    if interest_rate == 0.0 {
        return capex / life_time;
    }
    let q = 1.0 + interest_rate;
    let qn = q.powf(life_time);
    capex * qn * (q - 1.0) / (qn - 1.0)
}
