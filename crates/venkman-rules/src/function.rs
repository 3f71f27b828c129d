//! One-dimensional lookup functions.

use serde::{Deserialize, Serialize};
use venkman_core::{linear_interpolation, Error, Result};

use crate::range::OutOfRangeErrorHandlingMethod;

/// Piecewise linear function defined by evenly spaced `values` over
/// `[minimum_input, maximum_input]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FunctionDefinition", into = "FunctionDefinition")]
pub struct SingleVariableFunction {
    minimum_input: f64,
    maximum_input: f64,
    input_range_error_handling_method: OutOfRangeErrorHandlingMethod,
    values: Vec<f64>,
    factor: f64,
    minimum_output: f64,
    maximum_output: f64,
}

impl SingleVariableFunction {
    pub fn new(
        minimum_input: f64,
        maximum_input: f64,
        input_range_error_handling_method: OutOfRangeErrorHandlingMethod,
        values: Vec<f64>,
    ) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidFunction("values not defined for function".into()));
        }
        if minimum_input.is_nan() || maximum_input.is_nan() || minimum_input > maximum_input {
            return Err(Error::InvalidFunction(format!(
                "minimum input value {minimum_input} must not exceed maximum input value {maximum_input}"
            )));
        }

        let mut factor = (values.len() - 1) as f64 / (maximum_input - minimum_input);
        if !factor.is_finite() {
            factor = 0.0;
        }

        let minimum_output = values.iter().copied().fold(f64::INFINITY, f64::min);
        let maximum_output = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            minimum_input,
            maximum_input,
            input_range_error_handling_method,
            values,
            factor,
            minimum_output,
            maximum_output,
        })
    }

    /// Function whose input range is the index range of `values`.
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        let maximum_input = values.len().saturating_sub(1) as f64;
        Self::new(
            0.0,
            maximum_input,
            OutOfRangeErrorHandlingMethod::EndSessionForMinimumAndMaximum,
            values,
        )
    }

    /// Constant function returning `value` over `[0, 0]`.
    pub fn constant(value: f64) -> Self {
        Self {
            minimum_input: 0.0,
            maximum_input: 0.0,
            input_range_error_handling_method: OutOfRangeErrorHandlingMethod::EndSessionForMinimumAndMaximum,
            values: vec![value],
            factor: 0.0,
            minimum_output: value,
            maximum_output: value,
        }
    }

    /// Evaluate the function at `input`.
    ///
    /// Inputs outside the domain are either clamped or rejected depending on
    /// the configured handling method; rejected inputs end the session.
    pub fn value(&self, input: f64) -> Result<f64> {
        let input = self.bounded_input(input)?;

        let last = self.values.len() - 1;
        if input == self.maximum_input && self.maximum_input > self.minimum_input {
            return Ok(self.values[last]);
        }

        let scaled = (input - self.minimum_input) * self.factor;
        let previous = scaled.floor();
        if !(0.0..=last as f64).contains(&previous) {
            return Err(Error::IndexOutOfRange {
                index: previous as i64,
                input,
                last,
            });
        }

        let previous_index = previous as usize;
        let next_index = (previous_index + 1).min(last);
        Ok(linear_interpolation(
            scaled,
            previous_index as f64,
            self.values[previous_index],
            next_index as f64,
            self.values[next_index],
        ))
    }

    fn bounded_input(&self, input: f64) -> Result<f64> {
        let method = self.input_range_error_handling_method;
        if input < self.minimum_input && method.repeat_minimum() {
            Ok(self.minimum_input)
        } else if input > self.maximum_input && method.repeat_maximum() {
            Ok(self.maximum_input)
        } else if (self.minimum_input..=self.maximum_input).contains(&input) {
            Ok(input)
        } else {
            Err(Error::OutOfRange {
                input,
                minimum: self.minimum_input,
                maximum: self.maximum_input,
            })
        }
    }

    pub fn minimum_input(&self) -> f64 {
        self.minimum_input
    }

    pub fn maximum_input(&self) -> f64 {
        self.maximum_input
    }

    pub fn input_range_error_handling_method(&self) -> OutOfRangeErrorHandlingMethod {
        self.input_range_error_handling_method
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn minimum_output(&self) -> f64 {
        self.minimum_output
    }

    pub fn maximum_output(&self) -> f64 {
        self.maximum_output
    }
}

impl Default for SingleVariableFunction {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

/// Serialized form; the input range defaults to the index range of `values`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    minimum_input: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    maximum_input: Option<f64>,
    #[serde(default)]
    input_range_error_handling_method: OutOfRangeErrorHandlingMethod,
    values: Vec<f64>,
}

impl TryFrom<FunctionDefinition> for SingleVariableFunction {
    type Error = Error;

    fn try_from(definition: FunctionDefinition) -> Result<Self> {
        let minimum_input = definition.minimum_input.unwrap_or(0.0);
        let maximum_input = definition
            .maximum_input
            .unwrap_or_else(|| minimum_input + definition.values.len().saturating_sub(1) as f64);
        Self::new(
            minimum_input,
            maximum_input,
            definition.input_range_error_handling_method,
            definition.values,
        )
    }
}

impl From<SingleVariableFunction> for FunctionDefinition {
    fn from(function: SingleVariableFunction) -> Self {
        Self {
            minimum_input: Some(function.minimum_input),
            maximum_input: Some(function.maximum_input),
            input_range_error_handling_method: function.input_range_error_handling_method,
            values: function.values,
        }
    }
}
