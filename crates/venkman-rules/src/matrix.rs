//! Delimited matrix text used to define positional functions.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use ndarray::Array2;
use venkman_core::{Error, Result};

use crate::positional::PositionalVariableFunction;
use crate::range::OutOfRangeErrorHandlingMethod;
use crate::variable::PositionalVariable;

/// Row-major matrix parsed from whitespace and/or comma separated text.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    values: Array2<f64>,
    minimum_value: f64,
    maximum_value: f64,
}

impl Matrix {
    pub fn parse(text: &str) -> Result<Self> {
        let mut columns: Option<usize> = None;
        let mut rows = 0;
        let mut flat = Vec::new();

        for line in text.lines() {
            let elements: Vec<&str> = line
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|element| !element.is_empty())
                .collect();
            if elements.is_empty() {
                continue;
            }
            let row_number = rows + 1;

            match columns {
                None => columns = Some(elements.len()),
                Some(expected) if expected != elements.len() => {
                    return Err(Error::Matrix(format!(
                        "row {row_number} contains {} elements while all previous rows contain {expected} elements",
                        elements.len()
                    )));
                }
                Some(_) => {}
            }

            for (column, element) in elements.iter().enumerate() {
                let value: f64 = element.parse().map_err(|_| {
                    Error::Matrix(format!(
                        "row {row_number} column {} contains invalid value '{element}'",
                        column + 1
                    ))
                })?;
                flat.push(value);
            }
            rows += 1;
        }

        let Some(columns) = columns else {
            return Err(Error::Matrix("matrix does not contain any values".into()));
        };

        let minimum_value = flat.iter().copied().fold(f64::INFINITY, f64::min);
        let maximum_value = flat.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let values = Array2::from_shape_vec((rows, columns), flat).map_err(|e| Error::Matrix(e.to_string()))?;

        Ok(Self {
            values,
            minimum_value,
            maximum_value,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Matrix(format!("failed to read {}: {e}", path.display())))?;
        Self::parse(&text).map_err(|e| match e {
            Error::Matrix(message) => Error::Matrix(format!("{message} in {}", path.display())),
            other => other,
        })
    }

    /// Positional function over `[0, maximum_x] × [0, maximum_y]` backed by this matrix.
    pub fn to_positional_function(
        &self,
        variable: PositionalVariable,
        maximum_x: f64,
        maximum_y: f64,
        method: OutOfRangeErrorHandlingMethod,
    ) -> Result<PositionalVariableFunction> {
        PositionalVariableFunction::new(variable, maximum_x, maximum_y, method, self.values.clone())
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    pub fn number_of_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn number_of_columns(&self) -> usize {
        self.values.ncols()
    }

    pub fn minimum_value(&self) -> f64 {
        self.minimum_value
    }

    pub fn maximum_value(&self) -> f64 {
        self.maximum_value
    }
}

impl FromStr for Matrix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
