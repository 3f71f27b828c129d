//! Two-dimensional lookup functions over the arena.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use venkman_core::{linear_interpolation, Error, Result, TrackerPoint};
use venkman_tracking::LarvaFrameData;

use crate::range::OutOfRangeErrorHandlingMethod;
use crate::variable::PositionalVariable;

pub const DEFAULT_ARENA_WIDTH: f64 = 400.0;
pub const DEFAULT_ARENA_HEIGHT: f64 = 400.0;

const MINIMUM_POSITION_MAXIMUM: f64 = 1e-8;

/// Bilinear lookup of `values` (rows indexed by y, columns by x) stretched
/// over `[0, maximum_x] × [0, maximum_y]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PositionalDefinition", into = "PositionalDefinition")]
pub struct PositionalVariableFunction {
    variable: PositionalVariable,
    maximum_x: f64,
    maximum_y: f64,
    x_range_error_handling_method: OutOfRangeErrorHandlingMethod,
    y_range_error_handling_method: OutOfRangeErrorHandlingMethod,
    values: Array2<f64>,
    factor_x: f64,
    factor_y: f64,
}

impl PositionalVariableFunction {
    pub fn new(
        variable: PositionalVariable,
        maximum_x: f64,
        maximum_y: f64,
        position_range_error_handling_method: OutOfRangeErrorHandlingMethod,
        values: Array2<f64>,
    ) -> Result<Self> {
        if maximum_x.is_nan() || maximum_x <= MINIMUM_POSITION_MAXIMUM {
            return Err(Error::InvalidFunction(format!(
                "maximum x value ({maximum_x}) must be greater than zero"
            )));
        }
        if maximum_y.is_nan() || maximum_y <= MINIMUM_POSITION_MAXIMUM {
            return Err(Error::InvalidFunction(format!(
                "maximum y value ({maximum_y}) must be greater than zero"
            )));
        }
        let (rows, columns) = values.dim();
        if rows == 0 || columns == 0 {
            return Err(Error::InvalidFunction("values not defined for function".into()));
        }

        Ok(Self {
            variable,
            maximum_x,
            maximum_y,
            x_range_error_handling_method: position_range_error_handling_method,
            y_range_error_handling_method: position_range_error_handling_method,
            values,
            factor_x: (columns - 1) as f64 / maximum_x,
            factor_y: (rows - 1) as f64 / maximum_y,
        })
    }

    /// Build from row vectors, rejecting ragged input.
    pub fn from_rows(
        variable: PositionalVariable,
        maximum_x: f64,
        maximum_y: f64,
        position_range_error_handling_method: OutOfRangeErrorHandlingMethod,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let values = rows_to_array(rows)?;
        Self::new(variable, maximum_x, maximum_y, position_range_error_handling_method, values)
    }

    pub fn with_axis_policies(
        mut self,
        x_range_error_handling_method: OutOfRangeErrorHandlingMethod,
        y_range_error_handling_method: OutOfRangeErrorHandlingMethod,
    ) -> Self {
        self.x_range_error_handling_method = x_range_error_handling_method;
        self.y_range_error_handling_method = y_range_error_handling_method;
        self
    }

    /// Value at the function's variable position in `frame`.
    pub fn value(&self, frame: &LarvaFrameData) -> Result<f64> {
        self.value_at_point(&self.variable.value(frame))
    }

    pub fn value_at_point(&self, point: &TrackerPoint) -> Result<f64> {
        self.value_at(point.x, point.y)
    }

    pub fn value_at(&self, x: f64, y: f64) -> Result<f64> {
        let (rows, columns) = self.values.dim();
        let y = bounded(y, self.maximum_y, self.y_range_error_handling_method)?;
        let x = bounded(x, self.maximum_x, self.x_range_error_handling_method)?;
        let row = GridAxis::locate(y, self.factor_y, rows)?;
        let column = GridAxis::locate(x, self.factor_x, columns)?;
        Ok(self.interpolate(&row, &column))
    }

    /// Sample the function at every pixel of a `height × width` raster
    /// whose extent covers the whole grid.
    pub fn arena(&self, width: usize, height: usize) -> Result<Array2<f64>> {
        if width < 1 || height < 1 {
            return Err(Error::InvalidInput(format!(
                "arena dimensions must be positive, got {width} x {height}"
            )));
        }
        let (rows, columns) = self.values.dim();
        let raster_factor = |cells: usize, pixels: usize| {
            if pixels > 1 {
                (cells - 1) as f64 / (pixels - 1) as f64
            } else {
                0.0
            }
        };
        let row_factor = raster_factor(rows, height);
        let column_factor = raster_factor(columns, width);

        let mut arena = Array2::zeros((height, width));
        for ((pixel_row, pixel_column), value) in arena.indexed_iter_mut() {
            let row = GridAxis::locate(pixel_row as f64, row_factor, rows)?;
            let column = GridAxis::locate(pixel_column as f64, column_factor, columns)?;
            *value = self.interpolate(&row, &column);
        }
        Ok(arena)
    }

    fn interpolate(&self, row: &GridAxis, column: &GridAxis) -> f64 {
        let along_x = |r: usize| {
            linear_interpolation(
                column.scaled,
                column.previous as f64,
                self.values[[r, column.previous]],
                column.next as f64,
                self.values[[r, column.next]],
            )
        };
        linear_interpolation(
            row.scaled,
            row.previous as f64,
            along_x(row.previous),
            row.next as f64,
            along_x(row.next),
        )
    }

    pub fn variable(&self) -> PositionalVariable {
        self.variable
    }

    pub fn maximum_x(&self) -> f64 {
        self.maximum_x
    }

    pub fn maximum_y(&self) -> f64 {
        self.maximum_y
    }

    pub fn x_range_error_handling_method(&self) -> OutOfRangeErrorHandlingMethod {
        self.x_range_error_handling_method
    }

    pub fn y_range_error_handling_method(&self) -> OutOfRangeErrorHandlingMethod {
        self.y_range_error_handling_method
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn minimum_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn maximum_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

impl Default for PositionalVariableFunction {
    fn default() -> Self {
        Self {
            variable: PositionalVariable::Head,
            maximum_x: DEFAULT_ARENA_WIDTH,
            maximum_y: DEFAULT_ARENA_HEIGHT,
            x_range_error_handling_method: OutOfRangeErrorHandlingMethod::EndSessionForMinimumAndMaximum,
            y_range_error_handling_method: OutOfRangeErrorHandlingMethod::EndSessionForMinimumAndMaximum,
            values: Array2::zeros((1, 1)),
            factor_x: 0.0,
            factor_y: 0.0,
        }
    }
}

/// Bracketing grid indices for one axis.
struct GridAxis {
    scaled: f64,
    previous: usize,
    next: usize,
}

impl GridAxis {
    fn locate(position: f64, factor: f64, cells: usize) -> Result<Self> {
        let scaled = position * factor;
        let previous = scaled.floor();
        let last = cells - 1;
        if !(0.0..=last as f64).contains(&previous) {
            return Err(Error::IndexOutOfRange {
                index: previous as i64,
                input: position,
                last,
            });
        }
        let previous = previous as usize;
        Ok(Self {
            scaled,
            previous,
            next: (previous + 1).min(last),
        })
    }
}

fn bounded(position: f64, maximum: f64, method: OutOfRangeErrorHandlingMethod) -> Result<f64> {
    if position < 0.0 && method.repeat_minimum() {
        Ok(0.0)
    } else if position > maximum && method.repeat_maximum() {
        Ok(maximum)
    } else if (0.0..=maximum).contains(&position) {
        Ok(position)
    } else {
        Err(Error::OutOfRange {
            input: position,
            minimum: 0.0,
            maximum,
        })
    }
}

fn rows_to_array(rows: Vec<Vec<f64>>) -> Result<Array2<f64>> {
    let columns = rows.first().map(Vec::len).unwrap_or(0);
    if let Some(index) = rows.iter().position(|row| row.len() != columns) {
        return Err(Error::InvalidFunction(format!(
            "row {} has {} values but the first row has {}",
            index + 1,
            rows[index].len(),
            columns
        )));
    }
    let row_count = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((row_count, columns), flat).map_err(|e| Error::InvalidFunction(e.to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PositionalDefinition {
    variable: PositionalVariable,
    maximum_x: f64,
    maximum_y: f64,
    #[serde(default)]
    x_range_error_handling_method: OutOfRangeErrorHandlingMethod,
    #[serde(default)]
    y_range_error_handling_method: OutOfRangeErrorHandlingMethod,
    values: Vec<Vec<f64>>,
}

impl TryFrom<PositionalDefinition> for PositionalVariableFunction {
    type Error = Error;

    fn try_from(definition: PositionalDefinition) -> Result<Self> {
        Ok(Self::from_rows(
            definition.variable,
            definition.maximum_x,
            definition.maximum_y,
            definition.x_range_error_handling_method,
            definition.values,
        )?
        .with_axis_policies(
            definition.x_range_error_handling_method,
            definition.y_range_error_handling_method,
        ))
    }
}

impl From<PositionalVariableFunction> for PositionalDefinition {
    fn from(function: PositionalVariableFunction) -> Self {
        Self {
            variable: function.variable,
            maximum_x: function.maximum_x,
            maximum_y: function.maximum_y,
            x_range_error_handling_method: function.x_range_error_handling_method,
            y_range_error_handling_method: function.y_range_error_handling_method,
            values: function.values.rows().into_iter().map(|row| row.to_vec()).collect(),
        }
    }
}
