//! Year-indexed time series.
//!
//! All quantities exchanged between models are [`Timeseries`] values defined
//! on a shared [`TimeAxis`]: an immutable, strictly ascending sequence of
//! integer years, contiguous at a constant step. Alignment between series is
//! by year label; a series defined on a different axis than the one a model
//! was configured with is rejected before any numeric computation.
//!
//! The axis is shared between series via [`Arc`] so that cloning a series is
//! cheap and axis equality checks are usually pointer comparisons.

use crate::errors::{SiamError, SiamResult};
use ndarray::Array1;
use num::Float;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Type alias for the value of a time series.
pub type FloatValue = f64;

/// Type alias for a year label.
pub type Year = i64;

/// An immutable sequence of integer years, ascending and contiguous at a
/// constant step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAxis {
    years: Vec<Year>,
    step: Year,
}

impl TimeAxis {
    /// Build an axis covering `year_start..=year_end` at the given step.
    ///
    /// The end year is included only when it lands on the step grid, matching
    /// the usual half-open-range-with-inclusive-end convention of annual
    /// scenario horizons.
    pub fn from_range(year_start: Year, year_end: Year, step: Year) -> SiamResult<Self> {
        if step < 1 {
            return Err(SiamError::InvalidTimeAxis(format!(
                "step must be a positive number of years, got {}",
                step
            )));
        }
        if year_start > year_end {
            return Err(SiamError::InvalidTimeAxis(format!(
                "year_start ({}) must not be after year_end ({})",
                year_start, year_end
            )));
        }
        let years = (year_start..=year_end).step_by(step as usize).collect();
        Ok(Self { years, step })
    }

    /// Build an axis from an explicit year sequence.
    ///
    /// The sequence must be non-empty, strictly ascending and contiguous at a
    /// constant positive step. Gapped or out-of-order sequences would break
    /// the prefix-sum and discount-compounding invariants downstream, so they
    /// are rejected here rather than at first use.
    pub fn from_years(years: Vec<Year>) -> SiamResult<Self> {
        if years.is_empty() {
            return Err(SiamError::InvalidTimeAxis(
                "year sequence must not be empty".to_string(),
            ));
        }
        let step = if years.len() == 1 {
            1
        } else {
            years[1] - years[0]
        };
        if step < 1 {
            return Err(SiamError::InvalidTimeAxis(format!(
                "years must be strictly ascending, got {} after {}",
                years.get(1).copied().unwrap_or_default(),
                years[0]
            )));
        }
        for window in years.windows(2) {
            if window[1] - window[0] != step {
                return Err(SiamError::InvalidTimeAxis(format!(
                    "years must be contiguous at a constant step of {}, got {} after {}",
                    step, window[1], window[0]
                )));
            }
        }
        Ok(Self { years, step })
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn step(&self) -> Year {
        self.step
    }

    pub fn first_year(&self) -> Year {
        self.years[0]
    }

    pub fn last_year(&self) -> Year {
        self.years[self.years.len() - 1]
    }

    /// Index of `year` on this axis, if it lies on the grid.
    pub fn position(&self, year: Year) -> Option<usize> {
        if year < self.first_year() || year > self.last_year() {
            return None;
        }
        let offset = year - self.first_year();
        if offset % self.step != 0 {
            return None;
        }
        Some((offset / self.step) as usize)
    }

    /// Years elapsed since the start of the axis at `index`.
    ///
    /// This is the exponent used when compounding annual rates (discount
    /// factors) from the start year.
    pub fn offset_from_start(&self, index: usize) -> Year {
        self.years[index] - self.years[0]
    }

    /// Short human-readable description, used in alignment error messages.
    pub fn describe(&self) -> String {
        format!(
            "{} years {}..{} (step {})",
            self.len(),
            self.first_year(),
            self.last_year(),
            self.step
        )
    }
}

/// A unit-tagged series of values over a shared [`TimeAxis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeseries<T = FloatValue> {
    values: Array1<T>,
    time_axis: Arc<TimeAxis>,
    unit: String,
}

impl<T> Timeseries<T>
where
    T: Float,
{
    /// Create a new series; the number of values must match the axis length.
    pub fn new(
        values: Array1<T>,
        time_axis: Arc<TimeAxis>,
        unit: impl Into<String>,
    ) -> SiamResult<Self> {
        if values.len() != time_axis.len() {
            return Err(SiamError::TimeAxisMismatch {
                name: "values".to_string(),
                expected: time_axis.describe(),
                found: format!("{} values", values.len()),
            });
        }
        Ok(Self {
            values,
            time_axis,
            unit: unit.into(),
        })
    }

    /// A series holding the same value in every year.
    pub fn from_constant(time_axis: Arc<TimeAxis>, value: T, unit: impl Into<String>) -> Self {
        Self {
            values: Array1::from_elem(time_axis.len(), value),
            time_axis,
            unit: unit.into(),
        }
    }

    pub fn values(&self) -> &Array1<T> {
        &self.values
    }

    pub fn time_axis(&self) -> &Arc<TimeAxis> {
        &self.time_axis
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.values.get(index).copied()
    }

    /// Value at a given year label, if the year lies on the axis.
    pub fn at_year(&self, year: Year) -> Option<T> {
        self.time_axis.position(year).and_then(|i| self.get(i))
    }

    /// A new series on the same axis and unit with different values.
    pub fn with_values(&self, values: Array1<T>) -> SiamResult<Self> {
        Self::new(values, Arc::clone(&self.time_axis), self.unit.clone())
    }

    /// Running (prefix) sum of the series.
    pub fn cumsum(&self) -> Self {
        let mut total = T::zero();
        let values = self
            .values
            .iter()
            .map(|&v| {
                total = total + v;
                total
            })
            .collect();
        Self {
            values,
            time_axis: Arc::clone(&self.time_axis),
            unit: self.unit.clone(),
        }
    }

    /// Element-wise lower clip.
    pub fn clip_min(&self, lo: T) -> Self {
        Self {
            values: self.values.mapv(|v| v.max(lo)),
            time_axis: Arc::clone(&self.time_axis),
            unit: self.unit.clone(),
        }
    }

    /// Check that this series is defined on exactly the expected axis.
    ///
    /// Never reindexes or truncates; a mismatch is a caller contract
    /// violation reported with the offending series name.
    pub fn ensure_aligned(&self, expected: &TimeAxis, name: &str) -> SiamResult<()> {
        if self.time_axis.as_ref() == expected {
            Ok(())
        } else {
            Err(SiamError::TimeAxisMismatch {
                name: name.to_string(),
                expected: expected.describe(),
                found: self.time_axis.describe(),
            })
        }
    }
}
