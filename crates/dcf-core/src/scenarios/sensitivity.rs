use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::DcfError;
use crate::types::*;
use crate::valuation::dcf::DcfAssumptions;
use crate::DcfResult;

/// Samples per axis when none are requested.
pub const DEFAULT_SAMPLES: usize = 10;
/// Default half-width of the discount rate axis, in percentage points.
pub const DEFAULT_DISCOUNT_SPREAD: Percent = dec!(5);
/// Default half-width of the growth rate axis, in percentage points.
pub const DEFAULT_GROWTH_SPREAD: Percent = dec!(2);

pub const DISCOUNT_AXIS_LABEL: &str = "Discount Rate (%)";
pub const GROWTH_AXIS_LABEL: &str = "Growth Rate (%)";

/// One axis of the sweep: `samples` evenly spaced percentages from `min` to
/// `max`, both inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepAxis {
    pub min: Percent,
    pub max: Percent,
    pub samples: usize,
}

impl SweepAxis {
    /// Axis spanning `center ± half_width`.
    pub fn centered(center: Percent, half_width: Percent, samples: usize) -> Self {
        Self {
            min: center - half_width,
            max: center + half_width,
            samples,
        }
    }

    /// Materialise the sample points.
    pub fn values(&self, name: &str) -> DcfResult<Vec<Percent>> {
        if self.min > self.max {
            return Err(DcfError::InvalidInput {
                field: format!("axis:{name}"),
                reason: "Min must be <= max".into(),
            });
        }
        linspace(self.min, self.max, self.samples).map_err(|e| match e {
            DcfError::InvalidInput { reason, .. } => DcfError::InvalidInput {
                field: format!("axis:{name}"),
                reason,
            },
            other => other,
        })
    }
}

/// Input for a discount-rate × growth-rate sensitivity analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    #[serde(flatten)]
    pub assumptions: DcfAssumptions,
    /// Row axis; defaults to the discount rate ± 5 points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_axis: Option<SweepAxis>,
    /// Column axis; defaults to the growth rate ± 2 points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_axis: Option<SweepAxis>,
    /// Samples per defaulted axis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
}

impl SensitivityInput {
    pub fn resolved_discount_axis(&self) -> SweepAxis {
        self.discount_axis.clone().unwrap_or_else(|| {
            SweepAxis::centered(
                self.assumptions.discount_rate,
                DEFAULT_DISCOUNT_SPREAD,
                self.samples.unwrap_or(DEFAULT_SAMPLES),
            )
        })
    }

    pub fn resolved_growth_axis(&self) -> SweepAxis {
        self.growth_axis.clone().unwrap_or_else(|| {
            SweepAxis::centered(
                self.assumptions.growth_rate,
                DEFAULT_GROWTH_SPREAD,
                self.samples.unwrap_or(DEFAULT_SAMPLES),
            )
        })
    }
}

/// Grid of total present values.
///
/// `values[i][j]` is the valuation at `discount_rates[i]` and `growth_rates[j]`.
/// A cell is `None` when that rate pair lies outside the valid valuation
/// domain (e.g. discount rate not above the terminal growth rate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityMatrix {
    pub discount_rates: Vec<Percent>,
    pub growth_rates: Vec<Percent>,
    pub values: Vec<Vec<Option<Money>>>,
    /// Human-readable reason for every empty cell, in row-major order
    pub skipped: Vec<String>,
}

impl SensitivityMatrix {
    pub fn rows(&self) -> usize {
        self.discount_rates.len()
    }

    pub fn cols(&self) -> usize {
        self.growth_rates.len()
    }

    /// Smallest and largest valid cell, if any.
    pub fn value_range(&self) -> Option<(Money, Money)> {
        let mut cells = self.values.iter().flatten().flatten().copied();
        let first = cells.next()?;
        Some(cells.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Output of [`run_sensitivity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub row_label: String,
    pub column_label: String,
    /// Row axis values
    pub discount_rates: Vec<Percent>,
    /// Column axis values
    pub growth_rates: Vec<Percent>,
    /// Matrix[i][j] = total PV at discount_rates[i], growth_rates[j]
    pub matrix: Vec<Vec<Option<Money>>>,
    /// Total PV at the unperturbed assumptions
    pub base_case_value: Money,
    /// Cell (row, col) closest to the unperturbed assumptions
    pub base_case_position: (usize, usize),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// `samples` evenly spaced values from `start` to `end` inclusive.
///
/// A single sample yields `[start]`.
pub fn linspace(start: Decimal, end: Decimal, samples: usize) -> DcfResult<Vec<Decimal>> {
    match samples {
        0 => Err(DcfError::InvalidInput {
            field: "samples".into(),
            reason: "At least one sample is required".into(),
        }),
        1 => Ok(vec![start]),
        n => {
            let step = (end - start) / Decimal::from(n - 1);
            let mut values: Vec<Decimal> = (0..n - 1)
                .map(|i| start + step * Decimal::from(i))
                .collect();
            // Pin the endpoint instead of accumulating rounding error onto it
            values.push(end);
            Ok(values)
        }
    }
}

/// Evaluate the valuation engine over every (discount, growth) pair.
///
/// All other assumptions are held at their values in `assumptions`.
pub fn sweep(
    assumptions: &DcfAssumptions,
    discount_axis: &SweepAxis,
    growth_axis: &SweepAxis,
) -> DcfResult<SensitivityMatrix> {
    let discount_rates = discount_axis.values("discount_rate")?;
    let growth_rates = growth_axis.values("growth_rate")?;

    debug!(
        rows = discount_rates.len(),
        cols = growth_rates.len(),
        "sensitivity sweep"
    );

    #[cfg(feature = "parallel")]
    let rows: DcfResult<Vec<SweepRow>> = discount_rates
        .par_iter()
        .map(|dr| sweep_row(assumptions, *dr, &growth_rates))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let rows: DcfResult<Vec<SweepRow>> = discount_rates
        .iter()
        .map(|dr| sweep_row(assumptions, *dr, &growth_rates))
        .collect();

    let mut values = Vec::with_capacity(discount_rates.len());
    let mut skipped = Vec::new();
    for row in rows? {
        values.push(row.cells);
        skipped.extend(row.skipped);
    }

    Ok(SensitivityMatrix {
        discount_rates,
        growth_rates,
        values,
        skipped,
    })
}

/// Run the sweep around the current assumptions and wrap it with metadata.
pub fn run_sensitivity(
    input: &SensitivityInput,
) -> DcfResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();

    // The unperturbed case must itself be valid
    let base = input.assumptions.valuate()?;

    let discount_axis = input.resolved_discount_axis();
    let growth_axis = input.resolved_growth_axis();
    let matrix = sweep(&input.assumptions, &discount_axis, &growth_axis)?;

    let mut warnings: Vec<String> = Vec::new();
    if !matrix.skipped.is_empty() {
        warnings.push(format!(
            "{} of {} cells lie outside the valid valuation domain and were left empty",
            matrix.skipped.len(),
            matrix.rows() * matrix.cols()
        ));
        warnings.extend(matrix.skipped.iter().cloned());
    }

    let base_case_position = (
        closest_index(&matrix.discount_rates, input.assumptions.discount_rate),
        closest_index(&matrix.growth_rates, input.assumptions.growth_rate),
    );
    let (min_value, max_value) = match matrix.value_range() {
        Some((lo, hi)) => (Some(lo), Some(hi)),
        None => (None, None),
    };

    let output = SensitivityOutput {
        row_label: DISCOUNT_AXIS_LABEL.to_string(),
        column_label: GROWTH_AXIS_LABEL.to_string(),
        discount_rates: matrix.discount_rates,
        growth_rates: matrix.growth_rates,
        matrix: matrix.values,
        base_case_value: base.total_pv,
        base_case_position,
        min_value,
        max_value,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way DCF Sensitivity (Discount Rate x Growth Rate)",
        &serde_json::json!({
            "assumptions": input.assumptions,
            "discount_axis": discount_axis,
            "growth_axis": growth_axis,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct SweepRow {
    cells: Vec<Option<Money>>,
    skipped: Vec<String>,
}

fn sweep_row(
    assumptions: &DcfAssumptions,
    discount_rate: Percent,
    growth_rates: &[Percent],
) -> DcfResult<SweepRow> {
    let mut cells = Vec::with_capacity(growth_rates.len());
    let mut skipped = Vec::new();
    for gr in growth_rates {
        match assumptions.with_rates(*gr, discount_rate).valuate() {
            Ok(v) => cells.push(Some(v.total_pv)),
            Err(e) if e.is_domain_error() => {
                warn!(discount_rate = %discount_rate, growth_rate = %gr, error = %e, "sensitivity cell skipped");
                skipped.push(format!(
                    "Evaluation skipped at (discount {discount_rate}%, growth {gr}%): {e}"
                ));
                cells.push(None);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(SweepRow { cells, skipped })
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}
