use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::DcfError;
use crate::time_value::{compound_factor, gordon_growth_value};
use crate::types::{percent_to_rate, with_metadata, ComputationOutput, Currency, Money, Percent, Rate};
use crate::DcfResult;

/// Forecast horizons beyond this are accepted but flagged.
const TYPICAL_MAX_FORECAST_YEARS: i32 = 20;

/// Terminal value share of total PV above which a warning is raised.
const TERMINAL_VALUE_WARNING_PCT: Decimal = dec!(0.75);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The five scalar assumptions driving a single-stage DCF.
///
/// Rates are whole-number percentages (5 = 5%), exactly as a user types them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    /// Year 0 free cash flow the projection grows from
    pub initial_cash_flow: Money,
    /// Annual growth of the cash flow during the explicit forecast (%)
    pub growth_rate: Percent,
    /// Discount rate applied to every forecast year and the terminal value (%)
    pub discount_rate: Percent,
    /// Number of explicit forecast years
    pub forecast_years: i32,
    /// Perpetuity growth after the forecast horizon (%)
    pub terminal_growth_rate: Percent,
}

impl Default for DcfAssumptions {
    fn default() -> Self {
        Self {
            initial_cash_flow: dec!(100),
            growth_rate: dec!(5),
            discount_rate: dec!(10),
            forecast_years: 10,
            terminal_growth_rate: dec!(2),
        }
    }
}

impl DcfAssumptions {
    /// Run the valuation engine on these assumptions.
    pub fn valuate(&self) -> DcfResult<DcfValuation> {
        valuate(
            self.initial_cash_flow,
            self.growth_rate,
            self.discount_rate,
            self.forecast_years,
            self.terminal_growth_rate,
        )
    }

    /// Same assumptions with the growth and discount rates replaced.
    pub fn with_rates(&self, growth_rate: Percent, discount_rate: Percent) -> Self {
        Self {
            growth_rate,
            discount_rate,
            ..self.clone()
        }
    }
}

/// Raw output of the valuation engine.
///
/// `cash_flows[i]` and `present_values[i]` both refer to year `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfValuation {
    pub cash_flows: Vec<Money>,
    pub present_values: Vec<Money>,
    /// Gordon growth value at the end of the forecast, undiscounted
    pub terminal_value: Money,
    pub terminal_value_pv: Money,
    /// Enterprise value: sum of `present_values` plus `terminal_value_pv`
    pub total_pv: Money,
}

/// Input for the full DCF computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInput {
    #[serde(flatten)]
    pub assumptions: DcfAssumptions,
    /// Shares outstanding, in the same unit scale as the cash flows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
    #[serde(default)]
    pub currency: Currency,
}

/// One explicit forecast year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfYearProjection {
    pub year: u32,
    pub cash_flow: Money,
    pub discount_factor: Rate,
    pub present_value: Money,
}

/// Output of [`calculate_dcf`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfOutput {
    /// Year-by-year projections
    pub projections: Vec<DcfYearProjection>,
    pub cash_flows: Vec<Money>,
    pub present_values: Vec<Money>,
    pub terminal_value: Money,
    pub terminal_value_pv: Money,
    /// Sum of present values of the explicit forecast years
    pub pv_of_cash_flows: Money,
    pub total_pv: Money,
    /// Terminal value PV as a fraction of total PV
    pub terminal_value_pct: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fair_value_per_share: Option<Money>,
    pub currency: Currency,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Single-stage DCF with a Gordon growth terminal value.
///
/// Percent arguments are whole numbers (10 means 10%). Fails with
/// [`DcfError::EmptyForecast`] when `forecast_years < 1` and with
/// [`DcfError::InvalidAssumption`] unless `discount_rate > terminal_growth_rate`.
pub fn valuate(
    initial_cash_flow: Money,
    growth_rate_pct: Percent,
    discount_rate_pct: Percent,
    forecast_years: i32,
    terminal_growth_rate_pct: Percent,
) -> DcfResult<DcfValuation> {
    let growth = percent_to_rate(growth_rate_pct);
    let discount = percent_to_rate(discount_rate_pct);
    let terminal_growth = percent_to_rate(terminal_growth_rate_pct);

    let n_years = validate_assumptions(forecast_years, discount, terminal_growth)?;

    // Reserve for typical horizons only
    let capacity = n_years.min(TYPICAL_MAX_FORECAST_YEARS as u32) as usize;
    let mut cash_flows = Vec::with_capacity(capacity);
    let mut present_values = Vec::with_capacity(capacity);
    let mut pv_sum = Decimal::ZERO;
    for year in 1..=n_years {
        let cash_flow = initial_cash_flow
            .checked_mul(compound_factor(growth, year)?)
            .ok_or_else(|| overflow(format!("cash flow at year {year}")))?;
        let present_value = cash_flow
            .checked_div(compound_factor(discount, year)?)
            .ok_or_else(|| overflow(format!("present value at year {year}")))?;
        pv_sum = pv_sum
            .checked_add(present_value)
            .ok_or_else(|| overflow("sum of present values".into()))?;
        cash_flows.push(cash_flow);
        present_values.push(present_value);
    }

    let last = *cash_flows.last().ok_or(DcfError::EmptyForecast {
        years: forecast_years,
    })?;
    let terminal_value = gordon_growth_value(last, discount, terminal_growth)?;
    let terminal_value_pv = terminal_value
        .checked_div(compound_factor(discount, n_years)?)
        .ok_or_else(|| overflow("terminal value present value".into()))?;

    let total_pv = pv_sum
        .checked_add(terminal_value_pv)
        .ok_or_else(|| overflow("total present value".into()))?;

    debug!(
        %initial_cash_flow,
        %growth_rate_pct,
        %discount_rate_pct,
        forecast_years,
        %terminal_growth_rate_pct,
        %total_pv,
        "dcf valuation"
    );

    Ok(DcfValuation {
        cash_flows,
        present_values,
        terminal_value,
        terminal_value_pv,
        total_pv,
    })
}

/// Run a DCF valuation and wrap it with projections, warnings and metadata.
pub fn calculate_dcf(input: &DcfInput) -> DcfResult<ComputationOutput<DcfOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let a = &input.assumptions;

    if let Some(shares) = input.shares_outstanding {
        if shares < Decimal::ZERO {
            return Err(DcfError::InvalidInput {
                field: "shares_outstanding".into(),
                reason: "Shares outstanding cannot be negative".into(),
            });
        }
    }

    let valuation = a.valuate()?;

    if a.forecast_years > TYPICAL_MAX_FORECAST_YEARS {
        warnings.push(format!(
            "Forecast horizon of {} years exceeds the typical {TYPICAL_MAX_FORECAST_YEARS}-year maximum",
            a.forecast_years
        ));
    }
    if a.initial_cash_flow <= Decimal::ZERO {
        warnings.push(format!(
            "Initial cash flow ({}) is not positive; projected values will be zero or negative",
            a.initial_cash_flow
        ));
    }

    let discount = percent_to_rate(a.discount_rate);
    let projections = build_projections(&valuation, discount)?;
    let pv_of_cash_flows = valuation
        .present_values
        .iter()
        .try_fold(Decimal::ZERO, |acc, pv| acc.checked_add(*pv))
        .ok_or_else(|| overflow("sum of present values".into()))?;

    let terminal_value_pct = if valuation.total_pv.is_zero() {
        Decimal::ZERO
    } else {
        valuation
            .terminal_value_pv
            .checked_div(valuation.total_pv)
            .ok_or_else(|| overflow("terminal value share of total present value".into()))?
    };
    if terminal_value_pct > TERMINAL_VALUE_WARNING_PCT {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            terminal_value_pct.saturating_mul(dec!(100))
        ));
    }

    let fair_value_per_share = fair_value_per_share(valuation.total_pv, input.shares_outstanding);

    let output = DcfOutput {
        projections,
        pv_of_cash_flows,
        terminal_value_pct,
        fair_value_per_share,
        currency: input.currency.clone(),
        cash_flows: valuation.cash_flows,
        present_values: valuation.present_values,
        terminal_value: valuation.terminal_value,
        terminal_value_pv: valuation.terminal_value_pv,
        total_pv: valuation.total_pv,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Single-Stage DCF (Gordon Growth Terminal Value)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Fair value per share, defined only for a positive share count.
pub fn fair_value_per_share(total_pv: Money, shares_outstanding: Option<Decimal>) -> Option<Money> {
    match shares_outstanding {
        Some(shares) if shares > Decimal::ZERO => total_pv.checked_div(shares),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_assumptions(forecast_years: i32, discount: Rate, terminal_growth: Rate) -> DcfResult<u32> {
    if forecast_years < 1 {
        return Err(DcfError::EmptyForecast {
            years: forecast_years,
        });
    }
    if discount <= dec!(-1) {
        return Err(DcfError::InvalidAssumption {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    if discount == terminal_growth {
        return Err(DcfError::InvalidAssumption {
            field: "terminal_growth_rate".into(),
            reason: format!(
                "Terminal growth rate ({terminal_growth}) equals the discount rate; the Gordon growth terminal value divides by zero"
            ),
        });
    }
    if discount < terminal_growth {
        return Err(DcfError::InvalidAssumption {
            field: "terminal_growth_rate".into(),
            reason: format!(
                "Terminal growth rate ({terminal_growth}) exceeds the discount rate ({discount}); the terminal value would be negative"
            ),
        });
    }
    Ok(forecast_years as u32)
}

fn overflow(context: String) -> DcfError {
    DcfError::Overflow { context }
}

fn build_projections(valuation: &DcfValuation, discount: Rate) -> DcfResult<Vec<DcfYearProjection>> {
    valuation
        .cash_flows
        .iter()
        .zip(&valuation.present_values)
        .enumerate()
        .map(|(idx, (cf, pv))| {
            let year = idx as u32 + 1;
            let discount_factor = Decimal::ONE
                .checked_div(compound_factor(discount, year)?)
                .ok_or_else(|| overflow(format!("discount factor at year {year}")))?;
            Ok(DcfYearProjection {
                year,
                cash_flow: *cf,
                discount_factor,
                present_value: *pv,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> DcfInput {
        DcfInput {
            assumptions: DcfAssumptions::default(),
            shares_outstanding: Some(dec!(1000)),
            currency: Currency::USD,
        }
    }

    #[test]
    fn test_default_assumptions() {
        let a = DcfAssumptions::default();
        assert_eq!(a.initial_cash_flow, dec!(100));
        assert_eq!(a.growth_rate, dec!(5));
        assert_eq!(a.discount_rate, dec!(10));
        assert_eq!(a.forecast_years, 10);
        assert_eq!(a.terminal_growth_rate, dec!(2));
    }

    #[test]
    fn test_first_year() {
        let v = valuate(dec!(100), dec!(5), dec!(10), 10, dec!(2)).unwrap();
        assert_eq!(v.cash_flows[0], dec!(105));
        // 105 / 1.1
        assert!((v.present_values[0] - dec!(95.4545)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_single_year_by_hand() {
        // CF1 = 110, PV1 = 100, TV = 110 * 1.0 / 0.10 = 1100, TV_PV = 1000
        let v = valuate(dec!(100), dec!(10), dec!(10), 1, dec!(0)).unwrap();
        assert_eq!(v.cash_flows, vec![dec!(110)]);
        assert_eq!(v.present_values, vec![dec!(100)]);
        assert_eq!(v.terminal_value, dec!(1100));
        assert_eq!(v.terminal_value_pv, dec!(1000));
        assert_eq!(v.total_pv, dec!(1100));
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        let v = DcfAssumptions::default().valuate().unwrap();
        let sum: Money = v.present_values.iter().copied().sum();
        assert_eq!(v.total_pv, sum + v.terminal_value_pv);
    }

    #[test]
    fn test_terminal_value_anchored_on_last_year() {
        let v = DcfAssumptions::default().valuate().unwrap();
        let last = *v.cash_flows.last().unwrap();
        assert_eq!(v.terminal_value, last * dec!(1.02) / dec!(0.08));
    }

    #[test]
    fn test_equal_rates_rejected() {
        let err = valuate(dec!(100), dec!(5), dec!(2), 10, dec!(2)).unwrap_err();
        match err {
            DcfError::InvalidAssumption { field, reason } => {
                assert_eq!(field, "terminal_growth_rate");
                assert!(reason.contains("divides by zero"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_terminal_growth_above_discount_rejected() {
        let err = valuate(dec!(100), dec!(5), dec!(3), 10, dec!(4)).unwrap_err();
        match err {
            DcfError::InvalidAssumption { reason, .. } => {
                assert!(reason.contains("exceeds the discount rate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_years_is_empty_forecast() {
        let err = valuate(dec!(100), dec!(5), dec!(10), 0, dec!(2)).unwrap_err();
        assert!(matches!(err, DcfError::EmptyForecast { years: 0 }));
        let err = valuate(dec!(100), dec!(5), dec!(10), -3, dec!(2)).unwrap_err();
        assert!(matches!(err, DcfError::EmptyForecast { years: -3 }));
    }

    #[test]
    fn test_total_loss_discount_rate_rejected() {
        let err = valuate(dec!(100), dec!(5), dec!(-100), 5, dec!(-150)).unwrap_err();
        assert!(err.is_domain_error());
    }

    #[test]
    fn test_calculate_dcf_envelope() {
        let result = calculate_dcf(&sample_input()).unwrap();
        let out = &result.result;

        assert_eq!(out.projections.len(), 10);
        assert_eq!(out.projections[0].year, 1);
        assert_eq!(out.projections[9].year, 10);
        assert_eq!(out.projections[0].cash_flow, out.cash_flows[0]);
        assert_eq!(out.total_pv, out.pv_of_cash_flows + out.terminal_value_pv);
        assert_eq!(
            result.methodology,
            "Single-Stage DCF (Gordon Growth Terminal Value)"
        );
        assert_eq!(result.assumptions["forecast_years"], 10);
    }

    #[test]
    fn test_fair_value_per_share() {
        let result = calculate_dcf(&sample_input()).unwrap();
        let out = &result.result;
        assert_eq!(out.fair_value_per_share, Some(out.total_pv / dec!(1000)));
    }

    #[test]
    fn test_fair_value_requires_positive_shares() {
        assert_eq!(fair_value_per_share(dec!(500), None), None);
        assert_eq!(fair_value_per_share(dec!(500), Some(Decimal::ZERO)), None);
        assert_eq!(fair_value_per_share(dec!(500), Some(dec!(50))), Some(dec!(10)));
    }

    #[test]
    fn test_negative_shares_rejected() {
        let mut input = sample_input();
        input.shares_outstanding = Some(dec!(-1));
        assert!(calculate_dcf(&input).is_err());
    }

    #[test]
    fn test_terminal_value_pct_warning() {
        // A thin discount/terminal spread makes the terminal value dominate
        let mut input = sample_input();
        input.assumptions.discount_rate = dec!(4);
        input.assumptions.terminal_growth_rate = dec!(3);
        let result = calculate_dcf(&input).unwrap();
        assert!(result.result.terminal_value_pct > dec!(0.75));
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("Terminal value represents")));
    }

    #[test]
    fn test_long_horizon_warning() {
        let mut input = sample_input();
        input.assumptions.forecast_years = 25;
        let result = calculate_dcf(&input).unwrap();
        assert_eq!(result.result.projections.len(), 25);
        assert!(result.warnings.iter().any(|w| w.contains("25 years")));
    }

    #[test]
    fn test_discount_factor_matches_present_value() {
        let result = calculate_dcf(&sample_input()).unwrap();
        for p in &result.result.projections {
            let implied = p.cash_flow * p.discount_factor;
            assert!((implied - p.present_value).abs() < dec!(0.0000001));
        }
    }
}
