use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::DcfError;
use crate::types::{Money, Rate};
use crate::DcfResult;

/// Compound growth factor `(1 + rate)^years`.
pub fn compound_factor(rate: Rate, years: u32) -> DcfResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powu(u64::from(years))
        .ok_or_else(|| DcfError::Overflow {
            context: format!("(1 + {rate})^{years}"),
        })
}

/// Discount a single amount received at the end of `years` back to today.
pub fn present_value(amount: Money, rate: Rate, years: u32) -> DcfResult<Money> {
    if rate <= dec!(-1) {
        return Err(DcfError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    let factor = compound_factor(rate, years)?;
    if factor.is_zero() {
        return Err(DcfError::DivisionByZero {
            context: format!("discount factor at year {years}"),
        });
    }
    amount.checked_div(factor).ok_or_else(|| DcfError::Overflow {
        context: format!("present value of {amount} at year {years}"),
    })
}

/// Net Present Value of end-of-year cash flows, the first one landing at year 1.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> DcfResult<Money> {
    let mut result = Decimal::ZERO;
    for (idx, cf) in cash_flows.iter().enumerate() {
        let pv = present_value(*cf, rate, idx as u32 + 1)?;
        result = result.checked_add(pv).ok_or_else(|| DcfError::Overflow {
            context: "sum of present values".into(),
        })?;
    }
    Ok(result)
}

/// Gordon growth perpetuity value one period after `final_flow`.
pub fn gordon_growth_value(final_flow: Money, discount: Rate, growth: Rate) -> DcfResult<Money> {
    let spread = discount - growth;
    if spread.is_zero() {
        return Err(DcfError::DivisionByZero {
            context: "Gordon growth spread (discount - growth)".into(),
        });
    }
    final_flow
        .checked_mul(Decimal::ONE + growth)
        .and_then(|grown| grown.checked_div(spread))
        .ok_or_else(|| DcfError::Overflow {
            context: format!("terminal value of {final_flow} over a spread of {spread}"),
        })
}
