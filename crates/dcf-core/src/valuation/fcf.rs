use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DcfError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::DcfResult;

/// Free cash flow: operating cash flow less capital expenditures.
pub fn free_cash_flow(operating_cash_flow: Money, capital_expenditures: Money) -> Money {
    operating_cash_flow - capital_expenditures
}

/// Scale a raw figure (e.g. dollars, share count) to millions.
pub fn to_millions(value: Decimal) -> Decimal {
    value / dec!(1000000)
}

/// Latest reported figures for a company, as handed over by a data provider.
///
/// Any field may be missing; the accessors report the gap instead of
/// inventing a value, leaving the fallback decision to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_cash_flow: Option<Money>,
    /// Reported as a positive outflow; missing means none reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital_expenditures: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
}

impl FinancialSnapshot {
    /// Initial free cash flow for a valuation.
    pub fn free_cash_flow(&self) -> DcfResult<Money> {
        let ocf = self
            .operating_cash_flow
            .ok_or_else(|| DcfError::UpstreamDataUnavailable(self.describe("operating cash flow")))?;
        let capex = self.capital_expenditures.unwrap_or(Decimal::ZERO);
        Ok(free_cash_flow(ocf, capex))
    }

    /// Shares outstanding; zero counts as unavailable.
    pub fn shares_outstanding(&self) -> DcfResult<Decimal> {
        match self.shares_outstanding {
            Some(shares) if shares > Decimal::ZERO => Ok(shares),
            _ => Err(DcfError::UpstreamDataUnavailable(
                self.describe("shares outstanding"),
            )),
        }
    }

    /// Same snapshot with every figure scaled to millions.
    pub fn in_millions(&self) -> Self {
        Self {
            ticker: self.ticker.clone(),
            operating_cash_flow: self.operating_cash_flow.map(to_millions),
            capital_expenditures: self.capital_expenditures.map(to_millions),
            shares_outstanding: self.shares_outstanding.map(to_millions),
        }
    }

    fn describe(&self, what: &str) -> String {
        match &self.ticker {
            Some(t) => format!("{what} is not available for {}", t.to_uppercase()),
            None => format!("{what} is not available"),
        }
    }
}

/// Output of [`derive_free_cash_flow`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeCashFlowOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    pub operating_cash_flow: Money,
    pub capital_expenditures: Money,
    pub free_cash_flow: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
}

/// Derive the initial free cash flow (and share count, when reported) from a
/// provider snapshot.
///
/// Missing operating cash flow is an error; missing capex or shares only
/// produce warnings so the caller can decide on a manual fallback.
pub fn derive_free_cash_flow(
    snapshot: &FinancialSnapshot,
) -> DcfResult<ComputationOutput<FreeCashFlowOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let free_cash_flow = snapshot.free_cash_flow()?;
    if snapshot.capital_expenditures.is_none() {
        warnings.push("Capital expenditures not reported; treated as zero".into());
    }
    let shares_outstanding = match snapshot.shares_outstanding() {
        Ok(shares) => Some(shares),
        Err(e) => {
            warnings.push(e.to_string());
            None
        }
    };

    let output = FreeCashFlowOutput {
        ticker: snapshot.ticker.as_ref().map(|t| t.to_uppercase()),
        operating_cash_flow: snapshot.operating_cash_flow.unwrap_or_default(),
        capital_expenditures: snapshot.capital_expenditures.unwrap_or_default(),
        free_cash_flow,
        shares_outstanding,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Free Cash Flow (Operating Cash Flow - Capital Expenditures)",
        snapshot,
        warnings,
        elapsed,
        output,
    ))
}
