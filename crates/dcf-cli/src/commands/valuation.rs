use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tracing::debug;

use dcf_core::types::Currency;
use dcf_core::valuation::dcf::{self, DcfAssumptions, DcfInput};
use dcf_core::valuation::fcf::{self, FinancialSnapshot};

use crate::input;

/// Valuation assumptions shared by every model command
#[derive(Args, Debug, Clone)]
#[command(allow_hyphen_values = true)]
pub struct AssumptionArgs {
    /// Year 0 free cash flow (e.g. 100 for $100M)
    #[arg(long)]
    pub initial_cash_flow: Option<Decimal>,

    /// Operating cash flow; with --capex derives the initial free cash flow
    #[arg(long, conflicts_with = "initial_cash_flow")]
    pub operating_cash_flow: Option<Decimal>,

    /// Capital expenditures (positive outflow)
    #[arg(long, requires = "operating_cash_flow")]
    pub capex: Option<Decimal>,

    /// Treat --operating-cash-flow, --capex and --shares as raw units and scale them to millions
    #[arg(long)]
    pub in_millions: bool,

    /// Annual growth rate in percent (e.g. 5 for 5%)
    #[arg(long, default_value = "5")]
    pub growth_rate: Decimal,

    /// Discount rate in percent
    #[arg(long, default_value = "10")]
    pub discount_rate: Decimal,

    /// Terminal (perpetuity) growth rate in percent
    #[arg(long, default_value = "2")]
    pub terminal_growth_rate: Decimal,

    /// Explicit forecast years
    #[arg(long, default_value_t = 10)]
    pub years: i32,
}

impl AssumptionArgs {
    /// Build assumptions, deriving the initial cash flow from operating
    /// figures when they are supplied.
    pub fn to_assumptions(&self) -> Result<DcfAssumptions, Box<dyn std::error::Error>> {
        let initial_cash_flow = match (self.initial_cash_flow, self.operating_cash_flow) {
            (Some(icf), _) => icf,
            (None, Some(ocf)) => {
                let mut snapshot = FinancialSnapshot {
                    operating_cash_flow: Some(ocf),
                    capital_expenditures: self.capex,
                    ..FinancialSnapshot::default()
                };
                if self.in_millions {
                    snapshot = snapshot.in_millions();
                }
                snapshot.free_cash_flow()?
            }
            (None, None) => dec!(100),
        };

        Ok(DcfAssumptions {
            initial_cash_flow,
            growth_rate: self.growth_rate,
            discount_rate: self.discount_rate,
            forecast_years: self.years,
            terminal_growth_rate: self.terminal_growth_rate,
        })
    }

    /// Scale a raw share count the same way as the cash flow figures.
    pub fn scale_shares(&self, shares: Decimal) -> Decimal {
        if self.in_millions {
            fcf::to_millions(shares)
        } else {
            shares
        }
    }
}

/// Arguments for a DCF valuation
#[derive(Args)]
pub struct ValuateArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Shares outstanding, for a fair value per share
    #[arg(long)]
    pub shares: Option<Decimal>,
}

/// Arguments for deriving free cash flow from reported figures
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct FreeCashFlowArgs {
    /// Path to JSON or YAML file with a financial snapshot
    #[arg(long)]
    pub input: Option<String>,

    /// Ticker the figures belong to
    #[arg(long)]
    pub ticker: Option<String>,

    /// Operating cash flow
    #[arg(long)]
    pub operating_cash_flow: Option<Decimal>,

    /// Capital expenditures (positive outflow)
    #[arg(long)]
    pub capex: Option<Decimal>,

    /// Shares outstanding
    #[arg(long)]
    pub shares: Option<Decimal>,

    /// Scale every figure to millions
    #[arg(long)]
    pub in_millions: bool,
}

pub fn run_valuate(args: ValuateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dcf_input: DcfInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        DcfInput {
            assumptions: args.assumptions.to_assumptions()?,
            shares_outstanding: args.shares.map(|s| args.assumptions.scale_shares(s)),
            currency: Currency::USD,
        }
    };
    debug!(?dcf_input, "running dcf valuation");

    let result = dcf::calculate_dcf(&dcf_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_free_cash_flow(args: FreeCashFlowArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut snapshot: FinancialSnapshot = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        FinancialSnapshot {
            ticker: args.ticker.clone(),
            operating_cash_flow: args.operating_cash_flow,
            capital_expenditures: args.capex,
            shares_outstanding: args.shares,
        }
    };
    if args.in_millions {
        snapshot = snapshot.in_millions();
    }

    let result = fcf::derive_free_cash_flow(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args() -> AssumptionArgs {
        AssumptionArgs {
            initial_cash_flow: None,
            operating_cash_flow: None,
            capex: None,
            in_millions: false,
            growth_rate: dec!(5),
            discount_rate: dec!(10),
            terminal_growth_rate: dec!(2),
            years: 10,
        }
    }

    #[test]
    fn test_defaults_match_reference_assumptions() {
        assert_eq!(args().to_assumptions().unwrap(), DcfAssumptions::default());
    }

    #[test]
    fn test_initial_cash_flow_from_operating_figures() {
        let mut a = args();
        a.operating_cash_flow = Some(dec!(250_000_000));
        a.capex = Some(dec!(50_000_000));
        a.in_millions = true;
        assert_eq!(a.to_assumptions().unwrap().initial_cash_flow, dec!(200));
        assert_eq!(a.scale_shares(dec!(1_500_000_000)), dec!(1500));
    }

    #[test]
    fn test_explicit_initial_cash_flow_wins() {
        let mut a = args();
        a.initial_cash_flow = Some(dec!(42));
        assert_eq!(a.to_assumptions().unwrap().initial_cash_flow, dec!(42));
    }
}
