use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use dcf_core::scenarios::sensitivity::{self, SensitivityInput, SweepAxis};

use super::valuation::AssumptionArgs;
use crate::input;

/// Arguments for the discount-rate × growth-rate sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Half-width of the discount rate axis, in percentage points
    #[arg(long, default_value = "5")]
    pub discount_spread: Decimal,

    /// Half-width of the growth rate axis, in percentage points
    #[arg(long, default_value = "2")]
    pub growth_spread: Decimal,

    /// Samples per axis
    #[arg(long, default_value_t = sensitivity::DEFAULT_SAMPLES)]
    pub samples: usize,
}

impl SensitivityArgs {
    fn to_input(&self) -> Result<SensitivityInput, Box<dyn std::error::Error>> {
        let assumptions = self.assumptions.to_assumptions()?;
        Ok(SensitivityInput {
            discount_axis: Some(SweepAxis::centered(
                assumptions.discount_rate,
                self.discount_spread,
                self.samples,
            )),
            growth_axis: Some(SweepAxis::centered(
                assumptions.growth_rate,
                self.growth_spread,
                self.samples,
            )),
            samples: Some(self.samples),
            assumptions,
        })
    }
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sens_input: SensitivityInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        args.to_input()?
    };

    let result = sensitivity::run_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}
