mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::scenarios::SensitivityArgs;
use commands::valuation::{FreeCashFlowArgs, ValuateArgs};

/// Discounted cash flow valuation and sensitivity analysis
#[derive(Parser)]
#[command(
    name = "dcf",
    version,
    about = "Discounted cash flow valuation and sensitivity analysis",
    long_about = "A CLI for single-stage discounted cash flow valuations with decimal \
                  precision. Projects free cash flows, discounts them with a Gordon growth \
                  terminal value, and sweeps discount and growth rates for sensitivity tables."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level for diagnostics on stderr (overridden by RUST_LOG)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a DCF valuation
    Valuate(ValuateArgs),
    /// Enterprise value across a grid of discount and growth rates
    Sensitivity(SensitivityArgs),
    /// Derive free cash flow from operating cash flow and capex
    FreeCashFlow(FreeCashFlowArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Valuate(args) => commands::valuation::run_valuate(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::FreeCashFlow(args) => commands::valuation::run_free_cash_flow(args),
        Commands::Version => {
            println!("dcf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            if let Err(e) = output::format_output(&cli.output, &value) {
                eprintln!("{}: {}", "error".red().bold(), e);
                process::exit(1);
            }
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
