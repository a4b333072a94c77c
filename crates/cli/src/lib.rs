pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use packslip_core::config::{AppConfig, LoadOptions};

use crate::commands::input::LedgerInput;

#[derive(Debug, Parser)]
#[command(
    name = "packslip",
    about = "Packing slip operator CLI",
    long_about = "Turn a sales order into a roll-by-roll weight ledger, then render the packing slip, export the workbook or draft the dispatch email.",
    after_help = "Examples:\n  packslip new-order --output order.toml\n  packslip summary --order order.toml --weights weights.txt --json\n  packslip export --order order.toml --weight 0=10.5 --output-dir exports"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Write an order draft skeleton with a generated order id")]
    NewOrder {
        #[arg(long, value_name = "PATH", help = "Write the draft here instead of stdout")]
        output: Option<PathBuf>,
    },
    #[command(about = "Print roll counts and weight totals per product and overall")]
    Summary {
        #[command(flatten)]
        input: LedgerInput,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Render the printable packing slip (HTML, or PDF when wkhtmltopdf is available)")]
    Slip {
        #[command(flatten)]
        input: LedgerInput,
        #[arg(long, value_name = "PATH", help = "Output file (defaults to the export directory)")]
        output: Option<PathBuf>,
        #[arg(long, help = "Request PDF output")]
        pdf: bool,
    },
    #[command(about = "Write the packing slip workbook (.xlsx)")]
    Export {
        #[command(flatten)]
        input: LedgerInput,
        #[arg(long, value_name = "DIR", help = "Directory for the workbook")]
        output_dir: Option<PathBuf>,
    },
    #[command(about = "Draft the dispatch notification email with the configured text-generation provider")]
    Email {
        #[command(flatten)]
        input: LedgerInput,
    },
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Config problems are reported by the command itself; logging falls back to defaults.
    let logging = AppConfig::load(LoadOptions::default()).unwrap_or_default().logging;
    logging::init_logging(&logging);

    let result = match cli.command {
        Command::NewOrder { output } => commands::new_order::run(output.as_deref()),
        Command::Summary { input, json } => commands::summary::run(&input, json),
        Command::Slip { input, output, pdf } => commands::slip::run(&input, output.as_deref(), pdf),
        Command::Export { input, output_dir } => commands::export::run(&input, output_dir.as_deref()),
        Command::Email { input } => commands::email::run(&input),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
