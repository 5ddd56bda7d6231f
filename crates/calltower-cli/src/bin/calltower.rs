#![allow(clippy::print_stderr)]

use anyhow::Result;
use clap::Parser;
use std::io::{IsTerminal, Write};

use calltower_cli::args::{CliArgs, OutputFormat};
use calltower_cli::driver;
use calltower_cli::reporter::Reporter;

/// Some call was unresolved, ambiguous, cancelled or reported an error.
const EXIT_RESOLUTION_ERRORS: i32 = 1;

fn main() -> Result<()> {
    // Initialize tracing if CALLTOWER_LOG or RUST_LOG is set (zero cost otherwise).
    calltower_cli::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let report = driver::run_file(&args.scenario, |options| args.apply_to(options))?;

    let mut stdout = std::io::stdout().lock();
    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        }
        OutputFormat::Text => {
            let color = args.pretty.unwrap_or_else(|| std::io::stdout().is_terminal());
            write!(stdout, "{}", Reporter::new(color).render(&report))?;
        }
    }
    stdout.flush()?;

    if report.has_errors() {
        eprintln!("calltower: some calls did not resolve cleanly");
        std::process::exit(EXIT_RESOLUTION_ERRORS);
    }
    Ok(())
}
