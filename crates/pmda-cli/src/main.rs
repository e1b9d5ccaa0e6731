//! PMDA CLI - Convert PMDA package inserts into searchable medicine records.

use clap::Parser;
use pmda_cli::config::OutputFormat;
use pmda_cli::{commands, discovery, Cli, Config, Formatter};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();
    let no_color = cli.no_color;

    if let Err(e) = run(cli).await {
        // Configuration may be what failed, so only the flag decides color here
        let formatter = Formatter::new(OutputFormat::Table, !no_color);
        eprintln!("{}", formatter.error(&format!("Error: {}", e)));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> pmda_cli::Result<()> {
    // Initialize tracing (log to stderr; stdout carries debug-mode JSON)
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let config = Config::load(cli.config.as_deref())?;
    config
        .extractor
        .validate()
        .map_err(pmda_cli::CliError::Config)?;

    if let Some(path) = &cli.debug_file {
        let json = commands::execute_debug_file(path, config.extractor.clone())?;
        println!("{}", json);
        return Ok(());
    }

    // Determine output format
    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    let input = match &cli.input {
        Some(path) => path.clone(),
        None => discovery::auto_detect(Path::new("."))?,
    };
    eprintln!("{}", formatter.info(&format!("Input: {}", input.display())));

    let batch = config.resolve_batch(&cli)?;
    let report = commands::execute_batch(&input, batch, config.extractor.clone()).await?;

    commands::write_records(&cli.output, &report.records)?;

    println!("{}", formatter.format_report(&report)?);
    println!(
        "{}",
        formatter.success(&format!(
            "Wrote {} record(s) to {}",
            report.records.len(),
            cli.output.display()
        ))
    );

    Ok(())
}
