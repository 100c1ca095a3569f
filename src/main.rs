use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use csv2ledger::{
    append_redirected, Cli, Config, Converter, CsvParser, DeduplicationEngine, Renderer,
    RuleEngine,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    run(&cli)
}

/// Logs go to stderr; stdout may be the ledger itself
fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli)?;

    // Mapping problems are fatal before any row is read
    let mapping_file = config
        .mapping_file
        .as_ref()
        .context("No mapping file configured (use --mapping-file or mapping_file in the config)")?;
    let rules = RuleEngine::from_file(mapping_file)
        .with_context(|| format!("Failed to load mapping file: {}", mapping_file.display()))?;

    let dedup = match (&config.ledger_file, config.skip_dupes) {
        (Some(ledger), true) => DeduplicationEngine::from_ledger_file(ledger),
        (None, true) => {
            warn!("--skip-dupes without a ledger file only drops repeats within this input");
            DeduplicationEngine::new()
        }
        (_, false) => DeduplicationEngine::new(),
    };

    let mut converter = Converter::new(
        CsvParser::new(config.csv_options()?),
        rules,
        Renderer::new(config.render_options()),
        config.converter_options(),
    )
    .with_dedup(dedup);

    let input: Box<dyn BufRead> = match cli.input_path() {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let mut output: Box<dyn Write> = match &cli.outfile {
        Some(path) => Box::new(BufWriter::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open output: {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let summary = converter.convert(input, &mut output)?;
    output.flush().context("Failed to flush ledger output")?;
    append_redirected(&summary)?;

    info!(
        rows = summary.rows_read,
        written = summary.entries_written,
        duplicates = summary.duplicates_skipped,
        rejected = summary.rejected.len(),
        "done"
    );

    Ok(())
}
