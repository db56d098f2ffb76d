use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use yelpdump::{config::parse_delimiter, extract_file, ExtractSpec};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Split delimited records and write selected fields, one line per record"
)]
struct Args {
    /// Delimited input file
    input: PathBuf,
    /// Output file (created or replaced)
    output: PathBuf,
    #[arg(short, long, default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,
    #[arg(short, long, default_value = "|", value_parser = parse_delimiter)]
    output_delimiter: u8,
    /// Input starts with a header line
    #[arg(long)]
    header: bool,
    /// Fields every record must have
    #[arg(short, long)]
    fields: Option<usize>,
    /// 0-based columns to keep, in output order (default: all)
    #[arg(short, long, value_delimiter = ',')]
    columns: Vec<usize>,
    /// Replace ' with ` and newlines with spaces in kept fields
    #[arg(long)]
    clean: bool,
    /// Start the output with a line of column names
    #[arg(long)]
    with_header: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let spec = ExtractSpec {
        delimiter: args.delimiter,
        output_delimiter: args.output_delimiter,
        has_header: args.header,
        expected_fields: args.fields,
        columns: args.columns,
        clean: args.clean,
        with_header: args.with_header,
    };

    let stats = extract_file(&args.input, &args.output, &spec)?;
    info!(
        records = stats.records,
        lines = stats.lines,
        "wrote {}",
        args.output.display()
    );
    Ok(())
}
