use anyhow::{Context, Result};
use std::{fs, time::Instant};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use yelpdump::{yelp, Config};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) configure dirs ───────────────────────────────────────────
    let cfg = Config::from_env()?;
    fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("creating output directory {}", cfg.out_dir.display()))?;

    for source in yelp::Source::ALL {
        let path = cfg.input_path(source);
        if !path.exists() {
            warn!(
                "{} not found; extract the dataset archive into {}",
                path.display(),
                cfg.data_dir.display()
            );
        }
    }

    // ─── 3) convert every source into its tables ─────────────────────
    let start = Instant::now();
    let summary = yelp::convert_all(&cfg)?;

    // ─── 4) report ───────────────────────────────────────────────────
    println!("{: <25} {:>12}", "Table", "Rows");
    println!("{:-<38}", "");
    for (_, s) in &summary {
        for (table, rows) in &s.rows {
            println!("{: <25} {:>12}", table.file_name(), rows);
        }
    }

    info!(elapsed = ?start.elapsed(), out_dir = %cfg.out_dir.display(), "all done");
    Ok(())
}
