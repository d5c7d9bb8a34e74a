/// Command-line argument parsing for the `density_forecast` binary.

use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;

#[derive(Debug, Default)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
    pub date: Option<NaiveDate>,
    pub help: bool,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

pub fn parse_args_from(args: &[String]) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --config (expected a TOML file path)")?;
                if opts.config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
            }
            "--snapshot" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --snapshot (expected a CSV file path)")?;
                if opts.snapshot.replace(PathBuf::from(path)).is_some() {
                    return Err("--snapshot provided more than once".to_string());
                }
            }
            "--date" => {
                i += 1;
                let text = args.next_or_err(i, "missing value for --date (expected YYYY-MM-DD)")?;
                let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|_| format!("invalid --date '{}' (expected YYYY-MM-DD)", text))?;
                if opts.date.replace(date).is_some() {
                    return Err("--date provided more than once".to_string());
                }
            }
            "--help" | "-h" => opts.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("density_forecast: same-day occupancy forecast from historical headcounts");
    eprintln!();
    eprintln!("Usage: density_forecast [--config <path>] [--snapshot <csv>] [--date YYYY-MM-DD]");
    eprintln!();
    eprintln!("  --config <path>     TOML run configuration");
    eprintln!("  --snapshot <csv>    Read history from a CSV export instead of PostgreSQL");
    eprintln!("  --date <date>       Forecast this date instead of today");
}
