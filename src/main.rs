/// Entry point: configuration, logging, source selection, one forecast run.

use std::fs::File;
use std::io::{self, BufWriter};
use std::process;

use chrono::Local;
use postgres::{Client, NoTls};

use density_forecast::cli::{self, CliOptions};
use density_forecast::config::Config;
use density_forecast::ingest::{PostgresSource, SnapshotSource};
use density_forecast::logging::{self, Component};
use density_forecast::model::ForecastError;
use density_forecast::runner;

fn main() {
    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {}", e);
            cli::print_usage();
            process::exit(2);
        }
    };
    if opts.help {
        cli::print_usage();
        return;
    }

    if let Err(e) = run(opts) {
        logging::error(Component::System, None, &e.to_string());
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(opts: CliOptions) -> Result<(), ForecastError> {
    dotenv::dotenv().ok();

    let mut config = match &opts.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };
    if opts.snapshot.is_some() {
        config.database.snapshot = opts.snapshot.clone();
    }

    logging::init_logger(
        config.logging.min_level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    // "Today" is read once here; everything below takes it as input.
    let reference_date = opts
        .date
        .or(config.forecast.reference_date)
        .unwrap_or_else(|| Local::now().date_naive());

    let output = match &config.database.snapshot {
        Some(path) => {
            let mut source = SnapshotSource::open(path)?;
            runner::run(&config, &mut source, reference_date)?
        }
        None => {
            let url = std::env::var(&config.database.url_env).map_err(|_| ForecastError::Config {
                field: "database.url_env".to_string(),
                message: format!("environment variable {} is not set", config.database.url_env),
            })?;
            let mut client = Client::connect(&url, NoTls)?;
            logging::info(Component::Database, None, "Connected to density database");
            let mut source = PostgresSource::new(&mut client);
            runner::run(&config, &mut source, reference_date)?
        }
    };

    match &config.output.path {
        Some(path) => {
            let file = File::create(path)?;
            runner::write_output(&output, config.output.format, BufWriter::new(file))?;
            logging::info(
                Component::System,
                None,
                &format!("Wrote forecast to {}", path.display()),
            );
        }
        None => runner::write_output(&output, config.output.format, io::stdout().lock())?,
    }

    Ok(())
}
