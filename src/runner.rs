/// One forecasting run: load the configured windows, forecast, render.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{Config, OutputFormat, Strategy};
use crate::forecast::{Forecaster, PredictionMatrix, SourceDecision};
use crate::ingest::RowSource;
use crate::loader;
use crate::logging::{self, Component};
use crate::model::ForecastError;
use crate::window::HistoryWindow;

/// Result of a run, ready to hand to presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    pub reference_date: NaiveDate,
    pub windows: Vec<&'static str>,
    pub matrix: PredictionMatrix,
    /// Present only for the multi-window strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decisions: Option<BTreeMap<String, SourceDecision>>,
    /// Capacity-table locations with no history in any loaded window.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub without_history: Vec<String>,
}

/// Builds the forecaster described by `config`.
pub fn build_forecaster(config: &Config) -> Result<Forecaster, ForecastError> {
    let mut forecaster = Forecaster::new(config.capacity.build_table()?)
        .with_granularity(config.forecast.selection);
    if let Some(expected) = &config.forecast.expected_locations {
        forecaster = forecaster.with_expected_locations(expected.iter().cloned());
    }
    Ok(forecaster)
}

/// Runs the configured strategy for `reference_date` against `source`.
pub fn run<S: RowSource + ?Sized>(
    config: &Config,
    source: &mut S,
    reference_date: NaiveDate,
) -> Result<RunOutput, ForecastError> {
    let forecaster = build_forecaster(config)?;

    logging::info(
        Component::System,
        None,
        &format!("Forecasting occupancy for {}", reference_date),
    );

    match config.forecast.strategy {
        Strategy::Single => {
            let window = HistoryWindow::new(config.forecast.single_window()?, reference_date);
            let history = loader::load(source, &window)?;
            Ok(RunOutput {
                reference_date,
                windows: vec![window.label()],
                matrix: forecaster.predict(&history)?,
                decisions: None,
                without_history: forecaster.locations_without_history(&[&history]),
            })
        }
        Strategy::Multi => {
            let [p, a, b] = config
                .forecast
                .multi_windows()?
                .map(|strategy| HistoryWindow::new(strategy, reference_date));
            let primary = loader::load(source, &p)?;
            let alt_a = loader::load(source, &a)?;
            let alt_b = loader::load(source, &b)?;
            let forecast = forecaster.predict_multi(&primary, &alt_a, &alt_b)?;
            Ok(RunOutput {
                reference_date,
                windows: vec![p.label(), a.label(), b.label()],
                matrix: forecast.matrix,
                decisions: Some(forecast.decisions),
                without_history: forecaster.locations_without_history(&[&primary, &alt_a, &alt_b]),
            })
        }
    }
}

/// Renders a run in the requested format.
pub fn write_output(
    output: &RunOutput,
    format: OutputFormat,
    mut writer: impl Write,
) -> Result<(), ForecastError> {
    match format {
        OutputFormat::Table => {
            writeln!(
                writer,
                "Predicted occupancy for {} ({})",
                output.reference_date,
                output.windows.join(", ")
            )?;
            write!(writer, "{}", output.matrix.render_table())?;
            if let Some(decisions) = &output.decisions {
                writeln!(writer)?;
                for (location, decision) in decisions {
                    let chosen = decision
                        .chosen
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "per-bucket".to_string());
                    writeln!(writer, "{}: {}", location, chosen)?;
                }
            }
            if !output.without_history.is_empty() {
                writeln!(writer)?;
                writeln!(writer, "No history: {}", output.without_history.join(", "))?;
            }
        }
        OutputFormat::Csv => output
            .matrix
            .write_csv(&mut writer)
            .map_err(|e| ForecastError::Io(e.to_string()))?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, output)
                .map_err(|e| ForecastError::Io(e.to_string()))?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}
