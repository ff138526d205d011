// Circular Trace - command line front end
//
// Loads the configured dataset and prints summaries, writes exports and
// renders sustainability reports.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use circular_trace::{
    client_report_filename, client_report_rows, compose_report, dashboard_summary,
    export_filename, lot_series, to_csv, Config, ExportDataset, ExportFormat, FlowType,
    LotFilter, LotRepository, ReportPeriod, ReportStandard,
};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "circular-trace")]
#[command(about = "Traceability metrics, exports and reports for reusable packaging lots")]
#[command(version)]
struct Cli {
    /// TOML configuration file (falls back to CIRCULAR_TRACE_CONFIG)
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the dashboard summary as JSON
    Summary {
        #[arg(long)]
        client: Option<String>,
        #[arg(long, value_name = "FLOW")]
        flow_type: Option<FlowType>,
    },

    /// Write lots, cycles or exhibitors to a CSV or XLSX file
    Export {
        #[arg(long)]
        dataset: ExportDataset,
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        #[arg(long)]
        client: Option<String>,
        /// Output file name without extension
        #[arg(long, value_name = "BASE")]
        name: String,
    },

    /// Write the per-client lot report
    ClientReport {
        #[arg(long)]
        client: String,
        /// Report date, today when omitted
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },

    /// Compose an ESR, GRI, NIS or GHG report
    Report {
        #[arg(long)]
        standard: ReportStandard,
        #[arg(long)]
        client: String,
        #[arg(long)]
        company: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        from: NaiveDate,
        #[arg(long, value_name = "YYYY-MM-DD")]
        to: NaiveDate,
        /// Print the document as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print a lot's cumulative emissions series as JSON
    Series {
        #[arg(long)]
        lot: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let repo = config.repository()?;

    match cli.command {
        Command::Summary { client, flow_type } => {
            let filter = LotFilter { client, flow_type, status: None };
            let lots = repo.fetch_lots(&filter)?;
            let summary = dashboard_summary(&lots)?;
            log::info!("{}", summary.summary());
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Export { dataset, format, client, name } => {
            let lots = repo.fetch_lots(&LotFilter { client: client.clone(), ..LotFilter::default() })?;
            let exhibitors = repo.fetch_exhibitors(client.as_deref())?;

            let bytes = dataset
                .render(format, &lots, &exhibitors)
                .with_context(|| format!("Failed to export {}", dataset.name()))?;
            let path = write_output(&config.output_dir, &export_filename(&name, format), &bytes)?;
            println!("✓ Wrote {}", path.display());
        }

        Command::ClientReport { client, date } => {
            let lots = repo.fetch_lots(&LotFilter::for_client(client.as_str()))?;
            let csv = to_csv(&client_report_rows(&lots))
                .with_context(|| format!("No lots to report for client {}", client))?;

            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let path = write_output(&config.output_dir, &client_report_filename(&client, date), csv.as_bytes())?;
            println!("✓ Wrote {}", path.display());
        }

        Command::Report { standard, client, company, from, to, json } => {
            let period = ReportPeriod::new(from, to)?;
            let document = compose_report(&repo, &config.correction_set(), standard, &client, &company, &period)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&document)?);
            } else {
                print!("{}", document.render_text());
            }
        }

        Command::Series { lot } => {
            let series = lot_series(&repo, &lot)?;
            println!("{}", serde_json::to_string_pretty(&series)?);
        }
    }

    Ok(())
}

fn write_output(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    let path = dir.join(file_name);
    fs::write(&path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("wrote {} bytes to {:?}", bytes.len(), path);
    Ok(path)
}
