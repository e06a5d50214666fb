//! feko-power: CLI tool for extracting FEKO results and integrating radiated power

use anyhow::{Context, Result};
use clap::Parser;
use feko_import::{
    at_frequency, load_farfield, load_triangle_currents, load_wire_currents, render_report,
    FrequencyData, PowerConfig, Report, FREE_SPACE_IMPEDANCE,
};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "feko-power")]
#[command(about = "Extract FEKO .out results and integrate far-field radiated power")]
#[command(version)]
struct Args {
    /// Input FEKO .out file
    #[arg(short, long)]
    input: PathBuf,

    /// Dataset to extract (farfield, wires, triangles)
    #[arg(long, default_value = "farfield")]
    kind: String,

    /// Wave impedance in Ohm used for the Poynting vector
    #[arg(long, default_value_t = FREE_SPACE_IMPEDANCE)]
    wave_impedance: f64,

    /// Reject far-field grids that are not uniform half-sphere grids
    #[arg(long)]
    checked: bool,

    /// Only keep blocks at this frequency in MHz
    #[arg(long)]
    frequency: Option<f64>,

    /// Emit JSON (summary and records) instead of a text report
    #[arg(long)]
    json: bool,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    FarField,
    Wires,
    Triangles,
}

fn parse_kind(s: &str) -> Result<Kind> {
    match s.to_lowercase().as_str() {
        "farfield" | "far-field" | "ff" => Ok(Kind::FarField),
        "wires" | "wire" | "segments" => Ok(Kind::Wires),
        "triangles" | "triangle" | "rwg" => Ok(Kind::Triangles),
        _ => anyhow::bail!("Unknown dataset kind: {}. Use: farfield, wires, or triangles", s),
    }
}

/// Keep only the blocks at the requested frequency, if any
fn select<T: Clone>(dataset: Vec<FrequencyData<T>>, frequency_mhz: Option<f64>) -> Vec<FrequencyData<T>> {
    match frequency_mhz {
        Some(mhz) => at_frequency(&dataset, mhz * 1e6).cloned().collect(),
        None => dataset,
    }
}

fn render<T: Serialize>(report: &Report, records: &[T], json: bool) -> Result<String> {
    if json {
        let value = serde_json::json!({ "report": report, "records": records });
        Ok(serde_json::to_string_pretty(&value)?)
    } else {
        render_report(report)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();
    let kind = parse_kind(&args.kind)?;

    let config = PowerConfig {
        wave_impedance: args.wave_impedance,
        checked: args.checked,
    };

    let source = args.input.display().to_string();
    info!("Reading {} from {}", args.kind, source);

    let output = match kind {
        Kind::FarField => {
            let dataset = load_farfield(&args.input).context("Failed to scan far fields")?;
            let dataset = select(dataset, args.frequency);
            let report = Report::with_power(source, &dataset, &config)
                .context("Radiated power integration failed")?;
            render(&report, &dataset, args.json)?
        }
        Kind::Wires => {
            let dataset = load_wire_currents(&args.input).context("Failed to scan wire currents")?;
            let dataset = select(dataset, args.frequency);
            render(&Report::new(source, &dataset), &dataset, args.json)?
        }
        Kind::Triangles => {
            let dataset = load_triangle_currents(&args.input)
                .context("Failed to scan triangle currents")?;
            let dataset = select(dataset, args.frequency);
            render(&Report::new(source, &dataset), &dataset, args.json)?
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &output)
                .with_context(|| format!("Failed to write output file: {:?}", path))?;
            info!("Wrote report: {:?}", path);
        }
        None => println!("{}", output),
    }

    Ok(())
}
