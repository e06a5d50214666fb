//! Text report of an extracted dataset

use anyhow::Result;
use minijinja::{context, Environment};
use serde::Serialize;

use crate::dataset::{FarField, FrequencyData, Record, RecordKind};
use crate::farfield::FarFieldError;
use crate::PowerConfig;

const REPORT_TEMPLATE: &str = r##"FEKO output summary
Generated: {{ timestamp }}
Source: {{ source }}
Dataset: {{ kind }} ({{ blocks|length }} frequency blocks)
{% for block in blocks %}  {{ block.frequency_mhz }} MHz  {{ block.samples }} samples{% if block.power %}  P_rad = {{ block.power }} W{% endif %}
{% endfor %}
"##;

/// Summary of one frequency block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub frequency_hz: f64,
    pub samples: usize,
    /// Only present for far fields
    pub radiated_power_w: Option<f64>,
}

/// What was extracted from one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub source: String,
    pub kind: RecordKind,
    pub blocks: Vec<BlockSummary>,
}

impl Report {
    /// Sample counts per block, for any record type
    pub fn new<T: Record>(source: impl Into<String>, dataset: &[FrequencyData<T>]) -> Self {
        let blocks = dataset
            .iter()
            .map(|entry| BlockSummary {
                frequency_hz: entry.frequency,
                samples: entry.data.sample_count(),
                radiated_power_w: None,
            })
            .collect();

        Self {
            source: source.into(),
            kind: T::KIND,
            blocks,
        }
    }

    /// Far-field report including the radiated power of every block
    pub fn with_power(
        source: impl Into<String>,
        dataset: &[FrequencyData<FarField>],
        config: &PowerConfig,
    ) -> Result<Self, FarFieldError> {
        let mut report = Self::new(source, dataset);
        for (block, entry) in report.blocks.iter_mut().zip(dataset) {
            let grids = entry.data.to_grids()?;
            block.radiated_power_w = Some(grids.radiated_power(config)?);
        }
        Ok(report)
    }
}

/// Render a report as plain text
pub fn render_report(report: &Report) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("report", REPORT_TEMPLATE)?;
    let template = env.get_template("report")?;

    let blocks: Vec<_> = report
        .blocks
        .iter()
        .map(|b| {
            serde_json::json!({
                "frequency_mhz": format!("{:.6}", b.frequency_hz / 1e6),
                "samples": b.samples,
                "power": b.radiated_power_w.map(|p| format!("{:.6e}", p)),
            })
        })
        .collect();

    let output = template.render(context! {
        timestamp => chrono::Utc::now().to_rfc3339(),
        source => report.source.as_str(),
        kind => report.kind.label(),
        blocks => blocks,
    })?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{polar_deg, WireCurrents};
    use pretty_assertions::assert_eq;

    fn isotropic() -> FarField {
        let mut field = FarField::default();
        for phi in [0.0_f64, 180.0] {
            for theta in [0.0_f64, 45.0, 90.0] {
                field.push(
                    theta.to_radians(),
                    phi.to_radians(),
                    polar_deg(1.0, 0.0),
                    polar_deg(0.0, 0.0),
                );
            }
        }
        field
    }

    #[test]
    fn test_wire_report() {
        let dataset = vec![
            FrequencyData { frequency: 1e8, data: WireCurrents::default() },
            FrequencyData { frequency: 2e8, data: WireCurrents::default() },
        ];
        let report = Report::new("dipole.out", &dataset);
        assert_eq!(report.kind, RecordKind::WireCurrents);
        assert_eq!(
            report.blocks[1],
            BlockSummary { frequency_hz: 2e8, samples: 0, radiated_power_w: None }
        );

        let text = render_report(&report).unwrap();
        assert!(text.contains("Dataset: wire currents (2 frequency blocks)"));
        assert!(text.contains("200.000000 MHz  0 samples"));
        assert!(!text.contains("P_rad"));
    }

    #[test]
    fn test_farfield_report() {
        let dataset = vec![FrequencyData { frequency: 1e8, data: isotropic() }];
        let report = Report::with_power("horn.out", &dataset, &PowerConfig::default()).unwrap();

        let power = report.blocks[0].radiated_power_w.unwrap();
        let expected = std::f64::consts::PI / crate::FREE_SPACE_IMPEDANCE;
        assert!((power - expected).abs() / expected < 1e-9);

        let text = render_report(&report).unwrap();
        assert!(text.starts_with("FEKO output summary"));
        assert!(text.contains("Source: horn.out"));
        assert!(text.contains("100.000000 MHz  6 samples  P_rad = "));
    }
}
