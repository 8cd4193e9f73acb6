//! Statistics exporters
//!
//! Writes the shutdown report as JSON or in the Prometheus text format.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use clap::ValueEnum;

use crate::{error::ProbeError, types::StatsReport};

/// Trait for report exporters
pub trait StatsExporter {
    /// Export a report
    ///
    /// # Arguments
    ///
    /// * `report` - Shutdown report to write
    ///
    /// # Returns
    ///
    /// `ProbeError::Export` if the report cannot be serialized or written
    fn export(&self, report: &StatsReport) -> Result<(), ProbeError>;
}

/// Export format type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExporterType {
    /// JSON document
    Json,
    /// Prometheus text exposition format
    Prometheus,
}

impl ExporterType {
    /// Exporter writing this format to `output_path`
    pub fn exporter(self, output_path: PathBuf) -> Box<dyn StatsExporter> {
        match self {
            ExporterType::Json => Box::new(JsonExporter::new(output_path, true)),
            ExporterType::Prometheus => Box::new(PrometheusExporter::new(output_path)),
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ProbeError> {
    let export_err = |e: std::io::Error| ProbeError::Export {
        path: path.to_path_buf(),
        source: e.into(),
    };

    let mut file = File::create(path).map_err(export_err)?;
    file.write_all(contents.as_bytes()).map_err(export_err)
}

/// JSON exporter
pub struct JsonExporter {
    output_path: PathBuf,
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file
    /// * `pretty` - Enable pretty-printing
    pub fn new(output_path: PathBuf, pretty: bool) -> Self {
        Self {
            output_path,
            pretty,
        }
    }
}

impl StatsExporter for JsonExporter {
    fn export(&self, report: &StatsReport) -> Result<(), ProbeError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)
        } else {
            serde_json::to_string(report)
        }
        .map_err(|e| ProbeError::Export {
            path: self.output_path.clone(),
            source: e.into(),
        })?;

        write_file(&self.output_path, &json)
    }
}

/// Prometheus exporter
pub struct PrometheusExporter {
    output_path: PathBuf,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    /// Convert a report to Prometheus format
    fn to_prometheus_format(report: &StatsReport) -> String {
        let labels = format!(
            "interface=\"{}\",mode=\"{}\"",
            report.interface.name(),
            report.mode
        );
        let stats = &report.stats;
        let mut output = String::new();

        output.push_str("# HELP tcpopts_frames_total Frames seen by the XDP program, by outcome\n");
        output.push_str("# TYPE tcpopts_frames_total counter\n");
        for (outcome, value) in [
            ("all", stats.frames),
            ("truncated", stats.truncated),
            ("not_ipv4", stats.not_ipv4),
            ("not_tcp", stats.not_tcp),
            ("no_options", stats.no_options),
            ("options_scanned", stats.options_scanned),
        ] {
            output.push_str(&format!(
                "tcpopts_frames_total{{{labels},outcome=\"{outcome}\"}} {value}\n"
            ));
        }
        output.push('\n');

        output.push_str("# HELP tcpopts_timestamps_found_total TCP segments carrying a timestamp option\n");
        output.push_str("# TYPE tcpopts_timestamps_found_total counter\n");
        output.push_str(&format!(
            "tcpopts_timestamps_found_total{{{labels}}} {}\n",
            stats.timestamps_found
        ));
        output.push('\n');

        output.push_str("# HELP tcpopts_attached_seconds Time the program stayed attached\n");
        output.push_str("# TYPE tcpopts_attached_seconds gauge\n");
        output.push_str(&format!(
            "tcpopts_attached_seconds{{{labels}}} {}\n",
            report.duration_seconds
        ));

        output
    }
}

impl StatsExporter for PrometheusExporter {
    fn export(&self, report: &StatsReport) -> Result<(), ProbeError> {
        write_file(&self.output_path, &Self::to_prometheus_format(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{attach::AttachMode, interface::Interface, types::ParserStats};

    fn create_test_report() -> StatsReport {
        StatsReport {
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            interface: Interface::new("eth0", 2),
            mode: AttachMode::Native,
            duration_seconds: 60,
            stats: ParserStats {
                frames: 1000,
                truncated: 1,
                not_ipv4: 100,
                not_tcp: 200,
                no_options: 300,
                options_scanned: 399,
                timestamps_found: 350,
            },
        }
    }

    #[test]
    fn test_prometheus_format() {
        let prometheus = PrometheusExporter::to_prometheus_format(&create_test_report());

        assert!(prometheus
            .contains("tcpopts_frames_total{interface=\"eth0\",mode=\"native\",outcome=\"all\"} 1000"));
        assert!(prometheus.contains("tcpopts_timestamps_found_total{interface=\"eth0\",mode=\"native\"} 350"));
        assert!(prometheus.contains("tcpopts_attached_seconds{interface=\"eth0\",mode=\"native\"} 60"));
    }

    #[test]
    fn test_json_export_roundtrip_fields() {
        let path = std::env::temp_dir().join(format!("tcpopts-report-{}.json", std::process::id()));
        JsonExporter::new(path.clone(), false)
            .export(&create_test_report())
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(written["stats"]["timestamps_found"], 350);
        assert_eq!(written["interface"]["index"], 2);
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let path = PathBuf::from("/nonexistent-tcpopts-dir/report.json");
        let err = ExporterType::Json
            .exporter(path)
            .export(&create_test_report())
            .unwrap_err();

        assert!(matches!(err, ProbeError::Export { .. }));
    }
}
