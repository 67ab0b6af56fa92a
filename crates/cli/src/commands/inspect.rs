//! `inspect` command implementation.

use anyhow::{Context, Result};
use contracts::SensorRecord;
use observability::{SessionMetricsAggregator, StatsSummary};
use serde::Serialize;
use storage::RecordReader;
use tracing::info;

use crate::cli::InspectArgs;

/// File report for JSON output
#[derive(Serialize)]
struct InspectReport {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    peripheral: Option<String>,
    records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_device_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_device_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval_ms: Option<StatsReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skew_ms: Option<StatsReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    samples: Vec<SensorRecord>,
}

#[derive(Serialize)]
struct StatsReport {
    count: u64,
    min: f64,
    max: f64,
    mean: f64,
    std_dev: f64,
}

impl From<&StatsSummary> for StatsReport {
    fn from(s: &StatsSummary) -> Self {
        Self {
            count: s.count,
            min: s.min,
            max: s.max,
            mean: s.mean,
            std_dev: s.std_dev,
        }
    }
}

/// Execute the `inspect` command
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    info!(path = %args.path.display(), "Inspecting data file");

    let reader = RecordReader::open(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let report = build_report(&reader, args.records);

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize inspect report")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn build_report(reader: &RecordReader, samples: usize) -> InspectReport {
    let kind = reader.kind();
    let mut aggregator = SessionMetricsAggregator::new();
    let mut first_device_ms = None;
    let mut last_device_ms = None;

    for record in reader.records() {
        first_device_ms.get_or_insert(record.device_timestamp_ms);
        last_device_ms = Some(record.device_timestamp_ms);
        if let Some(kind) = kind {
            aggregator.observe_record(kind, record.device_timestamp_ms, record.skew_ms());
        }
    }

    let summary = aggregator.summary();
    let peripheral = kind.and_then(|k| summary.peripherals.get(&k));

    InspectReport {
        path: reader.path().display().to_string(),
        peripheral: kind.map(|k| k.to_string()),
        records: reader.len(),
        first_device_ms,
        last_device_ms,
        interval_ms: peripheral
            .filter(|p| p.interval_ms.count > 0)
            .map(|p| StatsReport::from(&p.interval_ms)),
        skew_ms: peripheral
            .filter(|p| p.skew_ms.count > 0)
            .map(|p| StatsReport::from(&p.skew_ms)),
        samples: reader.records().take(samples).collect(),
    }
}

fn print_report(report: &InspectReport) {
    println!("File: {}", report.path);
    println!(
        "  Peripheral: {}",
        report.peripheral.as_deref().unwrap_or("unknown")
    );
    println!("  Records: {}", report.records);
    if let (Some(first), Some(last)) = (report.first_device_ms, report.last_device_ms) {
        println!("  Device time: {first} .. {last} ({} ms)", last - first);
    }
    if let Some(ref s) = report.interval_ms {
        println!(
            "  Device interval (ms): min={:.3}, max={:.3}, mean={:.3}, std={:.3}",
            s.min, s.max, s.mean, s.std_dev
        );
    }
    if let Some(ref s) = report.skew_ms {
        println!(
            "  Host skew (ms): min={:.3}, max={:.3}, mean={:.3}, std={:.3}",
            s.min, s.max, s.mean, s.std_dev
        );
    }

    if !report.samples.is_empty() {
        println!("\n  {:>15} {:>15}  gyro / accel", "device_ms", "host_ms");
        for r in &report.samples {
            println!(
                "  {:>15} {:>15}  {:?} / {:?}",
                r.device_timestamp_ms, r.host_timestamp_ms, r.channels.gyro, r.channels.accel
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MotionChannels;
    use storage::BinaryRecordWriter;

    #[test]
    fn test_report_over_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00042-2024-05-01-12-00-00-ring.data");
        let mut writer = BinaryRecordWriter::open(&path).unwrap();
        for i in 0..4 {
            writer
                .append_record(&SensorRecord {
                    channels: MotionChannels::default(),
                    device_timestamp_ms: 1_000 + i * 10,
                    host_timestamp_ms: 1_002 + i * 10,
                })
                .unwrap();
        }
        writer.close().unwrap();

        let reader = RecordReader::open(&path).unwrap();
        let report = build_report(&reader, 2);
        assert_eq!(report.peripheral.as_deref(), Some("ring"));
        assert_eq!(report.records, 4);
        assert_eq!(report.first_device_ms, Some(1_000));
        assert_eq!(report.last_device_ms, Some(1_030));
        assert_eq!(report.samples.len(), 2);
        let interval = report.interval_ms.unwrap();
        assert_eq!(interval.count, 3);
        assert!((interval.mean - 10.0).abs() < 1e-9);
        assert!((report.skew_ms.unwrap().mean - 2.0).abs() < 1e-9);
    }
}
