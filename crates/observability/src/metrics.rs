//! 录制指标收集模块
//!
//! 通过 `metrics` facade 上报计数器/直方图，并提供进程内聚合器用于输出摘要。

use std::collections::BTreeMap;

use contracts::{PeripheralKind, SessionState};
use metrics::{counter, gauge, histogram};

/// 记录成功解码的帧
pub fn record_frame_decoded() {
    counter!("wearable_recorder_frames_decoded_total").increment(1);
}

/// 记录被丢弃的帧
///
/// `reason`:
/// - `overflow`: 重组缓冲区溢出
/// - `header`: 非传感器流标签
/// - `short`: 带传感器标签但长度不足
pub fn record_frame_discarded(reason: &'static str) {
    counter!("wearable_recorder_frames_discarded_total", "reason" => reason).increment(1);
}

/// 记录写入磁盘的记录
pub fn record_record_written(kind: PeripheralKind) {
    counter!("wearable_recorder_records_written_total", "peripheral" => kind.as_str())
        .increment(1);
}

/// 记录时钟异常 (相邻设备时间戳间隔偏离预期)
pub fn record_clock_anomaly(kind: PeripheralKind, delta_ms: i64) {
    counter!("wearable_recorder_clock_anomalies_total", "peripheral" => kind.as_str())
        .increment(1);
    histogram!("wearable_recorder_clock_anomaly_delta_ms", "peripheral" => kind.as_str())
        .record(delta_ms as f64);
}

/// 记录会话建立的时钟偏移
pub fn record_clock_offset(kind: PeripheralKind, offset_ms: i64) {
    gauge!("wearable_recorder_clock_offset_ms", "peripheral" => kind.as_str())
        .set(offset_ms as f64);
}

/// 记录融合样本及限速结果
pub fn record_fused_sample(kind: PeripheralKind, accepted: bool) {
    let status = if accepted { "accepted" } else { "throttled" };
    counter!(
        "wearable_recorder_fused_samples_total",
        "peripheral" => kind.as_str(),
        "status" => status
    )
    .increment(1);
}

/// 记录会话状态迁移
pub fn record_session_transition(kind: PeripheralKind, from: SessionState, to: SessionState) {
    counter!(
        "wearable_recorder_session_transitions_total",
        "peripheral" => kind.as_str(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("wearable_recorder_session_recording", "peripheral" => kind.as_str()).set(
        if to == SessionState::Recording {
            1.0
        } else {
            0.0
        },
    );
}

/// 记录存储失败
pub fn record_storage_failure(kind: PeripheralKind) {
    counter!("wearable_recorder_storage_failures_total", "peripheral" => kind.as_str())
        .increment(1);
}

/// 会话指标聚合器
///
/// 在内存中聚合指标，便于 CLI 输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SessionMetricsAggregator {
    /// 各外设写入记录数
    pub records_written: BTreeMap<PeripheralKind, u64>,

    /// 各外设时钟异常数
    pub clock_anomalies: BTreeMap<PeripheralKind, u64>,

    /// 设备时间戳间隔统计 (ms)
    pub interval_stats: BTreeMap<PeripheralKind, RunningStats>,

    /// 主机接收时间与同步时间之差统计 (ms)
    pub skew_stats: BTreeMap<PeripheralKind, RunningStats>,

    last_device_ms: BTreeMap<PeripheralKind, i64>,
}

impl SessionMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新一条记录
    pub fn observe_record(&mut self, kind: PeripheralKind, device_ms: i64, skew_ms: i64) {
        *self.records_written.entry(kind).or_insert(0) += 1;

        if let Some(last) = self.last_device_ms.insert(kind, device_ms) {
            self.interval_stats
                .entry(kind)
                .or_default()
                .push((device_ms - last) as f64);
        }
        self.skew_stats.entry(kind).or_default().push(skew_ms as f64);
    }

    /// 更新时钟异常计数
    pub fn observe_clock_anomaly(&mut self, kind: PeripheralKind) {
        *self.clock_anomalies.entry(kind).or_insert(0) += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let peripherals = self
            .records_written
            .iter()
            .map(|(kind, records)| {
                let summary = PeripheralSummary {
                    records: *records,
                    clock_anomalies: self.clock_anomalies.get(kind).copied().unwrap_or(0),
                    interval_ms: self
                        .interval_stats
                        .get(kind)
                        .map(StatsSummary::from)
                        .unwrap_or_default(),
                    skew_ms: self
                        .skew_stats
                        .get(kind)
                        .map(StatsSummary::from)
                        .unwrap_or_default(),
                };
                (*kind, summary)
            })
            .collect();
        MetricsSummary { peripherals }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub peripherals: BTreeMap<PeripheralKind, PeripheralSummary>,
}

/// 单个外设的摘要
#[derive(Debug, Clone, Default)]
pub struct PeripheralSummary {
    pub records: u64,
    pub clock_anomalies: u64,
    pub interval_ms: StatsSummary,
    pub skew_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Recording Summary ===")?;
        if self.peripherals.is_empty() {
            return writeln!(f, "No records written");
        }
        for (kind, p) in &self.peripherals {
            writeln!(f, "[{kind}]")?;
            writeln!(f, "  Records: {}", p.records)?;
            writeln!(f, "  Clock anomalies: {}", p.clock_anomalies)?;
            writeln!(f, "  Device interval (ms): {}", p.interval_ms)?;
            writeln!(f, "  Host skew (ms): {}", p.skew_ms)?;
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
