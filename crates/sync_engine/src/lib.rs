//! # Sync Engine
//!
//! 设备时钟与主机时钟对齐。
//!
//! 负责：
//! - 会话首条记录建立时钟偏移 (`ClockSync`)
//! - 后续记录按固定偏移映射到主机时间
//! - 相邻记录间隔漂移诊断，仅记录日志不校正 (`DriftMonitor`)
//!
//! ## 使用示例
//!
//! ```
//! use sync_engine::ClockSync;
//!
//! let mut sync = ClockSync::new();
//! // 设备时间 1000 ms 到达时主机时间为 5000 ms
//! assert_eq!(sync.synchronize(1_000, 5_000), 5_000);
//! assert_eq!(sync.apply(1_010), Some(5_010));
//! ```

mod clock;
mod drift;

// Re-exports
pub use clock::ClockSync;
pub use contracts::ClockConfig;
pub use drift::{ClockAnomaly, ClockAnomalyKind, DriftMonitor, DriftSummary};
