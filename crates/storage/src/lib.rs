//! # Storage
//!
//! 录制数据持久化模块。
//!
//! 负责：
//! - 追加写入固定 80 字节记录，每条立即 flush (`BinaryRecordWriter`)
//! - 会话文件命名与 START/END 事件日志 (`SessionFiles`, `EventLog`)
//! - 离线读取数据文件 (`RecordReader`)
//!
//! 所有存储错误对当前会话都是致命的，由调用方决定如何结束会话。

pub mod error;
pub mod event_log;
pub mod metrics;
pub mod naming;
pub mod reader;
pub mod session_files;
pub mod writer;

pub use contracts::{SensorRecord, RECORD_LEN};
pub use error::StorageError;
pub use event_log::EventLog;
pub use metrics::{MetricsSnapshot, WriterMetrics};
pub use naming::{padded_participant_id, session_prefix, SessionPaths};
pub use reader::RecordReader;
pub use session_files::{SessionFiles, SessionFilesConfig};
pub use writer::BinaryRecordWriter;
