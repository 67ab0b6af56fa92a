//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试 (记录布局、配置样例)
//! - 端到端录制测试：传输回调 -> 会话 -> 数据文件
//! - 戒指与腕表会话并发独立性

#[cfg(test)]
mod support {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use contracts::{
        ContractError, DisconnectReason, MotionChannels, PeripheralKind, RecorderBlueprint,
        SensorRecord, Transport, TransportListener, RECORD_LEN,
    };
    use ingestion::{cobs_encode, encode_sensor_frame};
    use session::TransportEventSender;

    /// Answers connect/disconnect immediately and exposes its listener so a
    /// test can play the peripheral.
    pub struct LoopbackTransport {
        kind: PeripheralKind,
        listener: TransportEventSender,
    }

    impl Transport for LoopbackTransport {
        fn kind(&self) -> PeripheralKind {
            self.kind
        }

        fn connect(&mut self) -> Result<(), ContractError> {
            self.listener.on_connected();
            Ok(())
        }

        fn disconnect(&mut self) {
            self.listener.on_disconnected(DisconnectReason::Clean);
        }
    }

    pub type ListenerSlot = Arc<Mutex<Option<TransportEventSender>>>;

    pub fn loopback(
        kind: PeripheralKind,
        slot: ListenerSlot,
    ) -> impl FnOnce(TransportEventSender) -> LoopbackTransport {
        move |listener| {
            *slot.lock().unwrap() = Some(listener.clone());
            LoopbackTransport { kind, listener }
        }
    }

    pub fn blueprint(dir: &Path) -> RecorderBlueprint {
        let mut bp = RecorderBlueprint::for_participant("42");
        bp.output.directory = dir.to_path_buf();
        bp
    }

    pub fn ring_frame(seq: i64, device_us: i64) -> Vec<u8> {
        let channels = MotionChannels {
            gyro: [seq as f32, 0.0, 0.0],
            accel: [0.0, 0.0, 1.0],
            ..MotionChannels::default()
        };
        cobs_encode(&encode_sensor_frame(&channels, device_us))
    }

    pub fn data_files(dir: &Path, kind: PeripheralKind) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.extension().is_some_and(|e| e == "data")
                    && storage::naming::kind_from_file_name(p) == Some(kind)
            })
            .collect();
        files.sort();
        files
    }

    pub fn read_records(path: &Path) -> Vec<SensorRecord> {
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(bytes.len() % RECORD_LEN, 0, "partial record in {path:?}");
        bytes
            .chunks_exact(RECORD_LEN)
            .map(|c| SensorRecord::from_bytes(c).unwrap())
            .collect()
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{PeripheralKind, SensorRecord, RECORD_LEN};

    #[test]
    fn test_record_layout_is_stable() {
        let record = SensorRecord {
            channels: contracts::MotionChannels {
                gyro: [1.0, 2.0, 3.0],
                pose: [0.5, 0.5, 0.5, 0.5],
                ..Default::default()
            },
            device_timestamp_ms: 0x0102_0304,
            host_timestamp_ms: -1,
        };
        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), RECORD_LEN);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[36..40], &0.5f32.to_le_bytes());
        assert_eq!(&bytes[64..72], &0x0102_0304i64.to_le_bytes());
        assert_eq!(&bytes[72..80], &[0xFF; 8]);
    }

    #[test]
    fn test_documented_config_sample_loads() {
        let sample = r#"
[participant]
id = "42"

[output]
directory = "./recordings"
write_event_log = true

[ring]
enabled = true
device_address = "DF:1A:E1:6B:31:36"
connect_timeout_ms = 5000
max_frame_len = 256

[ring.clock]
expected_interval_ms = 10
drift_tolerance_ms = 5

[wrist]
enabled = true
connect_timeout_ms = 5000
target_rate_hz = 100.0

[wrist.clock]
expected_interval_ms = 10
drift_tolerance_ms = 5
"#;
        let blueprint =
            config_loader::ConfigLoader::load_from_str(sample, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(
            blueprint.enabled_peripherals(),
            vec![PeripheralKind::Ring, PeripheralKind::Wrist]
        );
        assert_eq!(
            blueprint.ring.device_address.as_deref(),
            Some("DF:1A:E1:6B:31:36")
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{
        AxisEvent, AxisKind, ContractError, ManualClock, PeripheralKind, SessionSignal,
        SessionState, Transport, TransportEvent, TransportListener,
    };
    use session::{Recorder, SessionController, StartMode};
    use tokio::sync::mpsc;

    use crate::support::*;

    struct Silent(PeripheralKind);

    impl Transport for Silent {
        fn kind(&self) -> PeripheralKind {
            self.0
        }

        fn connect(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        fn disconnect(&mut self) {}
    }

    /// A single 109-byte sensor frame with device clock 1 000 000 µs arriving
    /// at host time 5000 ms yields one record stamped 5000.
    #[test]
    fn test_e2e_single_ring_frame() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _signals) = mpsc::unbounded_channel();
        let mut controller =
            SessionController::new(&blueprint(dir.path()), Silent(PeripheralKind::Ring), tx);

        controller.start(StartMode::User).unwrap();
        controller.handle_event(TransportEvent::Connected, 4_990);
        controller.handle_event(
            TransportEvent::Bytes(ring_frame(1, 1_000_000).into()),
            5_000,
        );
        controller.stop(5_100);
        controller.on_disconnect_timeout(5_200);

        let files = data_files(dir.path(), PeripheralKind::Ring);
        assert_eq!(files.len(), 1);
        assert_eq!(std::fs::metadata(&files[0]).unwrap().len(), 80);
        let records = read_records(&files[0]);
        assert_eq!(records[0].device_timestamp_ms, 5_000);
        assert_eq!(records[0].host_timestamp_ms, 5_000);
        assert_eq!(records[0].channels.gyro[0], 1.0);
    }

    /// Garbage longer than the reassembly buffer costs nothing beyond itself.
    #[test]
    fn test_e2e_overflow_self_heals() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _signals) = mpsc::unbounded_channel();
        let mut controller =
            SessionController::new(&blueprint(dir.path()), Silent(PeripheralKind::Ring), tx);
        controller.start(StartMode::User).unwrap();
        controller.handle_event(TransportEvent::Connected, 0);

        let garbage = vec![0x5Au8; 512];
        controller.handle_event(TransportEvent::Bytes(garbage.into()), 10);
        controller.handle_event(
            TransportEvent::Bytes(ring_frame(7, 2_000_000).into()),
            20,
        );
        controller.handle_event(
            TransportEvent::Bytes(ring_frame(8, 2_010_000).into()),
            30,
        );
        controller.stop(40);

        let records = read_records(&data_files(dir.path(), PeripheralKind::Ring)[0]);
        let seqs: Vec<f32> = records.iter().map(|r| r.channels.gyro[0]).collect();
        assert_eq!(seqs, vec![7.0, 8.0]);
        assert_eq!(records[1].device_timestamp_ms - records[0].device_timestamp_ms, 10);
        assert_eq!(controller.pipeline().metrics().snapshot().overflow_discards, 2);
    }

    /// A chunked ring stream through the full async recorder.
    #[tokio::test]
    async fn test_e2e_ring_stream_through_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(1_000_000);
        let slot = ListenerSlot::default();
        let mut recorder = Recorder::builder(blueprint(dir.path()))
            .clock(clock.clone())
            .peripheral(PeripheralKind::Ring, loopback(PeripheralKind::Ring, slot.clone()))
            .build()
            .unwrap();
        let mut signals = recorder.take_signals().unwrap();

        recorder.start_session(PeripheralKind::Ring).await.unwrap();
        assert_eq!(signals.recv().await.unwrap().signal, SessionSignal::Connected);
        let listener = slot.lock().unwrap().clone().unwrap();

        let stream: Vec<u8> = (0..50)
            .flat_map(|i| ring_frame(i, 7_000_000 + i * 10_000))
            .collect();
        for (i, chunk) in stream.chunks(20).enumerate() {
            clock.set(1_000_000 + i as i64);
            listener.on_bytes_received(chunk);
        }

        recorder.stop_session(PeripheralKind::Ring).await.unwrap();
        assert_eq!(
            signals.recv().await.unwrap().signal,
            SessionSignal::RecordingStopped
        );

        let files = data_files(dir.path(), PeripheralKind::Ring);
        let records = read_records(&files[0]);
        assert_eq!(records.len(), 50);
        for pair in records.windows(2) {
            assert_eq!(pair[1].device_timestamp_ms - pair[0].device_timestamp_ms, 10);
        }
        assert_eq!(records[0].device_timestamp_ms, records[0].host_timestamp_ms);

        let events = files[0]
            .to_string_lossy()
            .replace(".data", "-events.txt");
        let text = std::fs::read_to_string(events).unwrap();
        assert!(text.starts_with("START "));
        assert!(text.contains("\nEND "));

        recorder.shutdown().await;
    }

    /// 1000 Hz fused input for one second yields at most 100 records, evenly
    /// spaced.
    #[tokio::test]
    async fn test_e2e_wrist_rate_governed() {
        let dir = tempfile::tempdir().unwrap();
        let start = 2_000_000;
        let clock = ManualClock::new(start);
        let slot = ListenerSlot::default();
        let mut recorder = Recorder::builder(blueprint(dir.path()))
            .clock(clock.clone())
            .peripheral(PeripheralKind::Wrist, loopback(PeripheralKind::Wrist, slot.clone()))
            .build()
            .unwrap();
        let mut signals = recorder.take_signals().unwrap();

        recorder.start_session(PeripheralKind::Wrist).await.unwrap();
        assert_eq!(signals.recv().await.unwrap().signal, SessionSignal::Connected);
        let listener = slot.lock().unwrap().clone().unwrap();

        for ms in 0..1_000i64 {
            clock.set(start + ms);
            let ts = 50_000_000_000 + ms * 1_000_000;
            listener.on_axis_event(AxisEvent::new(AxisKind::Gyro, [0.1, 0.0, 0.0], ts));
            listener.on_axis_event(AxisEvent::new(AxisKind::Accel, [0.0, 0.0, 9.81], ts));
            listener.on_axis_event(AxisEvent::new(AxisKind::Mag, [0.0, 22.0, -40.0], ts));
            listener.on_axis_event(AxisEvent::new(AxisKind::LinearAccel, [0.0; 3], ts));
        }

        recorder.stop_session(PeripheralKind::Wrist).await.unwrap();
        recorder.shutdown().await;

        let records = read_records(&data_files(dir.path(), PeripheralKind::Wrist)[0]);
        assert!(records.len() <= 100);
        assert_eq!(records.len(), 99);
        for pair in records.windows(2) {
            assert_eq!(pair[1].host_timestamp_ms - pair[0].host_timestamp_ms, 10);
            assert_eq!(pair[1].device_timestamp_ms - pair[0].device_timestamp_ms, 10);
        }
        let first = records[0];
        assert_eq!(first.host_timestamp_ms, start + 10);
        assert_eq!(first.device_timestamp_ms, first.host_timestamp_ms);
        assert!((first.channels.gyro[0] - 0.1 * 57.29578).abs() < 1e-4);
        assert!((first.channels.accel[2] - 9.81 / 9.80665).abs() < 1e-4);
    }

    /// Ring and wrist sessions run side by side without affecting each other.
    #[tokio::test]
    async fn test_e2e_independent_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let ring_slot = ListenerSlot::default();
        let wrist_slot = ListenerSlot::default();
        let mut recorder = Recorder::builder(blueprint(dir.path()))
            .clock(ManualClock::new(3_000_000))
            .peripheral(PeripheralKind::Ring, loopback(PeripheralKind::Ring, ring_slot.clone()))
            .peripheral(PeripheralKind::Wrist, loopback(PeripheralKind::Wrist, wrist_slot.clone()))
            .build()
            .unwrap();
        let mut signals = recorder.take_signals().unwrap();

        recorder.start_session(PeripheralKind::Ring).await.unwrap();
        recorder.start_session(PeripheralKind::Wrist).await.unwrap();
        for _ in 0..2 {
            assert_eq!(signals.recv().await.unwrap().signal, SessionSignal::Connected);
        }

        // Losing the wrist link does not touch the ring session.
        let wrist = wrist_slot.lock().unwrap().clone().unwrap();
        wrist.on_disconnected(contracts::DisconnectReason::Timeout);
        let alert = signals.recv().await.unwrap();
        assert_eq!(alert.peripheral, PeripheralKind::Wrist);
        assert!(matches!(
            alert.signal,
            SessionSignal::UnexpectedDisconnect { .. }
        ));
        assert_eq!(
            signals.recv().await.unwrap().signal,
            SessionSignal::RecordingStopped
        );
        assert_eq!(recorder.state(PeripheralKind::Wrist), Some(SessionState::Idle));
        assert_eq!(recorder.state(PeripheralKind::Ring), Some(SessionState::Recording));

        let ring = ring_slot.lock().unwrap().clone().unwrap();
        ring.on_bytes_received(&ring_frame(1, 1_000));
        recorder.stop_session(PeripheralKind::Ring).await.unwrap();

        let ring_records = read_records(&data_files(dir.path(), PeripheralKind::Ring)[0]);
        assert_eq!(ring_records.len(), 1);
        assert_eq!(data_files(dir.path(), PeripheralKind::Wrist).len(), 1);

        recorder.shutdown().await;
    }
}
