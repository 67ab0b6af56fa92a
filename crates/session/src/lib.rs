//! # Session
//!
//! Recording session lifecycle for each peripheral.
//!
//! Responsibilities:
//! - Drive `Idle -> Connecting -> Recording -> Disconnecting -> Idle` (`SessionController`)
//! - Wire transport payloads through decoding, fusion, rate limiting and clock sync (`RecordPipeline`)
//! - Run each peripheral on its own task with bounded connect/disconnect waits (`SessionHandle`)
//! - Expose start/stop/rename and the signal stream to the UI layer (`Recorder`)
//!
//! ## Wiring
//!
//! ```ignore
//! let mut recorder = Recorder::builder(blueprint)
//!     .peripheral(PeripheralKind::Ring, |listener| platform::ring(address, listener))
//!     .build()?;
//! let mut signals = recorder.take_signals().expect("signals taken once");
//! recorder.start_session(PeripheralKind::Ring).await?;
//! ```

pub mod controller;
pub mod error;
pub mod listener;
pub mod pipeline;
pub mod recorder;
pub mod runtime;

pub use controller::{SessionController, StartMode};
pub use error::SessionError;
pub use listener::{StampedEvent, TransportEventSender};
pub use pipeline::RecordPipeline;
pub use recorder::{Recorder, RecorderBuilder};
pub use runtime::SessionHandle;
