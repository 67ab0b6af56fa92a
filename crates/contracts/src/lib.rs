//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Host wall-clock time is the primary clock (milliseconds since the Unix epoch, i64)
//! - Peripheral timestamps live in their own free-running domain until
//!   offset-corrected by the sync engine
//!
//! ## Record Model
//! Every persisted unit is an 80-byte little-endian [`SensorRecord`]: sixteen
//! f32 motion channels followed by the synchronized device timestamp and the
//! raw host-receipt timestamp.

mod blueprint;
mod clock;
mod error;
mod peripheral;
mod record;
mod session;
mod transport;

pub use blueprint::*;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::*;
pub use peripheral::*;
pub use record::*;
pub use session::*;
pub use transport::{Transport, TransportListener};
