//! Command implementations.

mod inspect;
mod replay;
mod validate;

pub use inspect::run_inspect;
pub use replay::run_replay;
pub use validate::run_validate;
