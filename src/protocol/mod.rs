//! Protocol module - the proof-gated lending state machine.
//!
//! Operations, the events they emit, and the state machine that executes
//! them against the ledger.

pub mod events;
pub mod operations;
pub mod state_machine;

pub use events::*;
pub use operations::*;
pub use state_machine::*;
