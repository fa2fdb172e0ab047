//! Core lending types.
//!
//! - Loan records and derived status
//! - The per-borrower ledger
//! - Configuration and policies

pub mod config;
pub mod ledger;
pub mod loan;

pub use config::*;
pub use ledger::*;
pub use loan::*;
