//! Utility modules.
//!
//! - Protocol constants
//! - Hashing and borrower identity

pub mod constants;
pub mod crypto;

pub use constants::*;
pub use crypto::*;
