//! Protocol constants.
//!
//! Schema positions are part of the circuit/consumer contract. Changing any of
//! them requires a new schema version and regenerated circuits.

// ═══════════════════════════════════════════════════════════════════════════════
// ENCODING CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Field element length in bytes (uint256, big-endian)
pub const FIELD_ELEMENT_LENGTH: usize = 32;

/// Hash length in bytes
pub const HASH_LENGTH: usize = 32;

/// Borrower address length in bytes
pub const ADDRESS_LENGTH: usize = 20;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL SCHEMA (v1)
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral schema version
pub const COLLATERAL_SCHEMA_VERSION: u32 = 1;

/// Number of public inputs in a collateral proof
pub const COLLATERAL_ARITY: usize = 7;

/// Position of the granted principal
pub const COLLATERAL_LOAN_AMOUNT_POS: usize = 2;

/// Position of the pledged collateral
pub const COLLATERAL_AMOUNT_POS: usize = 5;

// ═══════════════════════════════════════════════════════════════════════════════
// INTEREST / LIQUIDATION SCHEMA (v1)
// ═══════════════════════════════════════════════════════════════════════════════

/// Interest schema version
pub const INTEREST_SCHEMA_VERSION: u32 = 1;

/// Number of public inputs in an interest/liquidation proof
pub const INTEREST_ARITY: usize = 7;

/// Position of the accrued interest
pub const INTEREST_ACCRUED_POS: usize = 0;

/// Position of the liquidation flag (0 = healthy, non-zero = liquidatable)
pub const INTEREST_LIQUIDATABLE_POS: usize = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// REJECTION MESSAGES
// ═══════════════════════════════════════════════════════════════════════════════

/// Message surfaced when the collateral verifier rejects a proof
pub const INVALID_COLLATERAL_PROOF: &str = "Invalid collateral zk-SNARK proof";

/// Message surfaced when the interest/liquidation verifier rejects a proof
pub const INVALID_INTEREST_PROOF: &str = "Invalid interest liquidation zk-SNARK proof";

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE / CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Ledger key prefix for loan records
pub const LOAN_PREFIX: &[u8] = b"loan:";

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "PRIVATE_LENDING";

/// Default data directory name under `$HOME`
pub const DEFAULT_DATA_DIR_NAME: &str = ".private-lending";
