//! Error types for the private lending protocol.
//!
//! A rejected proof is the only failure a well-behaved caller should ever
//! see. Everything else signals a precondition violation, bad input, or a
//! protocol defect that must abort the operation without touching state.

use thiserror::Error;

use crate::utils::crypto::Address;
use crate::zkp::schema::ProofKind;

/// Result type alias for lending operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the private lending protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Proof Errors
    // ═══════════════════════════════════════════════════════════════════

    /// The verifier bound to this proof kind rejected the proof
    #[error("{}", kind.rejection_message())]
    InvalidProof {
        /// Which verifier rejected the proof
        kind: ProofKind,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Loan Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Interest can only be calculated for an approved loan
    #[error("No approved loan for borrower {0}")]
    LoanNotApproved(Address),

    /// Borrower already holds an approved loan
    #[error("Loan already approved for borrower {0}")]
    LoanAlreadyApproved(Address),

    // ═══════════════════════════════════════════════════════════════════
    // Schema Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Public-input vector arity does not match the schema
    #[error("Schema mismatch for {kind} proof: expected {expected} public inputs, got {got}")]
    SchemaMismatch {
        /// Schema the vector was decoded against
        kind: ProofKind,
        /// Arity defined by the schema
        expected: usize,
        /// Arity of the submitted vector
        got: usize,
    },

    /// Public output does not fit the ledger's integer type
    #[error("Public input {field} at position {position} exceeds the ledger range")]
    ValueOutOfRange {
        /// Schema field name
        field: String,
        /// Position in the public-input vector
        position: usize,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Input Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Proof could not be parsed into group elements and field elements
    #[error("Malformed proof: {0}")]
    MalformedProof(String),

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Configuration Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Verification key could not be loaded
    #[error("Invalid verification key: {0}")]
    InvalidVerificationKey(String),

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Returns true if the caller can recover by resubmitting a fresh proof
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::InvalidProof { .. })
    }

    /// Returns true for protocol defects that indicate mis-versioned
    /// circuits, schemas, or a broken host
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::SchemaMismatch { .. }
                | Error::ValueOutOfRange { .. }
                | Error::Internal(_)
                | Error::Storage(_)
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Proof errors: 1xxx
            Error::InvalidProof { kind: ProofKind::Collateral } => 1001,
            Error::InvalidProof { kind: ProofKind::InterestLiquidation } => 1002,

            // Loan errors: 2xxx
            Error::LoanNotApproved(_) => 2001,
            Error::LoanAlreadyApproved(_) => 2002,

            // Schema errors: 3xxx
            Error::SchemaMismatch { .. } => 3001,
            Error::ValueOutOfRange { .. } => 3002,

            // Input errors: 4xxx
            Error::MalformedProof(_) => 4001,
            Error::InvalidParameter { .. } => 4002,

            // Configuration errors: 5xxx
            Error::Config(_) => 5001,
            Error::InvalidVerificationKey(_) => 5002,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,

            // Internal errors: 9xxx
            Error::Internal(_) => 9001,
            Error::Storage(_) => 9003,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique() {
        let codes = vec![
            Error::InvalidProof { kind: ProofKind::Collateral }.code(),
            Error::InvalidProof { kind: ProofKind::InterestLiquidation }.code(),
            Error::LoanNotApproved(Address::default()).code(),
            Error::LoanAlreadyApproved(Address::default()).code(),
            Error::SchemaMismatch { kind: ProofKind::Collateral, expected: 7, got: 0 }.code(),
            Error::ValueOutOfRange { field: "".into(), position: 0 }.code(),
            Error::MalformedProof("".into()).code(),
            Error::Config("".into()).code(),
            Error::Internal("".into()).code(),
            Error::Storage("".into()).code(),
        ];

        let mut unique_codes = codes.clone();
        unique_codes.sort();
        unique_codes.dedup();

        assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            Error::InvalidProof { kind: ProofKind::Collateral }.to_string(),
            "Invalid collateral zk-SNARK proof"
        );
        assert_eq!(
            Error::InvalidProof { kind: ProofKind::InterestLiquidation }.to_string(),
            "Invalid interest liquidation zk-SNARK proof"
        );
    }

    #[test]
    fn test_schema_mismatch_display() {
        let err = Error::SchemaMismatch {
            kind: ProofKind::InterestLiquidation,
            expected: 7,
            got: 3,
        };
        assert!(err.to_string().contains("expected 7"));
        assert!(err.to_string().contains("got 3"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::InvalidProof { kind: ProofKind::Collateral }.is_recoverable());
        assert!(!Error::Internal("test".into()).is_recoverable());
    }

    #[test]
    fn test_is_critical() {
        assert!(Error::SchemaMismatch { kind: ProofKind::Collateral, expected: 7, got: 6 }.is_critical());
        assert!(Error::Storage("disk".into()).is_critical());
        assert!(!Error::InvalidProof { kind: ProofKind::Collateral }.is_critical());
        assert!(!Error::LoanNotApproved(Address::from_label("alice")).is_critical());
    }
}
