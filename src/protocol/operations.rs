//! Lending operations.
//!
//! Each mutating operation carries the borrower it acts for and the proof
//! that justifies the change. The proof is consumed by verification and is
//! not retained.

use serde::{Deserialize, Serialize};

use crate::core::loan::LoanRecord;
use crate::utils::crypto::{Address, Hash};
use crate::zkp::proof::Groth16Proof;
use crate::zkp::schema::ProofKind;

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Trait for proof-gated operations
pub trait Operation: Sized + Send + Sync {
    /// Get the operation type name
    fn operation_type(&self) -> &'static str;

    /// Borrower whose record the operation writes
    fn borrower(&self) -> &Address;

    /// Proof submitted with the operation
    fn proof(&self) -> &Groth16Proof;

    /// Verifier/schema the proof is checked against
    fn proof_kind(&self) -> ProofKind;
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOAN OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Request a loan with a collateral proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLoanOp {
    /// Borrower requesting the loan
    pub borrower: Address,
    /// Collateral proof and its public inputs
    pub proof: Groth16Proof,
}

impl RequestLoanOp {
    /// Create the operation
    pub fn new(borrower: Address, proof: Groth16Proof) -> Self {
        Self { borrower, proof }
    }
}

impl Operation for RequestLoanOp {
    fn operation_type(&self) -> &'static str {
        "RequestLoan"
    }

    fn borrower(&self) -> &Address {
        &self.borrower
    }

    fn proof(&self) -> &Groth16Proof {
        &self.proof
    }

    fn proof_kind(&self) -> ProofKind {
        ProofKind::Collateral
    }
}

/// Result of an approved loan request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLoanResult {
    /// Principal granted
    pub loan_amount: u128,
    /// Collateral pledged
    pub collateral_amount: u128,
    /// Whether an earlier loan cycle was replaced
    pub replaced_existing: bool,
    /// Fingerprint of the accepted proof
    pub proof_hash: Hash,
    /// Record after the write
    pub record: LoanRecord,
}

/// Update interest and liquidation state with an interest proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculateInterestOp {
    /// Borrower whose loan is updated
    pub borrower: Address,
    /// Interest/liquidation proof and its public inputs
    pub proof: Groth16Proof,
}

impl CalculateInterestOp {
    /// Create the operation
    pub fn new(borrower: Address, proof: Groth16Proof) -> Self {
        Self { borrower, proof }
    }
}

impl Operation for CalculateInterestOp {
    fn operation_type(&self) -> &'static str {
        "CalculateInterest"
    }

    fn borrower(&self) -> &Address {
        &self.borrower
    }

    fn proof(&self) -> &Groth16Proof {
        &self.proof
    }

    fn proof_kind(&self) -> ProofKind {
        ProofKind::InterestLiquidation
    }
}

/// Result of an accepted interest proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculateInterestResult {
    /// Accrued interest
    pub accrued_interest: u128,
    /// Liquidation flag
    pub is_liquidatable: bool,
    /// Whether this proof flipped the liquidation flag
    pub liquidation_changed: bool,
    /// Fingerprint of the accepted proof
    pub proof_hash: Hash,
    /// Record after the write
    pub record: LoanRecord,
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION ENUM
// ═══════════════════════════════════════════════════════════════════════════════

/// All lending operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LendingOperation {
    /// Request a loan
    RequestLoan(RequestLoanOp),
    /// Calculate interest and check liquidation
    CalculateInterest(CalculateInterestOp),
}

impl LendingOperation {
    /// Get the operation type name
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::RequestLoan(op) => op.operation_type(),
            Self::CalculateInterest(op) => op.operation_type(),
        }
    }

    /// Borrower the operation writes
    pub fn borrower(&self) -> &Address {
        match self {
            Self::RequestLoan(op) => op.borrower(),
            Self::CalculateInterest(op) => op.borrower(),
        }
    }

    /// Proof kind the operation expects
    pub fn proof_kind(&self) -> ProofKind {
        match self {
            Self::RequestLoan(op) => op.proof_kind(),
            Self::CalculateInterest(op) => op.proof_kind(),
        }
    }
}

impl From<RequestLoanOp> for LendingOperation {
    fn from(op: RequestLoanOp) -> Self {
        Self::RequestLoan(op)
    }
}

impl From<CalculateInterestOp> for LendingOperation {
    fn from(op: CalculateInterestOp) -> Self {
        Self::CalculateInterest(op)
    }
}
