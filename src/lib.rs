//! # Private Lending
//!
//! A proof-gated lending state machine. Borrowers open loans and report
//! interest by submitting Groth16 proofs; the state machine verifies each
//! proof against the verifier bound to its kind and only then copies the
//! proof's public outputs into the borrower's ledger record. Balances,
//! rates, and timestamps stay private to the prover.
//!
//! ## Architecture
//!
//! - **ZKP**: proof data model, public-input schemas, verifiers
//! - **Core**: loan records, the per-borrower ledger, configuration
//! - **Protocol**: operations, events, and the state machine
//! - **Storage**: pluggable key-value backends for the ledger
//!
//! ## Example
//!
//! ```rust,ignore
//! use private_lending::prelude::*;
//!
//! let mut machine = LendingStateMachine::new(
//!     InMemoryStore::new(),
//!     Groth16Verifier::from_file("collateral.vk")?,
//!     Groth16Verifier::from_file("interest.vk")?,
//!     LendingConfig::default(),
//! );
//!
//! let borrower: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse()?;
//! machine.request_loan(&borrower, &Groth16Proof::from_file("collateral.json")?)?;
//! let record = machine.get_loan_details(&borrower)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod core;
pub mod error;
pub mod protocol;
pub mod storage;
pub mod utils;
pub mod zkp;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::{LendingConfig, ReapprovalPolicy, StorageFormat},
        ledger::LoanLedger,
        loan::{LoanRecord, LoanStatus},
    };
    pub use crate::error::{Error, Result};
    pub use crate::protocol::{
        events::{EventLog, EventSubscriber, LendingEvent},
        operations::{CalculateInterestOp, LendingOperation, RequestLoanOp},
        state_machine::{LendingStateMachine, OperationResult},
    };
    pub use crate::storage::backend::{BinaryStore, FileStore, InMemoryStore, StorageBackend};
    pub use crate::utils::crypto::{Address, Hash};
    pub use crate::zkp::{
        groth16::Groth16Verifier,
        proof::{FieldElement, Groth16Proof},
        schema::ProofKind,
        verifier::{AllowListVerifier, ProofVerifier, StaticVerifier},
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "private-lending";
