//! Lending State Machine - proof-gated loan lifecycle.
//!
//! Every mutating operation follows the same sequence: check preconditions,
//! verify the proof with the verifier bound to its kind, decode the public
//! inputs, write the ledger, then emit an event. Any failure returns before
//! the write, so a rejected proof never changes state.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::config::{LendingConfig, ReapprovalPolicy};
use crate::core::ledger::LoanLedger;
use crate::core::loan::LoanRecord;
use crate::error::{Error, Result};
use crate::protocol::events::*;
use crate::protocol::operations::*;
use crate::storage::backend::StorageBackend;
use crate::utils::crypto::Address;
use crate::zkp::proof::Groth16Proof;
use crate::zkp::schema::{decode_collateral, decode_interest, ProofKind};
use crate::zkp::verifier::{MeteredVerifier, ProofVerifier, VerifierStats};

type BoundVerifier = MeteredVerifier<Box<dyn ProofVerifier>>;

// ═══════════════════════════════════════════════════════════════════════════════
// STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Lending state machine - owns the ledger and both verifiers
pub struct LendingStateMachine<B: StorageBackend> {
    /// Per-borrower records
    ledger: LoanLedger<B>,
    /// Verifier for collateral proofs
    collateral_verifier: BoundVerifier,
    /// Verifier for interest/liquidation proofs
    interest_verifier: BoundVerifier,
    /// Policies
    config: LendingConfig,
    /// Current block height
    block_height: u64,
    /// Current timestamp
    timestamp: u64,
    /// Events emitted since the last `take_events`/`end_block`
    event_log: EventLog,
    /// Synchronous observers
    subscribers: Vec<Box<dyn EventSubscriber>>,
}

impl<B: StorageBackend> LendingStateMachine<B> {
    /// Create a state machine over a storage backend.
    ///
    /// The verifiers are bound here for the lifetime of the machine.
    pub fn new<C, I>(
        backend: B,
        collateral_verifier: C,
        interest_verifier: I,
        config: LendingConfig,
    ) -> Self
    where
        C: ProofVerifier + 'static,
        I: ProofVerifier + 'static,
    {
        info!(
            collateral_verifier = collateral_verifier.name(),
            interest_verifier = interest_verifier.name(),
            reapproval_policy = %config.reapproval_policy,
            "lending state machine initialized"
        );

        let collateral: Box<dyn ProofVerifier> = Box::new(collateral_verifier);
        let interest: Box<dyn ProofVerifier> = Box::new(interest_verifier);

        Self {
            ledger: LoanLedger::new(backend),
            collateral_verifier: MeteredVerifier::new(collateral),
            interest_verifier: MeteredVerifier::new(interest),
            config,
            block_height: 0,
            timestamp: 0,
            event_log: EventLog::new(),
            subscribers: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BLOCK PROCESSING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Begin a new block; subsequent events carry this height and timestamp
    pub fn begin_block(&mut self, height: u64, timestamp: u64) {
        self.block_height = height;
        self.timestamp = timestamp;
    }

    /// End the current block: flush the ledger and hand back its events
    pub fn end_block(&mut self) -> Result<EventLog> {
        self.ledger.backend().flush()?;
        Ok(self.take_events())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPERATION EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Execute a lending operation
    pub fn execute(&mut self, op: LendingOperation) -> Result<OperationResult> {
        match op {
            LendingOperation::RequestLoan(op) => self
                .request_loan(&op.borrower, &op.proof)
                .map(OperationResult::LoanApproved),
            LendingOperation::CalculateInterest(op) => self
                .calculate_interest_and_check_liquidation(&op.borrower, &op.proof)
                .map(OperationResult::InterestCalculated),
        }
    }

    /// Open a loan from a verified collateral proof.
    ///
    /// Writes `loan_amount` and `collateral_amount` from the proof's public
    /// inputs and marks the loan approved. Interest state is not touched. An
    /// approved borrower may request again unless the policy is `Reject`.
    pub fn request_loan(
        &mut self,
        borrower: &Address,
        proof: &Groth16Proof,
    ) -> Result<RequestLoanResult> {
        info!(borrower = %borrower, inputs = proof.arity(), "request_loan");

        let existing = self.ledger.get(borrower)?;
        if existing.is_loan_approved && self.config.reapproval_policy == ReapprovalPolicy::Reject {
            warn!(borrower = %borrower, "loan already approved");
            return Err(Error::LoanAlreadyApproved(*borrower));
        }

        self.verify(ProofKind::Collateral, proof)?;
        let fields = decode_collateral(&proof.input)?;

        let record = self.ledger.approve(borrower, &fields)?;
        let proof_hash = proof.hash();

        info!(
            borrower = %borrower,
            loan_amount = %fields.loan_amount,
            collateral_amount = %fields.collateral_amount,
            "loan approved"
        );

        self.emit(LendingEvent::LoanApproved(LoanApprovedEvent {
            borrower: *borrower,
            loan_amount: fields.loan_amount,
            collateral_amount: fields.collateral_amount,
            proof_hash,
            block_height: self.block_height,
            timestamp: self.timestamp,
        }));

        Ok(RequestLoanResult {
            loan_amount: fields.loan_amount,
            collateral_amount: fields.collateral_amount,
            replaced_existing: existing.is_loan_approved,
            proof_hash,
            record,
        })
    }

    /// Update accrued interest and the liquidation flag from a verified
    /// interest proof. Principal and collateral are untouched.
    pub fn calculate_interest_and_check_liquidation(
        &mut self,
        borrower: &Address,
        proof: &Groth16Proof,
    ) -> Result<CalculateInterestResult> {
        info!(
            borrower = %borrower,
            inputs = proof.arity(),
            "calculate_interest_and_check_liquidation"
        );

        let existing = self.ledger.get(borrower)?;
        if self.config.require_approved_loan && !existing.is_loan_approved {
            warn!(borrower = %borrower, "no approved loan");
            return Err(Error::LoanNotApproved(*borrower));
        }

        self.verify(ProofKind::InterestLiquidation, proof)?;
        let fields = decode_interest(&proof.input)?;

        let record = self.ledger.record_interest(borrower, &fields)?;
        let proof_hash = proof.hash();

        if fields.is_liquidatable {
            warn!(
                borrower = %borrower,
                accrued_interest = %fields.accrued_interest,
                "position is liquidatable"
            );
        } else {
            info!(
                borrower = %borrower,
                accrued_interest = %fields.accrued_interest,
                "interest recorded"
            );
        }

        self.emit(LendingEvent::InterestCalculated(InterestCalculatedEvent {
            borrower: *borrower,
            accrued_interest: fields.accrued_interest,
            is_liquidatable: fields.is_liquidatable,
            proof_hash,
            block_height: self.block_height,
            timestamp: self.timestamp,
        }));

        Ok(CalculateInterestResult {
            accrued_interest: fields.accrued_interest,
            is_liquidatable: fields.is_liquidatable,
            liquidation_changed: existing.is_liquidatable != fields.is_liquidatable,
            proof_hash,
            record,
        })
    }

    /// Current record for a borrower (zero record if unknown)
    pub fn get_loan_details(&self, borrower: &Address) -> Result<LoanRecord> {
        self.ledger.get(borrower)
    }

    fn verify(&self, kind: ProofKind, proof: &Groth16Proof) -> Result<()> {
        let verifier = match kind {
            ProofKind::Collateral => &self.collateral_verifier,
            ProofKind::InterestLiquidation => &self.interest_verifier,
        };

        if verifier.verify(proof) {
            Ok(())
        } else {
            warn!(kind = %kind, proof = %proof.hash(), "proof rejected");
            Err(Error::InvalidProof { kind })
        }
    }

    fn emit(&mut self, event: LendingEvent) {
        for subscriber in &self.subscribers {
            subscriber.on_event(&event);
        }
        self.event_log.push(event);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Register an observer for future events
    pub fn subscribe<S: EventSubscriber + 'static>(&mut self, subscriber: S) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Events emitted since the log was last taken
    pub fn events(&self) -> &EventLog {
        &self.event_log
    }

    /// Take the event log, leaving an empty one
    pub fn take_events(&mut self) -> EventLog {
        std::mem::take(&mut self.event_log)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// All borrowers with a stored record
    pub fn borrowers(&self) -> Result<Vec<Address>> {
        self.ledger.borrowers()
    }

    /// Every stored record
    pub fn loans(&self) -> Result<Vec<(Address, LoanRecord)>> {
        self.ledger.records()
    }

    /// Verification counters for one proof kind
    pub fn verifier_stats(&self, kind: ProofKind) -> VerifierStats {
        match kind {
            ProofKind::Collateral => self.collateral_verifier.stats(),
            ProofKind::InterestLiquidation => self.interest_verifier.stats(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    /// The ledger (read-only access)
    pub fn ledger(&self) -> &LoanLedger<B> {
        &self.ledger
    }

    /// Get current block height
    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    /// Get current timestamp
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATION RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of any lending operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationResult {
    /// Loan request result
    LoanApproved(RequestLoanResult),
    /// Interest calculation result
    InterestCalculated(CalculateInterestResult),
}

impl OperationResult {
    /// Record after the operation
    pub fn record(&self) -> &LoanRecord {
        match self {
            Self::LoanApproved(r) => &r.record,
            Self::InterestCalculated(r) => &r.record,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
