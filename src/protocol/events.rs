//! Lending events for state change notifications.
//!
//! One event is emitted per successful ledger write, after the write. A
//! rejected or failed operation emits nothing.

use serde::{Deserialize, Serialize};

use crate::utils::crypto::{Address, Hash};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All lending event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LendingEvent {
    /// Collateral proof verified, loan approved
    LoanApproved(LoanApprovedEvent),
    /// Interest proof verified, interest and liquidation flag updated
    InterestCalculated(InterestCalculatedEvent),
}

impl LendingEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::LoanApproved(_) => "LoanApproved",
            Self::InterestCalculated(_) => "InterestCalculated",
        }
    }

    /// Borrower the event concerns
    pub fn borrower(&self) -> &Address {
        match self {
            Self::LoanApproved(e) => &e.borrower,
            Self::InterestCalculated(e) => &e.borrower,
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::LoanApproved(e) => e.timestamp,
            Self::InterestCalculated(e) => e.timestamp,
        }
    }

    /// Get the block height of the event
    pub fn block_height(&self) -> u64 {
        match self {
            Self::LoanApproved(e) => e.block_height,
            Self::InterestCalculated(e) => e.block_height,
        }
    }

    /// Compute event hash
    pub fn hash(&self) -> Hash {
        let data = bincode::serialize(self).unwrap_or_default();
        Hash::sha256(&data)
    }
}

impl std::fmt::Display for LendingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoanApproved(e) => write!(
                f,
                "LoanApproved({}, {}, {})",
                e.borrower, e.loan_amount, e.collateral_amount
            ),
            Self::InterestCalculated(e) => write!(
                f,
                "InterestCalculated({}, {}, {})",
                e.borrower, e.accrued_interest, e.is_liquidatable
            ),
        }
    }
}

/// Event emitted when a collateral proof approves a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanApprovedEvent {
    /// Borrower address
    pub borrower: Address,
    /// Principal granted
    pub loan_amount: u128,
    /// Collateral pledged
    pub collateral_amount: u128,
    /// Fingerprint of the accepted proof
    pub proof_hash: Hash,
    /// Block height
    pub block_height: u64,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when an interest proof updates a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestCalculatedEvent {
    /// Borrower address
    pub borrower: Address,
    /// Accrued interest
    pub accrued_interest: u128,
    /// Liquidation flag
    pub is_liquidatable: bool,
    /// Fingerprint of the accepted proof
    pub proof_hash: Hash,
    /// Block height
    pub block_height: u64,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIBERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Observer notified synchronously after each successful state change
pub trait EventSubscriber: Send + Sync {
    /// Handle an event
    fn on_event(&self, event: &LendingEvent);
}

impl<F> EventSubscriber for F
where
    F: Fn(&LendingEvent) + Send + Sync,
{
    fn on_event(&self, event: &LendingEvent) {
        self(event)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered in-memory record of emitted events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<LendingEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn push(&mut self, event: LendingEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[LendingEvent] {
        &self.events
    }

    /// Get events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&LendingEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events concerning one borrower
    pub fn for_borrower(&self, borrower: &Address) -> Vec<&LendingEvent> {
        self.events
            .iter()
            .filter(|e| e.borrower() == borrower)
            .collect()
    }

    /// Most recent event
    pub fn last(&self) -> Option<&LendingEvent> {
        self.events.last()
    }

    /// Get the number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove and return all events
    pub fn drain(&mut self) -> Vec<LendingEvent> {
        std::mem::take(&mut self.events)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
