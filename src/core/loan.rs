//! Loan records.
//!
//! A `LoanRecord` holds only values lifted from verified proofs. Fields are
//! readable by anyone but written exclusively by the ledger, which in turn
//! only accepts decoded schema fields.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::zkp::schema::{CollateralFields, InterestFields};

// ═══════════════════════════════════════════════════════════════════════════════
// LOAN STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle position of a borrower, derived from the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// No verified collateral proof yet
    Uninitialized,
    /// Collateral proven, position healthy
    Approved,
    /// Latest interest proof flagged the position for liquidation
    Liquidatable,
}

impl LoanStatus {
    /// Get status name
    pub fn name(&self) -> &'static str {
        match self {
            LoanStatus::Uninitialized => "uninitialized",
            LoanStatus::Approved => "approved",
            LoanStatus::Liquidatable => "liquidatable",
        }
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOAN RECORD
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-borrower loan state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    /// Principal granted
    pub loan_amount: u128,
    /// Collateral pledged
    pub collateral_amount: u128,
    /// Interest as of the last interest proof
    pub accrued_interest: u128,
    /// Set by a verified collateral proof
    pub is_loan_approved: bool,
    /// Set by a verified interest/liquidation proof
    pub is_liquidatable: bool,
}

impl LoanRecord {
    /// Derived lifecycle status
    pub fn status(&self) -> LoanStatus {
        match (self.is_loan_approved, self.is_liquidatable) {
            (false, _) => LoanStatus::Uninitialized,
            (true, false) => LoanStatus::Approved,
            (true, true) => LoanStatus::Liquidatable,
        }
    }

    /// Check if this is the default (never touched) record
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write collateral outputs and mark the loan approved.
    ///
    /// Interest state is left as the last interest proof set it.
    pub(crate) fn approve(&mut self, fields: &CollateralFields) {
        self.loan_amount = fields.loan_amount;
        self.collateral_amount = fields.collateral_amount;
        self.is_loan_approved = true;
    }

    /// Overwrite interest state from interest outputs
    pub(crate) fn apply_interest(&mut self, fields: &InterestFields) {
        self.accrued_interest = fields.accrued_interest;
        self.is_liquidatable = fields.is_liquidatable;
    }
}

impl fmt::Display for LoanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (loan {}, collateral {}, interest {})",
            self.status(),
            self.loan_amount,
            self.collateral_amount,
            self.accrued_interest
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn collateral(loan_amount: u128, collateral_amount: u128) -> CollateralFields {
        CollateralFields {
            loan_amount,
            collateral_amount,
        }
    }

    #[test]
    fn test_default_record() {
        let record = LoanRecord::default();
        assert!(record.is_empty());
        assert_eq!(record.status(), LoanStatus::Uninitialized);
    }

    #[test]
    fn test_approve_sets_amounts() {
        let mut record = LoanRecord::default();
        record.approve(&collateral(5000, 8000));

        assert_eq!(record.loan_amount, 5000);
        assert_eq!(record.collateral_amount, 8000);
        assert!(record.is_loan_approved);
        assert_eq!(record.status(), LoanStatus::Approved);
    }

    #[test]
    fn test_interest_overwrites_only_interest_fields() {
        let mut record = LoanRecord::default();
        record.approve(&collateral(5000, 8000));
        record.apply_interest(&InterestFields {
            accrued_interest: 75,
            is_liquidatable: true,
        });

        assert_eq!(record.accrued_interest, 75);
        assert_eq!(record.status(), LoanStatus::Liquidatable);
        assert_eq!(record.loan_amount, 5000);

        record.apply_interest(&InterestFields {
            accrued_interest: 10,
            is_liquidatable: false,
        });
        assert_eq!(record.accrued_interest, 10);
        assert_eq!(record.status(), LoanStatus::Approved);
    }

    #[test]
    fn test_reapproval_keeps_interest_state() {
        let mut record = LoanRecord::default();
        record.approve(&collateral(5000, 8000));
        record.apply_interest(&InterestFields {
            accrued_interest: 75,
            is_liquidatable: true,
        });

        record.approve(&collateral(100, 200));
        assert_eq!(record.loan_amount, 100);
        assert_eq!(record.collateral_amount, 200);
        assert_eq!(record.accrued_interest, 75);
        assert!(record.is_liquidatable);
    }

    #[test]
    fn test_display() {
        let mut record = LoanRecord::default();
        record.approve(&collateral(5000, 8000));
        assert_eq!(
            record.to_string(),
            "approved (loan 5000, collateral 8000, interest 0)"
        );
    }

    proptest! {
        #[test]
        fn prop_interest_never_touches_principal(
            loan in any::<u128>(),
            coll in any::<u128>(),
            interest in any::<u128>(),
            flag in any::<bool>(),
        ) {
            let mut record = LoanRecord::default();
            record.approve(&collateral(loan, coll));
            record.apply_interest(&InterestFields { accrued_interest: interest, is_liquidatable: flag });

            prop_assert_eq!(record.loan_amount, loan);
            prop_assert_eq!(record.collateral_amount, coll);
            prop_assert!(record.is_loan_approved);
        }

        #[test]
        fn prop_approve_never_touches_interest(
            interest in any::<u128>(),
            flag in any::<bool>(),
            loan in any::<u128>(),
            coll in any::<u128>(),
        ) {
            let mut record = LoanRecord::default();
            record.apply_interest(&InterestFields { accrued_interest: interest, is_liquidatable: flag });
            record.approve(&collateral(loan, coll));

            prop_assert_eq!(record.accrued_interest, interest);
            prop_assert_eq!(record.is_liquidatable, flag);
            prop_assert_eq!(record.loan_amount, loan);
        }

        #[test]
        fn prop_bincode_roundtrip(loan in any::<u128>(), interest in any::<u128>(), flag in any::<bool>()) {
            let record = LoanRecord {
                loan_amount: loan,
                collateral_amount: loan / 2,
                accrued_interest: interest,
                is_loan_approved: true,
                is_liquidatable: flag,
            };
            let bytes = bincode::serialize(&record).unwrap();
            let back: LoanRecord = bincode::deserialize(&bytes).unwrap();
            prop_assert_eq!(back, record);
        }
    }
}
