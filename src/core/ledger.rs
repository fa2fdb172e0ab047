//! Per-borrower loan ledger.
//!
//! Records are stored under `loan:` + the 20 address bytes, bincode-encoded.
//! Reads of unknown borrowers return the default record. Writes are
//! crate-private and take decoded schema fields, so the only way a value
//! reaches the ledger is through a verified proof.

use tracing::{debug, warn};

use crate::core::loan::LoanRecord;
use crate::error::{Error, Result};
use crate::storage::backend::{make_key, prefixes, StorageBackend, TypedStore};
use crate::utils::crypto::Address;
use crate::zkp::schema::{CollateralFields, InterestFields};

/// Keyed store of loan records
pub struct LoanLedger<B: StorageBackend> {
    store: TypedStore<B>,
}

impl<B: StorageBackend> LoanLedger<B> {
    /// Create a ledger over a storage backend
    pub fn new(backend: B) -> Self {
        Self {
            store: TypedStore::new(backend),
        }
    }

    fn key(borrower: &Address) -> Vec<u8> {
        make_key(prefixes::LOAN, borrower.as_bytes())
    }

    /// Current record for a borrower (default record if none exists)
    pub fn get(&self, borrower: &Address) -> Result<LoanRecord> {
        Ok(self
            .store
            .get::<LoanRecord>(&Self::key(borrower))?
            .unwrap_or_default())
    }

    /// Check whether a record has ever been written for the borrower
    pub fn contains(&self, borrower: &Address) -> Result<bool> {
        Ok(self.store.get::<LoanRecord>(&Self::key(borrower))?.is_some())
    }

    /// All borrowers with a stored record, in address order
    pub fn borrowers(&self) -> Result<Vec<Address>> {
        self.store
            .list_prefix(prefixes::LOAN)?
            .iter()
            .map(|key| {
                Address::from_slice(&key[prefixes::LOAN.len()..]).map_err(|_| {
                    Error::Storage(format!("malformed ledger key {}", hex::encode(key)))
                })
            })
            .collect()
    }

    /// Every stored record, in address order
    pub fn records(&self) -> Result<Vec<(Address, LoanRecord)>> {
        self.borrowers()?
            .into_iter()
            .map(|borrower| Ok((borrower, self.get(&borrower)?)))
            .collect()
    }

    /// Record verified collateral outputs and mark the loan approved
    pub(crate) fn approve(
        &self,
        borrower: &Address,
        fields: &CollateralFields,
    ) -> Result<LoanRecord> {
        let mut record = self.get(borrower)?;
        record.approve(fields);
        self.put(borrower, &record)?;
        Ok(record)
    }

    /// Overwrite interest state from verified interest outputs
    pub(crate) fn record_interest(
        &self,
        borrower: &Address,
        fields: &InterestFields,
    ) -> Result<LoanRecord> {
        let mut record = self.get(borrower)?;
        record.apply_interest(fields);
        self.put(borrower, &record)?;
        Ok(record)
    }

    /// Write and flush one record; a failed flush restores the previous value
    fn put(&self, borrower: &Address, record: &LoanRecord) -> Result<()> {
        let key = Self::key(borrower);
        let previous = self.store.backend().get(&key)?;

        self.store.set(&key, record)?;
        if let Err(e) = self.store.flush() {
            warn!(borrower = %borrower, error = %e, "ledger flush failed, rolling back");
            match previous {
                Some(bytes) => self.store.backend().set(&key, &bytes)?,
                None => {
                    self.store.delete(&key)?;
                }
            }
            return Err(e);
        }

        debug!(borrower = %borrower, status = %record.status(), "ledger record written");
        Ok(())
    }

    /// Get the underlying backend
    pub fn backend(&self) -> &B {
        self.store.backend()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
