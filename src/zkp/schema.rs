//! Public-input schemas.
//!
//! Each proof kind exposes a fixed-length vector of public signals. A schema
//! names every position and says which ones reach the ledger. Decoding only
//! reads positions: the verifier's acceptance is what makes the values
//! trustworthy, so no business-rule validation happens here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::constants::*;
use crate::zkp::proof::FieldElement;

// ═══════════════════════════════════════════════════════════════════════════════
// PROOF KIND
// ═══════════════════════════════════════════════════════════════════════════════

/// Proof types accepted by the lending protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    /// Borrower holds enough collateral for the requested principal
    Collateral,
    /// Interest accrued on the position and whether it crossed liquidation
    InterestLiquidation,
}

impl ProofKind {
    /// Short name
    pub fn name(&self) -> &'static str {
        match self {
            ProofKind::Collateral => "collateral",
            ProofKind::InterestLiquidation => "interest_liquidation",
        }
    }

    /// Fixed message surfaced when this kind of proof is rejected
    pub fn rejection_message(&self) -> &'static str {
        match self {
            ProofKind::Collateral => INVALID_COLLATERAL_PROOF,
            ProofKind::InterestLiquidation => INVALID_INTEREST_PROOF,
        }
    }

    /// Schema this kind is decoded against
    pub fn schema(&self) -> &'static Schema {
        match self {
            ProofKind::Collateral => &COLLATERAL_SCHEMA,
            ProofKind::InterestLiquidation => &INTEREST_SCHEMA,
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProofKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "collateral" => Ok(ProofKind::Collateral),
            "interest" | "interest_liquidation" | "interest-liquidation" | "liquidation" => {
                Ok(ProofKind::InterestLiquidation)
            }
            _ => Err(Error::InvalidParameter {
                name: "kind".into(),
                reason: format!("unknown proof kind: {}", s),
            }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEMA
// ═══════════════════════════════════════════════════════════════════════════════

/// One named position of a public-input vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Position in the vector
    pub position: usize,
    /// Field name
    pub name: &'static str,
    /// Whether the value is written to the ledger
    pub surfaced: bool,
}

const fn slot(position: usize, name: &'static str, surfaced: bool) -> Slot {
    Slot { position, name, surfaced }
}

/// Versioned layout of a proof kind's public-input vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Proof kind
    pub kind: ProofKind,
    /// Layout version, bumped together with the circuit
    pub version: u32,
    /// Expected vector length
    pub arity: usize,
    slots: &'static [Slot],
}

/// Collateral proof layout
pub static COLLATERAL_SCHEMA: Schema = Schema {
    kind: ProofKind::Collateral,
    version: COLLATERAL_SCHEMA_VERSION,
    arity: COLLATERAL_ARITY,
    slots: &[
        slot(0, "balance_check", false),
        slot(1, "ratio_check", false),
        slot(COLLATERAL_LOAN_AMOUNT_POS, "loan_amount", true),
        slot(3, "collateral_ratio_percent", false),
        slot(4, "balance", false),
        slot(COLLATERAL_AMOUNT_POS, "collateral_amount", true),
        slot(6, "reserved", false),
    ],
};

/// Interest/liquidation proof layout
pub static INTEREST_SCHEMA: Schema = Schema {
    kind: ProofKind::InterestLiquidation,
    version: INTEREST_SCHEMA_VERSION,
    arity: INTEREST_ARITY,
    slots: &[
        slot(INTEREST_ACCRUED_POS, "accrued_interest", true),
        slot(INTEREST_LIQUIDATABLE_POS, "is_liquidatable", true),
        slot(2, "principal", false),
        slot(3, "collateral_value", false),
        slot(4, "rate", false),
        slot(5, "elapsed", false),
        slot(6, "liquidation_threshold", false),
    ],
};

impl Schema {
    /// All named positions, in order
    pub fn slots(&self) -> &'static [Slot] {
        self.slots
    }

    /// Fail with `SchemaMismatch` unless the vector has this schema's arity
    pub fn check_arity(&self, input: &[FieldElement]) -> Result<()> {
        if input.len() != self.arity {
            return Err(Error::SchemaMismatch {
                kind: self.kind,
                expected: self.arity,
                got: input.len(),
            });
        }
        Ok(())
    }

    /// Pair every element with its slot name
    pub fn describe<'a>(&self, input: &'a [FieldElement]) -> Result<Vec<(Slot, &'a FieldElement)>> {
        self.check_arity(input)?;
        Ok(self.slots.iter().copied().zip(input.iter()).collect())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECODED FIELDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Ledger-facing outputs of a collateral proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralFields {
    /// Principal granted
    pub loan_amount: u128,
    /// Collateral pledged
    pub collateral_amount: u128,
}

/// Ledger-facing outputs of an interest/liquidation proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestFields {
    /// Interest as of this proof
    pub accrued_interest: u128,
    /// Whether the position is liquidatable
    pub is_liquidatable: bool,
}

/// Result of decoding any proof kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodedFields {
    /// Collateral proof outputs
    Collateral(CollateralFields),
    /// Interest/liquidation proof outputs
    InterestLiquidation(InterestFields),
}

impl DecodedFields {
    /// Proof kind these fields came from
    pub fn kind(&self) -> ProofKind {
        match self {
            DecodedFields::Collateral(_) => ProofKind::Collateral,
            DecodedFields::InterestLiquidation(_) => ProofKind::InterestLiquidation,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECODING
// ═══════════════════════════════════════════════════════════════════════════════

/// Decode a public-input vector according to the schema of `kind`
pub fn decode(kind: ProofKind, input: &[FieldElement]) -> Result<DecodedFields> {
    match kind {
        ProofKind::Collateral => decode_collateral(input).map(DecodedFields::Collateral),
        ProofKind::InterestLiquidation => {
            decode_interest(input).map(DecodedFields::InterestLiquidation)
        }
    }
}

/// Decode a collateral proof's public inputs
pub fn decode_collateral(input: &[FieldElement]) -> Result<CollateralFields> {
    COLLATERAL_SCHEMA.check_arity(input)?;
    Ok(CollateralFields {
        loan_amount: read_amount(input, COLLATERAL_LOAN_AMOUNT_POS, "loan_amount")?,
        collateral_amount: read_amount(input, COLLATERAL_AMOUNT_POS, "collateral_amount")?,
    })
}

/// Decode an interest/liquidation proof's public inputs
pub fn decode_interest(input: &[FieldElement]) -> Result<InterestFields> {
    INTEREST_SCHEMA.check_arity(input)?;
    Ok(InterestFields {
        accrued_interest: read_amount(input, INTEREST_ACCRUED_POS, "accrued_interest")?,
        is_liquidatable: !input[INTEREST_LIQUIDATABLE_POS].is_zero(),
    })
}

fn read_amount(input: &[FieldElement], position: usize, field: &str) -> Result<u128> {
    input[position].to_u128().ok_or_else(|| Error::ValueOutOfRange {
        field: field.to_string(),
        position,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
