//! Zero-knowledge proof handling for the lending protocol.
//!
//! Borrowers submit Groth16 proofs whose public inputs carry the values the
//! ledger is allowed to store. This module covers the proof data model, the
//! positional schemas that name those inputs, and the verifier capability.
//!
//! ## Verifiers
//!
//! - **Groth16Verifier**: BN254 pairing check against a verifying key
//! - **AllowListVerifier**: accepts registered proof fingerprints (fixtures)
//! - **StaticVerifier**: fixed verdict (tests)
//! - **MeteredVerifier**: counts and times any of the above
//!
//! ## Usage
//!
//! ```rust,ignore
//! use private_lending::zkp::{Groth16Proof, Groth16Verifier, ProofVerifier};
//!
//! let verifier = Groth16Verifier::from_file("keys/collateral.vk")?;
//! let proof = Groth16Proof::from_file("proofs/collateral.json")?;
//! assert!(verifier.verify(&proof));
//! ```

pub mod groth16;
pub mod proof;
pub mod schema;
pub mod verifier;

pub use groth16::{encode_proof, Groth16Verifier};
pub use proof::{FieldElement, G1Point, G2Point, Groth16Proof};
pub use schema::{
    decode, CollateralFields, DecodedFields, InterestFields, ProofKind, Schema, Slot,
};
pub use verifier::{
    AllowListVerifier, MeteredVerifier, ProofVerifier, StaticVerifier, VerifierStats,
};
