//! Groth16 verification over BN254 using arkworks.
//!
//! Calldata-shaped proofs are converted into arkworks points with strict
//! checks: every coordinate must be a canonical base-field element, every
//! public input a canonical scalar, and every point on the curve and in the
//! prime-order subgroup. Anything that fails a check verifies `false`.

use std::path::Path;

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{prepare_verifying_key, Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::zkp::proof::{FieldElement, G1Point, G2Point, Groth16Proof};
use crate::zkp::verifier::ProofVerifier;

// ═══════════════════════════════════════════════════════════════════════════════
// VERIFIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Groth16 verifier bound to one BN254 verifying key
#[derive(Clone)]
pub struct Groth16Verifier {
    name: String,
    vk: VerifyingKey<Bn254>,
    pvk: PreparedVerifyingKey<Bn254>,
}

impl Groth16Verifier {
    /// Create from an arkworks verifying key
    pub fn new(vk: VerifyingKey<Bn254>) -> Self {
        let pvk = prepare_verifying_key(&vk);
        Self {
            name: "groth16-bn254".to_string(),
            vk,
            pvk,
        }
    }

    /// Set the name reported in logs
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Create from compressed `ark-serialize` bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(bytes)
            .map_err(|e| Error::InvalidVerificationKey(e.to_string()))?;
        Ok(Self::new(vk))
    }

    /// Load a verifying key file (raw compressed bytes, or the same bytes hex-encoded)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|e| {
            Error::InvalidVerificationKey(format!("cannot read {}: {}", path.display(), e))
        })?;

        let bytes = match std::str::from_utf8(&raw) {
            Ok(text) if is_hex_text(text) => hex::decode(text.trim().trim_start_matches("0x"))
                .map_err(|e| Error::InvalidVerificationKey(e.to_string()))?,
            _ => raw,
        };

        let verifier = Self::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            public_inputs = verifier.num_public_inputs(),
            "loaded verifying key"
        );
        Ok(verifier)
    }

    /// Compressed encoding of the verifying key
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.vk
            .serialize_compressed(&mut bytes)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    /// Number of public inputs the key expects
    pub fn num_public_inputs(&self) -> usize {
        self.vk.gamma_abc_g1.len().saturating_sub(1)
    }

    /// The underlying verifying key
    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.vk
    }

    fn check(&self, proof: &Groth16Proof) -> std::result::Result<bool, &'static str> {
        if proof.input.len() != self.num_public_inputs() {
            return Err("public input arity mismatch");
        }

        let inputs = proof
            .input
            .iter()
            .map(to_fr)
            .collect::<Option<Vec<Fr>>>()
            .ok_or("non-canonical public input")?;

        let ark_proof = Proof::<Bn254> {
            a: to_g1(&proof.a).ok_or("invalid point a")?,
            b: to_g2(&proof.b).ok_or("invalid point b")?,
            c: to_g1(&proof.c).ok_or("invalid point c")?,
        };

        Groth16::<Bn254>::verify_with_processed_vk(&self.pvk, &inputs, &ark_proof)
            .map_err(|_| "pairing check failed to run")
    }
}

impl ProofVerifier for Groth16Verifier {
    fn verify(&self, proof: &Groth16Proof) -> bool {
        match self.check(proof) {
            Ok(valid) => valid,
            Err(reason) => {
                debug!(verifier = %self.name, reason, "proof rejected before pairing");
                false
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Groth16Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Groth16Verifier")
            .field("name", &self.name)
            .field("public_inputs", &self.num_public_inputs())
            .finish()
    }
}

fn is_hex_text(text: &str) -> bool {
    let digits = text.trim().trim_start_matches("0x");
    !digits.is_empty() && digits.len() % 2 == 0 && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn to_fr(fe: &FieldElement) -> Option<Fr> {
    let value = Fr::from_be_bytes_mod_order(fe.as_be_bytes());
    (value.into_bigint().to_bytes_be().as_slice() == fe.as_be_bytes()).then_some(value)
}

fn to_fq(fe: &FieldElement) -> Option<Fq> {
    let value = Fq::from_be_bytes_mod_order(fe.as_be_bytes());
    (value.into_bigint().to_bytes_be().as_slice() == fe.as_be_bytes()).then_some(value)
}

fn to_g1(point: &G1Point) -> Option<G1Affine> {
    if point.is_zero() {
        return Some(G1Affine::zero());
    }
    let p = G1Affine::new_unchecked(to_fq(&point.x)?, to_fq(&point.y)?);
    (p.is_on_curve() && p.is_in_correct_subgroup_assuming_on_curve()).then_some(p)
}

fn to_g2(point: &G2Point) -> Option<G2Affine> {
    if point.is_zero() {
        return Some(G2Affine::zero());
    }
    // calldata order is [c1, c0]
    let x = Fq2::new(to_fq(&point.x[1])?, to_fq(&point.x[0])?);
    let y = Fq2::new(to_fq(&point.y[1])?, to_fq(&point.y[0])?);
    let p = G2Affine::new_unchecked(x, y);
    (p.is_on_curve() && p.is_in_correct_subgroup_assuming_on_curve()).then_some(p)
}

fn fe_from_prime<F: PrimeField>(value: &F) -> FieldElement {
    let bytes = value.into_bigint().to_bytes_be();
    let mut arr = [0u8; 32];
    arr[32 - bytes.len()..].copy_from_slice(&bytes);
    FieldElement::from_be_bytes(arr)
}

fn g1_to_point(p: &G1Affine) -> G1Point {
    match p.xy() {
        Some((x, y)) => G1Point::new(fe_from_prime(x), fe_from_prime(y)),
        None => G1Point::default(),
    }
}

fn g2_to_point(p: &G2Affine) -> G2Point {
    if p.infinity {
        return G2Point::default();
    }
    G2Point::new(
        [fe_from_prime(&p.x.c1), fe_from_prime(&p.x.c0)],
        [fe_from_prime(&p.y.c1), fe_from_prime(&p.y.c0)],
    )
}

/// Render an arkworks proof and its inputs in calldata form
pub fn encode_proof(proof: &Proof<Bn254>, inputs: &[Fr]) -> Groth16Proof {
    Groth16Proof::new(
        g1_to_point(&proof.a),
        g2_to_point(&proof.b),
        g1_to_point(&proof.c),
        inputs.iter().map(fe_from_prime).collect(),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
