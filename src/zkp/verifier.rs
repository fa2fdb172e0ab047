//! Proof verification capability.
//!
//! The state machine only ever asks one question of a verifier: does this
//! proof satisfy your circuit for exactly these public inputs? Verifiers are
//! injected at construction, one per proof kind, so the pairing backend can be
//! swapped for fixtures without touching the lending logic.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::debug;

use crate::utils::crypto::Hash;
use crate::zkp::proof::Groth16Proof;

// ═══════════════════════════════════════════════════════════════════════════════
// VERIFIER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A proof verifier bound to one circuit's verification parameters.
///
/// Implementations must be deterministic in `(a, b, c, input)`, free of side
/// effects visible to the caller, and must return `false` (never panic) for
/// any well-typed proof they cannot accept.
pub trait ProofVerifier: Send + Sync {
    /// Check a proof against its public inputs
    fn verify(&self, proof: &Groth16Proof) -> bool;

    /// Human-readable backend name for logs
    fn name(&self) -> &str {
        "verifier"
    }
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for Box<V> {
    fn verify(&self, proof: &Groth16Proof) -> bool {
        (**self).verify(proof)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for std::sync::Arc<V> {
    fn verify(&self, proof: &Groth16Proof) -> bool {
        (**self).verify(proof)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATIC VERIFIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Verifier with a fixed verdict (for testing)
#[derive(Debug, Clone, Copy)]
pub struct StaticVerifier {
    verdict: bool,
}

impl StaticVerifier {
    /// Accepts every proof
    pub fn accept_all() -> Self {
        Self { verdict: true }
    }

    /// Rejects every proof
    pub fn reject_all() -> Self {
        Self { verdict: false }
    }
}

impl ProofVerifier for StaticVerifier {
    fn verify(&self, _proof: &Groth16Proof) -> bool {
        self.verdict
    }

    fn name(&self) -> &str {
        if self.verdict {
            "static-accept"
        } else {
            "static-reject"
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ALLOW-LIST VERIFIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Accepts exactly the proofs registered with it, matched by fingerprint.
///
/// Changing any coordinate or public input changes the fingerprint, so a
/// registered proof replayed with a different vector is rejected the same
/// way a pairing check would reject it.
#[derive(Debug, Clone, Default)]
pub struct AllowListVerifier {
    accepted: HashSet<Hash>,
}

impl AllowListVerifier {
    /// Create an empty allow-list (rejects everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a proof as valid
    pub fn allow(&mut self, proof: &Groth16Proof) {
        self.accepted.insert(proof.hash());
    }

    /// Builder form of [`allow`](Self::allow)
    pub fn with_proof(mut self, proof: &Groth16Proof) -> Self {
        self.allow(proof);
        self
    }

    /// Number of registered proofs
    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

impl ProofVerifier for AllowListVerifier {
    fn verify(&self, proof: &Groth16Proof) -> bool {
        self.accepted.contains(&proof.hash())
    }

    fn name(&self) -> &str {
        "allow-list"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// METERED VERIFIER
// ═══════════════════════════════════════════════════════════════════════════════

/// Verifier statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifierStats {
    /// Total verifications performed
    pub total_verifications: u64,
    /// Proofs accepted
    pub accepted: u64,
    /// Proofs rejected
    pub rejected: u64,
    /// Total verification time (microseconds)
    pub total_time_us: u64,
}

impl VerifierStats {
    /// Get acceptance rate
    pub fn acceptance_rate(&self) -> f64 {
        if self.total_verifications == 0 {
            0.0
        } else {
            self.accepted as f64 / self.total_verifications as f64
        }
    }

    /// Get average verification time (microseconds)
    pub fn average_time_us(&self) -> u64 {
        if self.total_verifications == 0 {
            0
        } else {
            self.total_time_us / self.total_verifications
        }
    }
}

/// Wraps a verifier, counting verdicts and timing each call
#[derive(Debug, Default)]
pub struct MeteredVerifier<V> {
    inner: V,
    accepted: AtomicU64,
    rejected: AtomicU64,
    total_time_us: AtomicU64,
}

impl<V: ProofVerifier> MeteredVerifier<V> {
    /// Wrap a verifier
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            total_time_us: AtomicU64::new(0),
        }
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> VerifierStats {
        let accepted = self.accepted.load(Ordering::Relaxed);
        let rejected = self.rejected.load(Ordering::Relaxed);
        VerifierStats {
            total_verifications: accepted + rejected,
            accepted,
            rejected,
            total_time_us: self.total_time_us.load(Ordering::Relaxed),
        }
    }

    /// The wrapped verifier
    pub fn inner(&self) -> &V {
        &self.inner
    }
}

impl<V: ProofVerifier> ProofVerifier for MeteredVerifier<V> {
    fn verify(&self, proof: &Groth16Proof) -> bool {
        let start = Instant::now();
        let valid = self.inner.verify(proof);
        let elapsed_us = start.elapsed().as_micros() as u64;

        self.total_time_us.fetch_add(elapsed_us, Ordering::Relaxed);
        if valid {
            self.accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }

        debug!(
            verifier = self.inner.name(),
            valid,
            elapsed_us,
            proof = %proof.hash(),
            "proof verified"
        );
        valid
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
