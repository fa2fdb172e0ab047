//! Groth16 proof data as submitted by borrowers.
//!
//! A proof is three group elements plus the public-input vector it was
//! generated against. Coordinates and inputs are raw 256-bit big-endian
//! integers; no curve arithmetic happens here. `G2` coordinates use the
//! Solidity-verifier calldata order `[[x.c1, x.c0], [y.c1, y.c0]]`, which is
//! what `snarkjs generatecall` emits.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::constants::FIELD_ELEMENT_LENGTH;
use crate::utils::crypto::Hash;

// ═══════════════════════════════════════════════════════════════════════════════
// FIELD ELEMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Unsigned 256-bit integer carried by a proof (coordinate or public input)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldElement([u8; FIELD_ELEMENT_LENGTH]);

impl FieldElement {
    /// The zero element
    pub const ZERO: FieldElement = FieldElement([0u8; FIELD_ELEMENT_LENGTH]);

    /// Create from big-endian bytes
    pub fn from_be_bytes(bytes: [u8; FIELD_ELEMENT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Big-endian bytes
    pub fn as_be_bytes(&self) -> &[u8; FIELD_ELEMENT_LENGTH] {
        &self.0
    }

    /// Create from a u64
    pub fn from_u64(value: u64) -> Self {
        Self::from_u128(value as u128)
    }

    /// Create from a u128
    pub fn from_u128(value: u128) -> Self {
        let mut bytes = [0u8; FIELD_ELEMENT_LENGTH];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; FIELD_ELEMENT_LENGTH]
    }

    /// Value as u128, or `None` if the upper 128 bits are set
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    /// Parse `0x`-prefixed hex or plain decimal
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(digits) => Self::from_hex_digits(digits),
            None => Self::from_decimal(s),
        }
    }

    /// Parse hex digits (no prefix), at most 256 bits
    fn from_hex_digits(digits: &str) -> Result<Self> {
        let trimmed = digits.trim_start_matches('0');
        if digits.is_empty() || trimmed.len() > FIELD_ELEMENT_LENGTH * 2 {
            return Err(Error::MalformedProof(format!(
                "hex field element must have 1..=64 significant digits, got {:?}",
                digits
            )));
        }
        let padded = format!("{:0>64}", trimmed);
        let bytes = hex::decode(&padded)
            .map_err(|e| Error::MalformedProof(format!("invalid hex field element: {}", e)))?;
        let mut arr = [0u8; FIELD_ELEMENT_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Parse a decimal string, at most 2^256 - 1
    pub fn from_decimal(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::MalformedProof("empty field element".into()));
        }

        let mut acc = [0u8; FIELD_ELEMENT_LENGTH];
        for ch in s.chars() {
            let digit = ch.to_digit(10).ok_or_else(|| {
                Error::MalformedProof(format!("invalid decimal digit {:?} in {:?}", ch, s))
            })?;

            // acc = acc * 10 + digit
            let mut carry = digit as u16;
            for byte in acc.iter_mut().rev() {
                let v = (*byte as u16) * 10 + carry;
                *byte = (v & 0xff) as u8;
                carry = v >> 8;
            }
            if carry != 0 {
                return Err(Error::MalformedProof(format!(
                    "decimal field element exceeds 256 bits: {}",
                    s
                )));
            }
        }
        Ok(Self(acc))
    }

    /// Full-width `0x`-prefixed hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for FieldElement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u128() {
            Some(v) => write!(f, "Fe({})", v),
            None => write!(f, "Fe({})", self.to_hex()),
        }
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u128() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "{}", self.to_hex()),
        }
    }
}

impl Serialize for FieldElement {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

struct FieldElementVisitor;

impl<'de> Visitor<'de> for FieldElementVisitor {
    type Value = FieldElement;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a hex or decimal string, or a non-negative integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<FieldElement, E> {
        FieldElement::parse(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<FieldElement, E> {
        Ok(FieldElement::from_u64(v))
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(FieldElementVisitor)
        } else {
            let bytes = <[u8; FIELD_ELEMENT_LENGTH]>::deserialize(deserializer)?;
            Ok(FieldElement(bytes))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GROUP ELEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Affine G1 point `(x, y)`; `(0, 0)` encodes the point at infinity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[FieldElement; 2]", into = "[FieldElement; 2]")]
pub struct G1Point {
    /// x coordinate
    pub x: FieldElement,
    /// y coordinate
    pub y: FieldElement,
}

impl G1Point {
    /// Create a point from coordinates
    pub fn new(x: FieldElement, y: FieldElement) -> Self {
        Self { x, y }
    }

    /// Check for the infinity encoding
    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }
}

impl From<[FieldElement; 2]> for G1Point {
    fn from([x, y]: [FieldElement; 2]) -> Self {
        Self { x, y }
    }
}

impl From<G1Point> for [FieldElement; 2] {
    fn from(p: G1Point) -> Self {
        [p.x, p.y]
    }
}

/// Affine G2 point in calldata order: `x = [x.c1, x.c0]`, `y = [y.c1, y.c0]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[[FieldElement; 2]; 2]", into = "[[FieldElement; 2]; 2]")]
pub struct G2Point {
    /// x coordinate as `[c1, c0]`
    pub x: [FieldElement; 2],
    /// y coordinate as `[c1, c0]`
    pub y: [FieldElement; 2],
}

impl G2Point {
    /// Create a point from calldata-ordered coordinates
    pub fn new(x: [FieldElement; 2], y: [FieldElement; 2]) -> Self {
        Self { x, y }
    }

    /// Check for the infinity encoding
    pub fn is_zero(&self) -> bool {
        self.x.iter().chain(self.y.iter()).all(FieldElement::is_zero)
    }
}

impl From<[[FieldElement; 2]; 2]> for G2Point {
    fn from([x, y]: [[FieldElement; 2]; 2]) -> Self {
        Self { x, y }
    }
}

impl From<G2Point> for [[FieldElement; 2]; 2] {
    fn from(p: G2Point) -> Self {
        [p.x, p.y]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROOF
// ═══════════════════════════════════════════════════════════════════════════════

/// A Groth16 proof together with its public-input vector
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Groth16Proof {
    /// Proof element A (G1)
    pub a: G1Point,
    /// Proof element B (G2)
    pub b: G2Point,
    /// Proof element C (G1)
    pub c: G1Point,
    /// Public inputs, in circuit order
    pub input: Vec<FieldElement>,
}

impl Groth16Proof {
    /// Create a proof
    pub fn new(a: G1Point, b: G2Point, c: G1Point, input: Vec<FieldElement>) -> Self {
        Self { a, b, c, input }
    }

    /// Same proof elements with a different public-input vector
    pub fn with_input(&self, input: Vec<FieldElement>) -> Self {
        Self {
            input,
            ..self.clone()
        }
    }

    /// Number of public inputs
    pub fn arity(&self) -> usize {
        self.input.len()
    }

    /// Canonical byte encoding: a, b, c coordinates then inputs, 32 bytes each
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((8 + self.input.len()) * 32);
        let elements = [self.a.x, self.a.y]
            .into_iter()
            .chain(self.b.x)
            .chain(self.b.y)
            .chain([self.c.x, self.c.y])
            .chain(self.input.iter().copied());
        for fe in elements {
            out.extend_from_slice(fe.as_be_bytes());
        }
        out
    }

    /// SHA-256 fingerprint of the canonical encoding
    pub fn hash(&self) -> Hash {
        Hash::sha256(&self.encode())
    }

    /// Parse a `{a, b, c, input}` JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedProof(e.to_string()))
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load a proof JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::MalformedProof(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
