//! Content-addressed hashing of ABIs.
//!
//! Every ABI is content-addressed via SHA-256 over the compact JSON encoding
//! of its canonical form. The hash is the deduplication key of the registry:
//! two item lists with the same canonical form always share a hash.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::{normalize, CanonicalAbi};
use crate::item::AbiItem;

/// Length of a content hash in hex characters.
pub const HASH_HEX_LEN: usize = 64;

/// A content hash (lowercase SHA-256 hex digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Compute the SHA-256 hash of the given data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex_encode(&hasher.finalize()))
    }

    /// Hash an already canonicalized ABI.
    pub fn of_canonical(canonical: &CanonicalAbi) -> Self {
        ContentHash::compute(canonical.to_json().as_bytes())
    }

    /// Canonicalize and hash an item list.
    pub fn of_items(items: &[AbiItem]) -> Self {
        ContentHash::of_canonical(&normalize(items))
    }

    /// Accept a stored hash string, checking it is 64 lowercase hex chars.
    pub fn parse(s: &str) -> Option<Self> {
        let well_formed = s.len() == HASH_HEX_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        well_formed.then(|| ContentHash(s.to_string()))
    }

    /// Get the hex string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first `n` hex characters. Display only, never an identity.
    pub fn short(&self, n: usize) -> &str {
        &self.0[..n.min(self.0.len())]
    }

    /// Verify that the given item list hashes to this value.
    pub fn verify(&self, items: &[AbiItem]) -> bool {
        ContentHash::of_items(items) == *self
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encode bytes as lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Canonicalize and hash an item list.
pub fn hash(items: &[AbiItem]) -> ContentHash {
    ContentHash::of_items(items)
}

/// Whether two item lists are the same ABI (equal content hashes).
pub fn equals(a: &[AbiItem], b: &[AbiItem]) -> bool {
    hash(a) == hash(b)
}

/// Prefix of the content hash for display.
pub fn short_hash(items: &[AbiItem], n: usize) -> String {
    hash(items).short(n).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemKind, Parameter, StateMutability};

    fn erc20_slice() -> Vec<AbiItem> {
        vec![
            AbiItem::function(
                "transfer",
                vec![Parameter::new("to", "address"), Parameter::new("value", "uint256")],
            )
            .with_outputs(vec![Parameter::new("", "bool")])
            .with_mutability(StateMutability::Nonpayable),
            AbiItem::function("totalSupply", vec![])
                .with_outputs(vec![Parameter::new("", "uint256")])
                .with_mutability(StateMutability::View),
            AbiItem::event(
                "Transfer",
                vec![
                    Parameter::new("from", "address").indexed(),
                    Parameter::new("to", "address").indexed(),
                    Parameter::new("value", "uint256"),
                ],
            ),
        ]
    }

    #[test]
    fn hash_format() {
        let h = hash(&erc20_slice());
        assert_eq!(h.as_str().len(), HASH_HEX_LEN);
        assert!(ContentHash::parse(h.as_str()).is_some());
    }

    #[test]
    fn sha256_of_empty_is_well_known() {
        assert_eq!(
            ContentHash::compute(b"").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn empty_abi_hashes_the_empty_array() {
        assert_eq!(hash(&[]), ContentHash::compute(b"[]"));
    }

    #[test]
    fn invariant_under_member_order() {
        let a = erc20_slice();
        let mut b = erc20_slice();
        b.reverse();
        assert_eq!(hash(&a), hash(&b));
        assert!(equals(&a, &b));
    }

    #[test]
    fn invariant_under_parameter_order_and_whitespace() {
        let a = erc20_slice();
        let mut b = erc20_slice();
        b[0].inputs.reverse();
        b[0].name = Some(" transfer\t".into());
        b[2].inputs[1].ty = " address ".into();
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn invariant_under_legacy_encoding() {
        let a = erc20_slice();
        let mut b = erc20_slice();
        b[1].state_mutability = None;
        b[1].constant = Some(true);
        b[0].state_mutability = None;
        b[0].constant = Some(false);
        b[0].payable = Some(false);
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn sensitive_to_parameter_type() {
        let a = erc20_slice();
        let mut b = erc20_slice();
        b[0].inputs[1].ty = "uint128".into();
        assert_ne!(hash(&a), hash(&b));
    }

    #[test]
    fn sensitive_to_rename_and_membership() {
        let a = erc20_slice();

        let mut renamed = erc20_slice();
        renamed[0].name = Some("send".into());
        assert_ne!(hash(&a), hash(&renamed));

        let mut added = erc20_slice();
        added.push(AbiItem::new(ItemKind::Receive));
        assert_ne!(hash(&a), hash(&added));

        let mut removed = erc20_slice();
        removed.pop();
        assert_ne!(hash(&a), hash(&removed));
    }

    #[test]
    fn short_hash_is_prefix() {
        let items = erc20_slice();
        let full = hash(&items);
        let short = short_hash(&items, 8);
        assert_eq!(short.len(), 8);
        assert!(full.as_str().starts_with(&short));
        assert_eq!(short_hash(&items, 100).len(), HASH_HEX_LEN);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(ContentHash::parse("abc").is_none());
        assert!(ContentHash::parse(&"A".repeat(64)).is_none());
        assert!(ContentHash::parse(&"g".repeat(64)).is_none());
        assert!(ContentHash::parse(&"0".repeat(64)).is_some());
    }

    #[test]
    fn verify_matches() {
        let items = erc20_slice();
        let h = hash(&items);
        assert!(h.verify(&items));
        assert!(!h.verify(&items[..1]));
    }
}
